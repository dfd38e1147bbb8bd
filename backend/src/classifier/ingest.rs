use serde_json::{Map, Value};
use shared::{Candidate, ClassificationRequest, CropLabel, SceneAssessment};

use super::rules::resolve_crop;

pub const DEFAULT_DESCRIPTION: &str = "No description.";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Classifier output is empty")]
    Empty,
    #[error("Classifier output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Classifier output is not a JSON object")]
    NotAnObject,
}

/// Vision models like to wrap their JSON in markdown fences.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn as_list(field: Option<&Value>) -> Vec<Value> {
    match field {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn description_of(object: &Map<String, Value>) -> String {
    object
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|description| !description.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string()
}

/// Scene verdicts the classifier expresses through sentinel crop names.
fn derive_scene(candidates: &[Candidate], description: String) -> SceneAssessment {
    let labels: Vec<CropLabel> = candidates
        .iter()
        .map(|candidate| resolve_crop(&candidate.crop_name))
        .collect();
    let first_score = candidates
        .first()
        .and_then(|candidate| candidate.confidence.clone());

    let mut scene = SceneAssessment {
        description: Some(description),
        ..SceneAssessment::default()
    };
    if labels.is_empty() {
        scene.has_detectable_crop = false;
    } else if labels.iter().all(|label| *label == CropLabel::NotACrop) {
        scene.is_crop_field = false;
        scene.confidence = first_score;
    } else if labels.iter().all(|label| *label == CropLabel::NoCrop) {
        scene.has_detectable_crop = false;
        scene.confidence = first_score;
    }
    scene
}

/// Reads the classifier's raw reply (parallel `crop_name` / `confidence_score` /
/// `stage_of_plant_growth` fields, each a list or a bare value) into a request.
///
/// Rows are driven by `crop_name`; a missing score or stage at some index is left for
/// the rule engine to default.
pub fn ingest_raw(text: &str) -> Result<ClassificationRequest, IngestError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(IngestError::Empty);
    }

    let value: Value = serde_json::from_str(&cleaned)?;
    let object = value.as_object().ok_or(IngestError::NotAnObject)?;

    let crops = as_list(object.get("crop_name"));
    let scores = as_list(object.get("confidence_score"));
    let stages = as_list(object.get("stage_of_plant_growth"));

    let candidates: Vec<Candidate> = crops
        .iter()
        .enumerate()
        .map(|(i, crop)| Candidate {
            crop_name: as_text(crop),
            stage: stages.get(i).map(as_text).unwrap_or_default(),
            confidence: scores.get(i).cloned(),
        })
        .collect();

    if crops.len() != scores.len() || crops.len() != stages.len() {
        log::warn!(
            "Classifier output has uneven fields: {} crops, {} scores, {} stages",
            crops.len(),
            scores.len(),
            stages.len()
        );
    }

    let scene = derive_scene(&candidates, description_of(object));
    Ok(ClassificationRequest { candidates, scene })
}
