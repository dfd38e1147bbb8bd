use shared::{Candidate, ClassificationResponse, CropLabel, GrowthStage, SceneAssessment};

use super::config::{MAX_ROWS, Policy};
use super::rules::{ValidatedEntry, parse_confidence, validate};

/// Terminal state reached for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotACropField,
    NoCropDetected,
    CropsAssembled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub crop: CropLabel,
    pub confidence: f32,
    pub stage: GrowthStage,
}

/// Final, immutable classification for one image. Only [`assemble`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    outcome: Outcome,
    rows: Vec<ResultRow>,
    description: String,
}

impl ClassificationResult {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn to_response(&self) -> ClassificationResponse {
        ClassificationResponse {
            crop_name: self.rows.iter().map(|row| row.crop.to_string()).collect(),
            confidence_score: self.rows.iter().map(|row| row.confidence).collect(),
            stage_of_plant_growth: self.rows.iter().map(|row| row.stage.to_string()).collect(),
            description: self.description.clone(),
        }
    }
}

fn clamp_score(score: f64) -> f32 {
    score.clamp(0.0, 100.0) as f32
}

fn sentinel_result(outcome: Outcome, score: f32, scene: &SceneAssessment) -> ClassificationResult {
    let crop = match outcome {
        Outcome::NotACropField => CropLabel::NotACrop,
        _ => CropLabel::NoCrop,
    };
    let rows = vec![ResultRow {
        crop,
        confidence: score,
        stage: GrowthStage::NotApplicable,
    }];
    finish(outcome, rows, scene)
}

fn describe_row(row: &ResultRow) -> String {
    match row.stage {
        GrowthStage::NotApplicable => row.crop.to_string(),
        stage => format!("{} ({})", row.crop, stage),
    }
}

fn synthesize_description(outcome: Outcome, rows: &[ResultRow]) -> String {
    match outcome {
        Outcome::NotACropField => "The image does not show a crop field.".to_string(),
        Outcome::NoCropDetected => "Crop field detected, but no crop could be identified.".to_string(),
        Outcome::CropsAssembled => {
            let mut parts: Vec<String> = rows.iter().map(describe_row).collect();
            let listed = match parts.pop() {
                Some(last) if parts.is_empty() => last,
                Some(last) => format!("{} and {}", parts.join(", "), last),
                None => String::new(),
            };
            format!("Crop field showing {}.", listed)
        }
    }
}

fn finish(outcome: Outcome, rows: Vec<ResultRow>, scene: &SceneAssessment) -> ClassificationResult {
    let description = scene
        .description
        .as_deref()
        .map(str::trim)
        .filter(|seed| !seed.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| synthesize_description(outcome, &rows));

    log::info!(
        "Classified image: {:?} with {} row(s): {}",
        outcome,
        rows.len(),
        rows.iter().map(describe_row).collect::<Vec<_>>().join(", ")
    );

    ClassificationResult {
        outcome,
        rows,
        description,
    }
}

/// Turns the classifier's guesses for one image into a well-formed result.
///
/// Scene verdicts short-circuit to a single sentinel row. Otherwise candidates are
/// validated, ranked by confidence with ties kept in upstream order, and cut to at
/// most three rows. Candidates that are themselves sentinels never become crop rows;
/// if nothing else is left the result is the "None" row.
pub fn assemble(
    candidates: &[Candidate],
    scene: &SceneAssessment,
    policy: &Policy,
) -> ClassificationResult {
    let scene_score = scene
        .confidence
        .as_ref()
        .and_then(parse_confidence)
        .map(clamp_score);

    if !scene.is_crop_field {
        let score = scene_score.unwrap_or(policy.sentinel_confidence);
        return sentinel_result(Outcome::NotACropField, score, scene);
    }
    if !scene.has_detectable_crop {
        let score = scene_score.unwrap_or(policy.sentinel_confidence);
        return sentinel_result(Outcome::NoCropDetected, score, scene);
    }

    let (sentinels, mut entries): (Vec<ValidatedEntry>, Vec<ValidatedEntry>) = candidates
        .iter()
        .map(|candidate| validate(candidate, policy))
        .partition(ValidatedEntry::is_sentinel);

    // The scene flags alone decide "Not a crop"; a crop field with nothing usable is "None".
    if entries.is_empty() {
        let reported = sentinels
            .iter()
            .filter(|entry| entry.crop == CropLabel::NoCrop && !entry.confidence_defaulted())
            .map(|entry| entry.confidence)
            .reduce(f32::max);
        let score = scene_score
            .or(reported)
            .unwrap_or(policy.sentinel_confidence);
        return sentinel_result(Outcome::NoCropDetected, score, scene);
    }

    // sort_by is stable: equal confidence keeps the classifier's order.
    entries.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    entries.truncate(policy.max_rows.clamp(1, MAX_ROWS));

    let rows = entries
        .into_iter()
        .map(|entry| ResultRow {
            crop: entry.crop,
            confidence: entry.confidence,
            stage: entry.stage,
        })
        .collect();
    finish(Outcome::CropsAssembled, rows, scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::Crop;

    fn crop_field() -> SceneAssessment {
        SceneAssessment::default()
    }

    fn assert_well_formed(result: &ClassificationResult) {
        let response = result.to_response();
        let len = response.crop_name.len();
        assert!((1..=3).contains(&len));
        assert_eq!(response.confidence_score.len(), len);
        assert_eq!(response.stage_of_plant_growth.len(), len);
        assert!(!response.description.trim().is_empty());
        for row in result.rows() {
            assert!((0.0..=100.0).contains(&row.confidence));
            if row.stage == GrowthStage::Harvesting {
                assert!(row.crop.allows_harvesting());
            }
            if row.crop.is_sentinel() {
                assert_eq!(len, 1);
                assert_eq!(row.stage, GrowthStage::NotApplicable);
            }
        }
    }

    fn as_candidates(result: &ClassificationResult) -> Vec<Candidate> {
        result
            .rows()
            .iter()
            .map(|row| {
                Candidate::new(row.crop.to_string(), row.stage.to_string(), row.confidence as f64)
            })
            .collect()
    }

    #[test]
    fn paddy_harvest_with_unlisted_weed() {
        let candidates = vec![
            Candidate::new("Paddy", "harvesting", 92.0),
            Candidate::new("weed", "vegetation", 40.0),
        ];
        let result = assemble(&candidates, &crop_field(), &Policy::default());
        let response = result.to_response();

        assert_eq!(result.outcome(), Outcome::CropsAssembled);
        assert_eq!(response.crop_name, vec!["paddy", "weed"]);
        assert_eq!(response.stage_of_plant_growth, vec!["harvesting", "vegetation"]);
        assert_eq!(response.confidence_score, vec![92.0, 40.0]);
        assert_eq!(
            response.description,
            "Crop field showing paddy (harvesting) and weed (vegetation)."
        );
    }

    #[test]
    fn cotton_harvest_is_demoted() {
        let candidates = vec![Candidate::new("Cotton", "harvesting", 80.0)];
        let result = assemble(&candidates, &crop_field(), &Policy::default());
        assert_eq!(result.rows()[0].crop, CropLabel::Known(Crop::Cotton));
        assert_eq!(result.rows()[0].stage, GrowthStage::FullGrowth);
    }

    #[test]
    fn non_field_scene_yields_single_not_a_crop_row() {
        let scene = SceneAssessment {
            is_crop_field: false,
            confidence: Some(json!(97.0)),
            ..SceneAssessment::default()
        };
        let candidates = vec![Candidate::new("paddy", "vegetation", 88.0)];
        let result = assemble(&candidates, &scene, &Policy::default());
        let response = result.to_response();

        assert_eq!(result.outcome(), Outcome::NotACropField);
        assert_eq!(response.crop_name, vec!["Not a crop"]);
        assert_eq!(response.confidence_score, vec![97.0]);
        assert_eq!(response.stage_of_plant_growth, vec!["Not Applicable"]);
        assert_eq!(response.description, "The image does not show a crop field.");
    }

    #[test]
    fn field_without_detectable_crop_yields_none_row() {
        let scene = SceneAssessment {
            has_detectable_crop: false,
            ..SceneAssessment::default()
        };
        let candidates = vec![Candidate::new("maize", "flowering", 35.0)];
        let result = assemble(&candidates, &scene, &Policy::default());
        let response = result.to_response();

        assert_eq!(result.outcome(), Outcome::NoCropDetected);
        assert_eq!(response.crop_name, vec!["None"]);
        assert_eq!(response.confidence_score, vec![50.0]);
        assert_eq!(response.stage_of_plant_growth, vec!["Not Applicable"]);
    }

    #[test]
    fn keeps_top_three_with_stable_ties() {
        let candidates = vec![
            Candidate::new("maize", "vegetation", 40.0),
            Candidate::new("cotton", "flowering", 70.0),
            Candidate::new("sorghum", "vegetation", 40.0),
            Candidate::new("groundnut", "flowering", 90.0),
            Candidate::new("coconut", "full growth", 40.0),
        ];
        let result = assemble(&candidates, &crop_field(), &Policy::default());
        let response = result.to_response();

        assert_eq!(response.crop_name, vec!["groundnut", "cotton", "maize"]);
        assert_eq!(response.confidence_score, vec![90.0, 70.0, 40.0]);
    }

    #[test]
    fn empty_candidates_fall_back_to_none() {
        let result = assemble(&[], &crop_field(), &Policy::default());
        assert_eq!(result.outcome(), Outcome::NoCropDetected);
        assert_eq!(result.rows().len(), 1);
        assert_eq!(result.rows()[0].confidence, 50.0);
    }

    #[test]
    fn sentinel_candidates_never_mix_with_crops() {
        let candidates = vec![
            Candidate::new("Not a crop", "Not Applicable", 95.0),
            Candidate::new("paddy", "vegetation", 60.0),
            Candidate::new("None", "Not Applicable", 80.0),
        ];
        let result = assemble(&candidates, &crop_field(), &Policy::default());
        assert_eq!(result.outcome(), Outcome::CropsAssembled);
        assert_eq!(result.to_response().crop_name, vec!["paddy"]);
    }

    #[test]
    fn sentinel_only_candidates_in_crop_field_yield_none() {
        let not_a_crop = vec![Candidate::new("not a crop", "", 88.0)];
        let result = assemble(&not_a_crop, &crop_field(), &Policy::default());
        assert_eq!(result.outcome(), Outcome::NoCropDetected);
        assert_eq!(result.to_response().crop_name, vec!["None"]);
        assert_eq!(result.rows()[0].confidence, 50.0);

        let mixed = vec![
            Candidate::new("None", "", 20.0),
            Candidate::new("Not a crop", "", 70.0),
        ];
        let result = assemble(&mixed, &crop_field(), &Policy::default());
        assert_eq!(result.outcome(), Outcome::NoCropDetected);
        assert_eq!(result.rows()[0].crop, CropLabel::NoCrop);
        assert_eq!(result.rows()[0].confidence, 20.0);

        let scene = SceneAssessment {
            confidence: Some(json!("64%")),
            ..crop_field()
        };
        let result = assemble(&mixed, &scene, &Policy::default());
        assert_eq!(result.rows()[0].confidence, 64.0);
    }

    #[test]
    fn duplicate_rows_are_kept_in_rank_order() {
        let candidates = vec![
            Candidate::new("paddy", "vegetation", 90.0),
            Candidate::new("Rice", "Vegetative", 80.0),
            Candidate::new("maize", "flowering", 70.0),
            Candidate::new("cotton", "flowering", 10.0),
        ];
        let result = assemble(&candidates, &crop_field(), &Policy::default());
        let response = result.to_response();
        assert_eq!(response.crop_name, vec!["paddy", "paddy", "maize"]);
        assert_eq!(
            response.stage_of_plant_growth,
            vec!["vegetation", "vegetation", "flowering"]
        );
        assert_eq!(response.confidence_score, vec![90.0, 80.0, 70.0]);
    }

    #[test]
    fn description_seed_is_preferred_when_present() {
        let scene = SceneAssessment {
            description: Some("  Terraced paddy field under overcast sky. ".into()),
            ..SceneAssessment::default()
        };
        let candidates = vec![Candidate::new("paddy", "flowering", 81.0)];
        let result = assemble(&candidates, &scene, &Policy::default());
        assert_eq!(result.description(), "Terraced paddy field under overcast sky.");

        let blank = SceneAssessment {
            description: Some("   ".into()),
            ..SceneAssessment::default()
        };
        let result = assemble(&candidates, &blank, &Policy::default());
        assert_eq!(result.description(), "Crop field showing paddy (flowering).");
    }

    #[test]
    fn max_rows_policy_limits_output() {
        let policy = Policy {
            max_rows: 1,
            ..Policy::default()
        };
        let candidates = vec![
            Candidate::new("maize", "vegetation", 40.0),
            Candidate::new("cotton", "flowering", 70.0),
        ];
        let result = assemble(&candidates, &crop_field(), &policy);
        assert_eq!(result.to_response().crop_name, vec!["cotton"]);
    }

    #[test]
    fn scene_confidence_is_clamped() {
        let scene = SceneAssessment {
            is_crop_field: false,
            confidence: Some(json!("250")),
            ..SceneAssessment::default()
        };
        let result = assemble(&[], &scene, &Policy::default());
        assert_eq!(result.rows()[0].confidence, 100.0);
    }

    #[test]
    fn every_input_produces_a_well_formed_result() {
        let names = ["paddy", "Cotton", "weed", "", "None", "Not a crop", "turmeric", "42"];
        let stages = ["harvesting", "flowering", "", "tasseling", "Not Applicable"];
        let scores = [-10.0, 0.0, 55.0, 100.0, 180.0];

        for (i, name) in names.iter().enumerate() {
            for (j, stage) in stages.iter().enumerate() {
                let candidates: Vec<Candidate> = scores
                    .iter()
                    .map(|score| Candidate::new(*name, *stage, *score))
                    .chain(std::iter::once(Candidate::new(
                        names[(i + j + 1) % names.len()],
                        stages[(i + 2 * j) % stages.len()],
                        65.0,
                    )))
                    .collect();
                for scene in [
                    crop_field(),
                    SceneAssessment {
                        has_detectable_crop: false,
                        ..crop_field()
                    },
                    SceneAssessment {
                        is_crop_field: false,
                        ..crop_field()
                    },
                ] {
                    let result = assemble(&candidates, &scene, &Policy::default());
                    assert_well_formed(&result);
                }
            }
        }
    }

    #[test]
    fn reassembling_a_result_is_stable() {
        let inputs = vec![
            vec![
                Candidate::new("Paddy", "harvesting", 92.0),
                Candidate::new("weed", "vegetation", 40.0),
                Candidate::new("Cotton", "harvest", 140.0),
                Candidate::new("???", "unknown stage", 10.0),
            ],
            vec![Candidate::new("not a crop", "flowering", 66.0)],
            vec![],
        ];
        for candidates in inputs {
            let first = assemble(&candidates, &crop_field(), &Policy::default());
            let scene = SceneAssessment {
                description: Some(first.description().to_string()),
                ..crop_field()
            };
            let second = assemble(&as_candidates(&first), &scene, &Policy::default());
            assert_eq!(first, second);
        }
    }
}
