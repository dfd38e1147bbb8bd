use derive_more::Display;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Crops the field analyzer recognizes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    AsRefStr,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Crop {
    #[strum(to_string = "blackgram", serialize = "black gram", serialize = "urad")]
    Blackgram,
    #[strum(to_string = "cotton")]
    Cotton,
    #[strum(to_string = "groundnut", serialize = "ground nut", serialize = "peanut")]
    Groundnut,
    #[strum(to_string = "paddy", serialize = "rice")]
    Paddy,
    #[strum(to_string = "sorghum", serialize = "jowar")]
    Sorghum,
    #[strum(to_string = "maize", serialize = "corn")]
    Maize,
    #[strum(to_string = "sugarcane", serialize = "sugar cane")]
    Sugarcane,
    #[strum(to_string = "turmeric")]
    Turmeric,
    #[strum(to_string = "coconut")]
    Coconut,
}

impl Crop {
    /// Only paddy and turmeric are photographed at the harvesting stage.
    pub fn allows_harvesting(self) -> bool {
        matches!(self, Crop::Paddy | Crop::Turmeric)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    AsRefStr,
    strum_macros::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum GrowthStage {
    #[serde(rename = "vegetation")]
    #[strum(to_string = "vegetation", serialize = "vegetative")]
    Vegetation,
    #[serde(rename = "flowering")]
    #[strum(to_string = "flowering")]
    Flowering,
    #[serde(rename = "full growth")]
    #[strum(to_string = "full growth", serialize = "fullgrowth")]
    FullGrowth,
    #[serde(rename = "harvesting")]
    #[strum(to_string = "harvesting", serialize = "harvest")]
    Harvesting,
    #[serde(rename = "Not Applicable")]
    #[strum(to_string = "Not Applicable", serialize = "n/a", serialize = "na")]
    NotApplicable,
}

/// Crop column of a result row.
///
/// Anything outside the taxonomy is kept as a specific name when it looks like one,
/// otherwise it collapses to `Unknown`. The two sentinels stand in for the whole result.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum CropLabel {
    #[display(fmt = "{}", _0)]
    Known(Crop),
    #[display(fmt = "{}", _0)]
    Specific(String),
    #[display(fmt = "Unknown")]
    Unknown,
    #[display(fmt = "None")]
    NoCrop,
    #[display(fmt = "Not a crop")]
    NotACrop,
}

impl CropLabel {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, CropLabel::NoCrop | CropLabel::NotACrop)
    }

    pub fn allows_harvesting(&self) -> bool {
        match self {
            CropLabel::Known(crop) => crop.allows_harvesting(),
            _ => false,
        }
    }
}

// Classifier output is loosely typed: nulls stand in for missing fields and
// names sometimes arrive as numbers. None of that should fail a request.

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_true<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

/// One unranked guess from the upstream image classifier.
///
/// `confidence` is kept as raw JSON because classifiers send numbers, strings like
/// `"92%"`, or nothing at all.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Candidate {
    #[serde(default, deserialize_with = "lenient_text")]
    pub crop_name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub stage: String,
    #[serde(default)]
    pub confidence: Option<Value>,
}

impl Candidate {
    pub fn new(crop_name: impl Into<String>, stage: impl Into<String>, confidence: f64) -> Self {
        Self {
            crop_name: crop_name.into(),
            stage: stage.into(),
            confidence: Some(serde_json::json!(confidence)),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Scene-level signals reported alongside the candidates.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SceneAssessment {
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub is_crop_field: bool,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub has_detectable_crop: bool,
    /// Confidence behind a "not a crop" / "no crop" verdict, raw like a candidate's.
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub description: Option<String>,
}

impl Default for SceneAssessment {
    fn default() -> Self {
        Self {
            is_crop_field: true,
            has_detectable_crop: true,
            confidence: None,
            description: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ClassificationRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub candidates: Vec<Candidate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scene: SceneAssessment,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BatchClassificationRequest {
    pub requests: Vec<ClassificationRequest>,
}

/// Wire shape of a classification. The three lists always have the same length.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClassificationResponse {
    pub crop_name: Vec<String>,
    pub confidence_score: Vec<f32>,
    pub stage_of_plant_growth: Vec<String>,
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TaxonomyResponse {
    pub crops: Vec<String>,
    pub stages: Vec<String>,
    pub harvest_crops: Vec<String>,
}
