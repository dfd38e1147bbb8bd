use serde_json::Value;
use shared::{Candidate, Crop, CropLabel, GrowthStage};
use std::str::FromStr;

use super::config::Policy;

const NO_CROP_NAMES: &[&str] = &["none", "no crop"];
const NOT_A_CROP_NAMES: &[&str] = &["not a crop"];
const PLACEHOLDER_NAMES: &[&str] = &[
    "unknown",
    "n/a",
    "na",
    "null",
    "nil",
    "undefined",
    "unidentified",
    "not applicable",
];

/// Adjustment applied to a candidate on its way through the rule engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    UnknownCrop(String),
    UnrecognizedStage(String),
    HarvestingDemoted,
    SentinelStageForced,
    ConfidenceClamped(f64),
    ConfidenceDefaulted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub crop: CropLabel,
    pub stage: GrowthStage,
    pub confidence: f32,
    pub coercions: Vec<Coercion>,
}

impl ValidatedEntry {
    pub fn is_sentinel(&self) -> bool {
        self.crop.is_sentinel()
    }

    pub fn confidence_defaulted(&self) -> bool {
        self.coercions.contains(&Coercion::ConfidenceDefaulted)
    }
}

/// Lowercases and folds `_`, `-` and runs of whitespace into single spaces.
pub fn normalize_token(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn resolve_crop(raw: &str) -> CropLabel {
    let token = normalize_token(raw);
    if let Ok(crop) = Crop::from_str(&token) {
        return CropLabel::Known(crop);
    }
    if NO_CROP_NAMES.contains(&token.as_str()) {
        return CropLabel::NoCrop;
    }
    if NOT_A_CROP_NAMES.contains(&token.as_str()) {
        return CropLabel::NotACrop;
    }
    if PLACEHOLDER_NAMES.contains(&token.as_str()) || !token.chars().any(char::is_alphabetic) {
        return CropLabel::Unknown;
    }
    CropLabel::Specific(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub fn resolve_stage(raw: &str) -> Option<GrowthStage> {
    GrowthStage::from_str(&normalize_token(raw)).ok()
}

/// Reads a score sent as a JSON number or a string like `"87"` / `"87.5%"`.
///
/// Overflowing values come back infinite and are left for the caller to clamp.
pub fn parse_confidence(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (!value.is_nan()).then_some(value)
}

fn resolve_confidence(raw: Option<&Value>, policy: &Policy, coercions: &mut Vec<Coercion>) -> f32 {
    match raw.and_then(parse_confidence) {
        Some(value) if (0.0..=100.0).contains(&value) => value as f32,
        Some(value) => {
            coercions.push(Coercion::ConfidenceClamped(value));
            value.clamp(0.0, 100.0) as f32
        }
        None => {
            coercions.push(Coercion::ConfidenceDefaulted);
            policy.default_confidence
        }
    }
}

/// Coerces one candidate into a consistent (crop, stage, confidence) entry.
///
/// The crop and stage are checked as a pair: harvesting only survives on crops that
/// allow it, sentinels always carry "Not Applicable". Nothing is ever rejected.
pub fn validate(candidate: &Candidate, policy: &Policy) -> ValidatedEntry {
    let mut coercions = Vec::new();

    let crop = resolve_crop(&candidate.crop_name);
    if crop == CropLabel::Unknown && normalize_token(&candidate.crop_name) != "unknown" {
        coercions.push(Coercion::UnknownCrop(candidate.crop_name.clone()));
    }

    let requested = resolve_stage(&candidate.stage);
    let stage = if crop.is_sentinel() {
        if requested != Some(GrowthStage::NotApplicable) {
            coercions.push(Coercion::SentinelStageForced);
        }
        GrowthStage::NotApplicable
    } else {
        match requested {
            Some(GrowthStage::Harvesting) if !crop.allows_harvesting() => {
                coercions.push(Coercion::HarvestingDemoted);
                GrowthStage::FullGrowth
            }
            Some(stage) => stage,
            None => {
                coercions.push(Coercion::UnrecognizedStage(candidate.stage.clone()));
                GrowthStage::NotApplicable
            }
        }
    };

    let confidence = resolve_confidence(candidate.confidence.as_ref(), policy, &mut coercions);

    if !coercions.is_empty() {
        log::debug!(
            "Coerced candidate ({:?}, {:?}) to ({}, {}, {}): {:?}",
            candidate.crop_name,
            candidate.stage,
            crop,
            stage,
            confidence,
            coercions
        );
    }

    ValidatedEntry {
        crop,
        stage,
        confidence,
        coercions,
    }
}
