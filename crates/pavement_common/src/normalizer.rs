//! Response normalizer
//!
//! Turns whatever text a vision model returned into an [`AnalysisResult`]
//! whose enum fields are always valid. Tiers are tried in order:
//! - JSON object embedded in the text (code fences stripped)
//! - keyword and `key: number` scan of the raw text
//!
//! Neither tier can fail outright; the scan always produces a value.

use crate::types::{
    AnalysisResult, AnalysisTier, DistressType, FieldSource, NormalizedAnalysis,
    OverallCondition, Provenance, TEXT_SCAN_DEFAULT,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

static FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```json\n").expect("fence regex"));
static FENCE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\n```$").expect("fence regex"));

static SEVERITY_RE: Lazy<Regex> = Lazy::new(|| numeric_key_regex("severity_score"));
static DENSITY_RE: Lazy<Regex> = Lazy::new(|| numeric_key_regex("crack_density"));
static CONFIDENCE_RE: Lazy<Regex> = Lazy::new(|| numeric_key_regex("confidence_level"));

fn numeric_key_regex(key: &str) -> Regex {
    Regex::new(&format!(r#"["']?{}["']?\s*[:=]\s*([0-9]+\.?[0-9]*)"#, key)).expect("numeric key regex")
}

/// Why the JSON tier gave up
#[derive(Debug, thiserror::Error)]
enum JsonTierError {
    #[error("no JSON object found")]
    NoObject,

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("JSON value is not an object")]
    NotAnObject,

    #[error("field '{0}' is not a number")]
    NotNumeric(&'static str),
}

/// Normalize raw model output. Total: never panics, always enum-valid.
pub fn normalize_response(text: &str) -> NormalizedAnalysis {
    match parse_json_tier(text) {
        Ok(analysis) => {
            info!(
                "Parsed pavement analysis from JSON ({}/5 fields from model)",
                analysis.provenance.parsed_count()
            );
            analysis
        }
        Err(JsonTierError::NoObject) => {
            warn!("No JSON object in model response, falling back to text scan");
            scan_text(text)
        }
        Err(e) => {
            warn!("JSON tier failed: {} - falling back to text scan", e);
            scan_text(text)
        }
    }
}

/// Remove markdown code fences around a JSON answer
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = FENCE_OPEN.replace_all(trimmed, "");
    let without_close = FENCE_CLOSE.replace_all(&without_open, "");
    without_close.replace("``````", "")
}

/// Greedy `{ ... }` span: first opening brace to last closing brace
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn parse_json_tier(text: &str) -> Result<NormalizedAnalysis, JsonTierError> {
    let cleaned = strip_code_fences(text);
    let json_text = extract_json_object(&cleaned).ok_or(JsonTierError::NoObject)?;
    let value: Value = serde_json::from_str(json_text)?;
    let object = value.as_object().ok_or(JsonTierError::NotAnObject)?;
    map_object(object)
}

fn map_object(object: &Map<String, Value>) -> Result<NormalizedAnalysis, JsonTierError> {
    let mut provenance = Provenance::all_defaulted();

    let overall_condition = match enum_candidate(object.get("overall_condition")) {
        Some(candidate) => {
            let (condition, source) = validate_condition(&candidate);
            provenance.overall_condition = source;
            condition
        }
        None => TEXT_SCAN_DEFAULT.overall_condition,
    };

    let distress_type = match enum_candidate(object.get("distress_type")) {
        Some(candidate) => {
            let (distress, source) = validate_distress(&candidate);
            provenance.distress_type = source;
            distress
        }
        None => TEXT_SCAN_DEFAULT.distress_type,
    };

    let (severity_score, source) = numeric_field(
        object,
        "severity_score",
        TEXT_SCAN_DEFAULT.severity_score,
    )?;
    provenance.severity_score = source;

    let (crack_density, source) =
        numeric_field(object, "crack_density", TEXT_SCAN_DEFAULT.crack_density)?;
    provenance.crack_density = source;

    let (confidence_level, source) = numeric_field(
        object,
        "confidence_level",
        TEXT_SCAN_DEFAULT.confidence_level,
    )?;
    provenance.confidence_level = source;

    Ok(NormalizedAnalysis {
        result: AnalysisResult {
            overall_condition,
            distress_type,
            severity_score,
            crack_density,
            confidence_level,
        },
        tier: AnalysisTier::Json,
        provenance,
    })
}

/// String form of an enum field. Null counts as absent.
fn enum_candidate(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn numeric_field(
    object: &Map<String, Value>,
    key: &'static str,
    default: f64,
) -> Result<(f64, FieldSource), JsonTierError> {
    match object.get(key) {
        None => Ok((default, FieldSource::Defaulted)),
        Some(value) => coerce_number(value)
            .map(|n| (n, FieldSource::Parsed))
            .ok_or(JsonTierError::NotNumeric(key)),
    }
}

/// Numbers, numeric strings and booleans are accepted. Null and
/// non-finite values (`"NaN"`, `"inf"`) are not.
fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Lower-case and trim; unknown values become `fair`
pub fn validate_condition(candidate: &str) -> (OverallCondition, FieldSource) {
    let normalized = candidate.trim().to_lowercase();
    match OverallCondition::from_name(&normalized) {
        Some(condition) => (condition, FieldSource::Parsed),
        None => {
            debug!("Unknown overall_condition '{}', using default", candidate);
            (TEXT_SCAN_DEFAULT.overall_condition, FieldSource::Defaulted)
        }
    }
}

/// Lower-case and trim; unknown values become `none`
pub fn validate_distress(candidate: &str) -> (DistressType, FieldSource) {
    let normalized = candidate.trim().to_lowercase();
    match DistressType::from_name(&normalized) {
        Some(distress) => (distress, FieldSource::Parsed),
        None => {
            debug!("Unknown distress_type '{}', using default", candidate);
            (TEXT_SCAN_DEFAULT.distress_type, FieldSource::Defaulted)
        }
    }
}

/// Text-scan tier: keyword search plus `key: number` / `key = number` pairs
pub fn scan_text(text: &str) -> NormalizedAnalysis {
    let lower = text.to_lowercase();
    let mut result = TEXT_SCAN_DEFAULT;
    let mut provenance = Provenance::all_defaulted();

    if let Some(condition) = OverallCondition::SCAN_ORDER
        .into_iter()
        .find(|c| lower.contains(c.as_str()))
    {
        result.overall_condition = condition;
        provenance.overall_condition = FieldSource::Parsed;
    }

    if let Some(distress) = DistressType::SCAN_ORDER
        .into_iter()
        .find(|d| lower.contains(d.as_str()))
    {
        result.distress_type = distress;
        provenance.distress_type = FieldSource::Parsed;
    }

    if let Some(n) = capture_number(&SEVERITY_RE, &lower) {
        result.severity_score = n;
        provenance.severity_score = FieldSource::Parsed;
    }
    if let Some(n) = capture_number(&DENSITY_RE, &lower) {
        result.crack_density = n;
        provenance.crack_density = FieldSource::Parsed;
    }
    if let Some(n) = capture_number(&CONFIDENCE_RE, &lower) {
        result.confidence_level = n;
        provenance.confidence_level = FieldSource::Parsed;
    }

    info!(
        "Extracted pavement analysis by text scan ({}/5 fields found)",
        provenance.parsed_count()
    );

    NormalizedAnalysis {
        result,
        tier: AnalysisTier::TextScan,
        provenance,
    }
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}
