//! Pavement analysis types
//!
//! The five-field result schema plus the provenance tags that say how each
//! field was obtained.
//!
//! v0.4.0: Provenance - every field is tagged Parsed or Defaulted

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall pavement condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverallCondition {
    Excellent,
    Good,
    #[default]
    Fair,
    Poor,
    Critical,
}

impl OverallCondition {
    pub const ALL: [OverallCondition; 5] = [
        OverallCondition::Excellent,
        OverallCondition::Good,
        OverallCondition::Fair,
        OverallCondition::Poor,
        OverallCondition::Critical,
    ];

    /// Order used when scanning free text: worst first
    pub const SCAN_ORDER: [OverallCondition; 5] = [
        OverallCondition::Critical,
        OverallCondition::Poor,
        OverallCondition::Fair,
        OverallCondition::Good,
        OverallCondition::Excellent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallCondition::Excellent => "excellent",
            OverallCondition::Good => "good",
            OverallCondition::Fair => "fair",
            OverallCondition::Poor => "poor",
            OverallCondition::Critical => "critical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OverallCondition::Excellent => "Excellent",
            OverallCondition::Good => "Good",
            OverallCondition::Fair => "Fair",
            OverallCondition::Poor => "Poor",
            OverallCondition::Critical => "Critical",
        }
    }

    /// Hex colour used when displaying this condition
    pub fn color(&self) -> &'static str {
        match self {
            OverallCondition::Excellent => "#10b981",
            OverallCondition::Good => "#3b82f6",
            OverallCondition::Fair => "#f59e0b",
            OverallCondition::Poor => "#ef4444",
            OverallCondition::Critical => "#991b1b",
        }
    }

    /// Exact (already normalized) lookup. Callers wanting leniency go
    /// through the normalizer's validator.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for OverallCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dominant distress type visible in the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistressType {
    #[default]
    None,
    Transverse,
    Longitudinal,
    Alligator,
    Pothole,
    Multiple,
}

impl DistressType {
    pub const ALL: [DistressType; 6] = [
        DistressType::None,
        DistressType::Transverse,
        DistressType::Longitudinal,
        DistressType::Alligator,
        DistressType::Pothole,
        DistressType::Multiple,
    ];

    /// Order used when scanning free text
    pub const SCAN_ORDER: [DistressType; 6] = [
        DistressType::Pothole,
        DistressType::Alligator,
        DistressType::Longitudinal,
        DistressType::Transverse,
        DistressType::Multiple,
        DistressType::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DistressType::None => "none",
            DistressType::Transverse => "transverse",
            DistressType::Longitudinal => "longitudinal",
            DistressType::Alligator => "alligator",
            DistressType::Pothole => "pothole",
            DistressType::Multiple => "multiple",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistressType::None => "No Distress",
            DistressType::Transverse => "Transverse Crack",
            DistressType::Longitudinal => "Longitudinal Crack",
            DistressType::Alligator => "Alligator Crack",
            DistressType::Pothole => "Pothole",
            DistressType::Multiple => "Multiple Distress Types",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for DistressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of one pavement analysis
///
/// Numeric fields are on a 0-100 scale by convention but are not clamped:
/// whatever the model reported is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_condition: OverallCondition,
    pub distress_type: DistressType,
    pub severity_score: f64,
    pub crack_density: f64,
    pub confidence_level: f64,
}

/// Defaults used by the JSON and text-scan tiers
pub const TEXT_SCAN_DEFAULT: AnalysisResult = AnalysisResult {
    overall_condition: OverallCondition::Fair,
    distress_type: DistressType::None,
    severity_score: 50.0,
    crack_density: 0.0,
    confidence_level: 70.0,
};

/// Result used when no model produced any text at all
pub const HARD_DEFAULT: AnalysisResult = AnalysisResult {
    overall_condition: OverallCondition::Fair,
    distress_type: DistressType::None,
    severity_score: 50.0,
    crack_density: 0.0,
    confidence_level: 60.0,
};

/// Where a single field value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    /// Read from the model response
    Parsed,
    /// Missing, invalid or unrecognised; the default was substituted
    #[default]
    Defaulted,
}

impl FieldSource {
    pub fn is_parsed(&self) -> bool {
        matches!(self, FieldSource::Parsed)
    }
}

/// Per-field provenance of an [`AnalysisResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Provenance {
    pub overall_condition: FieldSource,
    pub distress_type: FieldSource,
    pub severity_score: FieldSource,
    pub crack_density: FieldSource,
    pub confidence_level: FieldSource,
}

impl Provenance {
    /// Every field defaulted
    pub fn all_defaulted() -> Self {
        Self::default()
    }

    pub fn parsed_count(&self) -> usize {
        [
            self.overall_condition,
            self.distress_type,
            self.severity_score,
            self.crack_density,
            self.confidence_level,
        ]
        .iter()
        .filter(|s| s.is_parsed())
        .count()
    }

    pub fn is_fully_parsed(&self) -> bool {
        self.parsed_count() == 5
    }
}

/// Which fallback tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTier {
    /// A JSON object was found and mapped
    Json,
    /// Keywords and `key: number` pairs were scanned from free text
    TextScan,
    /// No model response was available
    HardDefault,
}

impl AnalysisTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTier::Json => "json",
            AnalysisTier::TextScan => "text_scan",
            AnalysisTier::HardDefault => "hard_default",
        }
    }
}

impl fmt::Display for AnalysisTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizer output: the result plus how it was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAnalysis {
    pub result: AnalysisResult,
    pub tier: AnalysisTier,
    pub provenance: Provenance,
}

impl NormalizedAnalysis {
    pub fn hard_default() -> Self {
        Self {
            result: HARD_DEFAULT,
            tier: AnalysisTier::HardDefault,
            provenance: Provenance::all_defaulted(),
        }
    }

    /// True when nothing in the result came from a model
    pub fn is_defaulted(&self) -> bool {
        self.provenance.parsed_count() == 0
    }
}

/// One completed analysis attempt, as returned by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub analysis: NormalizedAnalysis,
    /// Model identifier that answered, if any
    pub model: Option<String>,
    /// Model prose kept when the answer was not JSON
    #[serde(default)]
    pub description: Option<String>,
    pub processed: bool,
    pub processed_at: DateTime<Utc>,
}

impl AnalysisOutcome {
    pub fn new(analysis: NormalizedAnalysis, model: Option<String>) -> Self {
        Self {
            analysis,
            model,
            description: None,
            processed: true,
            processed_at: Utc::now(),
        }
    }

    pub fn hard_default() -> Self {
        Self::new(NormalizedAnalysis::hard_default(), None)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.analysis.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_serializes_lowercase() {
        let json = serde_json::to_string(&OverallCondition::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: OverallCondition = serde_json::from_str("\"good\"").unwrap();
        assert_eq!(back, OverallCondition::Good);
    }

    #[test]
    fn test_from_name_is_exact() {
        assert_eq!(OverallCondition::from_name("poor"), Some(OverallCondition::Poor));
        assert_eq!(OverallCondition::from_name("POOR"), None);
        assert_eq!(DistressType::from_name("alligator"), Some(DistressType::Alligator));
        assert_eq!(DistressType::from_name("crater"), None);
    }

    #[test]
    fn test_scan_orders_cover_every_variant() {
        for c in OverallCondition::ALL {
            assert!(OverallCondition::SCAN_ORDER.contains(&c));
        }
        for d in DistressType::ALL {
            assert!(DistressType::SCAN_ORDER.contains(&d));
        }
    }

    #[test]
    fn test_named_defaults_differ_only_in_confidence() {
        assert_eq!(TEXT_SCAN_DEFAULT.overall_condition, HARD_DEFAULT.overall_condition);
        assert_eq!(TEXT_SCAN_DEFAULT.distress_type, HARD_DEFAULT.distress_type);
        assert_eq!(TEXT_SCAN_DEFAULT.severity_score, HARD_DEFAULT.severity_score);
        assert_eq!(TEXT_SCAN_DEFAULT.crack_density, HARD_DEFAULT.crack_density);
        assert_eq!(TEXT_SCAN_DEFAULT.confidence_level, 70.0);
        assert_eq!(HARD_DEFAULT.confidence_level, 60.0);
    }

    #[test]
    fn test_provenance_counts() {
        let mut p = Provenance::all_defaulted();
        assert_eq!(p.parsed_count(), 0);
        p.distress_type = FieldSource::Parsed;
        p.confidence_level = FieldSource::Parsed;
        assert_eq!(p.parsed_count(), 2);
        assert!(!p.is_fully_parsed());
    }

    #[test]
    fn test_hard_default_outcome_is_processed() {
        let outcome = AnalysisOutcome::hard_default();
        assert!(outcome.processed);
        assert!(outcome.model.is_none());
        assert!(outcome.description.is_none());
        assert_eq!(outcome.analysis.tier, AnalysisTier::HardDefault);
        assert!(outcome.analysis.is_defaulted());
        assert_eq!(outcome.result().confidence_level, 60.0);
    }
}
