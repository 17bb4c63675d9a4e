//! Assessment records and history
//!
//! An [`Assessment`] is one analyzed photo together with what the user
//! typed about it. History is a single JSON file, rewritten atomically on
//! every change.

use crate::types::{
    AnalysisOutcome, AnalysisResult, AnalysisTier, DistressType, OverallCondition, Provenance,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// A stored pavement assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub image_path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub notes: String,
    /// Model prose, kept when the answer had to be scanned as text
    #[serde(default)]
    pub ai_description: String,

    pub result: AnalysisResult,
    pub tier: AnalysisTier,
    #[serde(default)]
    pub provenance: Provenance,
    /// Model identifier that produced the result
    pub model: Option<String>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Assessment {
    /// Build a record from a finished analysis
    pub fn from_outcome(
        image_path: impl Into<PathBuf>,
        location: impl Into<String>,
        notes: impl Into<String>,
        outcome: &AnalysisOutcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_path: image_path.into(),
            uploaded_at: Utc::now(),
            location: location.into(),
            notes: notes.into(),
            ai_description: outcome.description.clone().unwrap_or_default(),
            result: outcome.analysis.result,
            tier: outcome.analysis.tier,
            provenance: outcome.analysis.provenance,
            model: outcome.model.clone(),
            processed: outcome.processed,
            processed_at: Some(outcome.processed_at),
        }
    }

    pub fn condition(&self) -> OverallCondition {
        self.result.overall_condition
    }

    pub fn distress(&self) -> DistressType {
        self.result.distress_type
    }

    /// Display colour for the assessed condition
    pub fn condition_color(&self) -> &'static str {
        self.result.overall_condition.color()
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Assessment {} - {} ({})",
            self.id,
            self.result.overall_condition,
            self.uploaded_at.format("%Y-%m-%d")
        )
    }
}

/// History store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("History I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON-file backed assessment history
#[derive(Debug)]
pub struct AssessmentStore {
    path: PathBuf,
    assessments: Vec<Assessment>,
}

impl AssessmentStore {
    /// Open the history at `path`. A missing file is an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let assessments = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            Vec::new()
        };

        debug!("Opened history {} ({} assessments)", path.display(), assessments.len());
        Ok(Self { path, assessments })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }

    /// Record an assessment and persist the history
    pub fn add(&mut self, assessment: Assessment) -> Result<(), StoreError> {
        info!("Saving {}", assessment);
        self.assessments.push(assessment);
        self.save()
    }

    /// All assessments, newest first
    pub fn list(&self) -> Vec<&Assessment> {
        let mut all: Vec<&Assessment> = self.assessments.iter().collect();
        all.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        all
    }

    /// The `n` most recent assessments
    pub fn recent(&self, n: usize) -> Vec<&Assessment> {
        let mut all = self.list();
        all.truncate(n);
        all
    }

    pub fn get(&self, id: Uuid) -> Option<&Assessment> {
        self.assessments.iter().find(|a| a.id == id)
    }

    /// Remove an assessment. The image file is left alone.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let before = self.assessments.len();
        self.assessments.retain(|a| a.id != id);
        if self.assessments.len() == before {
            return Ok(false);
        }
        info!("Deleted assessment {}", id);
        self.save()?;
        Ok(true)
    }

    fn save(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let content = serde_json::to_string_pretty(&self.assessments).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}
