//! Pavement Common - Shared types and analysis core
//!
//! Vision model calls, response normalization and the assessment history.
//! Every analysis path ends in an enum-valid result; callers tell real
//! results from defaulted ones through `AnalysisTier` and `Provenance`.

pub mod analyzer;
pub mod assessment;
pub mod config;
pub mod image_payload;
pub mod normalizer;
pub mod types;
pub mod vision_client;

pub use analyzer::PavementAnalyzer;
pub use assessment::{Assessment, AssessmentStore, StoreError};
pub use config::{AnalyzerConfig, ConfigError, StorageSettings, VisionSettings};
pub use image_payload::{ImageError, ImagePayload};
pub use normalizer::normalize_response;
pub use types::*;
pub use vision_client::{FakeVisionClient, GeminiVisionClient, VisionClient, VisionError};
