//! Pavement analyzer - model selection loop
//!
//! Tries each configured model identifier in order and normalizes the first
//! answer it gets. Every failure ends in a defined result; nothing is
//! returned as an error:
//! - no credential or no models: hard default, no network call
//! - image cannot be loaded: hard default
//! - a model fails: logged, next model
//! - all models fail: hard default

use crate::config::VisionSettings;
use crate::image_payload::ImagePayload;
use crate::normalizer::normalize_response;
use crate::types::{AnalysisOutcome, AnalysisTier};
use crate::vision_client::VisionClient;
use std::path::Path;
use tracing::{error, info, warn};

pub struct PavementAnalyzer {
    settings: VisionSettings,
    api_key: Option<String>,
    client: Box<dyn VisionClient>,
}

impl PavementAnalyzer {
    /// `api_key` is resolved by the caller; `None` or empty disables model calls
    pub fn new(
        settings: VisionSettings,
        api_key: Option<String>,
        client: Box<dyn VisionClient>,
    ) -> Self {
        Self {
            settings,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Load the image at `path` and analyze it
    pub fn analyze_image(&self, path: impl AsRef<Path>) -> AnalysisOutcome {
        let path = path.as_ref();
        if !self.ready() {
            return AnalysisOutcome::hard_default();
        }

        match ImagePayload::load(path) {
            Ok(payload) => self.run_models(&payload),
            Err(e) => {
                error!("Cannot analyze {}: {}", path.display(), e);
                AnalysisOutcome::hard_default()
            }
        }
    }

    /// Analyze an already validated image
    pub fn analyze_payload(&self, payload: &ImagePayload) -> AnalysisOutcome {
        if !self.ready() {
            return AnalysisOutcome::hard_default();
        }
        self.run_models(payload)
    }

    fn ready(&self) -> bool {
        if self.api_key.is_none() {
            warn!(
                "No API key found in ${} - using default analysis",
                self.settings.api_key_env
            );
            return false;
        }
        if self.settings.models.is_empty() {
            warn!("No vision models configured - using default analysis");
            return false;
        }
        true
    }

    fn run_models(&self, payload: &ImagePayload) -> AnalysisOutcome {
        for model in &self.settings.models {
            info!("Attempting vision model: {}", model);
            match self.client.generate(model, &self.settings.prompt, payload) {
                Ok(text) => {
                    let analysis = normalize_response(&text);
                    info!(
                        "Model {} answered; result from {} tier",
                        model, analysis.tier
                    );
                    let outcome = AnalysisOutcome::new(analysis, Some(model.clone()));
                    if analysis.tier == AnalysisTier::TextScan {
                        return outcome.with_description(text.trim());
                    }
                    return outcome;
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                }
            }
        }

        error!(
            "All {} vision models failed - using default analysis",
            self.settings.models.len()
        );
        AnalysisOutcome::hard_default()
    }
}
