//! Command implementations

use crate::output;
use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use pavement_common::config::config_path;
use pavement_common::{
    AnalysisTier, AnalyzerConfig, Assessment, AssessmentStore, GeminiVisionClient,
    PavementAnalyzer,
};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    match path {
        Some(p) => AnalyzerConfig::load_from(p).context("Failed to load configuration"),
        None => Ok(AnalyzerConfig::load()),
    }
}

fn open_store(config: &AnalyzerConfig) -> Result<AssessmentStore> {
    let path = config.storage.history_path();
    AssessmentStore::open(&path)
        .with_context(|| format!("Failed to open assessment history {}", path.display()))
}

pub fn analyze(
    config: &AnalyzerConfig,
    image: &Path,
    location: String,
    notes: String,
    json: bool,
    no_save: bool,
) -> Result<()> {
    let api_key = config.vision.resolve_api_key();
    let client = GeminiVisionClient::new(
        config.vision.endpoint.clone(),
        api_key.clone().unwrap_or_default(),
        config.vision.timeout_secs,
    )?;
    let analyzer = PavementAnalyzer::new(config.vision.clone(), api_key, Box::new(client));

    let outcome = analyzer.analyze_image(image);
    let image_path = std::fs::canonicalize(image).unwrap_or_else(|_| image.to_path_buf());
    let assessment = Assessment::from_outcome(image_path, location, notes, &outcome);

    if !no_save {
        let mut store = open_store(config)?;
        store.add(assessment.clone())?;
        info!("Recorded in {}", store.path().display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    output::display_assessment(&assessment);
    if assessment.tier == AnalysisTier::HardDefault {
        println!(
            "{}",
            "No model analysed this image; values are defaults. Run with -v for details."
                .yellow()
        );
        println!();
    }
    Ok(())
}

pub fn history(config: &AnalyzerConfig, limit: Option<usize>) -> Result<()> {
    let store = open_store(config)?;
    let assessments = match limit {
        Some(n) => store.recent(n),
        None => store.list(),
    };
    output::display_history(&assessments);
    Ok(())
}

pub fn show(config: &AnalyzerConfig, id: Uuid, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let Some(assessment) = store.get(id) else {
        bail!("No assessment with id {}", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(assessment)?);
    } else {
        output::display_assessment(assessment);
    }
    Ok(())
}

pub fn delete(config: &AnalyzerConfig, id: Uuid) -> Result<()> {
    let mut store = open_store(config)?;
    if !store.delete(id)? {
        bail!("No assessment with id {}", id);
    }
    println!("Deleted assessment {}", id);
    Ok(())
}

pub fn models(config: &AnalyzerConfig) -> Result<()> {
    let vision = &config.vision;

    println!();
    println!("Endpoint: {}", vision.endpoint);
    match vision.resolve_api_key() {
        Some(_) => println!("API key:  {} (${})", "set".green(), vision.api_key_env),
        None => println!("API key:  {} (${})", "missing".red(), vision.api_key_env),
    }
    println!("Timeout:  {}s per model", vision.timeout_secs);
    println!();

    if vision.models.is_empty() {
        println!("{}", "No models configured; every analysis will use defaults.".yellow());
    } else {
        println!("Models, in the order they are tried:");
        for (i, model) in vision.models.iter().enumerate() {
            println!("  {}. {}", i + 1, model);
        }
    }
    println!();
    Ok(())
}

pub fn init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    AnalyzerConfig::default()
        .save_to(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
