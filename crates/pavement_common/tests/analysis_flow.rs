//! End-to-end analysis flow: image on disk -> model loop -> history

use pavement_common::{
    AnalysisTier, Assessment, AssessmentStore, DistressType, FakeVisionClient, OverallCondition,
    PavementAnalyzer, VisionError, VisionSettings, HARD_DEFAULT,
};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

fn write_png(path: &Path) {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([60, 60, 60]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    std::fs::write(path, out.into_inner()).unwrap();
}

fn settings(models: &[&str]) -> VisionSettings {
    VisionSettings {
        models: models.iter().map(|m| m.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn fenced_json_from_fallback_model_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("street.png");
    write_png(&image_path);

    let fake = Arc::new(FakeVisionClient::new(vec![
        Err(VisionError::Http("connection reset".to_string())),
        Ok("```json\n{\"overall_condition\": \"Poor\", \"distress_type\": \"longitudinal\", \"severity_score\": 64, \"crack_density\": \"18.5\", \"confidence_level\": 77}\n```".to_string()),
    ]));
    let analyzer = PavementAnalyzer::new(
        settings(&["gemini-2.5-pro", "gemini-2.5-flash"]),
        Some("test-key".to_string()),
        Box::new(Arc::clone(&fake)),
    );

    let outcome = analyzer.analyze_image(&image_path);
    assert_eq!(outcome.model.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(outcome.analysis.tier, AnalysisTier::Json);
    assert_eq!(outcome.result().overall_condition, OverallCondition::Poor);
    assert_eq!(outcome.result().distress_type, DistressType::Longitudinal);
    assert_eq!(outcome.result().crack_density, 18.5);
    assert!(outcome.analysis.provenance.is_fully_parsed());
    assert_eq!(fake.calls(), vec!["gemini-2.5-pro", "gemini-2.5-flash"]);

    let history = dir.path().join("history.json");
    let mut store = AssessmentStore::open(&history).unwrap();
    let assessment = Assessment::from_outcome(&image_path, "5th Ave", "after winter", &outcome);
    let id = assessment.id;
    store.add(assessment).unwrap();

    let reopened = AssessmentStore::open(&history).unwrap();
    let saved = reopened.get(id).unwrap();
    assert_eq!(saved.condition(), OverallCondition::Poor);
    assert_eq!(saved.location, "5th Ave");
    assert_eq!(saved.model.as_deref(), Some("gemini-2.5-flash"));
}

#[test]
fn missing_credential_never_touches_client_or_image() {
    let fake = Arc::new(FakeVisionClient::always_text("critical pothole"));
    let analyzer = PavementAnalyzer::new(settings(&["gemini-pro"]), None, Box::new(Arc::clone(&fake)));

    // The path does not exist; the credential check comes first
    let outcome = analyzer.analyze_image("/nonexistent/road.jpg");
    assert_eq!(*outcome.result(), HARD_DEFAULT);
    assert_eq!(outcome.analysis.tier, AnalysisTier::HardDefault);
    assert!(outcome.processed);
    assert_eq!(fake.call_count(), 0);
}

#[test]
fn free_text_answer_uses_text_scan() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("lane.png");
    write_png(&image_path);

    let analyzer = PavementAnalyzer::new(
        settings(&["gemini-2.5-flash"]),
        Some("test-key".to_string()),
        Box::new(FakeVisionClient::always_text(
            "The surface shows severe alligator cracking, confidence_level: 88",
        )),
    );

    let outcome = analyzer.analyze_image(&image_path);
    assert_eq!(outcome.analysis.tier, AnalysisTier::TextScan);
    assert_eq!(outcome.result().distress_type, DistressType::Alligator);
    assert_eq!(outcome.result().confidence_level, 88.0);
    assert_eq!(outcome.result().overall_condition, OverallCondition::Fair);
    assert_eq!(outcome.result().severity_score, 50.0);
}
