//! Output formatting - ASCII-only terminal output

use owo_colors::OwoColorize;
use pavement_common::{
    AnalysisTier, Assessment, FieldSource, OverallCondition, Provenance,
};

const SEPARATOR: &str = "------------------------------------------------------------";

/// Condition word in its display colour
pub fn colored_condition(condition: OverallCondition) -> String {
    paint_condition(condition, condition.label())
}

fn paint_condition(condition: OverallCondition, text: &str) -> String {
    let (r, g, b) = hex_rgb(condition.color());
    text.truecolor(r, g, b).bold().to_string()
}

/// `#rrggbb` -> (r, g, b); malformed input renders grey
fn hex_rgb(hex: &str) -> (u8, u8, u8) {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0x80)
    };
    (channel(0), channel(2), channel(4))
}

fn tier_tag(tier: AnalysisTier) -> String {
    match tier {
        AnalysisTier::Json => "[MODEL]".bright_green().to_string(),
        AnalysisTier::TextScan => "[PARTIAL]".yellow().to_string(),
        AnalysisTier::HardDefault => "[DEFAULT]".bright_red().to_string(),
    }
}

fn source_mark(source: FieldSource) -> String {
    match source {
        FieldSource::Parsed => String::new(),
        FieldSource::Defaulted => " (default)".dimmed().to_string(),
    }
}

/// Full detail view of one assessment
pub fn display_assessment(assessment: &Assessment) {
    let r = &assessment.result;
    let p: &Provenance = &assessment.provenance;

    println!();
    println!("{}  {}", tier_tag(assessment.tier), assessment.id.to_string().dimmed());
    println!("{}", SEPARATOR.dimmed());
    println!(
        "  Condition:   {}{}",
        colored_condition(r.overall_condition),
        source_mark(p.overall_condition)
    );
    println!(
        "  Distress:    {}{}",
        r.distress_type.label(),
        source_mark(p.distress_type)
    );
    println!(
        "  Severity:    {:.1}{}",
        r.severity_score,
        source_mark(p.severity_score)
    );
    println!(
        "  Cracking:    {:.1}%{}",
        r.crack_density,
        source_mark(p.crack_density)
    );
    println!(
        "  Confidence:  {:.1}{}",
        r.confidence_level,
        source_mark(p.confidence_level)
    );
    println!("{}", SEPARATOR.dimmed());
    println!("  Image:       {}", assessment.image_path.display());
    println!(
        "  Uploaded:    {}",
        assessment.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if !assessment.location.is_empty() {
        println!("  Location:    {}", assessment.location);
    }
    if !assessment.notes.is_empty() {
        println!("  Notes:       {}", assessment.notes);
    }
    if !assessment.ai_description.is_empty() {
        println!("  Description: {}", assessment.ai_description);
    }
    println!(
        "  Model:       {}",
        assessment.model.as_deref().unwrap_or("none")
    );
    println!("  Method:      {}", assessment.tier);
    println!();
}

/// One line per assessment, newest first
pub fn display_history(assessments: &[&Assessment]) {
    if assessments.is_empty() {
        println!("No assessments yet. Run `pavectl analyze <IMAGE>` to add one.");
        return;
    }

    println!();
    for a in assessments {
        println!(
            "  {}  {}  {}  {:<24}  {}",
            a.uploaded_at.format("%Y-%m-%d"),
            a.id.to_string().dimmed(),
            paint_condition(a.condition(), &format!("{:<10}", a.condition().label())),
            a.distress().label(),
            a.location
        );
    }
    println!();
}

/// Display an error
pub fn display_error(message: &str) {
    eprintln!();
    eprintln!("[ERROR] {}", message.red());
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#10b981"), (0x10, 0xb9, 0x81));
        assert_eq!(hex_rgb("#991b1b"), (0x99, 0x1b, 0x1b));
        assert_eq!(hex_rgb("#zz"), (0x80, 0x80, 0x80));
    }

    #[test]
    fn test_colored_condition_keeps_label() {
        assert!(colored_condition(OverallCondition::Critical).contains("Critical"));
    }
}
