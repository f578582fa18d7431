use super::analyzer::{DriftAnalysis, Severity};
use crate::soul::SoulMarkers;

/// `generate_correction(analysis, persona_name, markers)` (§4.3). Returns
/// `None` when stable or signal-free; otherwise combines templates in the
/// order the spec lists them, wrapped as `[Inner voice: …]`.
pub fn generate_correction(analysis: &DriftAnalysis, persona_name: &str, markers: &SoulMarkers) -> Option<String> {
    if analysis.severity == Severity::Stable {
        return None;
    }

    let mut lines = Vec::new();

    if let Some(first) = analysis.forbidden_hits.first() {
        lines.push(format!("You never say \"{first}\". That is not your way."));
    }

    if analysis.missing_vocabulary.len() > 3 {
        let sample = analysis.missing_vocabulary.join(", ");
        lines.push(format!("Remember your voice includes words like: {sample}"));
    }

    let has_generic_ai = analysis
        .forbidden_hits
        .iter()
        .any(|h| h.contains("ai") || h.contains("language model"));
    if has_generic_ai {
        lines.push(format!("You are {persona_name}. Speak as yourself, not as a helpful assistant."));
    }

    if analysis.severity == Severity::Critical && !analysis.pattern_violations.is_empty() {
        lines.push("Your manner of speaking follows your nature. Stay true to it.".to_string());
    }

    if lines.is_empty() {
        if let Some(tone) = markers.tone_markers.first() {
            lines.push(format!("Maintain your characteristic tone: {tone}"));
        } else {
            return None;
        }
    }

    Some(format!("[Inner voice: {}]", lines.join(" ")))
}
