use super::forbidden::{matching_phrases, UNIVERSAL_FORBIDDEN_PHRASES};
use crate::soul::{is_diacritic, SoulMarkers};

const DIAGNOSTIC_CAP: usize = 10;
const MIN_RESPONSE_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Stable,
    Minor,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct DriftAnalysis {
    pub score: f64,
    pub severity: Severity,
    pub warnings: Vec<String>,
    pub forbidden_hits: Vec<String>,
    pub missing_vocabulary: Vec<String>,
    pub pattern_violations: Vec<String>,
}

impl DriftAnalysis {
    fn stable(warning: Option<&str>) -> Self {
        Self {
            score: 0.0,
            severity: Severity::Stable,
            warnings: warning.into_iter().map(String::from).collect(),
            forbidden_hits: Vec::new(),
            missing_vocabulary: Vec::new(),
            pattern_violations: Vec::new(),
        }
    }
}

/// `severity(score, T)` — `T` default 0.3 (§4.3).
pub fn classify_severity(score: f64, threshold: f64) -> Severity {
    if score <= 0.1 {
        Severity::Stable
    } else if score <= threshold {
        Severity::Minor
    } else if score <= threshold + 0.2 {
        Severity::Warning
    } else {
        Severity::Critical
    }
}

/// `analyze(response, persona_id)` (§4.3). `drift_check_enabled` and
/// `severity_threshold` are per-persona configuration the caller resolves
/// before invoking this pure function.
pub fn analyze(
    response: &str,
    markers: &SoulMarkers,
    drift_check_enabled: bool,
    severity_threshold: f64,
) -> DriftAnalysis {
    if response.chars().count() < MIN_RESPONSE_CHARS {
        return DriftAnalysis::stable(Some("insufficient_content"));
    }
    if !drift_check_enabled {
        return DriftAnalysis::stable(None);
    }

    let lower = response.to_lowercase();
    let mut score = 0.0;

    let persona_phrases: Vec<&str> = markers.forbidden_phrases.iter().map(String::as_str).collect();
    let persona_hits = matching_phrases(&lower, &persona_phrases);
    score += 0.3 * persona_hits.len() as f64;

    let universal_hits = matching_phrases(&lower, UNIVERSAL_FORBIDDEN_PHRASES);
    score += 0.15 * universal_hits.len() as f64;

    let mut forbidden_hits: Vec<String> = persona_hits
        .iter()
        .chain(universal_hits.iter())
        .map(|s| (*s).to_string())
        .collect();
    forbidden_hits.truncate(DIAGNOSTIC_CAP);

    let missing_vocabulary: Vec<String> = if markers.vocabulary.is_empty() {
        Vec::new()
    } else {
        let present = markers
            .vocabulary
            .iter()
            .filter(|term| lower.contains(&term.to_lowercase()))
            .count();
        let ratio = present as f64 / markers.vocabulary.len() as f64;
        if ratio < 0.3 {
            let penalty = ((0.3 - ratio) * 0.5).min(0.15);
            score += penalty;
            markers
                .vocabulary
                .iter()
                .filter(|term| !lower.contains(&term.to_lowercase()))
                .take(DIAGNOSTIC_CAP)
                .cloned()
                .collect()
        } else {
            Vec::new()
        }
    };

    let mut pattern_violations = Vec::new();
    if markers.patterns.uses_em_dashes && !response.contains('—') {
        pattern_violations.push("uses_em_dashes".to_string());
    }
    if markers.patterns.uses_special_characters && !response.chars().any(is_diacritic) {
        pattern_violations.push("uses_special_characters".to_string());
    }
    score += 0.1 * pattern_violations.len() as f64;
    pattern_violations.truncate(DIAGNOSTIC_CAP);

    let score = score.min(1.0);
    let severity = classify_severity(score, severity_threshold);

    let mut warnings = Vec::new();
    if matches!(severity, Severity::Warning | Severity::Critical) {
        warnings.push(format!("{severity:?} drift detected").to_lowercase());
    }

    DriftAnalysis {
        score,
        severity,
        warnings,
        forbidden_hits,
        missing_vocabulary,
        pattern_violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soul::markers::PatternSignals;

    fn markers_with_vocab(vocab: &[&str]) -> SoulMarkers {
        SoulMarkers {
            vocabulary: vocab.iter().map(|s| s.to_string()).collect(),
            tone_markers: Vec::new(),
            patterns: PatternSignals::default(),
            forbidden_phrases: Vec::new(),
        }
    }

    #[test]
    fn short_response_short_circuits_stable() {
        let analysis = analyze("hi", &SoulMarkers::default(), true, 0.3);
        assert_eq!(analysis.severity, Severity::Stable);
        assert!(analysis.warnings.contains(&"insufficient_content".to_string()));
    }

    #[test]
    fn disabled_check_short_circuits_stable() {
        let analysis = analyze(
            "As an AI, I'd be happy to help with that question.",
            &SoulMarkers::default(),
            false,
            0.3,
        );
        assert_eq!(analysis.score, 0.0);
    }

    #[test]
    fn universal_forbidden_phrase_raises_score() {
        let analysis = analyze(
            "As an AI language model, I'd be happy to assist you today.",
            &SoulMarkers::default(),
            true,
            0.3,
        );
        assert!(analysis.score > 0.0);
    }

    #[test]
    fn missing_vocabulary_penalizes_when_below_threshold() {
        let markers = markers_with_vocab(&["aufhebung", "geist", "sublation", "dialectic"]);
        let analysis = analyze("A perfectly ordinary response about the weather today.", &markers, true, 0.3);
        assert!(!analysis.missing_vocabulary.is_empty());
    }

    #[test]
    fn severity_thresholds_match_spec() {
        assert_eq!(classify_severity(0.05, 0.3), Severity::Stable);
        assert_eq!(classify_severity(0.1, 0.3), Severity::Stable);
        assert_eq!(classify_severity(0.2, 0.3), Severity::Minor);
        assert_eq!(classify_severity(0.3, 0.3), Severity::Minor);
        assert_eq!(classify_severity(0.45, 0.3), Severity::Warning);
        assert_eq!(classify_severity(0.5, 0.3), Severity::Warning);
        assert_eq!(classify_severity(0.51, 0.3), Severity::Critical);
    }
}
