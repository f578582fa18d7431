use super::data::BLEED_SOURCE_STRINGS;
use rand::seq::SliceRandom;
use rand::Rng;

const ACTIVE_FLOOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

/// Severity bands (§4.6): MINOR <0.7, MODERATE <0.9, SEVERE ≥0.9.
pub fn severity_for(entropy_level: f64) -> Severity {
    if entropy_level < 0.7 {
        Severity::Minor
    } else if entropy_level < 0.9 {
        Severity::Moderate
    } else {
        Severity::Severe
    }
}

fn line_count(severity: Severity) -> usize {
    match severity {
        Severity::Minor => 1,
        Severity::Moderate => 2,
        Severity::Severe => 3,
    }
}

fn redact(s: &str) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    let mut rng = rand::rng();
    words
        .iter()
        .map(|w| if rng.random_bool(0.3) { "█".repeat(w.len().max(3)) } else { (*w).to_string() })
        .collect::<Vec<_>>()
        .join(" ")
}

fn zalgo(s: &str) -> String {
    const COMBINING: &[char] = &['\u{0301}', '\u{0316}', '\u{0360}', '\u{0489}'];
    let mut rng = rand::rng();
    s.chars()
        .flat_map(|c| {
            let mut out = vec![c];
            if rng.random_bool(0.4) {
                out.push(*COMBINING.choose(&mut rng).unwrap());
            }
            out
        })
        .collect()
}

fn hex_inject(s: &str) -> String {
    let mut rng = rand::rng();
    let position = rng.random_range(0..=s.len());
    let (head, tail) = s.split_at(position.min(s.len()));
    format!("{head} 0x{:04X} {tail}", rng.random_range(0..=0xFFFF_u32))
}

fn truncate(s: &str) -> String {
    let cut = (s.len() / 2).max(3);
    format!("{}—", &s[..cut.min(s.len())])
}

/// Corrupt a source string using one of the four corruption modes,
/// chosen deterministically by the caller-provided index so repeated
/// calls in one bleed batch don't collide.
fn corrupt(s: &str, mode: usize) -> String {
    match mode % 4 {
        0 => redact(s),
        1 => zalgo(s),
        2 => hex_inject(s),
        _ => truncate(s),
    }
}

/// Emit 1-3 bleed strings scaled by severity, or `None` below the
/// active floor (§4.6).
pub fn generate(entropy_level: f64) -> Option<Vec<String>> {
    if entropy_level < ACTIVE_FLOOR {
        return None;
    }

    let severity = severity_for(entropy_level);
    let count = line_count(severity);
    let mut rng = rand::rng();

    Some(
        (0..count)
            .map(|i| {
                let source = BLEED_SOURCE_STRINGS.choose(&mut rng).unwrap();
                corrupt(source, i + rng.random_range(0..4))
            })
            .collect(),
    )
}
