use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex};

/// Derived boolean signals a persona's soul file implies about its voice
/// (§4.3). Checked against a response during drift analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSignals {
    pub uses_special_characters: bool,
    pub uses_em_dashes: bool,
}

/// Voice markers extracted from a persona's soul markdown file (§4.3).
#[derive(Debug, Clone, Default)]
pub struct SoulMarkers {
    pub vocabulary: Vec<String>,
    pub tone_markers: Vec<String>,
    pub patterns: PatternSignals,
    /// Per-persona forbidden phrases; initially empty (§4.3).
    pub forbidden_phrases: Vec<String>,
}

static BOLD_TERM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]{1,60})\*\*").unwrap());
static CODE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n]*\n(.*?)```").unwrap());
static UPPER_LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Z0-9 _\-]{1,39})\s*:?.*$").unwrap());
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\|\s*([^|]{1,40})\s*\|").unwrap());
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>\s*(.+)$").unwrap());
static EM_DASH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"—").unwrap());

/// Diacritic ranges used for `uses_special_characters` — combining marks and
/// the Latin-1/Latin Extended-A accented letter blocks.
pub(crate) fn is_diacritic(ch: char) -> bool {
    let c = ch as u32;
    (0x0300..=0x036F).contains(&c) // combining diacritical marks
        || (0x00C0..=0x00FF).contains(&c) // Latin-1 accented letters
        || (0x0100..=0x017F).contains(&c) // Latin Extended-A
}

/// Parse a persona's soul markdown content into voice markers.
///
/// This is pure data extraction — it never fails; a file with none of the
/// expected shapes simply yields empty lists (consistent with the
/// file-not-found case handled by the loader).
pub fn parse_soul_markers(content: &str) -> SoulMarkers {
    let mut vocabulary = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut push_vocab = |term: &str| {
        let trimmed = term.trim();
        if !trimmed.is_empty() && seen.insert(trimmed.to_string()) {
            vocabulary.push(trimmed.to_string());
        }
    };

    for caps in BOLD_TERM.captures_iter(content) {
        push_vocab(&caps[1]);
    }

    for block in CODE_BLOCK.captures_iter(content) {
        for line in block[1].lines() {
            let trimmed = line.trim();
            if trimmed.len() >= 2
                && trimmed.len() <= 40
                && trimmed.chars().all(|c| c.is_ascii_uppercase() || c.is_whitespace() || c == '_' || c == '-')
                && trimmed.chars().any(|c| c.is_ascii_uppercase())
            {
                push_vocab(trimmed);
            } else if UPPER_LABEL_LINE.is_match(trimmed) && trimmed.len() <= 40 {
                push_vocab(trimmed);
            }
        }
    }

    for line in content.lines() {
        if let Some(caps) = TABLE_ROW.captures(line.trim()) {
            let key = caps[1].trim();
            if !key.is_empty() && key.chars().all(|c| c != '-') {
                push_vocab(key);
            }
        }
    }

    if let Some(caps) = BLOCKQUOTE.captures_iter(content).next() {
        push_vocab(&caps[1]);
    }

    let tone_markers = extract_tone_markers(content);
    let patterns = PatternSignals {
        uses_special_characters: content.chars().filter(|c| is_diacritic(*c)).count() > 10,
        uses_em_dashes: EM_DASH.find_iter(content).count() > 3,
    };

    SoulMarkers {
        vocabulary,
        tone_markers,
        patterns,
        forbidden_phrases: Vec::new(),
    }
}

/// Comma/period-separated descriptors from the first paragraph of a
/// voice/bar section, length < 80 (§4.3).
fn extract_tone_markers(content: &str) -> Vec<String> {
    let voice_heading = Regex::new(r"(?im)^#{1,3}\s*(voice|voz|bar.behavior)\b.*$").unwrap();
    let Some(heading_match) = voice_heading.find(content) else {
        return Vec::new();
    };
    let after = &content[heading_match.end()..];
    let first_paragraph = after
        .split("\n\n")
        .find(|p| !p.trim().is_empty())
        .unwrap_or("");

    first_paragraph
        .split(['.', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() < 80)
        .map(str::to_string)
        .collect()
}

/// Forever-cached per-persona marker store (§5 — "written once, read-mostly;
/// races on first write are idempotent since the content is the same").
pub struct MarkerCache {
    inner: Mutex<HashMap<String, Arc<SoulMarkers>>>,
}

impl Default for MarkerCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Load a persona's markers, searching lazily across subdirectories
    /// under `personas_root` for `<persona_name>.md` (§4.3). Returns empty
    /// markers — not an error — when the file is missing, so universal drift
    /// checks still run.
    pub async fn get_or_load(&self, personas_root: &Path, persona_name: &str) -> Arc<SoulMarkers> {
        if let Some(cached) = self.inner.lock().unwrap().get(persona_name).cloned() {
            return cached;
        }

        let markers = match find_soul_file(personas_root, persona_name).await {
            Some(content) => parse_soul_markers(&content),
            None => SoulMarkers::default(),
        };
        let markers = Arc::new(markers);

        // Idempotent: whichever caller wins the race, the content is the same.
        self.inner
            .lock()
            .unwrap()
            .entry(persona_name.to_string())
            .or_insert_with(|| markers.clone());
        markers
    }
}

/// Walk `personas_root/<category>/<persona_name>.md` for any category
/// directory (§6 persistence layout).
pub(crate) async fn find_soul_file(personas_root: &Path, persona_name: &str) -> Option<String> {
    let mut entries = tokio::fs::read_dir(personas_root).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_dir() {
            let candidate = path.join(format!("{persona_name}.md"));
            if let Ok(content) = tokio::fs::read_to_string(&candidate).await {
                return Some(content);
            }
        }
    }
    // also check directly under the root, for flat layouts
    let flat = personas_root.join(format!("{persona_name}.md"));
    tokio::fs::read_to_string(&flat).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# Hegel

> Being and nothing are the same.

## Voice

Dialectical, patient, relentless. Fond of negation, synthesis, and the long view.

## Method

```
AUFHEBUNG
AN SICH
```

| Term | Meaning |
|------|---------|
| Geist | spirit |

This uses em dashes — here — and here — and here — and again —.
"#;

    #[test]
    fn extracts_bold_code_table_and_blockquote_vocabulary() {
        let markers = parse_soul_markers(SAMPLE);
        assert!(markers.vocabulary.iter().any(|v| v == "AUFHEBUNG"));
        assert!(markers.vocabulary.iter().any(|v| v == "Geist"));
        assert!(markers
            .vocabulary
            .iter()
            .any(|v| v.contains("Being and nothing")));
    }

    #[test]
    fn extracts_tone_markers_from_voice_section() {
        let markers = parse_soul_markers(SAMPLE);
        assert!(markers.tone_markers.iter().any(|t| t == "Dialectical"));
        assert!(markers.tone_markers.iter().any(|t| t.contains("patient")));
    }

    #[test]
    fn em_dash_pattern_flips_above_threshold() {
        let markers = parse_soul_markers(SAMPLE);
        assert!(markers.patterns.uses_em_dashes);
    }

    #[test]
    fn missing_file_yields_empty_markers() {
        let markers = SoulMarkers::default();
        assert!(markers.vocabulary.is_empty());
        assert!(markers.tone_markers.is_empty());
        assert!(!markers.patterns.uses_em_dashes);
    }

    #[tokio::test]
    async fn cache_returns_same_instance_on_repeat_load() {
        let dir = tempfile::tempdir().unwrap();
        let category = dir.path().join("philosophers");
        tokio::fs::create_dir_all(&category).await.unwrap();
        tokio::fs::write(category.join("hegel.md"), SAMPLE)
            .await
            .unwrap();

        let cache = MarkerCache::new();
        let first = cache.get_or_load(dir.path(), "hegel").await;
        let second = cache.get_or_load(dir.path(), "hegel").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.vocabulary.is_empty());
    }

    #[tokio::test]
    async fn missing_persona_file_caches_empty_markers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new();
        let markers = cache.get_or_load(dir.path(), "nobody").await;
        assert!(markers.vocabulary.is_empty());
    }
}
