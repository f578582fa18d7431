use crate::error::{AssemblyError, SoulError};
use crate::soul::markers::find_soul_file;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, Instant};

/// Validate a persona slug for path-safety (§4.1 Step 0, §4.7).
///
/// Trims whitespace, rejects empty input, `..`, path separators, and NUL
/// bytes. Does not touch the filesystem — the caller is responsible for
/// additionally confirming the resolved path stays under the personas root.
pub fn validate_persona_slug(raw: &str) -> Result<String, AssemblyError> {
    let slug = raw.trim();
    if slug.is_empty() {
        return Err(AssemblyError::InvalidPersonaSlug(
            "persona slug is empty".into(),
        ));
    }
    if slug.contains("..") || slug.contains('/') || slug.contains('\\') || slug.contains('\0') {
        return Err(AssemblyError::InvalidPersonaSlug(raw.to_string()));
    }
    Ok(slug.to_string())
}

/// Confirm the slug's resolved soul-file path remains inside `personas_root`
/// (§4.1 Step 0: "the resolved filename must remain inside the personas
/// root").
pub fn resolved_path_is_contained(personas_root: &Path, candidate: &Path) -> bool {
    match (personas_root.canonicalize(), candidate.canonicalize()) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        // if the candidate doesn't exist yet, fall back to a lexical check
        _ => candidate.starts_with(personas_root),
    }
}

static REQUIRED_SECTIONS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("title", Regex::new(r"(?m)^#\s+\S").unwrap()),
        (
            "voice",
            Regex::new(r"(?im)^##\s*(voice|voz)\b").unwrap(),
        ),
        (
            "method",
            Regex::new(r"(?im)^##\s*(method|m[ée]todo|sistema)\b").unwrap(),
        ),
        (
            "invocation",
            Regex::new(r"(?im)^##\s*(invocation|when)\b").unwrap(),
        ),
        (
            "bar-behavior",
            Regex::new(r"(?im)^##\s*bar.behavior\b").unwrap(),
        ),
    ]
});

/// Outcome of `SoulValidator::validate` (§4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(SoulError),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Hash + structural integrity gate, cached 60s per persona (§4.7).
pub struct SoulValidator {
    ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, ValidationOutcome)>>,
}

impl SoulValidator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Validate a persona's soul file against its stored content hash.
    ///
    /// `stored_hash` is the hex-encoded SHA-256 recorded at persona
    /// registration time. Cached for `ttl`; mutating the file invalidates
    /// the result only after the TTL elapses (§8 soul-hash round-trip law).
    pub async fn validate(
        &self,
        personas_root: &Path,
        persona_name: &str,
        stored_hash: &str,
    ) -> ValidationOutcome {
        if let Some((cached_at, outcome)) = self.cache.lock().unwrap().get(persona_name).cloned()
            && cached_at.elapsed() < self.ttl
        {
            return outcome;
        }

        let outcome = Self::validate_uncached(personas_root, persona_name, stored_hash).await;
        self.cache
            .lock()
            .unwrap()
            .insert(persona_name.to_string(), (Instant::now(), outcome.clone()));
        outcome
    }

    async fn validate_uncached(
        personas_root: &Path,
        persona_name: &str,
        stored_hash: &str,
    ) -> ValidationOutcome {
        let Some(content) = find_soul_file(personas_root, persona_name).await else {
            return ValidationOutcome::Invalid(SoulError::NotFound(persona_name.to_string()));
        };

        if content.len() < 100 {
            return ValidationOutcome::Invalid(SoulError::TooShort(content.len()));
        }

        let computed_hash = hex::encode(Sha256::digest(content.as_bytes()));
        if computed_hash != stored_hash {
            return ValidationOutcome::Invalid(SoulError::HashMismatch(persona_name.to_string()));
        }

        for (name, pattern) in REQUIRED_SECTIONS.iter() {
            if !pattern.is_match(&content) {
                return ValidationOutcome::Invalid(SoulError::MissingSection((*name).to_string()));
            }
        }

        ValidationOutcome::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_SOUL: &str = r#"# Hegel

> Being and nothing are the same, yet wholly distinct in their immediacy.

## Voice

Dialectical, patient, relentless.

## Method

Thesis, antithesis, synthesis — the motor of all becoming.

## Invocation

When the conversation turns to contradiction or process.

## Bar-Behavior

Orders bock, argues about the nature of the hangover.
"#;

    fn hash_of(content: &str) -> String {
        hex::encode(Sha256::digest(content.as_bytes()))
    }

    #[test]
    fn slug_validation_rejects_traversal_and_separators() {
        assert!(validate_persona_slug("../etc/passwd").is_err());
        assert!(validate_persona_slug("a/b").is_err());
        assert!(validate_persona_slug("a\\b").is_err());
        assert!(validate_persona_slug("").is_err());
        assert!(validate_persona_slug("  ").is_err());
        assert!(validate_persona_slug("hegel\0").is_err());
        assert_eq!(validate_persona_slug(" hegel ").unwrap(), "hegel");
    }

    #[tokio::test]
    async fn valid_soul_file_passes() {
        let dir = tempfile::tempdir().unwrap();
        let category = dir.path().join("philosophers");
        tokio::fs::create_dir_all(&category).await.unwrap();
        tokio::fs::write(category.join("hegel.md"), VALID_SOUL)
            .await
            .unwrap();

        let validator = SoulValidator::new(Duration::from_secs(60));
        let outcome = validator
            .validate(dir.path(), "hegel", &hash_of(VALID_SOUL))
            .await;
        assert_eq!(outcome, ValidationOutcome::Valid);
    }

    #[tokio::test]
    async fn tampered_byte_invalidates_after_ttl_but_not_before() {
        let dir = tempfile::tempdir().unwrap();
        let category = dir.path().join("philosophers");
        tokio::fs::create_dir_all(&category).await.unwrap();
        let path = category.join("hegel.md");
        tokio::fs::write(&path, VALID_SOUL).await.unwrap();

        let stored_hash = hash_of(VALID_SOUL);
        let validator = SoulValidator::new(Duration::from_millis(20));
        assert_eq!(
            validator.validate(dir.path(), "hegel", &stored_hash).await,
            ValidationOutcome::Valid
        );

        let tampered = VALID_SOUL.replacen("Hegel", "Hegol", 1);
        tokio::fs::write(&path, &tampered).await.unwrap();

        // still cached, so still valid
        assert_eq!(
            validator.validate(dir.path(), "hegel", &stored_hash).await,
            ValidationOutcome::Valid
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        let outcome = validator.validate(dir.path(), "hegel", &stored_hash).await;
        assert!(!outcome.is_valid());
        assert!(matches!(outcome, ValidationOutcome::Invalid(SoulError::HashMismatch(_))));
    }

    #[tokio::test]
    async fn missing_section_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let category = dir.path().join("philosophers");
        tokio::fs::create_dir_all(&category).await.unwrap();
        let content = "# Hegel\n\n".to_string() + &"x".repeat(120);
        tokio::fs::write(category.join("hegel.md"), &content)
            .await
            .unwrap();

        let validator = SoulValidator::new(Duration::from_secs(60));
        let outcome = validator
            .validate(dir.path(), "hegel", &hash_of(&content))
            .await;
        assert!(!outcome.is_valid());
    }

    #[tokio::test]
    async fn too_short_content_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let category = dir.path().join("philosophers");
        tokio::fs::create_dir_all(&category).await.unwrap();
        tokio::fs::write(category.join("hegel.md"), "# Hi")
            .await
            .unwrap();

        let validator = SoulValidator::new(Duration::from_secs(60));
        let outcome = validator
            .validate(dir.path(), "hegel", &hash_of("# Hi"))
            .await;
        assert!(matches!(
            outcome,
            ValidationOutcome::Invalid(SoulError::TooShort(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let validator = SoulValidator::new(Duration::from_secs(60));
        let outcome = validator.validate(dir.path(), "nobody", "deadbeef").await;
        assert!(matches!(
            outcome,
            ValidationOutcome::Invalid(SoulError::NotFound(_))
        ));
    }
}
