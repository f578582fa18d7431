use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the context assembly pipeline.
///
/// Each subsystem defines its own error variant. Internal code continues to
/// use `anyhow::Result` for ad-hoc context chains; only operations that cross
/// a module boundary return this typed error.
#[derive(Debug, Error)]
pub enum WeaveError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] DbError),

    #[error("soul: {0}")]
    Soul(#[from] SoulError),

    #[error("memory: {0}")]
    Memory(#[from] MemoryError),

    #[error("drift: {0}")]
    Drift(#[from] DriftError),

    #[error("assembly: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("session completion: {0}")]
    SessionComplete(#[from] SessionCompleteError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("pool exhausted or unavailable: {0}")]
    PoolUnavailable(String),

    #[error("sqlx: {0}")]
    Sqlx(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err.to_string())
    }
}

/// Errors from `validate_soul` (§4.7). `Invalid` is not exceptional — it is
/// the expected outcome for a tampered or incomplete soul file and gates the
/// orchestrator; it does not propagate further up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SoulError {
    #[error("soul file not found for persona {0}")]
    NotFound(String),

    #[error("soul file content hash mismatch for persona {0}")]
    HashMismatch(String),

    #[error("soul file missing required section: {0}")]
    MissingSection(String),

    #[error("soul file too short ({0} bytes)")]
    TooShort(usize),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("storage: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("marker parse failed: {0}")]
    MarkerParse(String),
}

/// Errors produced by `assemble_context`. Per §7, only input-validation
/// failures are raised to the caller — everything else is swallowed inside
/// the orchestrator and degrades the returned context instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("invalid persona slug: {0}")]
    InvalidPersonaSlug(String),
}

#[derive(Debug, Error)]
pub enum SessionCompleteError {
    #[error("transaction failed: {0}")]
    Transaction(String),
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, WeaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = WeaveError::Config(ConfigError::Validation("bad token budget".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn soul_error_hash_mismatch_names_persona() {
        let err = SoulError::HashMismatch("hegel".into());
        assert!(err.to_string().contains("hegel"));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let weave_err: WeaveError = anyhow_err.into();
        assert!(weave_err.to_string().contains("something went wrong"));
    }

    #[test]
    fn assembly_invalid_slug_displays_correctly() {
        let err = AssemblyError::InvalidPersonaSlug("../etc/passwd".into());
        assert!(err.to_string().contains("../etc/passwd"));
    }
}
