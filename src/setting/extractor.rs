use async_trait::async_trait;

/// The external "what is the scene right now" extractor (§1: an LLM call,
/// explicitly out of scope for this pipeline). Only the seam lives here —
/// any real implementation is an operator-supplied adapter wired in at
/// startup, analogous to [`crate::memory::EmbeddingProvider`].
#[async_trait]
pub trait SettingPreferenceExtractor: Send + Sync {
    /// Given the most recent exchange, propose an updated scene and mood.
    /// Returns `None` when the extractor declines to update (e.g. nothing
    /// scene-relevant was said).
    async fn extract(&self, recent_messages: &[String]) -> anyhow::Result<Option<(String, Option<String>)>>;
}

/// Default no-op extractor — the setting layer falls back to whatever is
/// already stored (or the fallback prompt) when no extractor is configured.
pub struct NoopSettingExtractor;

#[async_trait]
impl SettingPreferenceExtractor for NoopSettingExtractor {
    async fn extract(&self, _recent_messages: &[String]) -> anyhow::Result<Option<(String, Option<String>)>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_extractor_never_proposes_a_scene() {
        let extractor = NoopSettingExtractor;
        let result = extractor.extract(&["hello".to_string()]).await.unwrap();
        assert!(result.is_none());
    }
}
