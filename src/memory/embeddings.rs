use async_trait::async_trait;
use std::time::Duration;

/// Text-to-vector provider seam (§4.2 Storage/Retrieval). Embeddings are
/// always optional — every caller must tolerate `None`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut results = self.embed(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("empty embedding result"))
    }
}

/// Falls back to keyword-only retrieval — the default when no
/// `embedding_api_key` is configured (§6, §8 Scenario F).
pub struct NoopEmbedding;

#[async_trait]
impl EmbeddingProvider for NoopEmbedding {
    fn name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        0
    }

    async fn embed(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(Vec::new())
    }
}

/// OpenAI-compatible embeddings endpoint.
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    embeddings_url: String,
    auth_header: String,
    model: String,
    dims: usize,
}

impl OpenAiEmbedding {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            embeddings_url: "https://api.openai.com/v1/embeddings".to_string(),
            auth_header: format!("Bearer {api_key}"),
            model: "text-embedding-3-small".to_string(),
            dims: crate::memory::model::EMBEDDING_DIMENSIONS,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({ "model": self.model, "input": texts });
        let resp = self
            .client
            .post(&self.embeddings_url)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("embedding request failed: {e}"))?;

        if !resp.status().is_success() {
            anyhow::bail!("embedding API error {}", resp.status());
        }

        let json: serde_json::Value = resp.json().await?;
        let data = json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| anyhow::anyhow!("invalid embedding response: missing data"))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let embedding = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .ok_or_else(|| anyhow::anyhow!("invalid embedding item"))?;
            let vec: Vec<f32> = embedding
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            embeddings.push(vec);
        }
        Ok(embeddings)
    }
}

pub fn create_embedding_provider(api_key: Option<&str>) -> std::sync::Arc<dyn EmbeddingProvider> {
    match api_key {
        Some(key) if !key.trim().is_empty() => std::sync::Arc::new(OpenAiEmbedding::new(key)),
        _ => std::sync::Arc::new(NoopEmbedding),
    }
}

/// §4.2 Storage: content under 10 chars never attempts an embedding;
/// generation failures degrade to `None` rather than propagating.
pub async fn try_embed(provider: &dyn EmbeddingProvider, content: &str) -> Option<Vec<f32>> {
    if content.trim().chars().count() < 10 {
        return None;
    }
    let truncated: String = content.chars().take(8000).collect();
    match provider.embed_one(&truncated).await {
        Ok(v) if !v.is_empty() => Some(v),
        _ => None,
    }
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

#[cfg(test)]
pub(crate) struct DeterministicEmbedding {
    dims: usize,
    seed: u64,
}

#[cfg(test)]
impl DeterministicEmbedding {
    pub(crate) fn new(dims: usize) -> Self {
        Self { dims, seed: 0 }
    }

    fn fnv1a64(seed: u64, bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ seed;
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash
    }

    fn splitmix64(mut x: u64) -> u64 {
        x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = x;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn u64_to_unit_f32(x: u64) -> f32 {
        const U24_MAX: f32 = ((1u32 << 24) - 1) as f32;
        let top_u24 = (x >> 40) as u32;
        (top_u24 as f32 / U24_MAX) * 2.0 - 1.0
    }
}

#[cfg(test)]
#[async_trait]
impl EmbeddingProvider for DeterministicEmbedding {
    fn name(&self) -> &str {
        "deterministic_test"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for &t in texts {
            let base = Self::fnv1a64(self.seed, t.as_bytes());
            let mut v = Vec::with_capacity(self.dims);
            for i in 0..self.dims {
                v.push(Self::u64_to_unit_f32(Self::splitmix64(base ^ (i as u64))));
            }
            out.push(v);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_none_without_key() {
        let p = create_embedding_provider(None);
        assert_eq!(p.name(), "none");
    }

    #[test]
    fn factory_openai_with_key() {
        let p = create_embedding_provider(Some("sk-test"));
        assert_eq!(p.name(), "openai");
        assert_eq!(p.dimensions(), 1536);
    }

    #[tokio::test]
    async fn try_embed_rejects_short_content() {
        let p = NoopEmbedding;
        assert!(try_embed(&p, "short").await.is_none());
    }

    #[tokio::test]
    async fn try_embed_degrades_on_provider_failure() {
        let p = NoopEmbedding;
        assert!(try_embed(&p, "this content is long enough to attempt").await.is_none());
    }

    #[tokio::test]
    async fn deterministic_embedder_is_stable() {
        let p = DeterministicEmbedding::new(8);
        let a = p.embed_one("hello world").await.unwrap();
        let b = p.embed_one("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn cosine_distance_identical_vectors_is_zero() {
        let a = vec![1.0_f32, 0.0, 0.0];
        assert!(cosine_distance(&a, &a) < 1e-6);
    }

    #[test]
    fn cosine_distance_orthogonal_vectors_is_one() {
        let a = vec![1.0_f32, 0.0];
        let b = vec![0.0_f32, 1.0];
        assert!((cosine_distance(&a, &b) - 1.0).abs() < 1e-6);
    }
}
