use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.is_empty()
        {
            self.database_url = url;
        }

        if let Ok(key) = std::env::var("EMBEDDING_API_KEY")
            && !key.is_empty()
        {
            self.embedding_api_key = Some(key);
        }

        if let Ok(root) = std::env::var("PERSONAS_ROOT")
            && !root.is_empty()
        {
            self.personas_root = PathBuf::from(root);
        }

        if let Ok(tokens_str) = std::env::var("DEFAULT_MAX_TOKENS")
            && let Ok(tokens) = tokens_str.parse::<u32>()
        {
            self.default_max_tokens = tokens;
        }

        if let Ok(ttl_str) = std::env::var("SOUL_CACHE_TTL_SECS")
            && let Ok(ttl) = ttl_str.parse::<u64>()
        {
            self.soul_cache_ttl_secs = ttl;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn database_url_override_applies() {
        let _guard = ENV_LOCK.lock().unwrap();
        // SAFETY: serialized by ENV_LOCK; no other thread in this test binary
        // mutates these specific variables concurrently.
        unsafe {
            std::env::set_var("DATABASE_URL", "sqlite://overridden.db");
        }
        let mut cfg = Config::default();
        cfg.apply_env_overrides();
        assert_eq!(cfg.database_url, "sqlite://overridden.db");
        unsafe {
            std::env::remove_var("DATABASE_URL");
        }
    }
}
