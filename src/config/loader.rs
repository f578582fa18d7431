use super::Config;
use crate::error::{ConfigError, Result, WeaveError};
use directories::ProjectDirs;
use std::fs;

impl Config {
    /// Load config from the platform config directory, creating it with
    /// defaults on first run. Mirrors the teacher's `load_or_init` shape:
    /// resolve a directory, read-or-create a TOML file, apply env overrides.
    pub fn load_or_init() -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "context-weave", "context-weave").ok_or_else(|| {
            WeaveError::Config(ConfigError::Load("could not resolve config directory".into()))
        })?;
        let config_dir = dirs.config_dir().to_path_buf();
        let config_path = config_dir.join("config.toml");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).map_err(ConfigError::Io)?;
        }

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(ConfigError::Io)?;
            toml::from_str(&contents)
                .map_err(|e| WeaveError::Config(ConfigError::Load(e.to_string())))?
        } else {
            Config::default()
        };

        config.config_path = config_path;
        config.apply_env_overrides();
        config.validate()?;

        if !config.config_path.exists() {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| WeaveError::Config(ConfigError::Load(e.to_string())))?;
        fs::write(&self.config_path, toml_str).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// Basic shape validation — not exhaustive, just guards against the
    /// obviously-wrong values that would otherwise silently misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(WeaveError::Config(ConfigError::Validation(
                "database_url must not be empty".into(),
            )));
        }
        if self.default_max_tokens == 0 {
            return Err(WeaveError::Config(ConfigError::Validation(
                "default_max_tokens must be greater than zero".into(),
            )));
        }
        if !(0.0..=1.0).contains(&self.preterite_surface_probability) {
            return Err(WeaveError::Config(ConfigError::Validation(
                "preterite_surface_probability must be in [0,1]".into(),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_database_url() {
        let mut cfg = Config {
            database_url: String::new(),
            ..Config::default()
        };
        cfg.config_path = std::env::temp_dir().join("context-weave-test.toml");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }
}
