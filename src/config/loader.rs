//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/planforge/config.toml)
//! 3. Project config (./planforge.toml)
//! 4. Environment variables (PLANFORGE_* prefix)

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::types::Config;
use crate::types::{PlanError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!("Loading global config from: {}", global_path.display());
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. PLANFORGE_LLM_MODEL -> llm.model
        figment = figment.merge(Env::prefixed("PLANFORGE_").split('_').lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| PlanError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| PlanError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Path to the global config file (~/.config/planforge/config.toml)
    pub fn global_config_path() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("planforge").join("config.toml"))
    }

    /// Path to the project config file
    pub fn project_config_path() -> PathBuf {
        PathBuf::from("planforge.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[llm]
provider = "gemini"
model = "gemini-2.0-flash"

[rag]
chunk_size = 500
chunk_overlap = 50
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        // Untouched sections keep their defaults.
        assert_eq!(config.index.backend, "memory");
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[rag]
chunk_size = 100
chunk_overlap = 100
"#
        )
        .unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("PLANFORGE_LLM_MODEL", "test-model");
        let config = ConfigLoader::load().unwrap();
        assert_eq!(config.llm.model.as_deref(), Some("test-model"));
        std::env::remove_var("PLANFORGE_LLM_MODEL");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::load_from_file(Path::new("/nonexistent/planforge.toml")).unwrap();
        assert_eq!(config.llm.provider, "openai");
    }
}
