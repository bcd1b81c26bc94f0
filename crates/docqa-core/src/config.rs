//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys separated by `__`). Provides helpers to
//! expand `~` and `${VAR}` and to resolve relative paths against a known base
//! directory.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        tracing::debug!(env = %env_name, "configuration sources merged");

        Self::from_figment(figment)
    }

    /// Build from an explicit figment; used by tests and embedders of the library.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingConfig,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        if self.agent.top_k == 0 {
            return Err(Error::InvalidConfig("agent.top_k must be positive".into()));
        }
        if self.generation.timeout_secs == 0 {
            return Err(Error::InvalidConfig("generation.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub vectors_path: String,
    pub metadata_path: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { vectors_path: "data/index/vectors.bin".into(), metadata_path: "data/index/chunks.json".into() }
    }
}

impl IndexSettings {
    pub fn vectors_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.vectors_path) }
    pub fn metadata_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.metadata_path) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Local,
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model_dir: Option<String>,
    pub dimension: usize,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Local, model_dir: None, dimension: 384, max_len: 256, batch_size: 32 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_key_env: String,
    /// When set, `base_url` is an Azure OpenAI resource endpoint and `model`
    /// is the deployment name.
    pub api_version: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".into(),
            api_version: None,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub top_k: usize,
    pub max_citations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self { Self { top_k: 5, max_citations: 3 } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Config::from_toml_str("").expect("config").settings().expect("settings");
        assert_eq!(settings.chunking.target_len, 2000);
        assert_eq!(settings.chunking.overlap, 200);
        assert_eq!(settings.agent.top_k, 5);
        assert_eq!(settings.agent.max_citations, 3);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Local);
        assert!(settings.generation.api_version.is_none());
    }

    #[test]
    fn toml_overrides_nested_keys() {
        let config = Config::from_toml_str(
            "[chunking]\ntarget_len = 500\noverlap = 50\n[embedding]\nprovider = \"fake\"\n",
        )
        .expect("config");
        let settings = config.settings().expect("settings");
        assert_eq!(settings.chunking.target_len, 500);
        assert_eq!(settings.chunking.overlap, 50);
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Fake);
        assert_eq!(config.get::<usize>("agent.top_k").expect("top_k"), 5);
    }

    #[test]
    fn overlap_larger_than_target_is_rejected() {
        let err = Config::from_toml_str("[chunking]\ntarget_len = 100\noverlap = 150\n").err().expect("must fail");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/docqa");
        assert_eq!(resolve_with_base(base, "data/x.bin"), PathBuf::from("/srv/docqa/data/x.bin"));
        assert_eq!(resolve_with_base(base, "/abs/x.bin"), PathBuf::from("/abs/x.bin"));
    }
}
