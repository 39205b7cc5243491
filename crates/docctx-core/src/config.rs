//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! The `[retrieval]` section is extracted into [`RetrievalSettings`], which is
//! validated before any component is built from it.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(Path::new("."), &env_name)
    }

    /// Load `config.toml` and the environment overlay from `dir`.
    pub fn load_for_env(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(RetrievalSettings::default()).key("retrieval"))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(self.figment.extract_inner(key)?)
    }

    /// The validated `[retrieval]` section.
    pub fn retrieval(&self) -> Result<RetrievalSettings> {
        let settings: RetrievalSettings = self.get("retrieval")?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Token estimator backend selected by configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    Heuristic,
    #[default]
    Tiktoken,
    #[serde(alias = "hf")]
    Huggingface,
}

impl std::str::FromStr for EstimatorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "chars" => Ok(Self::Heuristic),
            "tiktoken" | "bpe" => Ok(Self::Tiktoken),
            "huggingface" | "hf" => Ok(Self::Huggingface),
            other => Err(Error::InvalidConfig(format!("unknown token estimator '{other}'"))),
        }
    }
}

/// Knobs consumed by the retrieval and assembly pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub lexical_weight: f32,
    pub token_budget: usize,
    pub chars_per_token: usize,
    pub excerpt_chars: usize,
    /// Line cuts closer to the window start than this fraction fall back to a hard cut.
    pub newline_floor: f32,
    pub path_timeout_ms: u64,
    pub model: String,
    pub fallback_model: String,
    pub estimator: EstimatorKind,
    pub tokenizer_path: Option<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 12,
            lexical_weight: 0.3,
            token_budget: 6000,
            chars_per_token: 4,
            excerpt_chars: 250,
            newline_floor: 0.5,
            path_timeout_ms: 5000,
            model: "gpt-4o".to_string(),
            fallback_model: "gpt-4o-mini".to_string(),
            estimator: EstimatorKind::default(),
            tokenizer_path: None,
        }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be positive".into()));
        }
        validate_weight(self.lexical_weight)?;
        if self.token_budget == 0 {
            return Err(Error::InvalidConfig("token_budget must be positive".into()));
        }
        if self.chars_per_token == 0 {
            return Err(Error::InvalidConfig("chars_per_token must be positive".into()));
        }
        if self.excerpt_chars == 0 {
            return Err(Error::InvalidConfig("excerpt_chars must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.newline_floor) {
            return Err(Error::InvalidConfig(format!("newline_floor must lie in [0,1], got {}", self.newline_floor)));
        }
        if self.path_timeout_ms == 0 {
            return Err(Error::InvalidConfig("path_timeout_ms must be positive".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::InvalidConfig("model must not be empty".into()));
        }
        if self.estimator == EstimatorKind::Huggingface && self.tokenizer_path.is_none() {
            return Err(Error::InvalidConfig("huggingface estimator requires tokenizer_path".into()));
        }
        Ok(())
    }

    pub fn path_timeout(&self) -> std::time::Duration { std::time::Duration::from_millis(self.path_timeout_ms) }

    pub fn tokenizer_path(&self) -> Option<PathBuf> { self.tokenizer_path.as_deref().map(expand_path) }
}

/// Lexical weight must be a finite value in `[0,1]`.
pub fn validate_weight(weight: f32) -> Result<()> {
    if weight.is_finite() && (0.0..=1.0).contains(&weight) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("lexical_weight must lie in [0,1], got {weight}")))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
