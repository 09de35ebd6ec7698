//! Pipeline configuration
//!
//! Defaults cover every path, an optional TOML file overrides them, and the
//! `MODEL_URL` environment variable supplies the remote model location.
//!
//! ```toml
//! dataset_path = "data/phishing_dataset.csv"
//! model_path = "models/phishing_model.apr"
//! model_url = "https://example.org/releases/phishing_model.apr"
//! download_timeout_secs = 30
//! ```

use crate::error::MODEL_URL_ENV;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Raw synthesized dataset
    pub dataset_path: PathBuf,
    /// Training split written by `preprocess`
    pub train_path: PathBuf,
    /// Test split written by `preprocess`
    pub test_path: PathBuf,
    /// Feature table written by `extract`
    pub features_path: PathBuf,
    /// Persisted model artifact
    pub model_path: PathBuf,
    /// Remote location of the model artifact, used only when it is missing locally
    pub model_url: Option<String>,
    pub download_timeout_secs: u64,
    /// Download attempts before giving up
    pub download_attempts: u32,
    /// Seed for generation and splitting
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/phishing_dataset.csv"),
            train_path: PathBuf::from("data/processed/train.csv"),
            test_path: PathBuf::from("data/processed/test.csv"),
            features_path: PathBuf::from("data/processed/features.csv"),
            model_path: PathBuf::from("models/phishing_model.apr"),
            model_url: None,
            download_timeout_secs: 30,
            download_attempts: 1,
            seed: 42,
        }
    }
}

impl Config {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, overlaid by an optional TOML file, overlaid by the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Apply `MODEL_URL` if it is set and non-blank
    pub fn with_env(self) -> Self {
        let value = std::env::var(MODEL_URL_ENV).ok();
        self.with_model_url_override(value)
    }

    fn with_model_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()) {
            if !url.is_empty() {
                self.model_url = Some(url);
            }
        }
        self
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs.max(1))
    }
}
