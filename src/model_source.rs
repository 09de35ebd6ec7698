//! Local model artifact provisioning
//!
//! When the artifact is missing locally and a download URL is configured, it
//! is fetched once (bounded attempts, per-request timeout) and written next to
//! its final path. Only a body that loads as a model is renamed into place.

use crate::config::Config;
use crate::error::{DetectorError, Result, MODEL_URL_ENV};
use crate::model_persistence::load_model;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the model artifact lives and where to get it from
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub model_path: PathBuf,
    pub model_url: Option<String>,
    pub timeout: Duration,
    pub attempts: u32,
}

impl ModelSource {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        let defaults = Config::default();
        Self {
            model_path: model_path.into(),
            model_url: None,
            timeout: defaults.download_timeout(),
            attempts: defaults.download_attempts,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            model_path: config.model_path.clone(),
            model_url: config.model_url.clone(),
            timeout: config.download_timeout(),
            attempts: config.download_attempts.max(1),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.model_url = Some(url.into());
        self
    }

    /// Make sure the artifact exists locally, downloading it if needed
    ///
    /// Returns the local path. Fails with [`DetectorError::ModelUnavailable`]
    /// when there is no artifact and no URL, or when every attempt fails.
    pub fn ensure_local(&self) -> Result<&Path> {
        if self.model_path.exists() {
            return Ok(&self.model_path);
        }

        let Some(url) = self.model_url.as_deref() else {
            return Err(DetectorError::ModelUnavailable(format!(
                "no model artifact at {} and {} is not set",
                self.model_path.display(),
                MODEL_URL_ENV
            )));
        };

        tracing::info!(url, path = %self.model_path.display(), "model not found locally, downloading");
        self.download(url)?;
        Ok(&self.model_path)
    }

    fn download(&self, url: &str) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| DetectorError::ModelUnavailable(format!("HTTP client setup failed: {}", e)))?;

        let mut last_error = String::new();
        for attempt in 1..=self.attempts.max(1) {
            let fetched = fetch(&client, url).and_then(|bytes| {
                install_artifact(&self.model_path, &bytes).map(|()| bytes.len())
            });
            match fetched {
                Ok(bytes) => {
                    tracing::info!(bytes, attempt, "downloaded model");
                    return Ok(());
                }
                Err(FetchError::Io(e)) => return Err(DetectorError::Io(e)),
                Err(FetchError::Failed(e)) => {
                    tracing::warn!(attempt, error = %e, "model download failed");
                    last_error = e;
                }
            }
        }

        Err(DetectorError::ModelUnavailable(format!(
            "failed to download model from {}: {}",
            url, last_error
        )))
    }
}

/// A failed attempt, or a local IO error that no retry will fix
enum FetchError {
    Failed(String),
    Io(std::io::Error),
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e)
    }
}

fn fetch(client: &reqwest::blocking::Client, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| FetchError::Failed(e.to_string()))?;
    let bytes = response
        .bytes()
        .map_err(|e| FetchError::Failed(e.to_string()))?;
    if bytes.is_empty() {
        return Err(FetchError::Failed("empty response body".to_string()));
    }
    Ok(bytes.to_vec())
}

/// Write `bytes` to `<path>.part`, check it loads as a model, rename it to `path`
///
/// An artifact that does not load is removed and never reaches `path`.
fn install_artifact(path: &Path, bytes: &[u8]) -> std::result::Result<(), FetchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let partial = path.with_extension("part");
    fs::write(&partial, bytes)?;
    if let Err(e) = load_model(&partial) {
        fs::remove_file(&partial)?;
        return Err(FetchError::Failed(format!(
            "downloaded artifact is not a valid model: {}",
            e
        )));
    }
    fs::rename(&partial, path)?;
    Ok(())
}
