//! RapidAPI meme-generator client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{StatusCode, Url, header};
use serde::{Deserialize, Serialize};

use crate::error::{MemeError, Result};

pub const DEFAULT_BASE_URL: &str = "https://ronreiter-meme-generator.p.rapidapi.com";
pub const DEFAULT_HOST: &str = "ronreiter-meme-generator.p.rapidapi.com";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_memes";
pub const DEFAULT_FONT_SIZE: u32 = 50;
pub const DEFAULT_FONT: &str = "Impact";
const TEMPLATES_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection and storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemeConfig {
    /// RapidAPI key. Calls fail with [`MemeError::MissingApiKey`] when unset.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Value of the `X-RapidAPI-Host` header.
    pub host: String,
    /// Where generated images are written. Created on demand.
    pub output_dir: PathBuf,
    /// Timeout for meme generation. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for MemeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            host: DEFAULT_HOST.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            request_timeout: None,
        }
    }
}

impl MemeConfig {
    /// Read `RAPID_API_KEY`, `MEME_API_BASE_URL` and `MEME_OUTPUT_DIR` from
    /// the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`MemeConfig::from_env`], with a custom variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: non_empty("RAPID_API_KEY"),
            base_url: non_empty("MEME_API_BASE_URL").unwrap_or(defaults.base_url),
            host: defaults.host,
            output_dir: non_empty("MEME_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            request_timeout: defaults.request_timeout,
        }
    }
}

/// What to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemeConcept {
    /// Template name, e.g. `Distracted-Boyfriend`.
    pub template: String,
    pub top_text: String,
    pub bottom_text: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_font")]
    pub font: String,
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

fn default_font() -> String {
    DEFAULT_FONT.to_string()
}

pub struct MemeClient {
    http: reqwest::Client,
    config: MemeConfig,
    meme_url: Url,
    images_url: Url,
}

impl MemeClient {
    pub fn new(config: MemeConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        let parse = |suffix: &str| {
            Url::parse(&format!("{base}/{suffix}"))
                .map_err(|e| MemeError::InvalidInput(format!("base url {base}: {e}")))
        };
        let meme_url = parse("meme")?;
        let images_url = parse("images")?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| MemeError::Request(e.to_string()))?;

        Ok(Self {
            http,
            config,
            meme_url,
            images_url,
        })
    }

    pub fn config(&self) -> &MemeConfig {
        &self.config
    }

    /// Render a meme and save it, returning the file written.
    pub async fn generate(&self, concept: &MemeConcept) -> Result<PathBuf> {
        if concept.template.trim().is_empty() {
            return Err(MemeError::InvalidInput("template must not be empty".into()));
        }

        let mut url = self.meme_url.clone();
        url.query_pairs_mut()
            .append_pair("meme", &concept.template)
            .append_pair("top", &concept.top_text)
            .append_pair("bottom", &concept.bottom_text)
            .append_pair("font_size", &concept.font_size.to_string())
            .append_pair("font", &concept.font);

        tracing::info!(template = %concept.template, "generating meme");
        let response = self.get(url, self.config.request_timeout).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("image") {
            return Err(MemeError::UnexpectedContentType(content_type));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e, self.config.request_timeout))?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let path = next_available_path(&self.config.output_dir, &concept.template);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "meme saved");
        Ok(path)
    }

    /// List the template names the service knows.
    pub async fn templates(&self) -> Result<Vec<String>> {
        let response = self.get(self.images_url.clone(), Some(TEMPLATES_TIMEOUT)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e, Some(TEMPLATES_TIMEOUT)))?;
        let templates: Vec<String> = serde_json::from_slice(&body)
            .map_err(|e| MemeError::Request(format!("invalid template list: {e}")))?;

        tracing::info!(count = templates.len(), "fetched meme templates");
        Ok(templates)
    }

    async fn get(&self, url: Url, timeout: Option<Duration>) -> Result<reqwest::Response> {
        let api_key = self.config.api_key.as_deref().ok_or(MemeError::MissingApiKey)?;

        let mut request = self
            .http
            .get(url)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", &self.config.host);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(e, timeout))?;
        tracing::debug!(status = %response.status(), "meme service responded");

        match response.status() {
            StatusCode::INTERNAL_SERVER_ERROR => Err(MemeError::ServiceUnavailable),
            StatusCode::UNAUTHORIZED => Err(MemeError::InvalidCredentials),
            StatusCode::TOO_MANY_REQUESTS => Err(MemeError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                Err(MemeError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            _ => Ok(response),
        }
    }

    fn map_send_error(&self, e: reqwest::Error, timeout: Option<Duration>) -> MemeError {
        match timeout {
            Some(timeout) if e.is_timeout() => MemeError::Timeout(timeout.as_millis() as u64),
            _ => MemeError::Request(e.to_string()),
        }
    }
}

/// First free `<template>.jpg`, `<template>_1.jpg`, ... in `dir`.
///
/// Path separators in the template are replaced so the file always lands
/// directly inside `dir`.
pub fn next_available_path(dir: &Path, template: &str) -> PathBuf {
    let stem: String = template
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let stem = if stem == "." || stem == ".." {
        stem.replace('.', "_")
    } else {
        stem
    };

    let candidate = dir.join(format!("{stem}.jpg"));
    if !candidate.exists() {
        return candidate;
    }
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}.jpg")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
