//! Translation through a local Ollama model.

use crate::config::TranslationConfig;
use crate::error::{Result, VoxlateError};
use crate::pipeline::segmenter::passes_noise_filter;
use crate::translate::Translator;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Build the instruction prompt sent to the model.
pub fn build_prompt(text: &str, source_language: &str, target_language: &str) -> String {
    format!(
        "Translate from {source_language} to {target_language}: \"{text}\". \
         Only respond with the translated string, no explanations, no quotes, nothing else."
    )
}

/// Translator backed by Ollama's `/api/generate` endpoint (non-streaming).
#[derive(Debug, Clone)]
pub struct OllamaTranslator {
    url: String,
    model: String,
    min_chars: usize,
    client: reqwest::blocking::Client,
}

impl OllamaTranslator {
    /// Create a translator for `model` served at `url`.
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| VoxlateError::Translation {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            url: url.into(),
            model: model.into(),
            min_chars: crate::defaults::MIN_UTTERANCE_CHARS,
            client,
        })
    }

    /// Create a translator from the `[translation]` config section.
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        Self::new(
            config.url.clone(),
            config.model.clone(),
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Inputs that fail the noise filter at this threshold are not sent.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }
}

impl Translator for OllamaTranslator {
    fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        if !passes_noise_filter(text.trim(), self.min_chars) {
            return Ok(String::new());
        }

        let request = GenerateRequest {
            model: &self.model,
            prompt: build_prompt(text, source_language, target_language),
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| VoxlateError::Translation {
                message: e.to_string(),
            })?;

        let body: GenerateResponse = response.json().map_err(|e| VoxlateError::Translation {
            message: format!("invalid response body: {e}"),
        })?;

        Ok(body.response.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}
