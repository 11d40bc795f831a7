//! Translation engine boundary.

pub mod ollama;

pub use ollama::OllamaTranslator;

use crate::error::{Result, VoxlateError};
use std::sync::{Arc, Mutex};

/// Trait for text translation.
///
/// Implementations are synchronous and bounded by their own timeouts. An empty
/// result means "untranslatable, treat as silence".
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_language` into `target_language`.
    fn translate(&self, text: &str, source_language: &str, target_language: &str)
    -> Result<String>;

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Implement Translator for Arc<T> to allow sharing across pipelines.
impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        (**self).translate(text, source_language, target_language)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock translator for testing.
///
/// By default it tags the input (`"[en] olá"`); responses can be fixed or
/// made to fail for specific inputs. Every call is recorded.
#[derive(Debug, Default)]
pub struct MockTranslator {
    response: Option<String>,
    fail_on: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockTranslator {
    /// Create a mock that echoes its input tagged with the target language.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `response`.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Some(response.to_string());
        self
    }

    /// Fail whenever the input equals `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on.push(text.to_string());
        self
    }

    /// Inputs received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Translator for MockTranslator {
    fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
        if self.fail_on.iter().any(|f| f == text) {
            return Err(VoxlateError::Translation {
                message: "mock translation failure".to_string(),
            });
        }
        Ok(match &self.response {
            Some(response) => response.clone(),
            None => format!("[{}] {}", target_language, text),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_translator_tags_input() {
        let translator = MockTranslator::new();
        let out = translator.translate("olá", "pt-BR", "en").unwrap();
        assert_eq!(out, "[en] olá");
        assert_eq!(translator.calls(), vec!["olá"]);
    }

    #[test]
    fn test_mock_translator_fixed_response() {
        let translator = MockTranslator::new().with_response("hello");
        assert_eq!(translator.translate("olá", "pt", "en").unwrap(), "hello");
    }

    #[test]
    fn test_mock_translator_failure() {
        let translator = MockTranslator::new().failing_on("quebra");
        assert!(translator.translate("quebra", "pt", "en").is_err());
        assert!(translator.translate("inteiro", "pt", "en").is_ok());
        assert_eq!(translator.calls().len(), 2);
    }

    #[test]
    fn test_arc_translator_delegates() {
        let translator: Arc<dyn Translator> = Arc::new(MockTranslator::new());
        let shared = Arc::new(translator);
        assert_eq!(shared.name(), "mock");
        assert_eq!(shared.translate("x y", "pt", "de").unwrap(), "[de] x y");
    }
}
