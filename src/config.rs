use std::path::PathBuf;
use std::time::Duration;

use chatgpt::config::ChatGPTEngine;

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::locale::Language;

const DEFAULT_RESULTS_URL: &str = "http://localhost:3000/results";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SETTLE_MS: u64 = 300;

/// Settings read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub chatgpt_api_key: String,
    pub model: String,
    pub request_timeout: Duration,
    pub results_url: String,
    pub settle: Duration,
    pub default_language: Language,
    pub locales_dir: Option<PathBuf>,
}

impl BotConfig {
    pub fn from_env() -> QuizResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> QuizResult<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let chatgpt_api_key = var("CHATGPT_API_KEY")
            .ok_or_else(|| QuizError::Config("CHATGPT_API_KEY is not set".to_string()))?;

        let number = |key: &str, default: u64| -> QuizResult<u64> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| QuizError::Config(format!("{} must be a number, got {:?}", key, raw))),
                None => Ok(default),
            }
        };

        let default_language = match var("QUIZ_DEFAULT_LANG") {
            Some(code) => Language::from_code(&code)
                .ok_or_else(|| QuizError::Config(format!("unsupported QUIZ_DEFAULT_LANG {:?}", code)))?,
            None => Language::default(),
        };

        Ok(Self {
            chatgpt_api_key,
            model: var("QUIZ_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            request_timeout: Duration::from_secs(number("QUIZ_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
            results_url: var("QUIZ_RESULTS_URL").unwrap_or_else(|| DEFAULT_RESULTS_URL.to_string()),
            settle: Duration::from_millis(number("QUIZ_SETTLE_MS", DEFAULT_SETTLE_MS)?),
            default_language,
            locales_dir: var("QUIZ_LOCALES_DIR").map(PathBuf::from),
        })
    }

    pub fn engine(&self) -> ChatGPTEngine {
        match self.model.as_str() {
            "gpt-4" => ChatGPTEngine::Gpt4,
            "gpt-3.5-turbo" => ChatGPTEngine::Gpt35Turbo,
            other => {
                log::warn!("Unknown model {:?}, falling back to gpt-3.5-turbo", other);
                ChatGPTEngine::Gpt35Turbo
            }
        }
    }
}
