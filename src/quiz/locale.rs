use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::questions::QuestionBank;
use crate::quiz::LIKERT_MAX;

/// Locales the quiz ships with. The same code picks the UI strings and the
/// language the classifier has to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ko,
    En,
    Ja,
    Zh,
    Es,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Ko,
        Language::En,
        Language::Ja,
        Language::Zh,
        Language::Es,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
            Language::Es => "es",
        }
    }

    /// Native name, as shown on the language keyboard.
    pub fn label(&self) -> &'static str {
        match self {
            Language::Ko => "한국어",
            Language::En => "English",
            Language::Ja => "日本語",
            Language::Zh => "中文",
            Language::Es => "Español",
        }
    }

    pub fn english_name(&self) -> &'static str {
        match self {
            Language::Ko => "Korean",
            Language::En => "English",
            Language::Ja => "Japanese",
            Language::Zh => "Chinese",
            Language::Es => "Spanish",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_ascii_lowercase();
        Language::ALL.into_iter().find(|l| l.code() == code)
    }

    pub fn from_label(label: &str) -> Option<Language> {
        let label = label.trim();
        Language::ALL.into_iter().find(|l| l.label() == label)
    }
}

/// Every string the bot shows, for one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translations {
    pub welcome_title: String,
    pub welcome_description: String,
    pub choose_language: String,
    pub start_test: String,
    pub question: String,
    pub of: String,
    pub disagree: String,
    pub agree: String,
    pub response_options: Vec<String>,
    pub loading_analysis: String,
    pub analysis_error: String,
    pub take_again: String,
    pub result_title: String,
    pub detailed_insights: String,
    pub strengths: String,
    pub weaknesses: String,
    pub relationships: String,
    pub career_paths: String,
    pub share_results: String,
    pub share_title: String,
    pub link_copied: String,
    pub link_copy_error: String,
    pub questions: BTreeMap<u32, String>,
}

impl Translations {
    pub fn question_text(&self, id: u32) -> Option<&str> {
        self.questions.get(&id).map(String::as_str)
    }

    /// Label for a Likert value, falling back to the bare number.
    pub fn response_label(&self, value: u8) -> String {
        value
            .checked_sub(1)
            .and_then(|i| self.response_options.get(i as usize))
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }
}

const BUILTIN: [(Language, &str); 5] = [
    (Language::Ko, include_str!("../../locales/ko.json")),
    (Language::En, include_str!("../../locales/en.json")),
    (Language::Ja, include_str!("../../locales/ja.json")),
    (Language::Zh, include_str!("../../locales/zh.json")),
    (Language::Es, include_str!("../../locales/es.json")),
];

#[derive(Debug, Clone)]
pub struct Localization {
    tables: HashMap<Language, Translations>,
}

impl Localization {
    /// Resources compiled into the binary.
    pub fn builtin() -> QuizResult<Self> {
        let mut tables = HashMap::new();
        for (language, raw) in BUILTIN {
            let table: Translations = serde_json::from_str(raw).map_err(|e| {
                QuizError::Localization(format!("built-in {} table: {}", language.code(), e))
            })?;
            tables.insert(language, table);
        }
        Ok(Self { tables })
    }

    /// Loads `<code>.json` for every supported language from `dir`.
    pub fn from_dir(dir: &Path) -> QuizResult<Self> {
        let mut tables = HashMap::new();
        for language in Language::ALL {
            let path = dir.join(format!("{}.json", language.code()));
            let file = File::open(&path).map_err(|e| {
                QuizError::Localization(format!("failed to open {}: {}", path.display(), e))
            })?;
            let table: Translations = serde_json::from_reader(file).map_err(|e| {
                QuizError::Localization(format!("failed to parse {}: {}", path.display(), e))
            })?;
            tables.insert(language, table);
        }
        log::info!("Loaded {} translation tables from {}", tables.len(), dir.display());
        Ok(Self { tables })
    }

    pub fn translations(&self, language: Language) -> &Translations {
        // Both constructors fill every language.
        &self.tables[&language]
    }

    /// Every language must carry text for every question in the bank
    /// and exactly one label per Likert value.
    pub fn check_complete(&self, bank: &QuestionBank) -> QuizResult<()> {
        let mut missing = Vec::new();
        for language in Language::ALL {
            let table = self.translations(language);
            for id in bank.ids() {
                if table.question_text(id).map_or(true, |t| t.trim().is_empty()) {
                    missing.push(format!("{}:question {}", language.code(), id));
                }
            }
            if table.response_options.len() != LIKERT_MAX as usize {
                missing.push(format!(
                    "{}:responseOptions has {} labels",
                    language.code(),
                    table.response_options.len()
                ));
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(QuizError::Localization(format!(
                "incomplete tables: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        for language in Language::ALL {
            assert_eq!(Language::from_code(language.code()), Some(language));
            assert_eq!(Language::from_label(language.label()), Some(language));
        }
        assert_eq!(Language::from_code(" EN "), Some(Language::En));
        assert_eq!(Language::from_code("fr"), None);
        assert_eq!(Language::default(), Language::Ko);
    }

    #[test]
    fn test_builtin_tables_are_complete() {
        let l10n = Localization::builtin().unwrap();
        l10n.check_complete(&QuestionBank::standard()).unwrap();
    }

    #[test]
    fn test_missing_question_is_reported() {
        let mut l10n = Localization::builtin().unwrap();
        l10n.tables.get_mut(&Language::Ja).unwrap().questions.remove(&17);

        let err = l10n.check_complete(&QuestionBank::standard()).unwrap_err();
        match err {
            QuizError::Localization(msg) => assert!(msg.contains("ja:question 17")),
            other => panic!("unexpected error: {other:?}"),
        }
        // A shorter bank that stops before the gap is still fine.
        l10n.check_complete(&QuestionBank::with_count(16)).unwrap();
    }

    #[test]
    fn test_response_label() {
        let l10n = Localization::builtin().unwrap();
        let en = l10n.translations(Language::En);
        assert_eq!(en.response_label(1), en.response_options[0]);
        assert_eq!(en.response_label(7), en.response_options[6]);
        assert_eq!(en.response_label(0), "0");
    }

    fn write_builtin_tables(dir: &Path) {
        for (language, raw) in BUILTIN {
            std::fs::write(dir.join(format!("{}.json", language.code())), raw).unwrap();
        }
    }

    #[test]
    fn test_from_dir_loads_every_language() {
        let dir = tempfile::tempdir().unwrap();
        write_builtin_tables(dir.path());
        let mut en: serde_json::Value = serde_json::from_str(BUILTIN[1].1).unwrap();
        en["welcomeTitle"] = serde_json::Value::from("Custom title");
        std::fs::write(dir.path().join("en.json"), en.to_string()).unwrap();

        let l10n = Localization::from_dir(dir.path()).unwrap();
        l10n.check_complete(&QuestionBank::standard()).unwrap();
        assert_eq!(l10n.translations(Language::En).welcome_title, "Custom title");
        assert_eq!(
            l10n.translations(Language::Es).welcome_title,
            Localization::builtin().unwrap().translations(Language::Es).welcome_title
        );
    }

    #[test]
    fn test_from_dir_missing_or_malformed_table() {
        let dir = tempfile::tempdir().unwrap();
        write_builtin_tables(dir.path());
        std::fs::remove_file(dir.path().join("ja.json")).unwrap();
        match Localization::from_dir(dir.path()) {
            Err(QuizError::Localization(msg)) => assert!(msg.contains("ja.json")),
            other => panic!("unexpected result: {other:?}"),
        }

        std::fs::write(dir.path().join("ja.json"), "{ \"welcomeTitle\": ").unwrap();
        match Localization::from_dir(dir.path()) {
            Err(QuizError::Localization(msg)) => assert!(msg.contains("failed to parse")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
