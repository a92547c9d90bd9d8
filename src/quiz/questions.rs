use serde::{Deserialize, Serialize};

use crate::quiz::locale::Translations;

/// Size of the full question battery.
pub const STANDARD_QUESTION_COUNT: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub text: String,
}

/// Ordered question ids. The text lives in the translation tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    ids: Vec<u32>,
}

impl QuestionBank {
    pub fn standard() -> Self {
        Self::with_count(STANDARD_QUESTION_COUNT)
    }

    /// The first `count` questions of the standard battery.
    pub fn with_count(count: u32) -> Self {
        Self {
            ids: (1..=count).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    pub fn question(&self, index: usize, translations: &Translations) -> Option<Question> {
        let id = *self.ids.get(index)?;
        let text = translations.question_text(id)?.to_string();
        Some(Question { id, text })
    }

    pub fn questions(&self, translations: &Translations) -> Vec<Question> {
        (0..self.len())
            .filter_map(|i| self.question(i, translations))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::locale::{Language, Localization};

    #[test]
    fn test_standard_bank() {
        let bank = QuestionBank::standard();
        assert_eq!(bank.len(), 60);
        assert_eq!(bank.ids().next(), Some(1));
        assert_eq!(bank.ids().last(), Some(60));
    }

    #[test]
    fn test_question_lookup() {
        let l10n = Localization::builtin().unwrap();
        let bank = QuestionBank::with_count(3);
        let en = l10n.translations(Language::En);

        let q = bank.question(2, en).unwrap();
        assert_eq!(q.id, 3);
        assert_eq!(q.text, en.questions[&3]);
        assert!(bank.question(3, en).is_none());
        assert_eq!(bank.questions(en).len(), 3);
    }
}
