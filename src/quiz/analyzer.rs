use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use chatgpt::types::CompletionResponse;

use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::locale::{Language, Localization};
use crate::quiz::questions::QuestionBank;
use crate::quiz::{is_likert, is_personality_type, PersonalityProfile};

const MIN_LIST_ITEMS: usize = 3;
const MAX_LIST_ITEMS: usize = 5;

/// A hosted language model that turns a prompt into a reply.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> QuizResult<String>;
}

#[async_trait]
impl CompletionService for ChatGPT {
    async fn complete(&self, prompt: &str) -> QuizResult<String> {
        let response: CompletionResponse = self
            .send_message(prompt.to_string())
            .await
            .map_err(|e| QuizError::ClassificationService(e.to_string()))?;
        Ok(response.message().content.clone())
    }
}

/// Maps a finished response vector to a personality profile.
///
/// Every call goes to the model: two identical vectors may come back with
/// different profiles.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        responses: &[u8],
        language: Language,
    ) -> QuizResult<PersonalityProfile>;
}

pub struct PersonalityAnalyzer<S> {
    service: S,
    statements: Vec<String>,
}

impl<S: CompletionService> PersonalityAnalyzer<S> {
    /// The English statements are sent along with the answers so the model
    /// knows what each number refers to.
    pub fn new(service: S, bank: &QuestionBank, localization: &Localization) -> Self {
        let en = localization.translations(Language::En);
        let statements = bank.questions(en).into_iter().map(|q| q.text).collect();
        Self {
            service,
            statements,
        }
    }

    pub fn question_count(&self) -> usize {
        self.statements.len()
    }

    fn check_input(&self, responses: &[u8]) -> QuizResult<()> {
        if responses.len() != self.question_count() {
            return Err(QuizError::InvalidInput(format!(
                "expected {} responses, got {}",
                self.question_count(),
                responses.len()
            )));
        }
        if let Some((i, v)) = responses
            .iter()
            .enumerate()
            .find(|(_, v)| !is_likert(**v as i64))
        {
            return Err(QuizError::InvalidInput(format!(
                "response {} is {}, expected 1..=7",
                i + 1,
                v
            )));
        }
        Ok(())
    }

    pub fn build_prompt(&self, responses: &[u8], language: Language) -> String {
        let answers = self
            .statements
            .iter()
            .zip(responses)
            .enumerate()
            .map(|(i, (statement, value))| format!("{}. \"{}\": {}", i + 1, statement, value))
            .collect::<Vec<_>>()
            .join("\n");
        let vector = responses
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");

        format!(
            "Analyze the user's responses to a personality test and determine their personality type according to the 16Personalities model.
Each answer is on a 7-point scale: 1 = strongly disagree, 4 = neutral, 7 = strongly agree.

{answers}

Responses: [{vector}]
Language: {code} ({name})

Respond in {name}. Reply with a single JSON object and nothing else, with exactly these fields:
{{
  \"personalityType\": one of {types},
  \"description\": one paragraph describing the type,
  \"strengths\": array of 3 to 5 short strings,
  \"weaknesses\": array of 3 to 5 short strings,
  \"careerPaths\": array of 3 to 5 short strings,
  \"relationships\": one paragraph about the type in relationships
}}",
            code = language.code(),
            name = language.english_name(),
            types = crate::quiz::PERSONALITY_TYPES.join(", "),
        )
    }
}

#[async_trait]
impl<S: CompletionService> Classifier for PersonalityAnalyzer<S> {
    async fn classify(
        &self,
        responses: &[u8],
        language: Language,
    ) -> QuizResult<PersonalityProfile> {
        self.check_input(responses)?;

        let prompt = self.build_prompt(responses, language);
        log::debug!(
            "Requesting classification in {} ({} prompt chars)",
            language.code(),
            prompt.len()
        );

        let reply = self.service.complete(&prompt).await.map_err(|e| {
            log::warn!("Classification service failed: {}", e);
            e
        })?;

        let profile = parse_profile(&reply).map_err(|e| {
            log::warn!("Rejected classifier reply: {}", e);
            e
        })?;
        log::info!("Classified respondent as {}", profile.personality_type);
        Ok(profile)
    }
}

/// First JSON object of a reply that may be wrapped in prose or code fences.
/// Whatever follows the object is ignored.
fn first_json_object(reply: &str) -> QuizResult<PersonalityProfile> {
    let start = reply
        .find('{')
        .ok_or_else(|| QuizError::ClassificationSchema("no JSON object in reply".to_string()))?;

    serde_json::Deserializer::from_str(&reply[start..])
        .into_iter::<PersonalityProfile>()
        .next()
        .ok_or_else(|| QuizError::ClassificationSchema("no JSON object in reply".to_string()))?
        .map_err(|e| QuizError::ClassificationSchema(e.to_string()))
}

/// Treats the model reply as untrusted input: exact field set, then shape checks.
pub fn parse_profile(reply: &str) -> QuizResult<PersonalityProfile> {
    let mut profile = first_json_object(reply)?;

    profile.personality_type = profile.personality_type.trim().to_ascii_uppercase();
    if !is_personality_type(&profile.personality_type) {
        return Err(QuizError::ClassificationSchema(format!(
            "unknown personality type {:?}",
            profile.personality_type
        )));
    }

    for (field, text) in [
        ("description", &profile.description),
        ("relationships", &profile.relationships),
    ] {
        if text.trim().is_empty() {
            return Err(QuizError::ClassificationSchema(format!("{} is empty", field)));
        }
    }

    for (field, items) in [
        ("strengths", &profile.strengths),
        ("weaknesses", &profile.weaknesses),
        ("careerPaths", &profile.career_paths),
    ] {
        if !(MIN_LIST_ITEMS..=MAX_LIST_ITEMS).contains(&items.len()) {
            return Err(QuizError::ClassificationSchema(format!(
                "{} has {} entries, expected {}-{}",
                field,
                items.len(),
                MIN_LIST_ITEMS,
                MAX_LIST_ITEMS
            )));
        }
        if items.iter().any(|s| s.trim().is_empty()) {
            return Err(QuizError::ClassificationSchema(format!(
                "{} contains an empty entry",
                field
            )));
        }
    }

    Ok(profile)
}
