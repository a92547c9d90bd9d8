//! Carries a finished profile to the results view inside a URL query string.
//!
//! List fields travel as JSON arrays. Decoding never fails hard: anything
//! missing or unreadable comes back as [`Decoded::Incomplete`], which the
//! results view shows as "still loading". A link that lost a parameter in
//! transit and a link whose result has not arrived yet look the same.

use url::{form_urlencoded, Url};

use crate::quiz::locale::Language;
use crate::quiz::PersonalityProfile;

const LANG: &str = "lang";
const TYPE: &str = "type";
const DESCRIPTION: &str = "desc";
const STRENGTHS: &str = "strengths";
const WEAKNESSES: &str = "weaknesses";
const CAREER_PATHS: &str = "careerPaths";
const RELATIONSHIPS: &str = "relationships";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Profile {
        language: Language,
        profile: PersonalityProfile,
    },
    Incomplete,
}

fn json_list(items: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

pub fn encode(profile: &PersonalityProfile, language: Language) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(LANG, language.code())
        .append_pair(TYPE, &profile.personality_type)
        .append_pair(DESCRIPTION, &profile.description)
        .append_pair(STRENGTHS, &json_list(&profile.strengths))
        .append_pair(WEAKNESSES, &json_list(&profile.weaknesses))
        .append_pair(CAREER_PATHS, &json_list(&profile.career_paths))
        .append_pair(RELATIONSHIPS, &profile.relationships)
        .finish()
}

/// `base` with the encoded profile as its query string. Any query already on
/// `base` is replaced; a fragment stays after the new query.
pub fn results_url(base: &str, profile: &PersonalityProfile, language: Language) -> String {
    let query = encode(profile, language);
    match Url::parse(base) {
        Ok(mut url) => {
            url.set_query(Some(&query));
            url.into()
        }
        Err(e) => {
            log::warn!("Results base {:?} is not a URL ({}), appending query as is", base, e);
            let base = base.split(['?', '#']).next().unwrap_or(base);
            format!("{}?{}", base, query)
        }
    }
}

/// Accepts either a bare query string or a whole results URL.
pub fn decode(rep: &str) -> Decoded {
    let query = match rep.split_once('?') {
        Some((_, query)) => query,
        None => rep,
    };
    let query = query.split('#').next().unwrap_or(query);

    let mut lang = None;
    let mut personality_type = None;
    let mut description = None;
    let mut strengths = None;
    let mut weaknesses = None;
    let mut career_paths = None;
    let mut relationships = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.into_owned();
        match key.as_ref() {
            LANG => lang = Some(value),
            TYPE => personality_type = Some(value),
            DESCRIPTION => description = Some(value),
            STRENGTHS => strengths = Some(value),
            WEAKNESSES => weaknesses = Some(value),
            CAREER_PATHS => career_paths = Some(value),
            RELATIONSHIPS => relationships = Some(value),
            _ => {}
        }
    }

    let language = lang
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or_default();

    let text = |field: Option<String>| field.filter(|s| !s.is_empty());
    let list = |field: Option<String>| -> Option<Vec<String>> {
        serde_json::from_str(&text(field)?).ok()
    };

    let profile = (|| {
        Some(PersonalityProfile {
            personality_type: text(personality_type)?,
            description: text(description)?,
            strengths: list(strengths)?,
            weaknesses: list(weaknesses)?,
            career_paths: list(career_paths)?,
            relationships: text(relationships)?,
        })
    })();

    match profile {
        Some(profile) => Decoded::Profile { language, profile },
        None => Decoded::Incomplete,
    }
}
