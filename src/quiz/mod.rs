pub mod analyzer;
pub mod error;
pub mod locale;
pub mod presentation;
pub mod questions;
pub mod session;
pub mod transport;

/// Likert scale bounds: 1 = strongly disagree, 7 = strongly agree.
pub const LIKERT_MIN: u8 = 1;
pub const LIKERT_MAX: u8 = 7;

pub fn is_likert(value: i64) -> bool {
    (LIKERT_MIN as i64..=LIKERT_MAX as i64).contains(&value)
}

/// The sixteen four-letter type codes.
pub const PERSONALITY_TYPES: [&str; 16] = [
    "INTJ", "INTP", "ENTJ", "ENTP", //
    "INFJ", "INFP", "ENFJ", "ENFP", //
    "ISTJ", "ISFJ", "ESTJ", "ESFJ", //
    "ISTP", "ISFP", "ESTP", "ESFP",
];

pub fn is_personality_type(code: &str) -> bool {
    PERSONALITY_TYPES.contains(&code)
}

/// What the classifier hands back for one completed quiz.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PersonalityProfile {
    pub personality_type: String,
    pub description: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub career_paths: Vec<String>,
    pub relationships: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_likert_bounds() {
        assert!(!is_likert(0));
        assert!(is_likert(1));
        assert!(is_likert(7));
        assert!(!is_likert(8));
        assert!(!is_likert(-3));
    }

    #[test]
    fn test_type_codes_cover_all_axes() {
        for e_i in ['E', 'I'] {
            for s_n in ['S', 'N'] {
                for t_f in ['T', 'F'] {
                    for j_p in ['J', 'P'] {
                        let code: String = [e_i, s_n, t_f, j_p].iter().collect();
                        assert!(is_personality_type(&code), "{code} missing");
                    }
                }
            }
        }
        assert!(!is_personality_type("ZZZZ"));
        assert!(!is_personality_type("infj"));
    }
}
