use thiserror::Error;

/// Everything that can go wrong between the first answer and the shared results page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// An answer outside the Likert range, or an answer while the session is not answering.
    #[error("invalid response value {value}: {reason}")]
    InvalidResponseValue { value: i64, reason: String },

    /// Classification was asked for with a malformed response vector.
    #[error("invalid classification input: {0}")]
    InvalidInput(String),

    /// The model answered, but not with a profile we can use.
    #[error("classifier reply does not fit the profile schema: {0}")]
    ClassificationSchema(String),

    /// The model could not be reached or returned a transport-level error.
    #[error("classification service failed: {0}")]
    ClassificationService(String),

    #[error("share action failed: {0}")]
    ShareAction(String),

    #[error("localization resource: {0}")]
    Localization(String),

    #[error("configuration: {0}")]
    Config(String),
}

impl QuizError {
    /// Failures the user can trigger from outside: the ones shown as "analysis failed".
    pub fn is_classification_failure(&self) -> bool {
        matches!(
            self,
            QuizError::ClassificationSchema(_) | QuizError::ClassificationService(_)
        )
    }
}

pub type QuizResult<T> = Result<T, QuizError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuizError::InvalidResponseValue {
            value: 8,
            reason: "outside 1..=7".to_string(),
        };
        assert_eq!(err.to_string(), "invalid response value 8: outside 1..=7");
    }

    #[test]
    fn test_classification_failures() {
        assert!(QuizError::ClassificationSchema("x".into()).is_classification_failure());
        assert!(QuizError::ClassificationService("x".into()).is_classification_failure());
        assert!(!QuizError::InvalidInput("x".into()).is_classification_failure());
        assert!(!QuizError::ShareAction("x".into()).is_classification_failure());
    }
}
