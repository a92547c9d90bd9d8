use std::time::{Duration, Instant};

use crate::quiz::analyzer::Classifier;
use crate::quiz::error::{QuizError, QuizResult};
use crate::quiz::locale::Language;
use crate::quiz::{is_likert, PersonalityProfile};

/// Where a quiz attempt currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the answer to the question at this index.
    Answering(usize),
    /// All answers are in; the classifier call is in flight.
    Submitting,
    Complete(PersonalityProfile),
    /// Classification failed. Only `restart` leaves this phase.
    Failed(String),
}

/// What happened to a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted { next_index: usize },
    /// A repeated tap, or one that arrived before the previous answer settled.
    Ignored,
    /// That was the last question; classification is due.
    Submitting,
}

/// One quiz attempt, owned by a single chat.
#[derive(Debug, Clone)]
pub struct QuizSession {
    question_count: usize,
    responses: Vec<u8>,
    phase: Phase,
    settle: Duration,
    settled_at: Option<Instant>,
}

impl QuizSession {
    pub fn new(question_count: usize, settle: Duration) -> Self {
        Self {
            question_count,
            responses: Vec::with_capacity(question_count),
            phase: Self::first_phase(question_count),
            settle,
            settled_at: None,
        }
    }

    /// An empty bank has nothing to answer and goes straight to classification.
    fn first_phase(question_count: usize) -> Phase {
        if question_count == 0 {
            Phase::Submitting
        } else {
            Phase::Answering(0)
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn responses(&self) -> &[u8] {
        &self.responses
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            Phase::Answering(index) => Some(index),
            _ => None,
        }
    }

    pub fn progress_percent(&self) -> u8 {
        if self.question_count == 0 {
            return 0;
        }
        (self.responses.len() * 100 / self.question_count) as u8
    }

    /// Records the answer to the question at `question_index`.
    ///
    /// Taps for a question other than the current one, and taps landing inside
    /// the settle window of the previous answer, are dropped without touching
    /// the response vector.
    ///
    /// `Submission::Submitting` is returned exactly once per attempt, for the
    /// answer that completes the bank. The caller owns the follow-up: it must
    /// call [`QuizSession::classify`] next, and no further answers are taken
    /// until the attempt is restarted.
    pub fn submit_answer(
        &mut self,
        question_index: usize,
        value: i64,
        now: Instant,
    ) -> QuizResult<Submission> {
        let current = match self.phase {
            Phase::Answering(index) => index,
            _ => {
                return Err(QuizError::InvalidResponseValue {
                    value,
                    reason: "session is not accepting answers".to_string(),
                })
            }
        };

        if !is_likert(value) {
            return Err(QuizError::InvalidResponseValue {
                value,
                reason: "expected a value in 1..=7".to_string(),
            });
        }
        if current >= self.question_count {
            return Err(QuizError::InvalidResponseValue {
                value,
                reason: "every question is already answered".to_string(),
            });
        }

        if question_index != current {
            log::debug!(
                "Ignoring answer for question {} while on question {}",
                question_index,
                current
            );
            return Ok(Submission::Ignored);
        }
        if let Some(until) = self.settled_at {
            if now < until {
                log::debug!("Ignoring answer for question {} while settling", current);
                return Ok(Submission::Ignored);
            }
        }

        self.responses.push(value as u8);
        self.settled_at = Some(now + self.settle);

        let next_index = current + 1;
        if next_index >= self.question_count {
            self.phase = Phase::Submitting;
            Ok(Submission::Submitting)
        } else {
            self.phase = Phase::Answering(next_index);
            Ok(Submission::Accepted { next_index })
        }
    }

    /// Runs the one classifier call of this attempt and settles the phase.
    pub async fn classify(
        &mut self,
        classifier: &dyn Classifier,
        language: Language,
    ) -> QuizResult<PersonalityProfile> {
        if self.phase != Phase::Submitting {
            return Err(QuizError::InvalidInput(
                "session is not waiting for classification".to_string(),
            ));
        }

        match classifier.classify(&self.responses, language).await {
            Ok(profile) => {
                self.phase = Phase::Complete(profile.clone());
                Ok(profile)
            }
            Err(e) => {
                log::warn!("Quiz attempt failed: {}", e);
                self.phase = Phase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Throws the attempt away and starts over at the first question.
    pub fn restart(&mut self) {
        self.responses.clear();
        self.phase = Self::first_phase(self.question_count);
        self.settled_at = None;
    }
}
