//! Multiple-choice quizzes: the output contract and interactive scoring.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of questions a quiz or game assessment must contain.
pub const QUIZ_LENGTH: usize = 5;

/// Number of answer options every question must offer.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuizQuestion {
    /// The question text.
    pub question: String,
    /// Exactly four possible answers.
    #[schemars(length(min = 4, max = 4))]
    pub options: Vec<String>,
    /// The correct answer. Must be identical to one of the options.
    pub answer: String,
}

/// Ways a generated quiz can break the contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizContractError {
    #[error("quiz is missing")]
    Missing,

    #[error("quiz has {actual} questions, expected {QUIZ_LENGTH}")]
    WrongLength { actual: usize },

    #[error("question {index} has {actual} options, expected {OPTIONS_PER_QUESTION}")]
    WrongOptionCount { index: usize, actual: usize },

    #[error("question {index} answer {answer:?} is not one of its options")]
    AnswerNotAnOption { index: usize, answer: String },
}

/// Check a generated quiz against the contract, reporting the first problem.
pub fn check_quiz(questions: &[QuizQuestion]) -> Result<(), QuizContractError> {
    if questions.len() != QUIZ_LENGTH {
        return Err(QuizContractError::WrongLength {
            actual: questions.len(),
        });
    }
    for (index, q) in questions.iter().enumerate() {
        if q.options.len() != OPTIONS_PER_QUESTION {
            return Err(QuizContractError::WrongOptionCount {
                index,
                actual: q.options.len(),
            });
        }
        if !q.options.iter().any(|o| o == &q.answer) {
            return Err(QuizContractError::AnswerNotAnOption {
                index,
                answer: q.answer.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Interactive play
// ---------------------------------------------------------------------------

/// Result of answering one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect { correct_answer: String },
}

/// Walks through a quiz one question at a time and keeps score.
///
/// Each question accepts exactly one answer; answering moves on to the next.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    score: usize,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions,
            current: 0,
            score: 0,
        }
    }

    /// The question awaiting an answer, or `None` once finished.
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    /// 1-based number of the current question.
    pub fn position(&self) -> usize {
        self.current + 1
    }

    /// Answer the current question. Returns `None` if the quiz is over.
    pub fn answer(&mut self, choice: &str) -> Option<AnswerOutcome> {
        let question = self.questions.get(self.current)?;
        let outcome = if choice == question.answer {
            self.score += 1;
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect {
                correct_answer: question.answer.clone(),
            }
        };
        self.current += 1;
        Some(outcome)
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Score as a whole percentage, rounded half up.
    pub fn percent(&self) -> u32 {
        if self.questions.is_empty() {
            return 0;
        }
        (self.score as f64 / self.questions.len() as f64 * 100.0).round() as u32
    }

    /// Start again from the first question with a zero score.
    pub fn restart(&mut self) {
        self.current = 0;
        self.score = 0;
    }
}
