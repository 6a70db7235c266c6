pub mod client;
pub mod presentation;
pub mod sequencer;
pub mod session;

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Deserialize;

pub type QuizId = i64;
pub type QuestionId = i64;
pub type OptionId = i64;
pub type AttemptId = i64;
pub type AnswerId = i64;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<Question>,
}

fn default_is_active() -> bool {
    true
}

impl Quiz {
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
}

/// How a question expects to be answered.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Any non-empty text message.
    Text,
    /// Exactly one of the listed options, kept in server order.
    Choice { options: Vec<AnswerOption> },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

// Shape of a question as the storage service sends it.
#[derive(Deserialize)]
struct QuestionRecord {
    id: QuestionId,
    text: String,
    question_type: String,
    #[serde(default)]
    options: Vec<AnswerOption>,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = String;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        let kind = match record.question_type.as_str() {
            "text" => QuestionKind::Text,
            "option" if record.options.is_empty() => {
                return Err(format!("choice question {} has no options", record.id))
            }
            "option" => QuestionKind::Choice {
                options: record.options,
            },
            other => {
                return Err(format!(
                    "question {} has unknown type {:?}",
                    record.id, other
                ))
            }
        };
        Ok(Self {
            id: record.id,
            text: record.text,
            kind,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Attempt {
    pub id: AttemptId,
    pub quiz_id: QuizId,
    pub user_id: u64,
    #[serde(default)]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl Attempt {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn answered_question_ids(&self) -> HashSet<QuestionId> {
        self.answers.iter().map(|a| a.question_id).collect()
    }
}

/// A recorded answer. The attempt listing omits `attempt_id`, the submit response carries it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    #[serde(default)]
    pub attempt_id: Option<AttemptId>,
    pub question_id: QuestionId,
    pub answer_text: String,
}
