use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::quiz::{OptionId, Question, QuestionKind};

const ANSWER_PREFIX: &str = "answer_";

/// A message for the chat surface: plain text, optionally with one button per option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub options: Vec<ChoiceButton>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceButton {
    pub label: String,
    /// Callback data sent back when the button is pressed.
    pub data: String,
}

/// What the user sent back while a question was pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawReply {
    Text(String),
    Selection(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerPayload {
    Text(String),
    Choice(OptionId),
}

impl AnswerPayload {
    /// The `answer_text` stored by the quiz service; options are stored by id.
    pub fn into_answer_text(self) -> String {
        match self {
            AnswerPayload::Text(text) => text,
            AnswerPayload::Choice(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReply {
    #[error("Please send a non-empty text answer.")]
    EmptyText,
    #[error("Please choose one of the options.")]
    ChoiceRequired,
    #[error("That option does not belong to the current question. Please choose one of the options below it.")]
    UnknownOption,
    #[error("This question expects a text answer. Please type it in.")]
    UnexpectedSelection,
}

pub fn option_data(id: OptionId) -> String {
    format!("{ANSWER_PREFIX}{id}")
}

pub fn render(question: &Question, (number, total): (usize, usize)) -> OutboundMessage {
    let header = format!("Question {number} of {total}:\n{}", question.text);
    match &question.kind {
        QuestionKind::Text => OutboundMessage::text(format!(
            "{header}\n\nSend your answer as a text message."
        )),
        QuestionKind::Choice { options } => OutboundMessage {
            text: header,
            options: options
                .iter()
                .map(|o| ChoiceButton {
                    label: o.text.clone(),
                    data: option_data(o.id),
                })
                .collect(),
        },
    }
}

pub fn parse_reply(question: &Question, reply: &RawReply) -> Result<AnswerPayload, InvalidReply> {
    match (&question.kind, reply) {
        (QuestionKind::Text, RawReply::Text(text)) if text.trim().is_empty() => {
            Err(InvalidReply::EmptyText)
        }
        (QuestionKind::Text, RawReply::Text(text)) => Ok(AnswerPayload::Text(text.clone())),
        (QuestionKind::Text, RawReply::Selection(_)) => Err(InvalidReply::UnexpectedSelection),
        (QuestionKind::Choice { .. }, RawReply::Text(_)) => Err(InvalidReply::ChoiceRequired),
        (QuestionKind::Choice { options }, RawReply::Selection(data)) => data
            .strip_prefix(ANSWER_PREFIX)
            .and_then(|id| id.parse::<OptionId>().ok())
            .filter(|id| options.iter().any(|o| o.id == *id))
            .map(AnswerPayload::Choice)
            .ok_or(InvalidReply::UnknownOption),
    }
}

/// Whether `data` is the callback data of one of `question`'s buttons.
pub fn offers(question: &Question, data: &str) -> bool {
    match &question.kind {
        QuestionKind::Text => false,
        QuestionKind::Choice { options } => options.iter().any(|o| option_data(o.id) == data),
    }
}

/// One button per row, in server order.
pub fn inline_keyboard(message: &OutboundMessage) -> Option<InlineKeyboardMarkup> {
    if message.options.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup::new(message.options.iter().map(|o| {
        vec![InlineKeyboardButton::callback(o.label.clone(), o.data.clone())]
    })))
}
