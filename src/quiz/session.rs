//! Per-user quiz conversation.
//!
//! [`handle`] takes the user's current [`State`] and one inbound [`Event`], talks to the
//! quiz service as needed and returns the next state together with the messages to send.
//! Callers must feed events for one user sequentially; the dispatcher in `main` does so.

use std::collections::HashSet;

use log::{debug, info, warn};

use crate::commands::{help_text, Command};
use crate::quiz::client::QuizService;
use crate::quiz::presentation::{self, OutboundMessage, RawReply};
use crate::quiz::sequencer;
use crate::quiz::{AttemptId, Question, QuestionId, Quiz};

const GREETING_TEXT: &str = "Hi! I am a quiz bot. To take a quiz, send /start_quiz and then enter the quiz ID.";
const ASK_QUIZ_ID: &str = "Enter the ID of the quiz you want to take:";
const INVALID_QUIZ_ID: &str = "Invalid ID format. Please enter a number.";
const QUIZ_NOT_FOUND: &str = "No quiz with this ID was found.";
const QUIZ_MALFORMED: &str = "This quiz cannot be taken: it contains questions the bot cannot show.";
const SERVICE_UNAVAILABLE: &str = "The quiz service is unavailable right now. Please try again later.";
const ATTEMPT_FAILED: &str = "Could not start the quiz. Please try again later.";
const NO_QUESTIONS: &str = "This quiz has no questions.";
const ANSWER_NOT_SAVED: &str = "Your answer could not be saved. Please send it again.";
const QUIZ_FINISHED: &str = "Quiz completed!";
const QUIZ_NOT_FINISHED: &str = "All answers are saved, but the quiz could not be finished. Send any message to retry, or /cancel.";
const ALREADY_COMPLETED: &str = "This attempt has already been completed.";
const QUIZ_CANCELLED: &str = "Quiz cancelled.";
const PREVIOUS_ABANDONED: &str = "Your previous quiz was cancelled.";
const NOTHING_TO_CANCEL: &str = "There is no quiz in progress.";
const IDLE_HINT: &str = "Send /start_quiz to take a quiz, or /help to see all commands.";
const SELECTION_WHILE_IDLE: &str = "This quiz is no longer active. Send /start_quiz to take a new one.";

#[derive(Clone, Debug, Default, PartialEq)]
pub enum State {
    #[default]
    Idle,
    AwaitingQuizId,
    AwaitingAnswer(Session),
}

impl State {
    pub fn pending_question(&self) -> Option<QuestionId> {
        match self {
            State::AwaitingAnswer(session) => session.pending.as_ref().map(|q| q.id),
            _ => None,
        }
    }

    /// Whether a button carrying `data` belongs to the question still awaiting a reply.
    pub fn offers_button(&self, data: &str) -> bool {
        match self {
            State::AwaitingAnswer(Session {
                pending: Some(question),
                ..
            }) => presentation::offers(question, data),
            _ => false,
        }
    }
}

/// A quiz in progress: one attempt on the storage service.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub quiz: Quiz,
    pub attempt_id: AttemptId,
    /// Question awaiting a reply. `None` once every question is answered
    /// but completing the attempt has not gone through yet.
    pub pending: Option<Question>,
    pub answered: HashSet<QuestionId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Command(Command),
    Reply(RawReply),
}

#[derive(Debug, PartialEq)]
pub struct Transition {
    pub state: State,
    pub replies: Vec<OutboundMessage>,
}

impl Transition {
    fn to(state: State, text: &str) -> Self {
        Self {
            state,
            replies: vec![OutboundMessage::text(text)],
        }
    }
}

pub async fn handle(
    service: &dyn QuizService,
    user_id: u64,
    state: State,
    event: Event,
) -> Transition {
    match (state, event) {
        (state, Event::Command(Command::Start)) => Transition::to(state, GREETING_TEXT),
        (state, Event::Command(Command::Help)) => Transition::to(state, &help_text()),
        (state, Event::Command(Command::StartQuiz)) => {
            let mut replies = Vec::new();
            if let State::AwaitingAnswer(session) = state {
                abandon(service, &session).await;
                replies.push(OutboundMessage::text(PREVIOUS_ABANDONED));
            }
            replies.push(OutboundMessage::text(ASK_QUIZ_ID));
            Transition {
                state: State::AwaitingQuizId,
                replies,
            }
        }
        (State::Idle, Event::Command(Command::Cancel)) => {
            Transition::to(State::Idle, NOTHING_TO_CANCEL)
        }
        (State::AwaitingQuizId, Event::Command(Command::Cancel)) => {
            Transition::to(State::Idle, QUIZ_CANCELLED)
        }
        (State::AwaitingAnswer(session), Event::Command(Command::Cancel)) => {
            abandon(service, &session).await;
            Transition::to(State::Idle, QUIZ_CANCELLED)
        }
        (State::Idle, Event::Reply(RawReply::Text(_))) => Transition::to(State::Idle, IDLE_HINT),
        (State::Idle, Event::Reply(RawReply::Selection(_))) => {
            Transition::to(State::Idle, SELECTION_WHILE_IDLE)
        }
        (State::AwaitingQuizId, Event::Reply(RawReply::Text(text))) => {
            start_quiz(service, user_id, &text).await
        }
        (State::AwaitingQuizId, Event::Reply(RawReply::Selection(_))) => {
            Transition::to(State::AwaitingQuizId, INVALID_QUIZ_ID)
        }
        (State::AwaitingAnswer(session), Event::Reply(reply)) => {
            answer(service, session, reply).await
        }
    }
}

/// Closes the attempt on the service. Local state is dropped by the caller either way.
async fn abandon(service: &dyn QuizService, session: &Session) {
    info!("Abandoning attempt {}", session.attempt_id);
    if let Err(e) = service.complete_attempt(session.attempt_id).await {
        warn!(
            "Attempt {} could not be closed while abandoning it: {}",
            session.attempt_id, e
        );
    }
}

async fn start_quiz(service: &dyn QuizService, user_id: u64, text: &str) -> Transition {
    let quiz_id = match text.trim().parse() {
        Ok(id) => id,
        Err(_) => return Transition::to(State::AwaitingQuizId, INVALID_QUIZ_ID),
    };

    let quiz = match service.fetch_quiz(quiz_id).await {
        Ok(quiz) => quiz,
        Err(e) if e.is_not_found() => return Transition::to(State::Idle, QUIZ_NOT_FOUND),
        Err(e) if e.is_malformed() => return Transition::to(State::Idle, QUIZ_MALFORMED),
        Err(_) => return Transition::to(State::Idle, SERVICE_UNAVAILABLE),
    };

    let attempt = match service.create_attempt(quiz.id, user_id).await {
        Ok(attempt) => attempt,
        Err(_) => return Transition::to(State::Idle, ATTEMPT_FAILED),
    };
    info!(
        "User {} started quiz {} (attempt {})",
        user_id, quiz.id, attempt.id
    );

    let first = match sequencer::next_question(&quiz, &HashSet::new()) {
        Some(question) => question,
        None => {
            if let Err(e) = service.complete_attempt(attempt.id).await {
                warn!("Empty attempt {} could not be closed: {}", attempt.id, e);
            }
            return Transition::to(State::Idle, NO_QUESTIONS);
        }
    };

    let mut intro = format!("Starting quiz: {}", quiz.title);
    if let Some(description) = quiz.description.as_deref().filter(|d| !d.trim().is_empty()) {
        intro.push_str("\n\n");
        intro.push_str(description);
    }
    let replies = vec![
        OutboundMessage::text(intro),
        presentation::render(first, sequencer::position(&quiz, first)),
    ];
    let first = first.clone();
    let session = Session {
        quiz,
        attempt_id: attempt.id,
        pending: Some(first),
        answered: HashSet::new(),
    };
    Transition {
        state: State::AwaitingAnswer(session),
        replies,
    }
}

async fn answer(service: &dyn QuizService, mut session: Session, reply: RawReply) -> Transition {
    let Some(question) = session.pending.as_ref() else {
        debug!(
            "Retrying completion of attempt {} on user message",
            session.attempt_id
        );
        return advance(service, session).await;
    };
    let question_id = question.id;

    let payload = match presentation::parse_reply(question, &reply) {
        Ok(payload) => payload,
        Err(invalid) => {
            let text = invalid.to_string();
            return Transition::to(State::AwaitingAnswer(session), &text);
        }
    };

    if service
        .submit_answer(session.attempt_id, question_id, &payload.into_answer_text())
        .await
        .is_err()
    {
        return Transition::to(State::AwaitingAnswer(session), ANSWER_NOT_SAVED);
    }

    debug!(
        "Attempt {}: question {} answered",
        session.attempt_id, question_id
    );
    session.answered.insert(question_id);
    session.pending = None;
    advance(service, session).await
}

/// Moves to the next unanswered question, or completes the attempt when none is left.
async fn advance(service: &dyn QuizService, mut session: Session) -> Transition {
    match service.fetch_attempt(session.attempt_id).await {
        Ok(attempt) if attempt.is_completed() => {
            info!("Attempt {} was completed elsewhere", session.attempt_id);
            return Transition::to(State::Idle, ALREADY_COMPLETED);
        }
        Ok(attempt) => session.answered.extend(attempt.answered_question_ids()),
        Err(e) => warn!(
            "Using local answers for attempt {}: {}",
            session.attempt_id, e
        ),
    }

    if let Some(question) = sequencer::next_question(&session.quiz, &session.answered) {
        let message = presentation::render(question, sequencer::position(&session.quiz, question));
        let next = question.clone();
        session.pending = Some(next);
        return Transition {
            state: State::AwaitingAnswer(session),
            replies: vec![message],
        };
    }

    match service.complete_attempt(session.attempt_id).await {
        Ok(_) => {
            info!("Attempt {} completed", session.attempt_id);
            Transition::to(State::Idle, QUIZ_FINISHED)
        }
        Err(_) => Transition::to(State::AwaitingAnswer(session), QUIZ_NOT_FINISHED),
    }
}
