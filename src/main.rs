mod commands;
mod config;
mod quiz;

use std::sync::Arc;

use commands::Command;
use config::Config;
use dotenv::dotenv;
use log::{debug, error, info, warn};
use quiz::{
    client::{HttpQuizClient, QuizService},
    presentation::{self, RawReply},
    session::{self, Event, State, Transition},
};
use teloxide::{
    dispatching::dialogue::InMemStorage,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{ChatId, UpdateKind, UserId},
};

type QuizDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SharedService = Arc<dyn QuizService>;
type SessionStorage = Arc<InMemStorage<State>>;

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    info!("Starting quiz bot...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    info!("Using quiz service at {}", config.api_url);
    let service: SharedService = Arc::new(HttpQuizClient::new(&config));
    let storage: SessionStorage = InMemStorage::new();

    let bot = Bot::from_env();

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(on_command))
                .branch(dptree::endpoint(on_message)),
        )
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![storage, service])
        .distribution_function(by_sender)
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

// Updates of one user are handled one at a time; a new message waits for the previous one.
fn by_sender(update: &Update) -> Option<UserId> {
    match &update.kind {
        UpdateKind::Message(msg) => msg.from().map(|user| user.id),
        UpdateKind::CallbackQuery(q) => Some(q.from.id),
        _ => None,
    }
}

/// Sessions belong to a user, not to the chat the user writes in.
fn user_dialogue(storage: SessionStorage, user: UserId) -> QuizDialogue {
    Dialogue::new(storage, ChatId(user.0 as i64))
}

async fn on_command(
    bot: Bot,
    storage: SessionStorage,
    msg: Message,
    cmd: Command,
    service: SharedService,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    debug!("User {} sent {:?}", user.id.0, cmd);
    let dialogue = user_dialogue(storage, user.id);
    let state = dialogue.get_or_default().await?;
    let transition = session::handle(service.as_ref(), user.id.0, state, Event::Command(cmd)).await;
    deliver(&bot, &dialogue, msg.chat.id, transition).await
}

async fn on_message(
    bot: Bot,
    storage: SessionStorage,
    msg: Message,
    service: SharedService,
) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let dialogue = user_dialogue(storage, user.id);
    let state = dialogue.get_or_default().await?;
    // Stickers, photos and the like count as an empty reply.
    let reply = RawReply::Text(msg.text().unwrap_or_default().to_string());
    let transition = session::handle(service.as_ref(), user.id.0, state, Event::Reply(reply)).await;
    deliver(&bot, &dialogue, msg.chat.id, transition).await
}

async fn on_callback(
    bot: Bot,
    storage: SessionStorage,
    q: CallbackQuery,
    service: SharedService,
) -> HandlerResult {
    let (Some(data), Some(message)) = (q.data.clone(), q.message.as_ref()) else {
        acknowledge(&bot, &q).await;
        return Ok(());
    };

    let dialogue = user_dialogue(storage, q.from.id);
    let state = dialogue.get_or_default().await?;
    let transition = session::handle(
        service.as_ref(),
        q.from.id.0,
        state,
        Event::Reply(RawReply::Selection(data.clone())),
    )
    .await;
    let still_open = transition.state.offers_button(&data);
    let delivered = deliver(&bot, &dialogue, message.chat.id, transition).await;
    acknowledge(&bot, &q).await;
    delivered?;

    // Buttons stay only while their question can still be answered.
    if !still_open {
        if let Err(e) = bot
            .edit_message_reply_markup(message.chat.id, message.id)
            .await
        {
            warn!("Could not remove answer buttons: {}", e);
        }
    }
    Ok(())
}

async fn acknowledge(bot: &Bot, q: &CallbackQuery) {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Could not acknowledge button press from user {}: {}", q.from.id.0, e);
    }
}

/// Stores the new state first, then sends the replies in order.
async fn deliver(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    transition: Transition,
) -> HandlerResult {
    dialogue.update(transition.state).await?;
    for reply in transition.replies {
        let keyboard = presentation::inline_keyboard(&reply);
        let mut request = bot.send_message(chat_id, reply.text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn users_sharing_a_chat_keep_separate_sessions() {
        let storage: SessionStorage = InMemStorage::new();
        let first = user_dialogue(storage.clone(), UserId(42));
        let second = user_dialogue(storage.clone(), UserId(43));

        first.update(State::AwaitingQuizId).await.unwrap();

        assert_eq!(second.get_or_default().await.unwrap(), State::Idle);
        assert_eq!(first.get_or_default().await.unwrap(), State::AwaitingQuizId);

        second.update(State::AwaitingQuizId).await.unwrap();
        first.update(State::Idle).await.unwrap();
        assert_eq!(second.get_or_default().await.unwrap(), State::AwaitingQuizId);
    }
}
