//! Dispatcher wiring for the Telegram transport.

use crate::bot::channel::TelegramChannel;
use crate::bot::events::{self, Command};
use crate::config::BotSettings;
use logbook_core::backend::HttpBackend;
use logbook_core::dialogue::{standard_table, Engine, Event};
use logbook_core::session::SessionStore;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, ChatId, MessageId};
use tracing::{error, info};

/// Run the Telegram transport runtime until shutdown.
pub async fn run_bot(settings: Arc<BotSettings>) {
    let backend = Arc::new(HttpBackend::new(&settings.api));
    let engine = Arc::new(Engine::new(
        standard_table(),
        backend,
        settings.api.as_ref().clone(),
    ));
    let sessions = Arc::new(SessionStore::new());
    let bot = Bot::new(settings.telegram.telegram_token.clone());
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .endpoint(handle_message),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    engine: Arc<Engine>,
    sessions: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = dispatch_event(&bot, msg.chat.id, None, cmd.into_event(), &engine, &sessions).await
    {
        error!("Command handler error: {e}");
    }
    respond(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    engine: Arc<Engine>,
    sessions: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    let Some(event) = events::message_event(&msg) else {
        return respond(());
    };
    if let Err(e) = dispatch_event(&bot, msg.chat.id, None, event, &engine, &sessions).await {
        error!("Message handler error: {e}");
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    engine: Arc<Engine>,
    sessions: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    let Some(event) = events::callback_event(&q) else {
        return respond(());
    };
    // Stop the client's loading spinner before doing any work.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(message) = q.message.as_ref() else {
        info!("Callback without a reachable message, dropping");
        return respond(());
    };
    let chat_id = message.chat().id;
    let edit_target = Some(message.id());
    if let Err(e) = dispatch_event(&bot, chat_id, edit_target, event, &engine, &sessions).await {
        error!("Callback handler error: {e}");
    }
    respond(())
}

async fn dispatch_event(
    bot: &Bot,
    chat_id: ChatId,
    edit_target: Option<MessageId>,
    event: Event,
    engine: &Engine,
    sessions: &SessionStore,
) -> anyhow::Result<()> {
    let channel = match edit_target {
        Some(message_id) => TelegramChannel::with_edit_target(bot.clone(), chat_id, message_id),
        None => TelegramChannel::new(bot.clone(), chat_id),
    };
    let session = sessions.get_or_create(chat_id.0);
    // Held across the whole dispatch including backend awaits: events
    // for one conversation are processed strictly in arrival order and
    // never dropped, only queued.
    let mut session = session.lock().await;
    engine.dispatch(&mut session, &event, &channel).await?;
    Ok(())
}
