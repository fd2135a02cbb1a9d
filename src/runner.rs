//! Bot bootstrap: wires providers, state, liveness and the teloxide dispatcher

use crate::bot::dispatcher::Command;
use crate::bot::{handle_text, BotContext, IncomingText, TelegramTransport};
use crate::bot::state::ConversationStore;
use crate::config::{
    get_conversation_idle_ttl, get_keep_alive_interval, get_liveness_wake_interval, Settings,
    CONVERSATION_MAX_ENTRIES,
};
use crate::liveness::{ActivityClock, LivenessMonitor};
use crate::llm::providers::{DeepInfraProvider, StabilityProvider};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Run the bot until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the bot identity cannot be fetched from Telegram.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let bot = Bot::new(settings.telegram_token.clone());

    let me = bot
        .get_me()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch bot identity: {e}"))?;
    let bot_username = me.user.username.clone().unwrap_or_default();
    info!(username = %bot_username, "Connected to Telegram");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register the command menu");
    }

    let text_provider = DeepInfraProvider::from_settings(&settings);
    text_provider.probe().await;

    let conversations = ConversationStore::new(
        Duration::from_secs(get_conversation_idle_ttl()),
        CONVERSATION_MAX_ENTRIES,
    );
    let activity = Arc::new(ActivityClock::new());

    let ctx = Arc::new(BotContext {
        conversations,
        activity: activity.clone(),
        text: Arc::new(text_provider),
        image: Arc::new(StabilityProvider::from_settings(&settings)),
        bot_username,
    });
    let transport = Arc::new(TelegramTransport::new(bot.clone()));

    let cancel = CancellationToken::new();
    let liveness = LivenessMonitor::new(
        activity,
        transport.clone(),
        Duration::from_secs(get_liveness_wake_interval()),
        Duration::from_secs(get_keep_alive_interval()),
    )
    .spawn(cancel.clone());

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![ctx, transport])
        // No per-chat serialization: every update gets its own task
        .distribution_function(|_| None::<std::convert::Infallible>)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    cancel.cancel();
    if let Err(e) = liveness.await {
        warn!(error = %e, "Liveness task ended abnormally");
    }
    info!("Bot stopped");
    Ok(())
}

/// Run `start`, and run it once more after `delay` if the first run fails.
///
/// # Errors
///
/// Returns the error of the second run.
pub async fn run_with_restart<F, Fut>(mut start: F, delay: Duration) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    if let Err(e) = start().await {
        error!(error = %e, delay_secs = delay.as_secs(), "Bot stopped with an error, restarting");
        tokio::time::sleep(delay).await;
        start().await?;
    }
    Ok(())
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(Update::filter_message().endpoint(handle_message))
}

async fn handle_message(
    msg: Message,
    ctx: Arc<BotContext>,
    transport: Arc<TelegramTransport>,
) -> Result<(), teloxide::RequestError> {
    match IncomingText::from_message(&msg) {
        Some(incoming) => handle_text(&ctx, transport.as_ref(), incoming).await,
        None => debug!(chat_id = msg.chat.id.0, "Ignoring non-text message"),
    }
    respond(())
}
