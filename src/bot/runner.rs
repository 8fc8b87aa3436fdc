//! Long-polling front-end used in development.

use super::channel::TelegramChannel;
use super::handlers::CommandRouter;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};

/// Runs the polling dispatcher until Ctrl-C.
///
/// Any webhook left over from a production deployment is removed first,
/// otherwise Telegram refuses `getUpdates`.
pub async fn run_polling(bot: Bot, router: Arc<CommandRouter>) {
    if let Err(e) = bot.delete_webhook().await {
        error!("Failed to delete webhook before polling: {}", e);
    }

    info!("Bot is running (polling)...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![router])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message().endpoint(handle_message)
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    router: Arc<CommandRouter>,
) -> Result<(), teloxide::RequestError> {
    let channel = TelegramChannel::new(bot, msg.chat.id);
    if let Err(e) = router.handle(&channel, msg.text()).await {
        error!("Message handler error in chat {}: {}", msg.chat.id, e);
    }
    respond(())
}
