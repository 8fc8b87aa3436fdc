use dotenvy::dotenv;
use file_relay_bot::bot::{runner, CommandRouter, TelegramGateway};
use file_relay_bot::config::{RunMode, Settings};
use file_relay_bot::logging::{init_logging, RedactionPatterns};
use file_relay_bot::relay::fetch::ReqwestFetcher;
use file_relay_bot::relay::RelayPipeline;
use file_relay_bot::web::{self, WebhookState};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);
    init_logging(patterns);

    info!("Starting file relay bot...");

    let settings = init_settings();
    let (token, run_mode) = match (settings.bot_token(), settings.run_mode()) {
        (Ok(token), Ok(mode)) => (token.to_string(), mode),
        (Err(e), _) | (_, Err(e)) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let bot = Bot::new(token);
    let router = Arc::new(init_router());

    match run_mode {
        RunMode::Polling => {
            info!("🚀 Starting bot in development mode (polling)");
            runner::run_polling(bot, router).await;
        }
        RunMode::Webhook { url, secret } => {
            info!("🌐 Starting bot in production mode (webhook)");
            let state = Arc::new(WebhookState {
                gateway: Arc::new(TelegramGateway::new(bot)),
                router,
                secret,
                environment: settings.environment.clone(),
            });
            if let Err(e) = web::serve(state, &settings.bind_address, settings.port, &url).await {
                error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_router() -> CommandRouter {
    match ReqwestFetcher::new() {
        Ok(fetcher) => CommandRouter::new(RelayPipeline::new(Arc::new(fetcher))),
        Err(e) => {
            error!("Failed to initialize HTTP client: {}", e);
            std::process::exit(1);
        }
    }
}
