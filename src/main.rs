use std::sync::Arc;

use teloxide::dispatching::HandlerExt;
use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use moviebot::config::Config;
use moviebot::relay::{
    CandidateSource, Command, Relay, RemoteSource, Selector, SqliteStore, TelegramClient, Trigger,
};
use moviebot::server;

fn exit_with(msg: impl std::fmt::Display) -> ! {
    error!("{msg}");
    eprintln!("{msg}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "moviebot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => exit_with(e),
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("moviebot.log"))
    {
        Ok(f) => f,
        Err(e) => exit_with(format!("Failed to open log file: {e}")),
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting moviebot...");
    info!("Loaded config from {config_path}");
    info!(
        "Default filter: rating>={} year>={} ({:?})",
        config.filter.min_rating, config.filter.min_year, config.filter.order
    );

    let needs_store = config.serve_http || config.selector_url.is_none();
    let selector = if needs_store {
        match SqliteStore::open(&config.database_path) {
            Ok(store) => Some(Arc::new(Selector::new(store, config.filter.clone()))),
            Err(e) => exit_with(format!("Failed to open {:?}: {e}", config.database_path)),
        }
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let http = match (&selector, config.serve_http) {
        (Some(selector), true) => {
            let shutdown = async move {
                shutdown_rx.await.ok();
            };
            Some(tokio::spawn(server::serve(config.http_addr, selector.clone(), shutdown)))
        }
        _ => None,
    };

    let bot = Bot::new(&config.telegram_bot_token);
    let telegram = TelegramClient::new(bot.clone());

    match (config.selector_url, selector) {
        (Some(url), _) => {
            info!("Bot reads candidates from {url}");
            let source = RemoteSource::new(url, config.filter);
            run_bot(bot, Relay::new(source, telegram, config.replies)).await;
        }
        (None, Some(selector)) => {
            run_bot(bot, Relay::new(selector, telegram, config.replies)).await;
        }
        (None, None) => unreachable!("store is opened whenever there is no selector_url"),
    }

    info!("Bot stopped, shutting down");
    shutdown_tx.send(()).ok();
    if let Some(handle) = http {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("HTTP server: {e}"),
            Err(e) => warn!("HTTP server task panicked: {e}"),
        }
    }
}

async fn run_bot<C: CandidateSource + 'static>(bot: Bot, relay: Relay<C, TelegramClient>) {
    let relay = Arc::new(relay);

    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command::<C>),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text::<C>));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![relay])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command<C: CandidateSource + 'static>(
    msg: Message,
    cmd: Command,
    relay: Arc<Relay<C, TelegramClient>>,
) -> ResponseResult<()> {
    info!("📨 {:?} in chat {}", cmd, msg.chat.id);
    // Failures are logged by the relay; there is nothing to retry.
    relay.dispatch(msg.chat.id.0, Trigger::Command(cmd)).await.ok();
    Ok(())
}

async fn handle_text<C: CandidateSource + 'static>(
    msg: Message,
    relay: Arc<Relay<C, TelegramClient>>,
) -> ResponseResult<()> {
    relay.dispatch(msg.chat.id.0, Trigger::Text).await.ok();
    Ok(())
}
