use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use gbingo_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use gbingo_core::{
    config::Config, game::Game, messaging::port::MessagingPort, security::Authorizer,
    service::GameService, utils::AuditLogger,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub game: Arc<GameService>,
    pub messenger: Arc<dyn MessagingPort>,
    pub authorizer: Arc<Authorizer>,
    pub audit: Arc<AuditLogger>,
}

impl AppState {
    /// Largest text we put in a single outbound message.
    pub fn message_limit(&self) -> usize {
        self.messenger
            .capabilities()
            .safe_len(self.cfg.telegram_safe_limit.min(self.cfg.telegram_message_limit))
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!("gbingo started: @{}", me.username()),
        Err(e) => tracing::warn!("get_me failed: {e}"),
    }
    tracing::info!(
        allowed_chats = cfg.allowed_chats.len(),
        superuser = cfg.superuser_id.is_some(),
        policy = %cfg.default_policy,
        "configuration loaded"
    );

    // Admin lookups go straight to Telegram; outbound messages are throttled.
    // We still keep a 429 RetryAfter retry at the Telegram adapter layer.
    let raw_messenger = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger.clone(),
        ThrottleConfig::default(),
    ));

    let game = match cfg.rng_seed {
        Some(seed) => {
            tracing::warn!(seed, "using a fixed RNG seed; draws are reproducible");
            Game::with_seed(seed)
        }
        None => Game::new(),
    };
    let display_limit = messenger
        .capabilities()
        .safe_len(cfg.telegram_safe_limit.min(cfg.telegram_message_limit));
    let service = Arc::new(GameService::new(
        game,
        messenger.clone(),
        cfg.default_policy,
        display_limit,
    ));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        game: service,
        messenger,
        authorizer: Arc::new(Authorizer::new(
            cfg.allowed_chats.clone(),
            cfg.superuser_id,
            raw_messenger,
        )),
        audit: Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        )),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("gbingo stopped");
    Ok(())
}
