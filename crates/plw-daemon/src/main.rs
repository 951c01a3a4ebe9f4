//! plw-daemon entry point.
//!
//! Loads config and secrets, connects the store, warms the engine cache,
//! starts the scheduler and chat command loop, then serves HTTP. Route
//! handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use plw_catalog::{MembershipFetcher, SpotifyCatalog, SpotifyCredentials};
use plw_config::{report_unused_keys, secrets::resolve_secrets, TrackerConfig, UnusedKeyPolicy};
use plw_daemon::{commands, notifier, routes, state, telegram::TelegramClient};
use plw_runtime::{EngineSettings, LogNotifier, Notifier, PgStateStore, TrackerEngine};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const ENV_DAEMON_ADDR: &str = "PLW_DAEMON_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = plw_config::load_from_env().context("config load failed")?;
    let cfg = TrackerConfig::from_loaded(&loaded)?;
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !unused.is_clean() {
        warn!(keys = ?unused.unused_leaf_pointers, "unused config keys");
    }
    let secrets = resolve_secrets(&cfg)?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let pool = plw_db::connect_from_env().await?;
    plw_db::migrate(&pool).await?;

    let catalog: Arc<dyn MembershipFetcher> = Arc::new(
        SpotifyCatalog::new_with_base_urls(
            SpotifyCredentials {
                client_id: secrets.spotify_client_id.clone(),
                client_secret: secrets.spotify_client_secret.clone(),
                refresh_token: secrets.spotify_refresh_token.clone(),
            },
            cfg.catalog.api_base_url.clone(),
            cfg.catalog.accounts_base_url.clone(),
        )
        .with_page_limit(cfg.catalog.page_limit),
    );

    let telegram = secrets.telegram_bot_token.clone().map(|token| {
        Arc::new(
            TelegramClient::new_with_base_url(token, cfg.telegram.api_base_url.clone())
                .with_send_timeout(cfg.send_timeout()),
        )
    });

    let delivery: Arc<dyn Notifier> = match &telegram {
        Some(client) => Arc::new(notifier::TelegramNotifier::new(Arc::clone(client))),
        None => {
            warn!(
                env = %cfg.telegram.keys_env.bot_token,
                "no bot token; changes will be logged, not delivered"
            );
            Arc::new(LogNotifier)
        }
    };

    let bus = state::new_bus();
    let engine = Arc::new(TrackerEngine::new(
        Arc::clone(&catalog),
        Arc::new(PgStateStore::new(pool)),
        Arc::new(notifier::BusNotifier::new(delivery, bus.clone())),
        EngineSettings {
            fetch_timeout: cfg.reconcile_timeout(),
            notify_timeout: cfg.notify_timeout(),
        },
    ));

    let warmed = engine.warm_cache().await?;
    info!(warmed, "loaded tracked chats from store");

    let shared = Arc::new(state::AppState::new(
        Arc::clone(&engine),
        bus.clone(),
        cfg.check_interval(),
    ));

    state::spawn_heartbeat(bus, Duration::from_secs(1));
    state::spawn_reconcile_tick(Arc::clone(&shared), cfg.initial_delay());

    if let Some(client) = telegram {
        let handler = Arc::new(commands::CommandHandler::new(
            Arc::clone(&engine),
            catalog,
            Arc::clone(&client),
            cfg.tracker.platform.clone(),
            cfg.check_interval(),
        ));
        commands::spawn_command_loop(
            handler,
            client,
            Duration::from_secs(cfg.telegram.poll_timeout_secs),
        );
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&cfg.daemon.addr)?;
    info!("plw-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `PLW_DAEMON_ADDR` wins over the configured address.
fn bind_addr(configured: &str) -> anyhow::Result<SocketAddr> {
    if let Some(addr) = std::env::var(ENV_DAEMON_ADDR)
        .ok()
        .and_then(|v| v.parse().ok())
    {
        return Ok(addr);
    }
    configured
        .parse()
        .with_context(|| format!("invalid /daemon/addr: {configured}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
