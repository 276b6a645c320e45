//! Gateway HTTP server (single port).

use crate::channels::{parse_webhook, LineChannel, ReplySender, SIGNATURE_HEADER};
use crate::config::{self, Config};
use crate::reply::ReplyBuilder;
use crate::router::{EventOutcome, EventRouter};
use crate::session::MemorySessionStore;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Port reported by the health probe.
    pub port: u16,
    /// Channel secret for X-Line-Signature verification.
    pub channel_secret: Arc<str>,
    pub router: Arc<EventRouter>,
}

impl GatewayState {
    pub fn new(port: u16, channel_secret: impl Into<Arc<str>>, router: Arc<EventRouter>) -> Self {
        Self {
            port,
            channel_secret: channel_secret.into(),
            router,
        }
    }

    /// Wire the router from config: LINE reply channel, configured replies, and `sessions`.
    /// Fails when no channel secret is configured, since deliveries could not be verified.
    pub fn from_config(config: &Config, sessions: Arc<MemorySessionStore>) -> Result<Self> {
        let Some(secret) = config::resolve_channel_secret(config) else {
            anyhow::bail!(
                "LINE channel secret not configured (set LINE_CHANNEL_SECRET or line.channelSecret)"
            );
        };
        let token = config::resolve_channel_token(config);
        if token.is_none() {
            log::warn!(
                "LINE channel access token not configured; replies will fail (set LINE_CHANNEL_TOKEN)"
            );
        }
        let sender: Arc<dyn ReplySender> =
            Arc::new(LineChannel::new(config.line.api_base.clone(), token));
        let router = EventRouter::new(
            sessions,
            ReplyBuilder::new(config.replies.clone()),
            sender,
            config.sessions.registration,
        );
        Ok(Self::new(config.gateway.port, secret, Arc::new(router)))
    }
}

/// HTTP routes: `GET /` health and `POST {webhook_path}` deliveries.
pub fn build_router(state: GatewayState, webhook_path: &str) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route(webhook_path, post(line_webhook))
        .with_state(state)
}

/// Run the gateway until SIGINT/SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    config
        .replies
        .validate()
        .context("invalid reply templates")?;
    let webhook_path = config.gateway.webhook_path.trim();
    if !webhook_path.starts_with('/') || webhook_path == "/" {
        anyhow::bail!(
            "gateway.webhookPath must start with '/' and not be the root (got {:?})",
            webhook_path
        );
    }

    let sessions = Arc::new(MemorySessionStore::with_ttl(config.sessions.ttl()));
    let state = GatewayState::from_config(&config, sessions.clone())?;
    log::info!(
        "pending contexts: registration {:?}, ttl {:?}",
        config.sessions.registration,
        sessions.ttl()
    );
    let sweeper = spawn_expiry_sweeper(sessions);

    let app = build_router(state, webhook_path);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {} (webhook {})", bind_addr, webhook_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    if let Some(h) = sweeper {
        h.abort();
    }
    log::info!("gateway stopped");
    Ok(())
}

/// With a TTL, periodically drop contexts of users who never answered.
fn spawn_expiry_sweeper(sessions: Arc<MemorySessionStore>) -> Option<JoinHandle<()>> {
    let ttl = sessions.ttl()?;
    Some(tokio::spawn(async move {
        let mut tick = tokio::time::interval(ttl);
        loop {
            tick.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                log::debug!("expired {} pending contexts", removed);
            }
        }
    }))
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST webhook: verify signature, parse, route every event, then answer.
/// Bad or missing signature → 400; unparsable body → 500. Per-event failures still yield 200.
async fn line_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let events = match parse_webhook(&state.channel_secret, signature, &body) {
        Ok(events) => events,
        Err(e) if e.is_signature_error() => {
            log::warn!("rejected webhook delivery: {}", e);
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            log::warn!("failed to parse webhook delivery: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    let outcomes = state.router.handle_events(events).await;
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, EventOutcome::Failed(_)))
        .count();
    log::debug!(
        "webhook delivery handled: {} events, {} failed",
        outcomes.len(),
        failed
    );
    StatusCode::OK
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.port,
    }))
}
