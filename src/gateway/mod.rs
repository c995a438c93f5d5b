//! Inbound SMS webhook.
//!
//! Parses Twilio-style form posts into a [`NormalizedInbound`], hands it to the
//! relay and answers with TwiML carrying the acknowledgment.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::relay::{NormalizedInbound, RelayOrchestrator};

/// Max webhook payload size: 1 MB.
const WEBHOOK_MAX_BODY: usize = 1_048_576;

/// Twilio attaches at most ten media items to one message.
pub const MAX_MEDIA_ITEMS: usize = 10;

/// Build the router: `GET /status` plus the configured inbound route.
pub fn build_router(route: &str, relay: Arc<RelayOrchestrator>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route(route, post(inbound_handler))
        .layer(DefaultBodyLimit::max(WEBHOOK_MAX_BODY))
        .with_state(relay)
}

/// GET /status: liveness check.
async fn status_handler() -> &'static str {
    "ok"
}

/// POST <route>: one inbound SMS. Always 200, whatever the relay did.
async fn inbound_handler(
    State(relay): State<Arc<RelayOrchestrator>>,
    body: String,
) -> impl IntoResponse {
    let inbound = parse_inbound(&body);
    debug!(
        "gateway: SMS from={}, body_len={}, media={}",
        inbound.sender_token,
        inbound.text.len(),
        inbound.media_urls.len()
    );

    let ack = relay.relay(inbound).await;
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/xml")],
        twiml(&ack.to_string()),
    )
}

/// Normalize a form-encoded webhook body. Missing fields default to empty.
pub fn parse_inbound(body: &str) -> NormalizedInbound {
    let mut sender_token = String::new();
    let mut text = String::new();
    let mut num_media = String::new();
    let mut media: Vec<Option<String>> = vec![None; MAX_MEDIA_ITEMS];

    for (key, value) in form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "From" => sender_token = value.into_owned(),
            "Body" => text = value.into_owned(),
            "NumMedia" => num_media = value.into_owned(),
            k => {
                if let Some(index) = k.strip_prefix("MediaUrl")
                    && let Ok(index) = index.parse::<usize>()
                    && index < MAX_MEDIA_ITEMS
                {
                    media[index] = Some(value.into_owned());
                }
            }
        }
    }

    let count = media_count(&num_media);
    let media_urls = media
        .into_iter()
        .take(count)
        .enumerate()
        .filter_map(|(i, url)| {
            let url = url.filter(|u| !u.is_empty());
            if url.is_none() {
                warn!("gateway: NumMedia={} but MediaUrl{} is missing", count, i);
            }
            url
        })
        .collect();

    NormalizedInbound {
        sender_token,
        text,
        media_urls,
    }
}

fn media_count(raw: &str) -> usize {
    if raw.is_empty() {
        return 0;
    }
    match raw.trim().parse::<usize>() {
        Ok(n) if n > MAX_MEDIA_ITEMS => {
            warn!("gateway: NumMedia={} exceeds {}, truncating", n, MAX_MEDIA_ITEMS);
            MAX_MEDIA_ITEMS
        }
        Ok(n) => n,
        Err(_) => {
            warn!("gateway: invalid NumMedia {:?}, ignoring attachments", raw);
            0
        }
    }
}

/// TwiML reply with a single escaped `<Message>`.
pub fn twiml(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response><Message>{}</Message></Response>",
        html_escape::encode_text(message)
    )
}

/// Bind the configured listen address and serve until Ctrl-C.
pub async fn serve(config: &Config, relay: Arc<RelayOrchestrator>) -> Result<()> {
    let app = build_router(&config.server.route, relay);
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!(
        "gateway: listening on {} (POST {})",
        config.server.listen, config.server.route
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("gateway: shutting down"),
                Err(e) => {
                    warn!("gateway: cannot listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
        .context("HTTP server error")
}
