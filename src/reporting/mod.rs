//! Error reporting side channel.
//!
//! The relay never surfaces destination or staging failures to the caller;
//! they are logged and handed to an [`ErrorReporter`] instead.

use crate::config::Config;
use crate::errors::{ErrorKind, RelayError};
use crate::utils::http::{default_http_client, error_body};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const HONEYBADGER_NOTICES_URL: &str = "https://api.honeybadger.io/v1/notices";

#[async_trait]
pub trait ErrorReporter: Send + Sync {
    /// Record a failure. Must not fail itself.
    async fn notify(&self, err: &RelayError, context: &str);
}

/// Logs at error level and does nothing else.
#[derive(Debug, Default)]
pub struct TracingReporter;

#[async_trait]
impl ErrorReporter for TracingReporter {
    async fn notify(&self, err: &RelayError, context: &str) {
        error!("relay: {}: {}", context, err);
    }
}

/// Sends notices to Honeybadger. Its own failures are logged and swallowed.
pub struct HoneybadgerReporter {
    api_key: String,
    environment: String,
    url: String,
    client: Client,
}

impl HoneybadgerReporter {
    pub fn new(api_key: impl Into<String>, environment: impl Into<String>) -> Self {
        Self::with_url(api_key, environment, HONEYBADGER_NOTICES_URL)
    }

    pub fn with_url(
        api_key: impl Into<String>,
        environment: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            environment: environment.into(),
            url: url.into(),
            client: default_http_client(),
        }
    }
}

fn error_class(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Config => "ConfigError",
        ErrorKind::Fetch => "FetchError",
        ErrorKind::Upload => "UploadError",
        ErrorKind::Publish => "PublishError",
        ErrorKind::Internal => "InternalError",
    }
}

/// Honeybadger notice payload for one failure.
pub fn notice(err: &RelayError, context: &str, environment: &str) -> serde_json::Value {
    json!({
        "notifier": {
            "name": "txtpost",
            "version": crate::VERSION,
        },
        "error": {
            "class": error_class(err.kind()),
            "message": err.to_string(),
            "tags": [context],
        },
        "request": {
            "context": {
                "stage": context,
                "status": err.status(),
                "attempts": err.attempts(),
            },
        },
        "server": {
            "environment_name": environment,
        },
    })
}

#[async_trait]
impl ErrorReporter for HoneybadgerReporter {
    async fn notify(&self, err: &RelayError, context: &str) {
        // Local record first, the remote call may fail.
        error!("relay: {}: {}", context, err);

        let resp = self
            .client
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .header("Accept", "application/json")
            .json(&notice(err, context, &self.environment))
            .send()
            .await;
        match resp {
            Ok(r) if r.status().is_success() => debug!("reporting: notice sent"),
            Ok(r) => {
                let status = r.status().as_u16();
                warn!("reporting: honeybadger returned {}: {}", status, error_body(r).await);
            }
            Err(e) => warn!("reporting: failed to send notice: {}", e),
        }
    }
}

/// Honeybadger when an API key is configured, tracing otherwise.
pub fn from_config(config: &Config) -> Arc<dyn ErrorReporter> {
    let reporting = &config.error_reporting;
    if reporting.honeybadger_api_key.is_empty() {
        Arc::new(TracingReporter)
    } else {
        Arc::new(HoneybadgerReporter::new(
            reporting.honeybadger_api_key.clone(),
            reporting.environment.clone(),
        ))
    }
}
