mod oauth;

pub use oauth::OAuthCredentials;

use super::{Post, Publisher, Routing, read_handle};
use crate::config::SocialConfig;
use crate::errors::{RelayError, RelayResult};
use crate::utils::http::{default_http_client, error_body};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use tracing::{info, warn};

const NAME: &str = "social";

/// The publish call is retried immediately, without backoff.
pub const MAX_PUBLISH_ATTEMPTS: u32 = 5;

const WEB_STATUS_URL: &str = "https://twitter.com/i/web/status/";

#[derive(Debug, Default, Deserialize)]
struct CreatedPost {
    #[serde(default)]
    data: Option<CreatedPostData>,
}

#[derive(Debug, Default, Deserialize)]
struct CreatedPostData {
    #[serde(default)]
    id: String,
}

/// Twitter-style client: v1 media upload plus v2 post creation.
pub struct SocialPublisher {
    credentials: OAuthCredentials,
    upload_url: String,
    api_url: String,
    routing: Routing,
    client: Client,
}

impl SocialPublisher {
    pub fn new(config: &SocialConfig) -> Self {
        Self::with_client(config, default_http_client())
    }

    pub fn with_client(config: &SocialConfig, client: Client) -> Self {
        // One account per configuration: a test account takes test traffic only.
        let routing = Routing {
            production: config.account.clone(),
            test: None,
            test_primary: config.test_account,
        };
        Self {
            credentials: OAuthCredentials {
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                access_token: config.access_token.clone(),
                access_token_secret: config.access_token_secret.clone(),
            },
            upload_url: config.upload_url.clone(),
            api_url: config.api_url.clone(),
            routing,
            client,
        }
    }

    async fn publish_once(&self, body: &Value) -> Result<String, (Option<u16>, String)> {
        let auth = self
            .credentials
            .authorization_header("POST", &self.api_url, &[])
            .map_err(|e| (None, e.to_string()))?;
        let resp = self
            .client
            .post(&self.api_url)
            .header(AUTHORIZATION, auth)
            .json(body)
            .send()
            .await
            .map_err(|e| (None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err((
                Some(status.as_u16()),
                format!("status {}: {}", status.as_u16(), body),
            ));
        }

        let created: CreatedPost = resp
            .json()
            .await
            .map_err(|e| (Some(status.as_u16()), format!("invalid response: {e}")))?;
        created
            .data
            .map(|d| d.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| (Some(status.as_u16()), "response carried no post id".to_string()))
    }
}

/// Post body: the quoted text, attributed to the sender.
pub fn format_text(text: &str, sender: &str) -> String {
    format!("\"{text}\"\n\n\u{2013} {sender}")
}

/// Media id from an upload response, preferring the string form.
fn media_id(body: &Value) -> Option<String> {
    match body.get("media_id_string").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => body
            .get("media_id")
            .and_then(Value::as_u64)
            .map(|id| id.to_string()),
    }
}

#[async_trait]
impl Publisher for SocialPublisher {
    fn name(&self) -> &str {
        NAME
    }

    fn routing(&self) -> &Routing {
        &self.routing
    }

    async fn upload(&self, target: &str, handle: &Path) -> RelayResult<String> {
        let upload_err = |status: Option<u16>, message: String| RelayError::Upload {
            destination: NAME.to_string(),
            status,
            message,
        };

        let (file_name, bytes) = read_handle(NAME, handle).await?;
        let form = Form::new()
            .text("media_category", "tweet_image")
            .part("media", Part::bytes(bytes).file_name(file_name));
        let auth = self
            .credentials
            .authorization_header("POST", &self.upload_url, &[])
            .map_err(|e| upload_err(None, e.to_string()))?;

        let resp = self
            .client
            .post(&self.upload_url)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upload_err(None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err(upload_err(
                Some(status.as_u16()),
                format!("upload returned {}: {}", status.as_u16(), body),
            ));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| upload_err(Some(status.as_u16()), format!("invalid response: {e}")))?;
        let id = media_id(&body).ok_or_else(|| {
            upload_err(
                Some(status.as_u16()),
                "upload response carried no media id".to_string(),
            )
        })?;

        info!("social: uploaded {} as media {} ({})", handle.display(), id, target);
        Ok(id)
    }

    async fn publish(&self, target: &str, post: &Post<'_>) -> RelayResult<String> {
        let mut body = json!({ "text": format_text(post.text, post.sender) });
        if !post.media_refs.is_empty() {
            body["media"] = json!({ "media_ids": post.media_refs });
        }

        let mut last_status = None;
        let mut last_message = String::new();
        for attempt in 1..=MAX_PUBLISH_ATTEMPTS {
            match self.publish_once(&body).await {
                Ok(id) => {
                    let url = format!("{WEB_STATUS_URL}{id}");
                    info!(
                        "social: posted {} to {} (attempt {}/{})",
                        url, target, attempt, MAX_PUBLISH_ATTEMPTS
                    );
                    return Ok(url);
                }
                Err((status, message)) => {
                    warn!(
                        "social: publish attempt {}/{} failed: {}",
                        attempt, MAX_PUBLISH_ATTEMPTS, message
                    );
                    last_status = status;
                    last_message = message;
                }
            }
        }

        Err(RelayError::Publish {
            destination: NAME.to_string(),
            status: last_status,
            attempts: MAX_PUBLISH_ATTEMPTS,
            message: last_message,
        })
    }
}
