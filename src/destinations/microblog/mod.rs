use super::{Post, Publisher, Routing, read_handle};
use crate::config::MicroblogConfig;
use crate::errors::{RelayError, RelayResult};
use crate::utils::http::{default_http_client, error_body};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::LOCATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const NAME: &str = "microblog";

/// Highest status Micro.blog returns for an accepted post.
const MAX_ACCEPTED_STATUS: u16 = 202;

#[derive(Debug, Default, Deserialize)]
struct MicropubResponse {
    #[serde(default)]
    url: String,
}

/// Micropub client for Micro.blog-style endpoints.
pub struct MicroblogPublisher {
    token: String,
    base_url: String,
    routing: Routing,
    client: Client,
}

impl MicroblogPublisher {
    pub fn new(config: &MicroblogConfig) -> Self {
        Self::with_client(config, default_http_client())
    }

    pub fn with_client(config: &MicroblogConfig, client: Client) -> Self {
        let routing = Routing {
            production: config.destination.clone(),
            test: config
                .test_destination
                .clone()
                .filter(|_| !config.test_primary),
            test_primary: config.test_primary,
        };
        Self {
            token: config.token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            routing,
            client,
        }
    }

    fn media_endpoint(&self) -> String {
        format!("{}/media", self.base_url)
    }

    fn upload_err(status: Option<u16>, message: impl Into<String>) -> RelayError {
        RelayError::Upload {
            destination: NAME.to_string(),
            status,
            message: message.into(),
        }
    }

    fn publish_err(status: Option<u16>, message: impl Into<String>) -> RelayError {
        RelayError::Publish {
            destination: NAME.to_string(),
            status,
            attempts: 1,
            message: message.into(),
        }
    }
}

/// Micropub `content`: the text as a blockquote, attributed to the sender.
pub fn format_content(text: &str, sender: &str) -> String {
    let text = if text.is_empty() { "&nbsp;" } else { text };
    let sender = if sender.is_empty() {
        "(unknown sender)"
    } else {
        sender
    };
    format!("> {text}\n\n&ndash; {sender}")
}

#[async_trait]
impl Publisher for MicroblogPublisher {
    fn name(&self) -> &str {
        NAME
    }

    fn routing(&self) -> &Routing {
        &self.routing
    }

    async fn upload(&self, target: &str, handle: &Path) -> RelayResult<String> {
        let (file_name, bytes) = read_handle(NAME, handle).await?;
        // Micropub media endpoints require the part to be named "file".
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let resp = self
            .client
            .post(self.media_endpoint())
            .query(&[("mp-destination", target)])
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Self::upload_err(None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            return Err(Self::upload_err(
                Some(status.as_u16()),
                format!("media endpoint returned {}: {}", status.as_u16(), body),
            ));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                Self::upload_err(Some(status.as_u16()), "media endpoint returned no Location")
            })?;

        info!("microblog: uploaded {} as {}", handle.display(), location);
        Ok(location)
    }

    async fn publish(&self, target: &str, post: &Post<'_>) -> RelayResult<String> {
        let mut fields: Vec<(&str, String)> = vec![
            ("h", "entry".to_string()),
            ("content", format_content(post.text, post.sender)),
            ("category", "txt".to_string()),
        ];
        fields.extend(post.media_refs.iter().map(|r| ("photo[]", r.clone())));

        let resp = self
            .client
            .post(&self.base_url)
            .query(&[("mp-destination", target)])
            .bearer_auth(&self.token)
            .form(&fields)
            .send()
            .await
            .map_err(|e| Self::publish_err(None, e.to_string()))?;

        let status = resp.status();
        if status.as_u16() > MAX_ACCEPTED_STATUS || !status.is_success() {
            let body = error_body(resp).await;
            return Err(Self::publish_err(
                Some(status.as_u16()),
                format!(
                    "got status code {} posting the message: {}",
                    status.as_u16(),
                    body
                ),
            ));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .text()
            .await
            .map_err(|e| Self::publish_err(Some(status.as_u16()), e.to_string()))?;
        let parsed: MicropubResponse = serde_json::from_str(&body).unwrap_or_else(|e| {
            debug!("microblog: response is not JSON ({}), falling back to Location", e);
            MicropubResponse::default()
        });

        let url = if parsed.url.is_empty() {
            location.filter(|l| !l.is_empty())
        } else {
            Some(parsed.url)
        };
        let url = url.ok_or_else(|| {
            Self::publish_err(Some(status.as_u16()), "response carried no post URL")
        })?;

        info!("microblog: posted {} to {}", url, target);
        Ok(url)
    }
}
