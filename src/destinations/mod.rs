//! Publishing destinations.
//!
//! Every destination implements [`Publisher`]: upload one staged file at a time,
//! then publish the text with the ordered media references. The relay decides
//! which target (if any) each message goes to via the destination's [`Routing`].

pub mod microblog;
pub mod social;

pub use microblog::MicroblogPublisher;
pub use social::SocialPublisher;

use crate::config::Config;
use crate::errors::{RelayError, RelayResult};
use async_trait::async_trait;
use std::path::Path;

/// Text and media handed to [`Publisher::publish`].
#[derive(Debug, Clone, Copy)]
pub struct Post<'a> {
    pub text: &'a str,
    /// Resolved display name of the sender.
    pub sender: &'a str,
    /// Destination-assigned references, in attachment order.
    pub media_refs: &'a [String],
}

/// Where a destination sends production and test traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub production: String,
    pub test: Option<String>,
    /// The destination exists for test traffic: test messages go to
    /// `production`, everything else skips it.
    pub test_primary: bool,
}

impl Routing {
    pub fn new(production: impl Into<String>) -> Self {
        Self {
            production: production.into(),
            test: None,
            test_primary: false,
        }
    }

    /// Target for a message, or `None` when the destination must be skipped.
    ///
    /// Test messages never fall back to the production target.
    pub fn select(&self, is_test: bool) -> Option<&str> {
        let target = match (self.test_primary, is_test) {
            (true, true) | (false, false) => Some(self.production.as_str()),
            (true, false) => None,
            (false, true) => self.test.as_deref(),
        };
        target.filter(|t| !t.is_empty())
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    fn routing(&self) -> &Routing;

    /// Upload one staged file; returns the destination's reference for it.
    async fn upload(&self, target: &str, handle: &Path) -> RelayResult<String>;

    /// Publish the post; returns the public URL of the new post.
    async fn publish(&self, target: &str, post: &Post<'_>) -> RelayResult<String>;
}

/// Build the configured publishers in fan-out order (Micro.blog, then social).
pub fn from_config(config: &Config) -> Vec<Box<dyn Publisher>> {
    let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();
    if let Some(mb) = &config.microblog {
        publishers.push(Box::new(MicroblogPublisher::new(mb)));
    }
    if let Some(social) = &config.social {
        publishers.push(Box::new(SocialPublisher::new(social)));
    }
    publishers
}

/// Read a staged file for upload, mapping I/O failures to an upload error.
pub(crate) async fn read_handle(destination: &str, handle: &Path) -> RelayResult<(String, Vec<u8>)> {
    let bytes = tokio::fs::read(handle)
        .await
        .map_err(|e| RelayError::Upload {
            destination: destination.to_string(),
            status: None,
            message: format!("failed to read {}: {e}", handle.display()),
        })?;
    let file_name = handle
        .file_name()
        .map_or_else(|| "media".to_string(), |n| n.to_string_lossy().into_owned());
    Ok((file_name, bytes))
}
