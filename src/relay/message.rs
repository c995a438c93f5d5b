use crate::errors::ErrorKind;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Literal marker that flags a message as test traffic.
pub const TEST_PREFIX: &str = "TEST:";

/// Inbound payload as handed over by the gateway. Fields are always present;
/// the gateway defaults missing form fields to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedInbound {
    pub sender_token: String,
    pub text: String,
    pub media_urls: Vec<String>,
}

/// One relay's unit of work. Built once per inbound event and filled in as it
/// moves through staging and fan-out.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub sender_token: String,
    /// Empty when the sender is not on the roster.
    pub sender_name: String,
    pub text: String,
    /// Attachment URLs in the order received.
    pub remote_media: Vec<String>,
    /// Local handles, index-aligned with `remote_media` once staging succeeds.
    pub staged_media: Vec<PathBuf>,
    /// Outcomes keyed by destination name, in fan-out order.
    pub per_destination_results: IndexMap<String, PublishOutcome>,
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn from_inbound(inbound: NormalizedInbound, sender_name: String) -> Self {
        Self {
            sender_token: inbound.sender_token,
            sender_name,
            text: inbound.text,
            remote_media: inbound.media_urls,
            staged_media: Vec::new(),
            per_destination_results: IndexMap::new(),
            received_at: Utc::now(),
        }
    }

    pub fn is_known_sender(&self) -> bool {
        !self.sender_name.is_empty()
    }

    pub fn has_media(&self) -> bool {
        !self.remote_media.is_empty()
    }

    pub fn outcome(&self, destination: &str) -> Option<&PublishOutcome> {
        self.per_destination_results.get(destination)
    }
}

/// Whether a message is test traffic. Depends only on the message itself.
pub fn is_test_message(message: &Message) -> bool {
    message.text.starts_with(TEST_PREFIX)
}

/// Result of driving one destination for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub destination_name: String,
    /// Destination-assigned media references, parallel to `staged_media`.
    pub remote_media_refs: Vec<String>,
    /// Set only on success.
    pub post_url: Option<String>,
    pub error: Option<ErrorKind>,
}

impl PublishOutcome {
    pub fn new(destination_name: impl Into<String>) -> Self {
        Self {
            destination_name: destination_name.into(),
            remote_media_refs: Vec::new(),
            post_url: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.post_url.is_some()
    }
}

/// Synchronous reply to the inbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgment {
    /// Sender is not on the roster; nothing was published.
    Rejected,
    /// Always returned for known senders, whatever happened downstream.
    /// Carries the primary destination's post URL, or an empty string.
    Posted(String),
}

impl fmt::Display for Acknowledgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => f.write_str("rejected: unrecognized sender"),
            Self::Posted(url) => write!(f, "posted: {url}"),
        }
    }
}
