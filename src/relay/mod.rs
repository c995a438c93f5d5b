//! The fan-out core.
//!
//! [`RelayOrchestrator::relay`] takes one normalized inbound message through
//! sender resolution, media staging and every configured destination, then
//! returns the acknowledgment for the inbound channel. It never fails: errors
//! are logged and handed to the [`ErrorReporter`].

mod message;

pub use message::{
    Acknowledgment, Message, NormalizedInbound, PublishOutcome, TEST_PREFIX, is_test_message,
};

use crate::config::Config;
use crate::destinations::{self, Post, Publisher};
use crate::errors::RelayError;
use crate::reporting::{self, ErrorReporter};
use crate::roster::Roster;
use crate::staging::MediaStager;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RelayOrchestrator {
    roster: Arc<Roster>,
    stager: MediaStager,
    publishers: Vec<Box<dyn Publisher>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl RelayOrchestrator {
    /// `publishers` are driven in the given order; the first one is primary.
    pub fn new(
        roster: Arc<Roster>,
        stager: MediaStager,
        publishers: Vec<Box<dyn Publisher>>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            roster,
            stager,
            publishers,
            reporter,
        }
    }

    /// Wire everything from configuration. Fails only if the roster can't be loaded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let roster_path = PathBuf::from(&config.roster_file);
        let roster = Roster::load(&roster_path)
            .with_context(|| format!("Failed to load roster {}", roster_path.display()))?;
        info!("relay: loaded {} roster entries", roster.len());

        let publishers = destinations::from_config(config);
        if publishers.is_empty() {
            warn!("relay: no destinations configured, messages will not be published");
        }

        Ok(Self::new(
            Arc::new(roster),
            MediaStager::new(config.media_root()?),
            publishers,
            reporting::from_config(config),
        ))
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn destination_names(&self) -> Vec<&str> {
        self.publishers.iter().map(|p| p.name()).collect()
    }

    pub async fn relay(&self, inbound: NormalizedInbound) -> Acknowledgment {
        self.relay_message(inbound).await.0
    }

    /// Like [`relay`](Self::relay), also returning the processed message with
    /// its per-destination outcomes.
    pub async fn relay_message(&self, inbound: NormalizedInbound) -> (Acknowledgment, Message) {
        let sender_name = self.roster.resolve(&inbound.sender_token);
        let mut message = Message::from_inbound(inbound, sender_name);

        if !message.is_known_sender() {
            info!("relay: rejected message from unknown sender {}", message.sender_token);
            return (Acknowledgment::Rejected, message);
        }

        info!(
            "relay: message from {} ({} attachment(s))",
            message.sender_name,
            message.remote_media.len()
        );

        if !message.has_media() {
            self.fan_out(&mut message).await;
            Self::log_done(&message);
            let ack = Acknowledgment::Posted(self.primary_url(&message));
            return (ack, message);
        }

        let mut area = match self.stager.begin() {
            Ok(area) => area,
            Err(e) => {
                self.report(&e, "stage media").await;
                return (Acknowledgment::Posted(String::new()), message);
            }
        };

        match area.stage(&message.remote_media).await {
            Ok(handles) => {
                message.staged_media = handles;
                self.fan_out(&mut message).await;
            }
            Err(e) => {
                // Nothing is published; keep what was fetched so release() sees it.
                message.staged_media = area.handles().to_vec();
                self.report(&e, "stage media").await;
            }
        }

        area.release().await;
        Self::log_done(&message);

        let ack = Acknowledgment::Posted(self.primary_url(&message));
        (ack, message)
    }

    fn log_done(message: &Message) {
        let elapsed = Utc::now() - message.received_at;
        let posted = message
            .per_destination_results
            .values()
            .filter(|o| o.is_success())
            .count();
        info!(
            "relay: {}/{} destination(s) posted in {}ms",
            posted,
            message.per_destination_results.len(),
            elapsed.num_milliseconds()
        );
    }

    async fn fan_out(&self, message: &mut Message) {
        let is_test = is_test_message(message);
        for publisher in &self.publishers {
            let Some(target) = publisher.routing().select(is_test) else {
                debug!(
                    "relay: skipping {} for {} message",
                    publisher.name(),
                    if is_test { "test" } else { "production" }
                );
                continue;
            };
            let outcome = self.drive(publisher.as_ref(), target, message).await;
            message
                .per_destination_results
                .insert(publisher.name().to_string(), outcome);
        }
    }

    /// Upload every staged handle in order, then publish. The first failure
    /// ends this destination only.
    async fn drive(
        &self,
        publisher: &dyn Publisher,
        target: &str,
        message: &Message,
    ) -> PublishOutcome {
        let mut outcome = PublishOutcome::new(publisher.name());

        for handle in &message.staged_media {
            match publisher.upload(target, handle).await {
                Ok(reference) => outcome.remote_media_refs.push(reference),
                Err(e) => {
                    outcome.error = Some(e.kind());
                    self.report(&e, &format!("upload to {}", publisher.name()))
                        .await;
                    return outcome;
                }
            }
        }

        let post = Post {
            text: &message.text,
            sender: &message.sender_name,
            media_refs: &outcome.remote_media_refs,
        };
        let published = publisher.publish(target, &post).await;
        match published {
            Ok(url) => outcome.post_url = Some(url),
            Err(e) => {
                outcome.error = Some(e.kind());
                self.report(&e, &format!("publish to {}", publisher.name()))
                    .await;
            }
        }
        outcome
    }

    /// Post URL of the primary (first configured) destination, or empty.
    fn primary_url(&self, message: &Message) -> String {
        self.publishers
            .first()
            .and_then(|p| message.outcome(p.name()))
            .and_then(|o| o.post_url.clone())
            .unwrap_or_default()
    }

    async fn report(&self, err: &RelayError, context: &str) {
        warn!("relay: {} failed: {}", context, err);
        self.reporter.notify(err, context).await;
    }
}
