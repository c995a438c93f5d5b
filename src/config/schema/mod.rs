use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`            : printed normally via `&self.field_name`
/// - `redact(field_name)`    : `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    // Internal: emit a single .field() call
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    // Internal: recursive TT muncher
    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    // Entry point
    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// Submodules are declared after the macro so they can use `redact_debug!`
mod destinations;

pub use destinations::*;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_route() -> String {
    "/sms".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_route")]
    pub route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            route: default_route(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error reporting
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ErrorReportingConfig {
    #[serde(default, rename = "honeybadgerApiKey")]
    pub honeybadger_api_key: String,
    #[serde(default)]
    pub environment: String,
}

redact_debug!(
    ErrorReportingConfig,
    redact(honeybadger_api_key),
    environment,
);

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

fn default_roster_file() -> String {
    "users.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// JSON file mapping sender phone numbers to display names.
    #[serde(default = "default_roster_file", rename = "rosterFile")]
    pub roster_file: String,
    /// Root directory for staged media. Empty means `<home>/media`.
    #[serde(default, rename = "mediaDir")]
    pub media_dir: String,
    /// Log destination. Empty or `stderr` logs to stderr.
    #[serde(default)]
    pub logfile: String,
    #[serde(default, rename = "errorReporting")]
    pub error_reporting: ErrorReportingConfig,
    #[serde(default)]
    pub microblog: Option<MicroblogConfig>,
    #[serde(default)]
    pub social: Option<SocialConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            roster_file: default_roster_file(),
            media_dir: String::new(),
            logfile: String::new(),
            error_reporting: ErrorReportingConfig::default(),
            microblog: None,
            social: None,
        }
    }
}

impl Config {
    /// Resolved media staging root.
    pub fn media_root(&self) -> anyhow::Result<PathBuf> {
        if self.media_dir.is_empty() {
            Ok(crate::utils::get_txtpost_home()?.join("media"))
        } else {
            Ok(PathBuf::from(&self.media_dir))
        }
    }

    /// Names of the configured destinations, in fan-out order.
    pub fn destination_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.microblog.is_some() {
            names.push("microblog");
        }
        if self.social.is_some() {
            names.push("social");
        }
        names
    }

    pub fn validate(&self) -> Result<(), crate::errors::RelayError> {
        self.validate_server()?;
        self.validate_microblog()?;
        self.validate_social()?;
        if self.microblog.is_none() && self.social.is_none() {
            warn!("no destinations configured; messages will be acknowledged but not posted");
        }
        Ok(())
    }

    fn validate_server(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;

        if self.server.listen.trim().is_empty() {
            return Err(RelayError::Config("server.listen must not be empty".into()));
        }
        if !self.server.route.starts_with('/') {
            return Err(RelayError::Config(format!(
                "server.route must start with '/' (got {:?})",
                self.server.route
            )));
        }
        if self.server.route == "/status" {
            return Err(RelayError::Config(
                "server.route must not shadow the /status endpoint".into(),
            ));
        }
        Ok(())
    }

    fn validate_microblog(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;

        let Some(mb) = &self.microblog else {
            return Ok(());
        };
        if mb.token.is_empty() {
            return Err(RelayError::Config(
                "microblog.token must be set when microblog is configured".into(),
            ));
        }
        if mb.destination.is_empty() {
            return Err(RelayError::Config(
                "microblog.destination must be set when microblog is configured".into(),
            ));
        }
        if url::Url::parse(&mb.base_url).is_err() {
            return Err(RelayError::Config(format!(
                "microblog.baseUrl is not a valid URL: {}",
                mb.base_url
            )));
        }
        if mb.test_primary && mb.test_destination.is_some() {
            warn!("microblog.testDestination is ignored when microblog.testPrimary is set");
        }
        Ok(())
    }

    fn validate_social(&self) -> Result<(), crate::errors::RelayError> {
        use crate::errors::RelayError;

        let Some(social) = &self.social else {
            return Ok(());
        };
        for (name, value) in [
            ("consumerKey", &social.consumer_key),
            ("consumerSecret", &social.consumer_secret),
            ("accessToken", &social.access_token),
            ("accessTokenSecret", &social.access_token_secret),
        ] {
            if value.is_empty() {
                return Err(RelayError::Config(format!(
                    "social.{name} must be set when social is configured"
                )));
            }
        }
        for (name, value) in [("uploadUrl", &social.upload_url), ("apiUrl", &social.api_url)] {
            if url::Url::parse(value).is_err() {
                return Err(RelayError::Config(format!(
                    "social.{name} is not a valid URL: {value}"
                )));
            }
        }
        Ok(())
    }
}
