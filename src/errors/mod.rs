use thiserror::Error;

/// Typed error hierarchy for txtpost.
///
/// Use at module boundaries (media staging, destination calls, config validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {url}: {message}")]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Upload error: {destination}: {message}")]
    Upload {
        destination: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Publish error: {destination}: {message} (after {attempts} attempt(s))")]
    Publish {
        destination: String,
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Copyable discriminant of a [`RelayError`], recorded on publish outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Fetch,
    Upload,
    Publish,
    Internal,
}

/// Convenience alias for results using `RelayError`.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::Upload { .. } => ErrorKind::Upload,
            Self::Publish { .. } => ErrorKind::Publish,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status observed on the failing call, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. }
            | Self::Upload { status, .. }
            | Self::Publish { status, .. } => *status,
            Self::Config(_) | Self::Internal(_) => None,
        }
    }

    /// Number of publish attempts made before giving up (1 for everything but publish).
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Publish { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}
