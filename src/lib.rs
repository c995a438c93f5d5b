#![warn(clippy::pedantic)]
// Noisy doc/signature lints
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: format!("{}", x) over format!("{x}")
#![allow(clippy::uninlined_format_args)]
// Content-Length and status codes are narrowed on purpose
#![allow(clippy::cast_possible_truncation)]
// destinations::social::SocialPublisher and friends
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod destinations;
pub mod errors;
pub mod gateway;
pub mod relay;
pub mod reporting;
pub mod roster;
pub mod staging;
pub(crate) mod utils;

pub use errors::{ErrorKind, RelayError, RelayResult};
pub use relay::{Acknowledgment, NormalizedInbound, RelayOrchestrator};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
