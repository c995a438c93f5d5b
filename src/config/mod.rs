pub mod credentials;
pub mod loader;
pub mod schema;

pub use loader::{get_config_path, load_config};
pub use schema::{
    Config, DEFAULT_MICROBLOG_URL, DEFAULT_SOCIAL_API_URL, DEFAULT_SOCIAL_UPLOAD_URL,
    ErrorReportingConfig, MicroblogConfig, ServerConfig, SocialConfig,
};
