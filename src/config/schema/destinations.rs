use serde::{Deserialize, Serialize};

pub const DEFAULT_MICROBLOG_URL: &str = "https://micro.blog/micropub";
pub const DEFAULT_SOCIAL_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
pub const DEFAULT_SOCIAL_API_URL: &str = "https://api.twitter.com/2/tweets";

fn default_microblog_url() -> String {
    DEFAULT_MICROBLOG_URL.to_string()
}

fn default_social_upload_url() -> String {
    DEFAULT_SOCIAL_UPLOAD_URL.to_string()
}

fn default_social_api_url() -> String {
    DEFAULT_SOCIAL_API_URL.to_string()
}

fn default_social_account() -> String {
    "primary".to_string()
}

/// Micropub destination (Micro.blog or compatible).
#[derive(Clone, Serialize, Deserialize)]
pub struct MicroblogConfig {
    #[serde(default)]
    pub token: String,
    /// Production `mp-destination` (the blog URL).
    #[serde(default)]
    pub destination: String,
    /// Blog that receives `TEST:` messages. Unset means test messages skip Micro.blog.
    #[serde(default, rename = "testDestination")]
    pub test_destination: Option<String>,
    /// Treat test messages as this destination's primary traffic.
    #[serde(default, rename = "testPrimary")]
    pub test_primary: bool,
    #[serde(default = "default_microblog_url", rename = "baseUrl")]
    pub base_url: String,
}

impl Default for MicroblogConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            destination: String::new(),
            test_destination: None,
            test_primary: false,
            base_url: default_microblog_url(),
        }
    }
}

redact_debug!(
    MicroblogConfig,
    redact(token),
    destination,
    test_destination,
    test_primary,
    base_url,
);

/// Twitter-style destination. Uses OAuth 1.0a user-context credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    #[serde(default, rename = "consumerKey")]
    pub consumer_key: String,
    #[serde(default, rename = "consumerSecret")]
    pub consumer_secret: String,
    #[serde(default, rename = "accessToken")]
    pub access_token: String,
    #[serde(default, rename = "accessTokenSecret")]
    pub access_token_secret: String,
    /// Label for the account the credentials belong to (logged as the target).
    #[serde(default = "default_social_account")]
    pub account: String,
    /// The credentials belong to a test account: only `TEST:` messages are posted.
    #[serde(default, rename = "testAccount")]
    pub test_account: bool,
    #[serde(default = "default_social_upload_url", rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(default = "default_social_api_url", rename = "apiUrl")]
    pub api_url: String,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            consumer_key: String::new(),
            consumer_secret: String::new(),
            access_token: String::new(),
            access_token_secret: String::new(),
            account: default_social_account(),
            test_account: false,
            upload_url: default_social_upload_url(),
            api_url: default_social_api_url(),
        }
    }
}

redact_debug!(
    SocialConfig,
    redact(consumer_key),
    redact(consumer_secret),
    redact(access_token),
    redact(access_token_secret),
    account,
    test_account,
    upload_url,
    api_url,
);
