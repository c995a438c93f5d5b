// Shared test helpers; not all items used by every test binary.
#![allow(unused)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use txtpost::config::{Config, MicroblogConfig, SocialConfig};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const DOROTHEA: &str = "+15125551212";
pub const CELIA: &str = "+15125550000";
pub const BLOG: &str = "https://dorothea.micro.blog/";
pub const TEST_BLOG: &str = "https://txtpost-test.micro.blog/";
pub const POST_URL: &str = "https://dorothea.micro.blog/2024/01/01/hello.html";

/// Fake JPEG header plus padding.
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

pub fn media_path(sid: &str) -> String {
    format!("/2010-04-01/Accounts/AC1/Messages/MM1/Media/{sid}")
}

/// Twilio-style media server answering any `/Media/<sid>` with a JPEG.
pub async fn media_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/2010-04-01/Accounts/AC1/Messages/MM1/Media/ME\w+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/jpeg")
                .set_body_bytes(JPEG.to_vec()),
        )
        .mount(&server)
        .await;
    server
}

pub fn media_url(server: &MockServer, sid: &str) -> String {
    format!("{}{}", server.uri(), media_path(sid))
}

/// Micropub endpoint that accepts uploads and posts.
pub async fn mount_micropub(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/micropub/media"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", "https://cdn.micro.blog/photos/ME456.jpg"),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/micropub"))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(serde_json::json!({ "url": POST_URL })),
        )
        .mount(server)
        .await;
}

pub fn write_roster(dir: &Path) -> PathBuf {
    let roster = dir.join("users.json");
    std::fs::write(
        &roster,
        format!(r#"{{"{DOROTHEA}": "Dorothea", "{CELIA}": "Celia"}}"#),
    )
    .unwrap();
    roster
}

pub fn media_dir(tmp: &TempDir) -> PathBuf {
    tmp.path().join("media")
}

/// Config with only Micro.blog, pointed at `server`.
pub fn microblog_config(tmp: &TempDir, server: &MockServer) -> Config {
    Config {
        roster_file: write_roster(tmp.path()).to_string_lossy().into_owned(),
        media_dir: media_dir(tmp).to_string_lossy().into_owned(),
        microblog: Some(MicroblogConfig {
            token: "mb-token".into(),
            destination: BLOG.into(),
            test_destination: Some(TEST_BLOG.into()),
            test_primary: false,
            base_url: format!("{}/micropub", server.uri()),
        }),
        ..Config::default()
    }
}

pub fn social_config(server: &MockServer) -> SocialConfig {
    SocialConfig {
        consumer_key: "ck".into(),
        consumer_secret: "cs".into(),
        access_token: "at".into(),
        access_token_secret: "ats".into(),
        upload_url: format!("{}/1.1/media/upload.json", server.uri()),
        api_url: format!("{}/2/tweets", server.uri()),
        ..SocialConfig::default()
    }
}

/// Files left under the staging root (directories included).
pub fn residual_entries(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }
    std::fs::read_dir(root).unwrap().count()
}
