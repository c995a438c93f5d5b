mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use txtpost::RelayOrchestrator;
use txtpost::gateway::build_router;
use wiremock::MockServer;

fn twilio_form(from: &str, body: &str, media: &[String]) -> String {
    let mut form = form_urlencoded::Serializer::new(String::new());
    form.append_pair("MessageSid", "MM1")
        .append_pair("From", from)
        .append_pair("Body", body)
        .append_pair("NumMedia", &media.len().to_string());
    for (i, url) in media.iter().enumerate() {
        form.append_pair(&format!("MediaUrl{i}"), url);
        form.append_pair(&format!("MediaContentType{i}"), "image/jpeg");
    }
    form.finish()
}

async fn post(app: axum::Router, body: String) -> (StatusCode, String) {
    let req = Request::builder()
        .method("POST")
        .uri("/sms")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 65536).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_webhook_posts_photo_and_replies_with_url() {
    let tmp = TempDir::new().expect("create temp dir");
    let media = media_server().await;
    let blog = MockServer::start().await;
    mount_micropub(&blog).await;

    let config = microblog_config(&tmp, &blog);
    let relay = Arc::new(RelayOrchestrator::from_config(&config).unwrap());
    let app = build_router(&config.server.route, relay);

    let (status, body) = post(
        app,
        twilio_form(DOROTHEA, "Hello", &[media_url(&media, "ME456")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response><Message>posted: {POST_URL}</Message></Response>"
        )
    );
    assert_eq!(residual_entries(&media_dir(&tmp)), 0);
}

#[tokio::test]
async fn test_webhook_destination_failure_still_200() {
    let tmp = TempDir::new().expect("create temp dir");
    let blog = MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&blog)
        .await;

    let config = microblog_config(&tmp, &blog);
    let relay = Arc::new(RelayOrchestrator::from_config(&config).unwrap());
    let (status, body) = post(
        build_router("/sms", relay),
        twilio_form(CELIA, "Hi & bye", &[]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Message>posted: </Message>"));
}
