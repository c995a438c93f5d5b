use anyhow::{Result, bail};
use reqwest::{Client, Response};
use std::time::Duration;

/// Maximum size of a single staged attachment (20 MB).
pub const MAX_MEDIA_BYTES: usize = 20 * 1024 * 1024;

/// Cap on error bodies captured for log messages.
const MAX_ERROR_BODY_BYTES: usize = 2048;

/// Build a `reqwest::Client` with standard timeouts (10 s connect, 30 s overall).
///
/// Falls back to the default client if the builder fails.
pub fn default_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("txtpost/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Download a response body as bytes with a size limit.
///
/// - Checks the `Content-Length` header first; rejects immediately if over limit.
/// - Streams via `chunk()` with a running counter; truncates at the limit.
/// - Returns `(bytes, was_truncated)`. The bytes are raw with no marker appended,
///   so binary content (images) is not corrupted on truncation.
pub async fn limited_body(resp: Response, max_bytes: usize) -> Result<(Vec<u8>, bool)> {
    // Pre-check Content-Length header
    if let Some(cl) = resp.content_length()
        && cl as usize > max_bytes
    {
        bail!(
            "response body too large: Content-Length {} exceeds limit {}",
            cl,
            max_bytes
        );
    }

    let mut buf = Vec::new();
    let mut stream = resp;
    while let Some(chunk) = stream.chunk().await? {
        if buf.len() + chunk.len() > max_bytes {
            let remaining = max_bytes.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..remaining]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok((buf, false))
}

/// Read a (failed) response body for logging, bounded and lossy.
pub async fn error_body(resp: Response) -> String {
    match limited_body(resp, MAX_ERROR_BODY_BYTES).await {
        Ok((bytes, truncated)) => {
            let mut text = String::from_utf8_lossy(&bytes).trim().to_string();
            if truncated {
                text.push_str(" [truncated]");
            }
            text
        }
        Err(_) => "unknown".to_string(),
    }
}
