//! Media staging: fetch inbound attachments to local files before upload.
//!
//! Each relay gets its own [`StagingArea`], a UUID-named directory under the
//! staging root, so two requests carrying the same attachment URL never write
//! to the same file.

use crate::errors::{RelayError, RelayResult};
use crate::utils::http::{MAX_MEDIA_BYTES, default_http_client, limited_body};
use crate::utils::{ensure_dir, safe_filename};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Suffix appended to every staged file name.
pub const STAGED_SUFFIX: &str = "_temp.jpg";

/// Factory for request-scoped staging areas.
#[derive(Clone)]
pub struct MediaStager {
    client: Client,
    root: PathBuf,
}

impl MediaStager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_client(root, default_http_client())
    }

    pub fn with_client(root: impl Into<PathBuf>, client: Client) -> Self {
        Self {
            client,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, empty staging area for one relay.
    pub fn begin(&self) -> RelayResult<StagingArea> {
        let dir = ensure_dir(self.root.join(Uuid::new_v4().simple().to_string()))?;
        debug!("staging: opened {}", dir.display());
        Ok(StagingArea {
            client: self.client.clone(),
            dir,
            handles: Vec::new(),
        })
    }
}

/// Local file name for a remote attachment: the URL's final path segment plus [`STAGED_SUFFIX`].
pub fn handle_name(url: &str) -> String {
    let segment = url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segs| segs.last().map(str::to_string))
        })
        .unwrap_or_else(|| {
            url.split(['?', '#'])
                .next()
                .unwrap_or_default()
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string()
        });
    let segment = if segment.is_empty() || segment == "." || segment == ".." {
        "media".to_string()
    } else {
        safe_filename(&segment)
    };
    format!("{segment}{STAGED_SUFFIX}")
}

/// Staged files owned by a single relay.
pub struct StagingArea {
    client: Client,
    dir: PathBuf,
    handles: Vec<PathBuf>,
}

impl StagingArea {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every handle written so far, including those staged before a failure.
    pub fn handles(&self) -> &[PathBuf] {
        &self.handles
    }

    /// Fetch each URL in order. Stops at the first failure without trying the rest;
    /// files already written stay in the area until [`release`](Self::release).
    pub async fn stage(&mut self, urls: &[String]) -> RelayResult<Vec<PathBuf>> {
        let start = self.handles.len();
        for url in urls {
            self.fetch(url).await?;
        }
        Ok(self.handles[start..].to_vec())
    }

    async fn fetch(&mut self, url: &str) -> RelayResult<PathBuf> {
        let fetch_err = |status: Option<u16>, message: String| RelayError::Fetch {
            url: url.to_string(),
            status,
            message,
        };

        let mut path = self.dir.join(handle_name(url));
        // Same attachment twice in one message: keep both, index-aligned.
        if self.handles.contains(&path) {
            path = self
                .dir
                .join(format!("{}_{}", self.handles.len(), handle_name(url)));
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(None, e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(fetch_err(
                Some(status.as_u16()),
                format!("bad response code: {}", status.as_u16()),
            ));
        }

        let (bytes, truncated) = limited_body(resp, MAX_MEDIA_BYTES)
            .await
            .map_err(|e| fetch_err(Some(status.as_u16()), e.to_string()))?;
        if truncated {
            return Err(fetch_err(
                Some(status.as_u16()),
                format!("media exceeds {MAX_MEDIA_BYTES} bytes"),
            ));
        }

        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            // A partial file isn't in `handles`, so release() would miss it.
            if let Err(rm) = tokio::fs::remove_file(&path).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!("staging: failed to remove partial {}: {}", path.display(), rm);
            }
            return Err(fetch_err(
                None,
                format!("failed to write {}: {e}", path.display()),
            ));
        }
        self.handles.push(path.clone());

        info!(
            "staging: fetched {} ({} bytes) to {}",
            url,
            bytes.len(),
            path.display()
        );
        Ok(path)
    }

    /// Remove every staged file and the area's directory.
    ///
    /// Never fails: a handle that is already gone is logged and skipped.
    pub async fn release(self) {
        for handle in &self.handles {
            match tokio::fs::remove_file(handle).await {
                Ok(()) => debug!("staging: removed {}", handle.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!("staging: {} already removed", handle.display());
                }
                Err(e) => warn!("staging: failed to remove {}: {}", handle.display(), e),
            }
        }
        if let Err(e) = tokio::fs::remove_dir(&self.dir).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                "staging: failed to remove directory {}: {}",
                self.dir.display(),
                e
            );
        }
    }
}
