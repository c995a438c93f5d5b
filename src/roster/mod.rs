//! Sender roster: maps inbound sender tokens (phone numbers) to display names.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Read-only lookup table loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: HashMap<String, String>,
}

impl Roster {
    /// Load a roster from a JSON object of `token -> name`.
    ///
    /// A missing or malformed file is a startup error; there is no per-call fallback.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster from {}", path.display()))?;
        let names: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse roster JSON from {}", path.display()))?;
        debug!("roster: loaded {} sender(s) from {}", names.len(), path.display());
        Ok(Self { names })
    }

    pub fn from_map(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Resolve a sender token to its display name; empty when the sender is unknown.
    pub fn resolve(&self, token: &str) -> String {
        self.names.get(token).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Roster
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
