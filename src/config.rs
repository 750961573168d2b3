//! Host configuration loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for one extension host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Per-handler timeout in milliseconds. Unset means handlers are never
    /// timed out; a slow handler then delays, but never crashes, the
    /// publishing event.
    #[serde(alias = "handlerTimeoutMs")]
    pub handler_timeout_ms: Option<u64>,

    /// Locations scanned for extensions, in load order. Convention is the
    /// global user config directory first, then the project-local one, so
    /// earlier-loaded (built-in/global) extensions run first.
    #[serde(alias = "extensionLocations")]
    pub extension_locations: Vec<PathBuf>,
}

impl HostConfig {
    /// Load configuration from a JSON file. A missing file yields defaults;
    /// malformed JSON is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|err| Error::config(format!("{}: {err}", path.display())))
    }

    /// Per-handler timeout as a [`Duration`], if configured.
    #[must_use]
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}
