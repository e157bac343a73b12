//! Researcher-side analysis workflow
//!
//! Session state, the analysis orchestrator with its primary/fallback strategies,
//! progress reporting and defensive local storage.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::model::Panel;

pub mod orchestrator;
pub mod progress;
pub mod state;
pub mod storage;
pub mod strategy;

pub use orchestrator::{AnalysisOrchestrator, FetchError, FetchOutcome, SkipReason};
pub use progress::{
    DetailedProgress, DetailedProgressTicker, ProgressEmitter, ProgressEvent, StepReporter,
    TickerHandle,
};
pub use state::{SessionAction, SessionState, SessionStore};
pub use storage::{FileBackend, KeyValueBackend, MemoryBackend, SafeStorage, StorageError};
pub use strategy::{AnalysisStrategy, HttpAnalysisStrategy, StrategyError};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Client connection and trigger settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Panels on which mounting does not start an analysis
    pub excluded_panels: Vec<Panel>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            excluded_panels: Panel::DEFAULT_EXCLUDED.to_vec(),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve an API path against the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = Url::parse(&self.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(path.trim_start_matches('/'))
    }
}
