// src/upstream/mod.rs — Upstream live service layer

pub mod acfun;
pub mod retry;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::LiveTrackError;

/// One live-broadcast occurrence.
///
/// Descriptive fields are captured when the session is first seen and never
/// refreshed. `duration_ms` and `cut_number` stay zero (and the URLs empty)
/// until enrichment learns them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub owner_id: i64,
    pub owner_name: String,
    pub stream_token: String,
    pub started_at_ms: i64,
    pub title: String,
    pub duration_ms: i64,
    pub playback_url: String,
    pub playback_backup_url: String,
    pub cut_number: i64,
}

/// Every currently active session, keyed by session id.
pub type SnapshotMap = HashMap<String, Session>;

/// Answer of the cut-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutInfo {
    /// No cut exists (yet). Not an error.
    NotReady,
    /// A cut exists; its number is embedded in the URL.
    Ready { url: String },
}

/// End-of-session report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    /// Zero while upstream has not finalized the session.
    pub duration_ms: i64,
    /// Recording URLs from every CDN, unclassified.
    pub recording_urls: Vec<String>,
}

/// The three upstream lookups the watcher depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Complete, unfiltered set of live sessions right now.
    async fn fetch_snapshot(&self) -> Result<SnapshotMap, LiveTrackError>;

    async fn fetch_cut_info(
        &self,
        owner_id: i64,
        session_id: &str,
    ) -> Result<CutInfo, LiveTrackError>;

    /// Duration plus, once it is non-zero, the recording URLs.
    async fn fetch_summary(&self, session_id: &str) -> Result<Summary, LiveTrackError>;

    /// Recording URLs only, whether or not the summary is final. Empty when
    /// there is no recording.
    async fn fetch_recordings(&self, session_id: &str) -> Result<Vec<String>, LiveTrackError>;
}
