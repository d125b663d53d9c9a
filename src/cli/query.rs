// src/cli/query.rs — Ad-hoc lookups shared by subcommands and the console

use std::sync::Arc;

use futures::future::join_all;

use crate::cli::format::session_line;
use crate::infra::errors::LiveTrackError;
use crate::storage::StoreHandle;
use crate::upstream::retry::{run_with_retry, RetryPolicy};
use crate::upstream::{Session, UpstreamApi};
use crate::watch::playback::{classify_recordings, CdnSigns, RecordingLinks};

/// Read-side access for humans. Nothing here writes to the store.
///
/// Live lookups need only the upstream; `list` also needs a store attached
/// with [`Queries::with_store`].
#[derive(Clone)]
pub struct Queries {
    upstream: Arc<dyn UpstreamApi>,
    store: Option<StoreHandle>,
    retry: RetryPolicy,
    signs: CdnSigns,
}

impl Queries {
    pub fn new(upstream: Arc<dyn UpstreamApi>, retry: RetryPolicy, signs: CdnSigns) -> Self {
        Self {
            upstream,
            store: None,
            retry,
            signs,
        }
    }

    pub fn with_store(mut self, store: StoreHandle) -> Self {
        self.store = Some(store);
        self
    }

    /// Stored sessions of `owner_id`, newest first. `limit = -1` prints all.
    pub async fn list(&self, owner_id: i64, limit: i64) -> anyhow::Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no session database is open"))?;
        let sessions = store.list_by_owner(owner_id, limit).await?;
        if sessions.is_empty() {
            println!("No sessions recorded for owner {owner_id}");
            return Ok(());
        }
        for s in &sessions {
            println!("{}", session_line(s));
        }
        Ok(())
    }

    /// Fetch the live list once and print it, optionally for one owner.
    pub async fn fetch(&self, owner_id: Option<i64>) -> anyhow::Result<()> {
        let upstream = &self.upstream;
        let snapshot = run_with_retry(&self.retry, "fetch live list", move || async move {
            upstream.fetch_snapshot().await
        })
        .await?;

        let mut live: Vec<&Session> = snapshot
            .values()
            .filter(|s| owner_id.map_or(true, |id| s.owner_id == id))
            .collect();
        live.sort_by_key(|s| s.started_at_ms);

        println!("{} live session(s) ({} total)", live.len(), snapshot.len());
        for s in live {
            println!("{}", session_line(s));
        }
        Ok(())
    }

    /// Ask the playback endpoint directly, so a recording shows up even
    /// before the session summary is final.
    pub async fn recordings(&self, session_id: &str) -> Result<RecordingLinks, LiveTrackError> {
        let upstream = &self.upstream;
        let urls = run_with_retry(&self.retry, "fetch recordings", move || async move {
            upstream.fetch_recordings(session_id).await
        })
        .await?;
        classify_recordings(&urls, &self.signs)
    }

    /// Recording links per session id, looked up concurrently.
    pub async fn playback(&self, session_ids: &[String]) -> anyhow::Result<()> {
        let lookups = session_ids.iter().map(|id| async move {
            let result = self.recordings(id).await;
            (id, result)
        });

        for (id, result) in join_all(lookups).await {
            match result {
                Ok(links) => println!("{id}: url {} | backup {}", links.url, links.backup_url),
                Err(LiveTrackError::Disambiguation { primary, backup }) => println!(
                    "{id}: no usable recording ({primary} primary, {backup} backup URL(s))"
                ),
                Err(e) => println!("{id}: lookup failed: {e}"),
            }
        }
        Ok(())
    }
}
