// src/watch/mod.rs — The polling loop: fetch, diff, dispatch, sleep

pub mod cut;
pub mod enrich;
pub mod playback;
pub mod reconcile;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::infra::config::Config;
use crate::infra::errors::LiveTrackError;
use crate::storage::StoreHandle;
use crate::upstream::retry::{run_with_retry, RetryPolicy};
use crate::upstream::{SnapshotMap, UpstreamApi};
use enrich::{EnrichOutcome, Enricher};
use playback::CdnSigns;
use reconcile::{reconcile, OwnerFilter, Transitions};
use snapshot::SnapshotStore;

/// Everything the watcher needs to know from the config.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub end_grace: Duration,
    pub owners: OwnerFilter,
    pub retry: RetryPolicy,
    pub signs: CdnSigns,
}

impl WatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.watch.poll_interval(),
            end_grace: config.watch.end_grace(),
            owners: OwnerFilter::new(config.watch.owners.iter().copied()),
            retry: RetryPolicy::from(&config.retry),
            signs: CdnSigns::from(&config.upstream),
        }
    }
}

/// Owns the last snapshot and the set of in-flight enrichment tasks.
pub struct Watcher {
    upstream: Arc<dyn UpstreamApi>,
    enricher: Enricher,
    owners: OwnerFilter,
    retry: RetryPolicy,
    poll_interval: Duration,
    snapshot: SnapshotStore,
    tasks: JoinSet<EnrichOutcome>,
}

impl Watcher {
    pub fn new(upstream: Arc<dyn UpstreamApi>, store: StoreHandle, settings: WatchSettings) -> Self {
        let enricher = Enricher::new(
            upstream.clone(),
            store,
            settings.retry.clone(),
            settings.end_grace,
            settings.signs,
        );
        Self {
            upstream,
            enricher,
            owners: settings.owners,
            retry: settings.retry,
            poll_interval: settings.poll_interval,
            snapshot: SnapshotStore::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Poll until shutdown is signalled. Only an exhausted snapshot fetch
    /// ends the loop with an error.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), LiveTrackError> {
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            all_owners = self.owners.is_unrestricted(),
            "Watching live sessions"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let next = tokio::select! {
                fetched = self.fetch() => fetched?,
                _ = shutdown.changed() => break,
            };
            self.apply(next).await;
            self.reap();

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        tracing::info!(in_flight = self.tasks.len(), "Watcher stopped");
        Ok(())
    }

    /// One full iteration without the trailing sleep.
    pub async fn poll_once(&mut self) -> Result<Transitions, LiveTrackError> {
        let next = self.fetch().await?;
        Ok(self.apply(next).await)
    }

    async fn fetch(&self) -> Result<SnapshotMap, LiveTrackError> {
        let upstream = &self.upstream;
        run_with_retry(&self.retry, "fetch live list", move || async move {
            upstream.fetch_snapshot().await
        })
        .await
    }

    /// Diff against the previous snapshot, install the new one, and hand the
    /// admitted transitions to the enricher.
    async fn apply(&mut self, next: SnapshotMap) -> Transitions {
        let transitions = self.owners.apply(reconcile(self.snapshot.current(), &next));
        self.snapshot.replace(next);

        for session in &transitions.started {
            tracing::info!(
                session_id = %session.session_id,
                owner_id = session.owner_id,
                owner = %session.owner_name,
                title = %session.title,
                "Session started"
            );
            self.enricher
                .dispatch_started(session, &mut self.tasks)
                .await;
        }
        for session in &transitions.ended {
            tracing::info!(
                session_id = %session.session_id,
                owner_id = session.owner_id,
                owner = %session.owner_name,
                "Session ended"
            );
            self.enricher
                .dispatch_ended(session.clone(), &mut self.tasks);
        }

        tracing::debug!(
            poll = self.snapshot.polls(),
            live = self.snapshot.len(),
            started = transitions.started.len(),
            ended = transitions.ended.len(),
            "Snapshot reconciled"
        );
        transitions
    }

    /// Collect finished tasks without waiting.
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            log_joined(joined);
        }
    }

    /// Wait for every in-flight enrichment task and return their outcomes.
    pub async fn settle(&mut self) -> Vec<EnrichOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            if let Some(outcome) = log_joined(joined) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn snapshot(&self) -> &SnapshotMap {
        self.snapshot.current()
    }
}

fn log_joined(joined: Result<EnrichOutcome, tokio::task::JoinError>) -> Option<EnrichOutcome> {
    match joined {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Enrichment finished");
            Some(outcome)
        }
        Err(e) => {
            tracing::error!("Enrichment task failed: {e}");
            None
        }
    }
}
