// src/storage/store_server.rs — Async message passing for Store
//
// One task owns the connection and handles commands in arrival order, so
// the polling loop, every enrichment task and the console all go through
// the same queue and never see a half-applied write.

use crate::storage::store::Store;
use crate::upstream::Session;
use tokio::sync::{mpsc, oneshot};

const QUEUE_DEPTH: usize = 100;

#[derive(Debug)]
pub enum StoreCommand {
    Upsert {
        session: Session,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
    UpdateDuration {
        session_id: String,
        duration_ms: i64,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
    UpdateCutNumber {
        session_id: String,
        cut_number: i64,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
    UpdatePlayback {
        session_id: String,
        playback_url: String,
        playback_backup_url: String,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
    ListByOwner {
        owner_id: i64,
        limit: i64,
        resp: oneshot::Sender<anyhow::Result<Vec<Session>>>,
    },
    Get {
        session_id: String,
        resp: oneshot::Sender<anyhow::Result<Option<Session>>>,
    },
    Exists {
        session_id: String,
        resp: oneshot::Sender<anyhow::Result<bool>>,
    },
}

/// A cloneable handle to the Store task.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreCommand>,
}

impl StoreHandle {
    pub fn new(tx: mpsc::Sender<StoreCommand>) -> Self {
        Self { tx }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<anyhow::Result<T>>) -> StoreCommand,
    ) -> anyhow::Result<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.tx
            .send(build(resp_tx))
            .await
            .map_err(|_| anyhow::anyhow!("store task has stopped"))?;
        resp_rx.await?
    }

    /// Insert-or-ignore keyed by session id.
    pub async fn upsert(&self, session: Session) -> anyhow::Result<bool> {
        self.request(|resp| StoreCommand::Upsert { session, resp })
            .await
    }

    pub async fn update_duration(
        &self,
        session_id: &str,
        duration_ms: i64,
    ) -> anyhow::Result<bool> {
        let session_id = session_id.to_string();
        self.request(|resp| StoreCommand::UpdateDuration {
            session_id,
            duration_ms,
            resp,
        })
        .await
    }

    pub async fn update_cut_number(
        &self,
        session_id: &str,
        cut_number: i64,
    ) -> anyhow::Result<bool> {
        let session_id = session_id.to_string();
        self.request(|resp| StoreCommand::UpdateCutNumber {
            session_id,
            cut_number,
            resp,
        })
        .await
    }

    pub async fn update_playback(
        &self,
        session_id: &str,
        playback_url: &str,
        playback_backup_url: &str,
    ) -> anyhow::Result<bool> {
        let (session_id, playback_url, playback_backup_url) = (
            session_id.to_string(),
            playback_url.to_string(),
            playback_backup_url.to_string(),
        );
        self.request(|resp| StoreCommand::UpdatePlayback {
            session_id,
            playback_url,
            playback_backup_url,
            resp,
        })
        .await
    }

    /// Newest first; `limit = -1` returns everything.
    pub async fn list_by_owner(&self, owner_id: i64, limit: i64) -> anyhow::Result<Vec<Session>> {
        self.request(|resp| StoreCommand::ListByOwner {
            owner_id,
            limit,
            resp,
        })
        .await
    }

    pub async fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.request(|resp| StoreCommand::Get { session_id, resp })
            .await
    }

    pub async fn exists(&self, session_id: &str) -> anyhow::Result<bool> {
        let session_id = session_id.to_string();
        self.request(|resp| StoreCommand::Exists { session_id, resp })
            .await
    }
}

/// Helper to spawn the store server and return a handle.
pub fn spawn_store_server(store: Store) -> (StoreHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let handle = StoreHandle::new(tx);
    let join_handle = tokio::spawn(run_store_server(store, rx));
    (handle, join_handle)
}

/// The background task that owns the Store. Ends once every handle is dropped.
pub async fn run_store_server(store: Store, mut rx: mpsc::Receiver<StoreCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Upsert { session, resp } => {
                let res = store.upsert(&session);
                let _ = resp.send(res);
            }
            StoreCommand::UpdateDuration {
                session_id,
                duration_ms,
                resp,
            } => {
                let res = store.update_duration(&session_id, duration_ms);
                let _ = resp.send(res);
            }
            StoreCommand::UpdateCutNumber {
                session_id,
                cut_number,
                resp,
            } => {
                let res = store.update_cut_number(&session_id, cut_number);
                let _ = resp.send(res);
            }
            StoreCommand::UpdatePlayback {
                session_id,
                playback_url,
                playback_backup_url,
                resp,
            } => {
                let res = store.update_playback(&session_id, &playback_url, &playback_backup_url);
                let _ = resp.send(res);
            }
            StoreCommand::ListByOwner {
                owner_id,
                limit,
                resp,
            } => {
                let res = store.list_by_owner(owner_id, limit);
                let _ = resp.send(res);
            }
            StoreCommand::Get { session_id, resp } => {
                let res = store.get(&session_id);
                let _ = resp.send(res);
            }
            StoreCommand::Exists { session_id, resp } => {
                let res = store.exists(&session_id);
                let _ = resp.send(res);
            }
        }
    }
    tracing::debug!("Store server stopped");
}
