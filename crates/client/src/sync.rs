//! Progress sync engine.
//!
//! [`SyncEngine`] buffers achievement toggles in a [`PendingUpdates`] map,
//! mirrors the map into the durable store after every mutation, and sends
//! the whole map as one batch once toggling has been quiet for the debounce
//! period. A flush can also be forced ([`SyncEngine::flush_now`]) or fired
//! in the background when the user navigates away
//! ([`SyncEngine::page_hidden`]).
//!
//! At most one batch request is outstanding. A flush requested while one is
//! in flight is queued; once the outstanding request succeeds the engine
//! sends whatever the map holds at that moment. On success only entries
//! that still hold the value that was sent are cleared, so a toggle made
//! during the request is kept for the next batch. If the identity changes
//! while a batch is on the wire, the previous identity's backup keeps its
//! unsent entries and a queued flush goes out for the new identity.
//!
//! Status changes are published through a [`tokio::sync::watch`] channel.
//! Call [`SyncEngine::subscribe`] to observe them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tidemark_core::achievement::{self, Achievement, MergedAchievement, ProgressRecord};
use tidemark_core::pending::{PendingBackup, PendingUpdates, ProgressUpdate};
use tidemark_core::types::AchievementId;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ClientError;
use crate::store::KeyValueStore;

/// Who progress is recorded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub nickname: String,
    /// Bearer token when signed in with a password; `None` for the legacy
    /// nickname-only identity.
    pub token: Option<String>,
}

impl Identity {
    pub fn legacy(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            token: None,
        }
    }

    pub fn signed_in(nickname: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            token: Some(token.into()),
        }
    }

    /// Store key of this identity's pending backup.
    pub fn backup_key(&self) -> String {
        PendingBackup::storage_key(&self.nickname)
    }
}

/// Sends one batch of progress updates to the backend.
#[async_trait]
pub trait ProgressTransport: Send + Sync + 'static {
    async fn send_batch(
        &self,
        identity: &Identity,
        updates: &[ProgressUpdate],
    ) -> Result<(), ClientError>;
}

/// Observable engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Nothing pending.
    Idle,
    /// Unflushed entries are buffered.
    Pending(usize),
    /// A batch request is outstanding.
    Flushing,
    /// The last flush failed; entries are still buffered.
    Failed(String),
}

/// Result of a flush request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The map was empty; nothing was sent.
    Empty,
    /// Batches were acknowledged, covering `updates` entries in total.
    Sent { updates: usize },
    /// Another flush was in flight; the current contents will be sent when
    /// it completes.
    Queued,
}

struct EngineState {
    identity: Identity,
    pending: PendingUpdates,
    timer: Option<JoinHandle<()>>,
    /// Bumped whenever the timer is (re)armed or cancelled so a timer task
    /// that already woke up can tell it was superseded.
    timer_generation: u64,
    in_flight: bool,
    rerun: bool,
}

struct Shared<T, S> {
    transport: T,
    store: S,
    debounce: Duration,
    state: Mutex<EngineState>,
    status: watch::Sender<SyncStatus>,
}

/// Debounced, persisted progress buffer for one identity at a time.
///
/// Cheap to clone; clones share the same buffer. Methods that arm the
/// timer must be called from within a tokio runtime.
pub struct SyncEngine<T, S> {
    shared: Arc<Shared<T, S>>,
}

impl<T, S> Clone for SyncEngine<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, S> SyncEngine<T, S>
where
    T: ProgressTransport,
    S: KeyValueStore + 'static,
{
    /// Create an engine with an empty buffer. Call [`restore`](Self::restore)
    /// to pick up a backup left by an earlier session.
    pub fn new(transport: T, store: S, identity: Identity, debounce: Duration) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                transport,
                store,
                debounce,
                state: Mutex::new(EngineState {
                    identity,
                    pending: PendingUpdates::new(),
                    timer: None,
                    timer_generation: 0,
                    in_flight: false,
                    rerun: false,
                }),
                status,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.shared.status.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.shared.status.borrow().clone()
    }

    pub fn identity(&self) -> Identity {
        self.lock().identity.clone()
    }

    /// Snapshot of the unflushed entries.
    pub fn pending(&self) -> PendingUpdates {
        self.lock().pending.clone()
    }

    /// Whether an automatic flush is currently scheduled.
    pub fn is_scheduled(&self) -> bool {
        self.lock().timer.is_some()
    }

    /// Merge fetched data with the current buffer.
    pub fn view(
        &self,
        achievements: &[Achievement],
        progress: &[ProgressRecord],
    ) -> Vec<MergedAchievement> {
        let pending = self.pending();
        achievement::merge(achievements, progress, &pending)
    }

    /// Switch to `identity` and seed the buffer from its durable backup.
    ///
    /// The buffer is replaced by the backup contents. A corrupt backup is
    /// discarded with a warning. When anything was restored the debounce
    /// timer is armed so it gets flushed without further user action.
    /// Returns the number of restored entries.
    pub fn restore(&self, identity: Identity) -> Result<usize, ClientError> {
        let key = identity.backup_key();
        let restored = match self.shared.store.get(&key)? {
            None => PendingUpdates::new(),
            Some(raw) => match PendingBackup::decode(&raw) {
                Ok(backup) => backup.updates,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding unreadable pending backup");
                    self.shared.store.remove(&key)?;
                    PendingUpdates::new()
                }
            },
        };

        let count = restored.len();
        let mut state = self.lock();
        state.identity = identity;
        state.pending = restored;
        if count > 0 {
            tracing::info!(nickname = %state.identity.nickname, count, "Restored pending progress");
            self.arm_timer(&mut state);
        } else {
            Self::disarm_timer(&mut state);
        }
        self.publish(&state);
        Ok(count)
    }

    /// Record the inverse of `current_effective` for `achievement_id`,
    /// persist the buffer and restart the debounce timer. Returns the new
    /// target state. Never contacts the backend.
    pub fn toggle(&self, achievement_id: AchievementId, current_effective: bool) -> bool {
        let mut state = self.lock();
        let target = state.pending.toggle(achievement_id, current_effective);
        tracing::debug!(achievement_id, target, "Progress toggled");

        // Persisted under the lock so backups land in mutation order.
        self.persist_or_warn(&state);
        self.arm_timer(&mut state);
        self.publish(&state);
        target
    }

    /// (Re)start the debounce timer. Only a full quiet period triggers the
    /// automatic flush.
    pub fn schedule(&self) {
        let mut state = self.lock();
        self.arm_timer(&mut state);
    }

    pub fn cancel_timer(&self) {
        let mut state = self.lock();
        Self::disarm_timer(&mut state);
    }

    /// Cancel the pending timer and flush immediately.
    pub async fn flush_now(&self) -> Result<FlushOutcome, ClientError> {
        self.cancel_timer();
        self.flush().await
    }

    /// Best-effort flush when the page is hidden or the process is about
    /// to exit. The durable backup covers the case where it never lands.
    pub fn page_hidden(&self) -> JoinHandle<()> {
        self.cancel_timer();
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.flush().await {
                tracing::warn!(error = %e, "Background flush failed, backup kept");
            }
        })
    }

    /// Send the whole buffer as one batch.
    ///
    /// On success, acknowledged entries are dropped and the backup is
    /// rewritten (or removed once empty). On failure the buffer and backup
    /// are left untouched and the error is returned; nothing is retried
    /// until the next trigger.
    pub async fn flush(&self) -> Result<FlushOutcome, ClientError> {
        let (mut identity, mut snapshot) = {
            let mut state = self.lock();
            if state.in_flight {
                state.rerun = true;
                tracing::debug!("Flush already in flight, queued");
                return Ok(FlushOutcome::Queued);
            }
            if state.pending.is_empty() {
                return Ok(FlushOutcome::Empty);
            }
            state.in_flight = true;
            (state.identity.clone(), state.pending.clone())
        };

        let mut sent_total = 0;
        loop {
            self.shared.status.send_replace(SyncStatus::Flushing);
            let updates = snapshot.to_updates();
            let result = self.shared.transport.send_batch(&identity, &updates).await;

            let next = {
                let mut state = self.lock();
                if let Err(e) = result {
                    state.in_flight = false;
                    state.rerun = false;
                    tracing::warn!(
                        nickname = %identity.nickname,
                        count = updates.len(),
                        error = %e,
                        "Progress flush failed, keeping buffer",
                    );
                    self.shared
                        .status
                        .send_replace(SyncStatus::Failed(e.to_string()));
                    return Err(e);
                }

                sent_total += updates.len();
                if state.identity == identity {
                    let cleared = state.pending.acknowledge(&snapshot);
                    self.persist_or_warn(&state);
                    tracing::info!(
                        nickname = %identity.nickname,
                        sent = updates.len(),
                        cleared,
                        remaining = state.pending.len(),
                        "Progress flushed",
                    );
                } else if let Err(e) =
                    acknowledge_backup(&self.shared.store, &identity, &snapshot)
                {
                    // Identity switched mid-request; the sent entries live
                    // on only in the previous identity's backup.
                    tracing::warn!(
                        nickname = %identity.nickname,
                        error = %e,
                        "Failed to update previous identity backup",
                    );
                }

                if state.rerun && !state.pending.is_empty() {
                    state.rerun = false;
                    Some((state.identity.clone(), state.pending.clone()))
                } else {
                    state.rerun = false;
                    state.in_flight = false;
                    self.publish(&state);
                    None
                }
            };

            match next {
                Some((current_identity, current)) => {
                    identity = current_identity;
                    snapshot = current;
                }
                None => return Ok(FlushOutcome::Sent { updates: sent_total }),
            }
        }
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &EngineState) {
        let status = if state.pending.is_empty() {
            SyncStatus::Idle
        } else {
            SyncStatus::Pending(state.pending.len())
        };
        self.shared.status.send_replace(status);
    }

    fn persist_or_warn(&self, state: &EngineState) {
        if let Err(e) = persist_backup(&self.shared.store, &state.identity, &state.pending) {
            tracing::warn!(
                nickname = %state.identity.nickname,
                error = %e,
                "Failed to persist pending backup",
            );
        }
    }

    fn arm_timer(&self, state: &mut EngineState) {
        Self::disarm_timer(state);
        let generation = state.timer_generation;
        let engine = self.clone();
        let debounce = self.shared.debounce;

        state.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            {
                let mut state = engine.lock();
                if state.timer_generation != generation {
                    return;
                }
                // Drop our own handle without aborting ourselves.
                state.timer.take();
            }
            if let Err(e) = engine.flush().await {
                tracing::debug!(error = %e, "Debounced flush failed");
            }
        }));
    }

    fn disarm_timer(state: &mut EngineState) {
        if let Some(handle) = state.timer.take() {
            handle.abort();
        }
        state.timer_generation = state.timer_generation.wrapping_add(1);
    }
}

/// Write `pending` as the backup of `identity`, or remove the backup when
/// there is nothing pending.
fn persist_backup<S: KeyValueStore + ?Sized>(
    store: &S,
    identity: &Identity,
    pending: &PendingUpdates,
) -> Result<(), ClientError> {
    let key = identity.backup_key();
    if pending.is_empty() {
        store.remove(&key)?;
    } else {
        let raw = PendingBackup::new(pending.clone()).encode()?;
        store.set(&key, &raw)?;
    }
    Ok(())
}

/// Drop the entries of `sent` from the stored backup of `identity`, keeping
/// anything toggled after the batch was taken.
fn acknowledge_backup<S: KeyValueStore + ?Sized>(
    store: &S,
    identity: &Identity,
    sent: &PendingUpdates,
) -> Result<(), ClientError> {
    let Some(raw) = store.get(&identity.backup_key())? else {
        return Ok(());
    };
    let mut remaining = PendingBackup::decode(&raw)?.updates;
    remaining.acknowledge(sent);
    persist_backup(store, identity, &remaining)
}
