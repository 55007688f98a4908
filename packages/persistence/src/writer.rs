//! Debounced writer for the explore ledger.
//!
//! Foreground admits call [`PersistenceWriter::schedule`]; a background task
//! restarts its quiet-period timer on every call and writes once when the
//! timer expires. Background admits call
//! [`PersistenceWriter::flush_immediately`] instead. Clears delete the
//! stored record synchronously.
//!
//! Every write carries the ledger snapshot it was built from. Under the
//! write gate a snapshot is dropped when its epoch predates the last clear,
//! or when a same-epoch snapshot at least as long has already been written,
//! so a pending or slow flush can never resurrect cleared data or replace
//! newer data with older.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use fog_map_ledger::LedgerSnapshot;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::{EXPLORE_LEDGER_KEY, KeyValueStore, StoreError, encode_snapshot};

/// Callback invoked when a write fails.
pub type FailureHook = Arc<dyn Fn(&StoreError) + Send + Sync>;

/// Default quiet period before a foreground flush.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);

enum Command {
    Schedule(LedgerSnapshot),
    Cancel,
    Flush(oneshot::Sender<()>),
}

struct Pending {
    snapshot: LedgerSnapshot,
    deadline: Instant,
}

#[derive(Debug, Default)]
struct GateState {
    /// Epoch of the last clear that reached the store.
    epoch: u64,
    /// Length of the last snapshot written in `epoch`.
    written_len: usize,
    /// A clear's delete failed and the old record may still be stored.
    delete_pending: bool,
}

struct Shared {
    store: Arc<dyn KeyValueStore>,
    gate: Mutex<GateState>,
    on_failure: Option<FailureHook>,
}

impl Shared {
    /// Writes `snapshot` unless it is stale. Returns whether the store was
    /// touched.
    ///
    /// A stale snapshot still retries an outstanding delete.
    fn write(&self, snapshot: &LedgerSnapshot) -> Result<bool, StoreError> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let stale = if snapshot.epoch() < gate.epoch {
            log::debug!(
                "Dropping flush from epoch {} after clear to epoch {}",
                snapshot.epoch(),
                gate.epoch
            );
            true
        } else if snapshot.epoch() > gate.epoch {
            gate.epoch = snapshot.epoch();
            gate.written_len = 0;
            false
        } else if snapshot.len() <= gate.written_len {
            log::trace!(
                "Skipping flush of {} points, {} already written",
                snapshot.len(),
                gate.written_len
            );
            true
        } else {
            false
        };

        if stale {
            self.retry_delete(&mut gate)?;
            return Ok(false);
        }

        let bytes = encode_snapshot(snapshot)?;
        self.store.set(EXPLORE_LEDGER_KEY, bytes)?;
        gate.written_len = snapshot.len();
        gate.delete_pending = false;
        drop(gate);

        log::debug!("Flushed {} explore points", snapshot.len());
        Ok(true)
    }

    fn delete(&self, epoch: u64) -> Result<(), StoreError> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        gate.epoch = gate.epoch.max(epoch);
        gate.written_len = 0;
        gate.delete_pending = true;
        self.retry_delete(&mut gate)?;
        drop(gate);

        log::debug!("Deleted persisted explore ledger (epoch {epoch})");
        Ok(())
    }

    fn retry_delete(&self, gate: &mut GateState) -> Result<(), StoreError> {
        if gate.delete_pending {
            self.store.delete(EXPLORE_LEDGER_KEY)?;
            gate.delete_pending = false;
        }
        Ok(())
    }

    fn delete_pending(&self) -> bool {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .delete_pending
    }

    /// Retries an outstanding delete, if any.
    fn settle(&self) -> Result<(), StoreError> {
        let mut gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.retry_delete(&mut gate)
    }

    fn report(&self, error: &StoreError) {
        log::warn!("Failed to flush explore ledger: {error}");
        if let Some(hook) = &self.on_failure {
            hook(error);
        }
    }
}

/// Handle to the background flush task.
///
/// Dropping the handle closes the command channel; the task performs any
/// pending flush and exits.
pub struct PersistenceWriter {
    shared: Arc<Shared>,
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for PersistenceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceWriter").finish_non_exhaustive()
    }
}

impl PersistenceWriter {
    /// Spawns the flush task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// * If called outside a tokio runtime
    #[must_use]
    pub fn spawn(store: Arc<dyn KeyValueStore>, quiet_period: Duration) -> Self {
        Self::spawn_with_hook(store, quiet_period, None)
    }

    /// Like [`spawn`](Self::spawn), calling `on_failure` whenever a write
    /// fails.
    ///
    /// # Panics
    ///
    /// * If called outside a tokio runtime
    #[must_use]
    pub fn spawn_with_hook(
        store: Arc<dyn KeyValueStore>,
        quiet_period: Duration,
        on_failure: Option<FailureHook>,
    ) -> Self {
        let shared = Arc::new(Shared {
            store,
            gate: Mutex::new(GateState::default()),
            on_failure,
        });
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run(Arc::clone(&shared), rx, quiet_period));

        Self { shared, tx }
    }

    /// Marks the store as holding `snapshot`'s epoch and length, e.g. after
    /// hydrating the ledger from it, so identical snapshots are not
    /// rewritten.
    pub fn mark_persisted(&self, snapshot: &LedgerSnapshot) {
        let mut gate = self
            .shared
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        gate.epoch = snapshot.epoch();
        gate.written_len = snapshot.len();
    }

    /// Restarts the quiet-period timer with `snapshot` as the value to
    /// write when it expires.
    pub fn schedule(&self, snapshot: LedgerSnapshot) {
        if self.tx.send(Command::Schedule(snapshot)).is_err() {
            log::warn!("Persistence task is gone, dropping scheduled flush");
        }
    }

    /// Writes `snapshot` on the calling thread, cancelling any pending
    /// debounced flush.
    ///
    /// Failures are logged and passed to the failure hook; the next write
    /// retries with the full ledger.
    pub fn flush_immediately(&self, snapshot: &LedgerSnapshot) {
        let _ = self.tx.send(Command::Cancel);
        if let Err(e) = self.shared.write(snapshot) {
            self.shared.report(&e);
        }
    }

    /// Cancels any pending flush and deletes the stored record.
    ///
    /// `epoch` is the ledger's epoch after the clear; flushes built from
    /// earlier snapshots are dropped from now on. A failed delete is
    /// remembered and retried by the next write attempt or
    /// [`flush_now`](Self::flush_now).
    ///
    /// # Errors
    ///
    /// * If the store fails to delete the record
    pub fn clear(&self, epoch: u64) -> Result<(), StoreError> {
        let _ = self.tx.send(Command::Cancel);
        self.shared.delete(epoch)
    }

    /// Performs any pending flush (or outstanding delete) now and waits for
    /// it to finish.
    pub async fn flush_now(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).is_ok() {
            let _ = done.await;
        }
    }
}

async fn run(
    shared: Arc<Shared>,
    mut rx: mpsc::UnboundedReceiver<Command>,
    quiet_period: Duration,
) {
    let mut pending: Option<Pending> = None;

    loop {
        let command = if let Some(deadline) = pending.as_ref().map(|p| p.deadline) {
            tokio::select! {
                command = rx.recv() => command,
                () = tokio::time::sleep_until(deadline) => {
                    if let Some(p) = pending.take() {
                        flush(&shared, p.snapshot).await;
                    }
                    continue;
                }
            }
        } else {
            rx.recv().await
        };

        match command {
            Some(Command::Schedule(snapshot)) => {
                pending = Some(Pending {
                    snapshot,
                    deadline: Instant::now() + quiet_period,
                });
            }
            Some(Command::Cancel) => {
                pending = None;
            }
            Some(Command::Flush(reply)) => {
                if let Some(p) = pending.take() {
                    flush(&shared, p.snapshot).await;
                } else if shared.delete_pending() {
                    settle(&shared).await;
                }
                let _ = reply.send(());
            }
            None => {
                if let Some(p) = pending.take() {
                    flush(&shared, p.snapshot).await;
                } else if shared.delete_pending() {
                    settle(&shared).await;
                }
                log::debug!("Persistence task shutting down");
                break;
            }
        }
    }
}

async fn flush(shared: &Arc<Shared>, snapshot: LedgerSnapshot) {
    let worker = Arc::clone(shared);
    match tokio::task::spawn_blocking(move || worker.write(&snapshot)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => shared.report(&e),
        Err(e) => log::error!("Flush task panicked: {e}"),
    }
}

async fn settle(shared: &Arc<Shared>) {
    let worker = Arc::clone(shared);
    match tokio::task::spawn_blocking(move || worker.settle()).await {
        Ok(Ok(())) => log::debug!("Retried delete of persisted explore ledger"),
        Ok(Err(e)) => shared.report(&e),
        Err(e) => log::error!("Delete retry task panicked: {e}"),
    }
}
