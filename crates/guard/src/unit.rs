// crates/guard/src/unit.rs
//! Breaker units: one task owning a single key's breaker state
//!
//! Every key gets its own unit, a spawned task holding that key's [`Breaker`]
//! value and applying transitions one command at a time. Serializing through
//! the command channel is what makes per-key increments linearizable even
//! when many callers hit the same key at once. When a unit exits it reports
//! `(key, id)` on the registry's eviction channel so the mapping can be
//! reclaimed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tripswitch_core::Breaker;

const COMMAND_BUFFER: usize = 32;

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// The unit backing a handle has terminated
#[derive(Debug, Error)]
#[error("breaker unit has terminated")]
pub struct UnitGone;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// The call may proceed; any expired trip has been cleared
    Admitted,
    /// The breaker is tripped and inside its cooldown window
    Blocked,
}

pub(crate) enum Command {
    Admit {
        timeout: Duration,
        reply: oneshot::Sender<Admission>,
    },
    RecordFailure {
        threshold: u32,
        reply: oneshot::Sender<Breaker>,
    },
    RecordSuccess {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<Breaker>,
    },
    Rewind {
        by: Duration,
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Cloneable reference to a live breaker unit
///
/// All state access for a key flows through its handle; once the unit has
/// terminated every method fails with [`UnitGone`].
#[derive(Debug, Clone)]
pub struct BreakerHandle {
    id: u64,
    tx: mpsc::Sender<Command>,
}

impl BreakerHandle {
    /// Returns the unit's unique id
    ///
    /// Two handles refer to the same unit exactly when their ids match.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) async fn admit(&self, timeout: Duration) -> Result<Admission, UnitGone> {
        self.request(|reply| Command::Admit { timeout, reply }).await
    }

    pub(crate) async fn record_failure(&self, threshold: u32) -> Result<Breaker, UnitGone> {
        self.request(|reply| Command::RecordFailure { threshold, reply })
            .await
    }

    pub(crate) async fn record_success(&self) -> Result<(), UnitGone> {
        self.request(|reply| Command::RecordSuccess { reply }).await
    }

    /// Returns a copy of the unit's current breaker state
    pub async fn snapshot(&self) -> Result<Breaker, UnitGone> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Moves the trip instant back by `by`, touching nothing else
    ///
    /// Escape hatch for exercising cooldown expiry without waiting out the
    /// window.
    pub async fn rewind(&self, by: Duration) -> Result<(), UnitGone> {
        self.request(|reply| Command::Rewind { by, reply }).await
    }

    /// Asks the unit to terminate; eviction follows through the registry
    ///
    /// Delivery is handed to a spawned task so a momentarily full command
    /// buffer cannot drop the shutdown, while callers stay synchronous.
    pub(crate) fn shutdown(&self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Command::Shutdown).await;
        });
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, UnitGone> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(command(reply_tx)).await.map_err(|_| UnitGone)?;
        reply_rx.await.map_err(|_| UnitGone)
    }
}

/// Spawns a unit for `key` and returns its handle
pub(crate) fn spawn<K>(key: K, evict_tx: mpsc::UnboundedSender<(K, u64)>) -> BreakerHandle
where
    K: Send + 'static,
{
    let id = NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    tokio::spawn(run(key, id, rx, evict_tx));
    BreakerHandle { id, tx }
}

async fn run<K>(
    key: K,
    id: u64,
    mut rx: mpsc::Receiver<Command>,
    evict_tx: mpsc::UnboundedSender<(K, u64)>,
) where
    K: Send + 'static,
{
    let mut breaker = Breaker::new();

    while let Some(command) = rx.recv().await {
        match command {
            Command::Admit { timeout, reply } => {
                if breaker.is_tripped(timeout) {
                    let _ = reply.send(Admission::Blocked);
                } else {
                    if breaker.tripped() {
                        log::debug!("breaker unit {id}: cooldown expired, counter cleared");
                    }
                    breaker = breaker.reset_tripped();
                    let _ = reply.send(Admission::Admitted);
                }
            }
            Command::RecordFailure { threshold, reply } => {
                let was_tripped = breaker.tripped();
                breaker = breaker.increment(threshold);
                if breaker.tripped() && !was_tripped {
                    log::warn!(
                        "breaker unit {id} tripped after {} counted failures",
                        breaker.failure_count()
                    );
                }
                let _ = reply.send(breaker);
            }
            Command::RecordSuccess { reply } => {
                breaker = Breaker::new();
                let _ = reply.send(());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(breaker);
            }
            Command::Rewind { by, reply } => {
                breaker = breaker.rewind(by);
                let _ = reply.send(());
            }
            Command::Shutdown => break,
        }
    }

    // Runs on explicit shutdown and when the last handle is dropped alike.
    let _ = evict_tx.send((key, id));
    log::debug!("breaker unit {id} terminated");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evict_channel<K>() -> (
        mpsc::UnboundedSender<(K, u64)>,
        mpsc::UnboundedReceiver<(K, u64)>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn test_admit_then_trip_then_block() {
        let (evict_tx, _evict_rx) = evict_channel::<&str>();
        let handle = spawn("key", evict_tx);
        let timeout = Duration::from_secs(60);

        assert_eq!(handle.admit(timeout).await.ok(), Some(Admission::Admitted));

        let after = handle.record_failure(2).await.ok();
        assert_eq!(after.map(|b| b.failure_count()), Some(1));
        let after = handle.record_failure(2).await.ok();
        assert_eq!(after.map(|b| b.tripped()), Some(true));

        assert_eq!(handle.admit(timeout).await.ok(), Some(Admission::Blocked));
    }

    #[tokio::test]
    async fn test_admit_clears_expired_trip() {
        let (evict_tx, _evict_rx) = evict_channel::<&str>();
        let handle = spawn("key", evict_tx);

        handle.record_failure(1).await.ok();
        handle.rewind(Duration::from_secs(120)).await.ok();

        let admission = handle.admit(Duration::from_secs(60)).await.ok();
        assert_eq!(admission, Some(Admission::Admitted));

        let snapshot = handle.snapshot().await.ok();
        assert_eq!(snapshot.map(|b| b.failure_count()), Some(0));
        assert_eq!(snapshot.map(|b| b.tripped()), Some(false));
    }

    #[tokio::test]
    async fn test_success_clears_accumulated_failures() {
        let (evict_tx, _evict_rx) = evict_channel::<&str>();
        let handle = spawn("key", evict_tx);

        handle.record_failure(5).await.ok();
        handle.record_failure(5).await.ok();
        handle.record_success().await.ok();

        let snapshot = handle.snapshot().await.ok();
        assert_eq!(snapshot.map(|b| b.failure_count()), Some(0));
    }

    #[tokio::test]
    async fn test_shutdown_reports_eviction() {
        let (evict_tx, mut evict_rx) = evict_channel::<&str>();
        let handle = spawn("key", evict_tx);
        let id = handle.id();

        handle.shutdown();
        assert_eq!(evict_rx.recv().await, Some(("key", id)));
        assert!(handle.snapshot().await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_is_delivered_under_command_load() {
        let (evict_tx, mut evict_rx) = evict_channel::<&str>();
        let handle = spawn("key", evict_tx);
        let id = handle.id();

        // Keep the command buffer busy while the shutdown is issued.
        let mut tasks = Vec::new();
        for _ in 0..64 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let _ = handle.record_failure(1_000).await;
            }));
        }
        handle.shutdown();
        for task in tasks {
            let _ = task.await;
        }

        assert_eq!(evict_rx.recv().await, Some(("key", id)));
    }

    #[tokio::test]
    async fn test_dropping_all_handles_reports_eviction() {
        let (evict_tx, mut evict_rx) = evict_channel::<&str>();
        let handle = spawn("key", evict_tx);
        let id = handle.id();

        drop(handle);
        assert_eq!(evict_rx.recv().await, Some(("key", id)));
    }
}
