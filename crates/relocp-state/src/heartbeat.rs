//! Heartbeat publishing and the supervisor's read-only liveness view

use crate::{SharedState, StateStore};
use chrono::{DateTime, Utc};
use relocp_types::{Phase, Result};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A read-only liveness snapshot of the state file.
///
/// This is the only thing the supervisor looks at: it never inspects why the
/// engine might be stale, only that it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatView {
    /// Phase at the time of the snapshot
    pub phase: Phase,
    /// Last liveness stamp, if the engine has written one yet
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

impl HeartbeatView {
    /// Read a snapshot from the state file.
    ///
    /// Returns `Ok(None)` when the file does not exist yet - the engine may
    /// simply not have written its first checkpoint, which is "not yet
    /// hung", not corruption.
    pub fn read(store: &StateStore) -> Result<Option<Self>> {
        Ok(store.load()?.map(|state| Self {
            phase: state.phase,
            last_heartbeat_at: state.last_heartbeat_at,
        }))
    }

    /// Age of the heartbeat relative to `now`
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_heartbeat_at
            .and_then(|hb| (now - hb).to_std().ok())
    }

    /// Whether the heartbeat is older than `timeout`.
    ///
    /// A missing heartbeat is not stale by itself; the supervisor applies
    /// its startup grace window for that case.
    pub fn is_stale(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        match self.age(now) {
            Some(age) => age > timeout,
            None => false,
        }
    }
}

/// Timer-driven heartbeat publisher.
///
/// Checkpoint saves already stamp the heartbeat after every file; this task
/// exists for the gaps between checkpoints, so a long single-file copy on a
/// slow mount is not mistaken for a hang.
#[derive(Debug)]
pub struct HeartbeatPublisher {
    state: SharedState,
    store: StateStore,
    interval: Duration,
}

impl HeartbeatPublisher {
    /// Create a publisher over the shared state
    pub fn new(state: SharedState, store: StateStore, interval: Duration) -> Self {
        Self {
            state,
            store,
            interval,
        }
    }

    /// Spawn the publisher task.
    ///
    /// Returns the task handle and a shutdown sender; dropping the sender or
    /// sending `true` stops the task after its current tick.
    pub fn spawn(self) -> (JoinHandle<()>, watch::Sender<bool>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.publish().await {
                            warn!(error = %e, "heartbeat publish failed");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            debug!("heartbeat publisher stopping");
                            break;
                        }
                    }
                }
            }
        });

        (handle, shutdown_tx)
    }

    async fn publish(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.touch_heartbeat();
        self.store.save(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shared, MigrationState};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_state_file_is_not_a_view() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(HeartbeatView::read(&store).unwrap().is_none());
    }

    #[test]
    fn test_staleness_detection() {
        let now = Utc::now();
        let view = HeartbeatView {
            phase: Phase::Copying,
            last_heartbeat_at: Some(now - chrono::Duration::seconds(300)),
        };

        assert!(view.is_stale(Duration::from_secs(120), now));
        assert!(!view.is_stale(Duration::from_secs(600), now));
    }

    #[test]
    fn test_missing_heartbeat_is_not_stale() {
        let view = HeartbeatView {
            phase: Phase::Mounting,
            last_heartbeat_at: None,
        };
        assert!(!view.is_stale(Duration::from_secs(1), Utc::now()));
        assert!(view.age(Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_publisher_refreshes_heartbeat() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let state = shared(MigrationState::new());

        let stale = Utc::now() - chrono::Duration::seconds(3600);
        state.write().await.last_heartbeat_at = Some(stale);

        let publisher = HeartbeatPublisher::new(
            Arc::clone(&state),
            store.clone(),
            Duration::from_millis(10),
        );
        let (handle, shutdown) = publisher.spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send(true).unwrap();
        handle.await.unwrap();

        let view = HeartbeatView::read(&store).unwrap().unwrap();
        assert!(view.last_heartbeat_at.unwrap() > stale);
    }
}
