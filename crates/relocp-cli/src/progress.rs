//! Console progress display fed from the shared state snapshot

use indicatif::{ProgressBar, ProgressStyle};
use relocp_state::SharedState;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Running progress bar; call [`ProgressHandle::finish`] when the run ends.
pub struct ProgressHandle {
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl ProgressHandle {
    /// Stop the display task and clear the bar
    pub async fn finish(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn a task that refreshes a progress bar from the engine's live state.
pub fn spawn(state: SharedState) -> ProgressHandle {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);

    let (shutdown, mut rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(200));
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let s = state.read().await;
                    bar.set_length(s.total_files);
                    bar.set_position(s.counted_files());
                    bar.set_message(s.phase.to_string());
                }
            }
        }
        bar.finish_and_clear();
    });

    ProgressHandle { task, shutdown }
}
