//! The migration state machine and per-file decision logic

use crate::copier::LocalCopier;
use crate::mount::{mount_with_retries, LocalMounter};
use crate::naming;
use crate::walker::{ExcludeFilter, FileEntry, TreeWalker};
use relocp_config::Config;
use relocp_state::{shared, HeartbeatPublisher, MigrationState, SharedState, StateStore};
use relocp_types::{Error, FileAction, FileCopier, Mounter, Phase, Result};
use relocp_verify::{FileCheck, IntegrityVerifier};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Final snapshot of a finished (or interrupted) run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Phase the run ended in
    pub phase: Phase,
    /// Full state snapshot at the end of the run
    pub state: MigrationState,
}

impl RunOutcome {
    /// Whether the migration reached Completed
    pub fn is_success(&self) -> bool {
        self.phase == Phase::Completed
    }
}

/// Builds a [`MigrationEngine`], letting tests substitute collaborators.
pub struct EngineBuilder {
    config: Config,
    copier: Arc<dyn FileCopier>,
    mounter: Arc<dyn Mounter>,
}

impl EngineBuilder {
    /// Start from a configuration with the built-in collaborators
    pub fn new(config: Config) -> Self {
        Self {
            config,
            copier: Arc::new(LocalCopier::new()),
            mounter: Arc::new(LocalMounter::new()),
        }
    }

    /// Substitute the file copier
    pub fn with_copier(mut self, copier: Arc<dyn FileCopier>) -> Self {
        self.copier = copier;
        self
    }

    /// Substitute the mounter
    pub fn with_mounter(mut self, mounter: Arc<dyn Mounter>) -> Self {
        self.mounter = mounter;
        self
    }

    /// Finish building the engine
    pub fn build(self) -> MigrationEngine {
        let verifier = IntegrityVerifier::new(
            self.config.verification.method,
            self.config.verification.algorithm,
            self.config.verification.hash_retries,
        );
        let store = StateStore::new(self.config.state.file.clone());
        let (cancel, _) = watch::channel(false);
        MigrationEngine {
            config: self.config,
            store,
            state: shared(MigrationState::default()),
            copier: self.copier,
            mounter: self.mounter,
            verifier: Arc::new(verifier),
            cancel,
        }
    }
}

/// One-shot migration engine.
///
/// A single `run` drives the migration from whatever the persisted state
/// left off at through to a terminal phase, checkpointing after every file
/// so a crash at any point resumes without re-copying.
pub struct MigrationEngine {
    config: Config,
    store: StateStore,
    state: SharedState,
    copier: Arc<dyn FileCopier>,
    mounter: Arc<dyn Mounter>,
    verifier: Arc<IntegrityVerifier>,
    cancel: watch::Sender<bool>,
}

impl MigrationEngine {
    /// Create an engine with the built-in collaborators
    pub fn new(config: Config) -> Self {
        EngineBuilder::new(config).build()
    }

    /// Shared handle onto the live state, for progress display
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Request a graceful stop: the in-flight file finishes and is
    /// checkpointed before the run returns.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Drive the migration to a terminal phase (or a resumable checkpoint
    /// if cancelled).
    ///
    /// Fatal errors (mount exhaustion, unreadable source, checkpoint write
    /// failure) move the phase to Failed; the caller inspects the returned
    /// outcome for the exit code.
    pub async fn run(&self) -> Result<RunOutcome> {
        let initial = match self.store.load()? {
            None => MigrationState::new(),
            Some(s) if s.phase.is_terminal() => {
                info!(phase = %s.phase, "previous run finished, starting fresh");
                MigrationState::new()
            }
            Some(s) if s.phase == Phase::NotStarted => s,
            Some(mut s) => {
                s.reset_for_resume();
                s
            }
        };
        *self.state.write().await = initial;

        let publisher = HeartbeatPublisher::new(
            self.state.clone(),
            StateStore::new(self.store.path()),
            self.config.heartbeat.interval(),
        );
        let (hb_task, hb_shutdown) = publisher.spawn();

        let result = self.drive().await;

        let _ = hb_shutdown.send(true);
        let _ = hb_task.await;

        if let Err(e) = result {
            error!(error = %e, "migration failed");
            let mut s = self.state.write().await;
            if !s.phase.is_terminal() {
                s.advance(Phase::Failed)?;
            }
            if let Err(save_err) = self.store.save(&s) {
                error!(error = %save_err, "could not persist failed state");
            }
        }

        let final_state = self.state.read().await.clone();
        Ok(RunOutcome {
            phase: final_state.phase,
            state: final_state,
        })
    }

    async fn drive(&self) -> Result<()> {
        let mut cancelled = self.cancel.subscribe();

        if self.phase().await == Phase::NotStarted {
            self.advance(Phase::Mounting).await?;
        }

        let spec = if self.config.source.mount_spec.is_empty() {
            self.config.source.root.to_string_lossy().to_string()
        } else {
            self.config.source.mount_spec.clone()
        };
        let source_root = mount_with_retries(
            self.mounter.as_ref(),
            &spec,
            self.config.source.mount_retries,
            self.config.source.mount_retry_delay(),
        )
        .await?;

        if self.phase().await == Phase::Mounting {
            self.advance(Phase::Copying).await?;
        }

        let filter = ExcludeFilter::new(&self.config.exclude)?;
        let walker = TreeWalker::new(&source_root, filter);
        let entries = tokio::task::spawn_blocking(move || walker.enumerate())
            .await
            .map_err(|e| Error::enumeration(format!("enumeration task failed: {}", e)))??;

        {
            let mut s = self.state.write().await;
            s.total_files = entries.len() as u64;
            s.total_size_bytes = entries.iter().map(|e| e.size).sum();
        }
        self.checkpoint().await?;

        for entry in &entries {
            if *cancelled.borrow_and_update() {
                info!("cancellation requested, stopping after checkpoint");
                return Ok(());
            }
            self.process_file(entry).await?;
        }

        self.advance(Phase::Verifying).await?;
        self.verify_pass(&source_root, &mut cancelled).await?;

        self.advance(Phase::Completed).await?;
        let s = self.state.read().await;
        info!(
            copied = s.files_copied,
            renamed = s.files_renamed,
            skipped = s.files_skipped,
            errors = s.copy_errors_count,
            verified = s.files_verified,
            discrepancies = s.discrepancies.len(),
            "migration completed"
        );
        Ok(())
    }

    /// Decide and execute the per-file action, then checkpoint.
    async fn process_file(&self, entry: &FileEntry) -> Result<()> {
        let rel = entry.relative.to_string_lossy().to_string();

        let already_done = self
            .state
            .read()
            .await
            .completed_files
            .contains_key(&rel);
        if already_done {
            self.state.write().await.record_skipped(&rel);
            return self.checkpoint().await;
        }

        let (dest_rel, dest) = self.destination_for(&entry.relative);
        let dest_rel_str = dest_rel.to_string_lossy().to_string();

        match self.decide(entry, &dest).await {
            Ok(FileAction::Skip) => {
                self.state.write().await.record_skipped(&rel);
            }
            Ok(FileAction::Copy) => match self.copier.copy(&entry.source, &dest).await {
                Ok(bytes) => {
                    self.state
                        .write()
                        .await
                        .record_copied(&rel, &dest_rel_str, bytes);
                }
                Err(e) => {
                    warn!(path = %rel, error = %e, "copy failed");
                    self.state
                        .write()
                        .await
                        .record_copy_error(&rel, &e.to_string());
                }
            },
            Ok(FileAction::Rename { new_name }) => {
                let parent = dest.parent().unwrap_or_else(|| Path::new(""));
                let new_dest = parent.join(&new_name);
                let new_dest_rel = dest_rel
                    .parent()
                    .unwrap_or_else(|| Path::new(""))
                    .join(&new_name)
                    .to_string_lossy()
                    .to_string();
                match self.copier.copy(&entry.source, &new_dest).await {
                    Ok(bytes) => {
                        info!(path = %rel, renamed_to = %new_dest_rel, "destination differs, copied under new name");
                        self.state
                            .write()
                            .await
                            .record_renamed(&rel, &dest_rel_str, &new_dest_rel, bytes);
                    }
                    Err(e) => {
                        warn!(path = %rel, error = %e, "renamed copy failed");
                        self.state
                            .write()
                            .await
                            .record_copy_error(&rel, &e.to_string());
                    }
                }
            }
            Err(e) => {
                warn!(path = %rel, error = %e, "destination unreadable");
                self.state
                    .write()
                    .await
                    .record_copy_error(&rel, &e.to_string());
            }
        }

        self.checkpoint().await
    }

    /// Classify a file against its destination: copy, skip, or copy under
    /// a collision-disambiguated name.
    async fn decide(&self, entry: &FileEntry, dest: &Path) -> Result<FileAction> {
        match tokio::fs::metadata(dest).await {
            Ok(dest_meta) => {
                if self.cheap_match(entry, &dest_meta).await {
                    Ok(FileAction::Skip)
                } else {
                    let parent = dest.parent().unwrap_or_else(|| Path::new(""));
                    let base = dest
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    Ok(FileAction::Rename {
                        new_name: naming::disambiguate(parent, &base),
                    })
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileAction::Copy),
            Err(e) => Err(Error::copy(
                &entry.source,
                format!("destination unreadable: {}", e),
            )),
        }
    }

    /// The cheap identity check: same size and source not newer.
    async fn cheap_match(&self, entry: &FileEntry, dest_meta: &std::fs::Metadata) -> bool {
        if dest_meta.len() != entry.size {
            return false;
        }
        let src_meta = match tokio::fs::metadata(&entry.source).await {
            Ok(m) => m,
            Err(_) => return false,
        };
        match (src_meta.modified(), dest_meta.modified()) {
            (Ok(src_mtime), Ok(dest_mtime)) => src_mtime <= dest_mtime,
            _ => false,
        }
    }

    async fn verify_pass(
        &self,
        source_root: &Path,
        cancelled: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        let pairs: Vec<(String, String)> = {
            let s = self.state.read().await;
            s.completed_files
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        for (src_rel, dest_rel) in pairs {
            if *cancelled.borrow_and_update() {
                info!("cancellation requested during verification");
                return Ok(());
            }
            let src = source_root.join(&src_rel);
            let dst = self.config.target.root.join(&dest_rel);
            match self.verifier.check_file(&src, &dst).await {
                Ok(FileCheck::Match) => {
                    self.state.write().await.files_verified += 1;
                }
                Ok(FileCheck::Mismatch { expected, actual }) => {
                    warn!(path = %src_rel, "integrity mismatch");
                    self.state
                        .write()
                        .await
                        .record_discrepancy(&src_rel, &expected, &actual);
                }
                Ok(FileCheck::MissingDestination) => {
                    warn!(path = %src_rel, "destination missing at verification");
                    self.state
                        .write()
                        .await
                        .record_discrepancy(&src_rel, "present", "missing");
                }
                Err(e) => {
                    warn!(path = %src_rel, error = %e, "verification check failed");
                    self.state.write().await.record_discrepancy(
                        &src_rel,
                        "verifiable",
                        &format!("check failed: {}", e),
                    );
                }
            }
            self.checkpoint().await?;
        }
        Ok(())
    }

    /// Destination-relative path and absolute destination for a source
    /// entry, with the basename clamped to the configured length.
    fn destination_for(&self, relative: &Path) -> (PathBuf, PathBuf) {
        let base = relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let clamped = naming::clamp_basename(&base, self.config.target.max_filename_bytes);
        let dest_rel = relative
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(clamped);
        let dest = self.config.target.root.join(&dest_rel);
        (dest_rel, dest)
    }

    async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    async fn advance(&self, next: Phase) -> Result<()> {
        self.state.write().await.advance(next)?;
        self.checkpoint().await
    }

    /// Stamp the heartbeat and persist. Checkpoint failures are fatal:
    /// without durability a crash would silently lose progress.
    async fn checkpoint(&self) -> Result<()> {
        let mut s = self.state.write().await;
        s.touch_heartbeat();
        self.store.save(&s)
    }
}
