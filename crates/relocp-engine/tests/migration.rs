//! End-to-end migration engine tests against real temp directories

use async_trait::async_trait;
use relocp_config::Config;
use relocp_engine::{EngineBuilder, LocalCopier, MigrationEngine};
use relocp_state::StateStore;
use relocp_types::{Error, FileCopier, Phase, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

struct Dirs {
    _root: TempDir,
    config: Config,
}

fn setup() -> Dirs {
    let root = TempDir::new().unwrap();
    let source = root.path().join("source");
    let target = root.path().join("target");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::create_dir_all(&target).unwrap();

    let mut config = Config::default();
    config.source.root = source;
    config.source.mount_retries = 0;
    config.source.mount_retry_delay_secs = 0;
    config.target.root = target;
    config.state.file = root.path().join("state.json");

    Dirs {
        _root: root,
        config,
    }
}

fn seed_three_files(config: &Config) {
    let src = &config.source.root;
    std::fs::write(src.join("a.txt"), "alpha").unwrap();
    std::fs::write(src.join("b.txt"), "bravo").unwrap();
    std::fs::create_dir_all(src.join("sub")).unwrap();
    std::fs::write(src.join("sub/c.txt"), "charlie").unwrap();
}

#[tokio::test]
async fn test_three_file_migration_completes() {
    let dirs = setup();
    seed_three_files(&dirs.config);

    let engine = MigrationEngine::new(dirs.config.clone());
    let outcome = engine.run().await.unwrap();

    assert_eq!(outcome.phase, Phase::Completed);
    assert_eq!(outcome.state.total_files, 3);
    assert_eq!(outcome.state.files_copied, 3);
    assert_eq!(outcome.state.files_verified, 3);
    assert_eq!(outcome.state.copy_errors_count, 0);
    assert!(outcome.state.discrepancies.is_empty());
    assert!(outcome.state.finished_at.is_some());

    let target = &dirs.config.target.root;
    assert_eq!(std::fs::read_to_string(target.join("a.txt")).unwrap(), "alpha");
    assert_eq!(
        std::fs::read_to_string(target.join("sub/c.txt")).unwrap(),
        "charlie"
    );
}

#[tokio::test]
async fn test_second_run_skips_everything() {
    let dirs = setup();
    seed_three_files(&dirs.config);

    let first = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(first.phase, Phase::Completed);

    // The first run ended terminal, so the second starts a fresh pass and
    // recognizes every destination as already present
    let second = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(second.phase, Phase::Completed);
    assert_eq!(second.state.files_copied, 0);
    assert_eq!(second.state.files_skipped, 3);
    assert_eq!(second.state.copy_errors_count, 0);
    assert!(second.state.discrepancies.is_empty());
}

#[tokio::test]
async fn test_differing_destination_is_renamed() {
    let dirs = setup();
    seed_three_files(&dirs.config);
    // Pre-existing target file with different content and size
    std::fs::write(dirs.config.target.root.join("b.txt"), "something else").unwrap();

    let outcome = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::Completed);
    assert_eq!(outcome.state.files_copied, 2);
    assert_eq!(outcome.state.files_renamed, 1);
    assert_eq!(outcome.state.renamed_files.len(), 1);
    assert_eq!(outcome.state.renamed_files[0].original_name, "b.txt");
    assert_eq!(outcome.state.renamed_files[0].new_name, "b-1.txt");
    assert_eq!(
        outcome.state.completed_files.get("b.txt").unwrap(),
        "b-1.txt"
    );
    assert!(outcome.state.discrepancies.is_empty());

    let target = &dirs.config.target.root;
    assert_eq!(
        std::fs::read_to_string(target.join("b.txt")).unwrap(),
        "something else"
    );
    assert_eq!(
        std::fs::read_to_string(target.join("b-1.txt")).unwrap(),
        "bravo"
    );
}

struct FailingCopier {
    inner: LocalCopier,
    fail_name: String,
}

#[async_trait]
impl FileCopier for FailingCopier {
    async fn copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        if source.file_name().map(|n| n.to_string_lossy().to_string())
            == Some(self.fail_name.clone())
        {
            return Err(Error::copy(source, "injected failure"));
        }
        self.inner.copy(source, destination).await
    }
}

#[tokio::test]
async fn test_copy_failure_does_not_stop_the_walk() {
    let dirs = setup();
    seed_three_files(&dirs.config);

    let engine = EngineBuilder::new(dirs.config.clone())
        .with_copier(Arc::new(FailingCopier {
            inner: LocalCopier::new(),
            fail_name: "b.txt".to_string(),
        }))
        .build();
    let outcome = engine.run().await.unwrap();

    assert_eq!(outcome.phase, Phase::Completed);
    assert_eq!(outcome.state.files_copied, 2);
    assert_eq!(outcome.state.copy_errors_count, 1);
    assert_eq!(outcome.state.copy_errors.len(), 1);
    assert_eq!(outcome.state.copy_errors[0].path, "b.txt");
    assert!(!outcome.state.completed_files.contains_key("b.txt"));
    // The good files still verify cleanly
    assert_eq!(outcome.state.files_verified, 2);
    assert!(outcome.state.discrepancies.is_empty());
}

#[tokio::test]
async fn test_resume_skips_completed_files() {
    let dirs = setup();
    seed_three_files(&dirs.config);

    // Simulate a crash mid-pass: a.txt was copied and checkpointed
    std::fs::write(dirs.config.target.root.join("a.txt"), "alpha").unwrap();
    let mut crashed = relocp_state::MigrationState::new();
    crashed.advance(Phase::Mounting).unwrap();
    crashed.advance(Phase::Copying).unwrap();
    crashed.total_files = 3;
    crashed.record_copied("a.txt", "a.txt", 5);
    StateStore::new(dirs.config.state.file.clone())
        .save(&crashed)
        .unwrap();

    let outcome = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::Completed);
    assert_eq!(outcome.state.restart_generation, 1);
    assert_eq!(outcome.state.files_skipped, 1);
    assert_eq!(outcome.state.files_copied, 2);
    assert_eq!(outcome.state.completed_files.len(), 3);
    assert_eq!(outcome.state.files_verified, 3);
}

/// Copies one file, then asks the engine to stop.
struct CancellingCopier {
    inner: LocalCopier,
    engine: Arc<OnceLock<Arc<MigrationEngine>>>,
    copies: AtomicU32,
}

#[async_trait]
impl FileCopier for CancellingCopier {
    async fn copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        let bytes = self.inner.copy(source, destination).await?;
        if self.copies.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(engine) = self.engine.get() {
                engine.cancel();
            }
        }
        Ok(bytes)
    }
}

#[tokio::test]
async fn test_graceful_cancel_then_resume() {
    let dirs = setup();
    seed_three_files(&dirs.config);

    let slot: Arc<OnceLock<Arc<MigrationEngine>>> = Arc::new(OnceLock::new());
    let engine = Arc::new(
        EngineBuilder::new(dirs.config.clone())
            .with_copier(Arc::new(CancellingCopier {
                inner: LocalCopier::new(),
                engine: slot.clone(),
                copies: AtomicU32::new(0),
            }))
            .build(),
    );
    slot.set(engine.clone()).ok().unwrap();

    let outcome = engine.run().await.unwrap();

    // Stopped after the first file, at a resumable checkpoint
    assert_eq!(outcome.phase, Phase::Copying);
    assert_eq!(outcome.state.files_copied, 1);

    let persisted = StateStore::new(dirs.config.state.file.clone())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(persisted.completed_files.len(), 1);

    let resumed = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();
    assert_eq!(resumed.phase, Phase::Completed);
    assert_eq!(resumed.state.restart_generation, 1);
    assert_eq!(resumed.state.files_skipped, 1);
    assert_eq!(resumed.state.files_copied, 2);
    assert_eq!(resumed.state.files_verified, 3);
}

#[tokio::test]
async fn test_missing_source_fails() {
    let dirs = setup();
    std::fs::remove_dir_all(&dirs.config.source.root).unwrap();

    let outcome = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::Failed);
    assert!(outcome.state.finished_at.is_some());

    // The failure is persisted for the supervisor to observe
    let persisted = StateStore::new(dirs.config.state.file.clone())
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(persisted.phase, Phase::Failed);
}

#[tokio::test]
async fn test_long_basename_is_clamped() {
    let dirs = setup();
    let long_name = format!("{}.txt", "x".repeat(300));
    std::fs::write(dirs.config.source.root.join(&long_name), "data").unwrap();

    let outcome = MigrationEngine::new(dirs.config.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.phase, Phase::Completed);
    assert_eq!(outcome.state.files_copied, 1);
    let dest_rel = outcome.state.completed_files.values().next().unwrap();
    assert_eq!(dest_rel.len(), 255);
    assert!(dest_rel.ends_with(".txt"));
    assert!(dirs.config.target.root.join(dest_rel).exists());
}
