//! The watchdog loop

use crate::bookkeeping::SupervisorRecord;
use crate::budget::RestartBudget;
use chrono::Utc;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use relocp_config::Config;
use relocp_state::{HeartbeatView, StateStore};
use relocp_types::{Error, Phase, Result};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

/// How a supervision run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperviseOutcome {
    /// The engine reached Completed
    Completed,
    /// The restart budget ran out before the engine completed
    BudgetExhausted,
}

enum RunVerdict {
    Done,
    Restart(String),
}

/// Watchdog over the engine subprocess.
///
/// The supervisor never inspects why the engine is stuck; it only observes
/// the heartbeat in the state file. Everything it learns goes through two
/// read paths: the state file (engine-owned) and the child's exit status.
pub struct Supervisor {
    config: Config,
    command: Vec<String>,
    budget: RestartBudget,
    record: SupervisorRecord,
}

impl Supervisor {
    /// Supervise the current executable's `run` subcommand
    pub fn new(config: Config) -> Result<Self> {
        let exe = std::env::current_exe()
            .map_err(|e| Error::supervision(format!("cannot locate own executable: {}", e)))?;
        let command = vec![exe.to_string_lossy().to_string(), "run".to_string()];
        Ok(Self::with_command(config, command))
    }

    /// Supervise an arbitrary command, used by tests
    pub fn with_command(config: Config, command: Vec<String>) -> Self {
        let budget = RestartBudget::new(
            config.supervisor.max_restarts,
            config.supervisor.restart_delay(),
            config.supervisor.stable_reset(),
        );
        Self {
            config,
            command,
            budget,
            record: SupervisorRecord::new(),
        }
    }

    /// Restarts consumed so far
    pub fn restarts(&self) -> u32 {
        self.budget.restarts()
    }

    /// Run the watchdog until the engine completes or the budget runs out.
    ///
    /// An `Err` means supervision itself could not operate, for example the
    /// engine binary failed to spawn.
    pub async fn supervise(&mut self) -> Result<SuperviseOutcome> {
        let store = StateStore::new(self.config.state.file.clone());
        self.record = SupervisorRecord::new();

        loop {
            let mut child = self.spawn_engine()?;
            info!(pid = ?child.id(), "engine started");
            self.record.child_pid = child.id();
            self.record.restart_count = self.budget.restarts();
            self.persist_record();

            let started = Instant::now();
            let verdict = self.monitor(&mut child, &store, started).await;
            self.budget.note_run(started.elapsed());
            self.record.child_pid = None;
            self.persist_record();

            match verdict {
                RunVerdict::Done => {
                    info!("migration completed, supervision finished");
                    return Ok(SuperviseOutcome::Completed);
                }
                RunVerdict::Restart(reason) => {
                    warn!(reason = %reason, "engine needs restart");
                    if !self.budget.try_restart() {
                        error!(
                            max = self.config.supervisor.max_restarts,
                            "restart budget exhausted"
                        );
                        return Ok(SuperviseOutcome::BudgetExhausted);
                    }
                    tokio::time::sleep(self.budget.delay()).await;
                }
            }
        }
    }

    fn spawn_engine(&self) -> Result<Child> {
        let log_path = &self.config.supervisor.engine_log;
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::supervision(format!("cannot create log directory: {}", e))
            })?;
        }
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| {
                Error::supervision(format!("cannot open {}: {}", log_path.display(), e))
            })?;
        let log_err = log
            .try_clone()
            .map_err(|e| Error::supervision(format!("cannot clone log handle: {}", e)))?;

        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::supervision("empty engine command"))?;
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| Error::supervision(format!("failed to spawn engine: {}", e)))
    }

    async fn monitor(&self, child: &mut Child, store: &StateStore, started: Instant) -> RunVerdict {
        let mut ticker = tokio::time::interval(self.config.supervisor.check_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                status = child.wait() => {
                    return self.classify_exit(status, store);
                }
                _ = ticker.tick() => {
                    match HeartbeatView::read(store) {
                        Ok(Some(view)) => {
                            if view.phase == Phase::Completed {
                                self.terminate(child).await;
                                return RunVerdict::Done;
                            }
                            let in_grace =
                                started.elapsed() < self.config.supervisor.startup_grace();
                            if !in_grace
                                && view.is_stale(
                                    self.config.supervisor.heartbeat_timeout(),
                                    Utc::now(),
                                )
                            {
                                self.terminate(child).await;
                                return RunVerdict::Restart("stale heartbeat".to_string());
                            }
                        }
                        // No state file yet: the engine has not started
                        // working, which is not the same as hung
                        Ok(None) => {}
                        Err(e) => {
                            warn!(error = %e, "could not read state file");
                        }
                    }
                }
            }
        }
    }

    fn classify_exit(
        &self,
        status: std::io::Result<std::process::ExitStatus>,
        store: &StateStore,
    ) -> RunVerdict {
        let exit = match status {
            Ok(st) => st,
            Err(e) => return RunVerdict::Restart(format!("wait failed: {}", e)),
        };
        let phase = store
            .load()
            .ok()
            .flatten()
            .map(|s| s.phase)
            .unwrap_or(Phase::NotStarted);
        if exit.success() && phase == Phase::Completed {
            RunVerdict::Done
        } else {
            RunVerdict::Restart(format!("engine exited ({}) in phase {}", exit, phase))
        }
    }

    /// SIGTERM, bounded wait, then SIGKILL.
    async fn terminate(&self, child: &mut Child) {
        let Some(pid) = child.id() else {
            let _ = child.wait().await;
            return;
        };
        info!(pid, "sending SIGTERM to engine");
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(pid, error = %e, "SIGTERM failed");
        }
        let grace = self.config.supervisor.kill_grace();
        if tokio::time::timeout(grace, child.wait()).await.is_err() {
            warn!(pid, "engine ignored SIGTERM, killing");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }

    fn persist_record(&mut self) {
        if let Err(e) = self
            .record
            .save(&self.config.state.supervisor_file)
        {
            warn!(error = %e, "could not persist supervisor record");
        }
    }
}
