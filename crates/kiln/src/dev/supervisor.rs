//! Supervision of the headless process target.
//!
//! At most one instance is current. A restart marks the running instance
//! superseded, asks it to terminate and spawns the replacement right away, so
//! old and new may briefly overlap. Exit reports from superseded instances are
//! never acted upon.

use crate::error::{KilnError, Result};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

/// Identifier of one spawned instance; never reused within a session.
pub type ProcessId = u64;

/// How to launch the supervised process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl ProcessCommand {
    /// Build from an argv list (`program` followed by its arguments).
    pub fn from_argv(argv: &[String], cwd: PathBuf) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| KilnError::InvalidArgument("run command is empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd,
            env: Vec::new(),
        })
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The command line for display.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Lifecycle of one instance. Spawning is synchronous, so an instance is
/// `Running` from the moment it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited,
    Killed,
}

impl ProcessState {
    pub fn is_alive(&self) -> bool {
        matches!(self, ProcessState::Running)
    }
}

/// Reported by an instance's wait task.
#[derive(Debug)]
pub enum ProcessEvent {
    Exited {
        id: ProcessId,
        /// `None` when the exit status could not be collected
        status: Option<ExitStatus>,
        /// Whether the supervisor asked for the termination
        killed: bool,
    },
}

#[derive(Debug)]
struct SupervisedProcess {
    id: ProcessId,
    pid: Option<u32>,
    state: ProcessState,
    superseded: Arc<AtomicBool>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl SupervisedProcess {
    /// Retire this instance: its exit will not be reported.
    fn retire(&mut self) {
        self.superseded.store(true, Ordering::Release);
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }
        if self.state.is_alive() {
            self.state = ProcessState::Killed;
        }
    }
}

/// Owns the current instance of the supervised process.
///
/// Driven from the session loop only; instances report back through the
/// event channel handed to [`ProcessSupervisor::new`].
#[derive(Debug)]
pub struct ProcessSupervisor {
    command: ProcessCommand,
    events: mpsc::Sender<ProcessEvent>,
    current: Option<SupervisedProcess>,
    next_id: ProcessId,
}

impl ProcessSupervisor {
    pub fn new(command: ProcessCommand, events: mpsc::Sender<ProcessEvent>) -> Self {
        Self {
            command,
            events,
            current: None,
            next_id: 1,
        }
    }

    pub fn current_id(&self) -> Option<ProcessId> {
        self.current.as_ref().map(|p| p.id)
    }

    pub fn state(&self) -> Option<ProcessState> {
        self.current.as_ref().map(|p| p.state)
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|p| p.state.is_alive())
    }

    /// Start the target unless a current instance is alive.
    ///
    /// Returns whether a new instance was spawned.
    pub fn ensure_running(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.spawn()
    }

    /// Replace the current instance.
    ///
    /// The old instance is told to terminate but not waited for.
    pub fn restart(&mut self) -> bool {
        if let Some(old) = self.current.as_mut() {
            if old.state.is_alive() {
                tracing::debug!(id = old.id, pid = ?old.pid, "superseding process");
                old.retire();
            }
        }
        self.spawn()
    }

    fn spawn(&mut self) -> bool {
        let id = self.next_id;
        self.next_id += 1;

        let child = match self.command.to_command().spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(command = %self.command.display(), error = %e, "failed to start process");
                crate::ui::error(&format!(
                    "Failed to start `{}`: {}",
                    self.command.display(),
                    e
                ));
                self.current = None;
                return false;
            }
        };

        let pid = child.id();
        let superseded = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel();

        tokio::spawn(wait_for_exit(
            id,
            child,
            kill_rx,
            Arc::clone(&superseded),
            self.events.clone(),
        ));

        tracing::info!(id, pid = ?pid, command = %self.command.display(), "process started");
        self.current = Some(SupervisedProcess {
            id,
            pid,
            state: ProcessState::Running,
            superseded,
            kill_tx: Some(kill_tx),
        });
        true
    }

    /// Apply an event from a wait task.
    ///
    /// Events from instances other than the current one are ignored. Returns
    /// whether the event changed the current instance.
    pub fn handle_event(&mut self, event: ProcessEvent) -> bool {
        let ProcessEvent::Exited { id, status, killed } = event;

        let Some(current) = self.current.as_mut() else {
            return false;
        };
        if current.id != id || !current.state.is_alive() {
            tracing::debug!(id, "ignoring exit of a retired process");
            return false;
        }

        current.kill_tx = None;
        current.state = if killed {
            ProcessState::Killed
        } else {
            ProcessState::Exited
        };

        match status {
            Some(status) if status.success() => {
                crate::ui::info(&format!("Process {} exited", id));
            }
            Some(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                crate::ui::warning(&format!(
                    "Process {} exited with code {}; waiting for the next change",
                    id, code
                ));
            }
            None => {
                crate::ui::warning(&format!("Process {} ended with unknown status", id));
            }
        }
        true
    }

    /// Terminate the current instance for teardown.
    pub fn shutdown(&mut self) {
        if let Some(current) = self.current.as_mut() {
            if current.state.is_alive() {
                tracing::debug!(id = current.id, "stopping process");
            }
            current.retire();
        }
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn wait_for_exit(
    id: ProcessId,
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    superseded: Arc<AtomicBool>,
    events: mpsc::Sender<ProcessEvent>,
) {
    let (status, killed) = tokio::select! {
        status = child.wait() => (status.ok(), false),
        // Explicit request or supervisor gone
        _ = kill_rx => {
            if let Err(e) = child.kill().await {
                tracing::debug!(id, error = %e, "kill failed");
            }
            (child.wait().await.ok(), true)
        }
    };

    if superseded.load(Ordering::Acquire) {
        tracing::debug!(id, "superseded process finished");
        return;
    }

    let _ = events.send(ProcessEvent::Exited { id, status, killed }).await;
}
