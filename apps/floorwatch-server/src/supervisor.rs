use std::process::Stdio;
use std::sync::Arc;

use floorwatch_core::types::{LogEntry, Zone};
use parking_lot::Mutex;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::log_buffer::LogBuffer;
use crate::metrics;

/// Worker lifecycle states. `Stopping` still counts as running for the
/// control API; only an observed exit returns the machine to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Stopping,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Idle => "idle",
            WorkerState::Running => "running",
            WorkerState::Stopping => "stopping",
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, WorkerState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    #[error("detection worker is already running")]
    AlreadyRunning,
    #[error("detection worker is not running")]
    NotRunning,
    #[error("no zones with a region are configured")]
    NoZonesConfigured,
}

/// How to invoke the external detection worker. The stream locator and the
/// serialized zone list are appended as the final two arguments.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

struct Inner {
    state: WorkerState,
    /// Ties each exit notification to the launch that produced it.
    generation: u64,
    stop_tx: Option<oneshot::Sender<()>>,
}

/// Owns the single detection worker process and its bounded log buffer.
/// `start`, `stop`, and exit notifications all pass through one mutex, so
/// transitions are serialized no matter which side they arrive from.
#[derive(Clone)]
pub struct WorkerSupervisor {
    command: WorkerCommand,
    logs: Arc<LogBuffer>,
    inner: Arc<Mutex<Inner>>,
}

impl WorkerSupervisor {
    pub fn new(command: WorkerCommand, log_capacity: usize) -> Self {
        Self {
            command,
            logs: Arc::new(LogBuffer::new(log_capacity)),
            inner: Arc::new(Mutex::new(Inner {
                state: WorkerState::Idle,
                generation: 0,
                stop_tx: None,
            })),
        }
    }

    /// Launch the worker against `stream_url` and the zones that have a
    /// region. Returns as soon as the launch is initiated; the OS spawn
    /// outcome is observed later through status and logs.
    pub fn start(&self, stream_url: &str, zones: &[Zone]) -> Result<(), SupervisorError> {
        let zones_json = serialize_zones(zones);

        let (stop_tx, stop_rx) = oneshot::channel();
        let (generation, zones_json) = {
            let mut inner = self.inner.lock();
            if inner.state.is_running() {
                return Err(SupervisorError::AlreadyRunning);
            }
            let Some(zones_json) = zones_json else {
                return Err(SupervisorError::NoZonesConfigured);
            };
            inner.generation += 1;
            inner.state = WorkerState::Running;
            inner.stop_tx = Some(stop_tx);
            (inner.generation, zones_json)
        };

        self.logs.clear();
        self.logs.push("worker starting");

        let supervisor = self.clone();
        let stream_url = stream_url.to_string();
        tokio::spawn(async move {
            supervisor
                .run_worker(generation, stream_url, zones_json, stop_rx)
                .await;
        });
        Ok(())
    }

    /// Request a graceful stop. Advisory: the state change to `Idle` happens
    /// only when the watcher observes the exit.
    pub fn stop(&self) -> Result<(), SupervisorError> {
        let stop_tx = {
            let mut inner = self.inner.lock();
            if inner.state != WorkerState::Running {
                return Err(SupervisorError::NotRunning);
            }
            inner.state = WorkerState::Stopping;
            inner.stop_tx.take()
        };
        self.logs.push("worker stop requested");
        if let Some(tx) = stop_tx {
            // A dropped receiver means the worker already exited; the
            // watcher records that transition on its own.
            let _ = tx.send(());
        }
        Ok(())
    }

    pub fn status(&self) -> WorkerState {
        self.inner.lock().state
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.snapshot()
    }

    async fn run_worker(
        self,
        generation: u64,
        stream_url: String,
        zones_json: String,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg(&stream_url)
            .arg(&zones_json)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(error = %err, program = %self.command.program, "failed to launch detection worker");
                self.logs
                    .push(format!("ERROR: failed to launch worker: {err}"));
                self.on_exit(generation);
                return;
            }
        };

        info!(pid = ?child.id(), %stream_url, "detection worker launched");
        self.spawn_output_readers(&mut child);

        let status = tokio::select! {
            status = child.wait() => status,
            _ = &mut stop_rx => {
                self.signal_stop(&mut child);
                child.wait().await
            }
        };

        match status {
            Ok(status) => {
                info!(code = ?status.code(), "detection worker exited");
                self.logs.push(format!("worker exited: {status}"));
            }
            Err(err) => {
                warn!(error = %err, "failed waiting on detection worker");
                self.logs.push(format!("ERROR: lost track of worker: {err}"));
            }
        }
        self.on_exit(generation);
    }

    /// Exit notification. Goes through the same mutex as `start`/`stop`; a
    /// stale watcher from a previous launch is ignored.
    fn on_exit(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.state = WorkerState::Idle;
        inner.stop_tx = None;
        metrics::WORKER_EXITS.inc();
    }

    fn signal_stop(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                info!(pid, "sending SIGTERM to detection worker");
                let rc = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
                if rc != 0 {
                    warn!(pid, "failed to signal detection worker");
                    self.logs.push("ERROR: failed to signal worker");
                }
                return;
            }
        }
        if let Err(err) = child.start_kill() {
            warn!(error = %err, "failed to kill detection worker");
            self.logs
                .push(format!("ERROR: failed to signal worker: {err}"));
        }
    }

    fn spawn_output_readers(&self, child: &mut Child) {
        if let Some(stdout) = child.stdout.take() {
            let logs = Arc::clone(&self.logs);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    logs.push(line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let logs = Arc::clone(&self.logs);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    logs.push(format!("ERROR: {line}"));
                }
            });
        }
    }
}

/// Serialize the regioned zones to the worker's argv form. `None` when no
/// zone has a region.
fn serialize_zones(zones: &[Zone]) -> Option<String> {
    let regioned: Vec<serde_json::Value> = zones
        .iter()
        .filter_map(|zone| {
            zone.region.map(|region| {
                json!({
                    "id": zone.id,
                    "x": region.x,
                    "y": region.y,
                    "width": region.width,
                    "height": region.height,
                })
            })
        })
        .collect();
    if regioned.is_empty() {
        return None;
    }
    Some(serde_json::Value::Array(regioned).to_string())
}
