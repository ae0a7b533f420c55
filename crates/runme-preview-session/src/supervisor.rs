//! Supervision of the renderer process.
//!
//! The [`Supervisor`] owns at most one [`Session`] at a time. Everything a
//! session holds (stream readers, the process, the snapshot file) is released
//! by [`Supervisor::teardown`], whichever way the session ends: the user
//! closing the panel, the process exiting, or a failed spawn.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use runme_preview_core::{Error, Result, SessionId, SessionState, StreamKind, SurfaceId};
use runme_preview_relay::PtyRelay;

use crate::event::PreviewEvent;
use crate::executable::check_executable;
use crate::snapshot::SnapshotFile;

/// Time a terminated renderer gets to exit before it is killed.
const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(500);

/// Upper bound on waiting for stream readers after the process exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Program and arguments of a renderer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable path
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
}

impl CommandLine {
    /// Create a new command line.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a teardown request.
#[derive(Debug)]
pub enum Teardown {
    /// Nothing was live; nothing was done
    NoSession,
    /// A session was released
    Completed {
        /// The session that ended
        session: SessionId,
        /// Resources that could not be released; all others were
        cleanup_errors: Vec<Error>,
    },
}

impl Teardown {
    /// Whether this call released a session.
    pub fn released(&self) -> bool {
        matches!(self, Teardown::Completed { .. })
    }
}

/// Handle to the running process, held by the session.
///
/// The process itself is owned by its exit watcher task; the session only
/// keeps the means to ask for termination.
#[derive(Debug)]
struct ProcessHandle {
    pid: Option<u32>,
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    /// Ask the watcher to terminate the process. Returns false if already asked.
    fn release(&mut self) -> bool {
        match self.kill.take() {
            Some(kill) => {
                // An Err means the watcher already saw the exit
                let _ = kill.send(());
                true
            }
            None => false,
        }
    }
}

/// One renderer run and the resources attached to it.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    target: PathBuf,
    process: Option<ProcessHandle>,
    relay: PtyRelay,
    snapshot: Option<SnapshotFile>,
    surface: Option<SurfaceId>,
    started_at: Instant,
}

impl Session {
    fn new(target: PathBuf, snapshot: Option<SnapshotFile>) -> Self {
        Self {
            id: SessionId::new(),
            target,
            process: None,
            relay: PtyRelay::new(),
            snapshot,
            surface: None,
            started_at: Instant::now(),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// File being rendered (possibly a snapshot).
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// OS process id, once spawned.
    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid)
    }

    /// Snapshot file owned by this session, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_ref().map(SnapshotFile::path)
    }

    /// Panel showing this session's output.
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    /// Number of stream readers attached.
    pub fn stream_count(&self) -> usize {
        self.relay.subscriptions().len()
    }

    /// Release everything. Continues past failures and returns them.
    fn release(mut self) -> Vec<Error> {
        let mut errors = Vec::new();

        self.relay.detach_all();

        if let Some(mut process) = self.process.take() {
            if process.release() {
                debug!("Requested termination: session={}, pid={:?}", self.id, process.pid);
            }
        }

        if let Some(snapshot) = self.snapshot.take() {
            if let Err(e) = snapshot.remove() {
                warn!("Snapshot cleanup failed: session={}, {}", self.id, e);
                errors.push(e);
            }
        }

        errors
    }
}

/// Owner of the single renderer session.
#[derive(Debug)]
pub struct Supervisor {
    state: SessionState,
    session: Option<Session>,
    kill_grace: Duration,
}

impl Supervisor {
    /// Create an idle supervisor.
    pub fn new() -> Self {
        Self::with_kill_grace(DEFAULT_KILL_GRACE)
    }

    /// Create an idle supervisor with a custom SIGTERM-to-kill grace period.
    pub fn with_kill_grace(kill_grace: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            session: None,
            kill_grace,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Identifier of the live session, if any.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(Session::id)
    }

    /// Whether `id` is the live session.
    pub fn is_current(&self, id: SessionId) -> bool {
        self.session_id() == Some(id)
    }

    /// Record the panel showing the live session's output.
    pub fn attach_surface(&mut self, surface: SurfaceId) {
        if let Some(session) = self.session.as_mut() {
            session.surface = Some(surface);
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("Supervisor state: {:?} → {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Start the renderer.
    ///
    /// Both output streams are attached to the relay and an exit watcher is
    /// registered; output, read errors and the exit arrive on `events`. On
    /// failure nothing stays running and `snapshot` has been deleted.
    pub fn spawn(
        &mut self,
        command: &CommandLine,
        target: PathBuf,
        snapshot: Option<SnapshotFile>,
        events: &mpsc::UnboundedSender<PreviewEvent>,
    ) -> Result<SessionId> {
        if !self.state.can_spawn() {
            warn!("Refusing to spawn while {:?}", self.state);
            return Err(Error::SessionActive);
        }

        info!("Spawning renderer: {}", command);
        let mut session = Session::new(target, snapshot);
        self.set_state(SessionState::Spawning);

        let child = check_executable(&command.program).and_then(|_| start(command));
        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to start renderer: {}", e);
                self.set_state(SessionState::TearingDown);
                for cleanup in session.release() {
                    warn!("Cleanup after failed spawn: {}", cleanup);
                }
                self.set_state(SessionState::Closed);
                return Err(e);
            }
        };

        let id = session.id;
        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(session.relay.attach(StreamKind::Stdout, stdout, id, events.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(session.relay.attach(StreamKind::Stderr, stderr, id, events.clone()));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let pid = child.id();
        tokio::spawn(watch_exit(
            id,
            child,
            kill_rx,
            drains,
            events.clone(),
            self.kill_grace,
        ));

        session.process = Some(ProcessHandle {
            pid,
            kill: Some(kill_tx),
        });
        self.session = Some(session);
        self.set_state(SessionState::Running);
        info!("Renderer running: session={}, pid={:?}", id, pid);

        Ok(id)
    }

    /// Release the live session, if any.
    ///
    /// Safe to call any number of times: only the first call after a spawn
    /// does anything, later calls return [`Teardown::NoSession`].
    pub fn teardown(&mut self) -> Teardown {
        if !self.state.is_live() {
            debug!("Teardown with no live session ({:?})", self.state);
            return Teardown::NoSession;
        }

        self.set_state(SessionState::TearingDown);
        let Some(session) = self.session.take() else {
            self.set_state(SessionState::Closed);
            return Teardown::NoSession;
        };

        let id = session.id;
        let ran_for = session.started_at.elapsed();
        let cleanup_errors = session.release();
        self.set_state(SessionState::Closed);

        info!(
            "Session torn down: id={}, ran_for={:?}, cleanup_errors={}",
            id,
            ran_for,
            cleanup_errors.len()
        );

        Teardown::Completed {
            session: id,
            cleanup_errors,
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn start(command: &CommandLine) -> Result<Child> {
    Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::SpawnFailed {
            command: command.program.display().to_string(),
            reason: e.to_string(),
        })
}

/// Wait for the process to end, drain its streams, then report the exit once.
async fn watch_exit(
    session: SessionId,
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    drains: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedSender<PreviewEvent>,
    kill_grace: Duration,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        // Fires on an explicit request and when the handle is dropped
        _ = kill_rx => terminate(&mut child, kill_grace).await,
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!("Failed to wait for renderer: session={}, {}", session, e);
            None
        }
    };

    for drain in drains {
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            debug!("Stream drain timed out: session={}", session);
        }
    }

    debug!("Renderer exited: session={}, code={:?}", session, code);
    let _ = events.send(PreviewEvent::ProcessExited { session, code });
}

/// Terminate gracefully where the platform allows it, then force.
async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: `pid` is our child and has not been reaped yet, since
            // `child.id()` returns None once the status has been collected.
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if rc == 0 {
                if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                    return status;
                }
                debug!("Renderer ignored SIGTERM for {:?}, killing", grace);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = grace;

    child.start_kill()?;
    child.wait().await
}
