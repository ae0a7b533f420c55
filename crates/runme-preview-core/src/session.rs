//! Session identity and lifecycle types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one preview run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the supervised session.
///
/// Teardown moves `Spawning` or `Running` through `TearingDown` to `Closed`
/// and does nothing from `Idle` or `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session has been started yet
    Idle,
    /// A session record exists but the process is not running yet
    Spawning,
    /// The renderer is running and its output is being relayed
    Running,
    /// Resources are being released
    TearingDown,
    /// The last session has been torn down
    Closed,
}

impl SessionState {
    /// Whether a session record exists that teardown must release.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Spawning | SessionState::Running)
    }

    /// Whether a new session may be spawned from this state.
    pub fn can_spawn(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Closed)
    }
}

/// One of the child's two output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// Host-assigned identifier of a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}
