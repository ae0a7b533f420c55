//! Events consumed by the previewer's event loop.

use std::path::PathBuf;

use runme_preview_core::{Result, SessionId, SurfaceId};
use runme_preview_relay::RelayEvent;

use crate::dispatcher::Invocation;

/// Everything that can happen to the previewer asynchronously.
///
/// Producers (stream readers, the exit watcher, the installer task and the
/// host's key bindings) only send events. All state changes happen when the
/// loop handles them, one at a time.
#[derive(Debug)]
pub enum PreviewEvent {
    /// Output or a read failure on one of the renderer's streams
    Relay(RelayEvent),
    /// The renderer terminated and its streams were drained
    ProcessExited {
        /// Session the process belonged to
        session: SessionId,
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },
    /// The user pressed a close key on a panel
    CloseRequested {
        /// Panel the key was pressed on
        surface: SurfaceId,
    },
    /// A background install finished
    InstallFinished {
        /// The invocation that triggered the install
        invocation: Invocation,
        /// Path of the installed binary
        result: Result<PathBuf>,
    },
    /// The host is shutting down
    Shutdown,
}

impl From<RelayEvent> for PreviewEvent {
    fn from(event: RelayEvent) -> Self {
        PreviewEvent::Relay(event)
    }
}
