//! # runme-preview-session
//!
//! Session management for runme-preview.
//!
//! This crate provides:
//! - The process supervisor owning the single renderer session
//! - The panel controller owning the floating display surface
//! - Invocation validation, buffer snapshots and command construction
//! - The [`Previewer`] event loop tying them together
//! - The [`EditorHost`] and [`Installer`] seams, with in-memory
//!   implementations in [`testing`]
//!
//! ## Architecture
//!
//! This is Layer 2 in the architecture - it depends on runme-preview-core
//! and runme-preview-relay, and is driven by the runme-preview binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod event;
pub mod executable;
pub mod host;
pub mod install;
pub mod panel;
pub mod runtime;
pub mod snapshot;
pub mod supervisor;
pub mod testing;

// Re-export commonly used types
pub use dispatcher::{DispatchOutcome, Invocation, Target};
pub use event::PreviewEvent;
pub use executable::find_executable;
pub use host::{EditorHost, HostVersion, NotifyLevel};
pub use install::{InstallRequest, Installer};
pub use panel::{PanelController, PanelSink};
pub use runtime::Previewer;
pub use snapshot::{tmp_file, SnapshotFile};
pub use supervisor::{CommandLine, Session, Supervisor, Teardown};
