//! # runme-preview-relay
//!
//! Output relay and terminal emulation for runme-preview.
//!
//! This crate provides:
//! - Asynchronous readers for the renderer's stdout and stderr
//! - Line-ending normalization of relayed output
//! - A VTE-backed screen model hosts use as a panel's terminal channel
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on runme-preview-core
//! and is used by runme-preview-session to move process output to a panel.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod relay;
pub mod screen;

// Re-export commonly used types
pub use relay::{normalize_lines, OutputSink, PtyRelay, RelayEvent, Subscription};
pub use screen::TerminalScreen;
