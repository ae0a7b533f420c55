//! # runme-preview-core
//!
//! Core types for runme-preview.
//!
//! This crate contains all fundamental types with **no internal dependencies**
//! on other runme-preview crates. It provides:
//!
//! - Error types
//! - Typed configuration with default-then-override merging
//! - Panel geometry
//! - Session identity and lifecycle state
//! - Platform detection and release asset resolution
//!
//! ## Architecture
//!
//! This is Layer 0 in the architecture - all other crates depend on this one,
//! but this crate has no dependencies on other runme-preview crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod platform;
pub mod session;

// Re-export commonly used types
pub use config::{ConfigOverrides, PreviewConfig};
pub use error::{Error, Result};
pub use geometry::{PanelGeometry, ScreenSize};
pub use platform::{Arch, Os, Platform, ReleaseAsset};
pub use session::{SessionId, SessionState, StreamKind, SurfaceId};
