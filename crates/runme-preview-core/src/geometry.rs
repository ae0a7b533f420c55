//! Geometry types for the floating preview panel.

use serde::{Deserialize, Serialize};

use crate::PreviewConfig;

/// Size of the host screen in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenSize {
    /// Number of columns
    pub cols: u16,
    /// Number of rows
    pub rows: u16,
}

impl ScreenSize {
    /// Create a new screen size.
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Placement of the floating panel on the host screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanelGeometry {
    /// Width in columns
    pub width: u16,
    /// Height in rows
    pub height: u16,
    /// Top row (0-based)
    pub row: u16,
    /// Left column (0-based)
    pub col: u16,
}

impl PanelGeometry {
    /// Create a new geometry.
    pub fn new(width: u16, height: u16, row: u16, col: u16) -> Self {
        Self {
            width,
            height,
            row,
            col,
        }
    }

    /// Compute a centered panel for `screen`.
    ///
    /// Width and height are the configured ratio of the screen, clamped to the
    /// configured absolute maximum when that is smaller. Never smaller than 1x1.
    pub fn centered(screen: ScreenSize, config: &PreviewConfig) -> Self {
        let width = scaled(screen.cols, config.width_ratio).min(config.width).max(1);
        let height = scaled(screen.rows, config.height_ratio)
            .min(config.height)
            .max(1);

        Self {
            width,
            height,
            row: screen.rows.saturating_sub(height) / 2,
            col: screen.cols.saturating_sub(width) / 2,
        }
    }
}

fn scaled(total: u16, ratio: f32) -> u16 {
    (f32::from(total) * ratio).floor() as u16
}
