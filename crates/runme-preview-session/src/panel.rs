//! The floating panel showing renderer output.

use tracing::{debug, info, warn};

use runme_preview_core::{PanelGeometry, PreviewConfig, Result, SurfaceId};
use runme_preview_relay::{OutputSink, PtyRelay};

use crate::host::{EditorHost, NotifyLevel};

/// Keys bound to the close action on every panel.
pub const CLOSE_KEYS: [&str; 2] = ["q", "<Esc>"];

/// Owner of the display surface and its open/closed state.
#[derive(Debug, Default)]
pub struct PanelController {
    surface: Option<SurfaceId>,
    geometry: Option<PanelGeometry>,
}

impl PanelController {
    /// Create a controller with no panel open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a centered panel and bind the close keys on it.
    ///
    /// A panel that is still open is closed first.
    pub fn open(&mut self, host: &mut dyn EditorHost, config: &PreviewConfig) -> Result<SurfaceId> {
        self.close(host)?;

        let geometry = PanelGeometry::centered(host.screen_size(), config);
        let surface = host.create_surface(geometry, &config.border)?;

        if let Err(e) = host.bind_close_keys(surface, &CLOSE_KEYS) {
            if let Err(close) = host.close_surface(surface) {
                warn!("Failed to close {} after key binding failed: {}", surface, close);
            }
            return Err(e);
        }

        info!(
            "Panel opened: {} {}x{} at ({}, {})",
            surface, geometry.width, geometry.height, geometry.row, geometry.col
        );
        self.surface = Some(surface);
        self.geometry = Some(geometry);
        Ok(surface)
    }

    /// Destroy the panel if one is open. Returns whether one was.
    pub fn close(&mut self, host: &mut dyn EditorHost) -> Result<bool> {
        let Some(surface) = self.surface.take() else {
            return Ok(false);
        };
        self.geometry = None;

        debug!("Closing panel: {}", surface);
        host.close_surface(surface)?;
        Ok(true)
    }

    /// Whether a panel is open.
    pub fn is_open(&self) -> bool {
        self.surface.is_some()
    }

    /// The open panel's surface.
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    /// The open panel's geometry.
    pub fn geometry(&self) -> Option<PanelGeometry> {
        self.geometry
    }

    /// Whether the host's focus is on the open panel.
    pub fn is_focused(&self, host: &dyn EditorHost) -> bool {
        self.surface.is_some() && host.focused_surface() == self.surface
    }

    /// Output sink writing into the open panel.
    pub fn sink<'a>(&self, host: &'a mut dyn EditorHost) -> Option<PanelSink<'a>> {
        self.surface.map(|surface| PanelSink { host, surface })
    }
}

/// [`OutputSink`] feeding a panel's terminal channel.
///
/// Lines go to the panel; stream errors go to the host's notifications.
pub struct PanelSink<'a> {
    host: &'a mut dyn EditorHost,
    surface: SurfaceId,
}

impl PanelSink<'_> {
    /// Forward a raw chunk, normalizing line endings.
    pub fn forward(&mut self, chunk: &[u8]) -> usize {
        PtyRelay::forward(chunk, self)
    }
}

impl OutputSink for PanelSink<'_> {
    fn write_line(&mut self, line: &[u8]) {
        self.host.send(self.surface, line);
    }

    fn write_error(&mut self, message: &str) {
        self.host.notify(NotifyLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;
    use runme_preview_core::{Error, ScreenSize};

    #[test]
    fn test_open_centers_and_binds_keys() {
        let mut host = MockHost::new();
        host.screen = ScreenSize::new(100, 50);
        let mut panel = PanelController::new();

        let surface = panel.open(&mut host, &PreviewConfig::default()).unwrap();

        assert!(panel.is_open());
        assert_eq!(panel.geometry(), Some(PanelGeometry::new(70, 35, 7, 15)));
        let mock = host.surface(surface).unwrap();
        assert_eq!(mock.keys, vec!["q".to_string(), "<Esc>".to_string()]);
        assert_eq!(mock.border, "shadow");
        assert!(panel.is_focused(&host));
    }

    #[test]
    fn test_close_is_noop_when_closed() {
        let mut host = MockHost::new();
        let mut panel = PanelController::new();

        assert!(!panel.close(&mut host).unwrap());

        let surface = panel.open(&mut host, &PreviewConfig::default()).unwrap();
        assert!(panel.close(&mut host).unwrap());
        assert!(!panel.close(&mut host).unwrap());
        assert_eq!(host.closed, vec![surface]);
    }

    #[test]
    fn test_focus_elsewhere() {
        let mut host = MockHost::new();
        let mut panel = PanelController::new();
        panel.open(&mut host, &PreviewConfig::default()).unwrap();

        host.focused = None;
        assert!(!panel.is_focused(&host));
    }

    #[test]
    fn test_sink_writes_lines_to_surface() {
        let mut host = MockHost::new();
        let mut panel = PanelController::new();
        let surface = panel.open(&mut host, &PreviewConfig::default()).unwrap();

        let mut sink = panel.sink(&mut host).unwrap();
        assert_eq!(sink.forward(b"# Title\nbody"), 2);

        let mock = host.surface(surface).unwrap();
        assert_eq!(mock.writes, vec![b"# Title\r\n".to_vec(), b"body\r\n".to_vec()]);
        assert_eq!(mock.screen.contents(), "# Title\nbody");
    }

    #[test]
    fn test_sink_passes_bytes_undecoded() {
        let mut host = MockHost::new();
        let mut panel = PanelController::new();
        let surface = panel.open(&mut host, &PreviewConfig::default()).unwrap();

        let mut sink = panel.sink(&mut host).unwrap();
        sink.forward("┌─┐\n".as_bytes());
        sink.forward(b"\xe2\x94");

        let mock = host.surface(surface).unwrap();
        assert_eq!(mock.writes[0], "┌─┐\r\n".as_bytes());
        assert_eq!(mock.writes[1], b"\xe2\x94\r\n");
        assert!(mock.screen.contents().starts_with("┌─┐"));
    }

    #[test]
    fn test_failed_key_binding_closes_surface() {
        let mut host = MockHost::new();
        host.fail_bind = true;
        let mut panel = PanelController::new();

        assert!(panel.open(&mut host, &PreviewConfig::default()).is_err());
        assert!(!panel.is_open());
        assert_eq!(host.closed.len(), 1);
    }

    #[test]
    fn test_failed_key_binding_reports_bind_error_when_close_fails() {
        let mut host = MockHost::new();
        host.fail_bind = true;
        host.fail_close = true;
        let mut panel = PanelController::new();

        let result = panel.open(&mut host, &PreviewConfig::default());

        assert!(matches!(result, Err(Error::Surface(message)) if message == "bind failed"));
        assert!(!panel.is_open());
        assert!(host.closed.is_empty());
    }
}
