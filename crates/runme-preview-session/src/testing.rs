//! In-memory host and installer for tests.
//!
//! [`MockHost`] records every surface, write and notification so tests can
//! assert on what the previewer did without a real editor. Each surface
//! feeds its writes through a [`TerminalScreen`], as a terminal channel would.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use runme_preview_core::{Error, PanelGeometry, Result, ScreenSize, SurfaceId};
use runme_preview_relay::TerminalScreen;

use crate::host::{EditorHost, HostVersion, NotifyLevel};
use crate::install::{InstallRequest, Installer};

/// A surface created on a [`MockHost`].
#[derive(Debug)]
pub struct MockSurface {
    /// Geometry requested by the panel
    pub geometry: PanelGeometry,
    /// Border style requested by the panel
    pub border: String,
    /// Keys bound to the close action
    pub keys: Vec<String>,
    /// Every write to the terminal channel, in order
    pub writes: Vec<Vec<u8>>,
    /// Rendered terminal content
    pub screen: TerminalScreen,
}

/// Scriptable [`EditorHost`].
#[derive(Debug)]
pub struct MockHost {
    /// Reported editor version
    pub version: HostVersion,
    /// Reported screen size
    pub screen: ScreenSize,
    /// Filetype of the current buffer
    pub filetype: String,
    /// Lines of the current buffer
    pub lines: Vec<String>,
    /// Surface holding focus
    pub focused: Option<SurfaceId>,
    /// Notifications shown, in order
    pub notifications: Vec<(NotifyLevel, String)>,
    /// Surfaces closed, in order
    pub closed: Vec<SurfaceId>,
    /// Make `bind_close_keys` fail
    pub fail_bind: bool,
    /// Make `create_surface` fail
    pub fail_create: bool,
    /// Make `close_surface` fail
    pub fail_close: bool,
    surfaces: HashMap<SurfaceId, MockSurface>,
    next_surface: u64,
}

impl MockHost {
    /// A recent host with a one-line markdown buffer.
    pub fn new() -> Self {
        Self {
            version: HostVersion::new(0, 10, 0),
            screen: ScreenSize::default(),
            filetype: "markdown".to_string(),
            lines: vec!["# Preview".to_string()],
            focused: None,
            notifications: Vec::new(),
            closed: Vec::new(),
            fail_bind: false,
            fail_create: false,
            fail_close: false,
            surfaces: HashMap::new(),
            next_surface: 1,
        }
    }

    /// A surface that is still open.
    pub fn surface(&self, id: SurfaceId) -> Option<&MockSurface> {
        self.surfaces.get(&id)
    }

    /// Number of surfaces still open.
    pub fn open_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Notifications at `level`.
    pub fn notifications_at(&self, level: NotifyLevel) -> Vec<&str> {
        self.notifications
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorHost for MockHost {
    fn version(&self) -> HostVersion {
        self.version
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn current_filetype(&self) -> String {
        self.filetype.clone()
    }

    fn current_lines(&self) -> Vec<String> {
        self.lines.clone()
    }

    fn focused_surface(&self) -> Option<SurfaceId> {
        self.focused
    }

    fn create_surface(&mut self, geometry: PanelGeometry, border: &str) -> Result<SurfaceId> {
        if self.fail_create {
            return Err(Error::Surface("create failed".to_string()));
        }

        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(
            id,
            MockSurface {
                geometry,
                border: border.to_string(),
                keys: Vec::new(),
                writes: Vec::new(),
                screen: TerminalScreen::new(geometry.width, geometry.height),
            },
        );
        self.focused = Some(id);
        Ok(id)
    }

    fn bind_close_keys(&mut self, surface: SurfaceId, keys: &[&str]) -> Result<()> {
        if self.fail_bind {
            return Err(Error::Surface("bind failed".to_string()));
        }

        let surface = self
            .surfaces
            .get_mut(&surface)
            .ok_or_else(|| Error::Surface(format!("no such surface: {surface}")))?;
        surface.keys.extend(keys.iter().map(|k| k.to_string()));
        Ok(())
    }

    fn send(&mut self, surface: SurfaceId, bytes: &[u8]) {
        if let Some(surface) = self.surfaces.get_mut(&surface) {
            surface.screen.process(bytes);
            surface.writes.push(bytes.to_vec());
        }
    }

    fn close_surface(&mut self, surface: SurfaceId) -> Result<()> {
        if self.fail_close {
            return Err(Error::Surface("close failed".to_string()));
        }
        self.surfaces
            .remove(&surface)
            .ok_or_else(|| Error::Surface(format!("no such surface: {surface}")))?;
        if self.focused == Some(surface) {
            self.focused = None;
        }
        self.closed.push(surface);
        Ok(())
    }

    fn notify(&mut self, level: NotifyLevel, message: &str) {
        self.notifications.push((level, message.to_string()));
    }
}

/// [`Installer`] that writes a stand-in runme instead of downloading one.
///
/// The installed script prints its last argument's content, so rendered
/// output equals the markdown source.
#[derive(Debug, Default)]
pub struct MockInstaller {
    calls: AtomicUsize,
    fail: bool,
}

/// Script installed by [`MockInstaller`].
pub const FAKE_RUNME: &str = "#!/bin/sh\nfor last; do :; done\ncat \"$last\"\n";

impl MockInstaller {
    /// An installer that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// An installer that always fails with [`Error::InstallFailed`].
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// How many times `install` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Installer for MockInstaller {
    fn install(&self, request: &InstallRequest) -> Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::InstallFailed("download refused".to_string()));
        }
        write_fake_runme(&request.install_path)
    }
}

/// Write [`FAKE_RUNME`] as `runme` into `dir` and make it executable.
pub fn write_fake_runme(dir: &std::path::Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("runme");
    std::fs::write(&path, FAKE_RUNME)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_clears_focus() {
        let mut host = MockHost::new();
        let id = host
            .create_surface(PanelGeometry::new(10, 5, 0, 0), "none")
            .unwrap();
        assert_eq!(host.focused, Some(id));

        host.close_surface(id).unwrap();
        assert_eq!(host.focused, None);
        assert!(host.close_surface(id).is_err());
    }

    #[test]
    fn test_mock_installer_counts_calls() {
        let dir = tempfile::tempdir().unwrap();
        let installer = MockInstaller::new();
        let request = InstallRequest {
            install_path: dir.path().join("bin"),
            version: "3.12.6".to_string(),
        };

        let path = installer.install(&request).unwrap();
        assert_eq!(path, dir.path().join("bin").join("runme"));
        assert_eq!(installer.calls(), 1);

        let failing = MockInstaller::failing();
        assert!(failing.install(&request).is_err());
        assert_eq!(failing.calls(), 1);
    }
}
