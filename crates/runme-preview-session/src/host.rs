//! The editor surface consumed by the previewer.

use runme_preview_core::{PanelGeometry, Result, ScreenSize, SurfaceId};

/// Version of the host editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl HostVersion {
    /// Create a new version.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string such as `0.9.5` or `NVIM v0.10.0-dev`.
    ///
    /// Missing minor or patch components default to zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use runme_preview_session::host::HostVersion;
    ///
    /// assert_eq!(HostVersion::parse("NVIM v0.9.5"), Some(HostVersion::new(0, 9, 5)));
    /// assert_eq!(HostVersion::parse("1.2"), Some(HostVersion::new(1, 2, 0)));
    /// assert_eq!(HostVersion::parse("unknown"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let start = text.find(|c: char| c.is_ascii_digit())?;
        let mut parts = text[start..].split('.').map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse::<u32>()
                .ok()
        });

        let major = parts.next()??;
        let minor = parts.next().flatten().unwrap_or(0);
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl std::fmt::Display for HostVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    /// Progress or success
    Info,
    /// Something the user should look at
    Warn,
    /// An invocation failed
    Error,
}

/// Editor APIs the previewer drives.
///
/// Every call happens on the event-loop task. Close keys bound with
/// [`EditorHost::bind_close_keys`] are reported back by the host as
/// [`crate::PreviewEvent::CloseRequested`].
pub trait EditorHost {
    /// Version of the running editor.
    fn version(&self) -> HostVersion;

    /// Total screen size in cells.
    fn screen_size(&self) -> ScreenSize;

    /// Filetype of the current buffer.
    fn current_filetype(&self) -> String;

    /// Lines of the current buffer.
    fn current_lines(&self) -> Vec<String>;

    /// Surface holding focus, if the focus is on one of ours.
    fn focused_surface(&self) -> Option<SurfaceId>;

    /// Create a floating surface with a terminal channel and focus it.
    fn create_surface(&mut self, geometry: PanelGeometry, border: &str) -> Result<SurfaceId>;

    /// Bind `keys` on `surface` to the close action.
    fn bind_close_keys(&mut self, surface: SurfaceId, keys: &[&str]) -> Result<()>;

    /// Send output bytes into the surface's terminal channel.
    ///
    /// Bytes are passed through undecoded; the channel's terminal emulation
    /// decodes them.
    fn send(&mut self, surface: SurfaceId, bytes: &[u8]);

    /// Destroy a surface.
    fn close_surface(&mut self, surface: SurfaceId) -> Result<()>;

    /// Show a non-modal notification.
    fn notify(&mut self, level: NotifyLevel, message: &str);
}
