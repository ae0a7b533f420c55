//! [`EditorHost`] backed by the terminal the binary runs in.
//!
//! The panel is drawn on the alternate screen with absolute cursor
//! positioning. Output sent to it is fed through a [`TerminalScreen`] sized
//! to the panel's content area and the visible lines are redrawn after each
//! write. While the panel is open the tty is in raw mode and a reader thread
//! turns close keys into [`PreviewEvent::CloseRequested`].

use std::io::{self, Write};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use runme_preview_core::{Error, PanelGeometry, Result, ScreenSize, SurfaceId};
use runme_preview_relay::TerminalScreen;
use runme_preview_session::{EditorHost, HostVersion, NotifyLevel, PreviewEvent};

/// Editor API level this host implements.
pub const HOST_VERSION: HostVersion = HostVersion::new(0, 10, 0);

const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;

/// Panel border styles, by host name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// No border
    None,
    /// Thin box
    Single,
    /// Double-line box
    Double,
    /// Thin box with rounded corners
    Rounded,
    /// Blank cells around the content
    Solid,
    /// Shade on the right and bottom edges
    Shadow,
}

impl Border {
    /// Parse a border name; unknown names draw a single box.
    pub fn parse(name: &str) -> Self {
        match name {
            "none" => Border::None,
            "single" => Border::Single,
            "double" => Border::Double,
            "rounded" => Border::Rounded,
            "solid" => Border::Solid,
            "shadow" => Border::Shadow,
            other => {
                warn!("Unknown border style '{}', using single", other);
                Border::Single
            }
        }
    }

    /// Cells taken on each side: (top, right, bottom, left).
    fn insets(self) -> (u16, u16, u16, u16) {
        match self {
            Border::None => (0, 0, 0, 0),
            Border::Shadow => (0, 1, 1, 0),
            _ => (1, 1, 1, 1),
        }
    }

    /// Box glyphs: top-left, top-right, bottom-right, bottom-left, horizontal, vertical.
    fn glyphs(self) -> [char; 6] {
        match self {
            Border::Single => ['┌', '┐', '┘', '└', '─', '│'],
            Border::Double => ['╔', '╗', '╝', '╚', '═', '║'],
            Border::Rounded => ['╭', '╮', '╯', '╰', '─', '│'],
            Border::Shadow => ['░'; 6],
            Border::Solid | Border::None => [' '; 6],
        }
    }
}

/// Layout of a panel on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelLayout {
    /// Outer geometry, border included
    pub outer: PanelGeometry,
    /// Content area
    pub inner: PanelGeometry,
    /// Border drawn around the content
    pub border: Border,
}

impl PanelLayout {
    /// Fit `border` inside `outer`. Panels too small for a border get none.
    pub fn new(outer: PanelGeometry, border: Border) -> Self {
        let border = if outer.width < 3 || outer.height < 3 {
            Border::None
        } else {
            border
        };
        let (top, right, bottom, left) = border.insets();
        let inner = PanelGeometry::new(
            outer.width - left - right,
            outer.height - top - bottom,
            outer.row + top,
            outer.col + left,
        );
        Self {
            outer,
            inner,
            border,
        }
    }

    /// Border segments as (row, col, text), zero-based.
    pub fn frame(&self) -> Vec<(u16, u16, String)> {
        let PanelGeometry {
            width,
            height,
            row,
            col,
        } = self.outer;
        let [tl, tr, br, bl, h, v] = self.border.glyphs();
        let span = |c: char, n: u16| std::iter::repeat(c).take(usize::from(n)).collect::<String>();

        match self.border {
            Border::None => Vec::new(),
            Border::Shadow => {
                let mut segments: Vec<_> = (row + 1..row + height)
                    .map(|r| (r, col + width - 1, v.to_string()))
                    .collect();
                segments.push((row + height - 1, col + 1, span(h, width - 1)));
                segments
            }
            _ => {
                let mut segments = vec![(row, col, format!("{tl}{}{tr}", span(h, width - 2)))];
                for r in row + 1..row + height - 1 {
                    segments.push((r, col, v.to_string()));
                    segments.push((r, col + width - 1, v.to_string()));
                }
                segments.push((
                    row + height - 1,
                    col,
                    format!("{bl}{}{br}", span(h, width - 2)),
                ));
                segments
            }
        }
    }
}

/// Whether a read from the tty is one of the close keys.
///
/// An escape byte only counts when it arrives alone, so escape sequences
/// (arrow keys and the like) do not close the panel.
pub fn is_close_input(input: &[u8], keys: &[u8]) -> bool {
    if input == [ESC] {
        return keys.contains(&ESC);
    }
    input
        .iter()
        .any(|b| *b == CTRL_C || (*b != ESC && keys.contains(b)))
}

/// Byte produced by a key name such as `q` or `<Esc>`.
fn key_byte(name: &str) -> Option<u8> {
    match name {
        "<Esc>" => Some(ESC),
        "<C-c>" => Some(CTRL_C),
        _ if name.len() == 1 && name.is_ascii() => name.bytes().next(),
        _ => None,
    }
}

struct Panel {
    id: SurfaceId,
    layout: PanelLayout,
    screen: TerminalScreen,
    #[cfg(unix)]
    raw: Option<unix::RawMode>,
}

/// Terminal-backed host.
pub struct TerminalHost<W: Write> {
    out: W,
    buffer: Vec<String>,
    screen: Option<ScreenSize>,
    panel: Option<Panel>,
    next_surface: u64,
    pending: Vec<(NotifyLevel, String)>,
    events: Option<mpsc::UnboundedSender<PreviewEvent>>,
}

impl TerminalHost<io::Stdout> {
    /// Host drawing on stdout, with `buffer` as the current markdown buffer.
    pub fn stdout(buffer: Vec<String>) -> Self {
        Self::new(io::stdout(), buffer)
    }
}

impl<W: Write> TerminalHost<W> {
    /// Host drawing on `out`.
    pub fn new(out: W, buffer: Vec<String>) -> Self {
        Self {
            out,
            buffer,
            screen: None,
            panel: None,
            next_surface: 1,
            pending: Vec::new(),
            events: None,
        }
    }

    /// Use a fixed screen size instead of querying the terminal.
    pub fn with_screen_size(mut self, screen: ScreenSize) -> Self {
        self.screen = Some(screen);
        self
    }

    /// Channel receiving close requests from key presses.
    pub fn set_events(&mut self, events: mpsc::UnboundedSender<PreviewEvent>) {
        self.events = Some(events);
    }

    /// The drawing target.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Rendered content of the open panel.
    pub fn panel_contents(&self) -> Option<String> {
        self.panel.as_ref().map(|panel| panel.screen.contents())
    }

    fn redraw(&mut self) -> io::Result<()> {
        let Some(panel) = &self.panel else {
            return Ok(());
        };
        let inner = panel.layout.inner;
        let width = usize::from(inner.width);
        let mut lines = panel.screen.visible_lines().into_iter();

        for offset in 0..inner.height {
            let line: String = lines.next().unwrap_or_default().chars().take(width).collect();
            let pad = width.saturating_sub(line.chars().count());
            write!(
                self.out,
                "\x1b[{};{}H{}{}",
                inner.row + offset + 1,
                inner.col + 1,
                line,
                " ".repeat(pad)
            )?;
        }
        self.out.flush()
    }

    fn draw_frame(&mut self, layout: &PanelLayout) -> io::Result<()> {
        write!(self.out, "\x1b[?1049h\x1b[?25l\x1b[2J")?;
        for (row, col, text) in layout.frame() {
            write!(self.out, "\x1b[{};{}H{}", row + 1, col + 1, text)?;
        }
        self.out.flush()
    }

    fn restore(&mut self) -> io::Result<()> {
        write!(self.out, "\x1b[?25h\x1b[?1049l")?;
        self.out.flush()
    }

    fn flush_notifications(&mut self) {
        for (level, message) in self.pending.drain(..) {
            print_notification(level, &message);
        }
    }
}

fn print_notification(level: NotifyLevel, message: &str) {
    let level = match level {
        NotifyLevel::Info => "info",
        NotifyLevel::Warn => "warning",
        NotifyLevel::Error => "error",
    };
    eprintln!("runme-preview: {level}: {message}");
}

impl<W: Write> EditorHost for TerminalHost<W> {
    fn version(&self) -> HostVersion {
        HOST_VERSION
    }

    fn screen_size(&self) -> ScreenSize {
        self.screen.unwrap_or_else(detect_screen_size)
    }

    fn current_filetype(&self) -> String {
        "markdown".to_string()
    }

    fn current_lines(&self) -> Vec<String> {
        self.buffer.clone()
    }

    fn focused_surface(&self) -> Option<SurfaceId> {
        self.panel.as_ref().map(|panel| panel.id)
    }

    fn create_surface(&mut self, geometry: PanelGeometry, border: &str) -> Result<SurfaceId> {
        if let Some(panel) = &self.panel {
            return Err(Error::Surface(format!("{} is still open", panel.id)));
        }

        let layout = PanelLayout::new(geometry, Border::parse(border));
        self.draw_frame(&layout)?;

        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        debug!("Created {} with layout {:?}", id, layout);
        self.panel = Some(Panel {
            id,
            layout,
            screen: TerminalScreen::new(layout.inner.width, layout.inner.height),
            #[cfg(unix)]
            raw: None,
        });
        Ok(id)
    }

    fn bind_close_keys(&mut self, surface: SurfaceId, keys: &[&str]) -> Result<()> {
        let bytes: Vec<u8> = keys
            .iter()
            .filter_map(|name| {
                let byte = key_byte(name);
                if byte.is_none() {
                    warn!("Cannot bind key '{}'", name);
                }
                byte
            })
            .collect();

        let Some(events) = self.events.clone() else {
            debug!("No event channel, close keys on {} are inactive", surface);
            return Ok(());
        };

        #[cfg(unix)]
        {
            let panel = self
                .panel
                .as_mut()
                .filter(|panel| panel.id == surface)
                .ok_or_else(|| Error::Surface(format!("no such surface: {surface}")))?;
            panel.raw = Some(unix::listen_for_keys(surface, bytes, events)?);
        }
        #[cfg(not(unix))]
        {
            let _ = (bytes, events);
            debug!("Key reading unsupported here, use Ctrl-C to close {}", surface);
        }

        Ok(())
    }

    fn send(&mut self, surface: SurfaceId, bytes: &[u8]) {
        match self.panel.as_mut() {
            Some(panel) if panel.id == surface => panel.screen.process(bytes),
            _ => {
                debug!("Dropping output for closed {}", surface);
                return;
            }
        }
        if let Err(e) = self.redraw() {
            warn!("Failed to draw panel: {}", e);
        }
    }

    fn close_surface(&mut self, surface: SurfaceId) -> Result<()> {
        let panel = match self.panel.take() {
            Some(panel) if panel.id == surface => panel,
            other => {
                self.panel = other;
                return Err(Error::Surface(format!("no such surface: {surface}")));
            }
        };

        // Leave raw mode before the normal screen comes back
        #[cfg(unix)]
        drop(panel.raw);
        #[cfg(not(unix))]
        drop(panel);
        self.restore()?;
        self.flush_notifications();
        debug!("Closed {}", surface);
        Ok(())
    }

    fn notify(&mut self, level: NotifyLevel, message: &str) {
        if self.panel.is_some() {
            self.pending.push((level, message.to_string()));
        } else {
            print_notification(level, message);
        }
    }
}

impl<W: Write> Drop for TerminalHost<W> {
    fn drop(&mut self) {
        if self.panel.take().is_some() {
            let _ = self.restore();
        }
        self.flush_notifications();
    }
}

fn detect_screen_size() -> ScreenSize {
    #[cfg(unix)]
    if let Some(size) = unix::terminal_size() {
        return size;
    }

    let from_env = |name: &str| std::env::var(name).ok().and_then(|v| v.parse::<u16>().ok());
    match (from_env("COLUMNS"), from_env("LINES")) {
        (Some(cols), Some(rows)) if cols > 0 && rows > 0 => ScreenSize::new(cols, rows),
        _ => ScreenSize::default(),
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::File;
    use std::io::{self, Read};
    use std::os::unix::io::AsRawFd;

    use tokio::sync::mpsc;
    use tracing::{debug, warn};

    use runme_preview_core::{Error, Result, ScreenSize, SurfaceId};
    use runme_preview_session::PreviewEvent;

    use super::is_close_input;

    pub(super) fn terminal_size() -> Option<ScreenSize> {
        let mut size = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        // SAFETY: TIOCGWINSZ only writes a winsize into `size`
        let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut size) };
        (rc == 0 && size.ws_col > 0 && size.ws_row > 0)
            .then(|| ScreenSize::new(size.ws_col, size.ws_row))
    }

    /// Raw tty mode, restored on drop.
    pub(super) struct RawMode {
        tty: File,
        original: libc::termios,
    }

    impl RawMode {
        fn enable(tty: &File) -> io::Result<Self> {
            let fd = tty.as_raw_fd();
            let mut original = std::mem::MaybeUninit::<libc::termios>::uninit();
            // SAFETY: `fd` is open; tcgetattr fills `original` when it returns 0
            if unsafe { libc::tcgetattr(fd, original.as_mut_ptr()) } != 0 {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: initialized by the successful tcgetattr above
            let original = unsafe { original.assume_init() };

            let mut raw = original;
            // SAFETY: `raw` is a valid termios
            unsafe { libc::cfmakeraw(&mut raw) };
            // SAFETY: `fd` is open and `raw` is a valid termios
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
                return Err(io::Error::last_os_error());
            }

            Ok(Self {
                tty: tty.try_clone()?,
                original,
            })
        }
    }

    impl Drop for RawMode {
        fn drop(&mut self) {
            // SAFETY: the fd stays open while `self.tty` lives
            unsafe { libc::tcsetattr(self.tty.as_raw_fd(), libc::TCSANOW, &self.original) };
        }
    }

    /// Put the tty in raw mode and report close keys for `surface`.
    pub(super) fn listen_for_keys(
        surface: SurfaceId,
        keys: Vec<u8>,
        events: mpsc::UnboundedSender<PreviewEvent>,
    ) -> Result<RawMode> {
        let surface_error = |e: io::Error| Error::Surface(format!("cannot read keys: {e}"));

        let tty = File::options()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .map_err(surface_error)?;
        let raw = RawMode::enable(&tty).map_err(surface_error)?;

        let mut reader = tty;
        std::thread::Builder::new()
            .name("runme-preview-keys".to_string())
            .spawn(move || {
                let mut buffer = [0u8; 64];
                loop {
                    match reader.read(&mut buffer) {
                        Ok(0) => break,
                        Ok(n) if is_close_input(&buffer[..n], &keys) => {
                            debug!("Close key pressed on {}", surface);
                            let _ = events.send(PreviewEvent::CloseRequested { surface });
                            break;
                        }
                        Ok(_) => {}
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            warn!("Failed to read keys: {}", e);
                            break;
                        }
                    }
                }
            })
            .map_err(surface_error)?;

        Ok(raw)
    }
}
