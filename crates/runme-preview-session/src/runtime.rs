//! The previewer: invocation handling and the event loop.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use runme_preview_core::{Error, PreviewConfig, Result};
use runme_preview_relay::relay::format_stream_error;
use runme_preview_relay::{PtyRelay, RelayEvent};

use crate::dispatcher::{
    build_command, check_host_version, resolve_runme, resolve_target, DispatchOutcome, Invocation,
};
use crate::event::PreviewEvent;
use crate::host::{EditorHost, NotifyLevel};
use crate::install::{InstallRequest, Installer};
use crate::panel::PanelController;
use crate::supervisor::{Supervisor, Teardown};

/// Markdown previewer bound to one editor host.
///
/// All state lives here and is changed only by [`Previewer::invoke`] and
/// [`Previewer::handle_event`], both called from the task that owns the
/// previewer.
pub struct Previewer<H: EditorHost> {
    host: H,
    config: PreviewConfig,
    supervisor: Supervisor,
    panel: PanelController,
    installer: Arc<dyn Installer>,
    events_tx: mpsc::UnboundedSender<PreviewEvent>,
    events_rx: mpsc::UnboundedReceiver<PreviewEvent>,
    runtime_notice_shown: bool,
    installing: bool,
    installed_runme: Option<PathBuf>,
}

impl<H: EditorHost> Previewer<H> {
    /// Create a previewer. Nothing is spawned until the first invocation.
    pub fn new(host: H, config: PreviewConfig, installer: Arc<dyn Installer>) -> Self {
        Self::with_supervisor(host, config, installer, Supervisor::new())
    }

    /// Create a previewer around a preconfigured supervisor.
    pub fn with_supervisor(
        host: H,
        config: PreviewConfig,
        installer: Arc<dyn Installer>,
        supervisor: Supervisor,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            host,
            config,
            supervisor,
            panel: PanelController::new(),
            installer,
            events_tx,
            events_rx,
            runtime_notice_shown: false,
            installing: false,
            installed_runme: None,
        }
    }

    /// Sender for host-originated events (close keys, shutdown).
    pub fn events(&self) -> mpsc::UnboundedSender<PreviewEvent> {
        self.events_tx.clone()
    }

    /// The editor host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the editor host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Active configuration.
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// The process supervisor.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// The panel controller.
    pub fn panel(&self) -> &PanelController {
        &self.panel
    }

    /// Whether a background install is running.
    pub fn is_installing(&self) -> bool {
        self.installing
    }

    /// Whether anything is still open, running or pending.
    pub fn is_active(&self) -> bool {
        self.panel.is_open() || self.supervisor.state().is_live() || self.installing
    }

    /// Handle a user command.
    ///
    /// Failures are reported through the host's notifications and also
    /// returned to the caller.
    pub fn invoke(&mut self, invocation: Invocation) -> Result<DispatchOutcome> {
        debug!("Invocation: {:?}", invocation);
        let result = self.dispatch(invocation);
        match &result {
            Ok(outcome) => debug!("Invocation outcome: {:?}", outcome),
            Err(e) => self.report(e),
        }
        result
    }

    fn dispatch(&mut self, invocation: Invocation) -> Result<DispatchOutcome> {
        check_host_version(self.host.version())?;

        if self.panel.is_focused(&self.host) {
            if invocation.force {
                info!("Forced re-invocation from the panel, closing");
                self.close_preview()?;
                return Ok(DispatchOutcome::Closed);
            }
            debug!("Re-invoked from the focused panel, ignoring");
            return Ok(DispatchOutcome::Ignored);
        }

        if self.installing {
            info!("Install in progress, ignoring invocation");
            return Ok(DispatchOutcome::Installing);
        }

        let target = resolve_target(invocation.file.as_deref(), &self.host)?;

        let runme = resolve_runme(&self.config).or_else(|| self.installed_runme.clone());
        let Some(runme) = runme else {
            // The snapshot, if any, is recreated when the invocation is retried
            drop(target);
            self.start_install(invocation);
            return Ok(DispatchOutcome::Installing);
        };

        if self.panel.is_open() || self.supervisor.state().is_live() {
            debug!("Replacing the open preview");
            self.close_preview()?;
        }

        let (path, snapshot) = target.into_parts();
        let command = build_command(&runme, &self.config, &path);
        let session = self
            .supervisor
            .spawn(&command, path, snapshot, &self.events_tx)?;

        let surface = match self.panel.open(&mut self.host, &self.config) {
            Ok(surface) => surface,
            Err(e) => {
                error!("Failed to open panel: {}", e);
                let teardown = self.supervisor.teardown();
                self.report_teardown(teardown);
                return Err(e);
            }
        };
        self.supervisor.attach_surface(surface);

        Ok(DispatchOutcome::Spawned(session))
    }

    fn start_install(&mut self, invocation: Invocation) {
        let request = InstallRequest::from_config(&self.config);
        info!(
            "runme not found, installing v{} into {}",
            request.version,
            request.install_path.display()
        );
        self.host.notify(
            NotifyLevel::Info,
            &format!("Installing runme v{}...", request.version),
        );

        self.installing = true;
        let installer = Arc::clone(&self.installer);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || installer.install(&request))
                .await
                .unwrap_or_else(|e| Err(Error::InstallFailed(e.to_string())));
            let _ = events.send(PreviewEvent::InstallFinished { invocation, result });
        });
    }

    /// Tear down the session, then close the panel.
    fn close_preview(&mut self) -> Result<()> {
        let teardown = self.supervisor.teardown();
        self.report_teardown(teardown);
        self.panel.close(&mut self.host)?;
        Ok(())
    }

    fn report_teardown(&mut self, teardown: Teardown) {
        if let Teardown::Completed { cleanup_errors, .. } = teardown {
            for e in cleanup_errors {
                self.host.notify(NotifyLevel::Warn, &e.to_string());
            }
        }
    }

    fn report(&mut self, e: &Error) {
        if let Error::UnsupportedRuntime { .. } = e {
            if self.runtime_notice_shown {
                debug!("Suppressing repeated runtime notice");
                return;
            }
            self.runtime_notice_shown = true;
        }
        warn!("Invocation failed: {}", e);
        self.host.notify(NotifyLevel::Error, &e.to_string());
    }

    /// Apply one event.
    pub fn handle_event(&mut self, event: PreviewEvent) {
        match event {
            PreviewEvent::Relay(RelayEvent::ChunkReceived { session, bytes, .. }) => {
                if !self.supervisor.is_current(session) {
                    debug!("Dropping output of stale session {}", session);
                    return;
                }
                if let Some(mut sink) = self.panel.sink(&mut self.host) {
                    sink.forward(&bytes);
                }
            }
            PreviewEvent::Relay(RelayEvent::StreamError {
                session,
                stream,
                message,
            }) => {
                if !self.supervisor.is_current(session) {
                    return;
                }
                if let Some(mut sink) = self.panel.sink(&mut self.host) {
                    PtyRelay::report_error(stream, &message, &mut sink);
                    return;
                }
                self.host
                    .notify(NotifyLevel::Error, &format_stream_error(stream, &message));
            }
            PreviewEvent::ProcessExited { session, code } => {
                if !self.supervisor.is_current(session) {
                    debug!("Ignoring exit of stale session {}", session);
                    return;
                }
                match code {
                    Some(0) => info!("Renderer finished: session={}", session),
                    _ => warn!("Renderer exited: session={}, code={:?}", session, code),
                }
                let teardown = self.supervisor.teardown();
                self.report_teardown(teardown);
            }
            PreviewEvent::CloseRequested { surface } => {
                if self.panel.surface() != Some(surface) {
                    debug!("Close requested for unknown {}", surface);
                    return;
                }
                if let Err(e) = self.close_preview() {
                    self.report(&e);
                }
            }
            PreviewEvent::InstallFinished { invocation, result } => {
                self.installing = false;
                match result {
                    Ok(path) => {
                        info!("runme installed: {}", path.display());
                        self.host.notify(
                            NotifyLevel::Info,
                            &format!("runme installed to {}", path.display()),
                        );
                        self.installed_runme = Some(path);
                        // Outcome and errors are already reported by invoke
                        let _ = self.invoke(invocation);
                    }
                    Err(e) => self.report(&e),
                }
            }
            PreviewEvent::Shutdown => self.shutdown(),
        }
    }

    /// Wait for the next event.
    pub async fn next_event(&mut self) -> Option<PreviewEvent> {
        self.events_rx.recv().await
    }

    /// Process events until nothing is open, running or pending.
    pub async fn run(&mut self) {
        while self.is_active() {
            let Some(event) = self.next_event().await else {
                break;
            };
            self.handle_event(event);
        }
        debug!("Event loop finished");
    }

    /// Release everything: session, panel and any pending install.
    pub fn shutdown(&mut self) {
        info!("Shutting down previewer");
        if let Err(e) = self.close_preview() {
            warn!("Failed to close panel during shutdown: {}", e);
        }
        self.installing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostVersion;
    use crate::testing::{MockHost, MockInstaller};

    fn previewer(host: MockHost) -> Previewer<MockHost> {
        Previewer::new(host, PreviewConfig::default(), Arc::new(MockInstaller::new()))
    }

    #[test]
    fn test_unsupported_runtime_notice_once() {
        let mut host = MockHost::new();
        host.version = HostVersion::new(0, 7, 2);
        let mut previewer = previewer(host);

        for _ in 0..3 {
            let result = previewer.invoke(Invocation::buffer());
            assert!(matches!(result, Err(Error::UnsupportedRuntime { .. })));
        }

        assert_eq!(previewer.host().notifications_at(NotifyLevel::Error).len(), 1);
        assert!(!previewer.is_active());
    }

    #[test]
    fn test_unsupported_file_spawns_nothing() {
        let mut previewer = previewer(MockHost::new());

        let result = previewer.invoke(Invocation::file("notes.txt"));

        assert!(matches!(result, Err(Error::UnsupportedFile(_))));
        assert!(previewer.supervisor().session().is_none());
        assert_eq!(previewer.host().open_surfaces(), 0);
        let errors = previewer.host().notifications_at(NotifyLevel::Error);
        assert_eq!(errors, vec!["Unsupported file: notes.txt"]);
    }

    #[test]
    fn test_empty_buffer_reported() {
        let mut host = MockHost::new();
        host.lines = vec![String::new()];
        let mut previewer = previewer(host);

        let result = previewer.invoke(Invocation::buffer());

        assert!(matches!(result, Err(Error::EmptyBuffer)));
        assert!(!previewer.is_active());
    }

    #[test]
    fn test_close_for_unknown_surface_is_ignored() {
        let mut previewer = previewer(MockHost::new());
        previewer.handle_event(PreviewEvent::CloseRequested {
            surface: runme_preview_core::SurfaceId(42),
        });
        assert!(previewer.host().closed.is_empty());
        assert!(previewer.host().notifications.is_empty());
    }

    #[test]
    fn test_shutdown_without_session() {
        let mut previewer = previewer(MockHost::new());
        previewer.handle_event(PreviewEvent::Shutdown);
        assert!(!previewer.is_active());
    }
}
