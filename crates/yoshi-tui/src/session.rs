//! Session controller.
//!
//! Owns the surface, the dashboard, the selection and the stream manager,
//! and sequences startup, re-selection and shutdown.

use std::sync::Arc;

use crossterm::event::KeyEvent;
use tokio_util::sync::CancellationToken;
use yoshi_core::{
    ContainerBackend, ContainerProbe, Discovery, Error, PodBackend, Result, Selection,
    SessionOptions,
};

use crate::event::{Action, Event, EventHandler};
use crate::stream::{StreamEvent, StreamManager, StreamState, StreamUpdate};
use crate::surface::Surface;
use crate::ui::Dashboard;

/// Title shown before anything was picked.
pub const IDLE_TITLE: &str = "yoshi ~ viewing logs for no container";

const EMPTY_LOG_LABEL: &str = "Logs for ???";
const EMPTY_LOG_CONTENT: &str = "no logs are contained here. :(";
const INFO_LABEL: &str = "Misc. Information";
const PAGE_LINES: usize = 10;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Created, nothing allocated yet.
    #[default]
    New,
    /// Screen created and drawn.
    Running,
    /// Torn down.
    Closed,
}

enum Step {
    Terminal(Event),
    Stream(StreamEvent),
    Shutdown,
    EventsClosed,
}

/// One run of the dashboard, from screen creation to teardown.
pub struct Session<S: Surface> {
    surface: S,
    containers: Arc<dyn ContainerBackend>,
    pods: Option<Arc<dyn PodBackend>>,
    options: SessionOptions,
    probe: ContainerProbe,
    dashboard: Dashboard,
    selection: Selection,
    streams: StreamManager,
    phase: SessionPhase,
}

impl<S: Surface> Session<S> {
    /// Create a session. Nothing is allocated until [`Session::start`].
    ///
    /// `pods` should only be set when Kubernetes support is enabled.
    pub fn new(
        surface: S,
        containers: Arc<dyn ContainerBackend>,
        pods: Option<Arc<dyn PodBackend>>,
        options: SessionOptions,
    ) -> Self {
        let streams = StreamManager::new(Arc::clone(&containers), pods.clone());
        Self {
            surface,
            containers,
            pods,
            options,
            probe: ContainerProbe::default(),
            dashboard: Dashboard::default(),
            selection: Selection::default(),
            streams,
            phase: SessionPhase::New,
        }
    }

    /// Use a custom nested-container probe.
    #[must_use]
    pub fn with_probe(mut self, probe: ContainerProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Create the screen, discover sources and draw the first frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] when running inside a container, when
    /// the session was already started or when a screen already exists.
    /// Container backend failures are returned as-is; the caller should
    /// [`close`](Session::close) the session afterwards.
    pub async fn start(&mut self) -> Result<()> {
        if self.phase != SessionPhase::New {
            return Err(Error::Precondition("session was already started".into()));
        }
        if self.probe.is_nested() {
            return Err(Error::Precondition(
                "yoshi must run on the host, not inside a container".into(),
            ));
        }

        self.surface.create_screen()?;
        self.phase = SessionPhase::Running;

        self.dashboard.set_title(IDLE_TITLE);
        self.dashboard.create_log_pane(EMPTY_LOG_LABEL, EMPTY_LOG_CONTENT);

        let version = self.containers.version().await?;
        self.dashboard.create_info_pane(
            INFO_LABEL,
            &format!(
                "Docker: v{}\nYoshi:  v{}",
                version.api_version,
                env!("CARGO_PKG_VERSION")
            ),
        );

        let discovery = Discovery::new(
            Arc::clone(&self.containers),
            self.pods.clone(),
            self.options.clone(),
        );
        let snapshot = discovery.discover().await?;
        let label = snapshot.list_label();
        self.selection = Selection::new(snapshot.sources);
        self.dashboard.create_list(label, self.selection.items());

        tracing::info!(sources = self.selection.list().len(), "session started");
        self.render()
    }

    /// Like [`Session::start`], but gives up when `shutdown` fires or a quit
    /// key arrives while the backends are still answering.
    ///
    /// Returns `false` when startup was interrupted; the session is closed
    /// in that case and on error.
    ///
    /// # Errors
    ///
    /// Returns whatever [`Session::start`] fails with.
    pub async fn start_interruptible(
        &mut self,
        events: &mut EventHandler,
        shutdown: &CancellationToken,
    ) -> Result<bool> {
        let started = tokio::select! {
            biased;
            result = self.start() => Some(result),
            () = shutdown.cancelled() => None,
            () = wait_for_quit(events) => None,
        };

        match started {
            Some(Ok(())) => Ok(true),
            Some(Err(e)) => {
                self.close().await;
                Err(e)
            }
            None => {
                tracing::info!("startup interrupted");
                self.close().await;
                Ok(false)
            }
        }
    }

    /// Switch the log pane to the source rendered as `display`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSelection`] when nothing renders as `display`;
    /// the session is left untouched in that case.
    pub async fn select(&mut self, display: &str) -> Result<()> {
        let source = match self.selection.resolve(display) {
            Ok(source) => source.clone(),
            Err(e) => {
                let selection = display;
                tracing::warn!(selection, "selection did not match any source");
                return Err(e);
            }
        };

        self.streams.close().await;

        let label = source.label();
        self.selection.activate(source.clone());
        self.dashboard.set_title(format!("viewing logs for {label}"));
        if let Some(log) = self.dashboard.log_mut() {
            log.set_label(format!("Logs for {label}"));
            log.replace("");
        }

        self.streams.open(source).await;
        self.render()
    }

    /// Wait for one stream event and apply it.
    ///
    /// Returns `false` if the stream channel closed.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn process_stream_event(&mut self) -> Result<bool> {
        match self.streams.recv().await {
            Some(event) => {
                self.on_stream_event(event)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn on_stream_event(&mut self, event: StreamEvent) -> Result<()> {
        let Some(update) = self.streams.accept(event) else {
            return Ok(());
        };

        match update {
            StreamUpdate::Opened(source) => {
                tracing::debug!(source = %source.label(), "streaming logs");
                return Ok(());
            }
            StreamUpdate::Bytes(bytes) => {
                if let Some(log) = self.dashboard.log_mut() {
                    log.append(&bytes);
                }
            }
            StreamUpdate::OpenFailed(source, error) => {
                self.selection.clear();
                if let Some(log) = self.dashboard.log_mut() {
                    log.replace(&format!("failed to open logs for {}: {error}", source.label()));
                }
            }
            StreamUpdate::Ended(_, error) => {
                self.selection.clear();
                let note = match error {
                    Some(e) => format!("\n[stream ended: {e}]"),
                    None => "\n[stream ended]".to_string(),
                };
                if let Some(log) = self.dashboard.log_mut() {
                    log.append(note.as_bytes());
                }
            }
        }

        self.render()
    }

    /// Apply a key press. Returns `false` when the session should stop.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let Some(action) = Action::from_key(key) else {
            return Ok(true);
        };

        match action {
            Action::Quit => return Ok(false),
            Action::Up => {
                if let Some(list) = self.dashboard.list_mut() {
                    list.prev();
                }
            }
            Action::Down => {
                if let Some(list) = self.dashboard.list_mut() {
                    list.next();
                }
            }
            Action::PageUp => {
                if let Some(log) = self.dashboard.log_mut() {
                    log.scroll_up(PAGE_LINES);
                }
            }
            Action::PageDown => {
                if let Some(log) = self.dashboard.log_mut() {
                    log.scroll_down(PAGE_LINES);
                }
            }
            Action::Select => {
                let picked = self
                    .dashboard
                    .list()
                    .and_then(|list| list.highlighted_item())
                    .map(str::to_string);
                if let Some(display) = picked {
                    match self.select(&display).await {
                        Ok(()) | Err(Error::UnknownSelection(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                return Ok(true);
            }
        }

        self.render()?;
        Ok(true)
    }

    /// Drive the session until quit, shutdown or the event source closes.
    ///
    /// The session is always closed on return.
    ///
    /// # Errors
    ///
    /// Returns an error if handling an event fails.
    pub async fn run(&mut self, events: &mut EventHandler, shutdown: CancellationToken) -> Result<()> {
        let result = self.event_loop(events, &shutdown).await;
        self.close().await;
        result
    }

    async fn event_loop(&mut self, events: &mut EventHandler, shutdown: &CancellationToken) -> Result<()> {
        loop {
            let step = tokio::select! {
                () = shutdown.cancelled() => Step::Shutdown,
                event = events.next() => event.map_or(Step::EventsClosed, Step::Terminal),
                Some(event) = self.streams.recv() => Step::Stream(event),
            };

            match step {
                Step::Terminal(Event::Key(key)) => {
                    if !self.handle_key(key).await? {
                        tracing::info!("quit requested");
                        return Ok(());
                    }
                }
                Step::Terminal(Event::Resize(..)) => self.render()?,
                Step::Terminal(Event::Tick) => {}
                Step::Stream(event) => self.on_stream_event(event)?,
                Step::Shutdown => {
                    tracing::info!("shutting down session");
                    return Ok(());
                }
                Step::EventsClosed => {
                    tracing::warn!("terminal event source closed");
                    return Ok(());
                }
            }
        }
    }

    /// Tear down the stream and the screen. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }

        self.streams.close().await;
        self.selection.clear();
        self.dashboard.clear();
        self.surface.destroy();
        self.phase = SessionPhase::Closed;

        tracing::info!("session closed");
    }

    fn render(&mut self) -> Result<()> {
        self.surface.render(&self.dashboard)
    }

    /// Lifecycle phase.
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The presentation surface.
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// The dashboard view model.
    pub const fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// The selection model.
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// State of the stream slot.
    pub fn stream_state(&self) -> StreamState {
        self.streams.state()
    }
}

/// Resolves once a quit key is read; other events are discarded.
async fn wait_for_quit(events: &mut EventHandler) {
    while let Ok(event) = events.next().await {
        if matches!(event, Event::Key(key) if Action::from_key(key) == Some(Action::Quit)) {
            return;
        }
    }
    std::future::pending::<()>().await;
}
