//! Presentation surfaces the session draws on.
//!
//! Only one screen may exist per [`ScreenSlot`]. The terminal surface
//! claims the process-wide slot, so a second dashboard in the same
//! process is refused instead of fighting over the terminal.

use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{CrosstermBackend, TestBackend},
};
use yoshi_core::{Error, Result};

use crate::ui::{self, Dashboard};

/// Rendering capability driven by the session.
pub trait Surface {
    /// Acquire the screen.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] when a screen already exists.
    fn create_screen(&mut self) -> Result<()>;

    /// Draw the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no screen or drawing fails.
    fn render(&mut self, dashboard: &Dashboard) -> Result<()>;

    /// Release the screen. Safe to call more than once.
    fn destroy(&mut self);
}

/// Guard allowing at most one live screen.
#[derive(Debug, Clone, Default)]
pub struct ScreenSlot(Arc<AtomicBool>);

impl ScreenSlot {
    /// A fresh, unclaimed slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot shared by everything drawing on the real terminal.
    pub fn process() -> Self {
        static PROCESS: OnceLock<ScreenSlot> = OnceLock::new();
        PROCESS.get_or_init(Self::new).clone()
    }

    /// Whether a screen currently holds this slot.
    pub fn is_claimed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn claim(&self) -> Result<()> {
        if self.0.swap(true, Ordering::SeqCst) {
            return Err(Error::Precondition("a screen already exists".into()));
        }
        Ok(())
    }

    fn release(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The real terminal: raw mode plus the alternate screen.
pub struct TerminalSurface {
    slot: ScreenSlot,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    title: String,
}

impl TerminalSurface {
    /// A surface on stdout, sharing the process-wide screen slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: ScreenSlot::process(),
            terminal: None,
            title: String::new(),
        }
    }

    fn enter() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Terminal::new(CrosstermBackend::new(stdout))
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn create_screen(&mut self) -> Result<()> {
        if self.terminal.is_some() {
            return Err(Error::Precondition("a screen already exists".into()));
        }
        self.slot.claim()?;

        match Self::enter() {
            Ok(mut terminal) => {
                terminal.clear()?;
                self.terminal = Some(terminal);
                Ok(())
            }
            Err(e) => {
                self.slot.release();
                Err(e.into())
            }
        }
    }

    fn render(&mut self, dashboard: &Dashboard) -> Result<()> {
        let terminal = self
            .terminal
            .as_mut()
            .ok_or_else(|| Error::Precondition("no screen to render on".into()))?;

        if self.title != dashboard.title() {
            execute!(terminal.backend_mut(), SetTitle(dashboard.title()))?;
            self.title = dashboard.title().to_string();
        }

        terminal.draw(|frame| ui::render(frame, dashboard))?;
        Ok(())
    }

    fn destroy(&mut self) {
        let Some(mut terminal) = self.terminal.take() else {
            return;
        };

        if let Err(e) = disable_raw_mode() {
            tracing::warn!(error = %e, "failed to leave raw mode");
        }
        if let Err(e) = execute!(terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::warn!(error = %e, "failed to leave the alternate screen");
        }
        if let Err(e) = terminal.show_cursor() {
            tracing::warn!(error = %e, "failed to restore the cursor");
        }
        self.slot.release();
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// In-memory surface backed by ratatui's test backend.
#[derive(Debug)]
pub struct HeadlessSurface {
    width: u16,
    height: u16,
    slot: ScreenSlot,
    terminal: Option<Terminal<TestBackend>>,
    active: bool,
    title: String,
    renders: usize,
    destroys: usize,
}

impl HeadlessSurface {
    /// A surface with its own screen slot.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self::with_slot(width, height, ScreenSlot::new())
    }

    /// A surface competing for `slot` with other surfaces.
    #[must_use]
    pub fn with_slot(width: u16, height: u16, slot: ScreenSlot) -> Self {
        Self {
            width,
            height,
            slot,
            terminal: None,
            active: false,
            title: String::new(),
            renders: 0,
            destroys: 0,
        }
    }

    /// Whether the screen exists.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Last title drawn.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of frames drawn.
    pub const fn render_count(&self) -> usize {
        self.renders
    }

    /// Number of times the screen was torn down.
    pub const fn destroy_count(&self) -> usize {
        self.destroys
    }

    /// The last frame as text, one line per row.
    pub fn buffer_text(&self) -> String {
        let Some(terminal) = &self.terminal else {
            return String::new();
        };

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }
}

impl Surface for HeadlessSurface {
    fn create_screen(&mut self) -> Result<()> {
        if self.active {
            return Err(Error::Precondition("a screen already exists".into()));
        }
        self.slot.claim()?;

        match Terminal::new(TestBackend::new(self.width, self.height)) {
            Ok(terminal) => {
                self.terminal = Some(terminal);
                self.active = true;
                Ok(())
            }
            Err(e) => {
                self.slot.release();
                Err(e.into())
            }
        }
    }

    fn render(&mut self, dashboard: &Dashboard) -> Result<()> {
        let terminal = self
            .terminal
            .as_mut()
            .filter(|_| self.active)
            .ok_or_else(|| Error::Precondition("no screen to render on".into()))?;

        terminal.draw(|frame| ui::render(frame, dashboard))?;
        self.title = dashboard.title().to_string();
        self.renders += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        if !self.active {
            return;
        }
        // The last frame is kept for inspection.
        self.active = false;
        self.destroys += 1;
        self.slot.release();
    }
}
