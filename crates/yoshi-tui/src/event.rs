use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Terminal events
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal tick
    Tick,
    /// Key press event
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
}

/// What a key press asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Move the list cursor up.
    Up,
    /// Move the list cursor down.
    Down,
    /// Pick the highlighted source.
    Select,
    /// Scroll the log pane back.
    PageUp,
    /// Scroll the log pane forward.
    PageDown,
    /// Leave the dashboard.
    Quit,
}

impl Action {
    /// Map a key press to an action.
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Self::Quit),
            KeyCode::Char('q') | KeyCode::Esc => Some(Self::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Self::Up),
            KeyCode::Down | KeyCode::Char('j') => Some(Self::Down),
            KeyCode::Enter => Some(Self::Select),
            KeyCode::PageUp => Some(Self::PageUp),
            KeyCode::PageDown => Some(Self::PageDown),
            _ => None,
        }
    }
}

/// Event handler for async event processing
#[derive(Debug)]
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    _tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Start reading terminal events with the specified tick rate
    #[must_use]
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _tx = tx.clone();

        tokio::spawn(async move {
            let mut reader = crossterm::event::EventStream::new();
            let mut tick = tokio::time::interval(tick_rate);

            loop {
                let tick_delay = tick.tick();
                let crossterm_event = reader.next();

                tokio::select! {
                    _ = tick_delay => {
                        if tx.send(Event::Tick).is_err() {
                            break;
                        }
                    }
                    Some(Ok(evt)) = crossterm_event => {
                        let event = match evt {
                            CrosstermEvent::Key(key) => Event::Key(key),
                            CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
                            _ => continue,
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { rx, _tx }
    }

    /// Build a handler fed by the caller instead of the terminal.
    #[must_use]
    pub fn from_channel(rx: mpsc::UnboundedReceiver<Event>, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { rx, _tx: tx }
    }

    /// Receive the next event
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("Event channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Action::from_key(press(KeyCode::Char('j'))), Some(Action::Down));
        assert_eq!(Action::from_key(press(KeyCode::Up)), Some(Action::Up));
        assert_eq!(Action::from_key(press(KeyCode::Enter)), Some(Action::Select));
        assert_eq!(Action::from_key(press(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            Action::from_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(Action::from_key(press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_release_is_ignored() {
        let mut key = press(KeyCode::Enter);
        key.kind = KeyEventKind::Release;
        assert_eq!(Action::from_key(key), None);
    }

    #[tokio::test]
    async fn test_channel_handler() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut handler = EventHandler::from_channel(rx, tx.clone());
        tx.send(Event::Resize(80, 24)).unwrap();
        assert!(matches!(handler.next().await.unwrap(), Event::Resize(80, 24)));
    }
}
