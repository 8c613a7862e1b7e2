//! Dashboard view model: the widgets the layout draws.

use std::collections::VecDeque;

/// Lines kept in a text pane before the oldest are dropped.
pub const MAX_PANE_LINES: usize = 5_000;

/// Selectable list of log sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectList {
    label: String,
    items: Vec<String>,
    highlighted: Option<usize>,
}

impl SelectList {
    /// Create a list with the cursor on the first item.
    pub fn new(label: impl Into<String>, items: Vec<String>) -> Self {
        let highlighted = if items.is_empty() { None } else { Some(0) };
        Self {
            label: label.into(),
            items,
            highlighted,
        }
    }

    /// Border label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Item strings.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Index under the cursor.
    pub const fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Item under the cursor.
    pub fn highlighted_item(&self) -> Option<&str> {
        self.highlighted
            .and_then(|i| self.items.get(i))
            .map(String::as_str)
    }

    /// Move the cursor down.
    pub fn next(&mut self) {
        let max = self.items.len().saturating_sub(1);
        if !self.items.is_empty() {
            self.highlighted = Some(self.highlighted.map_or(0, |i| i.saturating_add(1).min(max)));
        }
    }

    /// Move the cursor up.
    pub fn prev(&mut self) {
        if let Some(idx) = self.highlighted {
            self.highlighted = Some(idx.saturating_sub(1));
        }
    }
}

/// Bordered text pane.
///
/// Bytes appended to the pane are decoded incrementally, so a UTF-8
/// sequence split across two chunks still renders as one character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextPane {
    label: String,
    lines: VecDeque<String>,
    pending: Vec<u8>,
    scroll_back: usize,
}

impl TextPane {
    /// Create a pane with initial content.
    pub fn new(label: impl Into<String>, content: &str) -> Self {
        let mut pane = Self {
            label: label.into(),
            ..Self::default()
        };
        pane.replace(content);
        pane
    }

    /// Border label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Change the border label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Replace all content.
    pub fn replace(&mut self, content: &str) {
        self.lines.clear();
        self.lines.push_back(String::new());
        self.pending.clear();
        self.scroll_back = 0;
        self.push_text(content);
    }

    /// Append raw bytes as they arrived from a stream.
    pub fn append(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut rest = self.pending.as_slice();
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end: keep it for the next chunk.
                        None => break,
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        self.push_text(&text);
    }

    /// Lines in display order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Number of lines held.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Full content joined with newlines.
    pub fn content(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }

    /// Lines scrolled back from the tail.
    pub const fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    /// Scroll towards older output.
    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.lines.len().saturating_sub(1);
        self.scroll_back = self.scroll_back.saturating_add(lines).min(max);
    }

    /// Scroll towards the tail.
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(lines);
    }

    fn push_text(&mut self, text: &str) {
        let mut segments = text.split('\n');
        if let (Some(first), Some(last)) = (segments.next(), self.lines.back_mut()) {
            last.push_str(first.trim_end_matches('\r'));
        }
        for segment in segments {
            self.lines.push_back(segment.trim_end_matches('\r').to_string());
        }

        while self.lines.len() > MAX_PANE_LINES {
            self.lines.pop_front();
        }
    }
}

/// Everything on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dashboard {
    title: String,
    list: Option<SelectList>,
    log: Option<TextPane>,
    info: Option<TextPane>,
}

impl Dashboard {
    /// Terminal title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Set the terminal title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Create (or replace) the selection list.
    pub fn create_list(&mut self, label: impl Into<String>, items: Vec<String>) {
        self.list = Some(SelectList::new(label, items));
    }

    /// Create (or replace) the log pane.
    pub fn create_log_pane(&mut self, label: impl Into<String>, content: &str) {
        self.log = Some(TextPane::new(label, content));
    }

    /// Create (or replace) the info pane.
    pub fn create_info_pane(&mut self, label: impl Into<String>, content: &str) {
        self.info = Some(TextPane::new(label, content));
    }

    /// The selection list.
    pub const fn list(&self) -> Option<&SelectList> {
        self.list.as_ref()
    }

    /// The selection list, mutably.
    pub fn list_mut(&mut self) -> Option<&mut SelectList> {
        self.list.as_mut()
    }

    /// The log pane.
    pub const fn log(&self) -> Option<&TextPane> {
        self.log.as_ref()
    }

    /// The log pane, mutably.
    pub fn log_mut(&mut self) -> Option<&mut TextPane> {
        self.log.as_mut()
    }

    /// The info pane.
    pub const fn info(&self) -> Option<&TextPane> {
        self.info.as_ref()
    }

    /// Drop every widget.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
