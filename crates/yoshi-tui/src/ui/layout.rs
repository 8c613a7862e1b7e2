//! Main layout rendering for the dashboard.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::dashboard::{Dashboard, SelectList, TextPane};

/// Render the entire dashboard.
///
/// The log pane takes the left half; the selection list sits above the
/// info pane on the right.
pub fn render(frame: &mut Frame, dashboard: &Dashboard) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(frame.area());

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(columns[1]);

    if let Some(log) = dashboard.log() {
        render_log_pane(frame, log, columns[0]);
    }
    if let Some(list) = dashboard.list() {
        render_select_list(frame, list, right[0]);
    }
    if let Some(info) = dashboard.info() {
        render_info_pane(frame, info, right[1]);
    }
}

/// Render the log pane, following the tail unless scrolled back.
fn render_log_pane(frame: &mut Frame, pane: &TextPane, area: Rect) {
    let visible = usize::from(area.height.saturating_sub(2));
    let bottom = pane.line_count().saturating_sub(pane.scroll_back());
    let top = bottom.saturating_sub(visible);

    let text: Vec<Line> = pane
        .lines()
        .skip(top)
        .take(bottom - top)
        .map(Line::from)
        .collect();

    let title = if pane.scroll_back() > 0 {
        format!(" {} [-{}] ", pane.label(), pane.scroll_back())
    } else {
        format!(" {} ", pane.label())
    };

    let paragraph = Paragraph::new(text).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Indexed(25))),
    );

    frame.render_widget(paragraph, area);
}

/// Render the selection list.
fn render_select_list(frame: &mut Frame, list: &SelectList, area: Rect) {
    let items: Vec<ListItem> = list
        .items()
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let content = if Some(i) == list.highlighted() {
                Line::from(vec![
                    Span::raw("> "),
                    Span::styled(
                        item.as_str(),
                        Style::default()
                            .fg(Color::Gray)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                ])
            } else {
                Line::from(format!("  {item}"))
            };
            ListItem::new(content)
        })
        .collect();

    let widget = List::new(items).block(
        Block::default()
            .title(format!(" {} ", list.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Indexed(39))),
    );

    frame.render_widget(widget, area);
}

/// Render the info pane.
fn render_info_pane(frame: &mut Frame, pane: &TextPane, area: Rect) {
    let text: Vec<Line> = pane.lines().map(Line::from).collect();

    let paragraph = Paragraph::new(text).block(
        Block::default()
            .title(format!(" {} ", pane.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Indexed(39))),
    );

    frame.render_widget(paragraph, area);
}
