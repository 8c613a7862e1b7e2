//! Dashboard widgets and layout.

mod dashboard;
mod layout;

pub use dashboard::{Dashboard, MAX_PANE_LINES, SelectList, TextPane};
pub use layout::render;
