//! Top header with hostname, clock and key hints.

use chrono::Local;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, host: &str, loading: bool) {
    let clock = Local::now().format("%H:%M:%S");
    let state = if loading { " | sampling..." } else { "" };
    let title = format!(
        "sritop — host: {host} | {clock}{state}  (q quit, r refresh, c/m sort)"
    );
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}
