//! Memory gauge.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use sritop_core::Snapshot;

use crate::ui::util::{human, level_color, placeholder};

pub fn draw_mem(f: &mut ratatui::Frame<'_>, area: Rect, snap: Option<&Snapshot>) {
    let block = Block::default().borders(Borders::ALL).title("Memory");
    let Some(mem) = snap.and_then(|s| s.memory()) else {
        let text = placeholder(snap).unwrap_or_default();
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let g = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(level_color(mem.percent)))
        .percent(mem.percent.round().clamp(0.0, 100.0) as u16)
        .label(format!(
            "{} / {}  ({:.1}%)",
            human(mem.used_bytes),
            human(mem.total_bytes),
            mem.percent
        ));
    f.render_widget(g, area);
}
