//! Disk usage gauge for the watched mount point.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use sritop_core::Snapshot;

use crate::ui::util::{human, level_color, placeholder};

pub fn draw_disk(f: &mut ratatui::Frame<'_>, area: Rect, snap: Option<&Snapshot>) {
    let Some(d) = snap.and_then(|s| s.disk()) else {
        let block = Block::default().borders(Borders::ALL).title("Disk");
        let text = placeholder(snap).unwrap_or_default();
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let title = format!("Disk ({})", d.mount_point);
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(level_color(d.percent)))
        .percent(d.percent.round().clamp(0.0, 100.0) as u16)
        .label(format!(
            "{} / {}  ({:.1}%)",
            human(d.used_bytes),
            human(d.total_bytes),
            d.percent
        ));
    f.render_widget(g, area);
}
