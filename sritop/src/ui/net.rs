//! Network sparklines (download/upload).

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};
use sritop_core::Snapshot;
use std::collections::VecDeque;

use crate::history::tail;
use crate::ui::util::{human_rate, placeholder};

pub fn draw_net_spark(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    hist: &VecDeque<u64>,
    color: Color,
) {
    let data = tail(hist, area.width.saturating_sub(2) as usize);

    let spark = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .data(&data)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}

/// Titles for the download and upload panes.
pub fn net_titles(snap: Option<&Snapshot>, rx_peak: u64, tx_peak: u64) -> (String, String) {
    if let Some(text) = placeholder(snap) {
        return (format!("↓ Download — {text}"), format!("↑ Upload — {text}"));
    }
    match snap.and_then(|s| s.network()).and_then(|n| n.rate) {
        Some(rate) => (
            format!(
                "↓ Download: {} | peak: {}",
                human_rate(rate.recv_bytes_per_sec),
                human_rate(rx_peak as f64)
            ),
            format!(
                "↑ Upload: {} | peak: {}",
                human_rate(rate.sent_bytes_per_sec),
                human_rate(tx_peak as f64)
            ),
        ),
        None => (
            "↓ Download — Initializing...".into(),
            "↑ Upload — Initializing...".into(),
        ),
    }
}
