//! Small UI helpers: human-readable sizes and rates, truncation, load colors.

use ratatui::style::Color;
use sritop_core::Snapshot;

pub fn human(b: u64) -> String {
    const K: f64 = 1024.0;
    let b = b as f64;
    if b < K { return format!("{b:.0}B"); }
    let kb = b / K;
    if kb < K { return format!("{kb:.1}KB"); }
    let mb = kb / K;
    if mb < K { return format!("{mb:.1}MB"); }
    let gb = mb / K;
    if gb < K { return format!("{gb:.1}GB"); }
    let tb = gb / K;
    format!("{tb:.2}TB")
}

/// Bytes/sec as KB/s below 1 MB/s, MB/s above.
pub fn human_rate(bytes_per_sec: f64) -> String {
    let kb = bytes_per_sec / 1024.0;
    if kb > 1024.0 {
        format!("{:.2} MB/s", kb / 1024.0)
    } else {
        format!("{kb:.2} KB/s")
    }
}

pub fn truncate_end(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    s.chars().take(max).collect()
}

/// Gauge color for a usage percent: green below 50, yellow below 80, red above.
pub fn level_color(pct: f32) -> Color {
    if pct < 50.0 {
        Color::Green
    } else if pct < 80.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Process CPU cell color: red above 50, yellow above 20.
pub fn proc_cpu_color(pct: f32) -> Color {
    if pct > 50.0 {
        Color::Red
    } else if pct > 20.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Text to show instead of a panel body, or `None` when the snapshot is ready.
pub fn placeholder(snap: Option<&Snapshot>) -> Option<String> {
    match snap {
        None => Some("Loading...".into()),
        Some(s) => s.unavailable_reason().map(|r| format!("unavailable: {r}")),
    }
}
