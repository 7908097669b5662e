//! CPU average sparkline + per-core mini bars.

use std::collections::VecDeque;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Sparkline},
};
use sritop_core::Snapshot;

use crate::history::{tail, PerCoreHistory};
use crate::ui::util::{level_color, placeholder};

// Pushes back in time the per-core trend arrow compares against
const TREND_LAG: usize = 20;
const TREND_DEADBAND: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Rising,
    Falling,
    Steady,
}

impl Trend {
    fn between(older: f32, now: f32) -> Self {
        if now > older + TREND_DEADBAND {
            Trend::Rising
        } else if now + TREND_DEADBAND < older {
            Trend::Falling
        } else {
            Trend::Steady
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            Trend::Rising => "↑",
            Trend::Falling => "↓",
            Trend::Steady => "╌",
        }
    }
}

pub fn draw_cpu_avg_graph(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    hist: &VecDeque<u64>,
    snap: Option<&Snapshot>,
) {
    let cpu = snap.and_then(|s| s.cpu());
    let title = match (cpu, placeholder(snap)) {
        (Some(c), _) => format!("CPU Usage (now: {:>5.1}%)", c.percent),
        (None, Some(text)) => format!("CPU Usage — {text}"),
        (None, None) => "CPU Usage".into(),
    };
    let color = level_color(cpu.map_or(0.0, |c| c.percent));
    let data = tail(hist, area.width.saturating_sub(2) as usize);

    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .max(100)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}

/// One row per core, as many as fit: sparkline on the left, label with trend on the right.
pub fn draw_per_core_bars(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    snap: Option<&Snapshot>,
    per_core_hist: &PerCoreHistory,
) {
    let block = Block::default().borders(Borders::ALL).title("Per-core");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(cpu) = snap.and_then(|s| s.cpu()) else {
        return;
    };
    let rows = (inner.height as usize).min(cpu.per_core.len());
    if rows == 0 {
        return;
    }
    let lines = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(1); rows])
        .split(inner);

    for (core, (line, &now)) in lines.iter().zip(&cpu.per_core).enumerate() {
        let [graph, label] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(6), Constraint::Length(12)])
            .areas(*line);

        let older = per_core_hist
            .lagged(core, TREND_LAG)
            .map_or(now, f32::from);
        let trend = Trend::between(older, now);
        let fg = level_color(now);

        let data = per_core_hist.recent(core, graph.width as usize);
        f.render_widget(
            Sparkline::default().data(&data).max(100).style(Style::default().fg(fg)),
            graph,
        );

        let text = format!("cpu{core:<2}{}{now:>5.1}%", trend.glyph());
        let styled = Span::styled(text, Style::default().fg(fg).add_modifier(Modifier::BOLD));
        f.render_widget(Paragraph::new(Line::from(styled)).right_aligned(), label);
    }
}
