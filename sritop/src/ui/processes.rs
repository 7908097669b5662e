//! Top processes table with per-cell coloring and a selectable sort column.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use sritop_core::{ProcessInfo, Snapshot};

use crate::ui::util::{placeholder, proc_cpu_color, truncate_end};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcSortBy {
    #[default]
    CpuDesc,
    MemDesc,
}

const COLS: [Constraint; 4] = [
    Constraint::Length(8),  // PID
    Constraint::Min(12),    // Name
    Constraint::Length(9),  // CPU %
    Constraint::Length(9),  // Mem %
];

const NAME_MAX: usize = 24;

/// Rows in display order. CPU order is already what the ranker produced;
/// memory order re-sorts the same top-N, ties by pid.
pub fn sorted_rows(top: &[ProcessInfo], sort_by: ProcSortBy) -> Vec<&ProcessInfo> {
    let mut rows: Vec<&ProcessInfo> = top.iter().collect();
    if sort_by == ProcSortBy::MemDesc {
        rows.sort_by(|a, b| b.mem().total_cmp(&a.mem()).then_with(|| a.pid.cmp(&b.pid)));
    }
    rows
}

pub fn draw_top_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    snap: Option<&Snapshot>,
    sort_by: ProcSortBy,
) {
    let Some(procs) = snap.and_then(|s| s.processes()) else {
        let block = Block::default().borders(Borders::ALL).title("Top Processes");
        let text = placeholder(snap).unwrap_or_default();
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    let by = match sort_by {
        ProcSortBy::CpuDesc => "CPU",
        ProcSortBy::MemDesc => "memory",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Top Processes (by {by}, {} total)", procs.total));

    let rows = sorted_rows(&procs.top, sort_by).into_iter().map(|p| {
        let cpu = p.cpu();
        Row::new(vec![
            Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
            Cell::from(truncate_end(p.display_name(), NAME_MAX)),
            Cell::from(format!("{cpu:>5.1}%")).style(Style::default().fg(proc_cpu_color(cpu))),
            Cell::from(format!("{:>5.1}%", p.mem())),
        ])
    });

    let cpu_hdr = if sort_by == ProcSortBy::CpuDesc { "CPU% •" } else { "CPU%" };
    let mem_hdr = if sort_by == ProcSortBy::MemDesc { "MEM% •" } else { "MEM%" };
    let header = Row::new(vec!["PID", "Name", cpu_hdr, mem_hdr]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(rows, COLS.to_vec())
        .header(header)
        .block(block)
        .column_spacing(1);
    f.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(pid: u32, cpu: f32, mem: Option<f32>) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: None,
            cpu_percent: Some(cpu),
            mem_percent: mem,
        }
    }

    #[test]
    fn cpu_order_is_kept_as_ranked() {
        let top = vec![p(4, 90.0, Some(1.0)), p(2, 10.0, Some(9.0))];
        let pids: Vec<u32> = sorted_rows(&top, ProcSortBy::CpuDesc).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![4, 2]);
    }

    #[test]
    fn mem_order_treats_missing_as_zero() {
        let top = vec![p(4, 90.0, None), p(2, 10.0, Some(9.0)), p(1, 5.0, Some(9.0))];
        let pids: Vec<u32> = sorted_rows(&top, ProcSortBy::MemDesc).iter().map(|p| p.pid).collect();
        assert_eq!(pids, vec![1, 2, 4]);
    }
}
