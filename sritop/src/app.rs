//! App state and main loop: input handling, pulling snapshots, updating history, and drawing.

use std::{collections::VecDeque, io, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Color,
    Terminal,
};
use sritop_core::{MetricSource, Sampler, SharedStore, StoreView};
use tokio::time::sleep;
use tracing::debug;

use crate::history::{push_capped, PerCoreHistory};
use crate::ui::cpu::{draw_cpu_avg_graph, draw_per_core_bars};
use crate::ui::processes::{draw_top_processes, ProcSortBy};
use crate::ui::{
    disks::draw_disk, header::draw_header, mem::draw_mem, net::draw_net_spark, net::net_titles,
};

const HIST_CAP: usize = 600;
const FRAME: Duration = Duration::from_millis(250);

/// What a key press asks the loop to do beyond updating local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Refresh,
}

pub struct App {
    store: SharedStore,
    host: String,

    // Latest pulled view; each slot is a complete snapshot
    view: StoreView,

    // CPU avg history (0..100)
    cpu_hist: VecDeque<u64>,
    per_core_hist: PerCoreHistory,

    // Network rate histories (bytes/sec)
    rx_hist: VecDeque<u64>,
    tx_hist: VecDeque<u64>,
    rx_peak: u64,
    tx_peak: u64,

    // Snapshot versions already folded into the histories
    seen_cpu: Option<u64>,
    seen_net: Option<u64>,

    should_quit: bool,
    pub procs_sort_by: ProcSortBy,
}

impl App {
    pub fn new(store: SharedStore, host: String) -> Self {
        Self {
            store,
            host,
            view: StoreView::default(),
            cpu_hist: VecDeque::with_capacity(HIST_CAP),
            per_core_hist: PerCoreHistory::new(60),
            rx_hist: VecDeque::with_capacity(HIST_CAP),
            tx_hist: VecDeque::with_capacity(HIST_CAP),
            rx_peak: 0,
            tx_peak: 0,
            seen_cpu: None,
            seen_net: None,
            should_quit: false,
            procs_sort_by: ProcSortBy::CpuDesc,
        }
    }

    pub async fn run<S: MetricSource>(&mut self, sampler: &Sampler<S>) -> Result<()> {
        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        // Main loop
        let res = self.event_loop(&mut terminal, sampler).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend, S: MetricSource>(
        &mut self,
        terminal: &mut Terminal<B>,
        sampler: &Sampler<S>,
    ) -> Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    if k.kind != KeyEventKind::Press {
                        continue;
                    }
                    // raw mode swallows SIGINT; treat Ctrl-C as quit
                    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
                        self.should_quit = true;
                        continue;
                    }
                    match self.handle_key(k.code) {
                        KeyAction::Quit => self.should_quit = true,
                        KeyAction::Refresh => {
                            debug!("manual refresh");
                            sampler.refresh_now();
                        }
                        KeyAction::None => {}
                    }
                }
            }
            if self.should_quit {
                break;
            }

            // Pull whatever the samplers published since the last frame
            let view = self.store.view();
            self.update_with_view(view);

            terminal.draw(|f| self.draw(f))?;
            sleep(FRAME).await;
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> KeyAction {
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Refresh,
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.procs_sort_by = ProcSortBy::CpuDesc;
                KeyAction::None
            }
            KeyCode::Char('m') | KeyCode::Char('M') => {
                self.procs_sort_by = ProcSortBy::MemDesc;
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    fn update_with_view(&mut self, view: StoreView) {
        if let Some(snap) = view.cpu.as_ref() {
            if self.seen_cpu != Some(snap.version) {
                self.seen_cpu = Some(snap.version);
                if let Some(cpu) = snap.cpu() {
                    push_capped(&mut self.cpu_hist, cpu.percent.round() as u64, HIST_CAP);
                    self.per_core_hist.push_samples(&cpu.per_core);
                }
            }
        }

        if let Some(snap) = view.network.as_ref() {
            if self.seen_net != Some(snap.version) {
                self.seen_net = Some(snap.version);
                if let Some(rate) = snap.network().and_then(|n| n.rate) {
                    let rx = rate.recv_bytes_per_sec.round() as u64;
                    let tx = rate.sent_bytes_per_sec.round() as u64;
                    push_capped(&mut self.rx_hist, rx, HIST_CAP);
                    push_capped(&mut self.tx_hist, tx, HIST_CAP);
                    self.rx_peak = self.rx_peak.max(rx);
                    self.tx_peak = self.tx_peak.max(tx);
                }
            }
        }

        self.view = view;
    }

    pub fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let v = &self.view;

        // Root rows: header, cpu, memory, disk, bottom
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),   // header
                Constraint::Ratio(1, 3), // cpu avg + per-core
                Constraint::Length(3),   // memory
                Constraint::Length(3),   // disk
                Constraint::Min(10),     // network (left), processes (right)
            ])
            .split(area);

        let loading = v.cpu.is_none() || v.memory.is_none();
        draw_header(f, rows[0], &self.host, loading);

        let top_lr = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
            .split(rows[1]);
        draw_cpu_avg_graph(f, top_lr[0], &self.cpu_hist, v.cpu.as_deref());
        draw_per_core_bars(f, top_lr[1], v.cpu.as_deref(), &self.per_core_hist);

        draw_mem(f, rows[2], v.memory.as_deref());
        draw_disk(f, rows[3], v.disk.as_deref());

        let bottom_lr = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[4]);
        let net_stack = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(bottom_lr[0]);

        let (down_title, up_title) = net_titles(v.network.as_deref(), self.rx_peak, self.tx_peak);
        draw_net_spark(f, net_stack[0], &down_title, &self.rx_hist, Color::Green);
        draw_net_spark(f, net_stack[1], &up_title, &self.tx_hist, Color::Blue);

        draw_top_processes(f, bottom_lr[1], v.processes.as_deref(), self.procs_sort_by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use sritop_core::{
        CpuSample, Family, NetworkRate, NetworkSample, Payload, Reading, Snapshot, SnapshotStore,
    };

    fn cpu_snap(version: u64, pct: f32) -> Snapshot {
        Snapshot::new(
            Family::Cpu,
            version,
            Reading::Ready(Payload::Cpu(CpuSample {
                percent: pct,
                per_core: vec![pct, pct],
                timestamp: Utc::now(),
            })),
        )
    }

    fn net_snap(version: u64, rate: Option<NetworkRate>) -> Snapshot {
        Snapshot::new(
            Family::Network,
            version,
            Reading::Ready(Payload::Network(NetworkSample {
                rate,
                bytes_sent: 0,
                bytes_recv: 0,
                timestamp: Utc::now(),
            })),
        )
    }

    #[test]
    fn keys_map_to_actions() {
        let mut app = App::new(SnapshotStore::shared(), "h".into());
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::Quit);
        assert_eq!(app.handle_key(KeyCode::Esc), KeyAction::Quit);
        assert_eq!(app.handle_key(KeyCode::Char('r')), KeyAction::Refresh);
        assert_eq!(app.handle_key(KeyCode::Char('m')), KeyAction::None);
        assert_eq!(app.procs_sort_by, ProcSortBy::MemDesc);
        app.handle_key(KeyCode::Char('c'));
        assert_eq!(app.procs_sort_by, ProcSortBy::CpuDesc);
    }

    #[test]
    fn history_grows_once_per_snapshot_version() {
        let store = SnapshotStore::shared();
        let mut app = App::new(store.clone(), "h".into());

        store.set(cpu_snap(1, 40.0));
        app.update_with_view(store.view());
        app.update_with_view(store.view());
        assert_eq!(app.cpu_hist.len(), 1);

        store.set(cpu_snap(2, 60.0));
        app.update_with_view(store.view());
        assert_eq!(app.cpu_hist, VecDeque::from([40, 60]));
    }

    #[test]
    fn initializing_network_adds_no_history() {
        let store = SnapshotStore::shared();
        let mut app = App::new(store.clone(), "h".into());

        store.set(net_snap(1, None));
        app.update_with_view(store.view());
        assert!(app.rx_hist.is_empty());

        store.set(net_snap(
            2,
            Some(NetworkRate {
                sent_bytes_per_sec: 500.0,
                recv_bytes_per_sec: 600.0,
            }),
        ));
        app.update_with_view(store.view());
        assert_eq!(app.rx_hist.back(), Some(&600));
        assert_eq!(app.tx_peak, 500);
    }

    #[test]
    fn draws_with_empty_and_partial_store() {
        let store = SnapshotStore::shared();
        let mut app = App::new(store.clone(), "testhost".into());
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();

        app.update_with_view(store.view());
        terminal.draw(|f| app.draw(f)).unwrap();

        store.set(cpu_snap(1, 12.5));
        store.set(Snapshot::new(
            Family::Disk,
            1,
            Reading::Unavailable("no mounted filesystem contains /x".into()),
        ));
        app.update_with_view(store.view());
        terminal.draw(|f| app.draw(f)).unwrap();

        let buf = terminal.backend().buffer().clone();
        let text: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("testhost"));
        assert!(text.contains("unavailable"));
        assert!(text.contains("Loading..."));
    }
}
