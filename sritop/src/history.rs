//! Bounded in-memory buffers backing the sparklines. Nothing here outlives the process.

use std::collections::VecDeque;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if dq.len() == cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

/// Last `n` values of a history, oldest first, widened for `Sparkline`.
pub fn tail<T: Copy + Into<u64>>(dq: &VecDeque<T>, n: usize) -> Vec<u64> {
    let skip = dq.len().saturating_sub(n);
    dq.iter().skip(skip).map(|&v| v.into()).collect()
}

// Keeps a history deque per core with a fixed capacity
pub struct PerCoreHistory {
    deques: Vec<VecDeque<u16>>,
    cap: usize,
}

impl PerCoreHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            deques: Vec::new(),
            cap,
        }
    }

    // One deque per core; reset when the core count changes (hotplug, container limits)
    pub fn ensure_cores(&mut self, n: usize) {
        if self.deques.len() == n {
            return;
        }
        self.deques = (0..n).map(|_| VecDeque::with_capacity(self.cap)).collect();
    }

    // Push a new sample set for all cores (values 0..=100)
    pub fn push_samples(&mut self, samples: &[f32]) {
        self.ensure_cores(samples.len());
        for (i, v) in samples.iter().enumerate() {
            let val = v.clamp(0.0, 100.0).round() as u16;
            push_capped(&mut self.deques[i], val, self.cap);
        }
    }

    /// Most recent `n` samples of core `i`; empty for an unknown core.
    pub fn recent(&self, i: usize, n: usize) -> Vec<u64> {
        self.deques.get(i).map(|d| tail(d, n)).unwrap_or_default()
    }

    /// Sample taken `lag` pushes before the latest one, if kept.
    pub fn lagged(&self, i: usize, lag: usize) -> Option<u16> {
        self.deques.get(i)?.iter().rev().nth(lag).copied()
    }
}
