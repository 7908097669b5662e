//! Top-N process view.

use std::cmp::Ordering;

use crate::types::ProcessInfo;

pub const DEFAULT_TOP_N: usize = 10;

/// Highest CPU first, equal CPU ordered by ascending pid. Missing CPU counts as 0.
pub fn top_by_cpu(mut all: Vec<ProcessInfo>, n: usize) -> Vec<ProcessInfo> {
    all.sort_by(cmp_cpu_desc);
    all.truncate(n);
    all
}

fn cmp_cpu_desc(a: &ProcessInfo, b: &ProcessInfo) -> Ordering {
    b.cpu()
        .total_cmp(&a.cpu())
        .then_with(|| a.pid.cmp(&b.pid))
}
