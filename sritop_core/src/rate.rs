//! Throughput from cumulative network counters.

use crate::types::{NetworkCounters, NetworkRate};

/// Bytes/sec between two consecutive counter readings.
///
/// Returns `None` when no meaningful rate exists for the interval: the clock did
/// not move forward, or either counter went backwards (interface reset, wraparound,
/// interface removed from the sum). The caller keeps `curr` as the next baseline,
/// so computation resumes on the following interval.
pub fn compute_rate(prev: &NetworkCounters, curr: &NetworkCounters) -> Option<NetworkRate> {
    let elapsed = curr.timestamp.checked_duration_since(prev.timestamp)?;
    if elapsed.is_zero() {
        return None;
    }
    let sent = curr.bytes_sent.checked_sub(prev.bytes_sent)?;
    let recv = curr.bytes_recv.checked_sub(prev.bytes_recv)?;

    let secs = elapsed.as_secs_f64();
    Some(NetworkRate {
        sent_bytes_per_sec: sent as f64 / secs,
        recv_bytes_per_sec: recv as f64 / secs,
    })
}
