//! sritop_core: samples host metrics on independent per-family cadences and
//! keeps the latest snapshot of each family for a presentation layer to pull.
//!
//! ```no_run
//! use sritop_core::{Family, Sampler, SamplerConfig, SysinfoSource};
//!
//! # async fn demo() -> Result<(), sritop_core::SamplerError> {
//! let config = SamplerConfig::default();
//! let mut sampler = Sampler::new(SysinfoSource::new(config.cpu_window), config);
//! sampler.start()?;
//! let store = sampler.store();
//! if let Some(snap) = store.get(Family::Cpu) {
//!     println!("{:?}", snap.cpu().map(|c| c.percent));
//! }
//! sampler.stop().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod ranker;
pub mod rate;
pub mod sampler;
pub mod state;
pub mod types;

pub use config::{Cadences, SamplerConfig};
pub use error::{SampleError, SamplerError};
pub use metrics::{MetricSource, SysinfoSource};
pub use ranker::{top_by_cpu, DEFAULT_TOP_N};
pub use rate::compute_rate;
pub use sampler::Sampler;
pub use state::{SharedStore, SnapshotStore, StoreView};
pub use types::{
    CpuSample, DiskSample, Family, MemorySample, NetworkCounters, NetworkRate, NetworkSample,
    Payload, ProcessInfo, ProcessSample, Reading, Snapshot,
};
