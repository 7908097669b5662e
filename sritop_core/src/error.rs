//! Error types for metric reads and sampler control.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Family;

/// A single failed read. Never fatal: the sampler turns it into an
/// `Unavailable` reading in that family's slot.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("cannot resolve {path}: {source}")]
    PathUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no mounted filesystem contains {0}")]
    NotMounted(PathBuf),
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("sampler is already running")]
    AlreadyRunning,
    #[error("invalid sampler config: {0}")]
    InvalidConfig(String),
    #[error("shutdown incomplete: {} still running after grace period", join_families(.pending))]
    ShutdownIncomplete { pending: Vec<Family> },
}

fn join_families(families: &[Family]) -> String {
    families
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_incomplete_names_families() {
        let e = SamplerError::ShutdownIncomplete {
            pending: vec![Family::Cpu, Family::Disk],
        };
        assert_eq!(
            e.to_string(),
            "shutdown incomplete: cpu, disk still running after grace period"
        );
    }

    #[test]
    fn not_mounted_mentions_path() {
        let e = SampleError::NotMounted(PathBuf::from("/mnt/none"));
        assert!(e.to_string().contains("/mnt/none"));
    }
}
