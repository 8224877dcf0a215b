//! Buffer policy selection.
//!
//! Maps the buffering mode configuration onto a concrete queue plan. The
//! instance directory is derived deterministically from the client
//! identifier so restarts of the same logical bridge reuse the same on-disk
//! queue location; replaying what is found there is the spool's business,
//! not ours.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BufferMode {
    /// All buffered records held in process memory. Fastest, least durable.
    #[default]
    Memory,
    /// Every record persisted to an on-disk segment log before send.
    Disk,
    /// Memory first, spilling to disk when the in-memory bound is exceeded.
    Hybrid,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BufferConfig {
    #[serde(default)]
    pub mode: BufferMode,
    #[serde(default = "default_per_partition_limit")]
    pub per_partition_limit: u64,
    #[serde(default = "default_segment_bytes")]
    pub segment_bytes: u64,
    #[serde(default)]
    pub memory_overload_protection: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            mode: BufferMode::Memory,
            per_partition_limit: default_per_partition_limit(),
            segment_bytes: default_segment_bytes(),
            memory_overload_protection: false,
        }
    }
}

fn default_per_partition_limit() -> u64 {
    2 * 1024 * 1024 * 1024 // 2GB
}

fn default_segment_bytes() -> u64 {
    100 * 1024 * 1024 // 100MB
}

/// Concrete queue strategy handed to the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPlan {
    /// Whether in-memory records spill to disk on overflow.
    pub offload: bool,
    /// Spool location; `None` for memory-only buffering.
    pub disk_path: Option<PathBuf>,
    pub per_partition_limit: u64,
    pub segment_bytes: u64,
    /// Overload protection: memory-mode queues may drop on memory pressure.
    pub drop_on_overload: bool,
}

/// Maps the buffer mode onto its (offload, disk path) pairing:
/// memory => (false, none), disk => (false, path), hybrid => (true, path).
pub fn select_buffer(config: &BufferConfig, data_dir: &Path, client_id: &str) -> BufferPlan {
    let disk_path = data_dir.join("kafka").join(client_id);

    let (offload, disk_path, drop_on_overload) = match config.mode {
        BufferMode::Memory => (false, None, config.memory_overload_protection),
        BufferMode::Disk => (false, Some(disk_path), false),
        BufferMode::Hybrid => (true, Some(disk_path), false),
    };

    BufferPlan {
        offload,
        disk_path,
        per_partition_limit: config.per_partition_limit,
        segment_bytes: config.segment_bytes,
        drop_on_overload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: BufferMode) -> BufferConfig {
        BufferConfig {
            mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_determines_offload_and_disk_path() {
        let data_dir = Path::new("/var/lib/bridge");

        let plan = select_buffer(&config(BufferMode::Memory), data_dir, "b1");
        assert!(!plan.offload);
        assert_eq!(plan.disk_path, None);

        let plan = select_buffer(&config(BufferMode::Disk), data_dir, "b1");
        assert!(!plan.offload);
        assert!(plan.disk_path.is_some());

        let plan = select_buffer(&config(BufferMode::Hybrid), data_dir, "b1");
        assert!(plan.offload);
        assert!(plan.disk_path.is_some());
    }

    #[test]
    fn test_disk_scenario() {
        let cfg = BufferConfig {
            mode: BufferMode::Disk,
            per_partition_limit: 1000,
            segment_bytes: 500,
            memory_overload_protection: false,
        };
        let plan = select_buffer(&cfg, Path::new("/data"), "b1:nodeA");
        assert_eq!(plan.disk_path, Some(PathBuf::from("/data/kafka/b1:nodeA")));
        assert!(!plan.offload);
        assert_eq!(plan.per_partition_limit, 1000);
        assert_eq!(plan.segment_bytes, 500);
    }

    #[test]
    fn test_path_is_deterministic_across_restarts() {
        let cfg = config(BufferMode::Hybrid);
        let first = select_buffer(&cfg, Path::new("/data"), "b1:nodeA");
        let second = select_buffer(&cfg, Path::new("/data"), "b1:nodeA");
        assert_eq!(first.disk_path, second.disk_path);
    }

    #[test]
    fn test_overload_protection_only_applies_in_memory_mode() {
        let data_dir = Path::new("/data");
        for mode in [BufferMode::Memory, BufferMode::Disk, BufferMode::Hybrid] {
            let cfg = BufferConfig {
                mode,
                memory_overload_protection: true,
                ..Default::default()
            };
            let plan = select_buffer(&cfg, data_dir, "b1");
            assert_eq!(plan.drop_on_overload, mode == BufferMode::Memory);
        }
    }

    #[test]
    fn test_invalid_mode_fails_to_parse() {
        assert!(serde_json::from_str::<BufferMode>("\"memory\"").is_ok());
        assert!(serde_json::from_str::<BufferMode>("\"tape\"").is_err());
    }
}
