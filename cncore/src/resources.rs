//! Host resource checks and OSD memory tuning.

use crate::config::BootstrapConfig;
use crate::constants::limits;
use cncore_shared::errors::{CncoreError, CncoreResult};
use std::path::Path;

pub const MIB: u64 = 1024 * 1024;

/// cgroup files holding the container memory limit (v2, then v1).
const CGROUP_MEMORY_LIMITS: [&str; 2] = [
    "/sys/fs/cgroup/memory.max",
    "/sys/fs/cgroup/memory/memory.limit_in_bytes",
];

/// Memory budget handed to the OSD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    /// `--osd-memory-target`: roughly 90% of what is available.
    pub target: u64,
    /// `--osd-memory-base`: half of what is available.
    pub base: u64,
    /// `--osd-memory-cache-min`: roughly 70% of what is available.
    pub cache_min: u64,
}

/// Size the OSD memory budget from `available_bytes`.
///
/// Works in whole MiB, rounding the proportional values up, so that for any
/// input at or above the memory floor `base < cache_min < target <= available`.
/// Callers must validate the floor first; the function itself is total.
pub fn tune_memory(available_bytes: u64) -> MemoryBudget {
    let mib = available_bytes / MIB;
    MemoryBudget {
        target: (mib * 9).div_ceil(10) * MIB,
        base: mib / 2 * MIB,
        cache_min: (mib * 7).div_ceil(10) * MIB,
    }
}

/// Fail with `InsufficientMemory` when `actual < minimum`.
pub fn validate_available_memory(minimum: u64, actual: u64) -> CncoreResult<()> {
    if actual < minimum {
        return Err(CncoreError::InsufficientMemory { minimum, actual });
    }
    Ok(())
}

/// Fail with `InsufficientStorage` when `path` has less than `minimum` bytes free.
pub fn validate_available_block_storage(minimum: u64, path: &Path) -> CncoreResult<()> {
    let available = free_space(path)?;
    if available < minimum {
        return Err(CncoreError::InsufficientStorage {
            path: path.display().to_string(),
            minimum,
            available,
        });
    }
    Ok(())
}

/// Bytes available to unprivileged users on the filesystem holding `path`.
pub fn free_space(path: &Path) -> CncoreResult<u64> {
    let stat = nix::sys::statvfs::statvfs(path).map_err(|e| {
        CncoreError::Filesystem(format!("Failed to statvfs {}: {}", path.display(), e))
    })?;
    Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
}

/// Memory the node may use, in bytes.
///
/// The container's cgroup limit when one is set, otherwise host total memory.
pub fn memory_limit() -> u64 {
    let host_total = {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        sys.total_memory()
    };

    match cgroup_memory_limit() {
        Some(limit) if limit < host_total => limit,
        _ => host_total,
    }
}

/// Memory currently available to the OSD, in bytes.
pub fn available_memory() -> u64 {
    let available = {
        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        sys.available_memory()
    };

    match cgroup_memory_limit() {
        Some(limit) => available.min(limit),
        None => available,
    }
}

fn cgroup_memory_limit() -> Option<u64> {
    CGROUP_MEMORY_LIMITS
        .iter()
        .find_map(|path| std::fs::read_to_string(path).ok())
        .and_then(|raw| parse_cgroup_limit(&raw))
}

/// `max` (v2) means unlimited.
fn parse_cgroup_limit(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw == "max" {
        return None;
    }
    raw.parse().ok()
}

/// Checks run before any role executes.
///
/// Memory floor always; free-space floor only when a dedicated OSD
/// directory is configured.
pub fn preflight(config: &BootstrapConfig) -> CncoreResult<()> {
    let limit_mib = memory_limit() / MIB;
    tracing::debug!(limit_mib, "Checking memory floor");
    validate_available_memory(limits::MEMORY_MIN_MIB, limit_mib)?;

    if let Some(osd_path) = &config.osd_path {
        tracing::debug!(path = %osd_path.display(), "Checking bluestore free space");
        validate_available_block_storage(limits::BLUESTORE_SIZE_MIN, osd_path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tune_memory_regression_vector() {
        let budget = tune_memory(508 * MIB);
        assert_eq!(budget.target, 458 * MIB);
        assert_eq!(budget.base, 254 * MIB);
        assert_eq!(budget.cache_min, 356 * MIB);
    }

    #[test]
    fn test_tune_memory_ordering_above_floor() {
        let samples = [
            limits::MEMORY_MIN_MIB * MIB,
            limits::MEMORY_MIN_MIB * MIB + 1,
            777 * MIB + 12345,
            1024 * MIB,
            4 * 1024 * MIB - 1,
            64 * 1024 * MIB,
            1024 * 1024 * MIB,
        ];
        for available in samples {
            let b = tune_memory(available);
            assert!(b.base < b.cache_min, "{available}: {b:?}");
            assert!(b.cache_min < b.target, "{available}: {b:?}");
            assert!(b.target <= available, "{available}: {b:?}");
        }
    }

    #[test]
    fn test_tune_memory_ordering_down_to_four_mib() {
        for mib in 4..=1024 {
            let b = tune_memory(mib * MIB);
            assert!(b.base < b.cache_min && b.cache_min < b.target, "{mib} MiB: {b:?}");
        }
        // below that the cache floor meets the target
        let b = tune_memory(3 * MIB);
        assert_eq!(b.cache_min, b.target);
    }

    #[test]
    fn test_tune_memory_is_total() {
        assert_eq!(
            tune_memory(0),
            MemoryBudget {
                target: 0,
                base: 0,
                cache_min: 0
            }
        );
        let _ = tune_memory(u64::MAX);
    }

    #[test]
    fn test_validate_available_memory() {
        assert!(matches!(
            validate_available_memory(512, 511),
            Err(CncoreError::InsufficientMemory {
                minimum: 512,
                actual: 511
            })
        ));
        assert!(validate_available_memory(512, 512).is_ok());
        assert!(validate_available_memory(512, 4096).is_ok());
    }

    #[test]
    fn test_validate_block_storage() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(validate_available_block_storage(0, tmp.path()).is_ok());
        assert!(matches!(
            validate_available_block_storage(u64::MAX, tmp.path()),
            Err(CncoreError::InsufficientStorage { .. })
        ));
    }

    #[test]
    fn test_validate_block_storage_missing_path() {
        let err = validate_available_block_storage(0, Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, CncoreError::Filesystem(_)));
    }

    #[test]
    fn test_parse_cgroup_limit() {
        assert_eq!(parse_cgroup_limit("max\n"), None);
        assert_eq!(parse_cgroup_limit("536870912\n"), Some(536870912));
        assert_eq!(parse_cgroup_limit("garbage"), None);
    }

    #[test]
    fn test_memory_limit_reports_something() {
        assert!(memory_limit() > 0);
    }
}
