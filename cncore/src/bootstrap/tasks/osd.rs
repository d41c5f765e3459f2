//! Object storage daemon bootstrap.
//!
//! Two backends:
//! - directory mode (default): bluestore inside the OSD data directory,
//!   keyring minted through the monitor keyring, then `ceph-osd --mkfs`.
//! - block-device mode (`osd_device` set): `ceph-volume lvm prepare` on first
//!   run, `ceph-volume lvm activate` on every run.

use super::BootstrapStep;
use crate::bootstrap::types::{BootstrapContext, DaemonRole};
use crate::command::Invocation;
use crate::constants::{limits, osd};
use crate::fs::{ensure_dir, set_owner};
use crate::resources::{MIB, available_memory, tune_memory};
use async_trait::async_trait;
use cncore_shared::errors::{CncoreError, CncoreResult};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

pub struct OsdStep;

#[async_trait]
impl BootstrapStep for OsdStep {
    fn role(&self) -> DaemonRole {
        DaemonRole::Osd
    }

    fn marker(&self, ctx: &BootstrapContext) -> PathBuf {
        ctx.layout.osd_keyring()
    }

    async fn ensure_initialized(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let device = match &ctx.config.osd_device {
            Some(device) => {
                check_block_device(device)?;
                Some(device.as_path())
            }
            None => None,
        };

        tracing::info!("init osd: run prerequisites");
        ensure_dir(&ctx.layout.osd_data_dir(), ctx.owner())?;

        match device {
            Some(device) => prepare_device(ctx, device).await,
            None => mkfs_directory(ctx).await,
        }
    }

    async fn start(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let block_size = match &ctx.config.osd_device {
            Some(device) => {
                check_block_device(device)?;
                let size = match ctx.config.bluestore_block_size {
                    Some(size) => size,
                    None => probe_device_size(ctx, device).await?,
                };
                activate_device(ctx).await?;
                size
            }
            None => ctx
                .config
                .bluestore_block_size
                .unwrap_or(osd::DEFAULT_BLUESTORE_BLOCK_SIZE),
        };

        tracing::info!("init osd: running osd");
        // preflight checked the limit, not what is free now; the budget
        // ordering only holds above a few MiB
        let available = available_memory();
        if available < limits::MEMORY_MIN_MIB * MIB {
            tracing::warn!(
                available,
                "Available memory is below the floor, OSD memory budget may be degenerate"
            );
        }
        ctx.run(&run_invocation(available, block_size))
            .await?;
        Ok(())
    }
}

/// `ceph-osd` foreground command with a memory budget sized from `available`.
fn run_invocation(available: u64, block_size: u64) -> Invocation {
    let budget = tune_memory(available);
    tracing::debug!(
        available,
        target = budget.target,
        base = budget.base,
        cache_min = budget.cache_min,
        block_size,
        "Tuned OSD memory"
    );

    Invocation::new("ceph-osd")
        .args(["--setuser", "ceph", "--setgroup", "ceph", "-i", osd::ID])
        .args(["--osd-crush-chooseleaf-type", osd::CRUSH_CHOOSELEAF_TYPE])
        .args(["--osd-journal-size", osd::JOURNAL_SIZE])
        .args(["--osd-pool-default-size", osd::POOL_DEFAULT_SIZE])
        .args(["--osd-objectstore", osd::OBJECTSTORE])
        .arg("--osd-memory-target")
        .arg(budget.target.to_string())
        .arg("--osd-memory-base")
        .arg(budget.base.to_string())
        .arg("--osd-memory-cache-min")
        .arg(budget.cache_min.to_string())
        .arg("--bluestore-block-size")
        .arg(block_size.to_string())
}

async fn mkfs_directory(ctx: &BootstrapContext) -> CncoreResult<()> {
    let layout = &ctx.layout;
    let keyring = layout.osd_keyring();

    tracing::info!("init osd: generating osd keyring");
    ctx.run(
        &Invocation::new("ceph")
            .args(["-n", "mon.", "-k"])
            .path(&layout.mon_keyring(&ctx.hostname))
            .arg("auth")
            .arg("get-or-create")
            .arg(format!("osd.{}", osd::ID))
            .args(["mon", "allow profile osd", "osd", "allow *"])
            .args(["mgr", "allow profile osd", "-o"])
            .path(&keyring),
    )
    .await?;
    set_owner(&keyring, ctx.owner())?;

    tracing::info!("init osd: populating osd store");
    ctx.run(
        &Invocation::new("ceph-osd")
            .args(["--setuser", "ceph", "--setgroup", "ceph", "--conf"])
            .path(&layout.conf_file())
            .args(["--mkfs", "-i", osd::ID, "--osd-data"])
            .path(&layout.osd_data_dir()),
    )
    .await?;
    Ok(())
}

async fn prepare_device(ctx: &BootstrapContext, device: &Path) -> CncoreResult<()> {
    let bootstrap_keyring = ctx.layout.bootstrap_osd_keyring();
    if let Some(parent) = bootstrap_keyring.parent() {
        ensure_dir(parent, ctx.owner())?;
    }

    ctx.run(
        &Invocation::new("ceph")
            .args(["auth", "export", "client.bootstrap-osd", "-o"])
            .path(&bootstrap_keyring),
    )
    .await?;

    tracing::info!(device = %device.display(), "init osd: preparing block device");
    ctx.run(
        &Invocation::new("ceph-volume")
            .args(["lvm", "prepare", "--data"])
            .path(device),
    )
    .await?;
    Ok(())
}

async fn activate_device(ctx: &BootstrapContext) -> CncoreResult<()> {
    let listing = ctx
        .run(&Invocation::new("ceph-volume").args(["lvm", "list", "--format", "json"]))
        .await?;
    let fsid = osd_fsid_from_lvm_list(&listing.stdout_str())?;

    tracing::info!(osd_fsid = %fsid, "init osd: activating block device");
    ctx.run(
        &Invocation::new("ceph-volume")
            .args(["lvm", "activate", "--no-systemd", "--bluestore", osd::ID])
            .arg(fsid),
    )
    .await?;
    Ok(())
}

async fn probe_device_size(ctx: &BootstrapContext, device: &Path) -> CncoreResult<u64> {
    let output = ctx
        .run(&Invocation::new("blockdev").arg("--getsize64").path(device))
        .await?;
    let raw = output.stdout_str();
    raw.trim().parse().map_err(|_| {
        CncoreError::Environment(format!(
            "unexpected size {:?} reported for {}",
            raw.trim(),
            device.display()
        ))
    })
}

/// Only block devices can back the OSD in device mode.
fn check_block_device(device: &Path) -> CncoreResult<()> {
    tracing::debug!(device = %device.display(), "init osd: checking for block device");
    let metadata = std::fs::metadata(device).map_err(|e| {
        CncoreError::Filesystem(format!("Failed to stat {}: {}", device.display(), e))
    })?;

    if !metadata.file_type().is_block_device() {
        return Err(CncoreError::Config(format!(
            "invalid OSD device {}, only block devices are supported",
            device.display()
        )));
    }
    Ok(())
}

/// Extract `ceph.osd_fsid` of OSD 0 from `ceph-volume lvm list --format json`.
pub fn osd_fsid_from_lvm_list(json: &str) -> CncoreResult<String> {
    let listing: serde_json::Value = serde_json::from_str(json).map_err(|e| {
        CncoreError::Internal(format!("failed to parse ceph-volume listing: {}", e))
    })?;

    listing
        .get(osd::ID)
        .and_then(|volumes| volumes.get(0))
        .and_then(|volume| volume.get("tags"))
        .and_then(|tags| tags.get("ceph.osd_fsid"))
        .and_then(|fsid| fsid.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CncoreError::Internal(
                "could not activate the block device: osd_fsid missing from ceph-volume listing"
                    .into(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::super::drive;
    use super::super::testing::*;
    use super::*;
    use crate::config::BootstrapConfig;

    const LVM_LIST: &str = r#"{
    "0": [
        {
            "devices": ["/dev/sdb"],
            "lv_name": "osd-block-2a1b",
            "tags": {
                "ceph.osd_fsid": "2a1b7d3e-0c4f-4a8e-9d61-5b7e2f1c9a00",
                "ceph.osd_id": "0"
            },
            "type": "block"
        }
    ]
}"#;

    #[test]
    fn test_osd_fsid_from_lvm_list() {
        assert_eq!(
            osd_fsid_from_lvm_list(LVM_LIST).unwrap(),
            "2a1b7d3e-0c4f-4a8e-9d61-5b7e2f1c9a00"
        );
    }

    #[test]
    fn test_osd_fsid_missing() {
        assert!(osd_fsid_from_lvm_list("{}").is_err());
        assert!(osd_fsid_from_lvm_list(r#"{"0": []}"#).is_err());
        assert!(osd_fsid_from_lvm_list(r#"{"0": [{"tags": {}}]}"#).is_err());
        assert!(osd_fsid_from_lvm_list("not json").is_err());
    }

    #[test]
    fn test_run_invocation_carries_budget() {
        let line = run_invocation(508 * MIB, osd::DEFAULT_BLUESTORE_BLOCK_SIZE).to_string();
        assert!(line.starts_with("ceph-osd --setuser ceph --setgroup ceph -i 0"));
        assert!(line.contains(&format!("--osd-memory-target {}", 458 * MIB)));
        assert!(line.contains(&format!("--osd-memory-base {}", 254 * MIB)));
        assert!(line.contains(&format!("--osd-memory-cache-min {}", 356 * MIB)));
        assert!(line.ends_with("--bluestore-block-size 10737418240"));
    }

    #[tokio::test]
    async fn test_directory_mode_first_run() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let ctx = context(tmp.path(), runner.clone());

        drive(&OsdStep, &ctx).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].contains("auth get-or-create osd.0 mon allow profile osd osd allow *"));
        assert!(calls[1].contains("--mkfs -i 0 --osd-data"));
        assert!(calls[2].starts_with("ceph-osd --setuser ceph --setgroup ceph -i 0"));
        assert!(ctx.layout.osd_data_dir().is_dir());
    }

    #[tokio::test]
    async fn test_block_size_override_in_directory_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let config = BootstrapConfig::default().with_bluestore_block_size(Some(1 << 30));
        let ctx = context_with(tmp.path(), runner.clone(), config);
        touch(&ctx.layout.osd_keyring());

        OsdStep.start(&ctx).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with("--bluestore-block-size 1073741824"));
    }

    #[tokio::test]
    async fn test_regular_file_is_not_a_device() {
        let tmp = tempfile::tempdir().unwrap();
        let fake_device = tmp.path().join("disk.img");
        std::fs::write(&fake_device, b"").unwrap();

        let runner = FakeRunner::new();
        let config = BootstrapConfig::default().with_osd_device(Some(fake_device));
        let ctx = context_with(tmp.path(), runner.clone(), config);

        let err = drive(&OsdStep, &ctx).await.unwrap_err();

        assert!(matches!(err, CncoreError::Config(_)));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_activate_uses_listed_fsid() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner.respond("ceph-volume", LVM_LIST);
        let ctx = context(tmp.path(), runner.clone());

        activate_device(&ctx).await.unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "ceph-volume lvm list --format json".to_string(),
                "ceph-volume lvm activate --no-systemd --bluestore 0 2a1b7d3e-0c4f-4a8e-9d61-5b7e2f1c9a00"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_probe_device_size() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner.respond("blockdev", "21474836480\n");
        let ctx = context(tmp.path(), runner.clone());

        let size = probe_device_size(&ctx, Path::new("/dev/sdb")).await.unwrap();

        assert_eq!(size, 20 * 1024 * MIB);
        assert_eq!(runner.calls(), vec!["blockdev --getsize64 /dev/sdb".to_string()]);
    }
}
