//! Monitor bootstrap: keyring, cluster config, monitor map and store.

use super::BootstrapStep;
use crate::bootstrap::types::{BootstrapContext, DaemonRole};
use crate::command::Invocation;
use crate::conf::{ClusterConfig, generate_fsid, mon_initial_keyring};
use crate::constants::mon;
use crate::fs::{ensure_dir, set_owner, write_file};
use crate::secret::generate_secret;
use async_trait::async_trait;
use cncore_shared::errors::CncoreResult;
use std::path::PathBuf;

pub struct MonStep;

#[async_trait]
impl BootstrapStep for MonStep {
    fn role(&self) -> DaemonRole {
        DaemonRole::Mon
    }

    /// Written by the monitor mkfs.
    fn marker(&self, ctx: &BootstrapContext) -> PathBuf {
        ctx.layout.mon_keyring(&ctx.hostname)
    }

    async fn ensure_initialized(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let layout = &ctx.layout;
        let data_dir = layout.mon_data_dir(&ctx.hostname);

        tracing::info!("init mon: run prerequisites");
        ensure_dir(&data_dir, ctx.owner())?;
        ensure_dir(layout.config_dir(), None)?;

        tracing::info!("init mon: writing monitor initial keyring");
        let keyring = layout.mon_initial_keyring();
        write_file(&keyring, mon_initial_keyring(&generate_secret()?).as_bytes(), 0o600)?;
        set_owner(&keyring, ctx.owner())?;

        tracing::info!("init mon: writing ceph configuration file");
        let fsid = generate_fsid();
        let conf = ClusterConfig {
            fsid: &fsid,
            hostname: &ctx.hostname,
            rgw_port: ctx.config.rgw_port,
            layout,
        };
        let conf_file = layout.conf_file();
        write_file(&conf_file, conf.render().as_bytes(), 0o644)?;
        set_owner(&conf_file, ctx.owner())?;
        tracing::debug!(fsid = %fsid, path = %conf_file.display(), "Cluster config written");

        tracing::info!("init mon: generating monitor map");
        let monmap = layout.monmap();
        ctx.run(
            &Invocation::new("monmaptool")
                .args(["--create", "--add", ctx.hostname.as_str()])
                .arg(public_addr())
                .args(["--fsid", fsid.as_str()])
                .path(&monmap),
        )
        .await?;
        set_owner(&monmap, ctx.owner())?;

        tracing::info!("init mon: populating monitor store");
        ctx.run(
            &Invocation::new("ceph-mon")
                .args(["--setuser", "ceph", "--setgroup", "ceph", "--mkfs"])
                .args(["-i", ctx.hostname.as_str()])
                .arg("--inject-monmap")
                .path(&monmap)
                .arg("--keyring")
                .path(&keyring)
                .arg("--mon-data")
                .path(&data_dir),
        )
        .await?;

        Ok(())
    }

    async fn start(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        tracing::info!("init mon: running monitor");
        ctx.run(
            &Invocation::new("ceph-mon")
                .args(["--setuser", "ceph", "--setgroup", "ceph"])
                .args(["-i", ctx.hostname.as_str()])
                .arg("--mon-data")
                .path(&ctx.layout.mon_data_dir(&ctx.hostname))
                .arg("--public-addr")
                .arg(public_addr()),
        )
        .await?;
        Ok(())
    }
}

fn public_addr() -> String {
    format!("{}:{}", mon::IP, mon::PORT)
}
