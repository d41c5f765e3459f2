//! Manager bootstrap.

use super::BootstrapStep;
use crate::bootstrap::types::{BootstrapContext, DaemonRole};
use crate::command::Invocation;
use crate::fs::{ensure_dir, set_owner};
use async_trait::async_trait;
use cncore_shared::errors::CncoreResult;
use std::path::PathBuf;

pub struct MgrStep;

#[async_trait]
impl BootstrapStep for MgrStep {
    fn role(&self) -> DaemonRole {
        DaemonRole::Mgr
    }

    fn marker(&self, ctx: &BootstrapContext) -> PathBuf {
        ctx.layout.mgr_keyring(&ctx.hostname)
    }

    async fn ensure_initialized(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let layout = &ctx.layout;

        tracing::info!("init mgr: run prerequisites");
        ensure_dir(&layout.mgr_data_dir(&ctx.hostname), ctx.owner())?;

        tracing::info!("init mgr: fetching admin keyring");
        let admin_keyring = layout.admin_keyring();
        ctx.run(
            &Invocation::new("ceph")
                .args(["-n", "mon.", "-k"])
                .path(&layout.mon_keyring(&ctx.hostname))
                .args(["auth", "get-or-create", "client.admin", "-o"])
                .path(&admin_keyring),
        )
        .await?;
        set_owner(&admin_keyring, ctx.owner())?;

        tracing::info!("init mgr: generating manager keyring");
        let keyring = self.marker(ctx);
        ctx.run(
            &Invocation::new("ceph")
                .args(["auth", "get-or-create"])
                .arg(format!("mgr.{}", ctx.hostname))
                .args(["mon", "allow *", "-o"])
                .path(&keyring),
        )
        .await?;
        set_owner(&keyring, ctx.owner())
    }

    async fn start(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        tracing::info!("init mgr: running manager");
        ctx.run(
            &Invocation::new("ceph-mgr")
                .args(["--setuser", "ceph", "--setgroup", "ceph", "-i"])
                .arg(ctx.hostname.as_str()),
        )
        .await?;
        Ok(())
    }
}
