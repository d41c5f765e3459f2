//! Dashboard bootstrap: unpack, template, launch in the background.

use super::BootstrapStep;
use super::rgw::{GatewayCredentials, ensure_gateway_user};
use crate::bootstrap::types::{BootstrapContext, DaemonRole};
use crate::command::Invocation;
use crate::constants::paths;
use crate::fs::{ensure_dir, replace_in_file};
use async_trait::async_trait;
use cncore_shared::errors::{CncoreError, CncoreResult};
use flate2::read::GzDecoder;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct DashboardStep;

#[async_trait]
impl BootstrapStep for DashboardStep {
    fn role(&self) -> DaemonRole {
        DaemonRole::Dashboard
    }

    /// Appears only once the unpacked tree is fully templated.
    fn marker(&self, ctx: &BootstrapContext) -> PathBuf {
        ctx.layout.dashboard_extract_dir().to_path_buf()
    }

    async fn ensure_initialized(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let credentials = ensure_gateway_user(ctx).await?;

        tracing::info!("init dashboard: run prerequisites");
        let target = ctx.layout.dashboard_extract_dir();
        let parent = target
            .parent()
            .ok_or_else(|| CncoreError::Internal(format!("{} has no parent", target.display())))?;
        ensure_dir(parent, None)?;

        let staging = tempfile::Builder::new()
            .prefix(".sree-")
            .tempdir_in(parent)
            .map_err(|e| {
                CncoreError::Filesystem(format!(
                    "Failed to create staging directory in {}: {}",
                    parent.display(),
                    e
                ))
            })?;

        let archive = ctx.layout.dashboard_archive().to_path_buf();
        let into = staging.path().to_path_buf();
        tokio::task::spawn_blocking(move || unpack_archive(&archive, &into))
            .await
            .map_err(|e| CncoreError::Internal(format!("unpack task panicked: {}", e)))??;

        tracing::info!("init dashboard: configure dashboard");
        configure(
            &staging.path().join(paths::DASHBOARD_APP_DIR),
            ctx,
            &credentials,
        )?;

        std::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))?;
        std::fs::rename(staging.path(), target).map_err(|e| {
            CncoreError::Filesystem(format!(
                "Failed to move {} into {}: {}",
                staging.path().display(),
                target.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn start(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let port = ctx.config.dash_port;
        tracing::info!(port, "init dashboard: running dashboard on port {}", port);

        let pid = ctx.runner.spawn_detached(
            &Invocation::new("python")
                .arg("app.py")
                .current_dir(ctx.layout.dashboard_app_dir()),
        )?;
        tracing::debug!(pid, "Dashboard launched");
        Ok(())
    }
}

fn unpack_archive(archive: &Path, into: &Path) -> CncoreResult<()> {
    let file = std::fs::File::open(archive).map_err(|e| {
        CncoreError::Filesystem(format!("Failed to open {}: {}", archive.display(), e))
    })?;

    tar::Archive::new(GzDecoder::new(file))
        .unpack(into)
        .map_err(|e| {
            CncoreError::Filesystem(format!(
                "Failed to unpack {} into {}: {}",
                archive.display(),
                into.display(),
                e
            ))
        })
}

/// Point the unpacked app at the gateway.
///
/// Placeholders are replaced in place; `sree.cfg` is a hard link of the
/// shipped sample.
fn configure(
    app_dir: &Path,
    ctx: &BootstrapContext,
    credentials: &GatewayCredentials,
) -> CncoreResult<()> {
    let base_js = app_dir.join("static").join("js").join("base.js");
    replace_in_file(&base_js, "ENDPOINT", &ctx.config.dashboard_endpoint())?;
    replace_in_file(&base_js, "ACCESS_KEY", &credentials.access_key)?;
    replace_in_file(&base_js, "SECRET_KEY", &credentials.secret_key)?;

    let sample = app_dir.join("sree.cfg.sample");
    let cfg = app_dir.join("sree.cfg");
    std::fs::hard_link(&sample, &cfg).map_err(|e| {
        CncoreError::Filesystem(format!(
            "Failed to link {} to {}: {}",
            cfg.display(),
            sample.display(),
            e
        ))
    })?;
    replace_in_file(&cfg, "RGW_CIVETWEB_PORT_VALUE", &ctx.config.rgw_port.to_string())?;
    replace_in_file(&cfg, "SREE_PORT_VALUE", &ctx.config.dash_port.to_string())
}
