//! Gateway bootstrap and its S3 user.

use super::{BootstrapStep, log_task_error, task_start};
use crate::bootstrap::types::{BootstrapContext, BootstrapCtx, DaemonRole};
use crate::command::Invocation;
use crate::constants::rgw;
use crate::fs::{ensure_dir, set_owner};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use cncore_shared::errors::{CncoreError, CncoreResult};
use serde::Deserialize;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

pub struct RgwStep;

#[async_trait]
impl BootstrapStep for RgwStep {
    fn role(&self) -> DaemonRole {
        DaemonRole::Rgw
    }

    fn marker(&self, ctx: &BootstrapContext) -> PathBuf {
        ctx.layout.rgw_keyring(&ctx.hostname)
    }

    async fn ensure_initialized(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        tracing::info!("init rgw: run prerequisites");
        for dir in [
            ctx.layout.log_dir().to_path_buf(),
            ctx.layout.rgw_data_dir(&ctx.hostname),
        ] {
            ensure_dir(&dir, ctx.owner())?;
        }

        tracing::info!("init rgw: generating rgw keyring");
        let keyring = self.marker(ctx);
        ctx.run(
            &Invocation::new("ceph")
                .args(["auth", "get-or-create"])
                .arg(client_name(&ctx.hostname))
                .args(["mon", "allow rw", "osd", "allow rwx", "-o"])
                .path(&keyring),
        )
        .await?;
        set_owner(&keyring, ctx.owner())
    }

    async fn start(&self, ctx: &BootstrapContext) -> CncoreResult<()> {
        let port = ctx.config.rgw_port;
        tracing::info!(port, "init rgw: running rgw on port {}", port);

        ctx.run(
            &Invocation::new("radosgw")
                .args(["--setuser", "ceph", "--setgroup", "ceph", "-n"])
                .arg(client_name(&ctx.hostname))
                .arg("-k")
                .path(&self.marker(ctx))
                .args(["--rgw-dns-name", ctx.hostname.as_str()])
                .args(["--rgw-enable-usage-log", rgw::ENABLE_USAGE_LOG])
                .args(["--rgw-usage-log-tick-interval", rgw::USAGE_LOG_TICK_INTERVAL])
                .args(["--rgw-usage-log-flush-threshold", rgw::USAGE_LOG_FLUSH_THRESHOLD])
                .args(["--rgw-usage-max-shards", rgw::USAGE_MAX_SHARDS])
                .args(["--rgw-usage-max-user-shards", rgw::USAGE_MAX_USER_SHARDS])
                .arg("--log-file")
                .path(&ctx.layout.rgw_log_file(&ctx.hostname))
                .arg("--rgw-frontends")
                .arg(format!("{} endpoint=0.0.0.0:{}", rgw::ENGINE, port)),
        )
        .await?;
        Ok(())
    }
}

fn client_name(hostname: &str) -> String {
    format!("client.rgw.{}", hostname)
}

/// Keys of the provisioned gateway user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Deserialize)]
struct UserInfo {
    keys: Vec<UserKey>,
}

#[derive(Deserialize)]
struct UserKey {
    access_key: String,
    secret_key: String,
}

impl GatewayCredentials {
    /// First key pair of a `radosgw-admin user create` document.
    pub fn parse(json: &str) -> CncoreResult<Self> {
        let info: UserInfo = serde_json::from_str(json).map_err(|e| {
            CncoreError::Internal(format!("failed to parse gateway user details: {}", e))
        })?;

        let key = info
            .keys
            .into_iter()
            .next()
            .ok_or_else(|| CncoreError::Internal("gateway user has no keys".into()))?;

        Ok(Self {
            access_key: key.access_key,
            secret_key: key.secret_key,
        })
    }

    pub fn load(path: &Path) -> CncoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CncoreError::Filesystem(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }
}

/// Create the `cn` gateway user unless its credentials file already exists.
///
/// The compatibility link is put in place before the credentials file, which
/// only appears once fully written.
pub async fn ensure_gateway_user(ctx: &BootstrapContext) -> CncoreResult<GatewayCredentials> {
    let file = ctx.layout.credentials_file();
    if file.exists() {
        tracing::debug!(path = %file.display(), "Gateway user already provisioned");
        return GatewayCredentials::load(file);
    }

    tracing::info!("init rgw: creating rgw user");
    let output = ctx
        .run(
            &Invocation::new("radosgw-admin")
                .args(["user", "create"])
                .arg(format!("--uid={}", rgw::USER_UID))
                .arg(format!("--display-name={}", rgw::USER_DISPLAY_NAME))
                .arg(format!("--caps={}", rgw::USER_CAPS)),
        )
        .await?;
    let details = output.stdout_str();
    let credentials = GatewayCredentials::parse(&details)?;

    let parent = file
        .parent()
        .ok_or_else(|| CncoreError::Internal(format!("{} has no parent", file.display())))?;
    ensure_dir(parent, None)?;
    link_credentials(file, ctx.layout.credentials_link())?;
    persist_credentials(file, details.as_bytes())?;

    tracing::info!(user = rgw::USER_UID, path = %file.display(), "Gateway user created");
    Ok(credentials)
}

/// Point `link` at `target`, replacing whatever was there.
fn link_credentials(target: &Path, link: &Path) -> CncoreResult<()> {
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link).map_err(|e| {
            CncoreError::Filesystem(format!("Failed to remove {}: {}", link.display(), e))
        })?;
    }

    std::os::unix::fs::symlink(target, link).map_err(|e| {
        CncoreError::Filesystem(format!(
            "Failed to link {} to {}: {}",
            link.display(),
            target.display(),
            e
        ))
    })
}

fn persist_credentials(path: &Path, contents: &[u8]) -> CncoreResult<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let fs_err =
        |e: std::io::Error| CncoreError::Filesystem(format!("Failed to write {}: {}", path.display(), e));

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(fs_err)?;
    staged.write_all(contents).map_err(fs_err)?;
    staged
        .as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .map_err(fs_err)?;
    staged.persist(path).map_err(|e| fs_err(e.error))?;
    Ok(())
}

/// Provisions the gateway user right after the gateway starts.
pub struct GatewayUserTask;

#[async_trait]
impl PipelineTask<BootstrapCtx> for GatewayUserTask {
    async fn run(self: Box<Self>, ctx: BootstrapCtx) -> CncoreResult<()> {
        let task_name = self.name();
        task_start(&ctx, task_name);

        ensure_gateway_user(&ctx)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "rgw_user"
    }
}

#[cfg(test)]
mod tests {
    use super::super::drive;
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let creds = GatewayCredentials::parse(USER_JSON).unwrap();
        assert_eq!(creds.access_key, "AKIAEXAMPLE");
        assert_eq!(creds.secret_key, "s3cr3t/key");

        assert!(GatewayCredentials::parse(r#"{"keys": []}"#).is_err());
        assert!(GatewayCredentials::parse("").is_err());
    }

    #[tokio::test]
    async fn test_rgw_first_run() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let ctx = context(tmp.path(), runner.clone());

        drive(&RgwStep, &ctx).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("auth get-or-create client.rgw.toto mon allow rw osd allow rwx -o"));
        assert!(calls[1].starts_with("radosgw --setuser ceph --setgroup ceph -n client.rgw.toto -k"));
        assert!(calls[1].ends_with("--rgw-frontends civetweb endpoint=0.0.0.0:8000"));
        assert!(ctx.layout.log_dir().is_dir());
        assert!(ctx.layout.rgw_data_dir(HOST).is_dir());
    }

    #[tokio::test]
    async fn test_gateway_user_is_created_once() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let ctx = context(tmp.path(), runner.clone());

        let created = ensure_gateway_user(&ctx).await.unwrap();
        assert_eq!(created.access_key, "AKIAEXAMPLE");

        let file = ctx.layout.credentials_file();
        assert_eq!(std::fs::read_to_string(file).unwrap(), USER_JSON);
        let mode = std::fs::metadata(file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);

        let link = ctx.layout.credentials_link();
        assert_eq!(std::fs::read_link(link).unwrap(), file);
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls()[0].starts_with("radosgw-admin user create --uid=cn"));

        let again = ensure_gateway_user(&ctx).await.unwrap();
        assert_eq!(again, created);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_user_leaves_no_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner.respond("radosgw-admin", "could not create user");
        let ctx = context(tmp.path(), runner.clone());

        assert!(ensure_gateway_user(&ctx).await.is_err());
        assert!(!ctx.layout.credentials_file().exists());
    }

    #[tokio::test]
    async fn test_stale_link_is_replaced() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let ctx = context(tmp.path(), runner.clone());
        let link = ctx.layout.credentials_link();
        std::fs::create_dir_all(link.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink("/nowhere", link).unwrap();

        ensure_gateway_user(&ctx).await.unwrap();

        assert_eq!(std::fs::read_link(link).unwrap(), ctx.layout.credentials_file());
    }
}
