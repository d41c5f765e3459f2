//! Filesystem layout of a single-node cluster.

use crate::constants::{osd, paths};
use std::path::{Path, PathBuf};

/// Every path the orchestrator reads or writes.
///
/// Per-daemon locations are derived from three roots (data, config, log) plus
/// a handful of fixed artifacts. The default layout matches the container
/// image; [`ClusterLayout::rooted_at`] relocates everything under one
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLayout {
    data_dir: PathBuf,
    config_dir: PathBuf,
    log_dir: PathBuf,
    credentials_file: PathBuf,
    credentials_link: PathBuf,
    dashboard_archive: PathBuf,
    dashboard_extract_dir: PathBuf,
}

impl Default for ClusterLayout {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(paths::DATA_DIR),
            config_dir: PathBuf::from(paths::CONFIG_DIR),
            log_dir: PathBuf::from(paths::LOG_DIR),
            credentials_file: PathBuf::from(paths::CREDENTIALS_FILE),
            credentials_link: PathBuf::from(paths::CREDENTIALS_LINK),
            dashboard_archive: PathBuf::from(paths::DASHBOARD_ARCHIVE),
            dashboard_extract_dir: PathBuf::from(paths::DASHBOARD_EXTRACT_DIR),
        }
    }
}

impl ClusterLayout {
    /// Default layout with every absolute path re-rooted under `root`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let reroot = |p: &str| root.join(p.trim_start_matches('/'));
        Self {
            data_dir: reroot(paths::DATA_DIR),
            config_dir: reroot(paths::CONFIG_DIR),
            log_dir: reroot(paths::LOG_DIR),
            credentials_file: reroot(paths::CREDENTIALS_FILE),
            credentials_link: reroot(paths::CREDENTIALS_LINK),
            dashboard_archive: reroot(paths::DASHBOARD_ARCHIVE),
            dashboard_extract_dir: reroot(paths::DASHBOARD_EXTRACT_DIR),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    // ------------------------------------------------------------------
    // Shared config artifacts
    // ------------------------------------------------------------------

    pub fn conf_file(&self) -> PathBuf {
        self.config_dir.join("ceph.conf")
    }

    pub fn admin_keyring(&self) -> PathBuf {
        self.config_dir.join("ceph.client.admin.keyring")
    }

    pub fn mon_initial_keyring(&self) -> PathBuf {
        self.config_dir.join("initial-mon-keyring")
    }

    pub fn monmap(&self) -> PathBuf {
        self.config_dir.join("monmap")
    }

    // ------------------------------------------------------------------
    // Per-daemon data
    // ------------------------------------------------------------------

    pub fn mon_data_dir(&self, hostname: &str) -> PathBuf {
        self.data_dir.join("mon").join(format!("ceph-{}", hostname))
    }

    /// Written by the monitor mkfs; its presence means a monitor exists.
    pub fn mon_keyring(&self, hostname: &str) -> PathBuf {
        self.mon_data_dir(hostname).join("keyring")
    }

    pub fn mgr_data_dir(&self, hostname: &str) -> PathBuf {
        self.data_dir.join("mgr").join(format!("ceph-{}", hostname))
    }

    pub fn mgr_keyring(&self, hostname: &str) -> PathBuf {
        self.mgr_data_dir(hostname).join("keyring")
    }

    pub fn osd_data_dir(&self) -> PathBuf {
        self.data_dir.join("osd").join(format!("ceph-{}", osd::ID))
    }

    pub fn osd_keyring(&self) -> PathBuf {
        self.osd_data_dir().join("keyring")
    }

    pub fn bootstrap_osd_keyring(&self) -> PathBuf {
        self.data_dir.join("bootstrap-osd").join("ceph.keyring")
    }

    pub fn rgw_data_dir(&self, hostname: &str) -> PathBuf {
        self.data_dir
            .join("radosgw")
            .join(format!("ceph-rgw.{}", hostname))
    }

    pub fn rgw_keyring(&self, hostname: &str) -> PathBuf {
        self.rgw_data_dir(hostname).join("keyring")
    }

    pub fn rgw_log_file(&self, hostname: &str) -> PathBuf {
        self.log_dir.join(format!("client.rgw.{}.log", hostname))
    }

    // ------------------------------------------------------------------
    // Gateway user and dashboard
    // ------------------------------------------------------------------

    pub fn credentials_file(&self) -> &Path {
        &self.credentials_file
    }

    pub fn credentials_link(&self) -> &Path {
        &self.credentials_link
    }

    pub fn dashboard_archive(&self) -> &Path {
        &self.dashboard_archive
    }

    /// Extraction target; its presence marks the dashboard as initialized.
    pub fn dashboard_extract_dir(&self) -> &Path {
        &self.dashboard_extract_dir
    }

    pub fn dashboard_app_dir(&self) -> PathBuf {
        self.dashboard_extract_dir.join(paths::DASHBOARD_APP_DIR)
    }
}
