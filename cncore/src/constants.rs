//! Cluster-wide constants.
//!
//! Centralized location for fixed paths, identities and daemon tunables.

/// Default filesystem locations.
pub mod paths {
    pub const DATA_DIR: &str = "/var/lib/ceph";
    pub const CONFIG_DIR: &str = "/etc/ceph";
    pub const LOG_DIR: &str = "/var/log/ceph";

    /// JSON document describing the provisioned gateway user.
    pub const CREDENTIALS_FILE: &str = "/tmp/cn_user_details";

    /// Location where the `cn` client looks for the gateway user credentials.
    pub const CREDENTIALS_LINK: &str = "/nano_user_details";

    pub const DASHBOARD_ARCHIVE: &str = "/opt/ceph-container/tmp/sree.tar.gz";
    pub const DASHBOARD_EXTRACT_DIR: &str = "/opt/ceph-container/sree";

    /// Top-level directory inside the dashboard archive.
    pub const DASHBOARD_APP_DIR: &str = "Sree-0.1";
}

/// Ownership applied to daemon data, keyrings and config.
pub mod owner {
    /// `ceph` user id on CentOS-based images.
    pub const CEPH_UID: u32 = 167;
    /// `ceph` group id on CentOS-based images.
    pub const CEPH_GID: u32 = 167;
}

/// Monitor settings.
pub mod mon {
    pub const IP: &str = "127.0.0.1";
    pub const PORT: u16 = 6789;
}

/// Object storage daemon settings.
pub mod osd {
    pub const ID: &str = "0";
    pub const CRUSH_CHOOSELEAF_TYPE: &str = "0";
    pub const JOURNAL_SIZE: &str = "100";
    pub const POOL_DEFAULT_SIZE: &str = "1";
    pub const OBJECTSTORE: &str = "bluestore";

    /// Bluestore block file size when no device size is known (10 GiB).
    pub const DEFAULT_BLUESTORE_BLOCK_SIZE: u64 = 10 * 1024 * 1024 * 1024;
}

/// Gateway settings.
pub mod rgw {
    pub const DEFAULT_PORT: u16 = 8000;
    pub const ENGINE: &str = "civetweb";
    pub const ENABLE_USAGE_LOG: &str = "true";
    pub const USAGE_LOG_TICK_INTERVAL: &str = "1";
    pub const USAGE_LOG_FLUSH_THRESHOLD: &str = "1";
    pub const USAGE_MAX_SHARDS: &str = "32";
    pub const USAGE_MAX_USER_SHARDS: &str = "1";

    /// Uid of the S3 user provisioned for clients and the dashboard.
    pub const USER_UID: &str = "cn";
    pub const USER_DISPLAY_NAME: &str = "Ceph Nano user";
    pub const USER_CAPS: &str = "buckets=*;users=*;usage=*;metadata=*";
}

/// Dashboard settings.
pub mod dashboard {
    pub const DEFAULT_PORT: u16 = 5000;
    pub const DEFAULT_EXPOSED_IP: &str = "127.0.0.1";
}

/// Host resource floors checked before any role runs.
pub mod limits {
    /// Minimum memory, in MiB.
    pub const MEMORY_MIN_MIB: u64 = 512;

    /// Minimum free space for a dedicated bluestore directory (10 GiB).
    pub const BLUESTORE_SIZE_MIN: u64 = 10 * 1024 * 1024 * 1024;
}
