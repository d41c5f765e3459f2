//! Run configuration.
//!
//! Built once at the start of a run from command-line flags and environment
//! overrides, then shared read-only by every bootstrap step.

use crate::constants::{dashboard, owner, rgw};
use crate::fs::Owner;
use cncore_shared::errors::{CncoreError, CncoreResult};
use std::path::PathBuf;

/// Immutable settings for one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Gateway (civetweb) binding port.
    pub rgw_port: u16,
    /// Dashboard binding port.
    pub dash_port: u16,
    /// Address clients use to reach the gateway from the dashboard.
    pub dash_exposed_ip: String,
    /// Block device backing the OSD; directory mode when unset.
    pub osd_device: Option<PathBuf>,
    /// Explicit bluestore block size, overriding the device probe.
    pub bluestore_block_size: Option<u64>,
    /// Dedicated directory whose free space is validated before running.
    pub osd_path: Option<PathBuf>,
    /// Owner applied to daemon files; `None` leaves ownership untouched.
    pub owner: Option<Owner>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            rgw_port: rgw::DEFAULT_PORT,
            dash_port: dashboard::DEFAULT_PORT,
            dash_exposed_ip: dashboard::DEFAULT_EXPOSED_IP.to_string(),
            osd_device: None,
            bluestore_block_size: None,
            osd_path: None,
            owner: Some(Owner::new(owner::CEPH_UID, owner::CEPH_GID)),
        }
    }
}

impl BootstrapConfig {
    pub fn with_rgw_port(mut self, port: u16) -> Self {
        self.rgw_port = port;
        self
    }

    pub fn with_dash_port(mut self, port: u16) -> Self {
        self.dash_port = port;
        self
    }

    pub fn with_dash_exposed_ip(mut self, ip: impl Into<String>) -> Self {
        self.dash_exposed_ip = ip.into();
        self
    }

    pub fn with_osd_device(mut self, device: Option<PathBuf>) -> Self {
        self.osd_device = device;
        self
    }

    pub fn with_bluestore_block_size(mut self, size: Option<u64>) -> Self {
        self.bluestore_block_size = size;
        self
    }

    pub fn with_osd_path(mut self, path: Option<PathBuf>) -> Self {
        self.osd_path = path;
        self
    }

    /// Skip ownership changes (unprivileged runs and tests).
    pub fn without_owner(mut self) -> Self {
        self.owner = None;
        self
    }

    /// `host:port` endpoint the dashboard points S3 clients at.
    pub fn dashboard_endpoint(&self) -> String {
        format!("{}:{}", self.dash_exposed_ip, self.rgw_port)
    }
}

/// Parse a byte size such as `10737418240`, `512M` or `10GiB`.
///
/// Suffixes are binary multiples and case-insensitive.
pub fn parse_size(value: &str) -> CncoreResult<u64> {
    let trimmed = value.trim();
    let invalid = || CncoreError::Config(format!("invalid size: {:?}", value));

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }
    let number: u64 = digits.parse().map_err(|_| invalid())?;

    let shift = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" | "KB" | "KIB" => 10,
        "M" | "MB" | "MIB" => 20,
        "G" | "GB" | "GIB" => 30,
        "T" | "TB" | "TIB" => 40,
        _ => return Err(invalid()),
    };

    number.checked_mul(1u64 << shift).ok_or_else(invalid)
}
