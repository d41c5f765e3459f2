//! Cluster configuration and keyring text.
//!
//! Both renderers are pure: the same inputs always produce the same bytes.

use crate::constants::{mon, osd, rgw};
use crate::layout::ClusterLayout;

/// Inputs of the shared `ceph.conf`.
#[derive(Debug, Clone)]
pub struct ClusterConfig<'a> {
    /// Cluster identifier, minted once at first monitor bootstrap.
    pub fsid: &'a str,
    pub hostname: &'a str,
    pub rgw_port: u16,
    pub layout: &'a ClusterLayout,
}

impl ClusterConfig<'_> {
    pub fn render(&self) -> String {
        let host = self.hostname;
        format!(
            r#"
[global]
fsid = {fsid}
mon initial members = {host}
mon host = {mon_ip}
osd crush chooseleaf type = {chooseleaf}
osd journal size = {journal}
public network = 0.0.0.0/0
cluster network = 0.0.0.0/0
log file = /dev/null
osd pool default size = {pool_size}
osd data = {osd_data}
osd objectstore = {objectstore}

[client.rgw.{host}]
rgw dns name = {host}
rgw enable usage log = {usage_log}
rgw usage log tick interval = {tick}
rgw usage log flush threshold = {flush}
rgw usage max shards = {shards}
rgw usage max user shards = {user_shards}
log file = {rgw_log}
rgw frontends = {engine} port=0.0.0.0:{port}
rgw enable static website = true

[client.rgw.{host}.static]
rgw dns name = {host}
rgw dns s3website name = {host}.static
rgw enable apis = s3, s3website
rgw resolve cname = true
"#,
            fsid = self.fsid,
            mon_ip = mon::IP,
            chooseleaf = osd::CRUSH_CHOOSELEAF_TYPE,
            journal = osd::JOURNAL_SIZE,
            pool_size = osd::POOL_DEFAULT_SIZE,
            osd_data = self.layout.osd_data_dir().display(),
            objectstore = osd::OBJECTSTORE,
            usage_log = rgw::ENABLE_USAGE_LOG,
            tick = rgw::USAGE_LOG_TICK_INTERVAL,
            flush = rgw::USAGE_LOG_FLUSH_THRESHOLD,
            shards = rgw::USAGE_MAX_SHARDS,
            user_shards = rgw::USAGE_MAX_USER_SHARDS,
            rgw_log = self.layout.rgw_log_file(host).display(),
            engine = rgw::ENGINE,
            port = self.rgw_port,
        )
    }
}

/// Initial monitor keyring holding `secret`.
pub fn mon_initial_keyring(secret: &str) -> String {
    format!("\n[mon.]\n\tkey = {}\n\tcaps mon = \"allow *\"\n", secret)
}

/// Fresh cluster identifier.
pub fn generate_fsid() -> String {
    uuid::Uuid::new_v4().to_string()
}
