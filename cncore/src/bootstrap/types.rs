//! Type definitions for the bootstrap pipeline.

use crate::command::{CommandOutput, CommandRunner, Invocation};
use crate::config::BootstrapConfig;
use crate::fs::Owner;
use crate::health::{LineSink, health_invocation};
use crate::layout::ClusterLayout;
use cncore_shared::errors::{CncoreError, CncoreResult};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Daemon roles, declared in bootstrap order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DaemonRole {
    Mon,
    Mgr,
    Osd,
    Rgw,
    Dashboard,
}

impl DaemonRole {
    /// Fixed global order; any subset of it respects role dependencies.
    pub const ALL: [DaemonRole; 5] = [
        DaemonRole::Mon,
        DaemonRole::Mgr,
        DaemonRole::Osd,
        DaemonRole::Rgw,
        DaemonRole::Dashboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonRole::Mon => "mon",
            DaemonRole::Mgr => "mgr",
            DaemonRole::Osd => "osd",
            DaemonRole::Rgw => "rgw",
            DaemonRole::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for DaemonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DaemonRole {
    type Err = CncoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mon" => Ok(DaemonRole::Mon),
            "mgr" => Ok(DaemonRole::Mgr),
            "osd" => Ok(DaemonRole::Osd),
            "rgw" => Ok(DaemonRole::Rgw),
            "dash" | "dashboard" => Ok(DaemonRole::Dashboard),
            other => Err(CncoreError::Config(format!(
                "unknown daemon {:?}, valid choices are: mon, mgr, osd, rgw, dash, health",
                other
            ))),
        }
    }
}

/// One entry of `--daemon`: a role or the `health` pseudo-role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSelector {
    Role(DaemonRole),
    Health,
}

impl FromStr for DaemonSelector {
    type Err = CncoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "health" {
            return Ok(DaemonSelector::Health);
        }
        s.parse().map(DaemonSelector::Role)
    }
}

/// What a run was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapRequest {
    /// Every role in order, then watch health.
    All,
    /// Only watch health.
    Health,
    /// A subset of roles, run in global order.
    Roles(BTreeSet<DaemonRole>),
}

impl BootstrapRequest {
    /// Resolve `--daemon` selectors.
    ///
    /// No selectors means [`BootstrapRequest::All`]; `health` anywhere in the
    /// list means [`BootstrapRequest::Health`] and the roles are skipped.
    pub fn from_selectors(selectors: &[DaemonSelector]) -> Self {
        if selectors.is_empty() {
            return BootstrapRequest::All;
        }

        if selectors.contains(&DaemonSelector::Health) {
            if selectors.len() > 1 {
                tracing::warn!("health was requested, other daemons are skipped");
            }
            return BootstrapRequest::Health;
        }

        BootstrapRequest::Roles(
            selectors
                .iter()
                .filter_map(|s| match s {
                    DaemonSelector::Role(role) => Some(*role),
                    DaemonSelector::Health => None,
                })
                .collect(),
        )
    }

    /// Roles to bootstrap, in execution order.
    pub fn roles(&self) -> Vec<DaemonRole> {
        match self {
            BootstrapRequest::All => DaemonRole::ALL.to_vec(),
            BootstrapRequest::Health => Vec::new(),
            BootstrapRequest::Roles(requested) => DaemonRole::ALL
                .into_iter()
                .filter(|role| requested.contains(role))
                .collect(),
        }
    }

    pub fn watches_health(&self) -> bool {
        matches!(self, BootstrapRequest::All | BootstrapRequest::Health)
    }
}

/// Initialization state of a role, derived from its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    Uninitialized,
    Initialized,
}

/// Shared bootstrap pipeline context.
///
/// Immutable for the duration of a run; tasks receive it behind an `Arc`.
pub struct BootstrapContext {
    pub config: BootstrapConfig,
    pub layout: ClusterLayout,
    pub hostname: String,
    pub runner: Arc<dyn CommandRunner>,
    /// Where the health watcher forwards lines.
    pub sink: Arc<dyn LineSink>,
    /// Long-lived health stream command, `ceph -w` unless overridden.
    pub health: Invocation,
}

pub type BootstrapCtx = Arc<BootstrapContext>;

impl BootstrapContext {
    pub fn new(
        config: BootstrapConfig,
        layout: ClusterLayout,
        hostname: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn LineSink>,
    ) -> Self {
        Self {
            config,
            layout,
            hostname: hostname.into(),
            runner,
            sink,
            health: health_invocation(),
        }
    }

    pub fn with_health(mut self, health: Invocation) -> Self {
        self.health = health;
        self
    }

    /// Context for this host, resolving its hostname.
    pub fn for_local_host(
        config: BootstrapConfig,
        layout: ClusterLayout,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn LineSink>,
    ) -> CncoreResult<Self> {
        let hostname = local_hostname()?;
        Ok(Self::new(config, layout, hostname, runner, sink))
    }

    pub fn owner(&self) -> Option<Owner> {
        self.config.owner
    }

    pub async fn run(&self, invocation: &Invocation) -> CncoreResult<CommandOutput> {
        self.runner.run(invocation).await
    }
}

fn local_hostname() -> CncoreResult<String> {
    nix::unistd::gethostname()
        .map_err(|e| CncoreError::Environment(format!("failed to get the hostname: {}", e)))?
        .into_string()
        .map_err(|raw| CncoreError::Environment(format!("hostname is not UTF-8: {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("mon".parse::<DaemonRole>().unwrap(), DaemonRole::Mon);
        assert_eq!("dash".parse::<DaemonRole>().unwrap(), DaemonRole::Dashboard);
        assert_eq!(
            "dashboard".parse::<DaemonRole>().unwrap(),
            DaemonRole::Dashboard
        );
        assert!("mds".parse::<DaemonRole>().is_err());
        assert_eq!(
            "health".parse::<DaemonSelector>().unwrap(),
            DaemonSelector::Health
        );
    }

    #[test]
    fn test_all_is_declaration_order() {
        let mut sorted = DaemonRole::ALL;
        sorted.sort();
        assert_eq!(sorted, DaemonRole::ALL);
    }

    #[test]
    fn test_empty_selectors_mean_all() {
        let request = BootstrapRequest::from_selectors(&[]);
        assert_eq!(request, BootstrapRequest::All);
        assert_eq!(request.roles(), DaemonRole::ALL.to_vec());
        assert!(request.watches_health());
    }

    #[test]
    fn test_subset_follows_global_order() {
        let request = BootstrapRequest::from_selectors(&[
            DaemonSelector::Role(DaemonRole::Rgw),
            DaemonSelector::Role(DaemonRole::Mon),
        ]);
        assert_eq!(request.roles(), vec![DaemonRole::Mon, DaemonRole::Rgw]);
        assert!(!request.watches_health());
    }

    #[test]
    fn test_duplicates_collapse() {
        let request = BootstrapRequest::from_selectors(&[
            DaemonSelector::Role(DaemonRole::Osd),
            DaemonSelector::Role(DaemonRole::Osd),
        ]);
        assert_eq!(request.roles(), vec![DaemonRole::Osd]);
    }

    #[test]
    fn test_health_skips_roles() {
        let request = BootstrapRequest::from_selectors(&[
            DaemonSelector::Role(DaemonRole::Mon),
            DaemonSelector::Health,
        ]);
        assert_eq!(request, BootstrapRequest::Health);
        assert!(request.roles().is_empty());
        assert!(request.watches_health());
    }

    #[test]
    fn test_local_hostname_resolves() {
        assert!(!local_hostname().unwrap().is_empty());
    }
}
