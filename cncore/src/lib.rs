//! Bootstrap a single-node Ceph cluster.
//!
//! Brings up monitor, manager, OSD, gateway and dashboard in a fixed order,
//! each idempotently, then forwards the cluster health stream until it ends.
//!
//! ```ignore
//! let config = BootstrapConfig::default().with_rgw_port(8080);
//! resources::preflight(&config)?;
//!
//! let ctx = BootstrapContext::for_local_host(
//!     config,
//!     ClusterLayout::default(),
//!     Arc::new(HostRunner),
//!     Arc::new(StdoutSink),
//! )?;
//! bootstrap::run(&BootstrapRequest::All, Arc::new(ctx)).await?;
//! ```

pub mod bootstrap;
pub mod command;
pub mod conf;
pub mod config;
pub mod constants;
pub mod fs;
pub mod health;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod resources;
pub mod secret;

pub use bootstrap::{BootstrapContext, BootstrapRequest, DaemonRole, DaemonSelector};
pub use cncore_shared::errors::{CncoreError, CncoreResult};
pub use command::{CommandRunner, HostRunner, Invocation};
pub use config::BootstrapConfig;
pub use health::{LineSink, StdoutSink};
pub use layout::ClusterLayout;
