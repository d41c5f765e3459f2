//! Bootstrap tasks.
//!
//! Each daemon role is a two-state machine driven by its marker file:
//!
//! ```text
//! Uninitialized ──ensure_initialized()──→ Initialized ──start()──→ Running
//!       ▲                                     │
//!       └── marker absent                     └── marker present: init skipped
//! ```
//!
//! `ensure_initialized` runs at most once per data directory lifetime; the
//! marker is produced by its last step, so an interrupted initialization is
//! retried from scratch on the next run. `start` runs on every invocation.

mod dashboard;
mod health;
mod mgr;
mod mon;
mod osd;
mod rgw;

pub use dashboard::DashboardStep;
pub use health::HealthTask;
pub use mgr::MgrStep;
pub use mon::MonStep;
pub use osd::{OsdStep, osd_fsid_from_lvm_list};
pub use rgw::{GatewayCredentials, GatewayUserTask, RgwStep, ensure_gateway_user};

use crate::bootstrap::types::{BootstrapContext, BootstrapCtx, DaemonRole, RoleState};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use cncore_shared::errors::{CncoreError, CncoreResult};
use std::path::PathBuf;

/// Per-role bootstrap capability.
#[async_trait]
pub trait BootstrapStep: Send + Sync {
    fn role(&self) -> DaemonRole;

    /// Path whose existence means first-time initialization completed.
    fn marker(&self, ctx: &BootstrapContext) -> PathBuf;

    fn load_state(&self, ctx: &BootstrapContext) -> RoleState {
        if self.marker(ctx).exists() {
            RoleState::Initialized
        } else {
            RoleState::Uninitialized
        }
    }

    /// One-shot initialization; must leave the marker behind on success.
    async fn ensure_initialized(&self, ctx: &BootstrapContext) -> CncoreResult<()>;

    /// Launch the daemon. Safe to repeat.
    async fn start(&self, ctx: &BootstrapContext) -> CncoreResult<()>;
}

/// The bootstrap step for `role`.
pub fn bootstrap_step(role: DaemonRole) -> Box<dyn BootstrapStep> {
    match role {
        DaemonRole::Mon => Box::new(MonStep),
        DaemonRole::Mgr => Box::new(MgrStep),
        DaemonRole::Osd => Box::new(OsdStep),
        DaemonRole::Rgw => Box::new(RgwStep),
        DaemonRole::Dashboard => Box::new(DashboardStep),
    }
}

/// Initialize `step` if its marker is absent, then start it.
///
/// Returns the state observed before anything ran.
pub async fn drive(step: &dyn BootstrapStep, ctx: &BootstrapContext) -> CncoreResult<RoleState> {
    let state = step.load_state(ctx);

    match state {
        RoleState::Uninitialized => {
            tracing::info!(role = %step.role(), "Initializing");
            step.ensure_initialized(ctx).await?;
        }
        RoleState::Initialized => {
            tracing::debug!(
                role = %step.role(),
                marker = %step.marker(ctx).display(),
                "Already initialized, skipping"
            );
        }
    }

    step.start(ctx).await?;
    Ok(state)
}

/// Pipeline adapter running one role's state machine.
pub struct RoleTask {
    step: Box<dyn BootstrapStep>,
}

impl RoleTask {
    pub fn new(role: DaemonRole) -> Self {
        Self {
            step: bootstrap_step(role),
        }
    }
}

#[async_trait]
impl PipelineTask<BootstrapCtx> for RoleTask {
    async fn run(self: Box<Self>, ctx: BootstrapCtx) -> CncoreResult<()> {
        let task_name = self.name();
        task_start(&ctx, task_name);

        drive(self.step.as_ref(), &ctx)
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        Ok(())
    }

    fn name(&self) -> &str {
        self.step.role().as_str()
    }
}

pub(crate) fn task_start(ctx: &BootstrapContext, task_name: &str) {
    tracing::debug!(host = %ctx.hostname, task = task_name, "Task started");
}

pub(crate) fn log_task_error(task_name: &str, err: &CncoreError) {
    tracing::error!(task = task_name, error = %err, "Task failed");
}
