//! Cluster bootstrap orchestration.
//!
//! ## Architecture
//!
//! Bootstrap is table-driven: one stage per requested role, in the fixed
//! global order, optionally followed by the health watcher.
//!
//! ```text
//! All (no daemon selected):
//!   1. mon                  (keyring, ceph.conf, monmap, mkfs, run)
//!   2. mgr                  (admin keyring, mgr keyring, run)
//!   3. osd                  (keyring + mkfs or lvm prepare, run)
//!   4. rgw ── rgw_user      (keyring, run, then the S3 user)
//!   5. dashboard            (unpack + template, launch in background)
//!   6. health               (forward `ceph -w` until it exits)
//!
//! Roles(subset):
//!   the stages above for the selected roles only, same relative order,
//!   no health stage
//!
//! Health:
//!   1. health
//! ```
//!
//! Dependencies between roles are not verified up front: a role requested
//! on its own fails inside its external command when what it needs is
//! missing.

pub mod tasks;
mod types;

pub use types::{
    BootstrapContext, BootstrapCtx, BootstrapRequest, DaemonRole, DaemonSelector, RoleState,
};

use crate::pipeline::{
    BoxedTask, ExecutionPlan, PipelineBuilder, PipelineExecutor, PipelineMetrics, Stage,
};
use cncore_shared::errors::CncoreResult;
use tasks::{GatewayUserTask, HealthTask, RoleTask};

// ============================================================================
// EXECUTION PLAN
// ============================================================================

/// Stages for `request`, in execution order.
pub fn execution_plan(request: &BootstrapRequest) -> ExecutionPlan<BootstrapCtx> {
    let mut stages: Vec<Stage<BoxedTask<BootstrapCtx>>> = request
        .roles()
        .into_iter()
        .map(|role| {
            let mut stage_tasks: Vec<BoxedTask<BootstrapCtx>> =
                vec![Box::new(RoleTask::new(role))];
            // The S3 user can only be created once the gateway answers.
            if role == DaemonRole::Rgw {
                stage_tasks.push(Box::new(GatewayUserTask));
            }
            Stage::new(role.as_str(), stage_tasks)
        })
        .collect();

    if request.watches_health() {
        stages.push(Stage::new("health", vec![Box::new(HealthTask)]));
    }

    ExecutionPlan::new(stages)
}

/// Bootstrap the requested roles, then watch health if asked to.
///
/// Returns once the last stage is done; for a full run that is when the
/// health stream ends. The first failure aborts the run.
pub async fn run(request: &BootstrapRequest, ctx: BootstrapCtx) -> CncoreResult<PipelineMetrics> {
    if *request == BootstrapRequest::All {
        tracing::info!("init: no daemon was selected, bootstrapping all of them");
    }

    let plan = execution_plan(request);
    tracing::debug!(host = %ctx.hostname, stages = ?plan.labels(), "Bootstrap plan");

    let metrics = PipelineExecutor::execute(PipelineBuilder::from_plan(plan), ctx).await?;
    metrics.log_stages();
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::tasks::testing::*;
    use super::tasks::{BootstrapStep, MonStep, RgwStep, drive};
    use super::*;
    use cncore_shared::errors::CncoreError;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn roles(list: &[DaemonRole]) -> BootstrapRequest {
        BootstrapRequest::Roles(list.iter().copied().collect::<BTreeSet<_>>())
    }

    #[test]
    fn test_plan_orders_subset() {
        let plan = execution_plan(&roles(&[DaemonRole::Rgw, DaemonRole::Mon]));
        assert_eq!(plan.labels(), vec!["mon", "rgw"]);
        assert_eq!(plan.task_names(), vec!["mon", "rgw", "rgw_user"]);
    }

    #[test]
    fn test_plan_for_all() {
        let plan = execution_plan(&BootstrapRequest::All);
        assert_eq!(
            plan.task_names(),
            vec!["mon", "mgr", "osd", "rgw", "rgw_user", "dashboard", "health"]
        );
    }

    #[test]
    fn test_plan_for_health_only() {
        let plan = execution_plan(&BootstrapRequest::Health);
        assert_eq!(plan.task_names(), vec!["health"]);
    }

    #[tokio::test]
    async fn test_run_executes_mon_before_rgw() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let ctx = context(tmp.path(), runner.clone());

        let metrics = run(&roles(&[DaemonRole::Rgw, DaemonRole::Mon]), ctx)
            .await
            .unwrap();

        assert_eq!(metrics.task_names(), vec!["mon", "rgw", "rgw_user"]);
        let programs = runner.programs();
        let last_mon = programs.iter().rposition(|p| p == "ceph-mon").unwrap();
        let first_rgw = programs.iter().position(|p| p == "radosgw").unwrap();
        assert!(last_mon < first_rgw);
        assert_eq!(programs.last().map(String::as_str), Some("radosgw-admin"));
    }

    #[tokio::test]
    async fn test_failure_stops_later_roles() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner.fail_on("monmaptool");
        let ctx = context(tmp.path(), runner.clone());

        let result = run(&roles(&[DaemonRole::Mon, DaemonRole::Rgw]), ctx.clone()).await;

        assert!(result.is_err());
        assert_eq!(runner.programs(), vec!["monmaptool"]);
        assert_eq!(RgwStep.load_state(&ctx), RoleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_second_drive_skips_initialization() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let ctx = context(tmp.path(), runner.clone());

        assert_eq!(
            drive(&MonStep, &ctx).await.unwrap(),
            RoleState::Uninitialized
        );
        // the real mkfs leaves the keyring behind
        touch(&ctx.layout.mon_keyring(HOST));
        let conf = std::fs::read_to_string(ctx.layout.conf_file()).unwrap();
        runner.clear();

        assert_eq!(drive(&MonStep, &ctx).await.unwrap(), RoleState::Initialized);
        assert_eq!(runner.programs(), vec!["ceph-mon"]);
        assert_eq!(std::fs::read_to_string(ctx.layout.conf_file()).unwrap(), conf);
    }

    fn first(programs: &[String], program: &str) -> usize {
        programs
            .iter()
            .position(|p| p == program)
            .unwrap_or_else(|| panic!("{program} never ran: {programs:?}"))
    }

    #[tokio::test]
    async fn test_full_run_bootstraps_every_role_then_watches_health() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let sink = Arc::new(CollectSink::default());
        let ctx = watching_context(
            tmp.path(),
            runner.clone(),
            "echo HEALTH_OK; echo 'mon.toto calling election' >&2",
            sink.clone(),
        );
        write_dashboard_archive(ctx.layout.dashboard_archive());

        let metrics = run(&BootstrapRequest::All, ctx).await.unwrap();

        assert_eq!(
            metrics.task_names(),
            vec!["mon", "mgr", "osd", "rgw", "rgw_user", "dashboard", "health"]
        );
        let programs = runner.programs();
        let order: Vec<usize> = ["ceph-mon", "ceph-mgr", "ceph-osd", "radosgw", "radosgw-admin"]
            .into_iter()
            .map(|program| first(&programs, program))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{programs:?}");
        assert_eq!(runner.detached().len(), 1);

        let mut lines = sink.lines();
        lines.sort();
        assert_eq!(lines, vec!["HEALTH_OK", "mon.toto calling election"]);
    }

    #[tokio::test]
    async fn test_full_run_fails_when_health_stream_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let sink = Arc::new(CollectSink::default());
        let ctx = watching_context(
            tmp.path(),
            runner.clone(),
            "echo HEALTH_ERR; exit 1",
            sink.clone(),
        );
        write_dashboard_archive(ctx.layout.dashboard_archive());

        let err = run(&BootstrapRequest::All, ctx).await.unwrap_err();

        assert!(matches!(err, CncoreError::Stream(_)));
        assert!(runner.programs().contains(&"radosgw-admin".to_string()));
        assert_eq!(sink.lines(), vec!["HEALTH_ERR"]);
    }

    #[tokio::test]
    async fn test_health_request_runs_no_role() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let sink = Arc::new(CollectSink::default());
        let ctx = watching_context(tmp.path(), runner.clone(), "echo HEALTH_OK", sink.clone());

        let metrics = run(&BootstrapRequest::Health, ctx.clone()).await.unwrap();

        assert_eq!(metrics.task_names(), vec!["health"]);
        assert!(runner.calls().is_empty());
        assert!(runner.detached().is_empty());
        assert_eq!(sink.lines(), vec!["HEALTH_OK"]);
        for role in DaemonRole::ALL {
            assert_eq!(
                tasks::bootstrap_step(role).load_state(&ctx),
                RoleState::Uninitialized
            );
        }
    }
}
