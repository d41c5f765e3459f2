//! Final stage: forward cluster health until the stream ends.

use super::{log_task_error, task_start};
use crate::bootstrap::types::BootstrapCtx;
use crate::health::watch_health;
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use cncore_shared::errors::CncoreResult;

pub struct HealthTask;

#[async_trait]
impl PipelineTask<BootstrapCtx> for HealthTask {
    async fn run(self: Box<Self>, ctx: BootstrapCtx) -> CncoreResult<()> {
        let task_name = self.name();
        task_start(&ctx, task_name);

        let summary = watch_health(&ctx.health, ctx.sink.clone())
            .await
            .inspect_err(|e| log_task_error(task_name, e))?;

        tracing::info!(
            stdout_lines = summary.stdout_lines,
            stderr_lines = summary.stderr_lines,
            "Health stream ended"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "health"
    }
}
