//! Generic table-driven pipeline execution framework.
//!
//! ## Architecture
//!
//! ```text
//! Pipeline → Stages → Tasks
//!
//! - Pipeline: Orchestrates execution of all stages, in order
//! - Stage: Groups related tasks under a label (one stage per daemon role)
//! - Task: Atomic unit of work
//! ```
//!
//! Stages and tasks run strictly one after another. A later task may rely on
//! filesystem state written by an earlier one, so nothing here runs
//! concurrently, and the first failing task aborts the whole pipeline.
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineBuilder, PipelineExecutor, Stage};
//!
//! let plan = ExecutionPlan::new(vec![
//!     Stage::new("mon", vec![Box::new(TaskA)]),
//!     Stage::new("mgr", vec![Box::new(TaskB)]),
//! ]);
//!
//! let pipeline = PipelineBuilder::from_plan(plan);
//! let metrics = PipelineExecutor::execute(pipeline, ctx).await?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod stage;
mod task;

pub use metrics::{PipelineMetrics, StageMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, Pipeline, PipelineBuilder, PipelineExecutor};
pub use stage::Stage;
pub use task::{BoxedTask, PipelineTask};
