#[derive(Debug, Clone)]
pub struct TaskMetrics {
    pub name: String,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub struct StageMetrics {
    pub index: usize,
    pub label: String,
    pub duration_ms: u128,
    pub tasks: Vec<TaskMetrics>,
}

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_duration_ms: u128,
    pub stages: Vec<StageMetrics>,
}

impl PipelineMetrics {
    /// Names of every task that ran, in execution order.
    pub fn task_names(&self) -> Vec<&str> {
        self.stages
            .iter()
            .flat_map(|stage| stage.tasks.iter())
            .map(|task| task.name.as_str())
            .collect()
    }

    pub fn log_stages(&self) {
        for stage in &self.stages {
            for task in &stage.tasks {
                tracing::debug!(
                    task = %task.name,
                    duration_ms = task.duration_ms as u64,
                    "Task completed"
                );
            }
            tracing::info!(
                stage = %stage.label,
                duration_ms = stage.duration_ms as u64,
                tasks = stage.tasks.len(),
                "Stage completed"
            );
        }
        tracing::info!(
            total_ms = self.total_duration_ms as u64,
            "Bootstrap pipeline completed"
        );
    }
}
