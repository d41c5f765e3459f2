//! Stage definition for table-driven pipeline execution.

/// A labelled group of tasks.
///
/// Stages are executed in order, and each stage's tasks are executed one
/// after another in the order given.
///
/// Generic over task type T to allow different pipeline implementations.
#[derive(Debug, Clone)]
pub struct Stage<T> {
    pub label: String,
    pub tasks: Vec<T>,
}

impl<T> Stage<T> {
    pub fn new(label: impl Into<String>, tasks: Vec<T>) -> Self {
        Self {
            label: label.into(),
            tasks,
        }
    }
}
