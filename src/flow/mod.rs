//! Workflow-engine client surface.
//!
//! The orchestrator runs atop an external task-graph engine that schedules
//! tasks, persists intermediate values, and retries transient failures.
//! `TaskContext` is the slice of that engine's contract the task bodies here
//! need: per-task logging, typed output recording, and a call-site flag to
//! opt out of automatic retries for non-idempotent steps.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A typed value recorded by a task for the engine to persist.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    /// Name of the recorded value
    pub name: String,
    /// Serialized value
    pub value: serde_json::Value,
    /// When the value was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Execution context handed to every task body.
#[derive(Debug)]
pub struct TaskContext {
    name: String,
    started_at: DateTime<Utc>,
    retries_disabled: AtomicBool,
    outputs: Mutex<Vec<TaskOutput>>,
}

impl TaskContext {
    /// Create a context for a named flow run.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Utc::now(),
            retries_disabled: AtomicBool::new(false),
            outputs: Mutex::new(Vec::new()),
        }
    }

    /// Flow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// When this run started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Log a progress message attributed to this flow.
    pub fn info(&self, message: impl AsRef<str>) {
        log::info!("[{}] {}", self.name, message.as_ref());
    }

    /// Mark the current task non-retryable.
    ///
    /// Required before externally visible actions that are unsafe to re-run,
    /// such as tag creation: a transient failure must surface to a human
    /// instead of risking a duplicate tag at a different commit.
    pub fn disable_retries(&self) {
        self.retries_disabled.store(true, Ordering::SeqCst);
    }

    /// Whether retries were disabled at some point during the run.
    pub fn retries_disabled(&self) -> bool {
        self.retries_disabled.load(Ordering::SeqCst)
    }

    /// Record a typed intermediate value for the engine to persist.
    pub fn record_output<T: Serialize>(&self, name: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let mut outputs = self
            .outputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        outputs.push(TaskOutput {
            name: name.into(),
            value,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    /// Snapshot of all recorded outputs.
    pub fn outputs(&self) -> Vec<TaskOutput> {
        self.outputs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Blocking human approval before any mutation.
pub trait ApprovalGate {
    /// Resolve once the coordinator approves; error to abort the flow.
    fn approve(&self, ctx: &TaskContext) -> impl Future<Output = Result<()>>;
}

/// Poll `poll` every `period` until it yields a value or a definitive error.
///
/// The loop never polls faster than `period`; cancellation propagates from
/// the caller dropping the future.
pub async fn await_condition<T, F, Fut>(period: Duration, mut poll: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    loop {
        if let Some(value) = poll().await? {
            return Ok(value);
        }
        tokio::time::sleep(period).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn await_condition_returns_on_success() {
        let mut calls = 0;
        let result: i32 = await_condition(Duration::from_millis(1), || {
            calls += 1;
            let done = calls >= 3;
            async move { Ok(if done { Some(42) } else { None }) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn retries_flag_starts_enabled() {
        let ctx = TaskContext::new("test");
        assert!(!ctx.retries_disabled());
        ctx.disable_retries();
        assert!(ctx.retries_disabled());
    }

    #[test]
    fn record_output_snapshots() {
        let ctx = TaskContext::new("test");
        ctx.record_output("version", &"v1.2.0").unwrap();
        let outputs = ctx.outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "version");
        assert_eq!(outputs[0].value, serde_json::json!("v1.2.0"));
    }
}
