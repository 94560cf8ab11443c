//! # Cascade Release
//!
//! Release orchestration for families of single-module repositories.
//!
//! This crate plans and executes coordinated releases across repositories
//! whose modules depend on each other, and drives the gopls pre-release and
//! final-release flows. It discovers module manifests, builds a dependency
//! graph with cycle detection, schedules updates in readiness order, and
//! makes idempotent tag decisions so interrupted runs can be resumed by
//! re-running them.
//!
//! External systems (code review, issue tracker, remote execution, script
//! runner, mail) are reached through traits defined here; callers supply the
//! concrete clients.
//!
//! ## Features
//!
//! - **Dependency Ordering**: Modules release only after their requirements
//! - **Cycle Detection**: Shortest uncovered cycles reported before any work
//! - **Idempotent Tagging**: Unchanged commits keep their tag, new work gets
//!   the next minor
//! - **Precondition Gates**: Gopls flow stages fail loudly and re-run safely
//! - **Deadlock Reporting**: Stalled plans name the modules that cannot
//!   proceed

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod changes;
pub mod clients;
pub mod error;
pub mod flow;
pub mod gopls;
pub mod graph;
pub mod manifest;
pub mod plan;
pub mod tag;
pub mod version;

// Re-export main types for public API
pub use error::{
    ClientError, GraphError, OrchestratorError, PlanError, ReleaseError, Result, TagError,
    VersionError,
};
pub use flow::{ApprovalGate, TaskContext};
pub use gopls::{GoplsConfig, GoplsReleaseTasks};
pub use graph::{GraphConfig, ModuleRepo};
pub use plan::{ModuleFlowConfig, ModuleReleaseTasks, ReleasePlan};
pub use version::ReleaseVersion;

use std::time::Duration;

/// Shared configuration for orchestrated flows
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Reviewers added to every generated change
    pub reviewers: Vec<String>,
    /// Poll period for submission and condition checks
    pub poll_period: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            reviewers: Vec::new(),
            poll_period: Duration::from_secs(10),
        }
    }
}
