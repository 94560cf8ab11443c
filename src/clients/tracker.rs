//! Issue-tracker client interface.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// An existing issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number
    pub number: i64,
    /// Issue title
    pub title: String,
}

/// Input for creating an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Issue title
    pub title: String,
    /// Issue body
    pub body: String,
    /// Labels to apply
    pub labels: Vec<String>,
    /// Assignee login
    pub assignee: String,
    /// Milestone the issue belongs to
    pub milestone: i64,
}

/// Trait defining the issue-tracker operations the orchestrator consumes.
pub trait IssueTracker {
    /// Find a milestone by exact name, returning its identifier.
    fn fetch_milestone(&self, name: &str) -> impl Future<Output = Result<i64>>;

    /// List the issue numbers attached to a milestone.
    fn milestone_issues(&self, milestone: i64) -> impl Future<Output = Result<Vec<i64>>>;

    /// Fetch an issue by number.
    fn get_issue(&self, number: i64) -> impl Future<Output = Result<Issue>>;

    /// Create an issue, returning its number.
    fn create_issue(&self, request: IssueRequest) -> impl Future<Output = Result<i64>>;
}
