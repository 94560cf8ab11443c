//! Version-control and code-review client interface.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;

/// An immutable tag-to-commit binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRef {
    /// Tag name
    pub name: String,
    /// Commit the tag points to
    pub commit: String,
}

/// Input for creating a review change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeInput {
    /// Hosting project name
    pub project: String,
    /// Target branch
    pub branch: String,
    /// Change subject; the first line is the stable dedup title
    pub subject: String,
}

/// Summary of a change returned by a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// Stable change identifier
    pub change_id: String,
    /// Change subject
    pub subject: String,
    /// Creation timestamp
    pub created: chrono::DateTime<chrono::Utc>,
}

/// Trait defining the review-system operations the orchestrator consumes.
///
/// Tags are append-only: implementations must never move or delete a tag,
/// and must fail tag creation when the name already exists.
pub trait ReviewClient {
    /// List all hosted projects.
    fn list_projects(&self) -> impl Future<Output = Result<Vec<String>>>;

    /// Read a branch's head commit. Missing branches are
    /// `ClientError::NotFound`.
    fn read_branch_head(
        &self,
        project: &str,
        branch: &str,
    ) -> impl Future<Output = Result<String>>;

    /// Read a file's content at a commit. Missing files are
    /// `ClientError::NotFound`.
    fn read_file(
        &self,
        project: &str,
        commit: &str,
        path: &str,
    ) -> impl Future<Output = Result<String>>;

    /// List all tag names in a project.
    fn list_tags(&self, project: &str) -> impl Future<Output = Result<Vec<String>>>;

    /// Read a tag's bound commit.
    fn get_tag(&self, project: &str, tag: &str) -> impl Future<Output = Result<TagRef>>;

    /// Create a tag at a commit. Fails with `ClientError::TagExists` if the
    /// tag name is already bound.
    fn create_tag(
        &self,
        project: &str,
        tag: &str,
        commit: &str,
    ) -> impl Future<Output = Result<()>>;

    /// Create a branch at a commit, returning the branch head.
    fn create_branch(
        &self,
        project: &str,
        branch: &str,
        commit: &str,
    ) -> impl Future<Output = Result<String>>;

    /// Create an auto-submitting review change from a set of file contents,
    /// returning the change identifier.
    fn create_autosubmit_change(
        &self,
        input: ChangeInput,
        reviewers: &[String],
        files: HashMap<String, String>,
    ) -> impl Future<Output = Result<String>>;

    /// Query changes by a structured filter string (project, branch, status,
    /// owner, age, message substring).
    fn query_changes(&self, query: &str) -> impl Future<Output = Result<Vec<ChangeInfo>>>;

    /// Whether a change has been submitted; returns the merged commit once
    /// submission lands, `None` while the change is still open.
    fn submitted(&self, change_id: &str) -> impl Future<Output = Result<Option<String>>>;
}
