//! Remote execution client interface.
//!
//! Provisioning is scoped: callers acquire a disposable workspace, run
//! commands in it, and must release it regardless of command outcome.
//! `RemoteWorkspace::release` consumes the workspace so it cannot be used
//! after release.

use crate::error::Result;
use std::future::Future;

/// A command to execute inside a remote workspace.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Program to run
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory relative to the workspace root
    pub dir: String,
}

/// Outcome of a remote command.
///
/// Transport-level failures are reported as errors from `exec`;
/// remote-command-level failures are carried here so callers can
/// distinguish the two.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Captured combined output
    pub output: String,
    /// Remote-side failure, if the command itself failed
    pub remote_error: Option<String>,
}

/// A provisioned disposable execution environment.
pub trait RemoteWorkspace {
    /// Fetch a remote archive and extract it under `dest`.
    fn fetch_archive(&self, url: &str, dest: &str) -> impl Future<Output = Result<()>>;

    /// Execute a command, streaming output into the returned outcome.
    fn exec(&self, request: ExecRequest) -> impl Future<Output = Result<ExecOutcome>>;

    /// Read a file from the workspace.
    fn read_file(&self, path: &str) -> impl Future<Output = Result<String>>;

    /// Release the environment. Consumes the workspace.
    fn release(self) -> impl Future<Output = Result<()>>;
}

/// Trait for provisioning remote workspaces from a named configuration.
pub trait RemoteExecutor {
    /// Workspace type produced by this executor
    type Workspace: RemoteWorkspace;

    /// Provision a disposable workspace.
    fn create_workspace(&self, config: &str) -> impl Future<Output = Result<Self::Workspace>>;
}
