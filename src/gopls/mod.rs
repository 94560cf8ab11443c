//! Gopls release state machine.
//!
//! Two related flows sharing the same primitives: the pre-release flow
//! (branch creation, dependency bumps, pre-release tagging, verification,
//! announcement) and the final-release flow (final tagging plus a mainline
//! dependency bump for minor releases). Every stage is a hard precondition
//! gate; the flows are operated by a human who approves and re-runs steps,
//! so re-running after partial failure is safe everywhere except the two
//! tag-creation steps, which run with retries disabled.

mod prerelease;
mod release;
mod version;

pub use version::{max_prerelease_ordinal, parse_gopls_tag, possible_versions_from};

use crate::OrchestratorConfig;
use crate::clients::MailHeader;
use crate::version::ReleaseVersion;

/// Tag prefix for gopls releases within the host project
pub const TAG_PREFIX: &str = "gopls/";

/// Release branch name for a version: patch releases under the same minor
/// share one branch.
pub fn release_branch_name(version: ReleaseVersion) -> String {
    format!("gopls-release-branch.{}.{}", version.major, version.minor)
}

/// Full tag name for a gopls version.
pub fn gopls_tag(version: ReleaseVersion) -> String {
    format!("{}{}", TAG_PREFIX, version)
}

/// Configuration for the gopls release flows.
#[derive(Debug, Clone)]
pub struct GoplsConfig {
    /// Project hosting the gopls sub-module
    pub host_project: String,
    /// Module path of the host, bumped as gopls' dependency
    pub host_module: String,
    /// Default branch of the host project
    pub default_branch: String,
    /// Assignee for release tracking issues
    pub assignee: String,
    /// Owner login used in change dedup queries
    pub change_owner: String,
    /// Module tool invoked in remote scripts
    pub module_tool: String,
    /// Shared reviewer list and polling cadence
    pub orchestrator: OrchestratorConfig,
    /// Addressing for announcement mail
    pub announce_header: MailHeader,
}

/// Tasks for the gopls release flows.
pub struct GoplsReleaseTasks<R, T, S, M, A> {
    /// Review-system client
    pub review: R,
    /// Issue-tracker client
    pub tracker: T,
    /// Script-execution client
    pub script: S,
    /// Announcement mail sender
    pub mail: M,
    /// Human approval gate
    pub approval: A,
    /// Flow configuration
    pub config: GoplsConfig,
}
