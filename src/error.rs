//! Error types for cascade_release operations.
//!
//! Every fatal precondition violation gets its own variant carrying enough
//! identifying context (module path, version, tag, branch) for an operator to
//! act without re-deriving it from logs.

use thiserror::Error;

/// Result type alias for cascade_release operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Main error type for all cascade_release operations
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Version parsing and progression errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Dependency graph construction errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Release plan construction errors
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Tag decision errors
    #[error("Tag error: {0}")]
    Tag(#[from] TagError),

    /// Gopls release flow errors
    #[error("Release error: {0}")]
    Release(#[from] ReleaseError),

    /// External collaborator errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest parsing errors
    #[error("Manifest error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Task output serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Version parsing and progression errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Input does not parse as `vMAJOR.MINOR.PATCH[-pre.N]`
    #[error("Malformed version '{version}': {reason}")]
    Malformed {
        /// Version string as supplied
        version: String,
        /// Reason for the error
        reason: String,
    },
}

/// Dependency graph construction errors
#[derive(Error, Debug)]
pub enum GraphError {
    /// The module set contains dependency cycles after suppression
    #[error("dependency cycles detected (there may be more): {cycles:?}")]
    CyclesDetected {
        /// Each cycle as an ordered module-path sequence, first == last
        cycles: Vec<Vec<String>>,
    },

    /// A project's manifest exists but does not parse
    #[error("invalid manifest in project '{project}': {reason}")]
    InvalidManifest {
        /// Hosting project name
        project: String,
        /// Reason for the error
        reason: String,
    },
}

/// Release plan construction and execution errors
#[derive(Error, Debug)]
pub enum PlanError {
    /// A full planning pass made no progress while modules remain
    #[error("failed to progress the plan: todo: {modules:?}")]
    Stalled {
        /// Projects that could not be scheduled
        modules: Vec<String>,
    },

    /// A planned task names a module absent from the executed repo set
    #[error("planned module '{module}' is missing from the repo set")]
    MissingModule {
        /// Module path named by the task
        module: String,
    },

    /// A dependency had no decided version when its dependent ran
    #[error("dependency '{module}' has no decided version")]
    UndecidedDependency {
        /// Dependency module path
        module: String,
    },

    /// The review client returned no change id to await
    #[error("no change id returned for the {project} dependency update")]
    MissingChangeId {
        /// Project whose update produced no awaitable change
        project: String,
    },
}

/// Tag decision errors
#[derive(Error, Debug)]
pub enum TagError {
    /// The project has no prior release to bootstrap a next version from
    #[error("no release tags found in project '{project}' among {tags:?}")]
    NoReleases {
        /// Hosting project name
        project: String,
        /// Tags that were inspected
        tags: Vec<String>,
    },
}

/// Gopls release flow errors.
///
/// These flows are operated by a human approving and re-running steps, so
/// every precondition failure is distinct and descriptive.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Input is not a legitimate next version for any existing release
    #[error("the input version '{version}' is not the next version of any existing version")]
    NotNextVersion {
        /// Version string as supplied
        version: String,
    },

    /// Input to the final-release flow carries no pre-release ordinal
    #[error("the input version '{version}' does not contain a pre-release ordinal")]
    NotPrerelease {
        /// Version string as supplied
        version: String,
    },

    /// The final release tag already exists for this triple
    #[error("this version has been released, the release tag '{tag}' already exists")]
    AlreadyReleased {
        /// Existing final release tag
        tag: String,
    },

    /// The triple has no pre-release tags at all
    #[error("no pre-release has been tagged for '{version}' yet")]
    NoPrereleases {
        /// Final version whose pre-releases were looked up
        version: String,
    },

    /// A newer pre-release supersedes the input
    #[error("there is a newer pre-release version available: {latest}")]
    StalePrerelease {
        /// Latest existing pre-release version
        latest: String,
    },

    /// The input pre-release has not been tagged yet
    #[error("pre-release version '{version}' is not yet available, latest available is {latest}")]
    UnknownPrerelease {
        /// Version string as supplied
        version: String,
        /// Latest existing pre-release version
        latest: String,
    },

    /// The pre-release tag is not at the release branch tip
    #[error(
        "branch '{branch}' head commit is {head}, but tag '{tag}' points to revision {revision}"
    )]
    BranchTipMismatch {
        /// Release branch name
        branch: String,
        /// Current branch head commit
        head: String,
        /// Pre-release tag name
        tag: String,
        /// Commit the tag points to
        revision: String,
    },

    /// A patch release requires an already-existing release branch
    #[error("release branch '{branch}' does not exist; patch releases require an existing branch")]
    MissingReleaseBranch {
        /// Expected branch name
        branch: String,
    },

    /// A required step input was empty
    #[error("the input {what} should not be empty")]
    EmptyInput {
        /// Name of the missing input
        what: &'static str,
    },

    /// A watched file name would break script quoting
    #[error("file name {file:?} contains a single quote")]
    UnsafeFileName {
        /// Offending file name
        file: String,
    },
}

/// Errors reported by external collaborators
#[derive(Error, Debug)]
pub enum ClientError {
    /// The requested resource does not exist.
    ///
    /// Distinguishable so callers can treat missing branches and manifests
    /// as skip conditions rather than failures.
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Tag creation collided with an existing tag.
    ///
    /// Tags are append-only; recreation with a different target commit would
    /// be a correctness violation, so this is never swallowed.
    #[error("tag '{tag}' already exists in project '{project}'")]
    TagExists {
        /// Hosting project name
        project: String,
        /// Tag name
        tag: String,
    },

    /// A remote command ran but failed on the remote side
    #[error("remote command failed: {reason}")]
    RemoteCommand {
        /// Remote-side failure detail
        reason: String,
    },

    /// Generic API or transport failure
    #[error("{operation} failed: {reason}")]
    Api {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },
}

impl OrchestratorError {
    /// Whether this error is a not-found condition from a collaborator.
    ///
    /// Not-found is a skip condition during module discovery, never fatal.
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::Client(ClientError::NotFound { .. }))
    }
}
