//! External collaborator interfaces.
//!
//! The orchestrator never talks to the network itself; every external system
//! is specified by a trait here and injected by the caller. Trait methods
//! return `impl Future` so implementations can be written as plain
//! `async fn`s.

mod mail;
mod remote;
mod review;
mod script;
mod tracker;

pub use mail::{MailContent, MailHeader, MailSender};
pub use remote::{ExecRequest, ExecOutcome, RemoteExecutor, RemoteWorkspace};
pub use review::{ChangeInfo, ChangeInput, ReviewClient, TagRef};
pub use script::ScriptRunner;
pub use tracker::{Issue, IssueRequest, IssueTracker};
