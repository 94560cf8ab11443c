//! Script-execution client interface.

use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;

/// Trait for running a shell script against a named checkout.
///
/// `output_files` declares which files to retrieve after the script runs;
/// the result maps each declared name to its content.
pub trait ScriptRunner {
    /// Run `script` in a fresh checkout of `project` (empty string for a
    /// bare environment) and retrieve the declared output files.
    fn run_script(
        &self,
        script: &str,
        project: &str,
        output_files: &[String],
    ) -> impl Future<Output = Result<HashMap<String, String>>>;
}
