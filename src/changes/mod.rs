//! Idempotent review-change helpers.
//!
//! Change creation is deduplicated by querying for an existing open change
//! with the same title before creating a new one, and "no-op" changes are
//! detected by diffing watched files before and after a remote script run.

use crate::clients::{ReviewClient, ScriptRunner};
use crate::error::{ReleaseError, Result};
use crate::flow::{self, TaskContext};
use std::collections::HashMap;
use std::time::Duration;

/// Find an open change with the given title in `branch`, if one exists.
///
/// At most one open change per (branch, title) should exist at a time; this
/// query-before-create check is what enforces that, not a storage
/// constraint.
pub async fn open_change<R: ReviewClient>(
    review: &R,
    project: &str,
    branch: &str,
    owner: &str,
    title: &str,
) -> Result<Option<String>> {
    let query = format!(
        "message:{:?} status:open owner:{} repo:{} branch:{:?} -age:7d",
        title, owner, project, branch
    );
    let changes = review.query_changes(&query).await?;
    Ok(changes.into_iter().next().map(|c| c.change_id))
}

/// Await the submission of a change, polling at `period`.
///
/// `None` means no change was created upstream and there is nothing to
/// await. Returns the merged commit otherwise.
pub async fn await_submission<R: ReviewClient>(
    ctx: &TaskContext,
    review: &R,
    change_id: Option<&str>,
    period: Duration,
) -> Result<Option<String>> {
    let change_id = match change_id {
        Some(id) if !id.is_empty() => id,
        _ => {
            ctx.info("not awaiting: no change was created");
            return Ok(None);
        }
    };

    ctx.info(format!("awaiting review/submit of {}", change_id));
    let commit = flow::await_condition(period, || review.submitted(change_id)).await?;
    Ok(Some(commit))
}

/// Run `script` on `branch` of `project`, tracking changes to `watch_files`.
///
/// Returns the watched files whose content differs after the run, keyed by
/// file name. Byte-identical files produce an empty map regardless of what
/// the script did.
pub async fn execute_and_monitor_change<S: ScriptRunner>(
    script_runner: &S,
    project: &str,
    branch: &str,
    script: &str,
    watch_files: &[String],
) -> Result<HashMap<String, String>> {
    let full_script = monitor_script(branch, script, watch_files)?;
    let output_files = watched_output_files(watch_files);
    let outputs = script_runner
        .run_script(&full_script, project, &output_files)
        .await?;
    Ok(diff_outputs(watch_files, &outputs))
}

/// Build the full monitoring script: check out the branch, snapshot every
/// watched file to `<name>.before` (creating both empty if absent), then run
/// the caller's script.
fn monitor_script(branch: &str, script: &str, watch_files: &[String]) -> Result<String> {
    let mut full = format!(
        "git checkout {}\ngit rev-parse --abbrev-ref HEAD\ngit rev-parse --ref HEAD\n",
        branch
    );
    for file in watch_files {
        if file.contains('\'') {
            return Err(ReleaseError::UnsafeFileName { file: file.clone() }.into());
        }
        full.push_str(&format!(
            "if [ -f '{file}' ]; then\n    cp '{file}' '{file}.before'\nelse\n    touch '{file}' '{file}.before'\nfi\n",
        ));
    }
    full.push_str(script);
    Ok(full)
}

/// Output files to retrieve: the before snapshot and the final content of
/// each watched file.
fn watched_output_files(watch_files: &[String]) -> Vec<String> {
    let mut outputs = Vec::with_capacity(watch_files.len() * 2);
    for file in watch_files {
        outputs.push(format!("{}.before", file));
        outputs.push(file.clone());
    }
    outputs
}

/// Keep only watched files whose content changed.
fn diff_outputs(
    watch_files: &[String],
    outputs: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut changed = HashMap::new();
    for file in watch_files {
        let before = outputs.get(&format!("{}.before", file));
        let after = outputs.get(file);
        if before != after
            && let Some(after) = after
        {
            changed.insert(file.clone(), after.clone());
        }
    }
    changed
}
