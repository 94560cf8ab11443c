//! Module dependency graph construction and cycle detection.
//!
//! Modules and their in-family dependencies are discovered dynamically by
//! reading each hosted project's manifest at its default-branch head. A
//! curated suppression table removes known-intentional back-edges (for
//! example a test-only dependency) before cycle detection runs.

use crate::clients::ReviewClient;
use crate::error::{GraphError, Result};
use crate::flow::TaskContext;
use crate::manifest::{self, MANIFEST_FILE, ModuleManifest};
use crate::version::ReleaseVersion;
use std::collections::{HashMap, HashSet};

/// A module that can be tagged.
#[derive(Debug, Clone)]
pub struct ModuleRepo {
    /// Hosting project name, e.g. "tools"
    pub project: String,
    /// Canonical module path, e.g. "example.dev/fam/tools"
    pub module_path: String,
    /// In-family dependency module paths; immutable after discovery
    pub deps: Vec<String>,
    /// Decided target version; written once when the tag decision runs
    pub version: Option<ReleaseVersion>,
}

/// Configuration for graph construction.
///
/// The suppression table is explicit configuration rather than a process-wide
/// constant so it is testable and overridable per run.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Path prefix shared by every managed module
    pub family_prefix: String,
    /// Default branch read for heads and manifests
    pub default_branch: String,
    /// Known-intentional `(source, target)` edges to drop before cycle
    /// detection
    pub suppressed_edges: HashSet<(String, String)>,
}

impl GraphConfig {
    /// Config for a family prefix with no suppressed edges.
    pub fn new(family_prefix: impl Into<String>) -> Self {
        Self {
            family_prefix: family_prefix.into(),
            default_branch: "main".to_string(),
            suppressed_edges: HashSet::new(),
        }
    }

    /// Suppress the ordered edge `source -> target`.
    pub fn suppress(mut self, source: &str, target: &str) -> Self {
        self.suppressed_edges
            .insert((source.to_string(), target.to_string()));
        self
    }
}

/// Discover the family's modules and their dependency edges.
///
/// Projects without a default branch or manifest, foreign modules, and
/// nested sub-modules are skipped with a log line, never fatally. Any cycle
/// remaining after suppression aborts the orchestration.
pub async fn select_repos<R: ReviewClient>(
    ctx: &TaskContext,
    review: &R,
    config: &GraphConfig,
) -> Result<Vec<ModuleRepo>> {
    let projects = review.list_projects().await?;
    ctx.info(format!("examining projects {:?}", projects));

    let mut repos = Vec::new();
    for project in &projects {
        if let Some(repo) = read_repo(ctx, review, config, project).await? {
            repos.push(repo);
        }
    }

    let cycles = find_cycles(&repos);
    if !cycles.is_empty() {
        return Err(GraphError::CyclesDetected { cycles }.into());
    }

    Ok(repos)
}

/// Read one project's module identity and in-family dependencies.
///
/// Returns `None` for every skip condition.
async fn read_repo<R: ReviewClient>(
    ctx: &TaskContext,
    review: &R,
    config: &GraphConfig,
    project: &str,
) -> Result<Option<ModuleRepo>> {
    let head = match review.read_branch_head(project, &config.default_branch).await {
        Ok(head) => head,
        Err(e) if e.is_not_found() => {
            ctx.info(format!("ignoring {}: no {} branch", project, config.default_branch));
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let manifest_text = match review.read_file(project, &head, MANIFEST_FILE).await {
        Ok(text) => text,
        Err(e) if e.is_not_found() => {
            ctx.info(format!("ignoring {}: no {}", project, MANIFEST_FILE));
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let parsed = ModuleManifest::parse(&manifest_text).map_err(|e| GraphError::InvalidManifest {
        project: project.to_string(),
        reason: e.to_string(),
    })?;

    if !manifest::in_family(&config.family_prefix, &parsed.module) {
        ctx.info(format!("ignoring {}: not {}", project, config.family_prefix));
        return Ok(None);
    }

    let mut deps = Vec::new();
    for req in &parsed.requires {
        if !manifest::in_family(&config.family_prefix, &req.module) {
            continue;
        }
        let edge = (parsed.module.clone(), req.module.clone());
        if config.suppressed_edges.contains(&edge) {
            continue;
        }
        deps.push(req.module.clone());
    }

    Ok(Some(ModuleRepo {
        project: project.to_string(),
        module_path: parsed.module,
        deps,
        version: None,
    }))
}

/// Find all the shortest dependency cycles in `repos`.
///
/// From every module a depth-first walk follows dependency edges, recording
/// a cycle whenever the path stack revisits a node and stopping descent at
/// the first cycle found on a branch. That search is intentionally partial:
/// cycles sharing a prefix with a found cycle go unreported, which is fine
/// because callers only need existence-of-any-cycle as a hard stop. Across
/// everything found, only cycles of globally minimum length survive,
/// deduplicated by exact sequence equality (rotations count as distinct),
/// and sorted so the result is independent of module iteration order.
pub fn find_cycles(repos: &[ModuleRepo]) -> Vec<Vec<String>> {
    let by_module: HashMap<&str, &ModuleRepo> = repos
        .iter()
        .map(|repo| (repo.module_path.as_str(), repo))
        .collect();

    let mut cycles = Vec::new();
    for repo in repos {
        let mut stack = Vec::new();
        walk(&by_module, repo, &mut stack, &mut cycles);
    }

    let min_len = match cycles.iter().map(Vec::len).min() {
        Some(len) => len,
        None => return Vec::new(),
    };
    let mut shortest: Vec<Vec<String>> = Vec::new();
    for cycle in cycles {
        if cycle.len() == min_len && !shortest.contains(&cycle) {
            shortest.push(cycle);
        }
    }
    shortest.sort();
    shortest
}

fn walk(
    by_module: &HashMap<&str, &ModuleRepo>,
    repo: &ModuleRepo,
    stack: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    stack.push(repo.module_path.clone());

    let mut found = false;
    for (i, seen) in stack[..stack.len() - 1].iter().enumerate() {
        if *seen == repo.module_path {
            cycles.push(stack[i..].to_vec());
            found = true;
        }
    }

    // Stop descending once this path has closed a cycle.
    if !found {
        for dep in &repo.deps {
            // A dep absent from the module set cannot close a cycle; the
            // plan builder reports it as a deadlock instead.
            if let Some(dep_repo) = by_module.get(dep.as_str()) {
                walk(by_module, dep_repo, stack, cycles);
            }
        }
    }

    stack.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(path: &str, deps: &[&str]) -> ModuleRepo {
        ModuleRepo {
            project: path.rsplit('/').next().unwrap_or(path).to_string(),
            module_path: path.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            version: None,
        }
    }

    #[test]
    fn acyclic_set_has_no_cycles() {
        let repos = vec![
            repo("fam/a", &[]),
            repo("fam/b", &["fam/a"]),
            repo("fam/c", &["fam/b", "fam/a"]),
        ];
        assert!(find_cycles(&repos).is_empty());
    }

    #[test]
    fn two_cycle_reported_from_both_entry_points() {
        let repos = vec![repo("fam/a", &["fam/b"]), repo("fam/b", &["fam/a"])];
        let cycles = find_cycles(&repos);
        assert_eq!(
            cycles,
            vec![
                vec!["fam/a".to_string(), "fam/b".to_string(), "fam/a".to_string()],
                vec!["fam/b".to_string(), "fam/a".to_string(), "fam/b".to_string()],
            ]
        );
    }

    #[test]
    fn only_minimum_length_cycles_survive() {
        // a <-> b is a 2-cycle; c -> d -> e -> c is a 3-cycle.
        let repos = vec![
            repo("fam/a", &["fam/b"]),
            repo("fam/b", &["fam/a"]),
            repo("fam/c", &["fam/d"]),
            repo("fam/d", &["fam/e"]),
            repo("fam/e", &["fam/c"]),
        ];
        let cycles = find_cycles(&repos);
        assert!(cycles.iter().all(|c| c.len() == 3));
        assert!(cycles.contains(&vec![
            "fam/a".to_string(),
            "fam/b".to_string(),
            "fam/a".to_string()
        ]));
    }

    #[test]
    fn result_is_iteration_order_independent() {
        let forward = vec![repo("fam/a", &["fam/b"]), repo("fam/b", &["fam/a"])];
        let reverse = vec![repo("fam/b", &["fam/a"]), repo("fam/a", &["fam/b"])];
        assert_eq!(find_cycles(&forward), find_cycles(&reverse));
    }

    #[test]
    fn missing_dep_is_not_a_cycle() {
        let repos = vec![repo("fam/a", &["fam/gone"])];
        assert!(find_cycles(&repos).is_empty());
    }

    #[test]
    fn suppress_records_directed_edge() {
        let config = GraphConfig::new("fam/").suppress("fam/a", "fam/b");
        assert!(config.suppressed_edges.contains(&("fam/a".to_string(), "fam/b".to_string())));
    }
}
