//! Readiness-driven release plan construction and execution.
//!
//! The plan builder converts the discovered module set into an ordered set
//! of per-module update tasks, scheduling each module only after all its
//! dependencies hold a task handle. The loop is a fixed-point "repeat until
//! no progress" pass rather than a classic topological sort because task
//! construction is interleaved with engine registration; worst case is
//! O(modules) passes for a chain, acceptable at family scale.

use crate::OrchestratorConfig;
use crate::changes;
use crate::clients::{ChangeInput, ExecRequest, RemoteExecutor, RemoteWorkspace, ReviewClient};
use crate::error::{ClientError, PlanError, Result};
use crate::flow::TaskContext;
use crate::graph::{self, GraphConfig, ModuleRepo};
use crate::manifest::{LOCK_FILE, MANIFEST_FILE};
use crate::tag;
use crate::version::ReleaseVersion;
use std::collections::HashMap;

/// Handle to a planned per-module update task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub usize);

/// A scheduled per-module update task.
#[derive(Debug, Clone)]
pub struct PlannedTask {
    /// Task handle
    pub id: TaskId,
    /// Hosting project name
    pub project: String,
    /// Module identity
    pub module_path: String,
    /// Handles of the dependency tasks this one is wired after
    pub depends_on: Vec<TaskId>,
}

/// A fully-ordered release plan.
///
/// Tasks appear in schedulable order: every task's dependencies precede it.
#[derive(Debug, Clone, Default)]
pub struct ReleasePlan {
    /// Scheduled tasks in planning order
    pub tasks: Vec<PlannedTask>,
    by_module: HashMap<String, TaskId>,
}

impl ReleasePlan {
    /// Task handle for a module, if planned.
    pub fn task_for(&self, module_path: &str) -> Option<TaskId> {
        self.by_module.get(module_path).copied()
    }
}

/// Build the release plan for an acyclic module set.
///
/// Repeats passes over the not-yet-planned modules; a module becomes
/// plannable once every dependency already holds a task handle. A full pass
/// that plans nothing while modules remain is a fatal deadlock naming the
/// stuck set; it indicates a bug in cycle detection or a dependency missing
/// from the input, and is never silently ignored.
pub fn build_plan(repos: &[ModuleRepo]) -> Result<ReleasePlan> {
    let mut plan = ReleasePlan::default();

    while plan.by_module.len() != repos.len() {
        let mut progress = false;
        for repo in repos {
            if plan.by_module.contains_key(&repo.module_path) {
                continue;
            }
            let Some(depends_on) = ready_deps(&plan, repo) else {
                continue;
            };
            let id = TaskId(plan.tasks.len());
            plan.tasks.push(PlannedTask {
                id,
                project: repo.project.clone(),
                module_path: repo.module_path.clone(),
                depends_on,
            });
            plan.by_module.insert(repo.module_path.clone(), id);
            progress = true;
        }

        if !progress {
            let modules = repos
                .iter()
                .filter(|r| !plan.by_module.contains_key(&r.module_path))
                .map(|r| r.project.clone())
                .collect();
            return Err(PlanError::Stalled { modules }.into());
        }
    }

    Ok(plan)
}

/// Dependency task handles if all are planned, `None` if any is missing.
fn ready_deps(plan: &ReleasePlan, repo: &ModuleRepo) -> Option<Vec<TaskId>> {
    repo.deps.iter().map(|dep| plan.task_for(dep)).collect()
}

/// Configuration for the multi-module release flow.
#[derive(Debug, Clone)]
pub struct ModuleFlowConfig {
    /// Graph discovery configuration
    pub graph: GraphConfig,
    /// Review-system base URL for archive fetches
    pub review_base_url: String,
    /// Named remote-execution environment configuration
    pub exec_config: String,
    /// Module tool invoked in the remote workspace to edit manifests
    pub module_tool: String,
    /// Owner login used in change dedup queries
    pub change_owner: String,
    /// Shared reviewer list and polling cadence
    pub orchestrator: OrchestratorConfig,
}

/// The multi-module release flow: discover, plan, update, tag.
pub struct ModuleReleaseTasks<R, E> {
    /// Review-system client
    pub review: R,
    /// Remote execution client
    pub remote: E,
    /// Flow configuration
    pub config: ModuleFlowConfig,
}

impl<R: ReviewClient, E: RemoteExecutor> ModuleReleaseTasks<R, E> {
    /// Run the full flow: select repos, build the plan, execute it.
    ///
    /// Returns the module set with decided versions populated. Completion
    /// means every module has a tag decision, independent of whether any
    /// decision created a new tag.
    pub async fn run(&self, ctx: &TaskContext) -> Result<Vec<ModuleRepo>> {
        let repos = graph::select_repos(ctx, &self.review, &self.config.graph).await?;
        let plan = build_plan(&repos)?;
        self.execute_plan(ctx, &plan, repos).await
    }

    /// Execute a plan in order, threading decided versions into each
    /// dependent module's manifest update.
    ///
    /// The plan must cover exactly the modules in `repos`; a task naming a
    /// module outside the set is a `PlanError`.
    pub async fn execute_plan(
        &self,
        ctx: &TaskContext,
        plan: &ReleasePlan,
        repos: Vec<ModuleRepo>,
    ) -> Result<Vec<ModuleRepo>> {
        let mut by_module: HashMap<String, ModuleRepo> = repos
            .into_iter()
            .map(|r| (r.module_path.clone(), r))
            .collect();
        let mut decided: HashMap<String, ReleaseVersion> = HashMap::new();

        for task in &plan.tasks {
            let repo = by_module
                .get(&task.module_path)
                .cloned()
                .ok_or_else(|| PlanError::MissingModule {
                    module: task.module_path.clone(),
                })?;
            let version = self.update_module(ctx, &repo, &decided).await?;
            ctx.record_output(format!("{}:version", task.project), &version.to_string())?;
            decided.insert(task.module_path.clone(), version);
            if let Some(repo) = by_module.get_mut(&task.module_path) {
                repo.version = Some(version);
            }
        }

        let mut result: Vec<ModuleRepo> = by_module.into_values().collect();
        result.sort_by(|a, b| a.module_path.cmp(&b.module_path));
        Ok(result)
    }

    /// Run one module's update task.
    ///
    /// Modules with no family dependencies degenerate to reading the current
    /// head; otherwise an updated manifest is synthesized remotely, mailed
    /// as an auto-submit change, and the merged commit is tagged after the
    /// post-submit verification gate.
    async fn update_module(
        &self,
        ctx: &TaskContext,
        repo: &ModuleRepo,
        decided: &HashMap<String, ReleaseVersion>,
    ) -> Result<ReleaseVersion> {
        let head = self
            .review
            .read_branch_head(&repo.project, &self.config.graph.default_branch)
            .await?;

        let tag_commit = if repo.deps.is_empty() {
            head
        } else {
            // Final by readiness ordering before this task runs.
            let mut deps: Vec<(String, ReleaseVersion)> = Vec::with_capacity(repo.deps.len());
            for dep in &repo.deps {
                let version =
                    decided
                        .get(dep)
                        .copied()
                        .ok_or_else(|| PlanError::UndecidedDependency {
                            module: dep.clone(),
                        })?;
                deps.push((dep.clone(), version));
            }

            let (manifest_text, lock_text) =
                self.update_manifest(ctx, repo, &deps, &head).await?;

            let mut files = HashMap::new();
            files.insert(MANIFEST_FILE.to_string(), manifest_text);
            files.insert(LOCK_FILE.to_string(), lock_text);

            let family = self.config.graph.family_prefix.trim_end_matches('/');
            let subject = format!("update {} dependencies", family);
            let change_id = match changes::open_change(
                &self.review,
                &repo.project,
                &self.config.graph.default_branch,
                &self.config.change_owner,
                &subject,
            )
            .await?
            {
                Some(existing) => {
                    ctx.info(format!("{}: reusing open change {}", repo.project, existing));
                    existing
                }
                None => {
                    self.review
                        .create_autosubmit_change(
                            ChangeInput {
                                project: repo.project.clone(),
                                branch: self.config.graph.default_branch.clone(),
                                subject,
                            },
                            &self.config.orchestrator.reviewers,
                            files,
                        )
                        .await?
                }
            };

            let merged = changes::await_submission(
                ctx,
                &self.review,
                Some(&change_id),
                self.config.orchestrator.poll_period,
            )
            .await?;
            merged.ok_or_else(|| PlanError::MissingChangeId {
                project: repo.project.clone(),
            })?
        };

        self.await_green(ctx, &repo.project, &tag_commit).await?;
        tag::maybe_tag(ctx, &self.review, repo, &tag_commit).await
    }

    /// Synthesize the updated manifest in a disposable remote workspace.
    ///
    /// The workspace is always released, whatever the commands did.
    async fn update_manifest(
        &self,
        ctx: &TaskContext,
        repo: &ModuleRepo,
        deps: &[(String, ReleaseVersion)],
        commit: &str,
    ) -> Result<(String, String)> {
        let workspace = self
            .remote
            .create_workspace(&self.config.exec_config)
            .await?;
        let result = self
            .update_manifest_in(ctx, &workspace, repo, deps, commit)
            .await;
        let released = workspace.release().await;
        let contents = result?;
        released?;
        Ok(contents)
    }

    async fn update_manifest_in<W: RemoteWorkspace>(
        &self,
        ctx: &TaskContext,
        workspace: &W,
        repo: &ModuleRepo,
        deps: &[(String, ReleaseVersion)],
        commit: &str,
    ) -> Result<(String, String)> {
        let archive_url = format!(
            "{}/{}/+archive/{}.tar.gz",
            self.config.review_base_url, repo.project, commit
        );
        workspace.fetch_archive(&archive_url, "repo").await?;

        let mut get_args = vec!["get".to_string()];
        for (dep, version) in deps {
            get_args.push(format!("{}@{}", dep, version));
        }
        self.exec_checked(workspace, get_args).await?;
        self.exec_checked(workspace, vec!["tidy".to_string()]).await?;

        let manifest_text = workspace.read_file(&format!("repo/{}", MANIFEST_FILE)).await?;
        let lock_text = workspace.read_file(&format!("repo/{}", LOCK_FILE)).await?;
        ctx.info(format!(
            "{}: synthesized manifest with {} updated dependencies",
            repo.project,
            deps.len()
        ));
        Ok((manifest_text, lock_text))
    }

    async fn exec_checked<W: RemoteWorkspace>(
        &self,
        workspace: &W,
        args: Vec<String>,
    ) -> Result<()> {
        let outcome = workspace
            .exec(ExecRequest {
                program: self.config.module_tool.clone(),
                args,
                dir: "repo".to_string(),
            })
            .await?;
        if let Some(reason) = outcome.remote_error {
            return Err(ClientError::RemoteCommand { reason }.into());
        }
        Ok(())
    }

    /// Wait for the commit to pass post-submit verification.
    ///
    /// Contractually a blocking gate; currently there is no signal to wait
    /// on, so it completes immediately.
    async fn await_green(&self, _ctx: &TaskContext, _project: &str, _commit: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OrchestratorError, PlanError};

    fn repo(path: &str, deps: &[&str]) -> ModuleRepo {
        ModuleRepo {
            project: path.rsplit('/').next().unwrap_or(path).to_string(),
            module_path: path.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            version: None,
        }
    }

    #[test]
    fn plan_honors_dependency_order() {
        let repos = vec![
            repo("fam/c", &["fam/b"]),
            repo("fam/b", &["fam/a"]),
            repo("fam/a", &[]),
        ];
        let plan = build_plan(&repos).unwrap();
        let order: Vec<&str> = plan.tasks.iter().map(|t| t.module_path.as_str()).collect();
        assert_eq!(order, vec!["fam/a", "fam/b", "fam/c"]);

        let b = &plan.tasks[1];
        assert_eq!(b.depends_on, vec![plan.task_for("fam/a").unwrap()]);
    }

    #[test]
    fn plan_with_no_deps_is_single_pass() {
        let repos = vec![repo("fam/a", &[]), repo("fam/b", &[])];
        let plan = build_plan(&repos).unwrap();
        assert_eq!(plan.tasks.len(), 2);
    }

    #[test]
    fn missing_dependency_deadlocks_with_stuck_set() {
        // B depends on A which is absent; C depends on B.
        let repos = vec![repo("fam/b", &["fam/a"]), repo("fam/c", &["fam/b"])];
        let err = build_plan(&repos).unwrap_err();
        match err {
            OrchestratorError::Plan(PlanError::Stalled { mut modules }) => {
                modules.sort();
                assert_eq!(modules, vec!["b".to_string(), "c".to_string()]);
            }
            other => panic!("expected stalled plan, got {other}"),
        }
    }

    #[test]
    fn diamond_dependencies_plan_once_each() {
        let repos = vec![
            repo("fam/d", &["fam/b", "fam/c"]),
            repo("fam/b", &["fam/a"]),
            repo("fam/c", &["fam/a"]),
            repo("fam/a", &[]),
        ];
        let plan = build_plan(&repos).unwrap();
        assert_eq!(plan.tasks.len(), 4);
        let pos = |m: &str| plan.tasks.iter().position(|t| t.module_path == m).unwrap();
        assert!(pos("fam/a") < pos("fam/b"));
        assert!(pos("fam/a") < pos("fam/c"));
        assert!(pos("fam/b") < pos("fam/d"));
        assert!(pos("fam/c") < pos("fam/d"));
    }
}
