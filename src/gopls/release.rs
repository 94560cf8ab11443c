//! Gopls final-release flow.

use super::version::{max_prerelease_ordinal, parse_gopls_tag};
use super::{GoplsReleaseTasks, gopls_tag, release_branch_name};
use crate::changes;
use crate::clients::{ChangeInput, IssueTracker, MailSender, ReviewClient, ScriptRunner};
use crate::error::{ReleaseError, Result};
use crate::flow::{ApprovalGate, TaskContext};
use crate::manifest::{LOCK_FILE, MANIFEST_FILE};
use crate::version::ReleaseVersion;

impl<R, T, S, M, A> GoplsReleaseTasks<R, T, S, M, A>
where
    R: ReviewClient,
    T: IssueTracker,
    S: ScriptRunner,
    M: MailSender,
    A: ApprovalGate,
{
    /// Run the final-release flow for a pre-release `version`
    /// (e.g. `"v0.16.3-pre.2"`).
    ///
    /// Returns the tagged final version.
    pub async fn run_release(&self, ctx: &TaskContext, version: &str) -> Result<ReleaseVersion> {
        let (semv, commit) = self.validate_prerelease_version(ctx, version).await?;

        ctx.info(format!("the final release will be {} at {}", semv, commit));
        self.approval.approve(ctx).await?;

        self.tag_release(ctx, semv, &commit).await?;

        let dependency_change = self.update_dependency_if_minor(ctx, semv).await?;
        changes::await_submission(
            ctx,
            &self.review,
            dependency_change.as_deref(),
            self.config.orchestrator.poll_period,
        )
        .await?;

        ctx.record_output("version", &semv.to_string())?;
        Ok(semv)
    }

    /// Validate the input pre-release version and resolve the commit the
    /// final release will be tagged at.
    ///
    /// The input must be the latest pre-release of its triple, the triple
    /// must not already have a final tag, and the pre-release tag must sit
    /// at the release branch head. Each deviation is a distinct error so an
    /// operator can tell a stale re-run from a typo.
    pub async fn validate_prerelease_version(
        &self,
        ctx: &TaskContext,
        version: &str,
    ) -> Result<(ReleaseVersion, String)> {
        let prerelease = ReleaseVersion::parse(version)?;
        let ordinal = prerelease.pre.ok_or_else(|| ReleaseError::NotPrerelease {
            version: version.to_string(),
        })?;
        let semv = prerelease.triple();
        let project = &self.config.host_project;

        let tags = self.review.list_tags(project).await?;
        let final_tag = gopls_tag(semv);
        if tags
            .iter()
            .filter_map(|tag| parse_gopls_tag(tag))
            .any(|v| v == semv)
        {
            return Err(ReleaseError::AlreadyReleased { tag: final_tag }.into());
        }

        let latest = max_prerelease_ordinal(&tags, semv);
        if latest == 0 {
            return Err(ReleaseError::NoPrereleases {
                version: semv.to_string(),
            }
            .into());
        }
        let latest_version = ReleaseVersion {
            pre: Some(latest),
            ..semv
        };
        if ordinal < latest {
            return Err(ReleaseError::StalePrerelease {
                latest: latest_version.to_string(),
            }
            .into());
        }
        if ordinal > latest {
            return Err(ReleaseError::UnknownPrerelease {
                version: version.to_string(),
                latest: latest_version.to_string(),
            }
            .into());
        }

        let branch = release_branch_name(semv);
        let head = self.review.read_branch_head(project, &branch).await?;
        let tag = gopls_tag(prerelease);
        let tag_ref = self.review.get_tag(project, &tag).await?;
        if tag_ref.commit != head {
            return Err(ReleaseError::BranchTipMismatch {
                branch,
                head,
                tag,
                revision: tag_ref.commit,
            }
            .into());
        }

        ctx.info(format!(
            "validated pre-release {}: tag {} is at branch head {}",
            prerelease, tag, head
        ));
        Ok((semv, tag_ref.commit))
    }

    /// Tag the final release at `commit`.
    ///
    /// Runs with retries disabled, like pre-release tagging.
    pub async fn tag_release(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
        commit: &str,
    ) -> Result<()> {
        if commit.is_empty() {
            return Err(ReleaseError::EmptyInput { what: "commit" }.into());
        }

        ctx.disable_retries();

        let tag = gopls_tag(semv);
        self.review
            .create_tag(&self.config.host_project, &tag, commit)
            .await?;
        ctx.info(format!("tagged commit {} with tag {}", commit, tag));
        Ok(())
    }

    /// For minor releases, idempotently create a change bumping the
    /// mainline's gopls dependency to the released version.
    ///
    /// Returns the change id, or `None` for patch releases and when the
    /// mainline manifest is already up to date.
    pub async fn update_dependency_if_minor(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
    ) -> Result<Option<String>> {
        if semv.patch != 0 {
            return Ok(None);
        }

        let project = &self.config.host_project;
        let branch = &self.config.default_branch;
        let title = format!("{}: update gopls dependency for {}", MANIFEST_FILE, semv);

        if let Some(existing) = changes::open_change(
            &self.review,
            project,
            branch,
            &self.config.change_owner,
            &title,
        )
        .await?
        {
            ctx.info(format!("not creating change: found existing change {}", existing));
            return Ok(Some(existing));
        }

        let script = format!(
            "{tool} get {host}/gopls@{version}\n{tool} tidy\n",
            tool = self.config.module_tool,
            host = self.config.host_module,
            version = semv,
        );
        let watch = [MANIFEST_FILE.to_string(), LOCK_FILE.to_string()];
        let changed =
            changes::execute_and_monitor_change(&self.script, project, branch, &script, &watch)
                .await?;
        if changed.is_empty() {
            return Ok(None);
        }

        ctx.info(format!("creating auto-submit change under branch {}", branch));
        let change_id = self
            .review
            .create_autosubmit_change(
                ChangeInput {
                    project: project.clone(),
                    branch: branch.clone(),
                    subject: format!(
                        "{}\n\nThis is an automated change after the {} release.",
                        title, semv
                    ),
                },
                &self.config.orchestrator.reviewers,
                changed,
            )
            .await?;
        Ok(Some(change_id))
    }
}
