//! Gopls pre-release flow.

use super::version::{current_prerelease, possible_versions_from};
use super::{GoplsReleaseTasks, gopls_tag, release_branch_name};
use crate::changes;
use crate::clients::{
    ChangeInput, IssueRequest, IssueTracker, MailContent, MailSender, ReviewClient, ScriptRunner,
};
use crate::error::{ReleaseError, Result};
use crate::flow::{ApprovalGate, TaskContext};
use crate::manifest::{LOCK_FILE, MANIFEST_FILE};
use crate::version::ReleaseVersion;

/// Branch review configuration file
const REVIEW_CONFIG_FILE: &str = "codereview.cfg";

impl<R, T, S, M, A> GoplsReleaseTasks<R, T, S, M, A>
where
    R: ReviewClient,
    T: IssueTracker,
    S: ScriptRunner,
    M: MailSender,
    A: ApprovalGate,
{
    /// Run the pre-release flow for `version` (e.g. `"v0.16.3"`).
    ///
    /// Returns the tagged pre-release version.
    pub async fn run_prerelease(&self, ctx: &TaskContext, version: &str) -> Result<ReleaseVersion> {
        let semv = self.validate_release_version(ctx, version).await?;
        let ordinal =
            current_prerelease(&self.review, &self.config.host_project, semv).await? + 1;

        ctx.info(format!(
            "the next release candidate will be {}-pre.{}",
            semv, ordinal
        ));
        self.approval.approve(ctx).await?;

        let issue = self.create_release_issue(ctx, semv).await?;
        self.create_branch_if_minor(ctx, semv).await?;

        let config_change = self.update_review_config(ctx, semv, issue).await?;
        changes::await_submission(
            ctx,
            &self.review,
            config_change.as_deref(),
            self.config.orchestrator.poll_period,
        )
        .await?;

        let dependency_change = self.update_host_dependency(ctx, semv, ordinal, issue).await?;
        let merged = changes::await_submission(
            ctx,
            &self.review,
            dependency_change.as_deref(),
            self.config.orchestrator.poll_period,
        )
        .await?;
        // Re-runs may find the dependency already pinned; the branch head is
        // then the commit the earlier run merged.
        let commit = match merged {
            Some(commit) => commit,
            None => {
                self.review
                    .read_branch_head(&self.config.host_project, &release_branch_name(semv))
                    .await?
            }
        };

        self.verify_installation(ctx, &commit).await?;
        let prerelease = self.tag_prerelease(ctx, semv, &commit, ordinal).await?;
        self.verify_installation(ctx, &prerelease.to_string()).await?;
        self.mail_announcement(ctx, prerelease, &commit, issue).await?;

        ctx.record_output("version", &prerelease.to_string())?;
        Ok(prerelease)
    }

    /// Validate that the input is syntactically valid and is a legitimate
    /// next version given the existing final release tags.
    pub async fn validate_release_version(
        &self,
        ctx: &TaskContext,
        version: &str,
    ) -> Result<ReleaseVersion> {
        let semv = ReleaseVersion::parse(version)?;
        let tags = self.review.list_tags(&self.config.host_project).await?;
        let possible = possible_versions_from(&tags);
        if !possible.contains(&semv) {
            return Err(ReleaseError::NotNextVersion {
                version: version.to_string(),
            }
            .into());
        }
        ctx.info(format!("validated input version {}", semv));
        Ok(semv)
    }

    /// Locate the release tracking issue for this version, creating it in
    /// the version's milestone if it does not exist yet.
    pub async fn create_release_issue(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
    ) -> Result<i64> {
        let milestone_name = format!("gopls/{}", semv);
        let milestone = self.tracker.fetch_milestone(&milestone_name).await?;
        ctx.info(format!("found release milestone {}", milestone));

        let title = format!("{}/gopls: release version {}", self.config.host_module, semv);
        for number in self.tracker.milestone_issues(milestone).await? {
            let issue = self.tracker.get_issue(number).await?;
            if issue.title == title {
                ctx.info(format!("found existing release issue {}", number));
                return Ok(number);
            }
        }

        let body = format!(
            "This issue tracks progress toward releasing gopls@{semv}\n\n\
             - [ ] create or update {branch}\n\
             - [ ] update {manifest} (drop local override, update host version)\n\
             - [ ] tag gopls/{semv}-pre.1\n\
             - [ ] update milestone\n\
             - [ ] write release notes\n\
             - [ ] smoke test features\n\
             - [ ] tag gopls/{semv}\n\
             - [ ] (if vX.Y.0 release): update dependencies in {default} for the next release\n",
            semv = semv,
            branch = release_branch_name(semv),
            manifest = MANIFEST_FILE,
            default = self.config.default_branch,
        );
        let number = self
            .tracker
            .create_issue(IssueRequest {
                title,
                body,
                labels: vec!["gopls".to_string(), "Tools".to_string()],
                assignee: self.config.assignee.clone(),
                milestone,
            })
            .await?;
        ctx.info(format!("created release issue {}", number));
        Ok(number)
    }

    /// Create the release branch if this is a new minor or major release.
    ///
    /// Patch releases require the branch to already exist; that it is
    /// missing means the minor release it belongs to never happened.
    pub async fn create_branch_if_minor(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
    ) -> Result<()> {
        let branch = release_branch_name(semv);
        let project = &self.config.host_project;

        if semv.patch != 0 {
            return match self.review.read_branch_head(project, &branch).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => {
                    Err(ReleaseError::MissingReleaseBranch { branch }.into())
                }
                Err(e) => Err(e),
            };
        }

        // Only present if an earlier run of this flow was interrupted after
        // branch creation.
        if self.review.read_branch_head(project, &branch).await.is_ok() {
            ctx.info(format!("release branch {} already exists", branch));
            return Ok(());
        }

        let head = self
            .review
            .read_branch_head(project, &self.config.default_branch)
            .await?;
        ctx.info(format!("creating branch {} at revision {}", branch, head));
        self.review.create_branch(project, &branch, &head).await?;
        Ok(())
    }

    /// Idempotently create a change setting the branch's review
    /// configuration.
    ///
    /// Returns the change id, or `None` when the configuration is already
    /// correct and no change is needed.
    pub async fn update_review_config(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
        issue: i64,
    ) -> Result<Option<String>> {
        let branch = release_branch_name(semv);
        let project = &self.config.host_project;
        let title = format!("all: update {} for {}", REVIEW_CONFIG_FILE, branch);

        if let Some(existing) = changes::open_change(
            &self.review,
            project,
            &branch,
            &self.config.change_owner,
            &title,
        )
        .await?
        {
            ctx.info(format!("not creating change: found existing change {}", existing));
            return Ok(Some(existing));
        }

        let head = self.review.read_branch_head(project, &branch).await?;
        let before = match self.review.read_file(project, &head, REVIEW_CONFIG_FILE).await {
            Ok(content) => content,
            Err(e) if e.is_not_found() => String::new(),
            Err(e) => return Err(e),
        };
        let after = format!(
            "branch: {}\nparent-branch: {}\n",
            branch, self.config.default_branch
        );
        if before == after {
            return Ok(None);
        }

        ctx.info(format!(
            "creating auto-submit change to {} under branch {}",
            REVIEW_CONFIG_FILE, branch
        ));
        let change_id = self
            .review
            .create_autosubmit_change(
                ChangeInput {
                    project: project.clone(),
                    branch,
                    subject: format!(
                        "{}\n\nThis is an automated change which updates {}.\n\nFor issue #{}",
                        title, REVIEW_CONFIG_FILE, issue
                    ),
                },
                &self.config.orchestrator.reviewers,
                [(REVIEW_CONFIG_FILE.to_string(), after)].into(),
            )
            .await?;
        Ok(Some(change_id))
    }

    /// Idempotently create a change bumping gopls' dependency on the host
    /// module to the release branch head.
    ///
    /// Returns the change id, or `None` when the manifest is already
    /// up to date.
    pub async fn update_host_dependency(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
        ordinal: u64,
        issue: i64,
    ) -> Result<Option<String>> {
        if ordinal == 0 {
            return Err(ReleaseError::EmptyInput {
                what: "pre-release ordinal",
            }
            .into());
        }

        let branch = release_branch_name(semv);
        let project = &self.config.host_project;
        let title = format!("gopls: update {} for {}-pre.{}", MANIFEST_FILE, semv, ordinal);

        if let Some(existing) = changes::open_change(
            &self.review,
            project,
            &branch,
            &self.config.change_owner,
            &title,
        )
        .await?
        {
            ctx.info(format!("not creating change: found existing change {}", existing));
            return Ok(Some(existing));
        }

        let head = self.review.read_branch_head(project, &branch).await?;
        let script = format!(
            "cd gopls\n{tool} drop-override {host}\n{tool} get {host}@{head}\n{tool} tidy\n",
            tool = self.config.module_tool,
            host = self.config.host_module,
            head = head,
        );
        let watch = [
            format!("gopls/{}", MANIFEST_FILE),
            format!("gopls/{}", LOCK_FILE),
        ];
        let changed =
            changes::execute_and_monitor_change(&self.script, project, &branch, &script, &watch)
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
                    branch,
                    subject: format!(
                        "{}\n\nThis is an automated change which updates the manifest.\n\nFor issue #{}",
                        title, issue
                    ),
                },
                &self.config.orchestrator.reviewers,
                changed,
            )
            .await?;
        Ok(Some(change_id))
    }

    /// Install gopls at `version_ref` (a commit, branch, or version) and run
    /// a fixed smoke command, failing the flow on any error.
    pub async fn verify_installation(&self, ctx: &TaskContext, version_ref: &str) -> Result<()> {
        if version_ref.is_empty() {
            return Err(ReleaseError::EmptyInput { what: "version" }.into());
        }

        let script = format!(
            "{tool} install {host}/gopls@{version} &> install.log\n\
             gopls version &> version.log\n\
             printf 'fn main() {{\\n    let a = 2;\\n    let _b = a;\\n}}\\n' > sample.rs\n\
             gopls references -d sample.rs:2:9 &> smoke.log\n",
            tool = self.config.module_tool,
            host = self.config.host_module,
            version = version_ref,
        );

        ctx.info(format!("verifying gopls at {}", version_ref));
        let outputs = self
            .script
            .run_script(
                &script,
                "",
                &[
                    "install.log".to_string(),
                    "version.log".to_string(),
                    "smoke.log".to_string(),
                ],
            )
            .await?;
        for log in ["install.log", "version.log", "smoke.log"] {
            if let Some(content) = outputs.get(log) {
                ctx.info(format!("{}:\n{}", log, content));
            }
        }
        Ok(())
    }

    /// Tag the pre-release at `commit`.
    ///
    /// Runs with retries disabled: recreating a pre-release tag at a
    /// different commit is a correctness hazard, not a recoverable
    /// transient fault.
    pub async fn tag_prerelease(
        &self,
        ctx: &TaskContext,
        semv: ReleaseVersion,
        commit: &str,
        ordinal: u64,
    ) -> Result<ReleaseVersion> {
        if commit.is_empty() {
            return Err(ReleaseError::EmptyInput { what: "commit" }.into());
        }
        if ordinal == 0 {
            return Err(ReleaseError::EmptyInput {
                what: "pre-release ordinal",
            }
            .into());
        }

        ctx.disable_retries();

        let version = ReleaseVersion {
            pre: Some(ordinal),
            ..semv.triple()
        };
        let tag = gopls_tag(version);
        self.review
            .create_tag(&self.config.host_project, &tag, commit)
            .await?;
        ctx.info(format!("tagged commit {} with tag {}", commit, tag));
        Ok(version)
    }

    /// Send the pre-release announcement.
    async fn mail_announcement(
        &self,
        ctx: &TaskContext,
        version: ReleaseVersion,
        commit: &str,
        issue: i64,
    ) -> Result<()> {
        let content = MailContent {
            subject: format!("gopls {} is released for testing", version),
            body: format!(
                "gopls {version} is tagged and ready for testing.\n\n\
                 Branch: {branch}\nCommit: {commit}\nTracking issue: #{issue}\n\n\
                 Install it with: {tool} install {host}/gopls@{version}\n",
                version = version,
                branch = release_branch_name(version),
                commit = commit,
                issue = issue,
                tool = self.config.module_tool,
                host = self.config.host_module,
            ),
        };
        ctx.info(format!("announcement subject: {}", content.subject));
        self.mail.send(&self.config.announce_header, content).await
    }
}
