//! Idempotent per-module tag decision.

use crate::clients::ReviewClient;
use crate::error::{Result, TagError};
use crate::flow::TaskContext;
use crate::graph::ModuleRepo;
use crate::version::ReleaseVersion;

/// Decide whether `repo` needs a new tag at `commit`, and apply it.
///
/// If the highest existing release tag already points at `commit` the module
/// needs no new tag and the existing version is returned unchanged.
/// Otherwise the next minor version is tagged at `commit`. The created tag is
/// the one non-idempotent action in the module flow: a re-run after the tag
/// landed fails with the client's tag-exists error rather than silently
/// succeeding, because recreation at a different commit would corrupt the
/// release history.
pub async fn maybe_tag<R: ReviewClient>(
    ctx: &TaskContext,
    review: &R,
    repo: &ModuleRepo,
    commit: &str,
) -> Result<ReleaseVersion> {
    let tags = review.list_tags(&repo.project).await?;
    let highest = highest_release(&tags).ok_or_else(|| TagError::NoReleases {
        project: repo.project.clone(),
        tags: tags.clone(),
    })?;

    let tag_info = review.get_tag(&repo.project, &highest.to_string()).await?;
    if tag_info.commit == commit {
        ctx.info(format!(
            "{}: commit {} already carries {}",
            repo.project, commit, highest
        ));
        return Ok(highest);
    }

    let next = highest.next_minor();
    review
        .create_tag(&repo.project, &next.to_string(), commit)
        .await?;
    ctx.info(format!("{}: tagged {} at {}", repo.project, next, commit));
    Ok(next)
}

/// The highest valid, non-pre-release version among `tags`.
///
/// Tags that do not parse as release versions are ignored.
pub fn highest_release(tags: &[String]) -> Option<ReleaseVersion> {
    tags.iter()
        .filter_map(|tag| ReleaseVersion::parse(tag).ok())
        .filter(ReleaseVersion::is_final)
        .max()
}
