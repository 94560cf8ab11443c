//! Version selection helpers for the gopls flows.

use super::TAG_PREFIX;
use crate::clients::ReviewClient;
use crate::error::Result;
use crate::version::ReleaseVersion;
use std::collections::HashSet;

/// Parse a gopls tag name into its version, ignoring anything that is not a
/// `gopls/vX.Y.Z[-pre.N]` tag.
pub fn parse_gopls_tag(tag: &str) -> Option<ReleaseVersion> {
    let bare = tag.strip_prefix(TAG_PREFIX)?;
    ReleaseVersion::parse(bare).ok()
}

/// Suitable versions for the next release given the existing tags.
///
/// For every existing final release the next-major, next-minor, and
/// next-patch candidates not already covered by an existing release are
/// proposed; the union across all tags, deduplicated and sorted, is the only
/// acceptable input set for the pre-release flow.
pub fn possible_versions_from(tags: &[String]) -> Vec<ReleaseVersion> {
    let finals: Vec<ReleaseVersion> = tags
        .iter()
        .filter_map(|tag| parse_gopls_tag(tag))
        .filter(ReleaseVersion::is_final)
        .collect();

    let majors: HashSet<u64> = finals.iter().map(|v| v.major).collect();
    let minors: HashSet<(u64, u64)> = finals.iter().map(|v| (v.major, v.minor)).collect();
    let triples: HashSet<(u64, u64, u64)> = finals
        .iter()
        .map(|v| (v.major, v.minor, v.patch))
        .collect();

    let mut possible = Vec::new();
    let mut seen = HashSet::new();
    for v in &finals {
        let next_major = ReleaseVersion::new(v.major + 1, 0, 0);
        if !majors.contains(&(v.major + 1)) && seen.insert(next_major) {
            possible.push(next_major);
        }

        let next_minor = v.next_minor();
        if !minors.contains(&(v.major, v.minor + 1)) && seen.insert(next_minor) {
            possible.push(next_minor);
        }

        let next_patch = ReleaseVersion::new(v.major, v.minor, v.patch + 1);
        if !triples.contains(&(v.major, v.minor, v.patch + 1)) && seen.insert(next_patch) {
            possible.push(next_patch);
        }
    }

    possible.sort();
    possible
}

/// The highest existing pre-release ordinal for the exact triple of
/// `version`, independent of tag listing order. Zero when no pre-release of
/// the triple exists yet.
pub fn max_prerelease_ordinal(tags: &[String], version: ReleaseVersion) -> u64 {
    tags.iter()
        .filter_map(|tag| parse_gopls_tag(tag))
        .filter(|v| v.triple() == version.triple())
        .filter_map(|v| v.pre)
        .max()
        .unwrap_or(0)
}

/// List the host project's tags and compute the current pre-release ordinal
/// for `version`'s triple.
pub async fn current_prerelease<R: ReviewClient>(
    review: &R,
    project: &str,
    version: ReleaseVersion,
) -> Result<u64> {
    let tags = review.list_tags(project).await?;
    Ok(max_prerelease_ordinal(&tags, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn possible_versions_proposes_uncovered_candidates() {
        let listed = tags(&["gopls/v1.2.0", "gopls/v1.2.1"]);
        let possible = possible_versions_from(&listed);
        let rendered: Vec<String> = possible.iter().map(|v| v.to_string()).collect();
        assert!(rendered.contains(&"v1.3.0".to_string()));
        assert!(rendered.contains(&"v1.2.2".to_string()));
        assert!(rendered.contains(&"v2.0.0".to_string()));
        assert!(!rendered.contains(&"v1.2.0".to_string()));
        assert!(!rendered.contains(&"v1.2.1".to_string()));
    }

    #[test]
    fn possible_versions_skips_covered_next_patch() {
        // v1.2.1 exists, so v1.2.0's next-patch candidate is covered.
        let listed = tags(&["gopls/v1.2.0", "gopls/v1.2.1"]);
        let possible = possible_versions_from(&listed);
        assert!(!possible.contains(&ReleaseVersion::new(1, 2, 1)));
        assert!(possible.contains(&ReleaseVersion::new(1, 2, 2)));
    }

    #[test]
    fn possible_versions_ignores_prereleases_and_foreign_tags() {
        let listed = tags(&["gopls/v1.2.0", "gopls/v1.3.0-pre.1", "v9.9.9", "release-2024"]);
        let possible = possible_versions_from(&listed);
        assert!(possible.contains(&ReleaseVersion::new(1, 3, 0)));
        assert!(!possible.iter().any(|v| v.major == 9));
    }

    #[test]
    fn possible_versions_is_sorted_and_deduplicated() {
        let listed = tags(&["gopls/v0.1.0", "gopls/v0.2.0"]);
        let possible = possible_versions_from(&listed);
        let mut sorted = possible.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(possible, sorted);
    }

    #[test]
    fn prerelease_ordinal_is_listing_order_independent() {
        let triple = ReleaseVersion::new(1, 2, 0);
        let forward = tags(&["gopls/v1.2.0-pre.1", "gopls/v1.2.0-pre.3"]);
        let backward = tags(&["gopls/v1.2.0-pre.3", "gopls/v1.2.0-pre.1"]);
        assert_eq!(max_prerelease_ordinal(&forward, triple), 3);
        assert_eq!(max_prerelease_ordinal(&backward, triple), 3);
    }

    #[test]
    fn prerelease_ordinal_filters_by_exact_triple() {
        let listed = tags(&["gopls/v1.2.0-pre.5", "gopls/v1.2.1-pre.9"]);
        assert_eq!(max_prerelease_ordinal(&listed, ReleaseVersion::new(1, 2, 0)), 5);
        assert_eq!(max_prerelease_ordinal(&listed, ReleaseVersion::new(1, 3, 0)), 0);
    }
}
