//! Module manifest model.
//!
//! Every module in the family declares its identity and required dependency
//! versions in a TOML manifest at the repository root. The graph builder reads
//! it to discover in-family edges; the update task rewrites it through the
//! remote execution service.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Manifest file name at a module's repository root
pub const MANIFEST_FILE: &str = "module.toml";

/// Lock file maintained next to the manifest by the module tool
pub const LOCK_FILE: &str = "module.lock";

/// A parsed module manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Canonical module path declared by this manifest
    pub module: String,
    /// Required dependency modules
    #[serde(default, rename = "require")]
    pub requires: Vec<Requirement>,
}

/// A single declared requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    /// Required module path
    pub module: String,
    /// Required version string
    pub version: String,
}

impl ModuleManifest {
    /// Parse manifest text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Whether `path` is a direct member of the family rooted at `prefix`.
///
/// Nested sub-modules (an extra path segment beyond the family prefix) are
/// not handled by the orchestrator and must be skipped, not errored.
pub fn in_family(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_manifest_with_requirements() {
        let text = r#"
module = "example.dev/fam/tools"

[[require]]
module = "example.dev/fam/mod"
version = "v0.9.0"

[[require]]
module = "other.dev/lib"
version = "v2.0.0"
"#;
        let mf = ModuleManifest::parse(text).unwrap();
        assert_eq!(mf.module, "example.dev/fam/tools");
        assert_eq!(mf.requires.len(), 2);
        assert_eq!(mf.requires[0].module, "example.dev/fam/mod");
    }

    #[test]
    fn parse_manifest_without_requirements() {
        let mf = ModuleManifest::parse("module = \"example.dev/fam/sync\"\n").unwrap();
        assert!(mf.requires.is_empty());
    }

    #[test]
    fn family_membership() {
        assert!(in_family("example.dev/fam/", "example.dev/fam/tools"));
        assert!(!in_family("example.dev/fam/", "example.dev/fam/exp/event")); // nested
        assert!(!in_family("example.dev/fam/", "example.dev/fam/"));
        assert!(!in_family("example.dev/fam/", "other.dev/lib"));
    }
}
