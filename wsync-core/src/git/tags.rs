//! Version tag naming and selection

use std::fmt;

/// Default name of the marker tag recording the last fleet-wide sync
pub const LAST_SYNCED_TAG: &str = "last-synced";

/// A `v<N>` major version tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag {
    major: u64,
}

impl VersionTag {
    /// Tag used when the source repository has never been tagged
    pub fn first() -> Self {
        Self { major: 1 }
    }

    /// Create a tag for the given major version
    ///
    /// Returns `None` for zero, which is not a valid version.
    pub fn new(major: u64) -> Option<Self> {
        (major > 0).then_some(Self { major })
    }

    /// Parse a tag name of the form `v<positive integer>`
    ///
    /// Leading zeros are rejected so that every tag has exactly one spelling.
    pub fn parse(name: &str) -> Option<Self> {
        let digits = name.strip_prefix('v')?;
        if digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
            || digits.starts_with('0')
        {
            return None;
        }
        digits.parse().ok().and_then(Self::new)
    }

    /// The major version number
    pub fn major(&self) -> u64 {
        self.major
    }

    /// The next major version
    pub fn next(&self) -> Self {
        Self {
            major: self.major + 1,
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.major)
    }
}

/// Pick the highest version tag among arbitrary tag names
///
/// Names that are not version tags are ignored; `None` means no version tag
/// exists yet.
pub fn latest_version_tag<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<VersionTag> {
    names.into_iter().filter_map(VersionTag::parse).max()
}

/// Extract tag names from `git ls-remote --tags` output
///
/// Peeled entries (`^{}`) collapse onto their tag name.
pub fn parse_ls_remote_tags(output: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for line in output.lines() {
        let Some(reference) = line.split_whitespace().nth(1) else {
            continue;
        };
        let Some(name) = reference.strip_prefix("refs/tags/") else {
            continue;
        };
        let name = name.trim_end_matches("^{}");
        if !tags.iter().any(|t| t == name) {
            tags.push(name.to_string());
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_tag() {
        assert_eq!(VersionTag::parse("v3").map(|t| t.major()), Some(3));
        assert_eq!(VersionTag::parse("v12").map(|t| t.major()), Some(12));
        assert!(VersionTag::parse("v0").is_none());
        assert!(VersionTag::parse("v01").is_none());
        assert!(VersionTag::parse("v").is_none());
        assert!(VersionTag::parse("v1.2").is_none());
        assert!(VersionTag::parse("last-synced").is_none());
        assert!(VersionTag::parse("3").is_none());
    }

    #[test]
    fn test_latest_is_numeric_not_lexicographic() {
        let latest = latest_version_tag(["v2", "v10", "v9", "last-synced"]).unwrap();
        assert_eq!(latest.to_string(), "v10");
    }

    #[test]
    fn test_latest_none_without_version_tags() {
        assert!(latest_version_tag(["last-synced", "release"]).is_none());
        assert!(latest_version_tag(std::iter::empty()).is_none());
    }

    #[test]
    fn test_next_and_first() {
        assert_eq!(VersionTag::first().to_string(), "v1");
        assert_eq!(VersionTag::parse("v3").unwrap().next().to_string(), "v4");
    }

    #[test]
    fn test_parse_ls_remote_tags() {
        let output = "\
1111111111111111111111111111111111111111\trefs/tags/last-synced
2222222222222222222222222222222222222222\trefs/tags/v1
3333333333333333333333333333333333333333\trefs/tags/v2
4444444444444444444444444444444444444444\trefs/tags/v2^{}
";
        assert_eq!(parse_ls_remote_tags(output), vec!["last-synced", "v1", "v2"]);
    }

    #[test]
    fn test_parse_ls_remote_tags_ignores_branches() {
        let output = "abc\trefs/heads/main\n\n";
        assert!(parse_ls_remote_tags(output).is_empty());
    }
}
