use serde::Serialize;

/// Longest tag accepted by record validation, in characters.
pub const MAX_TAG_LEN: usize = 64;

/// Ordered set of tags: insertion order is preserved, duplicates are dropped
/// on insert. Tags are trimmed; blank tags are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert `tag` at the end. Returns `false` when it was blank or already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let trimmed = tag.trim();
        if trimmed.is_empty() || self.contains(trimmed) {
            return false;
        }
        let owned = if trimmed.len() == tag.len() {
            tag
        } else {
            trimmed.to_string()
        };
        self.0.push(owned);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for tag in iter {
            self.insert(tag);
        }
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for TagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let tags: TagSet = ["git", "vcs", "slow"].into_iter().collect();
        assert_eq!(tags.as_slice(), ["git", "vcs", "slow"]);
    }

    #[test]
    fn suppresses_duplicates_keeping_first_position() {
        let mut tags = TagSet::new();
        assert!(tags.insert("git"));
        assert!(tags.insert("failed"));
        assert!(!tags.insert("git"));
        assert_eq!(tags.as_slice(), ["git", "failed"]);
    }

    #[test]
    fn trims_and_ignores_blank_tags() {
        let mut tags = TagSet::new();
        assert!(!tags.insert("   "));
        assert!(!tags.insert(""));
        assert!(tags.insert("  npm "));
        assert!(!tags.insert("npm"));
        assert_eq!(tags.as_slice(), ["npm"]);
    }

    #[test]
    fn extend_applies_the_same_dedup() {
        let mut tags: TagSet = ["a"].into_iter().collect();
        tags.extend(["b", "a", "c"]);
        assert_eq!(tags.to_string(), "a,b,c");
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn serializes_as_plain_array() {
        let tags: TagSet = ["x", "y"].into_iter().collect();
        let json = serde_json::to_string(&tags).unwrap_or_default();
        assert_eq!(json, r#"["x","y"]"#);
    }
}
