// ── Node identity and addressing ──
//
// Keys are unique among siblings only. A node is addressed by the chain
// of keys from the virtual root, never by pointer or global id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator used by the textual form of a [`NodePath`].
pub const PATH_SEPARATOR: char = '/';

// ── NodeKey ─────────────────────────────────────────────────────────

/// Identifier of a node, unique within its parent's child list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for NodeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── NodePath ────────────────────────────────────────────────────────

/// Ordered chain of keys from the virtual root down to a node.
///
/// The empty path addresses the virtual root, whose children are the
/// forest of depth-0 nodes. A path of length `n` addresses a node at
/// depth `n - 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<NodeKey>);

impl NodePath {
    /// The virtual root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(keys: Vec<NodeKey>) -> Self {
        Self(keys)
    }

    pub fn keys(&self) -> &[NodeKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.is_empty()
    }

    /// Depth of the addressed node, or `None` for the virtual root.
    pub fn depth(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    pub fn last(&self) -> Option<&NodeKey> {
        self.0.last()
    }

    /// The parent path. The root is its own parent.
    pub fn parent(&self) -> Self {
        self.truncated(self.0.len().saturating_sub(1))
    }

    /// A new path one level deeper.
    pub fn child(&self, key: impl Into<NodeKey>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    /// The first `len` keys (clamped to the current length).
    pub fn truncated(&self, len: usize) -> Self {
        Self(self.0.iter().take(len).cloned().collect())
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn push(&mut self, key: impl Into<NodeKey>) {
        self.0.push(key.into());
    }

    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Every proper prefix from the root up to (not including) `self`.
    pub fn prefixes(&self) -> impl Iterator<Item = Self> + '_ {
        (0..self.0.len()).map(|n| self.truncated(n))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeKey> {
        self.0.iter()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{PATH_SEPARATOR}")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = std::convert::Infallible;

    /// Parses `"north/teamA"`. Empty segments are skipped, so `""` and
    /// `"/"` both denote the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(
            s.split(PATH_SEPARATOR)
                .filter(|seg| !seg.is_empty())
                .map(NodeKey::from)
                .collect(),
        ))
    }
}

impl<K: Into<NodeKey>> FromIterator<K> for NodePath {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a NodePath {
    type Item = &'a NodeKey;
    type IntoIter = std::slice::Iter<'a, NodeKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let path: NodePath = "north/teamA".parse().unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path.to_string(), "north/teamA");
    }

    #[test]
    fn empty_string_is_root() {
        let path: NodePath = "/".parse().unwrap();
        assert!(path.is_root());
        assert_eq!(path.depth(), None);
    }

    #[test]
    fn parent_of_root_is_root() {
        assert!(NodePath::root().parent().is_root());
    }

    #[test]
    fn child_and_parent() {
        let path = NodePath::root().child("north").child("teamA");
        assert_eq!(path.depth(), Some(1));
        assert_eq!(path.parent(), NodePath::from_iter(["north"]));
    }

    #[test]
    fn truncated_clamps() {
        let path = NodePath::from_iter(["a", "b"]);
        assert_eq!(path.truncated(5), path);
        assert!(path.truncated(0).is_root());
    }

    #[test]
    fn prefixes_exclude_self() {
        let path = NodePath::from_iter(["a", "b", "c"]);
        let prefixes: Vec<String> = path.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, vec!["", "a", "a/b"]);
    }
}
