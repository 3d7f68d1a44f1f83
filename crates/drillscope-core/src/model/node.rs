// ── Node data model ──
//
// `FetchedNode` is what crosses the fetcher boundary; `NodeSnapshot` is
// the immutable, renderable view of a materialized node.

use serde::Serialize;
use strum::{Display, EnumString};

use super::path::{NodeKey, NodePath};
use crate::error::FetchError;

// ── Load status ─────────────────────────────────────────────────────

/// Per-node child-loading state machine.
///
/// `Unloaded → Loading → Loaded | Failed`, once per expand attempt.
/// `Failed → Loading` on retry; `Loaded → Unloaded` only through an
/// explicit invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoadStatus {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl LoadStatus {
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }

    pub fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// A fetch may be started from this state.
    pub fn is_fetchable(self) -> bool {
        matches!(self, Self::Unloaded | Self::Failed)
    }
}

/// Result of reading a node's children (`getChildren`).
#[derive(Debug, Clone, PartialEq)]
pub enum ChildState<M> {
    Unloaded,
    Loading,
    /// Loaded children in fetcher order. An empty list is the defined
    /// "no children" state.
    Loaded(Vec<NodeSnapshot<M>>),
    Failed(FetchError),
}

impl<M> ChildState<M> {
    pub fn status(&self) -> LoadStatus {
        match self {
            Self::Unloaded => LoadStatus::Unloaded,
            Self::Loading => LoadStatus::Loading,
            Self::Loaded(_) => LoadStatus::Loaded,
            Self::Failed(_) => LoadStatus::Failed,
        }
    }

    pub fn loaded(&self) -> Option<&[NodeSnapshot<M>]> {
        match self {
            Self::Loaded(children) => Some(children),
            _ => None,
        }
    }
}

// ── Fetcher output ──────────────────────────────────────────────────

/// One child row produced by a `NodeFetcher`.
///
/// The core normalizes these before attaching them: blank labels fall
/// back to the key, blank keys are dropped, and duplicate sibling keys
/// keep their first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedNode<M> {
    pub key: NodeKey,
    pub label: Option<String>,
    pub metrics: M,
    /// `Some(true)` marks a leaf regardless of the configured depth.
    pub is_terminal: Option<bool>,
}

impl<M> FetchedNode<M> {
    pub fn new(key: impl Into<NodeKey>, metrics: M) -> Self {
        Self {
            key: key.into(),
            label: None,
            metrics,
            is_terminal: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn terminal(mut self, is_terminal: bool) -> Self {
        self.is_terminal = Some(is_terminal);
        self
    }
}

impl<M: Default> FetchedNode<M> {
    /// A row with default metrics; convenient for fakes and tests.
    pub fn keyed(key: impl Into<NodeKey>) -> Self {
        Self::new(key, M::default())
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Immutable view of one materialized node and its retained subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot<M> {
    pub key: NodeKey,
    pub path: NodePath,
    pub label: String,
    pub depth: usize,
    pub metrics: M,
    pub is_terminal: bool,
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchError>,
    /// Last successfully loaded children. Kept while the node is
    /// `Loading` or `Failed` so a host can keep drawing them.
    pub children: Vec<NodeSnapshot<M>>,
}

impl<M> NodeSnapshot<M> {
    /// Walk down the retained subtree by relative keys.
    pub fn descendant<'a>(&self, keys: impl IntoIterator<Item = &'a NodeKey>) -> Option<&Self> {
        keys.into_iter().try_fold(self, |node, key| {
            node.children.iter().find(|c| &c.key == key)
        })
    }

    /// Number of materialized nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }
}

/// Find a node in a forest snapshot by absolute path.
pub fn find_in_forest<'a, M>(
    roots: &'a [NodeSnapshot<M>],
    path: &NodePath,
) -> Option<&'a NodeSnapshot<M>> {
    let (first, rest) = path.keys().split_first()?;
    roots
        .iter()
        .find(|n| &n.key == first)
        .and_then(|n| n.descendant(rest))
}
