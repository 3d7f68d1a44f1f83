// ── Path cursor ──
//
// The active selection chain. Mutated only by the controller; hosts read
// it through `active_path()` and `breadcrumbs()`.

use serde::Serialize;

use crate::model::{NodeKey, NodePath};
use crate::store::TreeStore;

/// One entry of the breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    /// Path of the node this crumb names.
    pub path: NodePath,
    pub key: NodeKey,
    pub depth: usize,
    /// Node label, or a depth-indexed placeholder when the node could
    /// not be resolved.
    pub label: String,
}

impl Breadcrumb {
    /// Placeholder label for a crumb whose node is missing from the store.
    pub fn placeholder_label(depth: usize) -> String {
        format!("Level {depth}")
    }
}

/// Effect of a selection on the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorMove {
    /// The active tip was re-selected and the cursor retracted one level.
    Collapsed,
    /// The cursor now ends at the selected node.
    Selected,
}

/// Deepest currently open node, as a path from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCursor {
    active: NodePath,
}

impl PathCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_path(&self) -> &NodePath {
        &self.active
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Whether `path` is the active tip.
    pub fn is_tip(&self, path: &NodePath) -> bool {
        !path.is_root() && &self.active == path
    }

    /// Whether `path` lies on the active chain (tip included).
    pub fn is_open(&self, path: &NodePath) -> bool {
        !path.is_root() && self.active.starts_with(path)
    }

    /// Re-selecting the tip retracts by one level; anything else
    /// truncates to the selection's parent and appends its key.
    pub(crate) fn select(&mut self, path: &NodePath) -> CursorMove {
        if self.is_tip(path) {
            self.active.truncate(path.len() - 1);
            CursorMove::Collapsed
        } else {
            self.active = path.clone();
            CursorMove::Selected
        }
    }

    /// Point the cursor at `path` without toggle semantics.
    pub(crate) fn open(&mut self, path: &NodePath) {
        self.active = path.clone();
    }

    /// Keep the first `level` keys. Returns `false` if `level` exceeds
    /// the current depth.
    pub(crate) fn truncate(&mut self, level: usize) -> bool {
        if level > self.active.len() {
            return false;
        }
        self.active.truncate(level);
        true
    }

    pub(crate) fn reset(&mut self) {
        self.active = NodePath::root();
    }

    /// Breadcrumb trail for the active path, labels resolved from `store`.
    pub fn breadcrumbs<M>(&self, store: &TreeStore<M>) -> Vec<Breadcrumb> {
        self.active
            .iter()
            .enumerate()
            .map(|(depth, key)| {
                let path = self.active.truncated(depth + 1);
                let label = store
                    .label(&path)
                    .map_or_else(|| Breadcrumb::placeholder_label(depth), str::to_owned);
                Breadcrumb {
                    path,
                    key: key.clone(),
                    depth,
                    label,
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::FetchedNode;
    use crate::store::LoadTicket;

    fn path(keys: &[&str]) -> NodePath {
        keys.iter().copied().collect()
    }

    #[test]
    fn selecting_tip_collapses_one_level() {
        let mut cursor = PathCursor::new();
        cursor.open(&path(&["a", "b"]));
        assert_eq!(cursor.select(&path(&["a", "b"])), CursorMove::Collapsed);
        assert_eq!(cursor.active_path(), &path(&["a"]));
    }

    #[test]
    fn selecting_sibling_replaces_tail() {
        let mut cursor = PathCursor::new();
        cursor.open(&path(&["a", "b", "c"]));
        assert_eq!(cursor.select(&path(&["a", "x"])), CursorMove::Selected);
        assert_eq!(cursor.active_path(), &path(&["a", "x"]));
    }

    #[test]
    fn selecting_ancestor_is_not_a_toggle() {
        let mut cursor = PathCursor::new();
        cursor.open(&path(&["a", "b", "c"]));
        assert_eq!(cursor.select(&path(&["a", "b"])), CursorMove::Selected);
        assert_eq!(cursor.active_path(), &path(&["a", "b"]));
        assert!(cursor.is_open(&path(&["a"])));
    }

    #[test]
    fn truncate_beyond_depth_is_rejected() {
        let mut cursor = PathCursor::new();
        cursor.open(&path(&["a"]));
        assert!(!cursor.truncate(2));
        assert!(cursor.truncate(0));
        assert!(cursor.active_path().is_root());
    }

    #[test]
    fn breadcrumbs_fall_back_to_placeholder() {
        let mut store: TreeStore<()> = TreeStore::new();
        let LoadTicket::Started(g) = store.set_loading(&NodePath::root()).unwrap() else {
            panic!("root should start loading");
        };
        store
            .set_children(&NodePath::root(), g, vec![FetchedNode::new("north", ()).with_label("North")])
            .unwrap();

        let mut cursor = PathCursor::new();
        cursor.open(&path(&["north", "ghost"]));
        let crumbs = cursor.breadcrumbs(&store);

        assert_eq!(crumbs.len(), 2);
        assert_eq!(crumbs[0].label, "North");
        assert_eq!(crumbs[0].depth, 0);
        assert_eq!(crumbs[1].label, "Level 1");
        assert_eq!(crumbs[1].path, path(&["north", "ghost"]));
    }
}
