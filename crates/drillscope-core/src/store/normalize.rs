// ── Boundary normalization ──
//
// Fetcher rows are validated before they enter the tree so that sibling
// keys stay unique and every node has a displayable label.

use std::collections::HashSet;

use tracing::warn;

use crate::model::{FetchedNode, NodeKey, NodePath};

/// A fetched row that passed validation.
#[derive(Debug)]
pub(crate) struct NormalizedNode<M> {
    pub key: NodeKey,
    pub label: String,
    pub metrics: M,
    pub is_terminal: bool,
}

/// Drop blank keys and duplicate siblings (first occurrence wins),
/// resolve missing labels to the key. Order is preserved.
pub(crate) fn normalize_children<M>(
    parent: &NodePath,
    rows: Vec<FetchedNode<M>>,
) -> Vec<NormalizedNode<M>> {
    let mut seen: HashSet<NodeKey> = HashSet::with_capacity(rows.len());
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        if row.key.is_blank() {
            warn!(parent = %parent, "dropping fetched node with blank key");
            continue;
        }
        if !seen.insert(row.key.clone()) {
            warn!(parent = %parent, key = %row.key, "dropping duplicate sibling key");
            continue;
        }

        let label = match row.label {
            Some(label) if !label.trim().is_empty() => label,
            _ => row.key.to_string(),
        };

        out.push(NormalizedNode {
            key: row.key,
            label,
            metrics: row.metrics,
            is_terminal: row.is_terminal.unwrap_or(false),
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_keep_first() {
        let rows = vec![
            FetchedNode::new("a", 1),
            FetchedNode::new("b", 2),
            FetchedNode::new("a", 3),
        ];
        let out = normalize_children(&NodePath::root(), rows);
        let keys: Vec<_> = out.iter().map(|n| (n.key.as_str(), n.metrics)).collect();
        assert_eq!(keys, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn blank_keys_dropped_and_labels_defaulted() {
        let rows = vec![
            FetchedNode::new(" ", 0),
            FetchedNode::new("north", 0).with_label(""),
            FetchedNode::new("south", 0).with_label("South region"),
        ];
        let out = normalize_children(&NodePath::root(), rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, "north");
        assert_eq!(out[1].label, "South region");
    }
}
