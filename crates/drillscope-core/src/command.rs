// ── Command API ──
//
// Every mutation a host can request, as one enum. UI event loops map
// their input events onto these and route them through
// `DrillController::execute`.

use serde::Serialize;

use crate::error::FetchError;
use crate::model::{NodePath, QueryContext};

/// All navigation and refresh intents understood by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DrillCommand {
    /// Fetch the depth-0 forest and reset the cursor.
    LoadRoot,
    /// Replace the filter snapshot and reload from the root.
    SetContext(QueryContext),
    /// Click on a node: expand, collapse, or switch branch.
    SelectNode(NodePath),
    /// Jump to breadcrumb `level` (number of keys kept).
    SelectBreadcrumb(usize),
    /// Clear the selection; cached branches stay.
    Reset,
    /// Re-issue a failed fetch without toggling the selection.
    Retry(NodePath),
    /// Drop cached children of a node and fetch them again.
    Refresh(NodePath),
    /// Drop cached children of a node without fetching.
    Invalidate(NodePath),
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrillOutcome {
    /// Children were fetched and attached.
    Fetched { children: usize },
    /// Children were already loaded; no I/O.
    CacheHit,
    /// The node is a leaf; selected without a fetch.
    Terminal,
    /// The active tip was re-selected and closed.
    Collapsed,
    /// A fetch for the node was already in flight; none was issued.
    AlreadyLoading,
    /// The fetch failed; the node now records `Failed`.
    Failed { error: FetchError },
    /// A newer fetch superseded this one and its result was dropped.
    Superseded,
    /// Cursor-only navigation (breadcrumb, reset, invalidate).
    Navigated,
}

impl DrillOutcome {
    /// Whether this outcome issued a fetch.
    pub fn fetched(&self) -> bool {
        matches!(
            self,
            Self::Fetched { .. } | Self::Failed { .. } | Self::Superseded
        )
    }
}
