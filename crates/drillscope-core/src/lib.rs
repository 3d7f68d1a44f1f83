//! Lazy hierarchical drill-down engine.
//!
//! Explores a category hierarchy one level at a time, fetching each
//! node's children only when the node is first opened:
//!
//! - **[`DrillController`]**: Orchestration facade and the only caller of
//!   the [`NodeFetcher`]. [`select_node()`](DrillController::select_node)
//!   expands, collapses, or switches branch; already-loaded children are
//!   served from the tree without I/O, and at most one fetch per path is
//!   in flight at a time.
//!
//! - **[`TreeStore`]**: Arena of nodes addressed by [`NodePath`], with a
//!   per-node `Unloaded → Loading → Loaded | Failed` state machine and a
//!   generation tag that discards superseded fetch results.
//!
//! - **[`PathCursor`]**: The active selection chain and its breadcrumb
//!   trail.
//!
//! - **[`ViewStream`]**: Subscription to immutable [`DrillView`]
//!   snapshots published after every tree or cursor change.
//!
//! - **[`DrillCommand`]**: Every mutation as one enum, for hosts that
//!   route UI events through [`execute()`](DrillController::execute).

pub mod command;
pub mod config;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{DrillCommand, DrillOutcome};
pub use config::DrillConfig;
pub use controller::{DrillController, DrillStats};
pub use cursor::{Breadcrumb, PathCursor};
pub use error::{CoreError, FetchError};
pub use fetcher::{FetchRequest, NodeFetcher, StaticFetcher};
pub use store::{ApplyOutcome, Generation, LoadTicket, TreeStore};
pub use stream::{DrillView, ViewStream, ViewWatchStream};

pub use model::{
    ChildState, FetchedNode, LoadStatus, NodeKey, NodePath, NodeSnapshot, QueryContext,
};
