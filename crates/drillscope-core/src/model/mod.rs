// ── Domain model ──
//
// Identity (keys, paths), node state, fetch rows, and the filter
// snapshot. Everything here is plain data; behavior lives in `store`
// and `controller`.

pub mod context;
pub mod node;
pub mod path;

pub use context::QueryContext;
pub use node::{ChildState, FetchedNode, LoadStatus, NodeSnapshot, find_in_forest};
pub use path::{NodeKey, NodePath, PATH_SEPARATOR};
