// ── Tree store ──
//
// Path-addressed, lazily-populated storage for the visited hierarchy.

mod normalize;
mod tree_store;

pub use tree_store::{ApplyOutcome, Generation, LoadTicket, TreeStore};
