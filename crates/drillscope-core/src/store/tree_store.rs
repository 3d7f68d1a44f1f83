// ── Lazily-populated tree store ──
//
// Arena of nodes addressed by path. Each node owns an ordered key→id map
// of its children; nothing points back to a parent. The virtual root is
// a bare branch whose children are the depth-0 forest.

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::normalize::{NormalizedNode, normalize_children};
use crate::error::{CoreError, FetchError};
use crate::model::{ChildState, FetchedNode, LoadStatus, NodeKey, NodePath, NodeSnapshot};

/// Tag attached to an in-flight fetch. Drawn from a store-wide counter
/// and never reused, so a superseded response can never match.
pub type Generation = u64;

/// Outcome of [`TreeStore::set_loading`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTicket {
    /// The node moved to `Loading`; the fetch must carry this generation.
    Started(Generation),
    /// A fetch is already in flight; do not issue another.
    AlreadyLoading(Generation),
}

/// Outcome of applying a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The generation no longer matches; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeId(usize);

/// Child-loading state shared by real nodes and the virtual root.
#[derive(Debug)]
struct Branch {
    status: LoadStatus,
    error: Option<FetchError>,
    generation: Generation,
    children: IndexMap<NodeKey, NodeId>,
}

impl Branch {
    fn new() -> Self {
        Self {
            status: LoadStatus::Unloaded,
            error: None,
            generation: 0,
            children: IndexMap::new(),
        }
    }

    fn accepts(&self, generation: Generation) -> bool {
        self.status.is_loading() && self.generation == generation
    }
}

#[derive(Debug)]
struct Slot<M> {
    key: NodeKey,
    label: String,
    depth: usize,
    metrics: M,
    is_terminal: bool,
    branch: Branch,
}

/// Authoritative in-memory tree of the visited hierarchy.
///
/// Not internally synchronized: the controller owns it behind a lock and
/// never holds that lock across a fetch.
#[derive(Debug)]
pub struct TreeStore<M> {
    root: Branch,
    slots: Vec<Option<Slot<M>>>,
    free: Vec<NodeId>,
    next_generation: Generation,
    max_depth: Option<usize>,
    version: u64,
}

impl<M> TreeStore<M> {
    pub fn new() -> Self {
        Self::with_max_depth(None)
    }

    /// Nodes at `depth >= max_depth` are terminal.
    pub fn with_max_depth(max_depth: Option<usize>) -> Self {
        Self {
            root: Branch::new(),
            slots: Vec::new(),
            free: Vec::new(),
            next_generation: 1,
            max_depth,
            version: 0,
        }
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Bumped on every mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of materialized nodes (the virtual root excluded).
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Load status of the node at `path`.
    pub fn status(&self, path: &NodePath) -> Result<LoadStatus, CoreError> {
        Ok(self.branch(path)?.status)
    }

    /// Whether the node at `path` is a leaf. The root never is.
    pub fn is_terminal(&self, path: &NodePath) -> Result<bool, CoreError> {
        Ok(self.resolve(path)?.is_some_and(|id| self.slot(id).is_terminal))
    }

    /// Display label of the node at `path`, if it exists.
    pub fn label(&self, path: &NodePath) -> Option<&str> {
        let id = self.resolve(path).ok()??;
        Some(self.slot(id).label.as_str())
    }

    /// Current generation of the node at `path`.
    pub fn generation(&self, path: &NodePath) -> Result<Generation, CoreError> {
        Ok(self.branch(path)?.generation)
    }

    /// Error recorded by the last failed fetch of the node at `path`.
    pub fn error(&self, path: &NodePath) -> Result<Option<&FetchError>, CoreError> {
        Ok(self.branch(path)?.error.as_ref())
    }

    /// Number of children currently attached (retained ones included).
    pub fn child_count(&self, path: &NodePath) -> Result<usize, CoreError> {
        Ok(self.branch(path)?.children.len())
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Walk `path` from the root. Every proper prefix must be `Loaded`;
    /// the final node may be in any state. `None` is the virtual root.
    fn resolve(&self, path: &NodePath) -> Result<Option<NodeId>, CoreError> {
        let mut branch = &self.root;
        let mut current = None;

        for key in path {
            if !branch.status.is_loaded() {
                return Err(CoreError::path_not_found(path));
            }
            let id = *branch
                .children
                .get(key)
                .ok_or_else(|| CoreError::path_not_found(path))?;
            branch = &self.slot(id).branch;
            current = Some(id);
        }

        Ok(current)
    }

    fn branch(&self, path: &NodePath) -> Result<&Branch, CoreError> {
        Ok(match self.resolve(path)? {
            Some(id) => &self.slot(id).branch,
            None => &self.root,
        })
    }

    fn branch_mut(&mut self, path: &NodePath) -> Result<&mut Branch, CoreError> {
        Ok(match self.resolve(path)? {
            Some(id) => &mut self.slot_mut(id).branch,
            None => &mut self.root,
        })
    }

    fn slot(&self, id: NodeId) -> &Slot<M> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .expect("live node id points at a vacant slot")
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot<M> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .expect("live node id points at a vacant slot")
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Mark the node at `path` as `Loading`.
    ///
    /// Calling this while a fetch is in flight is a no-op that reports
    /// the outstanding generation.
    pub fn set_loading(&mut self, path: &NodePath) -> Result<LoadTicket, CoreError> {
        let generation = self.next_generation;
        let branch = self.branch_mut(path)?;
        if branch.status.is_loading() {
            return Ok(LoadTicket::AlreadyLoading(branch.generation));
        }
        branch.status = LoadStatus::Loading;
        branch.error = None;
        branch.generation = generation;

        self.next_generation += 1;
        self.version += 1;
        trace!(path = %path, generation, "node loading");
        Ok(LoadTicket::Started(generation))
    }

    /// Start a fetch unconditionally, superseding any in-flight one.
    /// Retained children stay in place until the new result lands.
    pub fn restart_loading(&mut self, path: &NodePath) -> Result<Generation, CoreError> {
        let generation = self.next_generation;
        let branch = self.branch_mut(path)?;
        branch.status = LoadStatus::Loading;
        branch.error = None;
        branch.generation = generation;

        self.next_generation += 1;
        self.version += 1;
        trace!(path = %path, generation, "node loading (restarted)");
        Ok(generation)
    }

    /// Replace the children of the node at `path` with `rows`, as fresh
    /// `Unloaded` nodes one level deeper. Any previous child list and its
    /// subtrees are discarded.
    pub fn set_children(
        &mut self,
        path: &NodePath,
        generation: Generation,
        rows: Vec<FetchedNode<M>>,
    ) -> Result<ApplyOutcome, CoreError> {
        if !self.branch(path)?.accepts(generation) {
            debug!(path = %path, generation, "discarding stale fetch result");
            return Ok(ApplyOutcome::Stale);
        }

        // Children of the node at depth `path.len() - 1`.
        let depth = path.len();
        let normalized = normalize_children(path, rows);

        let old: Vec<NodeId> = self.branch(path)?.children.values().copied().collect();
        for id in old {
            self.release(id);
        }

        let mut children = IndexMap::with_capacity(normalized.len());
        for node in normalized {
            let key = node.key.clone();
            let id = self.allocate(node, depth);
            children.insert(key, id);
        }

        let branch = self.branch_mut(path)?;
        branch.children = children;
        branch.status = LoadStatus::Loaded;
        branch.error = None;

        self.version += 1;
        Ok(ApplyOutcome::Applied)
    }

    /// Record a failed fetch. Previously loaded children are retained.
    pub fn set_failed(
        &mut self,
        path: &NodePath,
        generation: Generation,
        error: FetchError,
    ) -> Result<ApplyOutcome, CoreError> {
        let branch = self.branch_mut(path)?;
        if !branch.accepts(generation) {
            debug!(path = %path, generation, "discarding stale fetch failure");
            return Ok(ApplyOutcome::Stale);
        }
        branch.status = LoadStatus::Failed;
        branch.error = Some(error);

        self.version += 1;
        Ok(ApplyOutcome::Applied)
    }

    /// Force the node at `path` back to `Unloaded`, dropping its cached
    /// children. Any in-flight fetch for it becomes stale.
    pub fn invalidate(&mut self, path: &NodePath) -> Result<(), CoreError> {
        let generation = self.next_generation;
        let branch = self.branch_mut(path)?;
        let old: Vec<NodeId> = branch.children.drain(..).map(|(_, id)| id).collect();
        branch.status = LoadStatus::Unloaded;
        branch.error = None;
        branch.generation = generation;

        for id in old {
            self.release(id);
        }
        self.next_generation += 1;
        self.version += 1;
        debug!(path = %path, "node invalidated");
        Ok(())
    }

    // ── Arena management ─────────────────────────────────────────────

    fn allocate(&mut self, node: NormalizedNode<M>, depth: usize) -> NodeId {
        let is_terminal = node.is_terminal || self.max_depth.is_some_and(|max| depth >= max);
        let slot = Slot {
            key: node.key,
            label: node.label,
            depth,
            metrics: node.metrics,
            is_terminal,
            branch: Branch::new(),
        };

        if let Some(id) = self.free.pop() {
            self.slots[id.0] = Some(slot);
            id
        } else {
            self.slots.push(Some(slot));
            NodeId(self.slots.len() - 1)
        }
    }

    /// Free `id` and its whole subtree.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(slot) = self.slots.get_mut(id.0).and_then(Option::take) {
                stack.extend(slot.branch.children.values().copied());
                self.free.push(id);
            }
        }
    }
}

impl<M: Clone> TreeStore<M> {
    /// `getChildren`: the child state of the node at `path`.
    pub fn get_children(&self, path: &NodePath) -> Result<ChildState<M>, CoreError> {
        let branch = self.branch(path)?;
        Ok(match branch.status {
            LoadStatus::Unloaded => ChildState::Unloaded,
            LoadStatus::Loading => ChildState::Loading,
            LoadStatus::Failed => ChildState::Failed(branch.error.clone().unwrap_or_else(|| {
                FetchError::new("fetch failed")
            })),
            LoadStatus::Loaded => ChildState::Loaded(self.snapshot_children(branch, path)),
        })
    }

    /// Snapshot of a single node and its retained subtree.
    pub fn node(&self, path: &NodePath) -> Result<NodeSnapshot<M>, CoreError> {
        let id = self
            .resolve(path)?
            .ok_or_else(|| CoreError::path_not_found(path))?;
        Ok(self.snapshot_node(id, path.clone()))
    }

    /// Snapshot of the whole forest.
    pub fn roots(&self) -> Vec<NodeSnapshot<M>> {
        self.snapshot_children(&self.root, &NodePath::root())
    }

    fn snapshot_children(&self, branch: &Branch, path: &NodePath) -> Vec<NodeSnapshot<M>> {
        branch
            .children
            .iter()
            .map(|(key, id)| self.snapshot_node(*id, path.child(key.clone())))
            .collect()
    }

    fn snapshot_node(&self, id: NodeId, path: NodePath) -> NodeSnapshot<M> {
        let slot = self.slot(id);
        NodeSnapshot {
            key: slot.key.clone(),
            children: self.snapshot_children(&slot.branch, &path),
            path,
            label: slot.label.clone(),
            depth: slot.depth,
            metrics: slot.metrics.clone(),
            is_terminal: slot.is_terminal,
            status: slot.branch.status,
            error: slot.branch.error.clone(),
        }
    }
}

impl<M> Default for TreeStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn path(keys: &[&str]) -> NodePath {
        keys.iter().copied().collect()
    }

    fn rows(keys: &[&str]) -> Vec<FetchedNode<u32>> {
        keys.iter().map(|k| FetchedNode::new(*k, 0)).collect()
    }

    fn started(ticket: LoadTicket) -> Generation {
        match ticket {
            LoadTicket::Started(g) => g,
            LoadTicket::AlreadyLoading(g) => panic!("expected a new fetch, got in-flight {g}"),
        }
    }

    /// Store with roots `north`, `south` loaded.
    fn seeded() -> TreeStore<u32> {
        let mut store = TreeStore::new();
        let g = started(store.set_loading(&NodePath::root()).unwrap());
        store.set_children(&NodePath::root(), g, rows(&["north", "south"])).unwrap();
        store
    }

    #[test]
    fn fresh_store_root_is_unloaded() {
        let store: TreeStore<u32> = TreeStore::new();
        assert_eq!(store.get_children(&NodePath::root()).unwrap(), ChildState::Unloaded);
        assert!(store.is_empty());
    }

    #[test]
    fn set_children_attaches_unloaded_nodes_in_order() {
        let store = seeded();
        let children = store.get_children(&NodePath::root()).unwrap();
        let loaded = children.loaded().unwrap();
        let keys: Vec<_> = loaded.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["north", "south"]);
        assert!(loaded.iter().all(|n| n.depth == 0 && n.status == LoadStatus::Unloaded));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn path_through_unloaded_prefix_is_not_found() {
        let store = seeded();
        let err = store.get_children(&path(&["north", "teamA"])).unwrap_err();
        assert_eq!(err, CoreError::path_not_found(&path(&["north", "teamA"])));
        assert!(store.get_children(&path(&["west"])).is_err());
    }

    #[test]
    fn set_loading_twice_is_a_no_op() {
        let mut store = seeded();
        let north = path(&["north"]);
        let g = started(store.set_loading(&north).unwrap());
        assert_eq!(store.set_loading(&north).unwrap(), LoadTicket::AlreadyLoading(g));
        assert_eq!(store.status(&north).unwrap(), LoadStatus::Loading);
    }

    #[test]
    fn children_are_one_level_deeper() {
        let mut store = seeded();
        let north = path(&["north"]);
        let g = started(store.set_loading(&north).unwrap());
        store.set_children(&north, g, rows(&["teamA"])).unwrap();

        let team = store.node(&path(&["north", "teamA"])).unwrap();
        assert_eq!(team.depth, 1);
        assert_eq!(team.path, path(&["north", "teamA"]));
    }

    #[test]
    fn set_children_replaces_wholesale() {
        let mut store = seeded();
        let north = path(&["north"]);
        let g = started(store.set_loading(&north).unwrap());
        store.set_children(&north, g, rows(&["teamA", "teamB"])).unwrap();
        let g = store.restart_loading(&north).unwrap();
        store.set_children(&north, g, rows(&["teamC"])).unwrap();

        let keys: Vec<_> = store
            .get_children(&north)
            .unwrap()
            .loaded()
            .unwrap()
            .iter()
            .map(|n| n.key.to_string())
            .collect();
        assert_eq!(keys, vec!["teamC"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn failure_keeps_retained_children() {
        let mut store = seeded();
        let g = store.restart_loading(&NodePath::root()).unwrap();
        store
            .set_failed(&NodePath::root(), g, FetchError::new("boom"))
            .unwrap();

        assert_eq!(
            store.get_children(&NodePath::root()).unwrap(),
            ChildState::Failed(FetchError::new("boom"))
        );
        assert_eq!(store.roots().len(), 2);
    }

    #[test]
    fn failure_is_local_to_the_node() {
        let mut store = seeded();
        let north = path(&["north"]);
        let g = started(store.set_loading(&north).unwrap());
        store.set_failed(&north, g, FetchError::new("timeout")).unwrap();

        assert_eq!(store.status(&north).unwrap(), LoadStatus::Failed);
        assert_eq!(store.status(&path(&["south"])).unwrap(), LoadStatus::Unloaded);
        assert_eq!(store.status(&NodePath::root()).unwrap(), LoadStatus::Loaded);
    }

    #[test]
    fn empty_result_is_loaded_not_unloaded() {
        let mut store = seeded();
        let south = path(&["south"]);
        let g = started(store.set_loading(&south).unwrap());
        store.set_children(&south, g, Vec::new()).unwrap();
        assert_eq!(store.get_children(&south).unwrap(), ChildState::Loaded(Vec::new()));
    }

    #[test]
    fn invalidate_makes_in_flight_fetch_stale() {
        let mut store = seeded();
        let north = path(&["north"]);
        let old = started(store.set_loading(&north).unwrap());
        store.invalidate(&north).unwrap();
        let new = started(store.set_loading(&north).unwrap());
        assert_ne!(old, new);

        assert_eq!(
            store.set_children(&north, new, rows(&["fresh"])).unwrap(),
            ApplyOutcome::Applied
        );
        assert_eq!(
            store.set_children(&north, old, rows(&["stale"])).unwrap(),
            ApplyOutcome::Stale
        );
        assert!(store.node(&path(&["north", "fresh"])).is_ok());
        assert!(store.node(&path(&["north", "stale"])).is_err());
    }

    #[test]
    fn invalidate_releases_subtree() {
        let mut store = seeded();
        let north = path(&["north"]);
        let g = started(store.set_loading(&north).unwrap());
        store.set_children(&north, g, rows(&["a", "b", "c"])).unwrap();
        assert_eq!(store.len(), 5);

        store.invalidate(&north).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_children(&north).unwrap(), ChildState::Unloaded);

        // Freed slots are reused.
        let g = started(store.set_loading(&north).unwrap());
        store.set_children(&north, g, rows(&["d"])).unwrap();
        assert_eq!(store.slots.len(), 5);
    }

    #[test]
    fn generations_are_never_reused_across_recreated_nodes() {
        let mut store = seeded();
        let north = path(&["north"]);
        let old = started(store.set_loading(&north).unwrap());

        // Root re-fetch recreates `north` as a fresh node.
        let g = store.restart_loading(&NodePath::root()).unwrap();
        store.set_children(&NodePath::root(), g, rows(&["north"])).unwrap();
        let new = started(store.set_loading(&north).unwrap());

        assert_ne!(old, new);
        assert_eq!(
            store.set_children(&north, old, rows(&["x"])).unwrap(),
            ApplyOutcome::Stale
        );
    }

    #[test]
    fn max_depth_marks_terminal_nodes() {
        let mut store: TreeStore<u32> = TreeStore::with_max_depth(Some(1));
        let g = started(store.set_loading(&NodePath::root()).unwrap());
        store.set_children(&NodePath::root(), g, rows(&["north"])).unwrap();
        let north = path(&["north"]);
        assert!(!store.is_terminal(&north).unwrap());

        let g = started(store.set_loading(&north).unwrap());
        store.set_children(&north, g, rows(&["teamA"])).unwrap();
        assert!(store.is_terminal(&path(&["north", "teamA"])).unwrap());
        assert!(!store.is_terminal(&NodePath::root()).unwrap());
    }

    #[test]
    fn fetcher_can_mark_terminal() {
        let mut store: TreeStore<u32> = TreeStore::new();
        let g = started(store.set_loading(&NodePath::root()).unwrap());
        store
            .set_children(&NodePath::root(), g, vec![FetchedNode::new("leaf", 0).terminal(true)])
            .unwrap();
        assert!(store.is_terminal(&path(&["leaf"])).unwrap());
    }

    #[test]
    fn version_bumps_on_mutation() {
        let mut store = seeded();
        let before = store.version();
        store.invalidate(&path(&["south"])).unwrap();
        assert!(store.version() > before);
    }
}
