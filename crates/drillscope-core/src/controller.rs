// ── Drill-down controller ──
//
// Orchestration layer and the only caller of the `NodeFetcher`. Turns
// navigation intents into path-addressed store mutations plus cursor
// moves, and publishes a fresh view after every change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::command::{DrillCommand, DrillOutcome};
use crate::config::DrillConfig;
use crate::cursor::{Breadcrumb, CursorMove, PathCursor};
use crate::error::{CoreError, FetchError};
use crate::fetcher::{FetchRequest, NodeFetcher};
use crate::model::{ChildState, LoadStatus, NodePath, NodeSnapshot, QueryContext};
use crate::store::{ApplyOutcome, Generation, LoadTicket, TreeStore};
use crate::stream::{DrillView, ViewStream};

// ── Stats ────────────────────────────────────────────────────────

/// Point-in-time copy of the controller's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrillStats {
    /// Fetcher invocations.
    pub fetches: u64,
    /// Selections served from already-loaded children.
    pub cache_hits: u64,
    /// Selections that found a fetch already in flight.
    pub deduped: u64,
    /// Fetch results dropped because a newer fetch superseded them.
    pub stale_discarded: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fetches: AtomicU64,
    cache_hits: AtomicU64,
    deduped: AtomicU64,
    stale_discarded: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DrillStats {
        DrillStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            deduped: self.deduped.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

// ── Controller ───────────────────────────────────────────────────

struct DrillState<M> {
    store: TreeStore<M>,
    cursor: PathCursor,
}

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<DrillInner>`; clones share one tree, one
/// cursor and one view channel. Operations on different paths may be in
/// flight concurrently. The state lock is never held across a fetch.
pub struct DrillController<F: NodeFetcher> {
    inner: Arc<DrillInner<F>>,
}

impl<F: NodeFetcher> Clone for DrillController<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct DrillInner<F: NodeFetcher> {
    fetcher: F,
    config: DrillConfig,
    state: Mutex<DrillState<F::Metrics>>,
    /// Filter snapshot; each fetch captures the value current at its start.
    context: ArcSwap<QueryContext>,
    view: watch::Sender<Arc<DrillView<F::Metrics>>>,
    stats: Counters,
}

impl<F: NodeFetcher> DrillController<F> {
    /// Create a controller over `fetcher`. Nothing is fetched until
    /// [`load_root()`](Self::load_root).
    pub fn new(fetcher: F, config: DrillConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let (view, _) = watch::channel(Arc::new(DrillView::empty()));

        Ok(Self {
            inner: Arc::new(DrillInner {
                fetcher,
                state: Mutex::new(DrillState {
                    store: TreeStore::with_max_depth(config.max_depth),
                    cursor: PathCursor::new(),
                }),
                config,
                context: ArcSwap::from_pointee(QueryContext::default()),
                view,
                stats: Counters::default(),
            }),
        })
    }

    /// Seed the filter snapshot without triggering a reload.
    #[must_use]
    pub fn with_context(self, context: QueryContext) -> Self {
        self.inner.context.store(Arc::new(context));
        self
    }

    pub fn config(&self) -> &DrillConfig {
        &self.inner.config
    }

    pub fn fetcher(&self) -> &F {
        &self.inner.fetcher
    }

    pub fn context(&self) -> Arc<QueryContext> {
        self.inner.context.load_full()
    }

    pub fn stats(&self) -> DrillStats {
        self.inner.stats.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, DrillState<F::Metrics>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Dispatch a command to the matching operation.
    pub async fn execute(&self, command: DrillCommand) -> Result<DrillOutcome, CoreError> {
        match command {
            DrillCommand::LoadRoot => self.load_root().await,
            DrillCommand::SetContext(context) => self.set_context(context).await,
            DrillCommand::SelectNode(path) => self.select_node(&path).await,
            DrillCommand::SelectBreadcrumb(level) => self.select_breadcrumb(level),
            DrillCommand::Reset => {
                self.reset();
                Ok(DrillOutcome::Navigated)
            }
            DrillCommand::Retry(path) => self.retry(&path).await,
            DrillCommand::Refresh(path) => self.refresh(&path).await,
            DrillCommand::Invalidate(path) => self.invalidate(&path),
        }
    }

    /// Fetch the depth-0 forest and reset the cursor.
    ///
    /// Unconditional: supersedes an outstanding root fetch. The previous
    /// forest stays visible until the new one lands.
    pub async fn load_root(&self) -> Result<DrillOutcome, CoreError> {
        let root = NodePath::root();
        let generation = {
            let mut state = self.lock();
            state.cursor.reset();
            let generation = state.store.restart_loading(&root)?;
            self.publish(&state);
            generation
        };

        info!(generation, "loading root level");
        self.fetch_into(root, generation).await
    }

    /// Replace the filter snapshot and reload from the root.
    pub async fn set_context(&self, context: QueryContext) -> Result<DrillOutcome, CoreError> {
        if context.has_inverted_range() {
            warn!("filter context has date_from after date_to");
        }
        self.inner.context.store(Arc::new(context));
        self.load_root().await
    }

    /// Click on the node at `path`.
    ///
    /// Re-selecting the active tip collapses it. Otherwise the cursor
    /// moves to `path` and, unless the node is terminal or already
    /// loaded, its children are fetched. A node that is already loading
    /// is never fetched twice.
    pub async fn select_node(&self, path: &NodePath) -> Result<DrillOutcome, CoreError> {
        if path.is_root() {
            self.reset();
            return Ok(DrillOutcome::Navigated);
        }

        let generation = {
            let mut state = self.lock();
            let status = state.store.status(path)?;
            let terminal = state.store.is_terminal(path)?;

            if state.cursor.select(path) == CursorMove::Collapsed {
                debug!(path = %path, "collapsed active node");
                self.publish(&state);
                return Ok(DrillOutcome::Collapsed);
            }
            if terminal {
                debug!(path = %path, "selected terminal node");
                self.publish(&state);
                return Ok(DrillOutcome::Terminal);
            }
            if status.is_loaded() {
                Counters::bump(&self.inner.stats.cache_hits);
                debug!(path = %path, "children cached, no fetch");
                self.publish(&state);
                return Ok(DrillOutcome::CacheHit);
            }

            match self.begin_fetch(&mut state, path)? {
                Some(generation) => generation,
                None => return Ok(DrillOutcome::AlreadyLoading),
            }
        };

        self.fetch_into(path.clone(), generation).await
    }

    /// Re-issue the fetch for `path` and point the cursor at it, without
    /// toggle semantics. A loaded node is a cache hit.
    pub async fn retry(&self, path: &NodePath) -> Result<DrillOutcome, CoreError> {
        if path.is_root() {
            return self.load_root().await;
        }

        let generation = {
            let mut state = self.lock();
            let status = state.store.status(path)?;
            let terminal = state.store.is_terminal(path)?;
            state.cursor.open(path);

            if terminal {
                self.publish(&state);
                return Ok(DrillOutcome::Terminal);
            }
            if status.is_loaded() {
                Counters::bump(&self.inner.stats.cache_hits);
                self.publish(&state);
                return Ok(DrillOutcome::CacheHit);
            }

            debug!(path = %path, %status, "retrying fetch");
            match self.begin_fetch(&mut state, path)? {
                Some(generation) => generation,
                None => return Ok(DrillOutcome::AlreadyLoading),
            }
        };

        self.fetch_into(path.clone(), generation).await
    }

    /// Drop the cached children of `path` and fetch them again.
    /// Refreshing the root is [`load_root()`](Self::load_root).
    pub async fn refresh(&self, path: &NodePath) -> Result<DrillOutcome, CoreError> {
        if path.is_root() {
            return self.load_root().await;
        }

        let generation = {
            let mut state = self.lock();
            let terminal = state.store.is_terminal(path)?;
            state.store.invalidate(path)?;
            state.cursor.open(path);

            if terminal {
                self.publish(&state);
                return Ok(DrillOutcome::Terminal);
            }
            match self.begin_fetch(&mut state, path)? {
                Some(generation) => generation,
                None => return Ok(DrillOutcome::AlreadyLoading),
            }
        };

        self.fetch_into(path.clone(), generation).await
    }

    /// Force `path` back to `Unloaded` without fetching. An outstanding
    /// fetch for it becomes stale. If the node was open, the cursor
    /// closes it so the next selection fetches again.
    pub fn invalidate(&self, path: &NodePath) -> Result<DrillOutcome, CoreError> {
        let mut state = self.lock();
        state.store.invalidate(path)?;

        if path.is_root() {
            state.cursor.reset();
        } else if state.cursor.is_open(path) {
            state.cursor.truncate(path.len() - 1);
        }

        self.publish(&state);
        Ok(DrillOutcome::Navigated)
    }

    /// Keep the first `level` keys of the active path. Pure cursor move.
    pub fn select_breadcrumb(&self, level: usize) -> Result<DrillOutcome, CoreError> {
        let mut state = self.lock();
        let depth = state.cursor.depth();
        if !state.cursor.truncate(level) {
            return Err(CoreError::InvalidLevel { level, depth });
        }

        debug!(level, "breadcrumb selected");
        self.publish(&state);
        Ok(DrillOutcome::Navigated)
    }

    /// Clear the selection. Cached branches stay for instant re-expansion.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.cursor.reset();
        self.publish(&state);
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Snapshot of the whole forest (`currentTree`).
    pub fn current_tree(&self) -> Vec<NodeSnapshot<F::Metrics>> {
        self.lock().store.roots()
    }

    pub fn root_status(&self) -> LoadStatus {
        self.lock().store.status(&NodePath::root()).unwrap_or(LoadStatus::Unloaded)
    }

    pub fn active_path(&self) -> NodePath {
        self.lock().cursor.active_path().clone()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let state = self.lock();
        state.cursor.breadcrumbs(&state.store)
    }

    /// Child state of the node at `path` (`getChildren`).
    pub fn child_state(&self, path: &NodePath) -> Result<ChildState<F::Metrics>, CoreError> {
        self.lock().store.get_children(path)
    }

    pub fn node(&self, path: &NodePath) -> Result<NodeSnapshot<F::Metrics>, CoreError> {
        self.lock().store.node(path)
    }

    /// The most recently published view.
    pub fn view(&self) -> Arc<DrillView<F::Metrics>> {
        self.inner.view.borrow().clone()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> ViewStream<F::Metrics> {
        ViewStream::new(self.inner.view.subscribe())
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Move `path` to `Loading`. `None` when a fetch is already in flight.
    fn begin_fetch(
        &self,
        state: &mut DrillState<F::Metrics>,
        path: &NodePath,
    ) -> Result<Option<Generation>, CoreError> {
        match state.store.set_loading(path)? {
            LoadTicket::Started(generation) => {
                self.publish(state);
                Ok(Some(generation))
            }
            LoadTicket::AlreadyLoading(generation) => {
                Counters::bump(&self.inner.stats.deduped);
                debug!(path = %path, generation, "fetch already in flight");
                self.publish(state);
                Ok(None)
            }
        }
    }

    /// Run the fetcher for `path` and apply its result under `generation`.
    async fn fetch_into(
        &self,
        path: NodePath,
        generation: Generation,
    ) -> Result<DrillOutcome, CoreError> {
        let request = FetchRequest::new(path.clone(), self.inner.context.load_full());
        Counters::bump(&self.inner.stats.fetches);
        debug!(path = %path, generation, "fetching children");

        let started = Instant::now();
        let fetch = self.inner.fetcher.fetch_children(request);
        let result = match self.inner.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .unwrap_or_else(|_| Err(FetchError::timed_out(limit))),
            None => fetch.await,
        };
        let elapsed_ms = started.elapsed().as_millis();

        let mut state = self.lock();
        let (applied, outcome) = match result {
            Ok(rows) => {
                let applied = state.store.set_children(&path, generation, rows);
                let children = state.store.child_count(&path).unwrap_or(0);
                (applied, DrillOutcome::Fetched { children })
            }
            Err(error) => {
                let applied = state.store.set_failed(&path, generation, error.clone());
                (applied, DrillOutcome::Failed { error })
            }
        };

        match applied {
            Ok(ApplyOutcome::Applied) => {}
            // The node was invalidated, re-fetched, or discarded along
            // with an ancestor while this fetch was in flight.
            Ok(ApplyOutcome::Stale) | Err(CoreError::PathNotFound { .. }) => {
                Counters::bump(&self.inner.stats.stale_discarded);
                debug!(path = %path, generation, elapsed_ms, "superseded fetch dropped");
                return Ok(DrillOutcome::Superseded);
            }
            Err(e) => return Err(e),
        }

        match &outcome {
            DrillOutcome::Failed { error } => {
                Counters::bump(&self.inner.stats.failures);
                warn!(path = %path, elapsed_ms, error = %error, "fetch failed");
            }
            DrillOutcome::Fetched { children } => {
                debug!(path = %path, elapsed_ms, children, "children loaded");
            }
            _ => {}
        }

        self.publish(&state);
        Ok(outcome)
    }

    /// Build and broadcast a view of `state`. Called with the state lock
    /// held, so publishes are totally ordered.
    fn publish(&self, state: &DrillState<F::Metrics>) {
        let root = NodePath::root();
        let version = self.inner.view.borrow().version + 1;
        let view = DrillView {
            version,
            root_status: state.store.status(&root).unwrap_or(LoadStatus::Unloaded),
            root_error: state.store.error(&root).ok().flatten().cloned(),
            roots: state.store.roots(),
            active_path: state.cursor.active_path().clone(),
            breadcrumbs: state.cursor.breadcrumbs(&state.store),
        };
        self.inner.view.send_replace(Arc::new(view));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fetcher::StaticFetcher;
    use crate::model::FetchedNode;

    fn path(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    fn controller() -> DrillController<StaticFetcher<()>> {
        let fetcher = StaticFetcher::new()
            .with_children(NodePath::root(), vec![FetchedNode::keyed("a"), FetchedNode::keyed("b")])
            .with_children(path("a"), vec![FetchedNode::keyed("x")]);
        DrillController::new(fetcher, DrillConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn select_before_root_load_is_path_not_found() {
        let ctrl = controller();
        let err = ctrl.select_node(&path("a")).await.unwrap_err();
        assert!(err.is_invariant_violation());
        assert_eq!(ctrl.fetcher().total_calls(), 0);
    }

    #[tokio::test]
    async fn selecting_root_path_resets_cursor() {
        let ctrl = controller();
        ctrl.load_root().await.unwrap();
        ctrl.select_node(&path("a")).await.unwrap();
        let outcome = ctrl.select_node(&NodePath::root()).await.unwrap();
        assert_eq!(outcome, DrillOutcome::Navigated);
        assert!(ctrl.active_path().is_root());
    }

    #[tokio::test]
    async fn invalidating_open_node_closes_it() {
        let ctrl = controller();
        ctrl.load_root().await.unwrap();
        ctrl.select_node(&path("a")).await.unwrap();
        ctrl.select_node(&path("a/x")).await.unwrap();

        ctrl.invalidate(&path("a")).unwrap();
        assert!(ctrl.active_path().is_root());
        assert_eq!(ctrl.child_state(&path("a")).unwrap(), ChildState::Unloaded);
    }

    #[tokio::test]
    async fn breadcrumb_beyond_depth_is_rejected() {
        let ctrl = controller();
        ctrl.load_root().await.unwrap();
        ctrl.select_node(&path("b")).await.unwrap();
        assert_eq!(
            ctrl.select_breadcrumb(3).unwrap_err(),
            CoreError::InvalidLevel { level: 3, depth: 1 }
        );
    }

    #[tokio::test]
    async fn publish_versions_increase() {
        let ctrl = controller();
        let before = ctrl.view().version;
        ctrl.load_root().await.unwrap();
        let after = ctrl.view().version;
        assert!(after > before);
        assert_eq!(ctrl.view().roots.len(), 2);
    }

    #[test]
    fn zero_timeout_config_is_rejected() {
        let cfg = DrillConfig::default().with_fetch_timeout(std::time::Duration::ZERO);
        assert!(DrillController::new(StaticFetcher::<()>::new(), cfg).is_err());
    }
}
