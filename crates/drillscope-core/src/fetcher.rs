// ── NodeFetcher seam ──
//
// The only I/O boundary of the engine. Hosts implement this for their
// backend (RPC, HTTP, in-memory fixtures); the controller is the only
// caller.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::FetchError;
use crate::model::{FetchedNode, NodePath, QueryContext};

/// Arguments of one child fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Path of the node whose children are requested. Empty for the root
    /// level.
    pub path: NodePath,
    /// Depth of the requested children (equals `path.len()`).
    pub depth: usize,
    /// Filter snapshot captured when the fetch started.
    pub context: Arc<QueryContext>,
}

impl FetchRequest {
    pub fn new(path: NodePath, context: Arc<QueryContext>) -> Self {
        let depth = path.len();
        Self {
            path,
            depth,
            context,
        }
    }
}

/// Asynchronous source of child nodes.
///
/// Contract: idempotent for identical `(path, context)`; "no children" is
/// an empty list, never an error; every call eventually resolves or
/// fails.
pub trait NodeFetcher: Send + Sync + 'static {
    /// Opaque payload attached to each node; never inspected by the core.
    type Metrics: Clone + Send + Sync + 'static;

    fn fetch_children(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<FetchedNode<Self::Metrics>>, FetchError>> + Send;
}

impl<F: NodeFetcher> NodeFetcher for Arc<F> {
    type Metrics = F::Metrics;

    fn fetch_children(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<FetchedNode<Self::Metrics>>, FetchError>> + Send {
        (**self).fetch_children(request)
    }
}

// ── In-memory fetcher ───────────────────────────────────────────────

/// Fetcher over a fixed, in-memory hierarchy.
///
/// Paths without an entry resolve to an empty list. Every call is
/// counted per path, which makes it the reference fake for exercising
/// cache and dedupe behavior, and a fixture source for offline hosts.
#[derive(Debug)]
pub struct StaticFetcher<M> {
    children: HashMap<NodePath, Result<Vec<FetchedNode<M>>, FetchError>>,
    calls: Mutex<HashMap<NodePath, usize>>,
    latency: Option<Duration>,
}

impl<M: Clone + Send + Sync + 'static> StaticFetcher<M> {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            latency: None,
        }
    }

    #[must_use]
    pub fn with_children(mut self, path: NodePath, rows: Vec<FetchedNode<M>>) -> Self {
        self.insert_children(path, rows);
        self
    }

    #[must_use]
    pub fn with_failure(mut self, path: NodePath, message: impl Into<String>) -> Self {
        self.insert_failure(path, message);
        self
    }

    /// Delay every response, to keep fetches observable as in flight.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert_children(&mut self, path: NodePath, rows: Vec<FetchedNode<M>>) {
        self.children.insert(path, Ok(rows));
    }

    /// Make every fetch of `path` fail with `message`.
    pub fn insert_failure(&mut self, path: NodePath, message: impl Into<String>) {
        self.children.insert(path, Err(FetchError::new(message)));
    }

    /// Number of fetches issued for `path`.
    pub fn calls_for(&self, path: &NodePath) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl<M: Clone + Send + Sync + 'static> Default for StaticFetcher<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone + Send + Sync + 'static> NodeFetcher for StaticFetcher<M> {
    type Metrics = M;

    fn fetch_children(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<FetchedNode<M>>, FetchError>> + Send {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.path.clone())
            .or_default() += 1;

        let result = self
            .children
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        let latency = self.latency;

        async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            result
        }
    }
}
