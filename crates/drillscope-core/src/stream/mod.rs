// ── Reactive view stream ──
//
// Every tree or cursor mutation publishes a fresh immutable `DrillView`
// through a `watch` channel. Hosts re-render from whichever snapshot is
// latest; intermediate ones may be skipped.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::Serialize;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::cursor::Breadcrumb;
use crate::error::FetchError;
use crate::model::{LoadStatus, NodePath, NodeSnapshot, find_in_forest};

/// Read-only projection of the explorer: forest plus navigation chrome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrillView<M> {
    /// Publish sequence number; strictly increasing per controller.
    pub version: u64,
    pub root_status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_error: Option<FetchError>,
    pub roots: Vec<NodeSnapshot<M>>,
    pub active_path: NodePath,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl<M> DrillView<M> {
    pub(crate) fn empty() -> Self {
        Self {
            version: 0,
            root_status: LoadStatus::Unloaded,
            root_error: None,
            roots: Vec::new(),
            active_path: NodePath::root(),
            breadcrumbs: Vec::new(),
        }
    }

    pub fn node(&self, path: &NodePath) -> Option<&NodeSnapshot<M>> {
        find_in_forest(&self.roots, path)
    }

    /// The children panel for the active tip: the tip's children, or the
    /// root forest when nothing is selected.
    pub fn active_children(&self) -> &[NodeSnapshot<M>] {
        if self.active_path.is_root() {
            return &self.roots;
        }
        self.node(&self.active_path)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// `true` while any fetch visible in this snapshot is in flight.
    pub fn is_loading(&self) -> bool {
        fn any_loading<M>(nodes: &[NodeSnapshot<M>]) -> bool {
            nodes
                .iter()
                .any(|n| n.status.is_loading() || any_loading(&n.children))
        }
        self.root_status.is_loading() || any_loading(&self.roots)
    }
}

/// A subscription to the explorer's view.
///
/// Provides point-in-time access and reactive change notification via
/// `changed()` or by converting into a `Stream`.
pub struct ViewStream<M: Send + Sync + 'static> {
    current: Arc<DrillView<M>>,
    receiver: watch::Receiver<Arc<DrillView<M>>>,
}

impl<M: Send + Sync + 'static> ViewStream<M> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<DrillView<M>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or at the last `changed()`).
    pub fn current(&self) -> &Arc<DrillView<M>> {
        &self.current
    }

    /// The latest snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> Arc<DrillView<M>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the controller is
    /// dropped.
    pub async fn changed(&mut self) -> Option<Arc<DrillView<M>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> ViewWatchStream<M> {
        ViewWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each published view.
pub struct ViewWatchStream<M: Send + Sync + 'static> {
    inner: WatchStream<Arc<DrillView<M>>>,
}

impl<M: Send + Sync + 'static> Stream for ViewWatchStream<M> {
    type Item = Arc<DrillView<M>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
