//! Node sources the CLI can drill into: the RPC backend, or a JSON
//! fixture served from memory for offline use and demos.
//!
//! Fixture layout, keyed by hierarchy name:
//!
//! ```json
//! {
//!   "regional": {
//!     "description": "Region -> team",
//!     "max_depth": 1,
//!     "nodes": [
//!       { "key": "north", "label": "North", "metrics": { "sales": 1200.5 },
//!         "children": [ { "key": "teamA", "label": "Team A" } ] },
//!       { "key": "south", "error": "upstream timeout" }
//!     ]
//!   }
//! }
//! ```
//!
//! `error` makes the node's child fetch fail; a node without `children`
//! resolves to an empty level.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};

use drillscope_api::{RowMetrics, RpcFetcher};
use drillscope_core::{
    DrillConfig, FetchError, FetchRequest, FetchedNode, NodeFetcher, NodeKey, NodePath,
    StaticFetcher,
};

use crate::error::CliError;

// ── Source ───────────────────────────────────────────────────────────

/// The fetcher behind a CLI session.
#[derive(Debug)]
pub enum Source {
    Rpc(RpcFetcher),
    Fixture(StaticFetcher<RowMetrics>),
}

impl NodeFetcher for Source {
    type Metrics = RowMetrics;

    fn fetch_children(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<FetchedNode<RowMetrics>>, FetchError>> + Send {
        async move {
            match self {
                Self::Rpc(fetcher) => fetcher.fetch_children(request).await,
                Self::Fixture(fetcher) => fetcher.fetch_children(request).await,
            }
        }
    }
}

// ── Hierarchy listing ────────────────────────────────────────────────

/// One row of `drillscope hierarchies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchySummary {
    pub name: String,
    /// Number of levels, when bounded.
    pub levels: Option<usize>,
    pub description: Option<String>,
    /// RPC functions by depth; empty for fixtures.
    pub functions: Vec<String>,
}

// ── Fixture ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Fixture {
    hierarchies: BTreeMap<String, FixtureHierarchy>,
}

#[derive(Debug, Deserialize)]
struct FixtureHierarchy {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    max_depth: Option<usize>,
    #[serde(default)]
    nodes: Vec<FixtureNode>,
}

#[derive(Debug, Deserialize)]
struct FixtureNode {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    terminal: Option<bool>,
    #[serde(default)]
    metrics: RowMetrics,
    #[serde(default)]
    children: Option<Vec<FixtureNode>>,
    #[serde(default)]
    error: Option<String>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn names(&self) -> Vec<String> {
        self.hierarchies.keys().cloned().collect()
    }

    pub fn summaries(&self) -> Vec<HierarchySummary> {
        self.hierarchies
            .iter()
            .map(|(name, h)| HierarchySummary {
                name: name.clone(),
                levels: h.max_depth.map(|d| d + 1),
                description: h.description.clone(),
                functions: Vec::new(),
            })
            .collect()
    }

    /// Take hierarchy `name` out of the fixture as an in-memory fetcher.
    pub fn open(mut self, name: &str) -> Result<(Source, DrillConfig), CliError> {
        let Some(hierarchy) = self.hierarchies.remove(name) else {
            return Err(CliError::UnknownHierarchy {
                name: name.into(),
                available: self.names().join(", "),
            });
        };

        let mut fetcher = StaticFetcher::new();
        register(&mut fetcher, NodePath::root(), hierarchy.nodes);
        let config = DrillConfig {
            max_depth: hierarchy.max_depth,
            ..DrillConfig::default()
        };
        Ok((Source::Fixture(fetcher), config))
    }
}

fn register(fetcher: &mut StaticFetcher<RowMetrics>, parent: NodePath, nodes: Vec<FixtureNode>) {
    let mut rows = Vec::with_capacity(nodes.len());
    for node in nodes {
        let path = parent.child(node.key.as_str());
        if let Some(message) = node.error {
            fetcher.insert_failure(path, message);
        } else if let Some(children) = node.children {
            register(fetcher, path, children);
        }
        rows.push(FetchedNode {
            key: NodeKey::new(node.key),
            label: node.label,
            metrics: node.metrics,
            is_terminal: node.terminal,
        });
    }
    fetcher.insert_children(parent, rows);
}
