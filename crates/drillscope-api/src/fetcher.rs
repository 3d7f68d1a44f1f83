// RPC-backed NodeFetcher.
//
// Maps a drill-down request onto one stored-procedure call: the depth
// picks the level, ancestor keys and the filter snapshot become named
// arguments, and each returned row is reduced to the closed
// `{key, label, metrics, is_terminal}` node shape.

use std::future::Future;

use drillscope_core::{
    DrillConfig, FetchError, FetchRequest, FetchedNode, NodeFetcher, NodeKey, NodePath,
    QueryContext,
};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::Error;
use crate::client::{Row, RpcClient};
use crate::hierarchy::{HierarchySpec, LevelSpec};

/// Metrics carried by RPC nodes: every non-structural column of the row,
/// in backend column order.
pub type RowMetrics = IndexMap<String, Value>;

/// Argument names used for the filter snapshot.
pub mod params {
    pub const DATE_FROM: &str = "p_date_from";
    pub const DATE_TO: &str = "p_date_to";
    pub const EXCLUSIONS: &str = "p_exclusions";
    pub const SEARCH: &str = "p_search";
}

/// `NodeFetcher` over an [`RpcClient`] and a [`HierarchySpec`].
#[derive(Debug, Clone)]
pub struct RpcFetcher {
    client: RpcClient,
    hierarchy: HierarchySpec,
}

impl RpcFetcher {
    pub fn new(client: RpcClient, hierarchy: HierarchySpec) -> Result<Self, Error> {
        hierarchy.validate()?;
        Ok(Self { client, hierarchy })
    }

    pub fn hierarchy(&self) -> &HierarchySpec {
        &self.hierarchy
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Core config matching this hierarchy: the last level is terminal.
    pub fn drill_config(&self) -> DrillConfig {
        DrillConfig {
            max_depth: self.hierarchy.max_depth(),
            ..DrillConfig::default()
        }
    }
}

impl NodeFetcher for RpcFetcher {
    type Metrics = RowMetrics;

    fn fetch_children(
        &self,
        request: FetchRequest,
    ) -> impl Future<Output = Result<Vec<FetchedNode<RowMetrics>>, FetchError>> + Send {
        async move {
            let Some(level) = self.hierarchy.level(request.depth) else {
                debug!(
                    hierarchy = %self.hierarchy.name,
                    depth = request.depth,
                    "no level configured at this depth"
                );
                return Ok(Vec::new());
            };

            let args = build_args(level, &request.path, &request.context);
            let rows = self
                .client
                .call(&level.function, &args)
                .await
                .map_err(FetchError::from_display)?;

            debug!(function = %level.function, rows = rows.len(), "rpc rows received");
            Ok(rows
                .into_iter()
                .enumerate()
                .filter_map(|(idx, row)| node_from_row(level, idx, row))
                .collect())
        }
    }
}

/// Named arguments for one level call: ancestor keys first, then the
/// filter snapshot, then free-form params (which may override both).
pub fn build_args(level: &LevelSpec, path: &NodePath, context: &QueryContext) -> Row {
    let mut args = Row::new();

    for (name, key) in level.parent_params.iter().zip(path.iter()) {
        args.insert(name.clone(), Value::String(key.to_string()));
    }

    if let Some(from) = context.date_from {
        args.insert(params::DATE_FROM.into(), Value::String(from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = context.date_to {
        args.insert(params::DATE_TO.into(), Value::String(to.format("%Y-%m-%d").to_string()));
    }
    if !context.exclusions.is_empty() {
        args.insert(
            params::EXCLUSIONS.into(),
            Value::Array(context.exclusions.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(search) = &context.search {
        args.insert(params::SEARCH.into(), Value::String(search.clone()));
    }
    for (name, value) in &context.params {
        args.insert(name.clone(), value.clone());
    }

    args
}

/// Reduce one backend row to a node. Rows without a usable key are
/// skipped; blank labels and duplicates are left to the core.
fn node_from_row(level: &LevelSpec, idx: usize, row: Row) -> Option<FetchedNode<RowMetrics>> {
    let Some(key) = row.get(&level.key_field).and_then(scalar_text) else {
        warn!(
            function = %level.function,
            row = idx,
            key_field = %level.key_field,
            "row has no usable key"
        );
        return None;
    };

    let label = level
        .label_field
        .as_ref()
        .and_then(|field| row.get(field))
        .and_then(scalar_text);
    let is_terminal = level
        .terminal_field
        .as_ref()
        .and_then(|field| row.get(field))
        .and_then(Value::as_bool);

    let metrics: RowMetrics = row
        .into_iter()
        .filter(|(column, _)| !level.is_structural(column))
        .collect();

    Some(FetchedNode {
        key: NodeKey::new(key),
        label,
        metrics,
        is_terminal,
    })
}

/// Strings and numbers render as text; anything else is not a key.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn team_level() -> LevelSpec {
        LevelSpec::new("sales_by_team", "team_id")
            .with_label("team_name")
            .with_parents(["p_region"])
            .with_terminal("is_leaf")
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn args_bind_parents_then_filters() {
        let ctx = QueryContext::new()
            .with_date_range(NaiveDate::from_ymd_opt(2024, 1, 1), NaiveDate::from_ymd_opt(2024, 3, 31))
            .with_exclusions(["S01"])
            .with_search("acme")
            .with_param("p_channel", "retail");
        let path: NodePath = "north/teamA".parse().unwrap();

        let args = build_args(&team_level(), &path, &ctx);
        assert_eq!(
            Value::Object(args),
            json!({
                "p_region": "north",
                "p_date_from": "2024-01-01",
                "p_date_to": "2024-03-31",
                "p_exclusions": ["S01"],
                "p_search": "acme",
                "p_channel": "retail",
            })
        );
    }

    #[test]
    fn empty_context_sends_only_parents() {
        let path: NodePath = "north".parse().unwrap();
        let args = build_args(&team_level(), &path, &QueryContext::default());
        assert_eq!(Value::Object(args), json!({"p_region": "north"}));
    }

    #[test]
    fn row_columns_become_metrics_in_order() {
        let node = node_from_row(
            &team_level(),
            0,
            row(json!({
                "team_id": 42,
                "team_name": "Team A",
                "sales": 700.5,
                "is_leaf": true,
                "pct": 0.4,
            })),
        )
        .unwrap();

        assert_eq!(node.key.as_str(), "42");
        assert_eq!(node.label.as_deref(), Some("Team A"));
        assert_eq!(node.is_terminal, Some(true));
        let columns: Vec<_> = node.metrics.keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["sales", "pct"]);
    }

    #[test]
    fn row_without_key_is_skipped() {
        assert!(node_from_row(&team_level(), 3, row(json!({"team_name": "orphan"}))).is_none());
        assert!(node_from_row(&team_level(), 4, row(json!({"team_id": null}))).is_none());
    }
}
