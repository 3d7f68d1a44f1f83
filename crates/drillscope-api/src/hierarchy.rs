// Hierarchy definitions: which RPC function serves each depth and how
// its rows map onto nodes.

use serde::{Deserialize, Serialize};

use crate::Error;

/// One level of a hierarchy: the RPC that lists nodes at this depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Stored procedure name, called as `rpc/{function}`.
    pub function: String,
    /// Column holding the node key. Strings and numbers are accepted.
    pub key_field: String,
    /// Column holding the display label. Falls back to the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,
    /// Argument names for the ancestor keys, outermost first:
    /// `parent_params[i]` receives the key at depth `i`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_params: Vec<String>,
    /// Boolean column marking a row as a leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_field: Option<String>,
}

impl LevelSpec {
    pub fn new(function: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            key_field: key_field.into(),
            label_field: None,
            parent_params: Vec::new(),
            terminal_field: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, field: impl Into<String>) -> Self {
        self.label_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_parents(mut self, params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.parent_params = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_terminal(mut self, field: impl Into<String>) -> Self {
        self.terminal_field = Some(field.into());
        self
    }

    /// Whether `column` is consumed as key, label or terminal flag
    /// rather than passed through as a metric.
    pub fn is_structural(&self, column: &str) -> bool {
        column == self.key_field
            || self.label_field.as_deref() == Some(column)
            || self.terminal_field.as_deref() == Some(column)
    }
}

/// A named drill-down hierarchy. `levels[d]` lists the nodes at depth `d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchySpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub levels: Vec<LevelSpec>,
}

impl HierarchySpec {
    pub fn new(name: impl Into<String>, levels: Vec<LevelSpec>) -> Self {
        Self {
            name: name.into(),
            description: None,
            levels,
        }
    }

    pub fn level(&self, depth: usize) -> Option<&LevelSpec> {
        self.levels.get(depth)
    }

    /// Depth of the deepest level; nodes there are leaves.
    pub fn max_depth(&self) -> Option<usize> {
        self.levels.len().checked_sub(1)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |message: String| Error::Hierarchy {
            name: self.name.clone(),
            message,
        };

        if self.levels.is_empty() {
            return Err(invalid("at least one level is required".into()));
        }
        for (depth, level) in self.levels.iter().enumerate() {
            if level.function.trim().is_empty() {
                return Err(invalid(format!("level {depth} has no function")));
            }
            if level.key_field.trim().is_empty() {
                return Err(invalid(format!("level {depth} has no key_field")));
            }
            if level.parent_params.len() > depth {
                return Err(invalid(format!(
                    "level {depth} binds {} parent params but has only {depth} ancestors",
                    level.parent_params.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn regional() -> HierarchySpec {
        HierarchySpec::new(
            "regional",
            vec![
                LevelSpec::new("sales_by_region", "region_id").with_label("region_name"),
                LevelSpec::new("sales_by_team", "team_id").with_parents(["p_region"]),
            ],
        )
    }

    #[test]
    fn max_depth_is_last_level() {
        assert_eq!(regional().max_depth(), Some(1));
        assert!(regional().validate().is_ok());
        assert_eq!(HierarchySpec::new("empty", Vec::new()).max_depth(), None);
    }

    #[test]
    fn too_many_parent_params_is_invalid() {
        let mut spec = regional();
        spec.levels[0].parent_params = vec!["p_none".into()];
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("level 0 binds 1 parent params"));
    }

    #[test]
    fn structural_columns() {
        let level = LevelSpec::new("f", "id").with_label("name").with_terminal("is_leaf");
        assert!(level.is_structural("id"));
        assert!(level.is_structural("is_leaf"));
        assert!(!level.is_structural("sales"));
    }

    #[test]
    fn deserializes_from_toml_shape() {
        let json = serde_json::json!({
            "name": "regional",
            "levels": [{ "function": "sales_by_region", "key_field": "region_id" }]
        });
        let spec: HierarchySpec = serde_json::from_value(json).unwrap();
        assert!(spec.levels[0].parent_params.is_empty());
    }
}
