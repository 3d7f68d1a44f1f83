//! Shared helpers for command handlers: filter parsing, the drill
//! session every read command runs in, and the fetch spinner.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::debug;

use drillscope_core::{
    ChildState, CoreError, DrillController, DrillOutcome, NodePath, QueryContext,
};

use crate::cli::{FilterArgs, GlobalOpts};
use crate::config;
use crate::error::{CliError, display_path};
use crate::output;
use crate::source::Source;

pub type Controller = DrillController<Source>;

// ── Filters ──────────────────────────────────────────────────────────

fn parse_date(flag: &str, raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| CliError::Validation {
        field: flag.into(),
        reason: format!("'{raw}' is not a YYYY-MM-DD date ({e})"),
    })
}

/// Build the filter snapshot from `--from/--to/--exclude/--search/--param`.
pub fn query_context(filters: &FilterArgs) -> Result<QueryContext, CliError> {
    let from = filters.from.as_deref().map(|raw| parse_date("--from", raw)).transpose()?;
    let to = filters.to.as_deref().map(|raw| parse_date("--to", raw)).transpose()?;
    if let Some((from, to)) = from.zip(to).filter(|(from, to)| from > to) {
        return Err(CliError::Validation {
            field: "--from".into(),
            reason: format!("{from} is after --to {to}"),
        });
    }

    let mut ctx = QueryContext::new()
        .with_date_range(from, to)
        .with_exclusions(filters.exclude.iter().filter(|code| !code.trim().is_empty()));
    if let Some(ref search) = filters.search {
        ctx = ctx.with_search(search.as_str());
    }
    for raw in &filters.params {
        let Some((name, value)) = raw.split_once('=') else {
            return Err(CliError::Validation {
                field: "--param".into(),
                reason: format!("expected KEY=VALUE, got '{raw}'"),
            });
        };
        // JSON literals pass through typed; anything else is a string.
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.into()));
        ctx = ctx.with_param(name.trim(), value);
    }
    Ok(ctx)
}

/// Parse a slash path argument; `None`, `""` and `"/"` are the root.
pub fn parse_path(raw: Option<&str>) -> NodePath {
    raw.unwrap_or_default().parse().unwrap_or_default()
}

// ── Spinner ──────────────────────────────────────────────────────────

/// Await `fut` behind a stderr spinner when a terminal is attached.
pub async fn with_spinner<T>(global: &GlobalOpts, message: &str, fut: impl Future<Output = T>) -> T {
    if global.quiet || !output::is_interactive() {
        return fut.await;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

// ── Session ──────────────────────────────────────────────────────────

/// A controller bound to one hierarchy with its root level loaded.
pub struct Session {
    pub ctrl: Controller,
    pub hierarchy: String,
}

/// Resolve the source and apply filters, without fetching anything.
pub fn connect(
    global: &GlobalOpts,
    hierarchy: &str,
    filters: &FilterArgs,
) -> Result<Session, CliError> {
    let (source, drill_config) = config::open_source(global, hierarchy)?;
    let ctrl = DrillController::new(source, drill_config)?.with_context(query_context(filters)?);
    Ok(Session {
        ctrl,
        hierarchy: hierarchy.to_owned(),
    })
}

/// [`connect`], then load the top level. A failed top level is an error.
pub async fn open(
    global: &GlobalOpts,
    hierarchy: &str,
    filters: &FilterArgs,
) -> Result<Session, CliError> {
    let session = connect(global, hierarchy, filters)?;
    let outcome = with_spinner(global, "Loading top level", session.ctrl.load_root()).await?;
    check(&NodePath::root(), outcome)?;
    Ok(session)
}

/// Turn a failed fetch into an error; every other outcome passes.
pub fn check(path: &NodePath, outcome: DrillOutcome) -> Result<DrillOutcome, CliError> {
    match outcome {
        DrillOutcome::Failed { error } => Err(CliError::FetchFailed {
            path: display_path(&path.to_string()),
            message: error.message,
        }),
        other => Ok(other),
    }
}

impl Session {
    /// Open every node along `path`, fetching levels that are not cached.
    pub async fn drill_to(&self, global: &GlobalOpts, path: &NodePath) -> Result<(), CliError> {
        for len in 1..=path.len() {
            let step = path.truncated(len);
            let message = format!("Loading {step}");
            let outcome = with_spinner(global, &message, self.ctrl.retry(&step))
                .await
                .map_err(|e| self.map_core(e, &step))?;
            debug!(path = %step, ?outcome, "drilled");
            check(&step, outcome)?;
        }
        Ok(())
    }

    /// Expand every non-terminal node up to `levels` below `path`, one
    /// level at a time with the siblings of a level fetched concurrently.
    /// Returns the failures; they stay recorded on their nodes.
    pub async fn expand_below(
        &self,
        global: &GlobalOpts,
        path: &NodePath,
        levels: usize,
    ) -> Vec<(NodePath, String)> {
        let mut failures = Vec::new();
        let mut frontier = vec![path.clone()];

        for _ in 0..levels {
            let next: Vec<NodePath> = frontier
                .iter()
                .filter_map(|parent| self.ctrl.child_state(parent).ok())
                .flat_map(|state| match state {
                    ChildState::Loaded(children) => children,
                    _ => Vec::new(),
                })
                .filter(|child| !child.is_terminal)
                .map(|child| child.path)
                .collect();
            if next.is_empty() {
                break;
            }

            let message = format!("Expanding {} nodes", next.len());
            let outcomes = with_spinner(
                global,
                &message,
                join_all(next.iter().map(|p| self.ctrl.retry(p))),
            )
            .await;

            for (node, outcome) in next.iter().zip(outcomes) {
                match outcome {
                    Ok(DrillOutcome::Failed { error }) => {
                        failures.push((node.clone(), error.message));
                    }
                    Ok(_) => {}
                    Err(e) => failures.push((node.clone(), e.to_string())),
                }
            }
            frontier = next;
        }

        failures
    }

    /// Point the cursor back at `path` after a traversal moved it.
    pub async fn focus(&self, path: &NodePath) -> Result<(), CliError> {
        if path.is_root() {
            self.ctrl.reset();
        } else {
            self.ctrl.retry(path).await.map_err(|e| self.map_core(e, path))?;
        }
        Ok(())
    }

    /// Unknown keys surface as `PathNotFound`; name the hierarchy.
    pub fn map_core(&self, err: CoreError, path: &NodePath) -> CliError {
        match err {
            CoreError::PathNotFound { .. } => CliError::NodeNotFound {
                hierarchy: self.hierarchy.clone(),
                path: display_path(&path.to_string()),
                parent: display_path(&path.parent().to_string()),
            },
            other => other.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn filters() -> FilterArgs {
        FilterArgs {
            from: Some("2024-01-01".into()),
            to: Some("2024-03-31".into()),
            exclude: vec!["S01".into(), " ".into()],
            search: Some("acme".into()),
            params: vec!["p_limit=10".into(), "p_channel=retail".into()],
        }
    }

    #[test]
    fn filters_become_a_query_context() {
        let ctx = query_context(&filters()).unwrap();
        assert_eq!(ctx.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(ctx.exclusions, vec!["S01".to_owned()]);
        assert_eq!(ctx.search.as_deref(), Some("acme"));
        assert_eq!(ctx.params["p_limit"], json!(10));
        assert_eq!(ctx.params["p_channel"], json!("retail"));
    }

    #[test]
    fn inverted_range_and_bad_params_are_rejected() {
        let mut args = filters();
        args.from = Some("2024-04-01".into());
        assert!(matches!(query_context(&args), Err(CliError::Validation { .. })));

        let mut args = filters();
        args.params = vec!["no-equals".into()];
        assert!(matches!(query_context(&args), Err(CliError::Validation { .. })));

        let mut args = filters();
        args.to = Some("31/03/2024".into());
        assert!(matches!(query_context(&args), Err(CliError::Validation { .. })));
    }

    #[test]
    fn blank_path_is_root() {
        assert!(parse_path(None).is_root());
        assert!(parse_path(Some("/")).is_root());
        assert_eq!(parse_path(Some("north/teamA")).len(), 2);
    }
}
