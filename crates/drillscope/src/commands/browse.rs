//! `drillscope browse`: interactive drill-down loop.
//!
//! Each round renders the children of the active node as a menu. Picking
//! a child opens it (or collapses it when it is already the tip), and
//! the navigation entries map onto breadcrumb, reset, retry and refresh.

use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use owo_colors::{OwoColorize, Stream};

use drillscope_api::RowMetrics;
use drillscope_core::{DrillOutcome, DrillView, LoadStatus, NodePath, NodeSnapshot};

use crate::cli::{BrowseArgs, GlobalOpts};
use crate::commands::util::{self, Session};
use crate::error::CliError;
use crate::output;

/// One menu entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Choice {
    Open(NodePath),
    Back,
    Home,
    Retry,
    Refresh,
    Quit,
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn child_label(node: &NodeSnapshot<RowMetrics>) -> String {
    let metrics = output::metrics_cell(&node.metrics);
    if metrics.is_empty() {
        format!("{} {}", output::status_marker(node), node.label)
    } else {
        format!("{} {}   {}", output::status_marker(node), node.label, metrics)
    }
}

/// Menu entries for the current view: children first, then navigation.
fn menu(view: &DrillView<RowMetrics>) -> Vec<(String, Choice)> {
    let mut entries: Vec<(String, Choice)> = view
        .active_children()
        .iter()
        .map(|child| (child_label(child), Choice::Open(child.path.clone())))
        .collect();

    let tip_failed = if view.active_path.is_root() {
        view.root_status == LoadStatus::Failed
    } else {
        view.node(&view.active_path)
            .is_some_and(|n| n.status == LoadStatus::Failed)
    };
    if tip_failed {
        entries.push(("↻ Retry".into(), Choice::Retry));
    }
    if !view.active_path.is_root() {
        entries.push(("← Back".into(), Choice::Back));
        entries.push(("⌂ Home".into(), Choice::Home));
    }
    entries.push(("⟳ Refresh".into(), Choice::Refresh));
    entries.push(("✕ Quit".into(), Choice::Quit));
    entries
}

fn header(session: &Session, view: &DrillView<RowMetrics>) -> String {
    let trail = std::iter::once(session.hierarchy.clone())
        .chain(view.breadcrumbs.iter().map(|c| c.label.clone()))
        .collect::<Vec<_>>()
        .join(" › ");
    trail
        .if_supports_color(Stream::Stderr, |t| t.bold())
        .to_string()
}

/// Extra lines shown above the menu for the active node.
fn tip_details(view: &DrillView<RowMetrics>) -> Option<String> {
    if view.active_path.is_root() {
        return view.root_error.as_ref().map(|e| format!("✗ {}", e.message));
    }
    let node = view.node(&view.active_path)?;
    match (&node.error, node.is_terminal) {
        (Some(err), _) => Some(format!("✗ {}", err.message)),
        (None, true) => Some(format!("• {}   {}", node.label, output::metrics_cell(&node.metrics))),
        (None, false) if node.status == LoadStatus::Loaded && node.children.is_empty() => {
            Some("(no children)".into())
        }
        _ => None,
    }
}

async fn apply(session: &Session, global: &GlobalOpts, choice: Choice) -> Result<(), CliError> {
    let ctrl = &session.ctrl;
    let active = ctrl.active_path();

    let outcome = match choice {
        Choice::Open(path) => {
            let message = format!("Loading {path}");
            util::with_spinner(global, &message, ctrl.select_node(&path))
                .await
                .map_err(|e| session.map_core(e, &path))?
        }
        Choice::Back => ctrl.select_breadcrumb(active.len().saturating_sub(1))?,
        Choice::Home => {
            ctrl.reset();
            DrillOutcome::Navigated
        }
        Choice::Retry => util::with_spinner(global, "Retrying", ctrl.retry(&active)).await?,
        Choice::Refresh => util::with_spinner(global, "Refreshing", ctrl.refresh(&active)).await?,
        Choice::Quit => return Ok(()),
    };

    if let DrillOutcome::Failed { error } = outcome {
        output::print_failure(&format!("✗ {}", error.message));
    }
    Ok(())
}

pub async fn handle(args: BrowseArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if !output::is_interactive() {
        return Err(CliError::NotInteractive {
            command: "browse".into(),
        });
    }

    // A failed top level stays in the loop with a retry entry.
    let session = util::connect(global, &args.hierarchy, &args.filters)?;
    let outcome = util::with_spinner(global, "Loading top level", session.ctrl.load_root()).await?;
    if let DrillOutcome::Failed { error } = outcome {
        output::print_failure(&format!("✗ {}", error.message));
    }

    let theme = ColorfulTheme::default();
    loop {
        let view = session.ctrl.view();
        if let Some(details) = tip_details(&view) {
            eprintln!("{details}");
        }

        let entries = menu(&view);
        let labels: Vec<&str> = entries.iter().map(|(label, _)| label.as_str()).collect();
        let picked = Select::with_theme(&theme)
            .with_prompt(header(&session, &view))
            .items(&labels)
            .default(0)
            .interact_opt()
            .map_err(prompt_err)?;

        let Some(choice) = picked.and_then(|idx| entries.get(idx)).map(|(_, c)| c.clone()) else {
            break;
        };
        if choice == Choice::Quit {
            break;
        }
        apply(&session, global, choice).await?;
    }

    let stats = session.ctrl.stats();
    output::print_note(
        &format!("{} fetches, {} cached", stats.fetches, stats.cache_hits),
        global.quiet,
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drillscope_core::{DrillConfig, DrillController, FetchedNode, StaticFetcher};
    use serde_json::json;

    use super::*;
    use crate::cli::Cli;
    use crate::source::Source;
    use clap::Parser;

    fn session() -> Session {
        let mut metrics = RowMetrics::new();
        metrics.insert("sales".into(), json!(10));
        let fetcher = StaticFetcher::new()
            .with_children(
                NodePath::root(),
                vec![
                    FetchedNode::new("north", metrics).with_label("North"),
                    FetchedNode::new("south", RowMetrics::new()),
                ],
            )
            .with_failure("south".parse().unwrap(), "backend down");
        let ctrl = DrillController::new(Source::Fixture(fetcher), DrillConfig::default()).unwrap();
        Session {
            ctrl,
            hierarchy: "regional".into(),
        }
    }

    #[tokio::test]
    async fn root_menu_lists_children_then_navigation() {
        let session = session();
        session.ctrl.load_root().await.unwrap();

        let entries = menu(&session.ctrl.view());
        let choices: Vec<_> = entries.iter().map(|(_, c)| c.clone()).collect();
        assert_eq!(
            choices,
            vec![
                Choice::Open("north".parse().unwrap()),
                Choice::Open("south".parse().unwrap()),
                Choice::Refresh,
                Choice::Quit,
            ]
        );
        assert_eq!(entries[0].0, "▸ North   sales=10");
    }

    #[tokio::test]
    async fn failed_tip_offers_retry_and_back() {
        let session = session();
        session.ctrl.load_root().await.unwrap();
        let south: NodePath = "south".parse().unwrap();
        session.ctrl.select_node(&south).await.unwrap();

        let view = session.ctrl.view();
        let choices: Vec<_> = menu(&view).into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            choices,
            vec![
                Choice::Retry,
                Choice::Back,
                Choice::Home,
                Choice::Refresh,
                Choice::Quit
            ]
        );
        assert_eq!(tip_details(&view).as_deref(), Some("✗ backend down"));
    }

    #[tokio::test]
    async fn back_returns_to_the_parent_level() {
        let session = session();
        session.ctrl.load_root().await.unwrap();
        let north: NodePath = "north".parse().unwrap();
        let global = Cli::parse_from(["drillscope", "-q", "hierarchies"]).global;

        apply(&session, &global, Choice::Open(north.clone())).await.unwrap();
        assert_eq!(session.ctrl.active_path(), north);
        apply(&session, &global, Choice::Back).await.unwrap();
        assert!(session.ctrl.active_path().is_root());
    }
}
