//! `drillscope children`: list one level with its metric columns.

use tabled::Tabled;

use drillscope_api::RowMetrics;
use drillscope_core::{ChildState, NodeSnapshot};

use crate::cli::{ChildrenArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ChildRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Metrics")]
    metrics: String,
}

fn child_row(node: &NodeSnapshot<RowMetrics>) -> ChildRow {
    ChildRow {
        key: node.key.to_string(),
        label: node.label.clone(),
        marker: output::status_marker(node),
        metrics: output::metrics_cell(&node.metrics),
    }
}

pub async fn handle(args: ChildrenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::open(global, &args.hierarchy, &args.filters).await?;
    let path = util::parse_path(args.path.as_deref());
    session.drill_to(global, &path).await?;

    let children = match session
        .ctrl
        .child_state(&path)
        .map_err(|e| session.map_core(e, &path))?
    {
        ChildState::Loaded(children) => children,
        // Only leaves stay unloaded after a successful drill.
        _ => {
            output::print_note(&format!("'{path}' is a leaf"), global.quiet);
            Vec::new()
        }
    };

    let rendered = output::render_list(global.output, &children, child_row, |n| {
        n.key.to_string()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
