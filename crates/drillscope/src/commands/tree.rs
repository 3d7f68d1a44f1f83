//! `drillscope tree`: drill along a path and print every explored branch.

use serde::Serialize;
use tabled::Tabled;

use drillscope_api::RowMetrics;
use drillscope_core::{NodePath, NodeSnapshot};

use crate::cli::{GlobalOpts, OutputFormat, TreeArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct TreeRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Metrics")]
    metrics: String,
}

fn tree_row(node: &NodeSnapshot<RowMetrics>) -> TreeRow {
    TreeRow {
        node: format!(
            "{}{} {}",
            "  ".repeat(node.depth),
            output::status_marker(node),
            node.label
        ),
        path: node.path.to_string(),
        status: output::status_text(node),
        metrics: output::metrics_cell(&node.metrics),
    }
}

/// JSON/YAML shape: the explored forest plus where the drill ended.
#[derive(Serialize)]
struct TreeDocument<'a> {
    hierarchy: &'a str,
    active_path: &'a NodePath,
    roots: &'a [NodeSnapshot<RowMetrics>],
}

/// Pre-order flattening of the explored forest.
fn flatten(nodes: &[NodeSnapshot<RowMetrics>]) -> Vec<&NodeSnapshot<RowMetrics>> {
    fn walk<'a>(nodes: &'a [NodeSnapshot<RowMetrics>], out: &mut Vec<&'a NodeSnapshot<RowMetrics>>) {
        for node in nodes {
            out.push(node);
            walk(&node.children, out);
        }
    }
    let mut out = Vec::new();
    walk(nodes, &mut out);
    out
}

pub async fn handle(args: TreeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::open(global, &args.hierarchy, &args.filters).await?;
    let path = util::parse_path(args.path.as_deref());

    session.drill_to(global, &path).await?;
    let failures = session.expand_below(global, &path, args.depth).await;
    session.focus(&path).await?;

    let view = session.ctrl.view();
    let doc = TreeDocument {
        hierarchy: &session.hierarchy,
        active_path: &view.active_path,
        roots: &view.roots,
    };
    let rendered = output::render_single(
        global.output,
        &doc,
        |doc| {
            let rows: Vec<TreeRow> = flatten(doc.roots).into_iter().map(tree_row).collect();
            output::render_table(&rows)
        },
        |doc| {
            flatten(doc.roots)
                .iter()
                .map(|node| node.path.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&rendered, global.quiet);

    for (node, message) in &failures {
        output::print_failure(&format!("✗ {node}: {message}"));
    }
    let stats = session.ctrl.stats();
    output::print_note(
        &format!(
            "{} fetches, {} cached, {} failed",
            stats.fetches, stats.cache_hits, stats.failures
        ),
        global.quiet || global.output != OutputFormat::Table,
    );
    Ok(())
}
