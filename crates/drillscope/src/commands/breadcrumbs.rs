//! `drillscope breadcrumbs`: resolve a path to its labelled trail.

use tabled::Tabled;

use drillscope_core::Breadcrumb;

use crate::cli::{BreadcrumbsArgs, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct CrumbRow {
    #[tabled(rename = "Level")]
    level: usize,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Path")]
    path: String,
}

fn crumb_row(crumb: &Breadcrumb) -> CrumbRow {
    CrumbRow {
        level: crumb.depth,
        key: crumb.key.to_string(),
        label: crumb.label.clone(),
        path: crumb.path.to_string(),
    }
}

pub async fn handle(args: BreadcrumbsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::open(global, &args.hierarchy, &args.filters).await?;
    let path = util::parse_path(Some(&args.path));
    session.drill_to(global, &path).await?;

    let crumbs = session.ctrl.breadcrumbs();
    let rendered = output::render_list(global.output, &crumbs, crumb_row, |c| c.label.clone())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
