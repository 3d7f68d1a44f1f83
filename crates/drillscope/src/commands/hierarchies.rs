//! `drillscope hierarchies`: list what can be drilled into.

use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::source::HierarchySummary;

#[derive(Tabled)]
struct HierarchyRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Levels")]
    levels: String,
    #[tabled(rename = "Functions")]
    functions: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn hierarchy_row(h: &HierarchySummary) -> HierarchyRow {
    HierarchyRow {
        name: h.name.clone(),
        levels: h.levels.map_or_else(|| "-".into(), |n| n.to_string()),
        functions: if h.functions.is_empty() {
            "(fixture)".into()
        } else {
            h.functions.join(" → ")
        },
        description: h.description.clone().unwrap_or_default(),
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let summaries = config::hierarchy_summaries(global)?;
    if summaries.is_empty() {
        output::print_note(
            "No hierarchies configured. Add [hierarchies.<name>] to the config file.",
            global.quiet,
        );
        return Ok(());
    }

    let rendered =
        output::render_list(global.output, &summaries, hierarchy_row, |h| h.name.clone())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
