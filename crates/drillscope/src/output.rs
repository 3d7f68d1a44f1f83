//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one path per line.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use drillscope_api::RowMetrics;
use drillscope_core::{LoadStatus, NodeSnapshot};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color ────────────────────────────────────────────────────────────

/// Apply `--color` globally. `Auto` defers to terminal detection and
/// `NO_COLOR`.
pub fn init_color(mode: ColorMode) {
    match mode {
        ColorMode::Always => owo_colors::set_override(true),
        ColorMode::Never => owo_colors::set_override(false),
        ColorMode::Auto => {
            if std::env::var_os("NO_COLOR").is_some() {
                owo_colors::set_override(false);
            }
        }
    }
}

/// Whether interactive chrome (spinners, prompts) may be drawn.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list in the chosen format. `to_row` builds the table row and
/// `id_fn` the plain-text line for one item.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single value. Table output uses `detail_fn`, since detail
/// views are not row-shaped.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print a one-line status note to stderr, respecting quiet mode.
pub fn print_note(note: &str, quiet: bool) {
    if quiet {
        return;
    }
    eprintln!("{}", note.if_supports_color(Stream::Stderr, |t| t.dimmed()));
}

/// Print a non-fatal failure to stderr.
pub fn print_failure(note: &str) {
    eprintln!("{}", note.if_supports_color(Stream::Stderr, |t| t.red()));
}

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Internal(format!("yaml output: {e}")))
}

// ── Node helpers ─────────────────────────────────────────────────────

/// `k=v` pairs in column order, for table cells.
pub fn metrics_cell(metrics: &RowMetrics) -> String {
    let mut out = String::new();
    for (i, (name, value)) in metrics.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        match value {
            serde_json::Value::String(s) => {
                let _ = write!(out, "{name}={s}");
            }
            other => {
                let _ = write!(out, "{name}={other}");
            }
        }
    }
    out
}

/// One-glyph summary of a node's expansion state.
pub fn status_marker(node: &NodeSnapshot<RowMetrics>) -> &'static str {
    if node.is_terminal {
        return "•";
    }
    match node.status {
        LoadStatus::Unloaded => "▸",
        LoadStatus::Loading => "…",
        LoadStatus::Loaded => "▾",
        LoadStatus::Failed => "✗",
    }
}

pub fn status_text(node: &NodeSnapshot<RowMetrics>) -> String {
    if node.is_terminal {
        return "leaf".into();
    }
    match (&node.status, &node.error) {
        (LoadStatus::Failed, Some(err)) => format!("failed: {}", err.message),
        (status, _) => status.to_string(),
    }
}
