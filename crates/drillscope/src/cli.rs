//! Clap derive structures for the `drillscope` CLI.
//!
//! Defines the command tree, global flags, and shared argument groups.
//! Only depends on clap so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// drillscope -- explore hierarchical aggregates one level at a time
#[derive(Debug, Parser)]
#[command(
    name = "drillscope",
    version,
    about = "Drill into hierarchical reports from the command line",
    long_about = "Explores configured hierarchies (region -> team -> seller, ...)\n\
        by fetching each level on demand from stored procedures and caching\n\
        every branch that has been opened.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "DRILLSCOPE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, env = "DRILLSCOPE_URL", global = true)]
    pub url: Option<String>,

    /// Backend API key
    #[arg(long, env = "DRILLSCOPE_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "DRILLSCOPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Serve hierarchies from a JSON fixture instead of the backend
    #[arg(long, global = true, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DRILLSCOPE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "DRILLSCOPE_INSECURE", global = true)]
    pub insecure: bool,

    /// HTTP timeout in seconds (overrides profile)
    #[arg(long, env = "DRILLSCOPE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one path per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drill along a path and print every explored branch
    #[command(alias = "t")]
    Tree(TreeArgs),

    /// List the children of a node with their metrics
    #[command(alias = "ls")]
    Children(ChildrenArgs),

    /// Print the breadcrumb trail for a path
    #[command(alias = "bc")]
    Breadcrumbs(BreadcrumbsArgs),

    /// Explore a hierarchy interactively
    #[command(alias = "b")]
    Browse(BrowseArgs),

    /// List configured hierarchies
    Hierarchies,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Filter snapshot sent with every level fetch.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Only include data on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<String>,

    /// Only include data on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<String>,

    /// Exclude an entity code (repeatable, or comma-separated)
    #[arg(long, short = 'x', value_name = "CODE", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Free-text search passed to the backend
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Extra named argument for every call (KEY=VALUE, JSON values allowed)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

// ── Tree ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Hierarchy name
    pub hierarchy: String,

    /// Slash-separated path to drill into (e.g. north/teamA)
    pub path: Option<String>,

    /// Also expand every node this many levels below the path
    #[arg(long, short = 'd', default_value = "0")]
    pub depth: usize,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ── Children ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ChildrenArgs {
    /// Hierarchy name
    pub hierarchy: String,

    /// Slash-separated path of the parent node; omit for the top level
    pub path: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ── Breadcrumbs ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BreadcrumbsArgs {
    /// Hierarchy name
    pub hierarchy: String,

    /// Slash-separated path to resolve
    pub path: String,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ── Browse ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BrowseArgs {
    /// Hierarchy name
    pub hierarchy: String,

    #[command(flatten)]
    pub filters: FilterArgs,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard for a backend profile
    Init,

    /// Show the resolved configuration with secrets masked
    Show,

    /// Print the config file path
    Path,

    /// Store a profile's API key in the system keyring
    SetKey {
        /// Profile to store the key for (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
