//! Command dispatch.

pub mod breadcrumbs;
pub mod browse;
pub mod children;
pub mod config_cmd;
pub mod hierarchies;
pub mod tree;
pub mod util;

use clap::CommandFactory;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

/// Route a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Tree(args) => tree::handle(args, global).await,
        Command::Children(args) => children::handle(args, global).await,
        Command::Breadcrumbs(args) => breadcrumbs::handle(args, global).await,
        Command::Browse(args) => browse::handle(args, global).await,
        Command::Hierarchies => hierarchies::handle(global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "drillscope", &mut std::io::stdout());
            Ok(())
        }
    }
}
