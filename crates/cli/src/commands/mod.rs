pub mod fetch;

use crate::cli::{Commands, Invocation};

/// Run the selected subcommand.
pub async fn execute(invocation: &Invocation) -> miette::Result<()> {
    match &invocation.cli.command {
        Commands::Fetch(args) => fetch::execute(args, invocation.subcommand_matches()).await,
    }
}
