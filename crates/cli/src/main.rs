//! docprobe: fetch the SBOMs, VEX statements and provenance attached to a
//! package URL.

mod cli;
mod commands;
mod config;
mod errors;
mod tracing;

use ::tracing::instrument;

use crate::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run_main().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

#[instrument(name = "docprobe_main")]
async fn run_main() -> miette::Result<()> {
    let invocation = cli::parse();

    init_tracing(TracingConfig {
        format: invocation.cli.log_format,
        level: invocation.cli.level.into(),
        ..Default::default()
    })?;

    commands::execute(&invocation).await
}
