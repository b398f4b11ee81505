//! # Shelfscan Entry Point
//!
//! Thin wrapper; setup lives in lib.rs so it can be tested.
//!
//! Runs on a current-thread runtime: one event loop drives the camera,
//! the provider chain and the command loop.

use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    shelfscan_scanner::init_tracing();

    let cli = shelfscan_scanner::Cli::parse();
    shelfscan_scanner::run(cli).await
}
