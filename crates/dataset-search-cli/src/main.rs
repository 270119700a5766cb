//! Run one dataset search from the command line and print each phase.

mod config;
mod render;

use std::process::ExitCode;

use clap::Parser;
use dataset_search_client::{SearchClient, init_observability};
use tracing::error;

use crate::config::Args;
use crate::render::ConsoleHandler;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    config::load_env_files();
    init_observability();

    let args = Args::parse();
    let client_config = args.client_config()?;
    let client = SearchClient::builder().config(client_config).build()?;

    let mut builder = client.search(args.query.clone());
    if let Some(model) = args.model.clone() {
        builder = builder.model(model);
    }
    if let Some(ms) = args.timeout_ms {
        builder = builder.timeout(std::time::Duration::from_millis(ms));
    }

    let mut handler = ConsoleHandler::new(args.json, args.limit, args.show_events);
    handler.loading(&args.query);
    match builder.run(&mut handler).await {
        Ok(results) => {
            handler.finished(&results)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(error = %err, kind = ?err.failure_kind(), "search failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
