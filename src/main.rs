use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::error;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::error::PipelineError;
use crate::exchange_rate::render_preview;
use crate::fetcher::HttpFetcher;
use crate::loader::{LoadOutcome, Loader, PgConnector};
use crate::pipeline::{Pipeline, RunOutcome};
use crate::transformer::Transformer;

mod clock;
mod config;
mod error;
mod exchange_rate;
mod fetcher;
mod loader;
mod pipeline;
mod snapshot;
mod transformer;

const PREVIEW_ROWS: usize = 5;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(outcome) => {
            report(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Run aborted: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run() -> Result<RunOutcome> {
    let config = Config::from_env().context("Can't read configuration")?;

    let fetcher = HttpFetcher::new(config.api_url.clone(), config.request_timeout);
    let transformer = Transformer::new(
        Arc::new(SystemClock),
        config.original_timezone.clone(),
        config.target_timezone.clone(),
    );
    let loader = Loader::new(Box::new(PgConnector::new(&config.database)));

    let pipeline = Pipeline::new(Box::new(fetcher), transformer, loader);
    let outcome = pipeline.run().await.context("Exchange rate run failed")?;

    Ok(outcome)
}

/// Looks through any context layers for the pipeline error that caused the
/// abort.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PipelineError>().map_or(1, PipelineError::exit_code)
}

fn report(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoData => println!("No data fetched"),
        RunOutcome::TransformFailed => println!("Data processing failed"),
        RunOutcome::Completed { rows, load } => {
            print!("{}", render_preview(rows, PREVIEW_ROWS));
            match load {
                LoadOutcome::Inserted(count) => println!("Stored {} rows", count),
                LoadOutcome::Skipped => println!("Nothing stored"),
                LoadOutcome::Failed => println!("Rows were not stored, see log"),
            }
        }
    }
}
