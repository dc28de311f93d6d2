use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use report_poller::api::HttpReportsApi;
use report_poller::config::{Args, Command, RunOptions};
use report_poller::driver::{Driver, PipelineSettings};
use report_poller::handlers;
use report_poller::logging;
use report_poller::purge::Purger;
use report_poller::rate_limit::RateGate;
use report_poller::state::AppState;
use report_poller::worker::{RateGuard, RequestWorker};

// single-threaded on purpose: the loops only interleave at await points
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_logger(args.log_level).context("failed to initialize logging")?;
    args.validate().context("invalid configuration")?;

    let api = Arc::new(
        HttpReportsApi::new(&args.api_url, &args.api_token, args.request_timeout())
            .context("failed to build http client")?,
    );
    let gate = Arc::new(RateGate::new(args.rate_limits()));

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_on_ctrl_c(cancel.clone()));

    info!("Reports API at {}", args.api_url);
    info!(
        "Rate limit: {} per second, {} per minute (0 = unlimited)",
        args.max_per_second, args.max_per_minute
    );

    match &args.command {
        Command::Run(opts) => run_pipeline(opts, api, gate, cancel).await,
        Command::Purge { start_id, count } => {
            let purger = Purger::new(api, RateGuard::new(gate, "purge"), *start_id, *count);
            purger.run(cancel).await?;
            Ok(())
        }
    }
}

async fn run_pipeline(
    opts: &RunOptions,
    api: Arc<HttpReportsApi>,
    gate: Arc<RateGate>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let output = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&opts.output)
        .await
        .with_context(|| format!("failed to open {}", opts.output.display()))?;
    info!("Appending results to {}", opts.output.display());

    let driver = Driver::new(api, gate);

    if let Some(port) = opts.metrics_port {
        let state = Arc::new(AppState::new(driver.queues().clone(), driver.gate().clone()));
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = handlers::serve(port, state, cancel).await {
                warn!("Status server stopped: {}", e);
            }
        });
    }

    let settings = PipelineSettings {
        create_interval: opts.create_interval(),
        poll_interval: opts.poll_interval(),
    };
    let exits = driver.run(settings, output, cancel).await;

    let failed = exits.iter().filter(|exit| exit.result.is_err()).count();
    info!("Pipeline stopped ({} of {} tasks failed)", failed, exits.len());
    Ok(())
}

async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Interrupt received, shutting down");
            cancel.cancel();
        }
        Err(e) => warn!("Cannot listen for ctrl-c: {}", e),
    }
}
