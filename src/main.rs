use clap::Parser;
use screeny::cli::{load_options, report_results, setup_logging, Cli, CliRunner};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose);

    info!("Starting screeny v{}", env!("CARGO_PKG_VERSION"));

    let options = match load_options(&args).await {
        Ok(options) => options,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let cli_runner = match CliRunner::new(options).await {
        Ok(runner) => runner,
        Err(e) => {
            // Engine launch failure: nothing can run.
            error!("Failed to start browser engine: {}", e);
            std::process::exit(1);
        }
    };

    // On interrupt, stop dispatching new jobs and let in-flight jobs settle
    // on their own timeouts before the pool is torn down.
    let halt = cli_runner.runner.halt_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, halting dispatch");
            halt.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });

    let outcome = cli_runner.run(args.command).await;

    cli_runner.shutdown().await;

    match outcome {
        Ok(results) => {
            let fatal = report_results(&results);
            if fatal {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Run failed: {}", e);
            std::process::exit(if e.is_fatal() { 1 } else { 2 });
        }
    }

    info!("screeny stopped");
    Ok(())
}
