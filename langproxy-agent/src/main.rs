//! langproxy entry point

use clap::Parser;
use langproxy_agent::{logging, run_agent, validate_config, Args, EXAMPLE_CONFIG};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.example_config {
        print!("{}", EXAMPLE_CONFIG);
        return ExitCode::SUCCESS;
    }

    logging::init_logging(&args.log_level, args.json_logs);

    if args.validate {
        return match validate_config(&args) {
            Ok(summary) => {
                println!("{}", summary);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received, stopping proxy server...");
    };

    match run_agent(args, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
