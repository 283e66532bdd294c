use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing::{debug, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vcfctl_core::Config;

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use connection::ConnectionManager;
use error::VcfCtlError;

fn init_tracing(verbose: u8) {
    // RUST_LOG wins over the verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "vcfctl=warn,vcfctl_core=warn",
            1 => "vcfctl=info,vcfctl_core=info",
            2 => "vcfctl=debug,vcfctl_core=debug",
            _ => "vcfctl=trace,vcfctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &mut ConnectionManager) -> Result<(), VcfCtlError> {
    trace!("Executing command: {:?}", cli.command);

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            if cli.output.is_json() {
                output::print_json(&json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }))
            } else {
                println!("vcfctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
        Commands::Task(task_cmd) => {
            commands::task::handle_task_command(
                task_cmd,
                conn_mgr,
                cli.profile.as_deref(),
                cli.output,
            )
            .await
        }
        Commands::Profile(profile_cmd) => {
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output)
        }
    };

    info!("Command finished in {:?}", start.elapsed());
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let mut conn_mgr = ConnectionManager::with_config_path(config, config_path);

    if let Err(e) = execute_command(&cli, &mut conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(e.exit_code());
    }

    Ok(())
}
