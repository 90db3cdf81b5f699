use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rpcd::config::AppConfig;
use rpcd::console::{Catalog, Console, ConsoleExit};
use rpcd::context::ServerContext;
use rpcd::functions::Registry;
use rpcd::logging::{self, LogConfig};
use rpcd::rpc::{RpcClient, RpcServer, ShutdownReason};
use serde::Serialize;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(name = "rpcd")]
#[command(about = "Line-oriented JSON RPC server and console", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./rpcd.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    log: LogArgs,
}

/// Logging flags shared by every subcommand. Only set flags override the
/// config file.
#[derive(Args, Serialize)]
struct LogArgs {
    /// Log at debug level
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[arg(long, global = true)]
    json_logs: bool,
}

/// Command-line overrides layered over the config file.
#[derive(Serialize)]
struct Overrides<'a, A> {
    #[serde(flatten)]
    log: &'a LogArgs,
    #[serde(flatten)]
    args: &'a A,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the RPC server
    Serve(ServerArgs),
    /// Call server functions interactively
    Console(ConsoleArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    max_frame_bytes: Option<usize>,
}

#[derive(Args, Serialize)]
struct ConsoleArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let file = cli.config.as_deref();

    match &cli.command {
        Commands::Serve(args) => {
            let overrides = Overrides { log: &cli.log, args };
            let config = AppConfig::new(file, Some(&overrides))?;
            logging::init(LogConfig {
                json: config.json_logs,
                verbose: config.verbose,
                ..Default::default()
            });
            run_server(config).await.context("Server failed")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Console(args) => {
            let overrides = Overrides { log: &cli.log, args };
            let config = AppConfig::new(file, Some(&overrides))?;
            logging::init(LogConfig {
                json: config.json_logs,
                ..LogConfig::console(config.verbose)
            });
            run_console(config).await
        }
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let ctx = ServerContext::new(config, Registry::builtin());
    let server = RpcServer::bind(ctx).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger(ShutdownReason::Interrupt);
        }
    });

    let reason = server.run().await;
    info!(%reason, "Server exited");
    Ok(())
}

async fn run_console(config: AppConfig) -> Result<ExitCode> {
    let address = config.address();
    println!("Connecting to {address}...");

    let client = match RpcClient::connect(&address).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not reach the server at {address}. Is it running? ({e})");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Connected.");

    let console = Console::new(
        client,
        Catalog::builtin(),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );

    // Dropping the console on Ctrl-C closes the connection.
    let exit = tokio::select! {
        exit = console.run() => Some(exit?),
        _ = tokio::signal::ctrl_c() => None,
    };

    let Some(exit) = exit else {
        println!("\nInterrupted. Bye.");
        // A pending stdin read would otherwise hold the runtime open.
        std::process::exit(130);
    };

    println!("Bye.");
    Ok(match exit {
        ConsoleExit::Disconnected => ExitCode::FAILURE,
        ConsoleExit::UserExit | ConsoleExit::InputClosed => ExitCode::SUCCESS,
    })
}
