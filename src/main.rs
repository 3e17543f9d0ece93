use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use swarm_quarry::config::{AccessConfig, ServerConfig};
use swarm_quarry::node::Node;
use swarm_quarry::persistence::{JsonFileGateway, SnapshotGateway};
use swarm_quarry::scheduler::SwarmInfo;
use swarm_quarry::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "swarm-quarry")]
#[command(version)]
#[command(about = "Hands out quarry shafts to a swarm of mining turtles")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the swarm host
    Server(ServerArgs),

    /// Print the swarms stored in a snapshot file
    Inspect(InspectArgs),
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// JSON file the swarm store is saved to and loaded from
    #[arg(long, default_value = "data.json")]
    data_file: PathBuf,

    /// Token clients must pass as `?token=`. Empty disables authentication.
    /// Stored and compared in plain text; do not reuse a real password.
    #[arg(long, env = "SWARM_AUTH_TOKEN", default_value = "", hide_env_values = true)]
    auth_token: String,

    /// Let any client claim and finish shafts, not just the swarm's creator
    #[arg(long)]
    no_ip_lock: bool,

    /// Use the peer address even when an X-Forwarded-For header is present
    #[arg(long)]
    ignore_forwarded_for: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Snapshot file to read
    #[arg(long, default_value = "data.json")]
    data_file: PathBuf,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// Server
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let access = AccessConfig {
        ip_lock: !args.no_ip_lock,
        trust_forwarded_for: !args.ignore_forwarded_for,
        ..AccessConfig::default()
    }
    .with_token(args.auth_token);

    if access.auth_token.is_none() {
        tracing::warn!("No auth token set, anyone can create swarms");
    }
    if !access.ip_lock {
        tracing::warn!("IP-lock disabled, any client can claim and finish shafts");
    }

    let config = ServerConfig::new(SocketAddr::new(args.bind, args.port), args.data_file)
        .with_access(access);
    tracing::info!(
        listen_addr = %config.listen_addr,
        data_file = %config.data_file.display(),
        "Starting swarm host"
    );

    let shutdown = install_shutdown_handler();
    Node::new(config).run(shutdown).await
}

// =============================================================================
// Inspect
// =============================================================================

fn handle_inspect(args: InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = JsonFileGateway::new(args.data_file);
    let Some(snapshot) = gateway.load()? else {
        return Err(format!("no snapshot at {}", gateway.path().display()).into());
    };

    let swarms: Vec<SwarmInfo> = snapshot
        .swarms
        .iter()
        .map(|(id, swarm)| swarm.info(id))
        .collect();

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&swarms)?);
        }
        OutputFormat::Table => {
            if swarms.is_empty() {
                println!("No swarms found.");
                return Ok(());
            }

            println!(
                "{:<20} {:<11} {:<18} {:>8} {:>8} {:>8}  STATUS",
                "SWARM", "SIZE", "OWNER", "PENDING", "CLAIMED", "DONE"
            );
            println!("{}", "-".repeat(86));
            for info in &swarms {
                let status = if info.complete {
                    "complete"
                } else if info.pending == 0 {
                    "digging"
                } else {
                    "open"
                };
                println!(
                    "{:<20} {:<11} {:<18} {:>8} {:>8} {:>8}  {}",
                    info.id,
                    format!("{}x{}", info.w, info.h),
                    info.ip,
                    info.pending,
                    info.claimed,
                    info.done,
                    status
                );
            }
            println!();
            println!("{} swarms", swarms.len());
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Inspect(inspect_args) => {
            handle_inspect(inspect_args)?;
        }
    }

    Ok(())
}
