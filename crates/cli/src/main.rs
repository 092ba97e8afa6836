mod token_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "threadkeeper",
    about = "threadkeeper: keeps a Threads access token fresh in a secret store"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (toml, yaml or json). Discovered automatically when omitted.
    #[arg(long, global = true, env = "THREADKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false, env = "THREADKEEPER_JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the refresh function over HTTP.
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Refresh the token once and print the result.
    Refresh,
    /// Store an initial token (read from stdin when --token is omitted).
    Seed {
        #[arg(long)]
        token: Option<String>,
    },
    /// Show the stored token, masked.
    Status,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "threadkeeper starting");

    let mut config = threadkeeper_config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            threadkeeper_gateway::start_server(&config).await
        },
        Commands::Refresh => token_commands::refresh(&config).await,
        Commands::Seed { token } => token_commands::seed(&config, token).await,
        Commands::Status => token_commands::status(&config).await,
    }
}
