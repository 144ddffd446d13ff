use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use splitboard_core::config::{Config, LoggingConfig};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod watch;

#[derive(Parser)]
#[command(
    name = "splitboard",
    about = "Two-player shared drawing board relay",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Port to listen on (overrides $PORT and the config file)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,

        /// Directory of static board assets (default: docs)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Query a running relay's health endpoint
    Status {
        /// Health URL (default: http://127.0.0.1:<port>/health)
        #[arg(long)]
        url: Option<String>,
    },

    /// Join a board as a participant and print relayed events
    Watch {
        /// WebSocket URL (default: ws://127.0.0.1:<port>/ws)
        #[arg(long)]
        url: Option<String>,

        /// Send a message to the other side once assigned
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Check the configuration for problems
    Validate,
}

/// Set up the global tracing subscriber from the logging config.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging.level.clone().unwrap_or_else(|| "info".to_string())
    };
    let directives = std::iter::once(level)
        .chain(logging.filters.iter().cloned())
        .collect::<Vec<_>>()
        .join(",");

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives));

    let writer = if logging.output == "stdout" {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Route panics through tracing so a crashed connection task leaves a log line.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Uncaught panic");
    }));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);

    let mut config = Config::load(&config_path)?;

    init_logging(&config.logging(), cli.verbose);
    install_panic_hook();

    match cli.command {
        Commands::Serve {
            port,
            bind,
            static_dir,
        } => {
            if let Some(dir) = static_dir {
                let default_port = config.port();
                config
                    .server
                    .get_or_insert_with(|| splitboard_core::config::ServerConfig {
                        port: default_port,
                        bind: None,
                        static_dir: None,
                    })
                    .static_dir = Some(dir.to_string_lossy().into_owned());
            }

            let port = config.resolve_port(port);
            let (warnings, errors) = config.validate(port);
            for w in &warnings {
                tracing::warn!("{w}");
            }
            if !errors.is_empty() {
                anyhow::bail!("Invalid configuration: {}", errors.join("; "));
            }

            let bind = bind.unwrap_or_else(|| config.bind_addr());

            let state = Arc::new(splitboard_gateway::GatewayState::new(
                port,
                config.static_dir(),
            ));
            splitboard_gateway::start_gateway(state, &bind).await?;
        }
        Commands::Status { url } => {
            let url = url.unwrap_or_else(|| {
                format!("http://127.0.0.1:{}/health", config.resolve_port(None))
            });
            let resp = reqwest::get(&url).await?;
            if !resp.status().is_success() {
                anyhow::bail!("Health check failed: HTTP {}", resp.status());
            }
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Watch { url, message } => {
            let url = url.unwrap_or_else(|| {
                format!("ws://127.0.0.1:{}/ws", config.resolve_port(None))
            });
            watch::run(&url, message).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate(config.resolve_port(None));
                for w in &warnings {
                    println!("warning: {w}");
                }
                for e in &errors {
                    println!("error: {e}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} configuration error(s)", errors.len());
                }
                println!("Config OK: {}", config_path.display());
            }
        },
    }

    Ok(())
}
