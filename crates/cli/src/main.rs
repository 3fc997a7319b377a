mod persist;
mod serve;
mod upstream;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding `--log-level`.
const LOG_ENV: &str = "WIREPACT_LOG";

/// File name used inside `--log-dir`.
const LOG_FILE: &str = "wirepact.log";

/// Serialization proxy for Pact contract tests.
#[derive(Parser)]
#[command(
    name = "wirepact",
    version,
    about = "Serialization proxy for Pact contract tests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Proxy a Pact mock service, transcoding protobuf bodies
    Serve {
        /// Base URL of the Pact mock service to forward to
        #[arg(long)]
        upstream_url: String,
        /// Host to listen on
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Verify a provider instead of recording a consumer contract
        #[arg(long)]
        verification: bool,
        /// Directory assembled contracts are written to
        #[arg(long, default_value = ".")]
        pact_dir: PathBuf,
        /// Contract file to preload registered interactions from
        #[arg(long)]
        contract: Option<PathBuf>,
        /// Write logs to wirepact.log in this directory instead of stderr
        #[arg(long)]
        log_dir: Option<PathBuf>,
        /// Log filter directive, e.g. `debug` or `wirepact_core=trace`
        #[arg(long, default_value = "info")]
        log_level: String,
        /// Keep resolved protobuf schemas between requests
        #[arg(long)]
        cache_schemas: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            upstream_url,
            host,
            port,
            verification,
            pact_dir,
            contract,
            log_dir,
            log_level,
            cache_schemas,
        } => {
            if let Err(e) = init_logging(&log_level, log_dir.as_deref()) {
                eprintln!("error: {}", e);
                process::exit(1);
            }

            let options = serve::ServeOptions {
                upstream_url,
                host,
                port,
                verification,
                pact_dir,
                contract,
                cache_schemas,
            };
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("error: failed to create tokio runtime: {}", e);
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(options)) {
                tracing::error!(error = %e, "server failed");
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Install the global subscriber: `WIREPACT_LOG` wins over `--log-level`,
/// and an unparseable directive falls back to `info`.
fn init_logging(log_level: &str, log_dir: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(dir) = log_dir {
        std::fs::create_dir_all(dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
