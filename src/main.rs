//! ignition: runs an axum service under the lifecycle orchestrator.
//!
//! ```text
//! load config ─▶ logging ─▶ metrics ─▶ Bootstrap ─▶ run ─▶ exit code
//!                                                         0  clean shutdown
//!                                                         1  handler, bind or drain failure
//!                                                         78 configuration error
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use axum::routing::get;
use clap::Parser;

use ignition::config::{ConfigSource, ConfigStore, CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE};
use ignition::lifecycle::{Bootstrap, LifecycleError};
use ignition::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "ignition", version, about = "Run a service through boot, startup, serve and graceful shutdown")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = CONFIG_FILE_ENV, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = ConfigSource::new(cli.config.clone());
    let config = match source.load() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet.
            eprintln!("ignition: {e}");
            return ExitCode::from(LifecycleError::from(e).exit_code());
        }
    };

    logging::init_logging(&config.log);
    tracing::info!(
        app = %config.app.name,
        env = %config.app.env,
        config = %cli.config.display(),
        "ignition v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let cloud_enabled = config.cloud.enabled;
    let mut app = Bootstrap::new(ConfigStore::new(config)).routes(|router| {
        router.route("/", get(|| async { concat!("ignition ", env!("CARGO_PKG_VERSION")) }))
    });
    if !cli.no_watch {
        app = app.watch_config(source.path());
    }
    if cloud_enabled {
        app = match app.default_discovery() {
            Ok(app) => app,
            Err(e) => {
                tracing::error!(error = %e, "Failed to set up service discovery");
                return ExitCode::from(e.exit_code());
            }
        };
    }

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
