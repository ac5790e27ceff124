//! Mirror host entry point.
//!
//! ```text
//! mirror-host                   Run with mirror-host.toml (or defaults)
//! mirror-host --config <path>   Load a custom config TOML
//! mirror-host --gen-config      Write the default config to --config and exit
//! mirror-host --seconds 0       Run until Ctrl-C
//! mirror-host --fps 30          Override the synthetic render rate
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mirror_host::config::HostConfig;
use mirror_host::harness;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mirror-host", about = "Headless second-screen mirroring host")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mirror-host.toml")]
    config: PathBuf,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    gen_config: bool,

    /// Run time in seconds (0 = until Ctrl-C). Overrides the config.
    #[arg(long)]
    seconds: Option<u64>,

    /// Synthetic render rate. Overrides the config.
    #[arg(long)]
    fps: Option<u32>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: write defaults and exit.
    if cli.gen_config {
        HostConfig::write_default(&cli.config)?;
        println!("Wrote default config to {}", cli.config.display());
        return Ok(());
    }

    let mut config = HostConfig::load(&cli.config);
    if let Some(seconds) = cli.seconds {
        config.harness.seconds = seconds;
    }
    if let Some(fps) = cli.fps {
        config.harness.fps = fps;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("mirror-host v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "remote display: {}x{} at {} fps",
        config.harness.width, config.harness.height, config.harness.fps
    );

    let seconds = config.harness.seconds;
    let shutdown = async move {
        let deadline = async {
            if seconds == 0 {
                std::future::pending::<()>().await;
            } else {
                tokio::time::sleep(Duration::from_secs(seconds)).await;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
            _ = deadline => info!("run time elapsed"),
        }
    };

    let report = harness::run(&config, shutdown).await?;
    info!(
        "done: rendered {} captured {} sent {} ({} bytes), {} dropped before capture",
        report.frames_rendered,
        report.stats.frames_captured,
        report.stats.frames_sent,
        report.bytes_sent,
        report.frames_dropped,
    );

    Ok(())
}
