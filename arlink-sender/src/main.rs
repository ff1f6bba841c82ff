//! arlink-sender — entry point.
//!
//! ```text
//! arlink-sender                     Stream to the configured device
//! arlink-sender --peer <host:port>  Override the device address
//! arlink-sender --dry-run           Capture and encode without a device
//! arlink-sender --config <path>     Load a custom config TOML
//! arlink-sender --gen-config        Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use arlink_sender::config::SenderConfig;
use arlink_sender::service::SenderService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "arlink-sender", about = "Stream a rendered view to an AR device")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "arlink-sender.toml")]
    config: PathBuf,

    /// Device address as host:port, overriding the config file.
    #[arg(short, long)]
    peer: Option<String>,

    /// Keep frames in-process instead of connecting to a device.
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&SenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = SenderConfig::load(&cli.config);
    if let Some(peer) = &cli.peer {
        config.network.set_peer(peer)?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("arlink-sender v{}", env!("CARGO_PKG_VERSION"));
    if !cli.dry_run {
        info!("peer: {}:{}", config.network.peer_host, config.network.peer_port);
    }
    info!(
        "display: {}x{} @ {} Hz",
        config.display.width, config.display.height, config.display.refresh_hz
    );
    info!(
        "capture: max {} fps, scale {}, codec {}",
        config.capture.max_fps, config.capture.resolution_scale, config.capture.codec
    );

    let service = SenderService::new(config).with_dry_run(cli.dry_run);
    let stop = service.stop_handle();

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, flushing and shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
