//! flipmouse daemon
//!
//! Grabs the configured keypads, creates the virtual mouse and keyboard and
//! runs until Ctrl+C / SIGTERM or until every keypad is gone.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use flipmouse::discovery::{self, EvdevSource};
use flipmouse::dispatch::{self, EventSource, ReaderExit};
use flipmouse::uinput::{VirtualKeyboard, VirtualPointer};
use flipmouse::{Config, Controller};

#[derive(Parser)]
#[command(name = "flipmouse")]
#[command(about = "Turn a phone keypad into a mouse with a long press")]
struct Cli {
    /// Config file path (default: ~/.config/flipmouse/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Shorthand for --log-level debug
    #[arg(long)]
    debug: bool,

    /// List input devices and how they would be handled, then exit
    #[arg(long)]
    list_devices: bool,

    /// Write the effective config to the config path, then exit
    #[arg(long)]
    write_default_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;

    init_logging(&cli, &config)?;
    info!("Loaded config from {:?}", config_path);

    if cli.write_default_config {
        config.save(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    if cli.list_devices {
        for dev in discovery::list_devices(&config.device_names) {
            println!(
                "{}  {:<40} {:<8} {}",
                dev.path.display(),
                dev.name,
                dev.kind,
                if dev.wanted { "[used]" } else { "" }
            );
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run(config));
    // Readers still blocked on an idle keypad would hold up a normal drop
    runtime.shutdown_background();
    result
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = if cli.debug { "debug" } else { cli.log_level.as_str() };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match cli.log_file.as_ref().or(config.log_file.as_ref()) {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.init(),
    }
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let catalog = config.catalog()?;

    let mut devices =
        discovery::find_devices(&config.device_names).context("Failed to find input devices")?;
    info!("Found {} input devices", devices.len());

    // The virtual keyboard must be able to replay anything the keypads send
    let mut codes: Vec<u16> = devices
        .iter()
        .flat_map(EvdevSource::supported_keys)
        .chain(catalog.all_bound_codes())
        .collect();
    codes.sort_unstable();
    codes.dedup();

    let pointer = VirtualPointer::new(&config.pointer_name)
        .context("Failed to create virtual mouse")?;
    let keyboard = VirtualKeyboard::new(&config.keyboard_name, codes)
        .context("Failed to create virtual keyboard")?;

    let controller = Controller::new(
        catalog,
        config.controller_options(),
        Box::new(pointer),
        Box::new(keyboard),
    )?;

    for device in &mut devices {
        device.grab()?;
        info!("Grabbed {} ({})", device.name(), device.path().display());
    }

    let sources: Vec<Box<dyn EventSource>> = devices
        .into_iter()
        .map(|d| Box::new(d) as Box<dyn EventSource>)
        .collect();
    let mut handle = dispatch::start(Arc::new(controller), sources, config.dispatch_config());

    info!("Virtual mouse active. Press Ctrl+C to exit.");

    tokio::select! {
        result = shutdown_signal() => {
            result?;
            info!("Shutting down...");
        }
        exits = handle.wait_readers() => {
            for exit in &exits {
                if let ReaderExit::Retired { device, error } = exit {
                    warn!("{} retired: {}", device, error);
                }
            }
            warn!("No input devices left, exiting");
        }
    }

    handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}
