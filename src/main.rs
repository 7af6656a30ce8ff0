mod core;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use crate::core::colors::Color;
use crate::core::display::DisplayWriter;
use crate::core::frame::{FrameBuilder, Thresholds};
use crate::core::monitor::Monitor;
use crate::core::telemetry::{MetricSource, NvmlSource};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the serial panel from live GPU telemetry
    Run {
        /// Serial device path, e.g. /dev/ttyUSB0
        #[arg(short, long)]
        port: String,
        #[arg(short, long, default_value_t = 500_000)]
        baud: u32,
        /// Seconds between frames
        #[arg(short, long, default_value_t = 10)]
        interval: u64,
        /// Load fraction above which the load field turns red
        #[arg(long, default_value_t = 0.7)]
        load_limit: f64,
        /// Temperature ceiling in Celsius
        #[arg(long, default_value_t = 90.0)]
        temp_ceiling: f64,
        /// Used/total memory ratio above which the memory field turns red
        #[arg(long, default_value_t = 0.8)]
        mem_limit: f64,
        /// Color for the GPU label
        #[arg(long, value_enum, default_value_t = Color::Blue)]
        accent: Color,
    },
    /// Print one telemetry snapshot as JSON
    Probe,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            port,
            baud,
            interval,
            load_limit,
            temp_ceiling,
            mem_limit,
            accent,
        } => {
            let thresholds = Thresholds {
                load_limit,
                temp_ceiling_c: temp_ceiling,
                mem_limit,
            };
            run_monitor(&port, baud, interval, thresholds, accent)
        }
        Commands::Probe => {
            let mut source = NvmlSource::new()?;
            println!("{}", serde_json::to_string_pretty(&source.sample())?);
            Ok(())
        }
    }
}

fn run_monitor(
    port: &str,
    baud: u32,
    interval: u64,
    thresholds: Thresholds,
    accent: Color,
) -> Result<()> {
    let source = NvmlSource::new()?;

    let transport = serialport::new(port, baud)
        .timeout(Duration::from_secs(10))
        .open()
        .with_context(|| format!("opening serial port {}", port))?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error registering Ctrl-C handler")?;

    let writer = DisplayWriter::new(transport);
    let frame = FrameBuilder::new(thresholds, accent);
    let mut monitor = Monitor::new(source, writer, frame);

    monitor
        .run(Duration::from_secs(interval), &running)
        .context("monitor loop failed")?;

    Ok(())
}
