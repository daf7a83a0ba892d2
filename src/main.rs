use std::path::PathBuf;

use anyhow::{Result, bail};
use barcode_preview::capture::ImageDirDevice;
use barcode_preview::config::ScanConfig;
use barcode_preview::detect::{BarcodeFormat, SnapshotDetector};
use barcode_preview::preview::{Resolution, TargetArea, select_optimal};
use barcode_preview::session::ScanSession;
use clap::{Parser, Subcommand};
use frame_scale::presets::DetectPreset;
use tracing_subscriber::EnvFilter;

/// Barcode preview tooling: preview size selection and frame replay through
/// the single-flight detection gate.
#[derive(Parser, Debug)]
#[command(name = "scan")]
#[command(about = "Select preview sizes and replay frames through the detection gate")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick the preview size a device would be configured with
    Select {
        /// Display surface size, e.g. 1080x1920
        #[arg(short, long)]
        target: Resolution,

        /// Preview sizes the device supports, in device order
        #[arg(required = true)]
        candidates: Vec<Resolution>,
    },

    /// Replay a directory of images as a preview stream
    Replay {
        /// Directory of frames, replayed in file name order
        dir: PathBuf,

        /// Frames per second
        #[arg(short, long, default_value_t = 30.0)]
        fps: f64,

        /// Display surface size
        #[arg(short, long, default_value = "1920x1080")]
        target: Resolution,

        /// Where the stills handed to the detector are written
        #[arg(short, long, default_value = "stills")]
        snapshots: PathBuf,

        /// JPEG quality of the still round-trip (1-100)
        #[arg(long, default_value_t = 50, conflicts_with = "no_jpeg")]
        jpeg_quality: u8,

        /// Hand decoded preview pixels to the detector without a JPEG round-trip
        #[arg(long)]
        no_jpeg: bool,

        /// Downscale applied to stills before detection
        #[arg(short, long, value_enum, default_value_t = DetectPreset::Native)]
        preset: DetectPreset,

        /// Barcode formats to request (repeatable)
        #[arg(long = "format", value_enum, default_values_t = [BarcodeFormat::DataMatrix, BarcodeFormat::QrCode])]
        formats: Vec<BarcodeFormat>,

        /// Advertise these preview sizes instead of the image sizes found
        #[arg(long = "resolution")]
        resolutions: Vec<Resolution>,

        /// Preview size used when no sizes are advertised
        #[arg(long)]
        default_resolution: Option<Resolution>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Select { target, candidates } => {
            let target = TargetArea::new(target.width, target.height);
            match select_optimal(&candidates, target) {
                Some(resolution) => println!("{resolution}"),
                None => bail!("No preview size could be selected for {target}"),
            }
        }
        Command::Replay {
            dir,
            fps,
            target,
            snapshots,
            jpeg_quality,
            no_jpeg,
            preset,
            formats,
            resolutions,
            default_resolution,
        } => {
            let config = ScanConfig::new(
                (!no_jpeg).then_some(jpeg_quality),
                preset,
                default_resolution,
                formats,
            );
            config.validate().map_err(anyhow::Error::msg)?;

            let mut device = ImageDirDevice::new(dir, fps)?;
            if !resolutions.is_empty() {
                device = device.with_resolutions(resolutions);
            }

            replay(
                device,
                SnapshotDetector::new(snapshots)?,
                config,
                TargetArea::new(target.width, target.height),
            )
            .await?;
        }
    }
    Ok(())
}

async fn replay(
    device: ImageDirDevice,
    detector: SnapshotDetector,
    config: ScanConfig,
    target: TargetArea,
) -> Result<()> {
    let snapshot_dir = detector.dir().to_path_buf();
    let mut session = ScanSession::builder()
        .with_device(device)
        .with_detector(detector)
        .with_config(config)
        .build()?;
    let mut detections = session.take_detections();

    session.on_surface_created(target).await?;
    if let Some(resolution) = session.resolution() {
        println!("preview: {resolution} for surface {target}");
    }
    session.start().await?;

    let outcome = session.run().await;
    session.on_surface_destroyed().await?;
    let stats = outcome?;

    println!(
        "frames: {} offered, {} dispatched, {} dropped, {} failed",
        stats.offered, stats.dispatched, stats.dropped, stats.failed
    );
    println!("stills written to {}", snapshot_dir.display());

    if let Some(rx) = detections.as_mut() {
        while let Ok(detection) = rx.try_recv() {
            for code in &detection.codes {
                println!("frame {}: {} {}", detection.seq, code.format, code.payload);
            }
        }
    }
    Ok(())
}
