use clap::{Parser, Subcommand};
use rust_barcode::config::{PatchSize, ScannerConfig};
use rust_barcode::detector::locate;
use rust_barcode::preprocess::prepare;
use rust_barcode::synth::{Placement, Symbology, render};
use rust_barcode::tools::{
    decode_image_file, grayscale_stats, image_paths, init_tracing, load_frame, save_gray_png,
};
use rust_barcode::{BarcodeScanner, ScanResult, SubmitOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "barcodetool", version, about = "rust_barcode CLI tools")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Locate and decode a single image
    Decode {
        #[arg(long)]
        image: PathBuf,
        /// Comma separated reader names, e.g. `code_128,ean`
        #[arg(long, value_delimiter = ',')]
        readers: Vec<String>,
        /// Locate on the full-resolution raster
        #[arg(long)]
        no_half_sample: bool,
        /// x-small, small, medium, large or x-large
        #[arg(long)]
        patch_size: Option<PatchSize>,
        /// Print the result record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print candidate boxes without decoding
    Locate {
        #[arg(long)]
        image: PathBuf,
    },
    /// Render a synthetic barcode to a PNG file
    Synth {
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "code_128")]
        format: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 640)]
        width: usize,
        #[arg(long, default_value_t = 480)]
        height: usize,
        /// Pixels per module
        #[arg(long, default_value_t = 3)]
        unit: u32,
        /// Rotation in degrees
        #[arg(long, default_value_t = 0.0)]
        angle: f32,
    },
    /// Feed a directory of images through the worker pool as a stream
    Stream {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long)]
        tracking: bool,
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(2);
        }
    };

    match cli.command {
        Command::Decode {
            image,
            readers,
            no_half_sample,
            patch_size,
            json,
        } => {
            let mut config = config;
            if !readers.is_empty() {
                config.decoder.readers = readers;
            }
            if no_half_sample {
                config.locator.half_sample = false;
            }
            if let Some(patch_size) = patch_size {
                config.locator.patch_size = patch_size;
            }
            decode_cmd(&config, &image, json)
        }
        Command::Locate { image } => locate_cmd(&config, &image),
        Command::Synth {
            text,
            format,
            out,
            width,
            height,
            unit,
            angle,
        } => synth_cmd(&text, &format, &out, width, height, unit, angle),
        Command::Stream {
            dir,
            workers,
            tracking,
            limit,
        } => {
            let mut config = config;
            if let Some(workers) = workers {
                config.num_of_workers = workers;
            }
            config.tracking |= tracking;
            stream_cmd(config, &dir, limit)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScannerConfig, rust_barcode::ScanError> {
    let config = match path {
        Some(path) => ScannerConfig::from_path(path)?,
        None => ScannerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn print_result(result: &ScanResult) {
    match &result.code_result {
        Some(code) => println!(
            "  {} [{}] direction={:?} checksum_valid={} mean_error={:.3}",
            code.code,
            code.format,
            code.direction,
            code.checksum_valid,
            code.mean_error()
        ),
        None => match &result.failure {
            Some(failure) => println!("  no code: {failure}"),
            None => println!("  no code"),
        },
    }
}

fn decode_cmd(config: &ScannerConfig, image: &Path, json: bool) {
    let start = Instant::now();
    let result = match decode_image_file(config, image) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Failed to decode {}: {}", image.display(), err);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("Failed to serialize result: {err}"),
        }
        return;
    }
    println!("Image: {}", image.display());
    println!(
        "Candidates: {}  time: {:.2} ms",
        result.boxes.len(),
        elapsed.as_secs_f64() * 1000.0
    );
    print_result(&result);
}

fn locate_cmd(config: &ScannerConfig, image: &Path) {
    let frame = match load_frame(image) {
        Ok(frame) => frame,
        Err(err) => {
            eprintln!("Failed to load image {}: {}", image.display(), err);
            return;
        }
    };
    let raster = match prepare(&frame, config.locator.half_sample) {
        Ok(raster) => raster,
        Err(err) => {
            eprintln!("Invalid frame: {err}");
            return;
        }
    };

    let stats = grayscale_stats(raster.as_slice());
    println!(
        "Image: {} ({}x{}), raster {}x{} scale {}",
        image.display(),
        frame.width,
        frame.height,
        raster.width(),
        raster.height(),
        raster.scale()
    );
    println!(
        "Grayscale range: {}-{}, average: {}",
        stats.min, stats.max, stats.avg
    );

    let start = Instant::now();
    let boxes = locate(&raster, &config.locator);
    let elapsed = start.elapsed();
    println!(
        "Found {} candidate boxes in {:.2} ms",
        boxes.len(),
        elapsed.as_secs_f64() * 1000.0
    );
    for (i, candidate) in boxes.iter().enumerate() {
        let scaled = candidate.scaled(raster.scale());
        println!(
            "  Box {}: angle={:.1} deg confidence={:.2} patches={} corners={:?}",
            i,
            scaled.angle.to_degrees(),
            scaled.confidence,
            scaled.patch_count,
            scaled.corners
        );
    }
}

fn synth_cmd(
    text: &str,
    format: &str,
    out: &Path,
    width: usize,
    height: usize,
    unit: u32,
    angle: f32,
) {
    let Some(symbology) = Symbology::from_format(format) else {
        eprintln!("Unknown format: {format}");
        std::process::exit(2);
    };
    let placement = Placement::centered(width, height, unit).rotated_degrees(angle);
    let Some(frame) = render(symbology, text, &placement) else {
        eprintln!("{text:?} cannot be encoded as {}", symbology.format());
        std::process::exit(2);
    };
    match save_gray_png(&frame, out) {
        Ok(()) => println!("Wrote {} ({}x{})", out.display(), width, height),
        Err(err) => {
            eprintln!("Failed to write {}: {}", out.display(), err);
            std::process::exit(1);
        }
    }
}

fn stream_cmd(config: ScannerConfig, dir: &Path, limit: Option<usize>) {
    let paths = image_paths(dir, limit);
    if paths.is_empty() {
        eprintln!("No images under {}", dir.display());
        return;
    }

    let mut scanner = match BarcodeScanner::init(config) {
        Ok(scanner) => scanner,
        Err(err) => {
            eprintln!("Failed to initialize scanner: {err}");
            std::process::exit(2);
        }
    };

    let decoded = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&decoded);
    scanner.on_processed(move |result| {
        if result.is_success() {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });
    scanner.on_detected(|result| {
        if let Some(code) = result.code() {
            println!("frame {}: detected {}", result.frame_id, code);
        }
    });

    if let Err(err) = scanner.start() {
        eprintln!("Failed to start scanner: {err}");
        std::process::exit(1);
    }

    let start = Instant::now();
    for path in &paths {
        let frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(err) => {
                eprintln!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };
        if let SubmitOutcome::Dropped = scanner.submit(frame) {
            tracing::debug!(path = %path.display(), "frame dropped");
        }
    }
    scanner.wait_idle(Duration::from_secs(30));
    let stats = scanner.stats();
    scanner.stop();

    let elapsed = start.elapsed();
    println!(
        "Frames: {} submitted, {} processed, {} dropped, {} decoded",
        stats.submitted,
        stats.processed,
        stats.dropped,
        decoded.load(Ordering::Relaxed)
    );
    println!(
        "Elapsed: {:.2} s ({:.1} fps)",
        elapsed.as_secs_f64(),
        paths.len() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
}
