//! sheetcam CLI: marker detection, rectification and live capture.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use sheetcam::capture::{CameraBackend, FrameSequenceBackend};
use sheetcam::{
    load_frame, save_frame, ImageFormat, PostProcessOutput, SheetcamConfig, VisionService,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "sheetcam")]
#[command(about = "Rectify sheets framed by four fiducial markers")]
#[command(version)]
struct Cli {
    /// JSON config file (missing fields take defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less logging (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect markers in an image and print them as JSON.
    Detect {
        image: PathBuf,
    },

    /// Rectify and post-process one image.
    Rectify(RectifyArgs),

    /// Capture frames and write raw and rectified images.
    Capture(CaptureArgs),

    /// Print the effective config as JSON.
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputArg {
    Normalized,
    Mask,
    Composite,
}

impl From<OutputArg> for PostProcessOutput {
    fn from(value: OutputArg) -> Self {
        match value {
            OutputArg::Normalized => PostProcessOutput::Normalized,
            OutputArg::Mask => PostProcessOutput::Mask,
            OutputArg::Composite => PostProcessOutput::Composite,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    /// Input image.
    image: PathBuf,

    /// Output image; `.jpg`/`.jpeg` selects JPEG, anything else PNG.
    #[arg(short, long)]
    out: PathBuf,

    /// Side of the square output in pixels (default: from config).
    #[arg(long)]
    size: Option<u32>,

    /// Which post-processed image to write (default: from config).
    #[arg(long, value_enum)]
    output: Option<OutputArg>,
}

#[derive(Debug, Clone, Args)]
struct CaptureArgs {
    /// Camera index (default: from config).
    #[arg(long)]
    device: Option<usize>,

    /// Number of frames to write.
    #[arg(long, default_value_t = 1)]
    frames: usize,

    /// Replay these images instead of opening a camera.
    #[arg(long, num_args = 1..)]
    still: Vec<PathBuf>,

    /// Output directory.
    #[arg(short, long)]
    out: PathBuf,

    /// Give up on a frame after this many seconds.
    #[arg(long, default_value_t = 10.0)]
    frame_timeout_s: f64,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    sheetcam::init_logging(sheetcam::core::level_from_verbosity(cli.verbose, cli.quiet));

    let config = match &cli.config {
        Some(path) => SheetcamConfig::load_json(path)
            .map_err(|e| -> CliError { format!("failed to load {}: {e}", path.display()).into() })?,
        None => SheetcamConfig::default(),
    };

    match cli.command {
        Commands::Detect { image } => run_detect(&image, config),
        Commands::Rectify(args) => run_rectify(&args, config),
        Commands::Capture(args) => run_capture(&args, config),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn format_for_path(path: &Path) -> ImageFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => ImageFormat::jpeg(),
        _ => ImageFormat::Png,
    }
}

/// A service with no camera, for one-shot processing of still images.
fn offline_service(config: SheetcamConfig) -> CliResult<VisionService> {
    let backend = Arc::new(FrameSequenceBackend::new(Vec::new(), Duration::ZERO));
    Ok(VisionService::with_backend(backend, config)?)
}

fn open_image(path: &Path) -> CliResult<sheetcam::Frame> {
    load_frame(path)
        .map_err(|e| -> CliError { format!("failed to open image {}: {e}", path.display()).into() })
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(image: &Path, config: SheetcamConfig) -> CliResult<()> {
    let frame = open_image(image)?;
    log::info!("image size: {}x{}", frame.width(), frame.height());

    let service = offline_service(config)?;
    let detection = service.detect(&frame);
    log::info!("detected {} markers", detection.len());
    println!("{}", serde_json::to_string_pretty(&detection)?);
    Ok(())
}

// ── rectify ────────────────────────────────────────────────────────────

fn run_rectify(args: &RectifyArgs, mut config: SheetcamConfig) -> CliResult<()> {
    if let Some(output) = args.output {
        config.postprocess.output = output.into();
    }
    let size = args.size.unwrap_or(config.rectifier.output_size);
    let frame = open_image(&args.image)?;

    let service = offline_service(config)?;
    let out = service.process_frame(&frame, size, &service.config().postprocess)?;
    save_frame(&out, format_for_path(&args.out), &args.out)?;
    log::info!("rectified image written to {}", args.out.display());
    Ok(())
}

// ── capture ────────────────────────────────────────────────────────────

#[cfg(all(feature = "v4l2", target_os = "linux"))]
fn camera_backend() -> CliResult<Arc<dyn CameraBackend>> {
    Ok(Arc::new(sheetcam::capture::V4l2Backend::new()))
}

#[cfg(not(all(feature = "v4l2", target_os = "linux")))]
fn camera_backend() -> CliResult<Arc<dyn CameraBackend>> {
    Err("this build has no camera backend; rebuild with --features v4l2 or pass --still".into())
}

fn run_capture(args: &CaptureArgs, mut config: SheetcamConfig) -> CliResult<()> {
    if let Some(device) = args.device {
        config.device.index = device;
    }
    let backend: Arc<dyn CameraBackend> = if args.still.is_empty() {
        camera_backend()?
    } else {
        let frames = args
            .still
            .iter()
            .map(|p| open_image(p))
            .collect::<CliResult<Vec<_>>>()?;
        Arc::new(FrameSequenceBackend::new(frames, Duration::from_millis(33)))
    };

    std::fs::create_dir_all(&args.out)?;
    let service = VisionService::with_backend(backend, config)?;
    let reader = service.controller().reader();
    service.start_capture()?;

    let frame_timeout = Duration::from_secs_f64(args.frame_timeout_s.max(0.0));
    let raw_format = service.config().raw_format;
    let rect_format = service.config().rectified_format;
    let mut seen = reader.published();
    let mut written = 0usize;

    while written < args.frames {
        let deadline = Instant::now() + frame_timeout;
        while reader.published() == seen {
            if Instant::now() >= deadline || !service.is_capturing() {
                service.stop_capture();
                return Err(format!("no new frame after {written} written").into());
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        seen = reader.published();

        let raw = service.latest_frame()?;
        let raw_path = args
            .out
            .join(format!("raw_{written:04}.{}", raw_format.extension()));
        save_frame(&raw, raw_format, &raw_path)?;

        let size = service.config().rectifier.output_size;
        match service.process_frame(&raw, size, &service.config().postprocess) {
            Ok(rect) => {
                let rect_path = args
                    .out
                    .join(format!("rectified_{written:04}.{}", rect_format.extension()));
                save_frame(&rect, rect_format, &rect_path)?;
                log::info!("frame {written}: rectified");
            }
            Err(e) if e.is_recoverable() => log::warn!("frame {written}: {e}"),
            Err(e) => {
                service.stop_capture();
                return Err(e.into());
            }
        }
        written += 1;
    }

    service.stop_capture();
    log::info!("wrote {written} frames to {}", args.out.display());
    Ok(())
}
