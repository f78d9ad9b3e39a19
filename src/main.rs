use clap::{Parser, Subcommand};
use focalpoint::cache::ScaleStorage;
use focalpoint::config::{self, FocalConfig};
use focalpoint::field::{ContentItem, FieldContainer, FieldMetadata, ImageField, sidecar_path};
use focalpoint::imaging::{RustBackend, ScaleMode, rust_backend::supported_input_extensions};
use focalpoint::pipeline::{Detection, FocalPointPipeline};
use focalpoint::scaling::{ScaleOutcome, ScaleRequest, ScalingFactory};
use focalpoint::{debug, output};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info_span};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Field name images are stored under when loaded from disk.
const FIELD: &str = "image";

#[derive(Parser)]
#[command(name = "focalpoint")]
#[command(about = "Focal point detection and focal-point-aware image scaling")]
#[command(long_about = "\
Focal point detection and focal-point-aware image scaling

Every image gets one focal point: the weighted centre of its strongest
corner features. Crop-to-fit scales keep that point as central as the
target aspect ratio allows.

Focal points are stored in a sidecar next to each image:

  photos/
  ├── beach.jpg
  └── beach.jpg.focal.json     # content type, size, focal point, source hash

Scale modes:
  contain (scale-crop-to-fit, down)   crop around the focal point
  cover   (scale-crop-to-fill, up)    crop around the focal point
  scale   (keep, thumbnail)           fit inside the box, never upscale

Run 'focalpoint gen-config' to generate a documented focalpoint.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Directory holding created scales
    #[arg(long, default_value = ".focal-cache", global = true)]
    cache_dir: PathBuf,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect and store focal points for images or directories of images
    Detect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Create one scale of an image
    Scale {
        image: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// contain, cover or scale (aliases accepted)
        #[arg(long)]
        mode: Option<ScaleMode>,
        /// Named scale from [scaling.sizes]
        #[arg(long)]
        scale: Option<String>,
        #[arg(long)]
        quality: Option<u32>,
        /// Where to write the scale (default: next to the image)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-detect the focal point and drop stale (or, with --force, all) scales
    ClearScales {
        image: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Print a stock focalpoint.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let pipeline = FocalPointPipeline::from_config(&config.detection, info_span!("focal"));

    match cli.command {
        Command::Detect { paths } => {
            init_thread_pool(&config.processing);
            let files = collect_images(&paths);
            let outcomes: Vec<(PathBuf, Detection)> = files
                .par_iter()
                .map(|path| (path.clone(), detect_file(path, &pipeline)))
                .collect();

            for (i, (path, outcome)) in outcomes.iter().enumerate() {
                for line in output::format_detection(i + 1, path, outcome) {
                    println!("{}", line);
                }
            }
            let all: Vec<Detection> = outcomes.into_iter().map(|(_, o)| o).collect();
            println!();
            println!("{}", output::format_detect_summary(&all));
        }
        Command::Scale {
            image,
            width,
            height,
            mode,
            scale,
            quality,
            output: out_path,
        } => {
            let item = load_item(&image, &pipeline)?;
            let mut storage = open_storage(&cli.cache_dir, &image, &config)?;
            let factory = ScalingFactory::new(
                RustBackend::new(),
                config.scaling.clone(),
                info_span!("scale", image = %image.display()),
            );
            let request = ScaleRequest {
                fieldname: Some(FIELD.to_string()),
                scale,
                width,
                height,
                mode,
                quality,
                ..ScaleRequest::default()
            };

            let Some(outcome) = factory.scale(&item, &mut storage, &request, now())? else {
                return Err(format!("no scale could be created for {}", image.display()).into());
            };
            let written = match &outcome {
                ScaleOutcome::Scaled(stored) => {
                    let path = out_path.unwrap_or_else(|| {
                        default_output(
                            &image,
                            stored.entry.width,
                            stored.entry.height,
                            stored.entry.format.extension(),
                        )
                    });
                    std::fs::write(&path, &stored.data)?;
                    Some(path)
                }
                ScaleOutcome::Passthrough { data, .. } => {
                    let path = out_path.unwrap_or_else(|| image.clone());
                    if path != image {
                        std::fs::write(&path, data)?;
                    }
                    Some(path)
                }
                ScaleOutcome::Original { .. } => None,
            };
            for line in output::format_scale_outcome(&image, written.as_deref(), &outcome) {
                println!("{}", line);
            }
            println!("    Cache: {}", storage.stats());
        }
        Command::ClearScales { image, force } => {
            let mut item = load_item(&image, &pipeline)?;
            let mut storage = open_storage(&cli.cache_dir, &image, &config)?;
            let summary = debug::clear_scales(&mut item, &mut storage, &pipeline, force, now())?;
            if let Some(field) = item.image(FIELD) {
                field.metadata().save(&sidecar_path(&image))?;
            }
            println!("{}", summary);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "focalpoint=debug" } else { "focalpoint=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Expand directories into the images below them, sorted.
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                WalkDir::new(path)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file() && is_supported_image(e.path()))
                    .map(|e| e.into_path()),
            );
        } else {
            files.push(path.clone());
        }
    }
    files
}

/// Read an image plus its sidecar, if the sidecar still matches.
fn read_field(path: &Path) -> Result<ImageField, Box<dyn std::error::Error>> {
    let mut field = ImageField::from_path(path)?;
    if let Some(meta) = FieldMetadata::load(&sidecar_path(path))? {
        field.apply_metadata(&meta);
    }
    Ok(field)
}

fn detect_file(path: &Path, pipeline: &FocalPointPipeline) -> Detection {
    let mut field = match read_field(path) {
        Ok(f) => f,
        Err(e) => {
            error!(path = %path.display(), error = %e, "could not read image");
            return Detection::Skipped;
        }
    };
    let outcome = pipeline.determine_for_field(&mut field);
    if outcome != Detection::Skipped
        && let Err(e) = field.metadata().save(&sidecar_path(path))
    {
        error!(path = %path.display(), error = %e, "could not write sidecar");
    }
    outcome
}

/// Load an image as a one-field content item. A missing or stale sidecar
/// triggers detection and is rewritten.
fn load_item(
    path: &Path,
    pipeline: &FocalPointPipeline,
) -> Result<ContentItem, Box<dyn std::error::Error>> {
    let mut field = ImageField::from_path(path)?;
    let sidecar = sidecar_path(path);
    let fresh = match FieldMetadata::load(&sidecar)? {
        Some(meta) => field.apply_metadata(&meta),
        None => false,
    };
    if !fresh && pipeline.determine_for_field(&mut field) != Detection::Skipped {
        field.metadata().save(&sidecar)?;
    }

    let mut item = ContentItem::new(format!("file://{}", path.display()));
    item.set_image(FIELD, field);
    Ok(item)
}

/// Each image gets its own storage directory, named after the file.
fn open_storage(
    cache_dir: &Path,
    image: &Path,
    config: &FocalConfig,
) -> Result<ScaleStorage, Box<dyn std::error::Error>> {
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    Ok(ScaleStorage::open(
        &cache_dir.join(name),
        config.cache.keep_seconds,
    )?)
}

/// `photos/beach.jpg` → `photos/beach-400x300.jpg`.
fn default_output(image: &Path, width: u32, height: u32, ext: &str) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scale".to_string());
    image.with_file_name(format!("{stem}-{width}x{height}.{ext}"))
}
