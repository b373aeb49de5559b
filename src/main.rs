use clap::{Parser, Subcommand};
use photomark::config::{self, EngineConfig};
use photomark::imaging::codec::is_supported_input;
use photomark::imaging::{self, Compositor, ExportFormat, Quality};
use photomark::template::WatermarkTemplate;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "photomark")]
#[command(about = "Stamp text watermarks onto photos")]
#[command(long_about = "\
Stamp text watermarks onto photos

Settings come from a JSON template (--template), command-line flags, or
both; flags win. Directories given as input are searched recursively for
jpg, jpeg, png, bmp, tif and tiff files.

Positions:
  --position NAME     top-left, top-center, top-right, mid-left, mid-center,
                      mid-right, bottom-left, bottom-center, bottom-right
  --relative FX,FY    fractions of the free space, 0,0 = top-left corner
  --at X,Y            exact pixel coordinates of the text origin

Fonts are looked up in this order: --font, CJK system fonts, arial, and
finally a built-in ASCII bitmap font. Run 'photomark fonts' to see which
one is used.

Run 'photomark gen-config' to generate a documented photomark.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./photomark.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags that describe the watermark itself.
#[derive(clap::Args, Clone, Debug)]
struct MarkArgs {
    /// Watermark text
    #[arg(long)]
    text: Option<String>,

    /// Start from a saved JSON template
    #[arg(long)]
    template: Option<PathBuf>,

    /// Write the effective settings to a JSON template
    #[arg(long)]
    save_template: Option<PathBuf>,

    /// Font file to try before the system fonts
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font size in pixels
    #[arg(long)]
    size: Option<u32>,

    /// Size the text from each image's shorter edge
    #[arg(long)]
    auto_size: bool,

    /// Text color as R,G,B
    #[arg(long, value_parser = parse_rgb)]
    color: Option<[i64; 3]>,

    /// Opacity, 0-100
    #[arg(long)]
    opacity: Option<f64>,

    /// Named anchor position
    #[arg(long, conflicts_with_all = ["relative", "at"])]
    position: Option<String>,

    /// Relative position as FX,FY in 0..1
    #[arg(long, value_parser = parse_f64_pair, conflicts_with = "at")]
    relative: Option<(f64, f64)>,

    /// Absolute position as X,Y pixels
    #[arg(long, value_parser = parse_i32_pair, allow_hyphen_values = true)]
    at: Option<(i32, i32)>,
}

#[derive(Subcommand)]
enum Command {
    /// Watermark images and write them to an output directory
    Apply {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Where watermarked files are written
        #[arg(long, short, default_value = "watermarked")]
        output_dir: PathBuf,

        /// Output format (jpeg, png, bmp, tiff); default keeps each input's format
        #[arg(long, value_parser = parse_format)]
        format: Option<ExportFormat>,

        /// JPEG quality 1-100 (default from config)
        #[arg(long)]
        quality: Option<u32>,

        /// Appended to each output file stem
        #[arg(long, default_value = "_watermarked")]
        suffix: String,

        #[command(flatten)]
        mark: MarkArgs,
    },
    /// Render a downscaled preview of one image
    Preview {
        input: PathBuf,

        /// Preview file to write; its extension picks the format
        #[arg(long, short, default_value = "preview.png")]
        output: PathBuf,

        #[command(flatten)]
        mark: MarkArgs,
    },
    /// Show the font chain and which font it resolves to
    Fonts {
        /// Font file to try first
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Print a stock photomark.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Apply {
            inputs,
            output_dir,
            format,
            quality,
            suffix,
            mark,
        } => {
            let engine_config = load_engine_config(cli.config.as_deref())?;
            let compositor = engine_config.compositor();
            let template = build_template(&mark)?;
            let quality = quality
                .map(Quality::new)
                .unwrap_or_else(|| engine_config.quality());
            let sources = collect_inputs(&inputs);
            if sources.is_empty() {
                return Err("no supported images found".into());
            }
            std::fs::create_dir_all(&output_dir)?;

            let mut failed = 0usize;
            for source in &sources {
                let target_format = format
                    .or_else(|| ExportFormat::from_path(source))
                    .unwrap_or(ExportFormat::Jpeg);
                let output = output_path(source, &output_dir, &suffix, target_format);
                match watermark_one(
                    &compositor,
                    &template,
                    source,
                    &output,
                    target_format,
                    quality,
                ) {
                    Ok(exported) => println!(
                        "{} → {} ({}x{} {})",
                        source.display(),
                        exported.path.display(),
                        exported.width,
                        exported.height,
                        exported.format
                    ),
                    Err(e) => {
                        failed += 1;
                        tracing::error!(source = %source.display(), "{e}");
                    }
                }
            }

            println!(
                "==> {} of {} images watermarked",
                sources.len() - failed,
                sources.len()
            );
            if failed > 0 {
                return Err(format!("{failed} images failed").into());
            }
        }
        Command::Preview {
            input,
            output,
            mark,
        } => {
            let engine_config = load_engine_config(cli.config.as_deref())?;
            let compositor = engine_config.compositor();
            let template = build_template(&mark)?;
            let image = imaging::load_image(&input)?;
            let spec = template.to_spec_for_image((image.width(), image.height()));
            let layout = compositor.layout((image.width(), image.height()), &spec);
            let preview = imaging::render_preview(
                &compositor,
                &image,
                &spec,
                engine_config.preview_bounds(),
            );
            imaging::save_image_inferred(&preview, &output, engine_config.quality())?;

            let (x, y, w, h) = layout.ink_rect();
            println!("Font:    {}", layout.font);
            println!("Origin:  {},{}", layout.origin.0, layout.origin.1);
            println!("Ink box: {w}x{h} at {x},{y}");
            println!(
                "Preview: {} ({}x{})",
                output.display(),
                preview.width(),
                preview.height()
            );
        }
        Command::Fonts { font } => {
            let engine_config = load_engine_config(cli.config.as_deref())?;
            let compositor = engine_config.compositor();
            let fonts = compositor.fonts();
            for (i, name) in fonts.provider_names().iter().enumerate() {
                println!("{}. {name}", i + 1);
            }
            let resolved = fonts.resolve(font.as_deref(), imaging::DEFAULT_FONT_SIZE);
            println!("Resolved: {}", resolved.describe());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the log subscriber. The library only emits events.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "photomark=debug"
    } else {
        "photomark=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Template file (if any) with command-line flags layered on top.
fn build_template(mark: &MarkArgs) -> Result<WatermarkTemplate, Box<dyn std::error::Error>> {
    let mut template = match &mark.template {
        Some(path) => WatermarkTemplate::load(path)?,
        None => WatermarkTemplate::default(),
    };

    if let Some(text) = &mark.text {
        template.text = text.clone();
    }
    if let Some(font) = &mark.font {
        template.font_path = Some(font.clone());
    }
    if let Some(size) = mark.size {
        template.font_size = size;
        template.font_size_auto = false;
    }
    if mark.auto_size {
        template.font_size_auto = true;
    }
    if let Some(color) = mark.color {
        template.color = color;
    }
    if let Some(opacity) = mark.opacity {
        template.opacity = opacity.clamp(0.0, 100.0);
    }
    if let Some(position) = &mark.position {
        template.position_mode = position.clone();
        template.offset_x = Value::Null;
        template.offset_y = Value::Null;
    } else if let Some((fx, fy)) = mark.relative {
        template.position_mode = "relative".into();
        template.offset_x = Value::from(fx);
        template.offset_y = Value::from(fy);
    } else if let Some((x, y)) = mark.at {
        template.position_mode = "manual".into();
        template.offset_x = Value::from(x);
        template.offset_y = Value::from(y);
    }

    if template.text.trim().is_empty() {
        return Err("no watermark text: pass --text or a --template with text".into());
    }
    if let Some(path) = &mark.save_template {
        template.save(path)?;
    }
    Ok(template)
}

fn watermark_one(
    compositor: &Compositor,
    template: &WatermarkTemplate,
    source: &Path,
    output: &Path,
    format: ExportFormat,
    quality: Quality,
) -> Result<imaging::ExportedImage, imaging::ImagingError> {
    let image = imaging::load_image(source)?;
    let spec = template.to_spec_for_image((image.width(), image.height()));
    imaging::export_watermarked(compositor, &image, &spec, output, format, quality)
}

/// Expand directories into their supported images, in file-name order.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            sources.extend(
                WalkDir::new(input)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().is_file() && is_supported_input(entry.path()))
                    .map(|entry| entry.into_path()),
            );
        } else {
            sources.push(input.clone());
        }
    }
    sources
}

/// `in/IMG_1.JPG` → `out/IMG_1_watermarked.JPG`; the input's extension is
/// kept when it already names `format`.
fn output_path(source: &Path, output_dir: &Path, suffix: &str, format: ExportFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .filter(|ext| ExportFormat::from_extension(ext) == Some(format))
        .unwrap_or(format.extension());
    output_dir.join(format!("{stem}{suffix}.{extension}"))
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_extension(value)
        .ok_or_else(|| format!("unknown format '{value}' (expected jpeg, png, bmp or tiff)"))
}

fn parse_rgb(value: &str) -> Result<[i64; 3], String> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [r, g, b] => {
            let channel = |s: &str| s.parse::<i64>().map_err(|e| format!("bad channel '{s}': {e}"));
            Ok([channel(*r)?, channel(*g)?, channel(*b)?])
        }
        _ => Err(format!("expected R,G,B, got '{value}'")),
    }
}

fn parse_pair<T: std::str::FromStr>(value: &str) -> Result<(T, T), String>
where
    T::Err: std::fmt::Display,
{
    let (a, b) = value
        .split_once(',')
        .ok_or_else(|| format!("expected two comma-separated numbers, got '{value}'"))?;
    let parse = |s: &str| s.trim().parse::<T>().map_err(|e| format!("bad number '{s}': {e}"));
    Ok((parse(a)?, parse(b)?))
}

fn parse_f64_pair(value: &str) -> Result<(f64, f64), String> {
    parse_pair(value)
}

fn parse_i32_pair(value: &str) -> Result<(i32, i32), String> {
    parse_pair(value)
}
