//! CLI for Retouch - prompt-driven image editing.

use clap::{Args, Parser, Subcommand};
use retouch::session::DOWNLOAD_STEM;
use retouch::{
    download_filename, Adjustments, CropRegion, EditProvider, EditorConfig, EncodedImage,
    GeminiModel, GeminiProvider, Pipeline, Resize, Session, Transform,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Crop, resize and edit images with a text prompt (Gemini), then adjust")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log request details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit an image according to a text prompt
    Edit(EditArgs),

    /// Auto-enhance an image with the built-in instruction
    Enhance(EnhanceArgs),

    /// Crop, resize and adjust locally without calling the API
    Adjust(AdjustArgs),

    /// Verify the API key and model are usable
    Check(CheckArgs),
}

#[derive(Args)]
struct EditArgs {
    /// Input image (PNG, JPEG or WEBP)
    input: PathBuf,

    /// Description of the edit
    prompt: String,

    #[command(flatten)]
    common: RemoteArgs,
}

#[derive(Args)]
struct EnhanceArgs {
    /// Input image (PNG, JPEG or WEBP)
    input: PathBuf,

    #[command(flatten)]
    common: RemoteArgs,
}

#[derive(Args)]
struct RemoteArgs {
    /// Gemini model (nano-banana, nano-banana-pro)
    #[arg(short, long)]
    model: Option<String>,

    #[command(flatten)]
    prep: PrepArgs,

    #[command(flatten)]
    adjust: AdjustFlags,

    /// Output file or directory (defaults to ./edited-image.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AdjustArgs {
    /// Input image (PNG, JPEG or WEBP)
    input: PathBuf,

    #[command(flatten)]
    prep: PrepArgs,

    #[command(flatten)]
    adjust: AdjustFlags,

    /// Output file or directory (defaults to ./edited-image.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Gemini model (nano-banana, nano-banana-pro)
    #[arg(short, long)]
    model: Option<String>,
}

#[derive(Args)]
struct PrepArgs {
    /// Crop rectangle as X,Y,W,H
    #[arg(long)]
    crop: Option<CropRegion>,

    /// Size the crop rectangle was drawn at, as WxH (defaults to the image size)
    #[arg(long, value_parser = parse_size, requires = "crop")]
    display: Option<(u32, u32)>,

    /// Scale the working image by a percentage before editing
    #[arg(long, conflicts_with_all = ["width", "height"])]
    scale: Option<u32>,

    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Let width and height change independently
    #[arg(long)]
    no_aspect_lock: bool,
}

#[derive(Args)]
struct AdjustFlags {
    /// Contrast in percent (100 = unchanged)
    #[arg(long, default_value_t = 100)]
    contrast: u32,

    /// Brightness in percent (100 = unchanged)
    #[arg(long, default_value_t = 100)]
    brightness: u32,

    /// Saturation in percent (100 = unchanged)
    #[arg(long, default_value_t = 100)]
    saturation: u32,
}

impl AdjustFlags {
    fn to_adjustments(&self) -> Adjustments {
        Adjustments::default()
            .with_contrast(self.contrast)
            .with_brightness(self.brightness)
            .with_saturation(self.saturation)
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    Ok((w, h))
}

fn parse_model(name: Option<&str>) -> anyhow::Result<Option<GeminiModel>> {
    name.map(|n| {
        GeminiModel::from_name(n).ok_or_else(|| anyhow::anyhow!("unknown model '{n}'"))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Edit(args) => {
            let EditArgs {
                input,
                prompt,
                common,
            } = args;
            run_remote(&input, Some(prompt), common, cli.json).await?;
        }
        Commands::Enhance(args) => {
            run_remote(&args.input, None, args.common, cli.json).await?;
        }
        Commands::Adjust(args) => {
            run_adjust(args, cli.json)?;
        }
        Commands::Check(args) => {
            run_check(args, cli.json).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "retouch=debug" } else { "retouch=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_prep(session: &mut Session, prep: &PrepArgs) -> anyhow::Result<()> {
    if let Some(region) = prep.crop {
        match prep.display {
            Some(display) => session.apply_display_crop(region, display)?,
            None => session.apply_crop(region)?,
        }
    }

    let spec = session.resize_mut();
    spec.set_lock_aspect(!prep.no_aspect_lock);
    if let Some(percent) = prep.scale {
        spec.set_percentage(percent);
    }
    match (prep.width, prep.height) {
        (Some(w), Some(h)) => {
            spec.set_lock_aspect(false);
            spec.set_width(w);
            spec.set_height(h);
        }
        (Some(w), None) => spec.set_width(w),
        (None, Some(h)) => spec.set_height(h),
        (None, None) => {}
    }
    Ok(())
}

async fn run_remote(
    input: &Path,
    prompt: Option<String>,
    args: RemoteArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let mut config = EditorConfig::from_env();
    if let Some(model) = parse_model(args.model.as_deref())? {
        config = config.model(model);
    }

    let mut session = Session::new(config);
    session.load_source(EncodedImage::from_path(input)?)?;
    apply_prep(&mut session, &args.prep)?;
    session.set_adjustments(args.adjust.to_adjustments());

    match prompt {
        Some(prompt) => {
            session.set_prompt(prompt);
            session.generate().await?;
        }
        None => session.enhance().await?,
    }

    let path = write_output(&session, args.output.as_deref())?;
    let edited = session
        .edit_result()
        .ok_or_else(|| anyhow::anyhow!("no edit result"))?;
    let size = session.display_image().map(|i| i.size()).unwrap_or_default();

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": path.display().to_string(),
            "size_bytes": size,
            "mime_type": session.display_image().map(|i| i.mime_type.clone()),
            "model": edited.metadata.model,
            "duration_ms": edited.metadata.duration_ms,
            "text": edited.metadata.text,
            "adjusted": session.adjusted_result().is_some() && !session.adjustments().is_identity(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Edited image: {} ({} bytes)", path.display(), size);
        if let Some(duration) = edited.metadata.duration_ms {
            println!("Duration: {}ms", duration);
        }
        if let Some(ref text) = edited.metadata.text {
            println!("Model says: {}", text);
        }
    }

    Ok(())
}

fn write_output(session: &Session, output: Option<&Path>) -> anyhow::Result<PathBuf> {
    match output {
        Some(path) if !path.is_dir() => {
            let download = session
                .download()
                .ok_or_else(|| anyhow::anyhow!("nothing to save"))?;
            download.image.save(path)?;
            Ok(path.to_path_buf())
        }
        Some(dir) => Ok(session.save_download(dir)?),
        None => Ok(session.save_download(".")?),
    }
}

fn run_adjust(args: AdjustArgs, json_output: bool) -> anyhow::Result<()> {
    let config = EditorConfig::from_env();
    let quality = config.jpeg_quality;

    // The session gives crop and resize the same semantics as a remote edit.
    let mut session = Session::new(config);
    session.load_source(EncodedImage::from_path(&args.input)?)?;
    apply_prep(&mut session, &args.prep)?;

    let working = session
        .working_image()
        .ok_or_else(|| anyhow::anyhow!("no image loaded"))?;
    let (width, height) = working.dimensions()?;

    let mut pipeline = Pipeline::new();
    if let Some((w, h)) = session.resize().target_for(width, height) {
        pipeline.push(Resize::new(w, h).with_jpeg_quality(quality));
    }
    pipeline.push(args.adjust.to_adjustments().to_filter(quality));
    let result = pipeline.apply(working)?;

    let path = match args.output {
        Some(path) if !path.is_dir() => path,
        Some(dir) => dir.join(download_filename(DOWNLOAD_STEM, Some(&result.mime_type))),
        None => PathBuf::from(download_filename(DOWNLOAD_STEM, Some(&result.mime_type))),
    };
    result.save(&path)?;
    let (out_w, out_h) = result.dimensions()?;

    if json_output {
        let summary = serde_json::json!({
            "success": true,
            "output": path.display().to_string(),
            "size_bytes": result.size(),
            "mime_type": result.mime_type,
            "width": out_w,
            "height": out_h,
            "steps": pipeline.names(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Adjusted image: {} ({}x{}, {} bytes)",
            path.display(),
            out_w,
            out_h,
            result.size()
        );
    }

    Ok(())
}

async fn run_check(args: CheckArgs, json_output: bool) -> anyhow::Result<()> {
    let mut config = EditorConfig::from_env();
    if let Some(model) = parse_model(args.model.as_deref())? {
        config = config.model(model);
    }

    let provider = GeminiProvider::from_config(&config)?;
    provider.health_check().await?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "provider": provider.name(),
            "model": provider.model().as_str(),
            "base_url": config.base_url,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "✓ {} reachable with model {}",
            provider.name(),
            provider.model()
        );
    }

    Ok(())
}
