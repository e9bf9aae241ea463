use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use titlescroll::error_codes::{envelope_for, CodedError};
use titlescroll::manifest::{load_and_validate_scene, LoadedScene, SceneOverrides};
use titlescroll::pixel_scale::PixelScale;
use titlescroll::preview::{render_frame, save_png, LayerImages};
use titlescroll::progress::ScrollProgress;
use titlescroll::responsive::{Bucket, PresentationTokens, ResponsiveConfig};
use titlescroll::scene::{ParallaxScene, Spacing};
use titlescroll::viewport::{NaturalSize, Viewport};

#[derive(Debug, Parser)]
#[command(name = "titlescroll")]
#[command(about = "Scroll timeline engine for pixel-art parallax title sequences")]
#[command(version = env!("TITLESCROLL_VERSION"))]
struct Cli {
    /// Print machine-readable JSON, including error envelopes.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a scene manifest and report missing assets.
    Check { manifest: PathBuf },
    /// Show the bucket, pixel scale and section height for a viewport.
    Resolve(SceneArgs),
    /// Show the intro, mid-logo and CTA segments.
    Timeline(SceneArgs),
    /// Evaluate a single frame.
    Sample {
        #[command(flatten)]
        scene: SceneArgs,
        #[arg(long, default_value = "0")]
        progress: String,
    },
    /// Evaluate evenly spaced frames and digest them.
    Sweep {
        #[command(flatten)]
        scene: SceneArgs,
        #[arg(long, default_value_t = 100)]
        steps: u32,
        /// Include every frame in the output, not just the digest.
        #[arg(long, default_value_t = false)]
        frames: bool,
    },
    /// Render a PNG snapshot of one frame.
    Preview {
        #[command(flatten)]
        scene: SceneArgs,
        #[arg(long, default_value = "0")]
        progress: String,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}

#[derive(Debug, Args)]
struct SceneArgs {
    /// Scene manifest; the built-in title stack when omitted.
    manifest: Option<PathBuf>,
    /// Viewport as WIDTHxHEIGHT.
    #[arg(long)]
    viewport: Option<String>,
    #[arg(long)]
    zoom: Option<f64>,
    /// Natural size of the reference layer as WIDTHxHEIGHT.
    #[arg(long = "reference-size")]
    reference_size: Option<String>,
}

impl SceneArgs {
    fn load(&self) -> Result<(LoadedScene, ParallaxScene)> {
        let loaded = match &self.manifest {
            Some(path) => load_and_validate_scene(path)?,
            None => LoadedScene::builtin(),
        };
        let zoom = match self.zoom {
            Some(zoom) if !zoom.is_finite() || zoom <= 0.0 => {
                return Err(CodedError::usage(
                    "INVALID_ZOOM",
                    format!("invalid zoom {zoom}, expected a number > 0"),
                )
                .with_details(json!({ "provided": zoom }))
                .into());
            }
            other => other,
        };
        let overrides = SceneOverrides {
            viewport: self.viewport.as_deref().map(Viewport::parse).transpose()?,
            zoom,
            reference_size: self
                .reference_size
                .as_deref()
                .map(NaturalSize::parse)
                .transpose()?,
            probe_assets: self.manifest.is_some(),
        };
        let scene = loaded.build_scene(&overrides)?;
        Ok((loaded, scene))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let envelope = envelope_for(&error);
            let code = envelope.exit_code();
            if json {
                match serde_json::to_string_pretty(&envelope) {
                    Ok(envelope) => println!("{envelope}"),
                    Err(_) => eprintln!("error: {error:#}"),
                }
            } else {
                eprintln!("error: {error:#}");
            }
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check { manifest } => run_check(&manifest, cli.json),
        Commands::Resolve(scene) => run_resolve(&scene, cli.json),
        Commands::Timeline(scene) => run_timeline(&scene, cli.json),
        Commands::Sample { scene, progress } => run_sample(&scene, &progress, cli.json),
        Commands::Sweep {
            scene,
            steps,
            frames,
        } => run_sweep(&scene, steps, frames, cli.json),
        Commands::Preview {
            scene,
            progress,
            output,
        } => run_preview(&scene, &progress, &output, cli.json),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode json output")?;
    println!("{text}");
    Ok(())
}

fn run_check(manifest_path: &Path, json: bool) -> Result<()> {
    let loaded = load_and_validate_scene(manifest_path)?;
    let path = loaded.path.as_deref().unwrap_or(manifest_path).display();
    let manifest = &loaded.manifest;
    let reference = manifest.reference_layer_id().unwrap_or_default().to_owned();
    let missing = loaded.missing_assets();

    if json {
        return print_json(&json!({
            "ok": true,
            "path": path.to_string(),
            "layers": manifest.layers.len(),
            "reference_layer": reference,
            "asset_root": loaded.asset_root.display().to_string(),
            "missing_assets": missing,
        }));
    }

    println!(
        "OK: {} ({} layers, reference '{}')",
        path,
        manifest.layers.len(),
        reference
    );
    if missing.is_empty() {
        println!("Assets: all present under {}", loaded.asset_root.display());
    } else {
        println!("Missing assets under {}:", loaded.asset_root.display());
        for source in missing {
            println!("  {source}");
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    viewport: Viewport,
    zoom: f64,
    bucket: Bucket,
    config: &'a ResponsiveConfig,
    tokens: &'a PresentationTokens,
    pixel_scale: PixelScale,
    travel_px: f64,
    scroll_screens: f64,
    section_height_px: f64,
    spacing: Spacing,
}

fn run_resolve(args: &SceneArgs, json: bool) -> Result<()> {
    let (_, scene) = args.load()?;
    let layout = scene.layout();

    if json {
        return print_json(&ResolveReport {
            viewport: layout.viewport,
            zoom: scene.inputs().zoom,
            bucket: layout.bucket,
            config: &layout.config,
            tokens: &layout.tokens,
            pixel_scale: layout.pixel_scale,
            travel_px: layout.travel_px,
            scroll_screens: layout.scroll_screens,
            section_height_px: layout.section_height_px,
            spacing: layout.spacing,
        });
    }

    let scale = layout.pixel_scale;
    println!("Viewport: {} (zoom {})", layout.viewport, scene.inputs().zoom);
    println!("Bucket: {}", layout.bucket);
    println!(
        "Pixel scale: x{} ({}x{}), travel {}px",
        scale.factor, scale.scaled_width, scale.scaled_height, layout.travel_px
    );
    println!(
        "Section: {}px ({:.3} screens, {} scroll pages)",
        layout.section_height_px, layout.scroll_screens, layout.config.scroll_pages
    );
    println!(
        "Spacing: {}",
        if layout.spacing.tight { "tight" } else { "roomy" }
    );
    Ok(())
}

fn run_timeline(args: &SceneArgs, json: bool) -> Result<()> {
    let (_, scene) = args.load()?;
    let layout = scene.layout();

    if json {
        return print_json(&json!({
            "bucket": layout.bucket,
            "scroll_screens": layout.scroll_screens,
            "cta_ratio": layout.segments.cta_ratio,
            "segments": layout.segments,
        }));
    }

    println!("Bucket: {} ({:.3} screens)", layout.bucket, layout.scroll_screens);
    println!(
        "{:<10} {:>8} {:>8} {:>8} {:>8}  terminal",
        "segment", "start", "in", "out", "end"
    );
    for (name, segment) in layout.segments.iter() {
        println!(
            "{:<10} {:>8.4} {:>8.4} {:>8.4} {:>8.4}  {:?}",
            name,
            segment.start,
            segment.fade_in_end,
            segment.fade_out_start,
            segment.end,
            segment.terminal
        );
    }
    Ok(())
}

fn run_sample(args: &SceneArgs, progress: &str, json: bool) -> Result<()> {
    let progress = ScrollProgress::parse(progress)?;
    let (_, scene) = args.load()?;
    let frame = scene.frame(progress);

    if json {
        return print_json(&frame);
    }

    println!(
        "Progress {}  section {}px  scale {}",
        frame.progress, frame.section_height_px, frame.scene_scale
    );
    for layer in &frame.layers {
        println!(
            "  layer   {:<16} z={:<3} y={:>9.2}  {}x{}",
            layer.id, layer.stack_order, layer.offset_y_px, layer.width_px, layer.height_px
        );
    }
    for overlay in &frame.overlays {
        println!(
            "  overlay {:<16} z={:<3} opacity={:.3} dy={:.2}",
            overlay.kind.keyword(),
            overlay.stack_order,
            overlay.opacity,
            overlay.translate_y_px
        );
    }
    Ok(())
}

fn run_sweep(args: &SceneArgs, steps: u32, include_frames: bool, json: bool) -> Result<()> {
    let (_, scene) = args.load()?;
    let layout = scene.layout();
    let report = layout.sweep(steps)?;

    if json {
        let mut value = json!({
            "viewport": layout.viewport,
            "bucket": layout.bucket,
            "steps": report.steps,
            "samples": report.frames.len(),
            "digest": report.digest,
        });
        if include_frames {
            value["frames"] = serde_json::to_value(&report.frames)?;
        }
        return print_json(&value);
    }

    if include_frames {
        for frame in &report.frames {
            let opacities = frame
                .overlays
                .iter()
                .map(|overlay| format!("{}={:.3}", overlay.kind.keyword(), overlay.opacity))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{}  {opacities}", frame.progress);
        }
    }
    println!(
        "Sweep: {} samples over {} ({})",
        report.frames.len(),
        layout.viewport,
        layout.bucket
    );
    println!("Digest: {}", report.digest);
    Ok(())
}

fn run_preview(args: &SceneArgs, progress: &str, output: &Path, json: bool) -> Result<()> {
    let progress = ScrollProgress::parse(progress)?;
    let (loaded, scene) = args.load()?;
    let images = LayerImages::load(&loaded.loader(), scene.layers());
    let frame = scene.frame(progress);
    let pixmap = render_frame(scene.layout(), &frame, &images)?;
    save_png(&pixmap, output)?;

    if json {
        return print_json(&json!({
            "ok": true,
            "output": output.display().to_string(),
            "width": pixmap.width(),
            "height": pixmap.height(),
            "layers_drawn": images.len(),
            "progress": progress,
        }));
    }
    println!(
        "Wrote {} ({}x{}, {} layer images)",
        output.display(),
        pixmap.width(),
        pixmap.height(),
        images.len()
    );
    Ok(())
}
