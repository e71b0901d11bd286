use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photo_story_wasm::{BatchPacing, PhotoLibrary, PreviewHandle, SettingsPatch};

/// Render photos into 1080×1920 stories with camera details and a color palette.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON file with settings to apply to every photo (camelCase keys)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    camera: Option<String>,

    #[arg(long)]
    lens: Option<String>,

    #[arg(long)]
    aperture: Option<String>,

    #[arg(long)]
    film_stock: Option<String>,

    #[arg(long)]
    custom: Option<String>,

    /// Leave out camera model and lens
    #[arg(long)]
    no_camera_info: bool,

    /// Leave out the aperture / film stock line
    #[arg(long)]
    no_settings: bool,

    /// Leave out the palette strip
    #[arg(long)]
    no_palette: bool,

    /// Pause between consecutive exports, in milliseconds
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Output directory (defaults to the current directory)
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Print extracted palettes as JSON and exit
    #[arg(long)]
    palette_only: bool,
}

impl Args {
    fn patch(&self) -> Result<SettingsPatch> {
        let mut patch = match &self.settings {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SettingsPatch::default(),
        };
        let overrides = [
            (&mut patch.camera_model, &self.camera),
            (&mut patch.lens, &self.lens),
            (&mut patch.aperture, &self.aperture),
            (&mut patch.film_stock, &self.film_stock),
            (&mut patch.custom_settings, &self.custom),
        ];
        for (field, flag) in overrides {
            if flag.is_some() {
                field.clone_from(flag);
            }
        }
        if self.no_camera_info {
            patch.show_camera_info = Some(false);
        }
        if self.no_settings {
            patch.show_settings = Some(false);
        }
        if self.no_palette {
            patch.show_color_palette = Some(false);
        }
        Ok(patch)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.png".to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photo_story_wasm=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let args = Args::parse();
    let patch = args.patch()?;

    let mut library = PhotoLibrary::new();
    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        library
            .ingest_bytes(file_name(input), &bytes, PreviewHandle::detached())
            .with_context(|| format!("decoding {}", input.display()))?;
    }

    if args.palette_only {
        let palettes: serde_json::Map<String, serde_json::Value> = library
            .iter()
            .map(|r| (r.file_name().to_string(), r.palette().to_hex().into()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&palettes)?);
        return Ok(());
    }

    library.apply_bulk(&patch);

    let out_dir = args.out_dir.clone().unwrap_or_default();
    if !out_dir.as_os_str().is_empty() {
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("creating {}", out_dir.display()))?;
    }

    let pacing = BatchPacing {
        delay: Duration::from_millis(args.delay_ms),
    };
    let count = library
        .export_all(&pacing, |story| {
            let out_path = out_dir.join(&story.file_name);
            fs::write(&out_path, &story.png)
                .map_err(|e| photo_story_wasm::StoryError::export(format!("{}: {e}", out_path.display())))?;
            println!("Saved → {}", out_path.display());
            Ok(())
        })
        .context("story export failed")?;

    tracing::info!(count, "done");
    Ok(())
}
