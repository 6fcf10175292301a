// src/main.rs

use anyhow::{bail, Context, Result};
use coinscope::model::{resolve_asset_dir, DirAssetProvider, PredictionAssets};
use coinscope::types::Config;
use coinscope::RecognitionSession;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

fn main() -> Result<()> {
    let config = Config::load_or_default("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Coin recognition starting");

    let asset_dir = resolve_asset_dir(&config.assets.search_paths).with_context(|| {
        format!(
            "no asset directory found among {:?}",
            config.assets.search_paths
        )
    })?;
    info!(dir = %asset_dir.display(), "using asset directory");

    let provider = DirAssetProvider::new(&asset_dir);
    let assets = Arc::new(PredictionAssets::load(&provider)?);
    let session = RecognitionSession::new(assets);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let inputs = if args.is_empty() {
        find_image_files(&config.io.input_dir)?
    } else {
        args.iter().map(PathBuf::from).collect()
    };

    if inputs.is_empty() {
        bail!("no input images found in {}", config.io.input_dir);
    }
    info!("Found {} image(s) to process", inputs.len());

    if config.io.save_annotated {
        std::fs::create_dir_all(&config.io.output_dir)
            .with_context(|| format!("creating output dir {}", config.io.output_dir))?;
    }

    let mut recognized = 0usize;
    let mut failed = 0usize;

    for path in &inputs {
        match process_image(&session, path, &config) {
            Ok(ok) => {
                if ok {
                    recognized += 1;
                } else {
                    failed += 1;
                }
            }
            Err(e) => {
                error!(image = %path.display(), "failed to process: {e:#}");
                failed += 1;
            }
        }
    }

    info!(
        "Done: {} recognized, {} failed, {} total",
        recognized,
        failed,
        inputs.len()
    );
    Ok(())
}

/// Run one image through the session. Returns whether classification
/// succeeded; I/O problems surface as errors.
fn process_image(session: &RecognitionSession, path: &Path, config: &Config) -> Result<bool> {
    let frame: RgbImage = image::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .to_rgb8();
    session.submit_frame(frame);

    let (result, visualized) = session.process_latest();

    match &result.error {
        None => info!(
            image = %path.display(),
            coin_type = %result.coin_type,
            coin_side = %result.coin_side,
            type_confidence = format!("{:.1}%", result.type_confidence).as_str(),
            side_confidence = format!("{:.1}%", result.side_confidence).as_str(),
            "recognized"
        ),
        Some(err) => warn!(image = %path.display(), "recognition failed: {err}"),
    }

    if config.io.save_annotated {
        if let Some(visualized) = visualized {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("frame");
            let out = Path::new(&config.io.output_dir).join(format!("{stem}_annotated.png"));
            visualized
                .save(&out)
                .with_context(|| format!("saving {}", out.display()))?;
        }
    }

    Ok(result.is_ok())
}

fn find_image_files(input_dir: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(input_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}
