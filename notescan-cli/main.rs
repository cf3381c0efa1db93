//! notescan CLI: find and count banknotes in photos.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use notescan_cli::annotate::{annotate_scene, draw_matches, load_font};
use notescan_cli::notescan_detect::{Deadline, LogObserver, ScanReport};
use notescan_cli::report::RunReport;
use notescan_cli::{build_scanner, init_thread_pool, AppConfig, CliResult, LibraryManifest, NoteScanner};
use notescan_core::GrayImage;
use rayon::prelude::*;

#[derive(Parser)]
#[command(name = "notescan")]
#[command(about = "Detect euro banknotes in images and add up their value")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan images for banknotes.
    Scan(ScanArgs),

    /// Build the template library and print per-template statistics.
    Library(LibraryArgs),

    /// Print the effective configuration as TOML.
    Config {
        /// Configuration file to merge over the defaults.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Template library manifest.
    #[arg(long, default_value = "notes/library.toml")]
    library: PathBuf,

    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for annotated copies of the scanned images.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// TrueType/OpenType font for value labels on annotated images.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Directory for side-by-side match images of every detection.
    #[arg(long)]
    debug_matches: Option<PathBuf>,

    /// Path to write a JSON report.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Stop scanning an image after this many milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// Images to scan.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct LibraryArgs {
    /// Template library manifest.
    #[arg(long, default_value = "notes/library.toml")]
    library: PathBuf,

    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan(args) => run_scan(&args),
        Commands::Library(args) => run_library(&args),
        Commands::Config { config } => {
            let cfg = load_config(config.as_deref())?;
            print!("{}", cfg.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn setup(config: Option<&Path>, library: &Path) -> anyhow::Result<(AppConfig, LibraryManifest)> {
    let cfg = load_config(config)?;
    tracing::info!("Configuration: {}", cfg.summary());
    if let Err(e) = init_thread_pool(cfg.n_threads) {
        tracing::warn!("Keeping existing thread pool: {}", e);
    }
    let manifest =
        LibraryManifest::load(library).with_context(|| format!("loading library {}", library.display()))?;
    Ok((cfg, manifest))
}

fn run_library(args: &LibraryArgs) -> anyhow::Result<()> {
    let (cfg, manifest) = setup(args.config.as_deref(), &args.library)?;
    let scanner = build_scanner(&cfg)?;

    let t0 = Instant::now();
    let library = manifest.build(&scanner)?;
    tracing::info!("Built {} templates in {:.2?}", library.len(), t0.elapsed());

    for template in &library {
        let (w, h) = template.image().dimensions();
        println!(
            "{:<10} value={:<4} {}x{} regions={} keypoints={}",
            template.tag(),
            template.value(),
            w,
            h,
            template.regions().len(),
            template.features().len()
        );
    }
    Ok(())
}

fn run_scan(args: &ScanArgs) -> anyhow::Result<()> {
    let (cfg, manifest) = setup(args.config.as_deref(), &args.library)?;

    let t0 = Instant::now();
    let notes = NoteScanner::new(&cfg, &manifest)?;
    tracing::info!("Loaded {} templates in {:.2?}", notes.library().len(), t0.elapsed());

    let font = args
        .font
        .as_deref()
        .map(load_font)
        .transpose()
        .context("loading label font")?;
    if args.annotate.is_some() && font.is_none() {
        tracing::warn!("No --font given, annotated images will have outlines only");
    }
    for dir in [&args.annotate, &args.debug_matches].into_iter().flatten() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let deadline = args.deadline_ms.map(Duration::from_millis);
    let outcomes: Vec<(PathBuf, CliResult<(GrayImage, ScanReport)>)> = args
        .images
        .par_iter()
        .map(|path| {
            let mut observer = LogObserver::new(file_stem(path));
            let outcome = match deadline {
                Some(budget) => notes.scan_file(path, &mut Deadline::new(&mut observer, budget)),
                None => notes.scan_file(path, &mut observer),
            };
            (path.clone(), outcome)
        })
        .collect();

    let mut run = RunReport::default();
    for (path, outcome) in outcomes {
        let (image, report) = match outcome {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!("{}: {}", path.display(), e);
                run.push_failure(&path, &e);
                continue;
            }
        };

        println!("{}:", path.display());
        for found in &report.instances {
            let c = found.corners.corners();
            println!(
                "  {:<10} {:>4}  ({:.0},{:.0}) ({:.0},{:.0}) ({:.0},{:.0}) ({:.0},{:.0})  inliers={}",
                found.tag,
                found.value,
                c[0].x,
                c[0].y,
                c[1].x,
                c[1].y,
                c[2].x,
                c[2].y,
                c[3].x,
                c[3].y,
                found.inlier_count()
            );
        }
        println!(
            "  total: {} ({} notes, {:.2?}{})",
            report.total_value(),
            report.instances.len(),
            report.elapsed,
            if report.aborted { ", deadline reached" } else { "" }
        );

        if let Some(dir) = &args.annotate {
            let out = dir.join(format!("{}_notes.png", file_stem(&path)));
            annotate_scene(&image, &report.instances, font.as_ref())
                .save(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            tracing::info!("Annotated image written to {}", out.display());
        }

        if let Some(dir) = &args.debug_matches {
            for (i, found) in report.instances.iter().enumerate() {
                let Some(template) = notes.library().get(&found.tag) else {
                    continue;
                };
                let out = dir.join(format!("{}_{}_{}.png", file_stem(&path), i, found.tag));
                draw_matches(template.image(), &image, found)
                    .save(&out)
                    .with_context(|| format!("writing {}", out.display()))?;
            }
        }

        run.push_scene(&path, &report);
    }

    if let Some(json) = &args.json {
        run.write_json(json)?;
        tracing::info!("Report written to {}", json.display());
    }

    if run.scenes.is_empty() {
        bail!("no image could be scanned");
    }
    if args.images.len() > 1 {
        println!("grand total: {}", run.grand_total());
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string())
}
