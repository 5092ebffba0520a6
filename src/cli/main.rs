use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use czi_exposure::convention::Convention;
use czi_exposure::export;
use czi_exposure::provider::BioformatsRuntime;

#[derive(Parser, Debug)]
#[command(
    name = "czi-exposure",
    version,
    about = "Extract per-channel exposure times from CZI microscopy images into per-slide CSV tables"
)]
struct Cli {
    /// One or more slide identifiers
    #[arg(value_name = "SLIDE", required = true)]
    slides: Vec<String>,

    /// Sample-set root directory holding {slide}/splitscenes/ with the czi files
    #[arg(short = 'i', long = "czidir", value_name = "DIR", default_value = "./")]
    czidir: PathBuf,

    /// Directory to write the exposure-time csv files to
    #[arg(short = 'o', long = "codedir", value_name = "DIR", default_value = "./")]
    codedir: PathBuf,

    /// Filename convention: regular or stitched
    #[arg(long, value_name = "NAME", default_value = "regular")]
    convention: String,

    /// Path to the Bio-Formats showinf tool (default: $BIOFORMATS_SHOWINF, else showinf on PATH)
    #[arg(long, value_name = "FILE")]
    showinf: Option<PathBuf>,

    /// Output per-slide results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // An unknown convention is fatal before anything else runs.
    let convention: Convention = cli.convention.parse()?;

    log::info!("slides: {:?}", cli.slides);
    log::info!("czidir: {}", cli.czidir.display());
    log::info!("codedir: {}", cli.codedir.display());

    // The Bio-Formats engine tolerates exactly one start per process, so the
    // runtime spans the whole batch regardless of per-slide outcomes.
    let runtime = BioformatsRuntime::start(cli.showinf.clone())?;
    let provider = runtime.provider();

    let reports = export::export_sampleset_exposures(
        &cli.slides,
        &cli.czidir,
        &cli.codedir,
        convention,
        &provider,
    );

    for report in &reports {
        match &report.error {
            Some(err) => log::error!("{}: {err}", report.slide),
            None => {
                log::info!("{}: {} image(s) exported", report.slide, report.images_ok);
                for warning in &report.warnings {
                    log::warn!("  {warning}");
                }
                for image_error in &report.image_errors {
                    log::warn!("  {image_error}");
                }
            }
        }
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    // Summary
    let success = reports.iter().filter(|r| r.error.is_none()).count();
    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    log::info!("Done: {success} succeeded, {failed} failed out of {} slide(s)", reports.len());

    Ok(())
}
