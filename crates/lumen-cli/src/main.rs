//! Lumen: HDR-style photo enhancement from the command line.
//!
//! Loads one image, applies exposure, shadow and tone mapping, and writes the
//! result into the output directory.

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc;

use anyhow::Context;
use clap::Parser;
use lumen_core::settings::PersistedSettings;
use lumen_core::{HdrProcessor, ProcessingParameters, ToneMapping};

use crate::config::AppConfig;

/// Fixed output name; each run replaces the previous result.
const DEFAULT_OUTPUT_NAME: &str = "output_hdr_with_all.png";

#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version, about = "HDR-style photo enhancement", long_about = None)]
struct Cli {
    /// Input image
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Exposure gain (values below 0.1 are raised to 0.1)
    #[arg(long, value_name = "FLOAT", default_value_t = 1.0)]
    exposure: f64,

    /// Shadow factor: below 1.0 lifts shadows, above darkens
    #[arg(long, value_name = "FLOAT", default_value_t = 1.0)]
    shadow: f64,

    /// Tone mapping: none, reinhard, drago or mantiuk
    #[arg(long, value_name = "NAME")]
    tone_mapping: Option<ToneMapping>,

    /// PNG compression level, -1 to 9
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    compression: Option<i32>,

    /// Output directory [env: LUMEN_OUTPUT_DIR]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output file name; the extension selects the format
    #[arg(long, value_name = "NAME", default_value = DEFAULT_OUTPUT_NAME)]
    output_name: String,

    /// Persisted settings file [env: LUMEN_SETTINGS]
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Log to stderr only
    #[arg(long)]
    no_log_file: bool,

    /// Run the pipeline on a worker thread and wait for its result
    #[arg(long)]
    background: bool,
}

impl Cli {
    /// Settings file values, then flags on top.
    fn parameters(&self, settings: PersistedSettings) -> ProcessingParameters {
        let mut params = ProcessingParameters::default();
        settings.apply_to(&mut params);
        params.set_exposure(self.exposure);
        params.set_shadow(self.shadow);
        if let Some(mapping) = self.tone_mapping {
            params.tone_mapping = mapping;
        }
        if let Some(level) = self.compression {
            params.compression_level = level;
        }
        params
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(Some(path)) => {
            println!("Saved HDR image with all settings to {}", path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => {
            println!("Failed to save HDR image");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<Option<PathBuf>> {
    let config = AppConfig::default().with_overrides(cli.output_dir.clone(), cli.settings.clone());

    let log_dir = (!cli.no_log_file).then_some(config.log_dir.as_path());
    let (_guard, log_path) = logging::init(log_dir)?;
    if let Some(path) = &log_path {
        tracing::info!("Logging to {}", path.display());
    }

    let settings = config
        .settings_path
        .as_deref()
        .map(PersistedSettings::load)
        .unwrap_or_default();
    let params = cli.parameters(settings);
    tracing::debug!("Running with {params:?}");

    let processor = HdrProcessor::new(&config.output_dir).with_parameters(params);

    if !cli.background {
        return Ok(processor.produce_and_save(&cli.input, &cli.output_name));
    }

    let processor = Arc::new(processor);
    let (tx, rx) = mpsc::channel();
    let handle = processor
        .spawn_produce_and_save(&cli.input, &cli.output_name, move |result| {
            let _ = tx.send(result);
        })
        .context("failed to start worker thread")?;
    if handle.join().is_err() {
        anyhow::bail!("worker thread panicked");
    }
    Ok(rx.recv().ok().flatten())
}
