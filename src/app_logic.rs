//! A module for the main application logic of the implant stress tool
use anyhow::{bail, Context, Result};
use log::info;
use std::path::PathBuf;

use crate::config::{load_config, Config};
use crate::loader::load;
use crate::report::render_summary;
use crate::stress::StressAnalyzer;

/// Options of one command line invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub result_file: PathBuf,
    pub material: String,
    pub output_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Print the statistics as JSON instead of the text summary.
    pub json: bool,
}

/// Loads the result file, analyzes it and prints the outcome to stdout.
pub fn run(options: &RunOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => {
            info!("Running with configuration: {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };
    config.validate().context("invalid configuration")?;
    let materials = config.material_table()?;
    if materials.get(&options.material).is_none() {
        bail!(
            "unknown material '{}', expected one of: {}",
            options.material,
            materials.names().collect::<Vec<_>>().join(", ")
        );
    }

    let record = load(&options.result_file).with_context(|| {
        format!("loading FEA results from {}", options.result_file.display())
    })?;

    let output_dir = options.output_dir.as_deref();
    let report = StressAnalyzer::new(&materials, config.histogram)
        .analyze_report(&record, &options.material, output_dir)
        .with_context(|| {
            format!(
                "analyzing stress distribution of {}",
                options.result_file.display()
            )
        })?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report.stats)?);
    } else {
        print!("{}", render_summary(&report, output_dir));
    }
    Ok(())
}
