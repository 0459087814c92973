//! Files written next to an analysis: the stress histogram and the statistics table.
//!
//! Both file names carry the material identifier, so analysing the same result
//! for several materials into one directory keeps every output.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::HistogramConfig;
use crate::error::AnalysisError;
use crate::material::MaterialLookup;
use crate::plot::{render_histogram_svg, Histogram, Marker};
use crate::stress::StressStats;

/// Paths of the files written by one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub histogram: PathBuf,
    pub statistics: PathBuf,
}

/// File name component for a material: lower case, `[a-z0-9_-]` only.
pub fn material_tag(material: &str) -> String {
    let tag: String = material
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if tag.is_empty() {
        "unnamed".to_string()
    } else {
        tag
    }
}

/// `bone` -> `Bone`
pub(crate) fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Creates `dir` if needed and writes the histogram image and statistics table.
pub fn write_artifacts(
    dir: &Path,
    material: &MaterialLookup,
    samples: &[f64],
    stats: &StressStats,
    settings: &HistogramConfig,
) -> Result<Artifacts, AnalysisError> {
    fs::create_dir_all(dir).map_err(|source| AnalysisError::Output {
        path: dir.to_path_buf(),
        source,
    })?;
    let tag = material_tag(&material.requested);

    let histogram_path = dir.join(format!("stress_histogram_{tag}.svg"));
    let limits = &material.limits;
    let markers = [
        Marker::dashed(
            limits.yield_stress,
            format!("Yield Stress ({} MPa)", limits.yield_stress),
            "red",
        ),
        Marker::dashed(
            limits.ultimate_stress,
            format!("Ultimate Stress ({} MPa)", limits.ultimate_stress),
            "darkred",
        ),
        Marker::dotted(
            stats.percentile_95,
            format!("95th Percentile ({:.2} MPa)", stats.percentile_95),
            "green",
        ),
    ];
    let title = format!("Stress Distribution - {}", capitalize(&material.requested));
    let svg = render_histogram_svg(
        &Histogram::from_samples(samples, settings.bins),
        &markers,
        &title,
        settings,
    );
    fs::write(&histogram_path, svg).map_err(|source| AnalysisError::Output {
        path: histogram_path.clone(),
        source,
    })?;

    let statistics_path = dir.join(format!("stress_stats_{tag}.csv"));
    write_statistics(&statistics_path, stats)?;

    info!(
        "Wrote {} and {}",
        histogram_path.display(),
        statistics_path.display()
    );
    Ok(Artifacts {
        histogram: histogram_path,
        statistics: statistics_path,
    })
}

/// Writes `stats` as a header row plus one data row.
fn write_statistics(path: &Path, stats: &StressStats) -> Result<(), AnalysisError> {
    let csv_error = |source| AnalysisError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.serialize(stats).map_err(csv_error)?;
    writer.flush().map_err(|source| AnalysisError::Output {
        path: path.to_path_buf(),
        source,
    })
}
