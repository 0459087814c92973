//! Stress statistics and safety margins against material strength limits.

use log::info;
use nalgebra::Point3;
use serde::Serialize;
use std::path::Path;

use crate::config::HistogramConfig;
use crate::error::AnalysisError;
use crate::material::{MaterialLimits, MaterialLookup, MaterialTable};
use crate::output::{write_artifacts, Artifacts};
use crate::record::{ResultRecord, ScalarField};

/// Summary statistics of a von Mises stress sample.
///
/// Field order is the column order of the persisted statistics table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation (divisor N).
    pub std_dev: f64,
    pub max: f64,
    pub min: f64,
    /// 95th percentile, linear interpolation between closest ranks.
    pub percentile_95: f64,
    /// `max / yield_stress`; 1 or more means the peak reaches yield.
    pub yield_ratio: f64,
    /// `max / ultimate_stress`; 1 or more means the peak reaches fracture.
    pub ultimate_ratio: f64,
    /// Samples strictly above the yield stress.
    pub nodes_exceeding_yield: usize,
    pub percent_exceeding_yield: f64,
}

impl StressStats {
    /// Computes the statistics of `samples` against `limits`.
    ///
    /// # Errors
    ///
    /// [`AnalysisError::EmptyInput`] for an empty sample and
    /// [`AnalysisError::NonFiniteSample`] if any value is NaN or infinite.
    pub fn compute(samples: &[f64], limits: &MaterialLimits) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        if let Some((index, &value)) = samples.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(AnalysisError::NonFiniteSample { index, value });
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let min = sorted[0];
        let max = sorted[n - 1];
        let mean = mean(&sorted);
        let nodes_exceeding_yield = samples.iter().filter(|&&v| v > limits.yield_stress).count();

        Ok(StressStats {
            mean,
            median: median(&sorted),
            std_dev: population_std_dev(&sorted, mean),
            max,
            min,
            percentile_95: percentile(&sorted, 95.0),
            yield_ratio: max / limits.yield_stress,
            ultimate_ratio: max / limits.ultimate_stress,
            nodes_exceeding_yield,
            percent_exceeding_yield: 100.0 * nodes_exceeding_yield as f64 / n as f64,
        })
    }

    /// The statistics as a flat name → value list, in table order.
    pub fn entries(&self) -> [(&'static str, f64); 10] {
        [
            ("mean", self.mean),
            ("median", self.median),
            ("std_dev", self.std_dev),
            ("max", self.max),
            ("min", self.min),
            ("percentile_95", self.percentile_95),
            ("yield_ratio", self.yield_ratio),
            ("ultimate_ratio", self.ultimate_ratio),
            ("nodes_exceeding_yield", self.nodes_exceeding_yield as f64),
            ("percent_exceeding_yield", self.percent_exceeding_yield),
        ]
    }
}

/// Arithmetic mean of a non-empty sorted sample.
///
/// Summing offsets from the smallest value keeps a constant sample exact.
fn mean(sorted: &[f64]) -> f64 {
    let base = sorted[0];
    base + sorted.iter().map(|v| v - base).sum::<f64>() / sorted.len() as f64
}

fn population_std_dev(samples: &[f64], mean: f64) -> f64 {
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        let (lo, hi) = (sorted[mid - 1], sorted[mid]);
        lo + (hi - lo) / 2.0
    }
}

/// `p`-th percentile of a non-empty sorted sample.
///
/// The rank `p / 100 * (n - 1)` is interpolated linearly between the two
/// closest order statistics.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let fraction = rank - lo as f64;
    sorted[lo] + fraction * (sorted[hi] - sorted[lo])
}

/// Node carrying the largest von Mises stress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakLocation {
    pub node_id: i64,
    pub position: Option<Point3<f64>>,
}

/// Everything one analysis produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub stats: StressStats,
    pub material: MaterialLookup,
    pub peak: Option<PeakLocation>,
    /// Files written, when an output directory was given.
    pub artifacts: Option<Artifacts>,
}

/// Computes stress statistics of result records against a material table.
#[derive(Debug, Clone)]
pub struct StressAnalyzer<'a> {
    materials: &'a MaterialTable,
    histogram: HistogramConfig,
}

impl<'a> StressAnalyzer<'a> {
    pub fn new(materials: &'a MaterialTable, histogram: HistogramConfig) -> Self {
        StressAnalyzer { materials, histogram }
    }

    /// Statistics of the von Mises field of `record` for `material`.
    ///
    /// When `output_dir` is given, a histogram and a one-row statistics table
    /// are written there; see [`StressAnalyzer::analyze_report`].
    pub fn analyze(
        &self,
        record: &ResultRecord,
        material: &str,
        output_dir: Option<&Path>,
    ) -> Result<StressStats, AnalysisError> {
        self.analyze_report(record, material, output_dir)
            .map(|report| report.stats)
    }

    /// Like [`StressAnalyzer::analyze`], also returning the resolved material,
    /// the peak node and the paths of the written files.
    ///
    /// Nothing touches the filesystem unless every statistic was computed.
    pub fn analyze_report(
        &self,
        record: &ResultRecord,
        material: &str,
        output_dir: Option<&Path>,
    ) -> Result<AnalysisReport, AnalysisError> {
        let samples = record
            .field(ScalarField::VonMises)
            .ok_or(AnalysisError::MissingField(ScalarField::VonMises))?;
        let material = self.materials.lookup(material);
        let stats = StressStats::compute(samples, &material.limits)?;
        let peak = locate_peak(record, samples, stats.max);
        info!(
            "Analyzed {} von Mises samples for {} (yield {} MPa, ultimate {} MPa)",
            samples.len(),
            material.resolved,
            material.limits.yield_stress,
            material.limits.ultimate_stress
        );

        let artifacts = match output_dir {
            Some(dir) => Some(write_artifacts(dir, &material, samples, &stats, &self.histogram)?),
            None => None,
        };

        Ok(AnalysisReport {
            stats,
            material,
            peak,
            artifacts,
        })
    }
}

fn locate_peak(record: &ResultRecord, samples: &[f64], max: f64) -> Option<PeakLocation> {
    let index = samples.iter().position(|&v| v == max)?;
    Some(PeakLocation {
        node_id: record.node_ids()[index],
        position: record.coordinates().map(|c| c[index]),
    })
}
