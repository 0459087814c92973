use crate::output::capitalize;
use crate::stress::AnalysisReport;
use std::fmt::Write;
use std::path::Path;

/// Render the console summary of a stress analysis.
///
/// Stresses and percentages use two decimals, ratios three. A material that
/// fell back to the bone limits is called out so the substitution is visible.
#[must_use]
pub fn render_summary(report: &AnalysisReport, output_dir: Option<&Path>) -> String {
    let mut output = String::new();
    let stats = &report.stats;
    let material = &report.material;

    let _ = writeln!(
        &mut output,
        "\nStress Analysis Summary for {}:",
        capitalize(&material.requested)
    );
    if material.fallback {
        let _ = writeln!(
            &mut output,
            "  Note: unknown material, using {} limits ({} / {} MPa)",
            material.resolved, material.limits.yield_stress, material.limits.ultimate_stress
        );
    }
    let _ = writeln!(&mut output, "  Mean Stress: {:.2} MPa", stats.mean);
    let _ = writeln!(&mut output, "  Maximum Stress: {:.2} MPa", stats.max);
    let _ = writeln!(&mut output, "  95th Percentile: {:.2} MPa", stats.percentile_95);
    let _ = writeln!(&mut output, "  Yield Ratio: {:.3}", stats.yield_ratio);
    let _ = writeln!(&mut output, "  Ultimate Ratio: {:.3}", stats.ultimate_ratio);
    let _ = writeln!(
        &mut output,
        "  Nodes Exceeding Yield: {} ({:.2}%)",
        stats.nodes_exceeding_yield, stats.percent_exceeding_yield
    );

    // Where the peak sits is the first thing to check in the model.
    if let Some(peak) = report.peak {
        let _ = match peak.position {
            Some(p) => writeln!(
                &mut output,
                "  Peak Stress at Node {} ({:.3}, {:.3}, {:.3})",
                peak.node_id, p.x, p.y, p.z
            ),
            None => writeln!(&mut output, "  Peak Stress at Node {}", peak.node_id),
        };
    }

    if let Some(dir) = output_dir {
        let _ = writeln!(&mut output, "\nDetailed results saved to: {}", dir.display());
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialTable;
    use crate::stress::{PeakLocation, StressStats};
    use nalgebra::Point3;

    fn report(material: &str) -> AnalysisReport {
        let material = MaterialTable::builtin().lookup(material);
        let samples: Vec<f64> = (1..=10).map(|i| f64::from(i) * 10.0).collect();
        AnalysisReport {
            stats: StressStats::compute(&samples, &material.limits).unwrap(),
            material,
            peak: Some(PeakLocation { node_id: 9, position: Some(Point3::new(1.0, 2.5, -3.0)) }),
            artifacts: None,
        }
    }

    #[test]
    fn formats_human_readable_report() {
        let text = render_summary(&report("bone"), None);
        assert!(text.contains("Stress Analysis Summary for Bone:"));
        assert!(text.contains("  Mean Stress: 55.00 MPa"));
        assert!(text.contains("  Maximum Stress: 100.00 MPa"));
        assert!(text.contains("  95th Percentile: 95.50 MPa"));
        assert!(text.contains("  Yield Ratio: 1.250"));
        assert!(text.contains("  Ultimate Ratio: 0.833"));
        assert!(text.contains("  Nodes Exceeding Yield: 2 (20.00%)"));
        assert!(text.contains("  Peak Stress at Node 9 (1.000, 2.500, -3.000)"));
        assert!(!text.contains("Note:"));
        assert!(!text.contains("Detailed results"));
    }

    #[test]
    fn mentions_fallback_and_output_dir() {
        let text = render_summary(&report("titanuim"), Some(Path::new("out")));
        assert!(text.contains("Summary for Titanuim:"));
        assert!(text.contains("Note: unknown material, using bone limits (80 / 120 MPa)"));
        assert!(text.contains("Detailed results saved to: out"));
    }
}
