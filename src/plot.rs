//! Histogram of a stress sample, rendered as a standalone SVG document.

use std::fmt::Write;

use crate::config::HistogramConfig;

/// Equal-width bin counts over `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub lower: f64,
    pub upper: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bins `samples` into `bins` equal-width bins spanning the sample range.
    ///
    /// The last bin is closed on the right, so the counts always add up to the
    /// number of samples. A sample without spread is centred in a bin of width 1.
    pub fn from_samples(samples: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (lower, upper) = if samples.is_empty() {
            (0.0, 1.0)
        } else if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let width = (upper - lower) / bins as f64;
        let mut counts = vec![0; bins];
        for &value in samples {
            let idx = (((value - lower) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Histogram { lower, upper, counts }
    }

    pub fn bin_width(&self) -> f64 {
        (self.upper - self.lower) / self.counts.len() as f64
    }
}

/// Vertical reference line drawn across the histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub value: f64,
    pub label: String,
    /// CSS color.
    pub color: &'static str,
    /// SVG `stroke-dasharray`.
    pub dash: &'static str,
}

impl Marker {
    pub fn dashed(value: f64, label: impl Into<String>, color: &'static str) -> Self {
        Marker {
            value,
            label: label.into(),
            color,
            dash: "8 4",
        }
    }

    pub fn dotted(value: f64, label: impl Into<String>, color: &'static str) -> Self {
        Marker {
            value,
            label: label.into(),
            color,
            dash: "2 3",
        }
    }
}

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 55.0;
const BAR_COLOR: &str = "steelblue";

/// Step of roughly `span / target` rounded to 1, 2 or 5 times a power of ten.
fn nice_step(span: f64, target: usize) -> f64 {
    if !(span.is_finite() && span > 0.0) {
        return 1.0;
    }
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = match raw / magnitude {
        r if r <= 1.0 => 1.0,
        r if r <= 2.0 => 2.0,
        r if r <= 5.0 => 5.0,
        _ => 10.0,
    };
    step * magnitude
}

fn ticks(lower: f64, upper: f64, target: usize) -> Vec<f64> {
    let step = nice_step(upper - lower, target);
    let first = (lower / step).ceil() as i64;
    let last = (upper / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

/// Formats a tick value with as many decimals as the tick step needs.
fn tick_label(value: f64, step: f64) -> String {
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    format!("{value:.decimals$}")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders `histogram` with `markers` and a legend.
///
/// The horizontal axis covers the histogram and every marker with a 5% margin
/// on each side, so strength limits outside the sample range stay visible.
pub fn render_histogram_svg(
    histogram: &Histogram,
    markers: &[Marker],
    title: &str,
    settings: &HistogramConfig,
) -> String {
    let width = f64::from(settings.width);
    let height = f64::from(settings.height);
    let plot_w = width - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = height - MARGIN_TOP - MARGIN_BOTTOM;

    let (mut x_lo, mut x_hi) = markers
        .iter()
        .map(|m| m.value)
        .filter(|v| v.is_finite())
        .fold((histogram.lower, histogram.upper), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = (x_hi - x_lo) * 0.05;
    x_lo -= pad;
    x_hi += pad;
    let y_hi = histogram.counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.05;

    let sx = |v: f64| MARGIN_LEFT + (v - x_lo) / (x_hi - x_lo) * plot_w;
    let sy = |c: f64| MARGIN_TOP + plot_h - c / y_hi * plot_h;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = settings.width,
        h = settings.height
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    let _ = writeln!(
        svg,
        r#"  <text x="{:.1}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
        width / 2.0,
        escape(title)
    );

    // Grid and tick labels
    svg.push_str("  <g stroke=\"#000\" stroke-opacity=\"0.1\">\n");
    let x_ticks = ticks(x_lo, x_hi, 8);
    let y_ticks = ticks(0.0, y_hi, 6);
    let x_step = nice_step(x_hi - x_lo, 8);
    let y_step = nice_step(y_hi, 6);
    for &t in &x_ticks {
        let _ = writeln!(
            svg,
            r#"    <line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}"/>"#,
            MARGIN_TOP,
            MARGIN_TOP + plot_h,
            x = sx(t)
        );
    }
    for &t in &y_ticks {
        let _ = writeln!(
            svg,
            r#"    <line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}"/>"#,
            MARGIN_LEFT,
            MARGIN_LEFT + plot_w,
            y = sy(t)
        );
    }
    svg.push_str("  </g>\n  <g font-size=\"11\" fill=\"#333\">\n");
    for &t in &x_ticks {
        let _ = writeln!(
            svg,
            r#"    <text x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
            sx(t),
            MARGIN_TOP + plot_h + 16.0,
            tick_label(t, x_step)
        );
    }
    for &t in &y_ticks {
        let _ = writeln!(
            svg,
            r#"    <text x="{:.2}" y="{:.2}" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 6.0,
            sy(t) + 4.0,
            tick_label(t, y_step)
        );
    }
    svg.push_str("  </g>\n");

    // Bars
    let _ = writeln!(svg, r#"  <g fill="{BAR_COLOR}" fill-opacity="0.7">"#);
    let bin_width = histogram.bin_width();
    for (i, &count) in histogram.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let left = sx(histogram.lower + i as f64 * bin_width);
        let right = sx(histogram.lower + (i + 1) as f64 * bin_width);
        let top = sy(count as f64);
        let _ = writeln!(
            svg,
            r#"    <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}"/>"#,
            left,
            top,
            (right - left).max(0.5),
            MARGIN_TOP + plot_h - top
        );
    }
    svg.push_str("  </g>\n");

    for marker in markers.iter().filter(|m| m.value.is_finite()) {
        let _ = writeln!(
            svg,
            r#"  <line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{}" stroke-width="1.5" stroke-dasharray="{}"/>"#,
            MARGIN_TOP,
            MARGIN_TOP + plot_h,
            marker.color,
            marker.dash,
            x = sx(marker.value)
        );
    }

    // Axes and labels
    let _ = writeln!(
        svg,
        r##"  <rect x="{MARGIN_LEFT:.2}" y="{MARGIN_TOP:.2}" width="{plot_w:.2}" height="{plot_h:.2}" fill="none" stroke="#000"/>"##
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{:.2}" y="{:.2}" text-anchor="middle" font-size="13">von Mises Stress (MPa)</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        height - 14.0
    );
    let _ = writeln!(
        svg,
        r#"  <text transform="translate(18 {:.2}) rotate(-90)" text-anchor="middle" font-size="13">Frequency</text>"#,
        MARGIN_TOP + plot_h / 2.0
    );

    // Legend, top right corner of the plot area
    let legend_x = MARGIN_LEFT + plot_w - 250.0;
    for (i, marker) in markers.iter().enumerate() {
        let y = MARGIN_TOP + 18.0 + i as f64 * 18.0;
        let _ = writeln!(
            svg,
            r#"  <line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{}" stroke-width="1.5" stroke-dasharray="{}"/>"#,
            legend_x,
            legend_x + 28.0,
            marker.color,
            marker.dash
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{:.2}" y="{:.2}" font-size="12">{}</text>"#,
            legend_x + 34.0,
            y + 4.0,
            escape(&marker.label)
        );
    }

    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_counts_cover_every_sample() {
        let samples: Vec<f64> = (1..=10).map(|i| f64::from(i) * 10.0).collect();
        let histogram = Histogram::from_samples(&samples, 3);
        assert_eq!(histogram.counts, vec![3, 3, 4]);
        assert_eq!(histogram.counts.iter().sum::<usize>(), samples.len());
        assert_relative_eq!(histogram.bin_width(), 30.0);
    }

    #[test]
    fn test_constant_sample_gets_unit_range() {
        let histogram = Histogram::from_samples(&[42.0; 5], 50);
        assert_relative_eq!(histogram.lower, 41.5);
        assert_relative_eq!(histogram.upper, 42.5);
        assert_eq!(histogram.counts.iter().sum::<usize>(), 5);
        assert_eq!(histogram.counts.iter().filter(|&&c| c > 0).count(), 1);
    }

    #[test]
    fn test_nice_steps() {
        assert_relative_eq!(nice_step(100.0, 10), 10.0);
        assert_relative_eq!(nice_step(130.0, 8), 20.0);
        assert_relative_eq!(nice_step(0.9, 6), 0.2);
        assert_eq!(ticks(0.0, 100.0, 5), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        assert_eq!(tick_label(0.30000000000000004, 0.1), "0.3");
        assert_eq!(tick_label(250.0, 50.0), "250");
    }

    #[test]
    fn test_svg_has_bars_markers_and_legend() {
        let histogram = Histogram::from_samples(&[10.0, 20.0, 30.0], 3);
        let markers = vec![
            Marker::dashed(80.0, "Yield Stress (80 MPa)", "red"),
            Marker::dotted(29.0, "95th Percentile (29.00 MPa)", "green"),
        ];
        let svg = render_histogram_svg(
            &histogram,
            &markers,
            "Stress Distribution - Bone & Plate",
            &HistogramConfig::default(),
        );

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Stress Distribution - Bone &amp; Plate"));
        assert!(svg.contains("Yield Stress (80 MPa)"));
        assert!(svg.contains("95th Percentile (29.00 MPa)"));
        assert!(svg.contains("von Mises Stress (MPa)"));
        assert!(svg.contains("Frequency"));
        assert_eq!(svg.matches("stroke-dasharray=\"8 4\"").count(), 2, "line and legend entry");
        assert_eq!(svg.matches("<rect x=").count(), 4, "three bars and the frame");
    }
}
