//! Summary statistics and binning over sampled values.

use siting_analysis_models::Histogram;

/// Number of bins in every distribution chart.
pub const HISTOGRAM_BINS: usize = 10;

/// Minimum, maximum and mean of a set of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarises the finite values in `values`, or `None` when there are
/// none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(values: &[f64]) -> Option<Summary> {
    let mut count = 0_usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for &v in values.iter().filter(|v| v.is_finite()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }

    (count > 0).then(|| Summary {
        min,
        max,
        mean: sum / count as f64,
    })
}

/// Axis captions for a histogram.
#[derive(Debug, Clone, Copy)]
pub struct HistogramAxes<'a> {
    pub title: &'a str,
    pub x_title: &'a str,
    pub y_title: &'a str,
}

/// Bins `values` into [`HISTOGRAM_BINS`] equal-width bins between their
/// min and max.
///
/// `bin_label` names the bin spanning `[a, b)`. When every value is the
/// same a single bin is produced and labelled with `flat_label(min)`.
/// The counts always sum to the number of finite values.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn histogram(
    values: &[f64],
    axes: HistogramAxes<'_>,
    bin_label: impl Fn(f64, f64) -> String,
    flat_label: impl Fn(f64) -> String,
) -> Option<Histogram> {
    let Summary { min, max, .. } = summarize(values)?;
    let finite = values.iter().copied().filter(|v| v.is_finite());

    let (labels, counts) = if max <= min {
        (vec![flat_label(min)], vec![finite.count() as u64])
    } else {
        let step = (max - min) / HISTOGRAM_BINS as f64;
        let mut counts = vec![0_u64; HISTOGRAM_BINS];
        for v in finite {
            let index = (((v - min) / step).floor().max(0.0) as usize).min(HISTOGRAM_BINS - 1);
            counts[index] += 1;
        }
        let labels = (0..HISTOGRAM_BINS)
            .map(|i| {
                let a = (i as f64).mul_add(step, min);
                bin_label(a, a + step)
            })
            .collect();
        (labels, counts)
    };

    Some(Histogram {
        title: axes.title.to_string(),
        x_title: axes.x_title.to_string(),
        y_title: axes.y_title.to_string(),
        labels,
        counts,
        min,
        max,
    })
}

/// A named slope band in degrees, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlopeClass {
    pub name: &'static str,
    pub min_deg: f64,
    pub max_deg: f64,
}

/// Slope bands reported for polygons.
pub const SLOPE_CLASSES: [SlopeClass; 4] = [
    SlopeClass {
        name: "0–5° (Gentle)",
        min_deg: 0.0,
        max_deg: 5.0,
    },
    SlopeClass {
        name: "5–15° (Moderate)",
        min_deg: 5.0,
        max_deg: 15.0,
    },
    SlopeClass {
        name: "15–30° (Steep)",
        min_deg: 15.0,
        max_deg: 30.0,
    },
    SlopeClass {
        name: ">30° (Very steep)",
        min_deg: 30.0,
        max_deg: f64::INFINITY,
    },
];

/// Percentage of `slopes_deg` falling in each of [`SLOPE_CLASSES`].
///
/// Negative and non-finite values are ignored; the shares sum to 100
/// whenever at least one slope is counted.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn slope_class_shares(slopes_deg: &[f64]) -> Vec<(&'static str, f64)> {
    let valid: Vec<f64> = slopes_deg
        .iter()
        .copied()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .collect();
    if valid.is_empty() {
        return vec![];
    }

    SLOPE_CLASSES
        .iter()
        .map(|class| {
            let n = valid
                .iter()
                .filter(|s| **s >= class.min_deg && **s < class.max_deg)
                .count();
            (class.name, n as f64 / valid.len() as f64 * 100.0)
        })
        .collect()
}
