use std::collections::HashMap;
use std::f64::consts::PI;

use super::model::{BRAND, Dataset};
use super::transform::{LogScaleHeuristic, PriceScale};

/// Points sampled along the density curve.
const DENSITY_POINTS: usize = 200;

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Equal-width bins over the finite values of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// `None` when there are no finite values or `bins` is zero.
    ///
    /// A constant column is binned over `[v - 0.5, v + 0.5]`. The last bin is
    /// closed on the right so the maximum is counted.
    pub fn from_values(values: &[f64], bins: usize) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return None;
        }
        let (mut lo, mut hi) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let bin_width = (hi - lo) / bins as f64;

        let mut counts = vec![0; bins];
        for v in finite {
            let idx = (((v - lo) / bin_width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(Self {
            start: lo,
            bin_width,
            counts,
        })
    }

    /// `(bin centre, count)` pairs.
    pub fn centers(&self) -> impl Iterator<Item = (f64, usize)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (self.start + (i as f64 + 0.5) * self.bin_width, c))
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// Kernel density estimate
// ---------------------------------------------------------------------------

/// Gaussian KDE with Scott's rule bandwidth, evaluated on `points` evenly
/// spaced positions reaching three bandwidths past the data, multiplied by
/// `scale` (use `n * bin_width` to overlay a count histogram).
///
/// Empty when fewer than two finite values exist or they are all equal.
pub fn kde_curve(values: &[f64], points: usize, scale: f64) -> Vec<[f64; 2]> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = finite.len();
    if n < 2 || points < 2 {
        return Vec::new();
    }
    let mean = finite.iter().sum::<f64>() / n as f64;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return Vec::new();
    }
    let bandwidth = std_dev * (n as f64).powf(-0.2);

    let lo = finite.iter().copied().fold(f64::INFINITY, f64::min) - 3.0 * bandwidth;
    let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 3.0 * bandwidth;
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * PI).sqrt());

    (0..points)
        .map(|i| {
            let x = lo + i as f64 * step;
            let density: f64 = finite
                .iter()
                .map(|xi| (-0.5 * ((x - xi) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            [x, density * scale]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Group means
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMean {
    pub label: String,
    pub mean: f64,
    pub count: usize,
}

/// Mean of `prices` per distinct value of `field`, highest first, at most
/// `top_n` groups. `prices` is parallel to the dataset rows; non-finite prices
/// are skipped. Ties keep first-seen order.
pub fn mean_by_group(
    dataset: &Dataset,
    field: &str,
    prices: &[f64],
    top_n: usize,
) -> Vec<GroupMean> {
    let mut order: Vec<(String, f64, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (listing, &price) in dataset.listings().iter().zip(prices) {
        if !price.is_finite() {
            continue;
        }
        let Some(value) = listing.record.get(field) else {
            continue;
        };
        let label = value.to_string();
        let slot = *index.entry(label.clone()).or_insert_with(|| {
            order.push((label, 0.0, 0));
            order.len() - 1
        });
        order[slot].1 += price;
        order[slot].2 += 1;
    }

    let mut groups: Vec<GroupMean> = order
        .into_iter()
        .map(|(label, sum, count)| GroupMean {
            label,
            mean: sum / count as f64,
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    groups.truncate(top_n);
    groups
}

// ---------------------------------------------------------------------------
// Overview: everything the Data Insights view draws
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PriceOverview {
    pub histogram: Option<Histogram>,
    pub density: Vec<[f64; 2]>,
    pub histogram_scale: PriceScale,
    pub by_brand: Vec<GroupMean>,
    pub brand_scale: PriceScale,
}

impl PriceOverview {
    /// Each chart derives its own natural-unit copy of the Price column.
    pub fn compute(
        dataset: &Dataset,
        heuristic: &LogScaleHeuristic,
        bins: usize,
        top_groups: usize,
    ) -> Self {
        let distribution = heuristic.natural_units(&dataset.prices());
        let histogram = Histogram::from_values(&distribution.values, bins);
        let density = histogram.as_ref().map_or_else(Vec::new, |h| {
            kde_curve(
                &distribution.values,
                DENSITY_POINTS,
                h.total() as f64 * h.bin_width,
            )
        });

        let brand_prices = heuristic.natural_units(&dataset.prices());
        let by_brand = mean_by_group(dataset, BRAND, &brand_prices.values, top_groups);

        Self {
            histogram,
            density,
            histogram_scale: distribution.scale,
            by_brand,
            brand_scale: brand_prices.scale,
        }
    }
}
