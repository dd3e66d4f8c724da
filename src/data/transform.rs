use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Display-time price scale heuristic
// ---------------------------------------------------------------------------

/// Guesses whether a price column holds log values and, if so, produces a
/// natural-unit copy for charts.
///
/// This is a heuristic, not a classifier: a column whose maximum is below
/// `threshold` is assumed to be log-scaled. An empty column, or a genuine
/// natural-unit column of small prices, is exponentiated as well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogScaleHeuristic {
    /// Columns whose maximum is below this are treated as log-scaled.
    pub threshold: f64,
    /// Values are clipped to `[-clip_bound, clip_bound]` before `exp`.
    /// Must be finite and positive.
    pub clip_bound: f64,
}

impl Default for LogScaleHeuristic {
    fn default() -> Self {
        Self {
            threshold: 50.0,
            clip_bound: 20.0,
        }
    }
}

/// Which scale the display values ended up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceScale {
    /// Column looked like natural units; values untouched.
    Natural,
    /// Column looked log-scaled; values were clipped and exponentiated.
    Exponentiated,
    /// Column looked log-scaled but `exp` overflowed; values untouched.
    OverflowFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPrices {
    pub values: Vec<f64>,
    pub scale: PriceScale,
}

impl LogScaleHeuristic {
    /// NaNs are ignored; an empty column has maximum `-inf`.
    pub fn looks_log_scaled(&self, values: &[f64]) -> bool {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        max < self.threshold
    }

    /// Return a natural-unit copy of `values`. The input is never modified.
    pub fn natural_units(&self, values: &[f64]) -> DisplayPrices {
        if !self.looks_log_scaled(values) {
            return DisplayPrices {
                values: values.to_vec(),
                scale: PriceScale::Natural,
            };
        }

        let bound = self.clip_bound;
        let exponentiated: Vec<f64> = values
            .iter()
            .map(|v| v.clamp(-bound, bound).exp())
            .collect();

        if exponentiated.iter().any(|v| v.is_infinite()) {
            log::warn!("exp overflowed with clip bound {bound}; showing prices as stored");
            return DisplayPrices {
                values: values.to_vec(),
                scale: PriceScale::OverflowFallback,
            };
        }

        DisplayPrices {
            values: exponentiated,
            scale: PriceScale::Exponentiated,
        }
    }
}
