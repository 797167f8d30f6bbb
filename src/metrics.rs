//! Descriptive statistics over score columns and channel counts.

use std::collections::HashMap;

/// Summary of one channel's per-channel z-scores.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelStats {
    /// Channel label.
    pub channel: String,
    /// Mean value.
    pub mean: f64,
    /// Median value.
    pub median: f64,
    /// Sample standard deviation; `None` below two observations.
    pub std: Option<f64>,
    /// Number of values.
    pub count: usize,
}

/// Per-label document count with its share of the corpus.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelShare {
    /// Channel label.
    pub channel: String,
    /// Documents in the channel.
    pub count: usize,
    /// Share of all documents, in percent.
    pub share: f64,
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median with the midpoint of the two central values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile_linear(values, 0.5)
}

/// Population (`ddof = 0`) standard deviation; `None` for an empty slice.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Sample (`ddof = 1`) standard deviation; `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let var =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Quantile with linear interpolation between closest ranks.
///
/// Position is `q * (n - 1)` over the sorted values; NaNs are ignored.
pub fn quantile_linear(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Standardize `values` as `(x - mean) / std` with population std.
///
/// A zero (or undefined) std is replaced by 1.0, so constant input maps to zeros.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let Some(mean) = mean(values) else {
        return Vec::new();
    };
    let std = population_std(values)
        .filter(|std| *std > 0.0 && std.is_finite())
        .unwrap_or(1.0);
    values.iter().map(|v| (v - mean) / std).collect()
}

/// Stats for one channel's values.
pub fn channel_stats(channel: &str, values: &[f64]) -> ChannelStats {
    ChannelStats {
        channel: channel.to_string(),
        mean: mean(values).unwrap_or(f64::NAN),
        median: median(values).unwrap_or(f64::NAN),
        std: sample_std(values),
        count: values.len(),
    }
}

/// Count labels, largest first; ties keep first-seen order.
pub fn value_counts<'a, I>(labels: I) -> Vec<ChannelShare>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        let count = counts.entry(label).or_insert(0);
        if *count == 0 {
            order.push(label);
        }
        *count += 1;
    }
    let total: usize = counts.values().sum();
    let mut shares: Vec<ChannelShare> = order
        .into_iter()
        .map(|label| {
            let count = counts.get(label).copied().unwrap_or(0);
            ChannelShare {
                channel: label.to_string(),
                count,
                share: if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                },
            }
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}
