//! Per-channel standardization and dovish/neutral/hawkish labeling.

use std::collections::BTreeMap;

use crate::config::LabelPolicy;
use crate::data::ToneLabel;
use crate::metrics::{quantile_linear, standardize};

/// Row indices per group key, keys sorted.
pub fn group_indices<'a, I>(keys: I) -> BTreeMap<&'a str, Vec<usize>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, key) in keys.into_iter().enumerate() {
        groups.entry(key).or_default().push(idx);
    }
    groups
}

fn gather(values: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&idx| values[idx]).collect()
}

/// Standardize `values` within each group (population std, zero std -> 1.0).
pub fn standardize_within<'a>(groups: &BTreeMap<&'a str, Vec<usize>>, values: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    for indices in groups.values() {
        let z = standardize(&gather(values, indices));
        for (&idx, value) in indices.iter().zip(z) {
            out[idx] = value;
        }
    }
    out
}

/// `z > t` is hawkish, `z < -t` is dovish, otherwise neutral.
pub fn threshold_label(z: f64, threshold: f64) -> ToneLabel {
    if z > threshold {
        ToneLabel::Hawkish
    } else if z < -threshold {
        ToneLabel::Dovish
    } else {
        ToneLabel::Neutral
    }
}

/// `z <= low` is dovish, then `z >= high` is hawkish, otherwise neutral.
pub fn quantile_label(z: f64, low_cut: f64, high_cut: f64) -> ToneLabel {
    if z <= low_cut {
        ToneLabel::Dovish
    } else if z >= high_cut {
        ToneLabel::Hawkish
    } else {
        ToneLabel::Neutral
    }
}

/// Label per-channel z-scores with `policy`; quantiles are taken per group.
pub fn label_within<'a>(
    groups: &BTreeMap<&'a str, Vec<usize>>,
    z: &[f64],
    policy: LabelPolicy,
) -> Vec<ToneLabel> {
    let mut labels = vec![ToneLabel::Neutral; z.len()];
    for indices in groups.values() {
        match policy {
            LabelPolicy::FixedThreshold { threshold } => {
                for &idx in indices {
                    labels[idx] = threshold_label(z[idx], threshold);
                }
            }
            LabelPolicy::Quantile { low, high } => {
                let group = gather(z, indices);
                let (Some(low_cut), Some(high_cut)) =
                    (quantile_linear(&group, low), quantile_linear(&group, high))
                else {
                    continue;
                };
                for &idx in indices {
                    labels[idx] = quantile_label(z[idx], low_cut, high_cut);
                }
            }
        }
    }
    labels
}
