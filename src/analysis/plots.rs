use std::path::Path;

use chrono::NaiveDate;
use plotters::prelude::*;

use crate::errors::PipelineError;
use crate::transport::fs::ensure_parent_dir;

const PLOT_SIZE: (u32, u32) = (1000, 600);

fn plot_err<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::Plot(err.to_string())
}

/// One histogram bin: `[lo, hi)` and its count (the last bin is closed).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramBin {
    /// Inclusive lower edge.
    pub lo: f64,
    /// Upper edge.
    pub hi: f64,
    /// Values falling in the bin.
    pub count: usize,
}

/// Equal-width bins over the value range; a constant sample spans `v +/- 0.5`.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|idx| HistogramBin {
            lo: lo + width * idx as f64,
            hi: if idx + 1 == bins {
                hi
            } else {
                lo + width * (idx + 1) as f64
            },
            count: 0,
        })
        .collect();
    for value in finite {
        let idx = (((value - lo) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Histogram of per-channel z-scores.
pub fn plot_histogram(path: &Path, values: &[f64], bins: usize) -> Result<(), PipelineError> {
    let bins = histogram_bins(values, bins);
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        return Err(PipelineError::Plot("no finite values to plot".to_string()));
    };
    let max_count = bins.iter().map(|bin| bin.count).max().unwrap_or(0) as u32;

    ensure_parent_dir(path)?;
    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Per-channel z distribution", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(first.lo..last.hi, 0u32..max_count + 1)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_desc("z (per channel)")
        .y_desc("Count")
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(bins.iter().map(|bin| {
            Rectangle::new([(bin.lo, 0), (bin.hi, bin.count as u32)], BLUE.mix(0.6).filled())
        }))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Vertical boxplot per channel, channels in the given order.
pub fn plot_by_channel(path: &Path, groups: &[(String, Vec<f64>)]) -> Result<(), PipelineError> {
    let groups: Vec<&(String, Vec<f64>)> = groups.iter().filter(|(_, values)| !values.is_empty()).collect();
    if groups.is_empty() {
        return Err(PipelineError::Plot("no channel values to plot".to_string()));
    }
    let labels: Vec<String> = groups.iter().map(|(channel, _)| channel.clone()).collect();
    let (lo, hi) = groups
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((hi - lo) * 0.05).max(0.5);

    ensure_parent_dir(path)?;
    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Per-channel z by channel", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(labels[..].into_segmented(), (lo - pad) as f32..(hi + pad) as f32)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .y_desc("z (per channel)")
        .draw()
        .map_err(plot_err)?;
    chart
        .draw_series(groups.iter().map(|(channel, values)| {
            Boxplot::new_vertical(SegmentValue::CenterOf(channel), &Quartiles::new(&values[..]))
        }))
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}

/// Contiguous runs of non-empty months as `(month index, value)` points.
pub fn month_runs(series: &[(NaiveDate, Option<f64>)]) -> Vec<Vec<(i32, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (idx, (_, value)) in series.iter().enumerate() {
        match value {
            Some(value) => current.push((idx as i32, *value)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Line chart of the monthly mean; gap months break the line.
pub fn plot_monthly(path: &Path, series: &[(NaiveDate, Option<f64>)]) -> Result<(), PipelineError> {
    let runs = month_runs(series);
    if runs.is_empty() {
        return Err(PipelineError::Plot("no monthly values to plot".to_string()));
    }
    let (lo, hi) = runs
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| (lo.min(*v), hi.max(*v)));
    let pad = ((hi - lo) * 0.1).max(0.1);
    let months: Vec<String> = series.iter().map(|(month, _)| month.format("%Y-%m").to_string()).collect();

    ensure_parent_dir(path)?;
    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Monthly mean per-channel z", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0i32..series.len() as i32, (lo - pad)..(hi + pad))
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_labels(12)
        .x_label_formatter(&|idx| months.get(*idx as usize).cloned().unwrap_or_default())
        .y_desc("mean z")
        .draw()
        .map_err(plot_err)?;
    for run in runs {
        chart
            .draw_series(LineSeries::new(run, &BLUE))
            .map_err(plot_err)?;
    }
    root.present().map_err(plot_err)?;
    Ok(())
}
