//! Basin inversion: valley discovery over the similarity distribution
//!
//! The pairwise similarity distribution of a healthy substrate is bimodal: a
//! low mode of unrelated pairs and a high mode of related ones. The valley
//! between them is the natural discriminating threshold `T_v`. When no valley
//! of sufficient depth exists the substrate is degenerate and downstream
//! stages fall back to `mean + std_dev`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BasinConfig;

/// Why basin inversion could not produce a valley.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// Too few pairwise similarities to histogram.
    InsufficientPairs,
    /// The distribution has (near) zero variance.
    ZeroVariance,
    /// No valley of sufficient depth between two modes.
    NoValley,
}

/// Result of basin inversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BasinOutcome {
    /// A valley of sufficient depth was found.
    Valley {
        /// The discovered threshold `T_v`.
        threshold: f32,
        /// Valley depth in smoothed-count standard deviations.
        depth: f32,
    },
    /// No usable valley; consumers must fall back to coarser heuristics.
    Degenerate {
        /// Why inversion failed.
        reason: DegenerateReason,
    },
}

impl BasinOutcome {
    /// The discovered threshold, if any.
    pub fn threshold(&self) -> Option<f32> {
        match self {
            BasinOutcome::Valley { threshold, .. } => Some(*threshold),
            BasinOutcome::Degenerate { .. } => None,
        }
    }

    /// Whether inversion failed.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, BasinOutcome::Degenerate { .. })
    }
}

/// Run basin inversion over a pairwise similarity distribution.
pub fn invert(similarities: &[f32], config: &BasinConfig) -> BasinOutcome {
    if similarities.len() < config.min_pairs {
        return BasinOutcome::Degenerate {
            reason: DegenerateReason::InsufficientPairs,
        };
    }

    let (mean, std_dev) = mean_std(similarities);
    if std_dev < 1e-6 {
        return BasinOutcome::Degenerate {
            reason: DegenerateReason::ZeroVariance,
        };
    }

    let lo = similarities.iter().cloned().fold(f32::INFINITY, f32::min);
    let hi = similarities.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let span = hi - lo;
    if span < 1e-6 {
        return BasinOutcome::Degenerate {
            reason: DegenerateReason::ZeroVariance,
        };
    }

    let counts = histogram(similarities, lo, span, config.bins);
    let smoothed = smooth(&counts, config.smoothing_window);
    let (_, count_sigma) = mean_std(&smoothed);

    let peaks = local_maxima(&smoothed);
    if peaks.len() < 2 {
        return BasinOutcome::Degenerate {
            reason: DegenerateReason::NoValley,
        };
    }

    // Deepest qualifying valley between any pair of adjacent peaks. A valley
    // qualifies on two conditions: absolute depth in count-sigma units, and
    // relative depth against the lower flanking peak (rejects the shallow
    // ripple a jittered unimodal histogram produces).
    let mut best: Option<(usize, f32)> = None;
    for window in peaks.windows(2) {
        let (left, right) = (window[0], window[1]);
        let valley_bin = (left + 1..right)
            .min_by(|&a, &b| smoothed[a].total_cmp(&smoothed[b]));
        let Some(valley_bin) = valley_bin else { continue };

        let lower_peak = smoothed[left].min(smoothed[right]);
        let depth = lower_peak - smoothed[valley_bin];
        if lower_peak <= 0.0 || count_sigma <= 0.0 {
            continue;
        }
        let depth_sigma = depth / count_sigma;
        let depth_ratio = depth / lower_peak;
        if depth_sigma >= config.min_depth_sigma && depth_ratio >= config.min_depth_ratio {
            if best.map_or(true, |(_, d)| depth_sigma > d) {
                best = Some((valley_bin, depth_sigma));
            }
        }
    }

    match best {
        Some((bin, depth)) => {
            let threshold = lo + span * (bin as f32 + 0.5) / config.bins as f32;
            debug!(threshold, depth, mean, std_dev, "basin valley found");
            BasinOutcome::Valley { threshold, depth }
        }
        None => BasinOutcome::Degenerate {
            reason: DegenerateReason::NoValley,
        },
    }
}

/// Discrimination range `D = P90 - P10` of a similarity distribution.
pub fn discrimination(similarities: &[f32]) -> f32 {
    if similarities.is_empty() {
        return 0.0;
    }
    let mut sorted = similarities.to_vec();
    sorted.sort_by(f32::total_cmp);
    percentile(&sorted, 90.0) - percentile(&sorted, 10.0)
}

/// Mean and standard deviation of a sample.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, variance.sqrt())
}

fn percentile(sorted: &[f32], p: f32) -> f32 {
    let idx = (p / 100.0 * (sorted.len() - 1) as f32).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn histogram(values: &[f32], lo: f32, span: f32, bins: usize) -> Vec<f32> {
    let mut counts = vec![0.0f32; bins];
    for v in values {
        let bin = (((v - lo) / span) * bins as f32) as usize;
        counts[bin.min(bins - 1)] += 1.0;
    }
    counts
}

fn smooth(counts: &[f32], window: usize) -> Vec<f32> {
    if window == 0 {
        return counts.to_vec();
    }
    let n = counts.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(n);
        let sum: f32 = counts[start..end].iter().sum();
        out.push(sum / (end - start) as f32);
    }
    out
}

/// Indices of bins strictly higher than both differing neighbors.
fn local_maxima(smoothed: &[f32]) -> Vec<usize> {
    let n = smoothed.len();
    let mut peaks = Vec::new();
    for i in 0..n {
        let left_lower = (0..i)
            .rev()
            .map(|j| smoothed[j])
            .find(|&v| (v - smoothed[i]).abs() > f32::EPSILON)
            .map_or(true, |v| v < smoothed[i]);
        let right_lower = (i + 1..n)
            .map(|j| smoothed[j])
            .find(|&v| (v - smoothed[i]).abs() > f32::EPSILON)
            .map_or(true, |v| v < smoothed[i]);
        // Plateaus count once, at their first bin.
        let first_of_plateau =
            i == 0 || (smoothed[i - 1] - smoothed[i]).abs() > f32::EPSILON;
        if left_lower && right_lower && first_of_plateau {
            peaks.push(i);
        }
    }
    peaks
}
