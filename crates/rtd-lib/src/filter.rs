use crate::series::Series;
use log::debug;

/// Channels the outlier pass watches: the color channels plus the derived
/// lightness/chroma channels. X, Y, Z are carried through untouched.
const MONITORED_CHANNELS: [&str; 6] = ["R", "G", "B", "L", "a", "b"];

/// Consistency factor mapping the MAD to a standard deviation under
/// normality.
const MAD_SCALE: f64 = 1.4826;

/// Hampel-style outlier removal over the monitored channels.
///
/// For each sample and channel, the local median and MAD-based scale are
/// computed over `half_window` samples on each side (truncated at the
/// series boundaries). A sample flagged in any monitored channel is
/// dropped. Returns the cleaned series and the number of removed samples.
pub fn hampel_filter(series: &Series, half_window: usize, sigma: f64) -> (Series, usize) {
    let n = series.len();
    let mut flagged = vec![false; n];

    for name in MONITORED_CHANNELS {
        let values: Vec<f64> = series
            .samples
            .iter()
            .map(|s| s.channel(name).unwrap_or(f64::NAN))
            .collect();
        if !values.iter().any(|v| v.is_finite()) {
            continue;
        }
        for i in 0..n {
            let x = values[i];
            // NaN readings are excluded from the local statistics and are
            // not outliers by themselves.
            if !x.is_finite() {
                continue;
            }
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window).min(n - 1);
            let neighborhood = &values[lo..=hi];
            let Some(med) = median(neighborhood) else {
                continue;
            };
            let Some(scale) = robust_scale(neighborhood, med) else {
                continue;
            };
            let deviation = (x - med).abs();
            if deviation > sigma * scale {
                debug!(
                    "hampel: {} outlier at sample {} (value {:.4}, median {:.4}, threshold {:.4})",
                    name,
                    i,
                    x,
                    med,
                    sigma * scale
                );
                flagged[i] = true;
            }
        }
    }

    let samples = series
        .samples
        .iter()
        .zip(&flagged)
        .filter(|(_, &bad)| !bad)
        .map(|(s, _)| s.clone())
        .collect::<Vec<_>>();
    let removed = n - samples.len();
    (Series { samples }, removed)
}

/// Median of the finite values in `data`, `None` when nothing is finite.
pub fn median(data: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) * 0.5)
    } else {
        Some(finite[mid])
    }
}

/// MAD of the finite values around `center`, scaled to approximate a
/// standard deviation.
fn robust_scale(data: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = data
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .map(|v| (v - center).abs())
        .collect();
    median(&deviations).map(|m| m * MAD_SCALE)
}

/// Trailing moving average over the concentration column, NaN-omitted,
/// window shrunk at the leading edge. `window < 2` is a no-op.
pub fn smooth_concentration(series: &Series, window: usize) -> Series {
    if window < 2 || !series.has_concentration() {
        return series.clone();
    }
    let mut samples = series.samples.clone();
    let mut recent: std::collections::VecDeque<f64> = std::collections::VecDeque::new();
    let mut sum = 0.0;
    let mut count = 0usize;
    for sample in samples.iter_mut() {
        let value = sample.concentration.unwrap_or(f64::NAN);
        recent.push_back(value);
        if value.is_finite() {
            sum += value;
            count += 1;
        }
        if recent.len() > window {
            if let Some(old) = recent.pop_front() {
                if old.is_finite() {
                    sum -= old;
                    count -= 1;
                }
            }
        }
        if sample.concentration.is_some() {
            sample.concentration = Some(if count > 0 { sum / count as f64 } else { f64::NAN });
        }
    }
    Series { samples }
}
