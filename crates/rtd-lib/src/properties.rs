use crate::error::AnalysisError;
use crate::extract::nearest_index;
use crate::normalize::{forward_dt, NormalizedCurve, ResponseKind};
use serde::{Deserialize, Serialize};

/// Quantiles reported for every curve.
pub const QUANTILES: [f64; 5] = [0.01, 0.05, 0.50, 0.95, 0.99];

/// Statistical descriptors of one normalized response curve. One row of
/// the aggregated properties table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveProperties {
    /// Event time on the recording clock.
    pub time: f64,
    /// Cross-reference to the per-event curve artifact.
    pub file_name: String,
    /// Integration area of the raw response; RTD curves only.
    pub area: Option<f64>,
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub p1: f64,
    pub p5: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

struct Trimmed {
    response_time: Vec<f64>,
    value: Vec<f64>,
    dt: Vec<f64>,
}

/// Discard the pre-event baseline context and recompute time steps from
/// the sample nearest response time zero.
fn trim_to_event(curve: &NormalizedCurve) -> Result<Trimmed, AnalysisError> {
    let rts = curve.response_times();
    let start = nearest_index(&rts, 0.0).ok_or(AnalysisError::EmptyCurve)?;
    let points = &curve.points[start..];
    if points.is_empty() {
        return Err(AnalysisError::EmptyCurve);
    }
    let times: Vec<f64> = points.iter().map(|p| p.time).collect();
    Ok(Trimmed {
        response_time: points.iter().map(|p| p.response_time).collect(),
        value: points.iter().map(|p| p.value).collect(),
        dt: forward_dt(&times),
    })
}

/// Moments and percentile response times of an RTD curve.
///
/// The mean and variance are moments of the density; percentiles are the
/// response times of the samples whose cumulative density is nearest to
/// each target quantile.
pub fn rtd_properties(
    curve: &NormalizedCurve,
    area: f64,
    file_name: &str,
) -> Result<CurveProperties, AnalysisError> {
    if curve.kind != ResponseKind::Rtd {
        return Err(AnalysisError::InvalidInput(
            "RTD properties require an impulse-normalized curve".into(),
        ));
    }
    let trimmed = trim_to_event(curve)?;

    let mut mean = 0.0;
    let mut second = 0.0;
    for i in 0..trimmed.value.len() {
        let weight = trimmed.value[i] * trimmed.dt[i];
        mean += trimmed.response_time[i] * weight;
        second += trimmed.response_time[i].powi(2) * weight;
    }
    let variance = (second - mean * mean).max(0.0);

    let mut cumulative = Vec::with_capacity(trimmed.value.len());
    let mut acc = 0.0;
    for i in 0..trimmed.value.len() {
        acc += trimmed.value[i] * trimmed.dt[i];
        cumulative.push(acc);
    }
    let percentiles = QUANTILES.map(|q| nearest_cumulative_time(&trimmed, &cumulative, q));

    Ok(build_record(
        curve.event_time,
        file_name,
        Some(area),
        mean,
        variance,
        percentiles,
    ))
}

/// Moments and percentile response times of a step-response curve. The
/// step sense is taken from the curve kind.
///
/// Unlike the RTD case, percentiles use first-crossing semantics: the
/// first sample past the quantile threshold, not the nearest cumulative
/// value. A threshold that is never crossed is an error.
pub fn step_properties(
    curve: &NormalizedCurve,
    file_name: &str,
) -> Result<CurveProperties, AnalysisError> {
    let rising = match curve.kind {
        ResponseKind::StepUp => true,
        ResponseKind::StepDown => false,
        ResponseKind::Rtd => {
            return Err(AnalysisError::InvalidInput(
                "step properties require a step-normalized curve".into(),
            ))
        }
    };
    let trimmed = trim_to_event(curve)?;

    // Distance still to travel toward the final level.
    let remaining: Vec<f64> = trimmed
        .value
        .iter()
        .map(|&v| if rising { 1.0 - v } else { v })
        .collect();

    let mut mean = 0.0;
    let mut moment = 0.0;
    for i in 0..remaining.len() {
        mean += remaining[i] * trimmed.dt[i];
        moment += trimmed.response_time[i] * remaining[i] * trimmed.dt[i];
    }
    let variance = (2.0 * moment - mean * mean).max(0.0);

    let mut percentiles = [0.0; 5];
    for (slot, q) in percentiles.iter_mut().zip(QUANTILES) {
        *slot = first_crossing_time(&trimmed, q, rising)?;
    }

    Ok(build_record(
        curve.event_time,
        file_name,
        None,
        mean,
        variance,
        percentiles,
    ))
}

/// Response time of the sample whose cumulative density is closest to
/// `q`, earliest sample on ties.
fn nearest_cumulative_time(trimmed: &Trimmed, cumulative: &[f64], q: f64) -> f64 {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, &c) in cumulative.iter().enumerate() {
        let diff = (c - q).abs();
        if diff < best_diff {
            best_diff = diff;
            best = i;
        }
    }
    trimmed.response_time[best]
}

/// Response time of the first sample past the quantile threshold.
fn first_crossing_time(trimmed: &Trimmed, q: f64, rising: bool) -> Result<f64, AnalysisError> {
    let crossed = |v: f64| if rising { v > q } else { v < 1.0 - q };
    trimmed
        .value
        .iter()
        .position(|&v| crossed(v))
        .map(|i| trimmed.response_time[i])
        .ok_or(AnalysisError::PercentileNotFound { quantile: q })
}

fn build_record(
    time: f64,
    file_name: &str,
    area: Option<f64>,
    mean: f64,
    variance: f64,
    percentiles: [f64; 5],
) -> CurveProperties {
    CurveProperties {
        time,
        file_name: file_name.to_string(),
        area,
        mean,
        variance,
        std: variance.sqrt(),
        p1: percentiles[0],
        p5: percentiles[1],
        p50: percentiles[2],
        p95: percentiles[3],
        p99: percentiles[4],
    }
}
