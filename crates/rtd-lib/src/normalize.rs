use crate::error::AnalysisError;
use crate::extract::{extract, nearest_index, Subset};
use crate::series::{Series, Window};
use serde::{Deserialize, Serialize};

/// Which baseline/scale policy produced a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Rtd,
    StepUp,
    StepDown,
}

/// One row of a normalized response curve. Channel triples absent from the
/// source series are NaN-filled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurvePoint {
    pub time: f64,
    pub response_time: f64,
    pub value: f64,
    pub rgb: [f64; 3],
    pub xyz: [f64; 3],
    pub lab: [f64; 3],
}

/// Baseline-corrected, normalized response curve for one event.
///
/// For `ResponseKind::Rtd` the value column is a probability density over
/// response time; for the step kinds it is a dimensionless level near
/// [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedCurve {
    pub kind: ResponseKind,
    pub event_time: f64,
    pub points: Vec<CurvePoint>,
}

impl NormalizedCurve {
    pub fn response_times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.response_time).collect()
    }
}

/// Forward-difference time steps in seconds, with `dt[0] = 0` (no
/// look-back before the first sample).
pub fn forward_dt(times: &[f64]) -> Vec<f64> {
    let mut dt = vec![0.0; times.len()];
    for i in 1..times.len() {
        dt[i] = times[i] - times[i - 1];
    }
    dt
}

/// Impulse/RTD normalization.
///
/// The baseline level is the average of the mean concentrations over the
/// baseline and tail windows. The baseline-corrected signal is integrated
/// from the sample nearest response time zero through the end of the tail
/// window; that area divides the whole curve, so the result integrates to
/// one over the integration range. A zero area yields an all-zero curve
/// rather than a division by zero.
pub fn normalize_rtd(
    event_time: f64,
    series: &Series,
    window: Window,
    baseline_window: Window,
    tail_window: Window,
) -> Result<(NormalizedCurve, f64), AnalysisError> {
    let subset = extract(event_time, series, window)?;
    let conc = concentration_column(&subset)?;

    let base = window_mean(&subset, baseline_window, &conc)?;
    let tail = window_mean(&subset, tail_window, &conc)?;
    let baseline = (base + tail) / 2.0;
    let corrected: Vec<f64> = conc.iter().map(|c| c - baseline).collect();

    let dt = forward_dt(&subset_times(&subset));
    let start = nearest_index(&subset.response_time, 0.0).expect("subset is non-empty");
    let stop = nearest_index(&subset.response_time, tail_window.end).expect("subset is non-empty");
    let area = if start <= stop {
        (start..=stop).map(|i| corrected[i] * dt[i]).sum::<f64>()
    } else {
        0.0
    };

    let values: Vec<f64> = if area == 0.0 {
        vec![0.0; corrected.len()]
    } else {
        corrected.iter().map(|c| c / area).collect()
    };
    Ok((build_curve(ResponseKind::Rtd, &subset, values), area))
}

/// Step-up normalization: pre-step level maps to zero, post-step plateau
/// to about one.
pub fn normalize_step_up(
    event_time: f64,
    series: &Series,
    window: Window,
    baseline_window: Window,
    tail_window: Window,
) -> Result<NormalizedCurve, AnalysisError> {
    let subset = extract(event_time, series, window)?;
    let conc = concentration_column(&subset)?;
    let base = window_mean(&subset, baseline_window, &conc)?;
    let tail = window_mean(&subset, tail_window, &conc)?;
    let values: Vec<f64> = conc.iter().map(|c| (c - base) / (tail - base)).collect();
    Ok(build_curve(ResponseKind::StepUp, &subset, values))
}

/// Step-down normalization: mirror image of the step-up policy, the
/// baseline and tail windows swap roles as zero and scale references.
pub fn normalize_step_down(
    event_time: f64,
    series: &Series,
    window: Window,
    baseline_window: Window,
    tail_window: Window,
) -> Result<NormalizedCurve, AnalysisError> {
    let subset = extract(event_time, series, window)?;
    let conc = concentration_column(&subset)?;
    let base = window_mean(&subset, baseline_window, &conc)?;
    let tail = window_mean(&subset, tail_window, &conc)?;
    let values: Vec<f64> = conc.iter().map(|c| (c - tail) / (base - tail)).collect();
    Ok(build_curve(ResponseKind::StepDown, &subset, values))
}

fn subset_times(subset: &Subset) -> Vec<f64> {
    subset.samples.iter().map(|s| s.time).collect()
}

/// Concentration values of a subset, NaN where an individual reading is
/// missing. Errors when the column was never supplied.
fn concentration_column(subset: &Subset) -> Result<Vec<f64>, AnalysisError> {
    if !subset.samples.iter().any(|s| s.concentration.is_some()) {
        return Err(AnalysisError::MissingColumn("concentration"));
    }
    Ok(subset
        .samples
        .iter()
        .map(|s| s.concentration.unwrap_or(f64::NAN))
        .collect())
}

/// NaN-omitted mean concentration over the rows whose response time falls
/// inside `window`. A selection without finite values is a configuration
/// error, not a NaN.
fn window_mean(subset: &Subset, window: Window, conc: &[f64]) -> Result<f64, AnalysisError> {
    window.validate()?;
    let mut sum = 0.0;
    let mut count = 0usize;
    for (rt, c) in subset.response_time.iter().zip(conc) {
        if window.contains(*rt) && c.is_finite() {
            sum += c;
            count += 1;
        }
    }
    if count == 0 {
        return Err(AnalysisError::EmptySubset {
            event: subset.event_time,
            start: window.start,
            end: window.end,
        });
    }
    Ok(sum / count as f64)
}

fn build_curve(kind: ResponseKind, subset: &Subset, values: Vec<f64>) -> NormalizedCurve {
    const NAN3: [f64; 3] = [f64::NAN, f64::NAN, f64::NAN];
    let points = subset
        .samples
        .iter()
        .zip(&subset.response_time)
        .zip(values)
        .map(|((sample, &response_time), value)| CurvePoint {
            time: sample.time,
            response_time,
            value,
            rgb: sample.rgb.unwrap_or(NAN3),
            xyz: sample.xyz.unwrap_or(NAN3),
            lab: sample.lab.unwrap_or(NAN3),
        })
        .collect();
    NormalizedCurve {
        kind,
        event_time: subset.event_time,
        points,
    }
}
