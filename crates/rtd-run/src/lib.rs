use anyhow::{bail, Context, Result};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rtd_lib::filter::{hampel_filter, smooth_concentration};
use rtd_lib::io::{export, table};
use rtd_lib::normalize::{normalize_rtd, normalize_step_down, normalize_step_up};
use rtd_lib::properties::{rtd_properties, step_properties, CurveProperties};
use rtd_lib::series::{Sample, Series, Window};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Stimulus applied at an event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StimulusKind {
    Impulse,
    StepUp,
    StepDown,
}

/// One analysis session described by a TOML file: a recording, the
/// calibration mapping a channel to concentration, cleaning parameters,
/// and the events to analyze.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub input: PathBuf,
    pub concentration: CalibrationSpec,
    #[serde(default)]
    pub outliers: Option<OutlierSpec>,
    #[serde(default)]
    pub smoothing: Option<SmoothingSpec>,
    pub events: Vec<EventSpec>,
}

/// Linear calibration supplied by the caller: `concentration =
/// slope * channel + intercept`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationSpec {
    pub channel: String,
    #[serde(default = "default_slope")]
    pub slope: f64,
    #[serde(default)]
    pub intercept: f64,
}

fn default_slope() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OutlierSpec {
    #[serde(default)]
    pub half_window: Option<usize>,
    #[serde(default)]
    pub sigma: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SmoothingSpec {
    #[serde(default)]
    pub window: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSpec {
    pub label: String,
    pub kind: StimulusKind,
    /// Stimulus time on the recording clock, seconds.
    pub time: f64,
    /// Analysis window offsets around the event, seconds.
    pub window: [f64; 2],
    /// Quiet pre-event window used as a baseline reference.
    pub baseline: [f64; 2],
    /// Late window used as the tail/plateau reference.
    pub tail: [f64; 2],
}

pub fn read_session(path: &Path) -> Result<SessionConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session config {}", path.display()))?;
    let config: SessionConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing session config {}", path.display()))?;
    if config.events.is_empty() {
        bail!("session config {} declares no events", path.display());
    }
    Ok(config)
}

#[test]
fn session_config_fills_defaults() {
    let config: SessionConfig = toml::from_str(
        r#"
        input = "recording.csv"

        [concentration]
        channel = "a"

        [[events]]
        label = "impulse 1"
        kind = "impulse"
        time = 120.0
        window = [-30.0, 300.0]
        baseline = [-30.0, -5.0]
        tail = [240.0, 300.0]
        "#,
    )
    .unwrap();
    assert_eq!(config.concentration.slope, 1.0);
    assert_eq!(config.concentration.intercept, 0.0);
    assert!(config.outliers.is_none());
    assert_eq!(config.events[0].kind, StimulusKind::Impulse);
    assert_eq!(config.events[0].window, [-30.0, 300.0]);
}

/// Result of one analyzed event.
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub label: String,
    pub kind: StimulusKind,
    pub file_name: String,
    pub properties: CurveProperties,
}

/// Session summary printed by the CLI after a run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub input: PathBuf,
    pub samples: usize,
    pub outliers_removed: usize,
    pub properties_file: PathBuf,
    pub events: Vec<EventOutcome>,
}

/// Run a full session: load, calibrate, clean, smooth, then analyze each
/// event and write its curve artifact plus one aggregated properties
/// table under `out_dir`.
pub fn run_session(config: &SessionConfig, out_dir: &Path) -> Result<SessionSummary> {
    let series = table::read_recording_csv(&config.input)
        .with_context(|| format!("loading recording {}", config.input.display()))?;
    if series.is_empty() {
        bail!("recording {} contains no samples", config.input.display());
    }
    series.ensure_sorted()?;
    info!("loaded {} samples from {}", series.len(), config.input.display());

    let calibrated = apply_calibration(&series, &config.concentration)?;

    let half_window = config
        .outliers
        .and_then(|o| o.half_window)
        .unwrap_or(10);
    let sigma = config.outliers.and_then(|o| o.sigma).unwrap_or(6.0);
    let (cleaned, removed) = hampel_filter(&calibrated, half_window, sigma);
    info!("outlier filter removed {removed} of {} samples", calibrated.len());

    let smoothing = config.smoothing.and_then(|s| s.window).unwrap_or(0);
    let smoothed = smooth_concentration(&cleaned, smoothing);

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut events = Vec::with_capacity(config.events.len());
    let mut records = Vec::with_capacity(config.events.len());
    for event in &config.events {
        let outcome = analyze_event(&smoothed, event, out_dir)
            .with_context(|| format!("analyzing event `{}`", event.label))?;
        records.push(outcome.properties.clone());
        events.push(outcome);
    }

    let properties_file = out_dir.join("properties.csv");
    export::write_properties_csv(&properties_file, &records)?;
    info!("wrote {} property rows to {}", records.len(), properties_file.display());

    Ok(SessionSummary {
        input: config.input.clone(),
        samples: series.len(),
        outliers_removed: removed,
        properties_file,
        events,
    })
}

fn analyze_event(series: &Series, event: &EventSpec, out_dir: &Path) -> Result<EventOutcome> {
    let window = Window::new(event.window[0], event.window[1])?;
    let baseline = Window::new(event.baseline[0], event.baseline[1])?;
    let tail = Window::new(event.tail[0], event.tail[1])?;
    let file_name = format!("{}_curve.csv", event.label.replace(' ', "-"));

    let (curve, properties) = match event.kind {
        StimulusKind::Impulse => {
            let (curve, area) = normalize_rtd(event.time, series, window, baseline, tail)?;
            let properties = rtd_properties(&curve, area, &file_name)?;
            (curve, properties)
        }
        StimulusKind::StepUp => {
            let curve = normalize_step_up(event.time, series, window, baseline, tail)?;
            let properties = step_properties(&curve, &file_name)?;
            (curve, properties)
        }
        StimulusKind::StepDown => {
            let curve = normalize_step_down(event.time, series, window, baseline, tail)?;
            let properties = step_properties(&curve, &file_name)?;
            (curve, properties)
        }
    };

    export::write_curve_csv(&out_dir.join(&file_name), &curve)?;
    Ok(EventOutcome {
        label: event.label.clone(),
        kind: event.kind,
        file_name,
        properties,
    })
}

/// Map the configured channel onto the concentration column. Readings the
/// channel is missing become NaN and are later ignored by the NaN-omitted
/// statistics.
pub fn apply_calibration(series: &Series, calibration: &CalibrationSpec) -> Result<Series> {
    let name = calibration.channel.as_str();
    if !series.samples.iter().any(|s| s.channel(name).is_some()) {
        bail!("calibration channel `{name}` is not present in the recording");
    }
    let samples = series
        .samples
        .iter()
        .map(|s| {
            let value = s.channel(name).unwrap_or(f64::NAN);
            Sample {
                concentration: Some(calibration.slope * value + calibration.intercept),
                ..s.clone()
            }
        })
        .collect();
    Ok(Series { samples })
}

/// Parameters for the synthetic recording generator.
#[derive(Debug, Clone)]
pub struct SimulateSpec {
    pub kind: StimulusKind,
    pub duration_s: f64,
    pub rate_hz: f64,
    pub event_time: f64,
    /// Uniform noise amplitude added to every channel.
    pub noise: f64,
    pub seed: u64,
}

/// Generate a synthetic tracer recording in the acquisition schema: a
/// colored tracer front passing the camera, strongest on the a* chroma
/// channel. Impulses peak 10 s after the event; steps transition with a
/// 2 s logistic time constant.
pub fn synthetic_recording(spec: &SimulateSpec) -> Series {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let count = (spec.duration_s * spec.rate_hz).ceil() as usize;
    let mut samples = Vec::with_capacity(count);
    for i in 0..count {
        let time = i as f64 / spec.rate_hz;
        let signal = match spec.kind {
            StimulusKind::Impulse => {
                let center = spec.event_time + 10.0;
                (-0.5 * ((time - center) / 4.0).powi(2)).exp()
            }
            StimulusKind::StepUp => logistic(time - spec.event_time, 2.0),
            StimulusKind::StepDown => 1.0 - logistic(time - spec.event_time, 2.0),
        };
        let mut jitter = || {
            if spec.noise > 0.0 {
                rng.gen_range(-spec.noise..=spec.noise)
            } else {
                0.0
            }
        };
        samples.push(Sample {
            time,
            rgb: Some([
                120.0 + 30.0 * signal + jitter(),
                80.0 - 10.0 * signal + jitter(),
                60.0 + 5.0 * signal + jitter(),
            ]),
            xyz: Some([
                0.40 + 0.10 * signal + jitter(),
                0.37 + 0.05 * signal + jitter(),
                0.29 + 0.01 * signal + jitter(),
            ]),
            lab: Some([
                70.0 - 5.0 * signal + jitter(),
                5.0 + 20.0 * signal + jitter(),
                12.0 + 2.0 * signal + jitter(),
            ]),
            concentration: None,
        });
    }
    Series { samples }
}

fn logistic(t: f64, tau: f64) -> f64 {
    1.0 / (1.0 + (-t / tau).exp())
}
