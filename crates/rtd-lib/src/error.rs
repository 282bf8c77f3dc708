use thiserror::Error;

/// Failures raised by the analysis core. All are caller configuration
/// errors; nothing here is retried internally.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A precondition on the inputs was violated. The message names the
    /// invariant that broke.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A window selection produced no usable samples.
    #[error("window [{start:+.3} s, {end:+.3} s] around t = {event:.3} s selects no samples")]
    EmptySubset { event: f64, start: f64, end: f64 },

    /// The required scalar column is absent from the series.
    #[error("missing required column `{0}`")]
    MissingColumn(&'static str),

    /// The curve has no samples left after trimming to the event.
    #[error("curve contains no samples at or after the event")]
    EmptyCurve,

    /// A step-response percentile threshold was never crossed.
    #[error("response curve never crosses the {quantile} quantile threshold")]
    PercentileNotFound { quantile: f64 },
}

impl AnalysisError {
    pub fn unsorted_series(index: usize) -> Self {
        Self::InvalidInput(format!(
            "series timestamps must be non-decreasing (violated at sample {index})"
        ))
    }

    pub fn unsorted_window(start: f64, end: f64) -> Self {
        Self::InvalidInput(format!(
            "window offsets must satisfy start < end (got {start} >= {end})"
        ))
    }
}
