use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// One optical sample from a tracer recording.
///
/// Channel triples that the acquisition side did not record are `None`;
/// individual missing readings inside a recorded triple are NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds on the recording clock (monotonic, sub-second resolution).
    pub time: f64,
    /// Linear color channels R, G, B.
    pub rgb: Option<[f64; 3]>,
    /// Tristimulus values X, Y, Z.
    pub xyz: Option<[f64; 3]>,
    /// Perceptual lightness/chroma channels L*, a*, b*.
    pub lab: Option<[f64; 3]>,
    /// Concentration proxy, mapped from one channel by the caller-supplied
    /// linear calibration.
    pub concentration: Option<f64>,
}

impl Sample {
    /// Look up a scalar channel by column name. Lightness/chroma names are
    /// accepted with or without the star suffix; `B` is blue and `b` is
    /// chroma.
    pub fn channel(&self, name: &str) -> Option<f64> {
        match name {
            "R" => self.rgb.map(|v| v[0]),
            "G" => self.rgb.map(|v| v[1]),
            "B" => self.rgb.map(|v| v[2]),
            "X" => self.xyz.map(|v| v[0]),
            "Y" => self.xyz.map(|v| v[1]),
            "Z" => self.xyz.map(|v| v[2]),
            "L" | "L*" => self.lab.map(|v| v[0]),
            "a" | "a*" => self.lab.map(|v| v[1]),
            "b" | "b*" => self.lab.map(|v| v[2]),
            _ => None,
        }
    }
}

/// Time-ordered sequence of samples, sorted ascending by timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Series {
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamps as a dense vector, for index searches.
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Reject a series whose timestamps decrease anywhere.
    pub fn ensure_sorted(&self) -> Result<(), AnalysisError> {
        for (i, pair) in self.samples.windows(2).enumerate() {
            if pair[1].time < pair[0].time {
                return Err(AnalysisError::unsorted_series(i + 1));
            }
        }
        Ok(())
    }

    /// Whether the concentration column was supplied for this series.
    pub fn has_concentration(&self) -> bool {
        self.samples.iter().any(|s| s.concentration.is_some())
    }
}

/// Signed offsets in seconds around an event time, start strictly before end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn new(start: f64, end: f64) -> Result<Self, AnalysisError> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.start < self.end {
            Ok(())
        } else {
            Err(AnalysisError::unsorted_window(self.start, self.end))
        }
    }

    pub fn contains(&self, offset: f64) -> bool {
        self.start <= offset && offset <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f64) -> Sample {
        Sample {
            time,
            rgb: Some([120.0, 80.0, 60.0]),
            xyz: None,
            lab: Some([70.0, 4.0, 12.0]),
            concentration: None,
        }
    }

    #[test]
    fn channel_lookup_distinguishes_blue_from_chroma() {
        let s = sample(0.0);
        assert_eq!(s.channel("B"), Some(60.0));
        assert_eq!(s.channel("b"), Some(12.0));
        assert_eq!(s.channel("b*"), Some(12.0));
        assert_eq!(s.channel("X"), None);
    }

    #[test]
    fn sortedness_names_offending_sample() {
        let series = Series {
            samples: vec![sample(0.0), sample(1.0), sample(0.5)],
        };
        let err = series.ensure_sorted().unwrap_err();
        assert!(err.to_string().contains("sample 2"), "{err}");
    }

    #[test]
    fn window_rejects_reversed_offsets() {
        assert!(Window::new(-5.0, 30.0).is_ok());
        assert!(Window::new(30.0, -5.0).is_err());
        assert!(Window::new(1.0, 1.0).is_err());
    }
}
