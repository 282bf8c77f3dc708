use crate::error::AnalysisError;
use crate::series::{Sample, Series, Window};
use serde::{Deserialize, Serialize};

/// Contiguous slice of a series re-anchored to an event time.
///
/// `response_time[i]` is `samples[i].time - event_time` and may span both
/// signs when the window reaches before the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subset {
    pub event_time: f64,
    pub samples: Vec<Sample>,
    pub response_time: Vec<f64>,
}

impl Subset {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Index of the sample whose value is closest to `target`, earliest index
/// on ties. `values` must be sorted ascending. Binary search, not a scan.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let insert = values.partition_point(|&v| v < target);
    if insert == 0 {
        return Some(0);
    }
    if insert == values.len() {
        return Some(values.len() - 1);
    }
    let below = target - values[insert - 1];
    let above = values[insert] - target;
    if below <= above {
        Some(insert - 1)
    } else {
        Some(insert)
    }
}

/// Extract the closed interval of samples nearest to
/// `[event_time + window.start, event_time + window.end]`.
pub fn extract(
    event_time: f64,
    series: &Series,
    window: Window,
) -> Result<Subset, AnalysisError> {
    series.ensure_sorted()?;
    window.validate()?;

    let empty = || AnalysisError::EmptySubset {
        event: event_time,
        start: window.start,
        end: window.end,
    };

    let times = series.times();
    let lo = nearest_index(&times, event_time + window.start).ok_or_else(empty)?;
    let hi = nearest_index(&times, event_time + window.end).ok_or_else(empty)?;
    if lo > hi {
        return Err(empty());
    }

    let samples: Vec<Sample> = series.samples[lo..=hi].to_vec();
    let response_time = samples.iter().map(|s| s.time - event_time).collect();
    Ok(Subset {
        event_time,
        samples,
        response_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_with_times(times: &[f64]) -> Series {
        Series {
            samples: times
                .iter()
                .map(|&time| Sample {
                    time,
                    rgb: None,
                    xyz: None,
                    lab: None,
                    concentration: Some(0.0),
                })
                .collect(),
        }
    }

    #[test]
    fn nearest_prefers_earliest_on_ties() {
        let values = [0.0, 1.0, 2.0, 2.0, 3.0];
        assert_eq!(nearest_index(&values, 2.0), Some(2));
        // 1.5 is equidistant from 1.0 and 2.0
        assert_eq!(nearest_index(&values, 1.5), Some(1));
        assert_eq!(nearest_index(&values, -10.0), Some(0));
        assert_eq!(nearest_index(&values, 10.0), Some(4));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn extract_attaches_monotone_response_times() {
        let series = series_with_times(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let subset = extract(3.0, &series, Window::new(-2.0, 2.0).unwrap()).unwrap();
        assert_eq!(subset.len(), 5);
        assert_eq!(subset.response_time.first(), Some(&-2.0));
        assert_eq!(subset.response_time.last(), Some(&2.0));
        assert!(subset
            .response_time
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn extract_clamps_to_series_bounds() {
        let series = series_with_times(&[10.0, 11.0, 12.0]);
        // Window reaching far before and after the recording collapses to
        // the full series.
        let subset = extract(11.0, &series, Window::new(-100.0, 100.0).unwrap()).unwrap();
        assert_eq!(subset.len(), 3);
        // Window entirely after the recording still yields the last sample.
        let tail = extract(11.0, &series, Window::new(50.0, 60.0).unwrap()).unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail.samples[0].time, 12.0);
    }

    #[test]
    fn extract_rejects_bad_inputs() {
        let series = series_with_times(&[]);
        let err = extract(0.0, &series, Window::new(-1.0, 1.0).unwrap()).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptySubset { .. }));

        let unsorted = series_with_times(&[0.0, 2.0, 1.0]);
        let err = extract(0.0, &unsorted, Window::new(-1.0, 1.0).unwrap()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));

        let sorted = series_with_times(&[0.0, 1.0]);
        let window = Window { start: 1.0, end: -1.0 };
        let err = extract(0.0, &sorted, window).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }
}
