use std::collections::VecDeque;
use crate::error::{AkiError, AkiResult};

/// Minimum over a trailing time window of sparse, timestamped samples.
///
/// Candidates are kept in a monotonic deque: values are strictly increasing
/// from front to back and hours non-decreasing, so the front is always the
/// window minimum. Each sample is pushed and popped at most once.
#[derive(Debug, Clone)]
pub struct SlidingMinTracker {
    window_hours: f64,
    candidates: VecDeque<(f64, f64)>, // (hour, value)
    last_hour: Option<f64>,
}

impl SlidingMinTracker {
    pub fn new(window_hours: f64) -> AkiResult<Self> {
        if !window_hours.is_finite() || window_hours <= 0.0 {
            return Err(AkiError::InvalidConfig(
                format!("Sliding window length must be positive, got {}", window_hours)
            ));
        }

        Ok(Self {
            window_hours,
            candidates: VecDeque::new(),
            last_hour: None,
        })
    }

    /// Add a sample and return the minimum over `(hour - W, hour]`.
    ///
    /// Hours must be non-decreasing across calls. Samples sharing an hour are
    /// all kept as candidates.
    pub fn observe(&mut self, hour: f64, value: f64) -> AkiResult<f64> {
        if let Some(last) = self.last_hour {
            if !(hour >= last) {
                return Err(AkiError::UnorderedHours {
                    patient: String::new(),
                    previous: last,
                    current: hour,
                });
            }
        } else if hour.is_nan() {
            return Err(AkiError::Validation("Sample hour is NaN".to_string()));
        }
        self.last_hour = Some(hour);

        while let Some(&(_, back_value)) = self.candidates.back() {
            if back_value >= value {
                self.candidates.pop_back();
            } else {
                break;
            }
        }
        self.candidates.push_back((hour, value));

        // Strict: a sample exactly W hours old is out of the window
        let cutoff = hour - self.window_hours;
        while let Some(&(front_hour, _)) = self.candidates.front() {
            if front_hour <= cutoff {
                self.candidates.pop_front();
            } else {
                break;
            }
        }

        Ok(self.candidates.front().map_or(value, |&(_, v)| v))
    }

    /// Current window minimum, `None` before the first observation.
    pub fn minimum(&self) -> Option<f64> {
        self.candidates.front().map(|&(_, v)| v)
    }

    /// Number of retained candidates (not the number of samples in the window).
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
