pub mod sliding_min;

use crate::config::DetectionConfig;
use crate::error::{AkiError, AkiResult};
use crate::patient::{Patient, Reading};
use log::debug;
use serde::{Deserialize, Serialize};

pub use sliding_min::*;

/// Onset hour written for patients without AKI.
pub const NO_ONSET_SENTINEL: f64 = -1.0;

/// Creatinine thresholds for the two AKI criteria.
///
/// Condition 1 (absolute rise): value >= min(last `absolute_window_hours`) + `absolute_rise`.
/// Condition 2 (relative rise): value >= `relative_rise` * min(last `relative_window_hours`).
/// Both baselines include the current reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AkiCriteria {
    pub absolute_window_hours: f64,
    pub absolute_rise: f64,
    pub relative_window_hours: f64,
    pub relative_rise: f64,
}

impl Default for AkiCriteria {
    fn default() -> Self {
        Self::from(&DetectionConfig::default())
    }
}

impl From<&DetectionConfig> for AkiCriteria {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            absolute_window_hours: config.absolute_window_hours,
            absolute_rise: config.absolute_rise,
            relative_window_hours: config.relative_window_hours,
            relative_rise: config.relative_rise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    AbsoluteRise,
    RelativeRise,
    Both,
}

impl Criterion {
    fn from_flags(absolute: bool, relative: bool) -> Option<Self> {
        match (absolute, relative) {
            (true, true) => Some(Criterion::Both),
            (true, false) => Some(Criterion::AbsoluteRise),
            (false, true) => Some(Criterion::RelativeRise),
            (false, false) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::AbsoluteRise => "absolute_rise",
            Criterion::RelativeRise => "relative_rise",
            Criterion::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onset {
    pub hour: f64,
    pub criterion: Criterion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnsetResult {
    pub patient_id: String,
    pub onset: Option<Onset>,
}

impl OnsetResult {
    pub fn none(patient_id: impl Into<String>) -> Self {
        Self { patient_id: patient_id.into(), onset: None }
    }

    pub fn onset_hour(&self) -> Option<f64> {
        self.onset.map(|o| o.hour)
    }

    pub fn has_aki(&self) -> bool {
        self.onset.is_some()
    }

    /// Onset hour, or [`NO_ONSET_SENTINEL`] when the patient never met a criterion.
    pub fn onset_hour_or_sentinel(&self) -> f64 {
        self.onset_hour().unwrap_or(NO_ONSET_SENTINEL)
    }
}

pub struct OnsetDetector {
    criteria: AkiCriteria,
}

impl OnsetDetector {
    pub fn new(criteria: AkiCriteria) -> AkiResult<Self> {
        // Fail on bad window lengths up front rather than per patient
        SlidingMinTracker::new(criteria.absolute_window_hours)?;
        SlidingMinTracker::new(criteria.relative_window_hours)?;
        Ok(Self { criteria })
    }

    pub fn detect_patient(&self, patient: &Patient) -> AkiResult<OnsetResult> {
        self.detect(&patient.id, patient.creatinine())
    }

    /// First hour at which either criterion holds. Readings with a missing
    /// value are skipped; hours must be non-decreasing.
    pub fn detect(&self, patient_id: &str, readings: &[Reading]) -> AkiResult<OnsetResult> {
        let mut short = SlidingMinTracker::new(self.criteria.absolute_window_hours)?;
        let mut long = SlidingMinTracker::new(self.criteria.relative_window_hours)?;

        for (hour, value) in readings.iter().filter_map(|r| r.value.map(|v| (r.hour, v))) {
            let short_min = short.observe(hour, value).map_err(|e| with_patient(e, patient_id))?;
            let long_min = long.observe(hour, value).map_err(|e| with_patient(e, patient_id))?;

            let absolute = value >= short_min + self.criteria.absolute_rise;
            let relative = value >= long_min * self.criteria.relative_rise;

            if let Some(criterion) = Criterion::from_flags(absolute, relative) {
                debug!(
                    "Patient {}: AKI onset at hour {} ({}; creatinine {}, baselines {}/{})",
                    patient_id, hour, criterion.as_str(), value, short_min, long_min
                );
                return Ok(OnsetResult {
                    patient_id: patient_id.to_string(),
                    onset: Some(Onset { hour, criterion }),
                });
            }
        }

        debug!("Patient {}: no AKI onset", patient_id);
        Ok(OnsetResult::none(patient_id))
    }
}

fn with_patient(err: AkiError, patient_id: &str) -> AkiError {
    match err {
        AkiError::UnorderedHours { previous, current, .. } => AkiError::UnorderedHours {
            patient: patient_id.to_string(),
            previous,
            current,
        },
        other => other,
    }
}
