use crate::config::WindowConfig;
use crate::detection::OnsetResult;
use crate::patient::Patient;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortKind {
    Train,
    Test,
}

impl CohortKind {
    pub fn from_test_flag(test: bool) -> Self {
        if test { CohortKind::Test } else { CohortKind::Train }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CohortKind::Train => "train",
            CohortKind::Test => "test",
        }
    }

    /// Only training cohorts drop windows whose observation period contains the onset.
    pub fn applies_exclusion(&self) -> bool {
        matches!(self, CohortKind::Train)
    }
}

/// Cumulative-prefix window layout.
///
/// Window `k` ends at row `min((k + 1) * rows_per_step, last_row)`: boundaries
/// count rows, not elapsed hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpec {
    pub rows_per_step: usize,
    pub count: usize,
    pub lookahead_hours: f64,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::from(&WindowConfig::default())
    }
}

impl From<&WindowConfig> for WindowSpec {
    fn from(config: &WindowConfig) -> Self {
        Self {
            rows_per_step: config.rows_per_step,
            count: config.count,
            lookahead_hours: config.lookahead_hours,
        }
    }
}

impl WindowSpec {
    /// Nominal length of window `k` in hours (24, 48, 72 by default).
    pub fn window_hours(&self, k: usize) -> u32 {
        ((k + 1) * (self.rows_per_step + 1)) as u32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationWindow {
    pub patient_id: String,
    pub window_hours: u32,
    pub end_hour: f64,
    pub features: Vec<Option<f64>>,
    pub label: u8,
    pub included: bool,
}

/// Up to `count` windows for one patient. A `None` slot means the patient's
/// record ended before that window could start.
#[derive(Debug, Clone)]
pub struct PatientWindows {
    pub patient_id: String,
    pub columns: Vec<String>,
    pub slots: Vec<Option<ObservationWindow>>,
}

impl PatientWindows {
    /// The window in slot `k`, if it exists and survived exclusion.
    pub fn included(&self, k: usize) -> Option<&ObservationWindow> {
        self.slots.get(k)?.as_ref().filter(|w| w.included)
    }

    pub fn included_count(&self) -> usize {
        (0..self.slots.len()).filter(|&k| self.included(k).is_some()).count()
    }
}

pub struct ObservationWindowBuilder {
    spec: WindowSpec,
}

impl ObservationWindowBuilder {
    pub fn new(spec: WindowSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    pub fn build(&self, patient: &Patient, onset: &OnsetResult, cohort: CohortKind) -> PatientWindows {
        let table = patient.table();
        let mut windows = PatientWindows {
            patient_id: patient.id.clone(),
            columns: table.columns().to_vec(),
            slots: (0..self.spec.count).map(|_| None).collect(),
        };

        let Some(start_hour) = table.hour(0) else {
            debug!("Patient {}: no rows, no observation windows", patient.id);
            return windows;
        };

        let last = table.len() - 1;
        let onset_hour = onset.onset_hour();
        let mut end_idx = self.spec.rows_per_step.min(last);

        for (k, slot) in windows.slots.iter_mut().enumerate() {
            let end_hour = table.hours()[end_idx];

            let label = onset_hour
                .map(|h| end_hour < h && h <= end_hour + self.spec.lookahead_hours)
                .unwrap_or(false);

            // end_hour only grows, so once excluded every later window is too
            let onset_observed = onset_hour
                .map(|h| start_hour <= h && h <= end_hour)
                .unwrap_or(false);
            let included = !(cohort.applies_exclusion() && onset_observed);

            if !included {
                debug!(
                    "Patient {}: {}h window excluded, onset within hours {}..={}",
                    patient.id, self.spec.window_hours(k), start_hour, end_hour
                );
            }

            *slot = Some(ObservationWindow {
                patient_id: patient.id.clone(),
                window_hours: self.spec.window_hours(k),
                end_hour,
                features: table.prefix_means(end_idx),
                label: u8::from(label),
                included,
            });

            if end_idx == last {
                break;
            }
            end_idx = (end_idx + self.spec.rows_per_step).min(last);
        }

        windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Criterion, Onset};
    use crate::patient::tests::table_from;
    use approx::assert_relative_eq;

    fn patient_with_hours(hours: &[f64]) -> Patient {
        let creatinine: Vec<Option<f64>> = hours.iter().map(|_| Some(1.0)).collect();
        let heart_rate: Vec<Option<f64>> = (0..hours.len()).map(|i| Some(i as f64)).collect();
        Patient::new("p1", table_from(hours, &creatinine, &heart_rate), "Creatinine").unwrap()
    }

    fn onset_at(hour: f64) -> OnsetResult {
        OnsetResult {
            patient_id: "p1".to_string(),
            onset: Some(Onset { hour, criterion: Criterion::AbsoluteRise }),
        }
    }

    fn builder() -> ObservationWindowBuilder {
        ObservationWindowBuilder::new(WindowSpec::default())
    }

    fn hourly(n: usize) -> Vec<f64> {
        (0..n).map(|h| h as f64).collect()
    }

    #[test]
    fn test_nominal_window_hours() {
        let spec = WindowSpec::default();
        assert_eq!(spec.window_hours(0), 24);
        assert_eq!(spec.window_hours(1), 48);
        assert_eq!(spec.window_hours(2), 72);
    }

    #[test]
    fn test_three_windows_without_onset() {
        let patient = patient_with_hours(&hourly(101));
        let windows = builder().build(&patient, &OnsetResult::none("p1"), CohortKind::Train);

        assert_eq!(windows.included_count(), 3);
        let ends: Vec<f64> = (0..3).map(|k| windows.included(k).unwrap().end_hour).collect();
        assert_eq!(ends, vec![23.0, 46.0, 69.0]);
        assert!(windows.slots.iter().flatten().all(|w| w.label == 0));
    }

    #[test]
    fn test_training_onset_in_first_window_excludes_all() {
        let patient = patient_with_hours(&hourly(101));
        let windows = builder().build(&patient, &onset_at(10.0), CohortKind::Train);

        for k in 0..3 {
            assert!(windows.included(k).is_none(), "window {} should be excluded", k);
        }
        assert_eq!(windows.included_count(), 0);
    }

    #[test]
    fn test_test_cohort_never_excludes() {
        let patient = patient_with_hours(&hourly(101));
        let windows = builder().build(&patient, &onset_at(10.0), CohortKind::Test);
        assert_eq!(windows.included_count(), 3);
        assert!(windows.slots.iter().flatten().all(|w| w.label == 0));
    }

    #[test]
    fn test_onset_after_first_window() {
        let patient = patient_with_hours(&hourly(101));
        let windows = builder().build(&patient, &onset_at(30.0), CohortKind::Train);

        let first = windows.included(0).unwrap();
        assert_eq!(first.label, 1);
        assert!(windows.included(1).is_none());
        assert!(windows.included(2).is_none());
    }

    #[test]
    fn test_onset_before_start_does_not_exclude() {
        let hours: Vec<f64> = (5..106).map(|h| h as f64).collect();
        let patient = patient_with_hours(&hours);
        let windows = builder().build(&patient, &onset_at(2.0), CohortKind::Train);
        assert_eq!(windows.included_count(), 3);
    }

    #[test]
    fn test_label_lookahead_boundary() {
        // 24 rows with a gap: the only window ends at hour 50
        let mut hours = hourly(23);
        hours.push(50.0);
        let patient = patient_with_hours(&hours);

        let windows = builder().build(&patient, &onset_at(74.0), CohortKind::Train);
        let window = windows.included(0).unwrap();
        assert_eq!(window.end_hour, 50.0);
        assert_eq!(window.label, 1);

        let windows = builder().build(&patient, &onset_at(75.0), CohortKind::Train);
        assert_eq!(windows.included(0).unwrap().label, 0);

        // Onset at the window end is inside the observation period
        let windows = builder().build(&patient, &onset_at(50.0), CohortKind::Test);
        assert_eq!(windows.included(0).unwrap().label, 0);
    }

    #[test]
    fn test_boundaries_count_rows_not_hours() {
        // Two readings per hour: row 23 is hour 11.5
        let hours: Vec<f64> = (0..80).map(|i| i as f64 * 0.5).collect();
        let patient = patient_with_hours(&hours);
        let windows = builder().build(&patient, &OnsetResult::none("p1"), CohortKind::Train);

        assert_eq!(windows.included(0).unwrap().end_hour, 11.5);
        assert_eq!(windows.included(1).unwrap().end_hour, 23.0);
        assert_eq!(windows.included(2).unwrap().end_hour, 34.5);
    }

    #[test]
    fn test_short_stay_stops_early() {
        let patient = patient_with_hours(&hourly(30));
        let windows = builder().build(&patient, &OnsetResult::none("p1"), CohortKind::Test);

        assert_eq!(windows.included(0).unwrap().end_hour, 23.0);
        assert_eq!(windows.included(1).unwrap().end_hour, 29.0);
        assert!(windows.slots[2].is_none());

        let patient = patient_with_hours(&hourly(10));
        let windows = builder().build(&patient, &OnsetResult::none("p1"), CohortKind::Test);
        assert_eq!(windows.included(0).unwrap().end_hour, 9.0);
        assert!(windows.slots[1].is_none());
        assert!(windows.slots[2].is_none());
    }

    #[test]
    fn test_features_are_cumulative_means() {
        let patient = patient_with_hours(&hourly(101));
        let windows = builder().build(&patient, &OnsetResult::none("p1"), CohortKind::Train);

        // HR column holds the row index, so the prefix mean is end_idx / 2
        let means: Vec<f64> = (0..3)
            .map(|k| windows.included(k).unwrap().features[1].unwrap())
            .collect();
        assert_relative_eq!(means[0], 11.5);
        assert_relative_eq!(means[1], 23.0);
        assert_relative_eq!(means[2], 34.5);
        assert_eq!(windows.columns, vec!["Creatinine".to_string(), "HR".to_string()]);
    }

    #[test]
    fn test_empty_table_has_no_windows() {
        let patient = patient_with_hours(&[]);
        let windows = builder().build(&patient, &OnsetResult::none("p1"), CohortKind::Train);
        assert_eq!(windows.slots.len(), 3);
        assert!(windows.slots.iter().all(|s| s.is_none()));
    }
}
