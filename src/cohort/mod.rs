pub mod imputer;
pub mod summary;

use crate::error::AkiResult;
use crate::windows::{PatientWindows, WindowSpec};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use imputer::*;
pub use summary::*;

/// Stacked feature matrix and id-aligned labels for one window length.
#[derive(Debug, Clone)]
pub struct WindowDataset {
    pub window_hours: u32,
    pub columns: Vec<String>,
    pub ids: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
    pub labels: Vec<u8>,
    pub excluded: usize,
}

impl WindowDataset {
    pub fn new(window_hours: u32) -> Self {
        Self {
            window_hours,
            columns: Vec::new(),
            ids: Vec::new(),
            rows: Vec::new(),
            labels: Vec::new(),
            excluded: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Appends one patient's features, aligning columns by name. Columns not
    /// seen before are added, with earlier rows left missing in them.
    pub fn push_row(&mut self, id: &str, columns: &[String], features: &[Option<f64>], label: u8) {
        if self.columns.as_slice() == columns {
            self.rows.push(features.to_vec());
        } else {
            let mut index: HashMap<&str, usize> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), i))
                .collect();

            let mut new_columns = Vec::new();
            for name in columns {
                if !index.contains_key(name.as_str()) {
                    index.insert(name.as_str(), self.columns.len() + new_columns.len());
                    new_columns.push(name.clone());
                }
            }

            let mut row = vec![None; self.columns.len() + new_columns.len()];
            for (name, &value) in columns.iter().zip(features) {
                row[index[name.as_str()]] = value;
            }

            if !new_columns.is_empty() {
                if !self.rows.is_empty() {
                    debug!(
                        "{}h window: patient {} adds columns {:?}",
                        self.window_hours, id, new_columns
                    );
                }
                self.columns.extend(new_columns);
                let width = self.columns.len();
                for existing in &mut self.rows {
                    existing.resize(width, None);
                }
            }

            self.rows.push(row);
        }

        self.ids.push(id.to_string());
        self.labels.push(label);
    }

    pub fn impute(&self, imputer: &dyn Imputer) -> AkiResult<Vec<Vec<f64>>> {
        imputer.impute(&self.rows, self.columns.len())
    }

    pub fn summary(&self) -> WindowSummary {
        WindowSummary {
            window_hours: self.window_hours,
            patients: self.len(),
            positives: self.positives(),
            excluded: self.excluded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummary {
    pub window_hours: u32,
    pub patients: usize,
    pub positives: usize,
    pub excluded: usize,
}

/// Collects per-patient windows into one [`WindowDataset`] per window length.
pub struct CohortAssembler {
    datasets: Vec<WindowDataset>,
}

impl CohortAssembler {
    pub fn new(spec: &WindowSpec) -> Self {
        let datasets = (0..spec.count)
            .map(|k| WindowDataset::new(spec.window_hours(k)))
            .collect();
        Self { datasets }
    }

    pub fn push(&mut self, windows: &PatientWindows) {
        for (dataset, slot) in self.datasets.iter_mut().zip(&windows.slots) {
            match slot {
                Some(w) if w.included => {
                    dataset.push_row(&w.patient_id, &windows.columns, &w.features, w.label);
                }
                Some(_) => dataset.excluded += 1,
                None => {}
            }
        }
    }

    pub fn finish(self) -> Vec<WindowDataset> {
        for dataset in &self.datasets {
            if dataset.is_empty() {
                warn!("{}h window has no included patients", dataset.window_hours);
            }
        }
        self.datasets
    }
}
