use crate::patient::Patient;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution, Max, Median, Min};

/// Descriptive statistics of one column across every row of a cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub feature: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub missing: usize,
}

impl FeatureSummary {
    pub fn from_values(feature: &str, values: Vec<f64>, missing: usize) -> Self {
        if values.is_empty() {
            return Self {
                feature: feature.to_string(),
                min: None,
                max: None,
                mean: None,
                median: None,
                std: None,
                missing,
            };
        }

        let n = values.len();
        let data = Data::new(values);

        Self {
            feature: feature.to_string(),
            min: Some(data.min()),
            max: Some(data.max()),
            mean: data.mean(),
            median: Some(data.median()),
            // Sample standard deviation, undefined for a single value
            std: if n > 1 { data.std_dev() } else { None },
            missing,
        }
    }
}

#[derive(Default)]
struct ColumnAccumulator {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
    missing: Vec<usize>,
    rows: usize,
}

impl ColumnAccumulator {
    fn slot(&mut self, name: &str) -> usize {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            return i;
        }
        self.names.push(name.to_string());
        self.values.push(Vec::new());
        // Rows of earlier patients lacked this column entirely
        self.missing.push(self.rows);
        self.names.len() - 1
    }
}

/// Summarises every covariate plus the hour column over all patients' rows.
/// Columns are listed in first-seen order.
pub fn summarize_cohort(patients: &[Patient], hours_column: &str) -> Vec<FeatureSummary> {
    let mut acc = ColumnAccumulator::default();

    for patient in patients {
        let table = patient.table();

        let hours_slot = acc.slot(hours_column);
        acc.values[hours_slot].extend_from_slice(table.hours());

        let mut seen = vec![hours_slot];
        for (col, name) in table.columns().iter().enumerate() {
            let slot = acc.slot(name);
            seen.push(slot);
            for reading in table.readings(col) {
                match reading.value {
                    Some(v) => acc.values[slot].push(v),
                    None => acc.missing[slot] += 1,
                }
            }
        }

        for slot in 0..acc.names.len() {
            if !seen.contains(&slot) {
                acc.missing[slot] += table.len();
            }
        }

        acc.rows += table.len();
    }

    acc.names
        .iter()
        .zip(acc.values)
        .zip(acc.missing)
        .map(|((name, vals), miss)| FeatureSummary::from_values(name, vals, miss))
        .collect()
}
