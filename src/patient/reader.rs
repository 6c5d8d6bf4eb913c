use super::{CovariateTable, Patient};
use crate::config::ColumnConfig;
use crate::error::{AkiError, AkiResult};
use log::debug;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Reads one-file-per-patient CSV exports into [`Patient`] records.
#[derive(Debug, Clone)]
pub struct PatientReader {
    columns: ColumnConfig,
}

impl PatientReader {
    pub fn new(columns: ColumnConfig) -> Self {
        Self { columns }
    }

    /// Read a patient file. The patient id is the file stem.
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> AkiResult<Patient> {
        let path = path.as_ref();
        let id = patient_id_from_path(path);
        let file = std::fs::File::open(path)?;
        self.read_from(&id, file)
    }

    pub fn read_from<R: Read>(&self, id: &str, input: R) -> AkiResult<Patient> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let hours_idx = headers
            .iter()
            .position(|h| h == self.columns.hours)
            .ok_or_else(|| AkiError::MissingColumn {
                column: self.columns.hours.clone(),
                source_name: id.to_string(),
            })?;

        let covariates: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != hours_idx)
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        let mut hours = Vec::new();
        let mut rows = Vec::new();

        for (row_num, record) in reader.records().enumerate() {
            let record = record?;

            let raw_hour = record.get(hours_idx).unwrap_or("");
            let hour = match self.parse_cell(raw_hour) {
                Some(h) if h.is_finite() && h >= 0.0 => h,
                _ => {
                    return Err(self.invalid(id, &self.columns.hours, row_num + 1, raw_hour));
                }
            };

            let mut row = Vec::with_capacity(covariates.len());
            for (idx, name) in &covariates {
                let raw = record.get(*idx).unwrap_or("");
                if self.is_missing(raw) {
                    row.push(None);
                    continue;
                }
                match self.parse_cell(raw) {
                    Some(v) => row.push(Some(v)),
                    None => return Err(self.invalid(id, name, row_num + 1, raw)),
                }
            }

            hours.push(hour);
            rows.push(row);
        }

        debug!("Read patient {} with {} rows", id, rows.len());

        let names = covariates.into_iter().map(|(_, name)| name).collect();
        let table = CovariateTable::new(names, hours, rows)?;
        Patient::new(id, table, &self.columns.creatinine)
    }

    fn is_missing(&self, raw: &str) -> bool {
        self.columns.missing_tokens.iter().any(|t| t == raw)
    }

    /// Parses a numeric cell. A NaN literal in any spelling is treated as missing.
    fn parse_cell(&self, raw: &str) -> Option<f64> {
        if self.is_missing(raw) {
            return None;
        }
        raw.parse::<f64>().ok().filter(|v| !v.is_nan())
    }

    fn invalid(&self, id: &str, column: &str, row: usize, value: &str) -> AkiError {
        AkiError::InvalidValue {
            source_name: id.to_string(),
            column: column.to_string(),
            row,
            value: value.to_string(),
        }
    }
}

pub fn patient_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// All `.csv` files directly under `dir`, sorted by file name.
pub fn list_patient_files<P: AsRef<Path>>(dir: P) -> AkiResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
