use crate::cohort::{summarize_cohort, CohortAssembler, FeatureSummary, WindowDataset, WindowSummary};
use crate::config::Config;
use crate::detection::{AkiCriteria, OnsetDetector, OnsetResult};
use crate::error::{AkiError, AkiResult};
use crate::patient::{list_patient_files, Patient, PatientReader};
use crate::windows::{CohortKind, ObservationWindowBuilder, PatientWindows, WindowSpec};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Counts for one `windows` run, written next to the window tables.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub cohort: CohortKind,
    pub patients: usize,
    pub patients_with_onset: usize,
    pub windows: Vec<WindowSummary>,
}

pub struct WindowRun {
    pub datasets: Vec<WindowDataset>,
    pub summary: RunSummary,
}

/// Per-patient detection and window building, fanned out over a rayon pool.
/// Every patient is processed independently; results keep the sorted file order.
pub struct Pipeline {
    config: Config,
    reader: PatientReader,
    detector: OnsetDetector,
    builder: ObservationWindowBuilder,
}

impl Pipeline {
    pub fn new(config: Config) -> AkiResult<Self> {
        config.validate()?;

        let reader = PatientReader::new(config.columns.clone());
        let detector = OnsetDetector::new(AkiCriteria::from(&config.detection))?;
        let builder = ObservationWindowBuilder::new(WindowSpec::from(&config.windows));

        Ok(Self { config, reader, detector, builder })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn patient_files(&self, dir: &Path) -> AkiResult<Vec<PathBuf>> {
        let files = list_patient_files(dir)?;
        if files.is_empty() {
            warn!("No patient CSV files found in {:?}", dir);
        } else {
            info!("Found {} patient files in {:?}", files.len(), dir);
        }
        Ok(files)
    }

    fn read_patient(&self, path: &Path) -> AkiResult<Patient> {
        self.reader.read_path(path).map_err(|e| AkiError::PatientFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Onset result for every patient in `dir`, sorted by patient id.
    pub fn label_directory<P: AsRef<Path>>(&self, dir: P) -> AkiResult<Vec<OnsetResult>> {
        let files = self.patient_files(dir.as_ref())?;

        let mut results = files
            .par_iter()
            .map(|path| {
                let patient = self.read_patient(path)?;
                self.detector.detect_patient(&patient).map_err(|e| AkiError::PatientFile {
                    path: path.clone(),
                    source: Box::new(e),
                })
            })
            .collect::<AkiResult<Vec<_>>>()?;

        results.sort_by(|a, b| a.patient_id.cmp(&b.patient_id));

        let with_onset = results.iter().filter(|r| r.has_aki()).count();
        info!("Labeled {} patients, {} with AKI onset", results.len(), with_onset);
        Ok(results)
    }

    pub fn process_patient(&self, patient: &Patient, cohort: CohortKind) -> AkiResult<(OnsetResult, PatientWindows)> {
        let onset = self.detector.detect_patient(patient)?;
        let windows = self.builder.build(patient, &onset, cohort);
        debug!(
            "Patient {}: {} of {} windows included",
            patient.id,
            windows.included_count(),
            windows.slots.len()
        );
        Ok((onset, windows))
    }

    pub fn build_windows<P: AsRef<Path>>(&self, dir: P, cohort: CohortKind) -> AkiResult<WindowRun> {
        let files = self.patient_files(dir.as_ref())?;
        info!("Building {} observation windows", cohort.name());

        let processed = files
            .par_iter()
            .map(|path| {
                let patient = self.read_patient(path)?;
                self.process_patient(&patient, cohort).map_err(|e| AkiError::PatientFile {
                    path: path.clone(),
                    source: Box::new(e),
                })
            })
            .collect::<AkiResult<Vec<_>>>()?;

        Ok(self.collect(processed, cohort))
    }

    fn collect(&self, processed: Vec<(OnsetResult, PatientWindows)>, cohort: CohortKind) -> WindowRun {
        let mut assembler = CohortAssembler::new(self.builder.spec());
        let mut patients_with_onset = 0;

        for (onset, windows) in &processed {
            if onset.has_aki() {
                patients_with_onset += 1;
            }
            assembler.push(windows);
        }

        let datasets = assembler.finish();
        for dataset in &datasets {
            info!(
                "{}h window: {} patients ({} positive, {} excluded)",
                dataset.window_hours,
                dataset.len(),
                dataset.positives(),
                dataset.excluded
            );
        }

        let summary = RunSummary {
            generated_at: Utc::now(),
            cohort,
            patients: processed.len(),
            patients_with_onset,
            windows: datasets.iter().map(|d| d.summary()).collect(),
        };

        WindowRun { datasets, summary }
    }

    pub fn summarize<P: AsRef<Path>>(&self, dir: P) -> AkiResult<Vec<FeatureSummary>> {
        let files = self.patient_files(dir.as_ref())?;

        let patients = files
            .par_iter()
            .map(|path| self.read_patient(path))
            .collect::<AkiResult<Vec<_>>>()?;

        let rows: usize = patients.iter().map(|p| p.table().len()).sum();
        info!("Summarizing {} rows from {} patients", rows, patients.len());

        Ok(summarize_cohort(&patients, &self.config.columns.hours))
    }
}
