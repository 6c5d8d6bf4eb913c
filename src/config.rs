use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{AkiError, AkiResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub columns: ColumnConfig,
    pub detection: DetectionConfig,
    pub windows: WindowConfig,
    pub imputation: ImputationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub creatinine: String,
    pub hours: String,
    pub missing_tokens: Vec<String>,
}

/// AKI criteria thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub absolute_window_hours: f64,   // Condition 1 baseline window
    pub absolute_rise: f64,           // mg/dL above baseline
    pub relative_window_hours: f64,   // Condition 2 baseline window
    pub relative_rise: f64,           // multiple of baseline
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub rows_per_step: usize,
    pub count: usize,
    pub lookahead_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationConfig {
    pub empty_column_fill: f64, // Used when a column has no observed values
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            creatinine: "Creatinine".to_string(),
            hours: "Hours_Since_Admission".to_string(),
            missing_tokens: ["", "NaN", "nan", "NA", "N/A"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            absolute_window_hours: 48.0,
            absolute_rise: 0.3,
            relative_window_hours: 168.0,
            relative_rise: 1.5,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            rows_per_step: 23,
            count: 3,
            lookahead_hours: 24.0,
        }
    }
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self { empty_column_fill: 0.0 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> AkiResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AkiResult<()> {
        if self.columns.creatinine.is_empty() || self.columns.hours.is_empty() {
            return Err(AkiError::InvalidConfig(
                "Column names must not be empty".to_string()
            ));
        }

        if self.columns.creatinine == self.columns.hours {
            return Err(AkiError::InvalidConfig(
                "Creatinine and hours columns must differ".to_string()
            ));
        }

        self.validate_detection()?;
        self.validate_windows()?;

        if !self.imputation.empty_column_fill.is_finite() {
            return Err(AkiError::InvalidConfig(
                "Empty column fill value must be finite".to_string()
            ));
        }

        Ok(())
    }

    fn validate_detection(&self) -> AkiResult<()> {
        let d = &self.detection;

        for (name, hours) in [
            ("absolute_window_hours", d.absolute_window_hours),
            ("relative_window_hours", d.relative_window_hours),
        ] {
            if !hours.is_finite() || hours <= 0.0 {
                return Err(AkiError::InvalidConfig(
                    format!("{} must be positive, got {}", name, hours)
                ));
            }
        }

        if !d.absolute_rise.is_finite() || d.absolute_rise <= 0.0 {
            return Err(AkiError::InvalidConfig(
                "absolute_rise must be positive".to_string()
            ));
        }

        // A relative rise of 1.0 or less would fire on every reading
        if !d.relative_rise.is_finite() || d.relative_rise <= 1.0 {
            return Err(AkiError::InvalidConfig(
                "relative_rise must be greater than 1.0".to_string()
            ));
        }

        Ok(())
    }

    fn validate_windows(&self) -> AkiResult<()> {
        let w = &self.windows;

        if w.rows_per_step == 0 {
            return Err(AkiError::InvalidConfig(
                "rows_per_step must be at least 1".to_string()
            ));
        }

        if w.count == 0 {
            return Err(AkiError::InvalidConfig(
                "At least one observation window must be requested".to_string()
            ));
        }

        if !w.lookahead_hours.is_finite() || w.lookahead_hours <= 0.0 {
            return Err(AkiError::InvalidConfig(
                "lookahead_hours must be positive".to_string()
            ));
        }

        Ok(())
    }
}
