pub mod reader;

use crate::error::{AkiError, AkiResult};

pub use reader::*;

/// A single timestamped measurement. `value` is `None` when the cell was missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub hour: f64,
    pub value: Option<f64>,
}

/// Hour-indexed covariate rows for one patient, one row per admitted hour.
///
/// The hour column is held apart from the covariates so that aggregation
/// never averages it.
#[derive(Debug, Clone)]
pub struct CovariateTable {
    columns: Vec<String>,
    hours: Vec<f64>,
    rows: Vec<Vec<Option<f64>>>,
}

impl CovariateTable {
    pub fn new(columns: Vec<String>, hours: Vec<f64>, rows: Vec<Vec<Option<f64>>>) -> AkiResult<Self> {
        if hours.len() != rows.len() {
            return Err(AkiError::Validation(format!(
                "Covariate table has {} hours but {} rows",
                hours.len(),
                rows.len()
            )));
        }

        if let Some(idx) = rows.iter().position(|row| row.len() != columns.len()) {
            return Err(AkiError::Validation(format!(
                "Row {} has {} cells, expected {}",
                idx,
                rows[idx].len(),
                columns.len()
            )));
        }

        Ok(Self { columns, hours, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn hours(&self) -> &[f64] {
        &self.hours
    }

    pub fn hour(&self, row: usize) -> Option<f64> {
        self.hours.get(row).copied()
    }

    /// Readings of one covariate column, in row order.
    pub fn readings(&self, column: usize) -> impl Iterator<Item = Reading> + '_ {
        self.hours
            .iter()
            .zip(&self.rows)
            .map(move |(&hour, row)| Reading { hour, value: row[column] })
    }

    /// Column-wise mean over rows `0..=end`, skipping missing cells.
    /// A column with no observed value in that prefix stays missing.
    pub fn prefix_means(&self, end: usize) -> Vec<Option<f64>> {
        let end = end.min(self.rows.len().saturating_sub(1));
        let mut sums = vec![0.0; self.columns.len()];
        let mut counts = vec![0usize; self.columns.len()];

        for row in self.rows.iter().take(end + 1) {
            for (col, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    sums[col] += value;
                    counts[col] += 1;
                }
            }
        }

        sums.into_iter()
            .zip(counts)
            .map(|(sum, n)| if n == 0 { None } else { Some(sum / n as f64) })
            .collect()
    }
}

/// One patient's record: the full covariate table plus the creatinine
/// subsequence with missing values dropped.
#[derive(Debug, Clone)]
pub struct Patient {
    pub id: String,
    table: CovariateTable,
    creatinine: Vec<Reading>,
}

impl Patient {
    pub fn new(id: impl Into<String>, table: CovariateTable, creatinine_column: &str) -> AkiResult<Self> {
        let id = id.into();

        let col = table.column_index(creatinine_column).ok_or_else(|| AkiError::MissingColumn {
            column: creatinine_column.to_string(),
            source_name: id.clone(),
        })?;

        // Hours must be non-decreasing; everything downstream relies on it
        for pair in table.hours().windows(2) {
            if !(pair[1] >= pair[0]) {
                return Err(AkiError::UnorderedHours {
                    patient: id,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        let creatinine = table.readings(col).filter(|r| r.value.is_some()).collect();

        Ok(Self { id, table, creatinine })
    }

    pub fn table(&self) -> &CovariateTable {
        &self.table
    }

    pub fn creatinine(&self) -> &[Reading] {
        &self.creatinine
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Table with a creatinine column and one other covariate, one row per hour.
    pub(crate) fn table_from(hours: &[f64], creatinine: &[Option<f64>], heart_rate: &[Option<f64>]) -> CovariateTable {
        let rows = creatinine
            .iter()
            .zip(heart_rate)
            .map(|(&c, &h)| vec![c, h])
            .collect();
        CovariateTable::new(
            vec!["Creatinine".to_string(), "HR".to_string()],
            hours.to_vec(),
            rows,
        )
        .unwrap()
    }

    #[test]
    fn test_creatinine_subsequence_drops_missing() {
        let table = table_from(
            &[0.0, 1.0, 2.0, 3.0],
            &[Some(1.0), None, Some(1.2), None],
            &[Some(80.0), Some(82.0), None, Some(90.0)],
        );
        let patient = Patient::new("p1", table, "Creatinine").unwrap();

        let hours: Vec<f64> = patient.creatinine().iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![0.0, 2.0]);
        assert_eq!(patient.table().len(), 4);
    }

    #[test]
    fn test_missing_creatinine_column() {
        let table = CovariateTable::new(vec!["HR".to_string()], vec![0.0], vec![vec![Some(70.0)]]).unwrap();
        let err = Patient::new("p2", table, "Creatinine").unwrap_err();
        assert!(matches!(err, AkiError::MissingColumn { .. }));
    }

    #[test]
    fn test_unordered_hours_rejected() {
        let table = table_from(&[0.0, 5.0, 3.0], &[Some(1.0); 3], &[None; 3]);
        let err = Patient::new("p3", table, "Creatinine").unwrap_err();
        match err {
            AkiError::UnorderedHours { previous, current, .. } => {
                assert_eq!(previous, 5.0);
                assert_eq!(current, 3.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_prefix_means_skip_missing() {
        let table = table_from(
            &[0.0, 1.0, 2.0],
            &[Some(1.0), None, Some(2.0)],
            &[None, None, Some(90.0)],
        );

        let first_two = table.prefix_means(1);
        assert_relative_eq!(first_two[0].unwrap(), 1.0);
        assert_eq!(first_two[1], None);

        let all = table.prefix_means(2);
        assert_relative_eq!(all[0].unwrap(), 1.5);
        assert_relative_eq!(all[1].unwrap(), 90.0);

        // Past-the-end is clipped to the last row
        assert_eq!(table.prefix_means(10), all);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = CovariateTable::new(
            vec!["A".to_string(), "B".to_string()],
            vec![0.0],
            vec![vec![Some(1.0)]],
        );
        assert!(result.is_err());
    }
}
