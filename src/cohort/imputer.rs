use crate::error::{AkiError, AkiResult};
use log::warn;
use statrs::statistics::{Data, Median};

/// Fills missing cells of a row-major matrix.
pub trait Imputer {
    /// Returns a matrix of the same shape with every cell populated.
    fn impute(&self, rows: &[Vec<Option<f64>>], n_columns: usize) -> AkiResult<Vec<Vec<f64>>>;
}

/// Replaces each missing cell with the median of the observed values in its column.
#[derive(Debug, Clone)]
pub struct MedianImputer {
    empty_column_fill: f64,
}

impl Default for MedianImputer {
    fn default() -> Self {
        Self { empty_column_fill: 0.0 }
    }
}

impl MedianImputer {
    /// `empty_column_fill` is used for columns with no observed value at all.
    pub fn new(empty_column_fill: f64) -> Self {
        Self { empty_column_fill }
    }

    pub fn column_medians(&self, rows: &[Vec<Option<f64>>], n_columns: usize) -> Vec<Option<f64>> {
        (0..n_columns)
            .map(|col| {
                let observed: Vec<f64> = rows.iter().filter_map(|row| row[col]).collect();
                if observed.is_empty() {
                    None
                } else {
                    Some(Data::new(observed).median())
                }
            })
            .collect()
    }
}

impl Imputer for MedianImputer {
    fn impute(&self, rows: &[Vec<Option<f64>>], n_columns: usize) -> AkiResult<Vec<Vec<f64>>> {
        if let Some(idx) = rows.iter().position(|row| row.len() != n_columns) {
            return Err(AkiError::Validation(format!(
                "Matrix row {} has {} cells, expected {}",
                idx,
                rows[idx].len(),
                n_columns
            )));
        }

        let medians = self.column_medians(rows, n_columns);
        let empty = medians.iter().filter(|m| m.is_none()).count();
        if empty > 0 && !rows.is_empty() {
            warn!(
                "{} of {} columns have no observed values; filling with {}",
                empty, n_columns, self.empty_column_fill
            );
        }

        let fills: Vec<f64> = medians
            .into_iter()
            .map(|m| m.unwrap_or(self.empty_column_fill))
            .collect();

        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&fills)
                    .map(|(cell, &fill)| cell.unwrap_or(fill))
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_median_odd_and_even() {
        let rows = vec![
            vec![Some(1.0), Some(4.0)],
            vec![Some(9.0), None],
            vec![Some(3.0), Some(2.0)],
        ];
        let medians = MedianImputer::default().column_medians(&rows, 2);
        assert_relative_eq!(medians[0].unwrap(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(medians[1].unwrap(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_present_cells_unchanged_missing_filled() {
        let rows = vec![
            vec![Some(1.5), None, Some(-2.0)],
            vec![None, Some(10.0), Some(4.0)],
            vec![Some(2.5), Some(30.0), None],
            vec![Some(7.0), Some(20.0), Some(0.0)],
        ];
        let imputed = MedianImputer::default().impute(&rows, 3).unwrap();

        assert_eq!(imputed.len(), rows.len());
        for (original, filled) in rows.iter().zip(&imputed) {
            assert_eq!(filled.len(), 3);
            for (cell, &value) in original.iter().zip(filled) {
                if let Some(v) = cell {
                    assert_eq!(*v, value);
                }
            }
        }
        assert_relative_eq!(imputed[1][0], 2.5, epsilon = 1e-9);
        assert_relative_eq!(imputed[0][1], 20.0, epsilon = 1e-9);
        assert_relative_eq!(imputed[2][2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_all_missing_column_uses_fill() {
        let rows = vec![vec![Some(1.0), None], vec![Some(2.0), None]];
        let imputed = MedianImputer::new(-1.0).impute(&rows, 2).unwrap();
        assert_eq!(imputed[0][1], -1.0);
        assert_eq!(imputed[1][1], -1.0);
    }

    #[test]
    fn test_empty_matrix() {
        let imputed = MedianImputer::default().impute(&[], 4).unwrap();
        assert!(imputed.is_empty());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![Some(1.0)], vec![Some(1.0), Some(2.0)]];
        assert!(MedianImputer::default().impute(&rows, 2).is_err());
    }
}
