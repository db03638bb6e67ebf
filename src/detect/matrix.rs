use crate::detect::DetectError;
use serde_json::Value;

/// A rectangular block of sensor readings: one row per time step, one column per feature.
///
/// Construction validates shape and values, so every `SensorMatrix` in hand is
/// non-empty, rectangular and finite.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMatrix {
    rows: Vec<Vec<f64>>,
    width: usize,
}

impl SensorMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, DetectError> {
        let width = match rows.first() {
            None => return Err(DetectError::EmptyMatrix),
            Some(first) => first.len(),
        };

        for (i, row) in rows.iter().enumerate() {
            if row.is_empty() {
                return Err(DetectError::EmptyRow { row: i });
            }
            if row.len() != width {
                return Err(DetectError::RaggedRow {
                    row: i,
                    expected: width,
                    found: row.len(),
                });
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(DetectError::NonFinite { row: i, column: j });
            }
        }

        Ok(Self { rows, width })
    }

    /// Parse an arbitrary JSON value (`[[f1, f2, ...], ...]`) into a matrix.
    pub fn from_json(value: &Value) -> Result<Self, DetectError> {
        let outer = value.as_array().ok_or(DetectError::NotAMatrix)?;

        let mut rows = Vec::with_capacity(outer.len());
        for (i, row) in outer.iter().enumerate() {
            let cells = row
                .as_array()
                .ok_or(DetectError::NonNumeric { row: i, column: 0 })?;
            let mut parsed = Vec::with_capacity(cells.len());
            for (j, cell) in cells.iter().enumerate() {
                let v = cell
                    .as_f64()
                    .ok_or(DetectError::NonNumeric { row: i, column: j })?;
                parsed.push(v);
            }
            rows.push(parsed);
        }

        Self::new(rows)
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Number of features per time step.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Iterate every value in row-major order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flat_map(|r| r.iter().copied())
    }

    pub fn value_count(&self) -> usize {
        self.rows.len() * self.width
    }

    /// Apply a per-column transform, re-validating the result.
    pub fn map_columns<F>(&self, f: F) -> Result<Self, DetectError>
    where
        F: Fn(usize, f64) -> f64,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| row.iter().enumerate().map(|(j, &v)| f(j, v)).collect())
            .collect();
        Self::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rectangular_matrix_accepted() {
        let m = SensorMatrix::new(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.width(), 2);
        assert_eq!(m.value_count(), 6);
        assert_eq!(m.values().sum::<f64>(), 21.0);
    }

    #[test]
    fn test_empty_matrix_rejected() {
        assert_eq!(SensorMatrix::new(vec![]), Err(DetectError::EmptyMatrix));
        assert_eq!(
            SensorMatrix::new(vec![vec![]]),
            Err(DetectError::EmptyRow { row: 0 })
        );
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        let err = SensorMatrix::new(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            DetectError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = SensorMatrix::new(vec![vec![1.0, f64::NAN]]).unwrap_err();
        assert_eq!(err, DetectError::NonFinite { row: 0, column: 1 });
        assert!(SensorMatrix::new(vec![vec![f64::INFINITY]]).is_err());
    }

    #[test]
    fn test_from_json_reports_non_numeric_cell() {
        let err = SensorMatrix::from_json(&json!([[1.0, 2.0], [3.0, "x"]])).unwrap_err();
        assert_eq!(err, DetectError::NonNumeric { row: 1, column: 1 });

        let err = SensorMatrix::from_json(&json!([1.0, 2.0])).unwrap_err();
        assert_eq!(err, DetectError::NonNumeric { row: 0, column: 0 });

        assert_eq!(
            SensorMatrix::from_json(&json!("nope")),
            Err(DetectError::NotAMatrix)
        );
        assert_eq!(
            SensorMatrix::from_json(&json!({ "rows": [[1.0]] })),
            Err(DetectError::NotAMatrix)
        );
        assert_eq!(
            SensorMatrix::from_json(&json!([])),
            Err(DetectError::EmptyMatrix)
        );
    }

    #[test]
    fn test_from_json_accepts_integers() {
        let m = SensorMatrix::from_json(&json!([[0, 1, 2]])).unwrap();
        assert_eq!(m.rows(), &[vec![0.0, 1.0, 2.0]]);
    }
}
