//! Row-major and column-major matrices built from aligned columns.

use serde::{Deserialize, Serialize};

use super::{AlignedColumns, ColumnValues};
use crate::error::{Result, TabstatError};

/// Memory layout of a [`Matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// One inner vector per sample: `data[sample][feature]`.
    RowMajor,
    /// One inner vector per feature: `data[feature][sample]`.
    ColumnMajor,
}

impl Orientation {
    pub fn flipped(&self) -> Self {
        match self {
            Orientation::RowMajor => Orientation::ColumnMajor,
            Orientation::ColumnMajor => Orientation::RowMajor,
        }
    }
}

/// A dense numeric matrix with an explicit orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    orientation: Orientation,
    features: Vec<String>,
    data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Feature names in column order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Inner vectors: samples for row-major, features for column-major.
    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    pub fn into_data(self) -> Vec<Vec<f64>> {
        self.data
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        match self.orientation {
            Orientation::RowMajor => self.data.len(),
            Orientation::ColumnMajor => self.data.first().map_or(0, Vec::len),
        }
    }

    /// Number of features.
    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Returns the same values in the other orientation.
    pub fn transpose(&self) -> Matrix {
        let outer = match self.orientation {
            Orientation::RowMajor => self.n_features(),
            Orientation::ColumnMajor => self.n_samples(),
        };
        let mut data = vec![Vec::with_capacity(self.data.len()); outer];
        for inner in &self.data {
            for (j, value) in inner.iter().enumerate() {
                data[j].push(*value);
            }
        }
        Matrix {
            orientation: self.orientation.flipped(),
            features: self.features.clone(),
            data,
        }
    }
}

/// Builds matrices from [`AlignedColumns`] without reordering rows.
///
/// ```rust
/// use tabstat::data::{CellValue, Dataset, Role};
/// use tabstat::extract::{ColumnRequest, ExtractionMode, Extractor, MatrixBuilder};
///
/// let ds = Dataset::from_columns(vec![
///     ("a", vec![CellValue::from(1.0), CellValue::from(2.0)]),
///     ("b", vec![CellValue::from(3.0), CellValue::from(4.0)]),
/// ]);
/// let aligned = Extractor::new(ExtractionMode::Strict)
///     .extract(&ds, &[
///         ColumnRequest::numeric(Role::Variables, "a"),
///         ColumnRequest::numeric(Role::Variables, "b"),
///     ])
///     .unwrap();
/// let rows = MatrixBuilder::new(&aligned).row_major(&["a", "b"]).unwrap();
/// assert_eq!(rows.data(), &[vec![1.0, 3.0], vec![2.0, 4.0]]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MatrixBuilder<'a> {
    columns: &'a AlignedColumns,
}

impl<'a> MatrixBuilder<'a> {
    pub fn new(columns: &'a AlignedColumns) -> Self {
        Self { columns }
    }

    /// Samples × features, features in the given order.
    pub fn row_major<S: AsRef<str>>(&self, features: &[S]) -> Result<Matrix> {
        let vectors = self.feature_vectors(features)?;
        let data = (0..self.columns.len())
            .map(|i| vectors.iter().map(|v| v[i]).collect())
            .collect();
        Ok(Matrix {
            orientation: Orientation::RowMajor,
            features: feature_names(features),
            data,
        })
    }

    /// Features × samples, each vector in original row order.
    pub fn column_major<S: AsRef<str>>(&self, features: &[S]) -> Result<Matrix> {
        let data = self
            .feature_vectors(features)?
            .into_iter()
            .map(<[f64]>::to_vec)
            .collect();
        Ok(Matrix {
            orientation: Orientation::ColumnMajor,
            features: feature_names(features),
            data,
        })
    }

    /// Builds in whichever orientation is requested.
    pub fn build<S: AsRef<str>>(&self, features: &[S], orientation: Orientation) -> Result<Matrix> {
        match orientation {
            Orientation::RowMajor => self.row_major(features),
            Orientation::ColumnMajor => self.column_major(features),
        }
    }

    fn feature_vectors<S: AsRef<str>>(&self, features: &[S]) -> Result<Vec<&'a [f64]>> {
        if features.is_empty() {
            return Err(TabstatError::validation("at least one feature is required"));
        }
        let columns: &'a AlignedColumns = self.columns;
        features
            .iter()
            .map(|feature| {
                let name = feature.as_ref();
                let column = columns
                    .columns()
                    .iter()
                    .find(|c| c.name == name)
                    .ok_or_else(|| {
                        TabstatError::validation(format!(
                            "feature '{name}' was not extracted"
                        ))
                    })?;
                match &column.values {
                    ColumnValues::Numeric(v) => Ok(v.as_slice()),
                    ColumnValues::Categorical(_) => Err(TabstatError::validation(format!(
                        "feature '{name}' must be numeric"
                    ))),
                }
            })
            .collect()
    }
}

fn feature_names<S: AsRef<str>>(features: &[S]) -> Vec<String> {
    features.iter().map(|f| f.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CellValue, Dataset, Role};
    use crate::extract::{ColumnRequest, ExtractionMode, Extractor};

    fn aligned() -> AlignedColumns {
        let ds = Dataset::from_columns(vec![
            ("a", vec![CellValue::from(1.0), CellValue::from(2.0), CellValue::from(3.0)]),
            ("b", vec![CellValue::from(4.0), CellValue::Empty, CellValue::from(6.0)]),
            ("g", vec![CellValue::from("x"), CellValue::from("y"), CellValue::from("z")]),
        ]);
        Extractor::new(ExtractionMode::Filtering)
            .extract(
                &ds,
                &[
                    ColumnRequest::numeric(Role::Variables, "a"),
                    ColumnRequest::numeric(Role::Variables, "b"),
                    ColumnRequest::categorical(Role::Group, "g"),
                ],
            )
            .unwrap()
    }

    #[test]
    fn test_row_major_follows_feature_order() {
        let cols = aligned();
        let m = MatrixBuilder::new(&cols).row_major(&["b", "a"]).unwrap();
        assert_eq!(m.orientation(), Orientation::RowMajor);
        assert_eq!(m.data(), &[vec![4.0, 1.0], vec![6.0, 3.0]]);
        assert_eq!(m.n_samples(), 2);
        assert_eq!(m.n_features(), 2);
    }

    #[test]
    fn test_column_major_and_transpose() {
        let cols = aligned();
        let builder = MatrixBuilder::new(&cols);
        let cm = builder.column_major(&["a", "b"]).unwrap();
        assert_eq!(cm.data(), &[vec![1.0, 3.0], vec![4.0, 6.0]]);
        assert_eq!(builder.row_major(&["a", "b"]).unwrap().transpose(), cm);
        assert_eq!(cm.transpose().transpose(), cm);
    }

    #[test]
    fn test_rejects_bad_features() {
        let cols = aligned();
        let builder = MatrixBuilder::new(&cols);
        let empty: [&str; 0] = [];
        assert!(builder.row_major(&empty).is_err());
        assert!(builder.row_major(&["missing"]).is_err());
        assert!(builder.column_major(&["g"]).is_err());
    }
}
