// src/standardize.rs

use log::{debug, info};
use ndarray::{Array1, Array2};

use crate::error::AnalysisError;
use crate::table::Table;

/// Feature matrix after per-column z-scoring.
///
/// Every column has mean ~0 and sample standard deviation ~1.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedMatrix {
    /// Shape: (n_rows, n_features)
    data: Array2<f64>,
    /// Column means of the raw features. Shape: (n_features)
    means: Array1<f64>,
    /// Sample standard deviations (ddof = 1) of the raw features. Shape: (n_features)
    std_devs: Array1<f64>,
    feature_names: Vec<String>,
}

impl StandardizedMatrix {
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn std_devs(&self) -> &Array1<f64> {
        &self.std_devs
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }
}

/// Standardizes each feature column to zero mean and unit sample variance.
#[derive(Debug, Clone, Copy)]
pub struct Standardizer {
    zero_variance_tolerance: f64,
}

impl Default for Standardizer {
    fn default() -> Self {
        Self::new(1e-12)
    }
}

impl Standardizer {
    pub fn new(zero_variance_tolerance: f64) -> Self {
        Self { zero_variance_tolerance }
    }

    /// Centers every column on its mean and scales it by its sample standard
    /// deviation (denominator `n_rows - 1`).
    ///
    /// # Errors
    /// - `Validation` if the table has fewer than two rows.
    /// - `DegenerateColumn` naming the first column whose standard deviation is
    ///   at most `zero_variance_tolerance * max(1, |mean|)`.
    /// - `Validation` if a column's mean or standard deviation overflows `f64`.
    pub fn standardize(&self, table: &Table) -> Result<StandardizedMatrix, AnalysisError> {
        let n_rows = table.n_rows();
        let n_features = table.n_features();
        info!("Standardizing {} feature columns over {} rows.", n_features, n_rows);

        if n_rows < 2 {
            return Err(AnalysisError::Validation(format!(
                "at least 2 rows are required to standardize features, got {}",
                n_rows
            )));
        }

        let n = n_rows as f64;
        let mut data = table.features().clone();
        let mut means = Array1::<f64>::zeros(n_features);
        let mut std_devs = Array1::<f64>::zeros(n_features);
        for (j, mut column) in data.columns_mut().into_iter().enumerate() {
            let name = &table.feature_names()[j];
            // Work in units of the largest magnitude so sums of squares stay finite.
            let scale = column.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
            if scale == 0.0 {
                debug!("Column '{}' is all zeros.", name);
                return Err(AnalysisError::DegenerateColumn { column: name.clone() });
            }
            column.mapv_inplace(|v| v / scale);
            let scaled_mean = column.sum() / n;
            column -= scaled_mean;
            let scaled_std = (column.iter().map(|v| v * v).sum::<f64>() / (n - 1.0)).sqrt();

            // std <= tol * max(1, |mean|), divided through by `scale`.
            if !(scaled_std > self.zero_variance_tolerance * (1.0 / scale).max(scaled_mean.abs())) {
                debug!("Column '{}' has std {:e} around mean {:e}.", name, scaled_std * scale, scaled_mean * scale);
                return Err(AnalysisError::DegenerateColumn { column: name.clone() });
            }
            let (mean, std_dev) = (scaled_mean * scale, scaled_std * scale);
            if !mean.is_finite() || !std_dev.is_finite() {
                return Err(AnalysisError::Validation(format!(
                    "column '{}' has a mean or standard deviation outside the f64 range",
                    name
                )));
            }
            column /= scaled_std;
            means[j] = mean;
            std_devs[j] = std_dev;
        }

        debug!("Column means: {:?}", means);
        debug!("Column standard deviations: {:?}", std_devs);

        Ok(StandardizedMatrix {
            data,
            means,
            std_devs,
            feature_names: table.feature_names().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::TableLoader;
    use approx::assert_abs_diff_eq;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn table_from_matrix(matrix: &Array2<f64>) -> Table {
        let mut text = String::from("label");
        for j in 0..matrix.ncols() {
            text.push_str(&format!(",f{}", j));
        }
        text.push('\n');
        for (i, row) in matrix.rows().into_iter().enumerate() {
            text.push_str(&format!("L{}", i % 3));
            for v in row {
                text.push_str(&format!(",{:e}", v));
            }
            text.push('\n');
        }
        TableLoader::default().load(text.as_bytes()).unwrap()
    }

    fn assert_standardized(matrix: &StandardizedMatrix) {
        let n = matrix.n_rows() as f64;
        for column in matrix.data().columns() {
            let mean = column.sum() / n;
            let std = (column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(std, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn simple_columns() {
        let table = TableLoader::default()
            .load(b"c,x,y\nA,1,4\nB,2,3\nA,3,2\nB,4,1\n")
            .unwrap();
        let standardized = Standardizer::default().standardize(&table).unwrap();
        assert_standardized(&standardized);
        assert_abs_diff_eq!(standardized.means()[0], 2.5, epsilon = 1e-12);
        // sample std of [1, 2, 3, 4] is sqrt(5/3)
        assert_abs_diff_eq!(standardized.std_devs()[0], (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(standardized.data()[[0, 0]], -1.5 / (5.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_eq!(standardized.feature_names(), &["x", "y"]);
    }

    #[test]
    fn random_columns_with_offsets_and_scales() {
        let mut rng = ChaCha8Rng::seed_from_u64(1926);
        let mut input = Array2::<f64>::random_using((40, 6), Uniform::new(-1.0, 1.0), &mut rng);
        for (j, mut column) in input.columns_mut().into_iter().enumerate() {
            let scale = 10f64.powi(j as i32 - 2);
            column.mapv_inplace(|v| v * scale + 1000.0 * j as f64);
        }
        let standardized = Standardizer::default()
            .standardize(&table_from_matrix(&input))
            .unwrap();
        assert_standardized(&standardized);
    }

    #[test]
    fn constant_column_is_degenerate() {
        let table = TableLoader::default()
            .load(b"c,x,flat\nA,1,0.1\nB,2,0.1\nA,3,0.1\n")
            .unwrap();
        match Standardizer::default().standardize(&table) {
            Err(AnalysisError::DegenerateColumn { column }) => assert_eq!(column, "flat"),
            other => panic!("expected a degenerate column error, got {:?}", other),
        }
    }

    #[test]
    fn huge_finite_values_standardize() {
        let table = TableLoader::default()
            .load(b"c,x,y\nA,1e200,1\nB,-1e200,2\nA,3e200,4\nB,0,3\n")
            .unwrap();
        let standardized = Standardizer::default().standardize(&table).unwrap();
        assert_standardized(&standardized);
        assert!(standardized.std_devs()[0].is_finite());
        assert_abs_diff_eq!(standardized.means()[0], 0.75e200, epsilon = 1e188);

        let table = TableLoader::default()
            .load(b"c,x\nA,1.5e308\nB,1.7e308\nA,1.6e308\nB,1.55e308\n")
            .unwrap();
        let standardized = Standardizer::default().standardize(&table).unwrap();
        assert_standardized(&standardized);
        assert!(standardized.means()[0].is_finite());
    }

    #[test]
    fn unrepresentable_spread_is_rejected() {
        let table = TableLoader::default()
            .load(b"c,x\nA,1.7e308\nB,-1.7e308\n")
            .unwrap();
        let err = Standardizer::default().standardize(&table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("'x'"), "{}", err);
    }

    #[test]
    fn single_row_is_rejected() {
        let table = TableLoader::default().load(b"c,x\nA,1\n").unwrap();
        let err = Standardizer::default().standardize(&table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
