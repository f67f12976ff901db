// src/linalg_backends.rs

use ndarray::{Array1, Array2};

use crate::error::ThreadSafeStdError;

/// Output of a symmetric eigendecomposition.
#[derive(Debug)]
pub struct EighOutput {
    /// Eigenvalues in whatever order the backend produced them.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Trait for symmetric eigendecomposition (similar to LAPACK's DSYEVR or DSYEVD).
/// Implementers will typically expect `matrix` to be symmetric.
pub trait BackendEigh {
    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError>;

    /// Short name used in log lines.
    fn name(&self) -> &'static str {
        "custom"
    }
}

fn check_square(matrix: &Array2<f64>) -> Result<(), ThreadSafeStdError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(format!(
            "Matrix must be square for eigendecomposition, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        )
        .into());
    }
    Ok(())
}

// --- NalgebraLinAlgBackend: pure-Rust default ---

#[derive(Debug, Default, Copy, Clone)]
pub struct NalgebraLinAlgBackend;

impl BackendEigh for NalgebraLinAlgBackend {
    fn name(&self) -> &'static str {
        "nalgebra"
    }

    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
        check_square(matrix)?;
        let n = matrix.nrows();
        if n == 0 {
            return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
        }
        // Mirror the upper triangle so only it is read, as with LAPACK's UPLO::Upper.
        let symmetric = nalgebra::DMatrix::from_fn(n, n, |i, j| {
            if i <= j { matrix[[i, j]] } else { matrix[[j, i]] }
        });
        // max_niter = 0 lets the QR iteration run until convergence.
        let eig = nalgebra::SymmetricEigen::try_new(symmetric, f64::EPSILON, 0)
            .ok_or("Symmetric eigendecomposition did not converge.")?;
        Ok(EighOutput {
            eigenvalues: Array1::from_iter(eig.eigenvalues.iter().copied()),
            eigenvectors: Array2::from_shape_fn((n, n), |(i, j)| eig.eigenvectors[(i, j)]),
        })
    }
}

// --- NdarrayLinAlgBackend: LAPACK through ndarray-linalg ---

#[cfg(feature = "lapack")]
mod lapack_specific_code {
    use super::{check_square, BackendEigh, EighOutput, ThreadSafeStdError};
    use ndarray::{Array1, Array2};
    use ndarray_linalg::{Eigh as NdLinalgEigh, UPLO};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct NdarrayLinAlgBackend;

    impl BackendEigh for NdarrayLinAlgBackend {
        fn name(&self) -> &'static str {
            "ndarray-linalg"
        }

        fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
            check_square(matrix)?;
            if matrix.is_empty() {
                return Ok(EighOutput { eigenvalues: Array1::zeros(0), eigenvectors: Array2::zeros((0, 0)) });
            }
            let (eigenvalues, eigenvectors) = matrix.eigh(UPLO::Upper).map_err(|e| Box::new(e) as ThreadSafeStdError)?;
            Ok(EighOutput { eigenvalues, eigenvectors })
        }
    }
}

#[cfg(feature = "lapack")]
pub use self::lapack_specific_code::NdarrayLinAlgBackend;

// --- LinAlgBackendProvider Dispatch ---

/// Dispatches to the backend selected by compile-time feature flags:
/// LAPACK when one of the `backend_*` features is on, nalgebra otherwise.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider;

impl LinAlgBackendProvider {
    pub fn new() -> Self {
        Self
    }
}

impl BackendEigh for LinAlgBackendProvider {
    fn name(&self) -> &'static str {
        #[cfg(feature = "lapack")]
        {
            NdarrayLinAlgBackend.name()
        }
        #[cfg(not(feature = "lapack"))]
        {
            NalgebraLinAlgBackend.name()
        }
    }

    fn eigh_upper(&self, matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
        #[cfg(feature = "lapack")]
        {
            NdarrayLinAlgBackend.eigh_upper(matrix)
        }
        #[cfg(not(feature = "lapack"))]
        {
            NalgebraLinAlgBackend.eigh_upper(matrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn assert_decomposes(backend: &dyn BackendEigh, matrix: &Array2<f64>) {
        let EighOutput { eigenvalues, eigenvectors } = backend.eigh_upper(matrix).unwrap();
        let n = matrix.nrows();
        assert_eq!(eigenvalues.len(), n);
        assert_eq!(eigenvectors.dim(), (n, n));
        for i in 0..n {
            let v = eigenvectors.column(i);
            let av = matrix.dot(&v);
            for r in 0..n {
                assert_abs_diff_eq!(av[r], eigenvalues[i] * v[r], epsilon = 1e-10);
            }
            assert_abs_diff_eq!(v.dot(&v), 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn nalgebra_backend_decomposes_symmetric_matrix() {
        let matrix = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.25], [0.5, 0.25, 2.0]];
        assert_decomposes(&NalgebraLinAlgBackend, &matrix);
    }

    #[test]
    fn provider_decomposes_symmetric_matrix() {
        let matrix = array![[1.0, -1.0], [-1.0, 1.0]];
        assert_decomposes(&LinAlgBackendProvider::new(), &matrix);
        let mut values = LinAlgBackendProvider::new().eigh_upper(&matrix).unwrap().eigenvalues.to_vec();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(values[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn only_upper_triangle_is_read() {
        let upper_only = array![[2.0, 1.0], [0.0, 2.0]];
        let mut values = NalgebraLinAlgBackend.eigh_upper(&upper_only).unwrap().eigenvalues.to_vec();
        values.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(values[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn non_square_input_is_an_error() {
        let matrix = Array2::<f64>::zeros((2, 3));
        assert!(LinAlgBackendProvider::new().eigh_upper(&matrix).is_err());
    }
}
