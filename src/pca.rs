// Principal component analysis (PCA)

use float_cmp::approx_eq;
use log::{debug, info, trace};
use ndarray::{Array1, Array2, ArrayView1};

use crate::error::AnalysisError;
use crate::linalg_backends::{BackendEigh, EighOutput, LinAlgBackendProvider};
use crate::standardize::StandardizedMatrix;

/// Loadings within this distance of the largest magnitude count as "largest"
/// when picking the loading that decides a component's sign.
const SIGN_TIE_TOLERANCE: f64 = 1e-9;

/// Result of a full-rank PCA fit on standardized data.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaResult {
    /// The rotation matrix; column `i` is principal component `i`.
    /// Shape: (n_features, k_components)
    rotation: Array2<f64>,
    /// Variance along each component (eigenvalues of the correlation matrix),
    /// descending and non-negative.
    /// Shape: (k_components)
    eigenvalues: Array1<f64>,
    /// Standardized rows projected onto the components.
    /// Shape: (n_rows, k_components)
    scores: Array2<f64>,
    feature_names: Vec<String>,
}

impl PcaResult {
    pub fn rotation(&self) -> &Array2<f64> {
        &self.rotation
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Loadings of component `index`, one weight per feature.
    pub fn component(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.n_components()).then(|| self.rotation.column(index))
    }
}

/// Eigendecomposition of the covariance of standardized data.
///
/// Ordering: components sort by descending eigenvalue. Eigenvalues within
/// `eigenvalue_tie_tolerance` of each other (relative to `max(1, |lambda|)`)
/// are ordered by the feature index of their dominant loading, lowest first.
///
/// Sign: every component is flipped so that its dominant loading (largest
/// magnitude, lowest feature index among near-equal magnitudes) is positive.
#[derive(Debug, Clone)]
pub struct PcaEngine<B: BackendEigh = LinAlgBackendProvider> {
    backend: B,
    eigenvalue_tie_tolerance: f64,
}

impl Default for PcaEngine {
    fn default() -> Self {
        Self::new(1e-10)
    }
}

impl PcaEngine {
    pub fn new(eigenvalue_tie_tolerance: f64) -> Self {
        Self::with_backend(LinAlgBackendProvider::new(), eigenvalue_tie_tolerance)
    }
}

impl<B: BackendEigh> PcaEngine<B> {
    pub fn with_backend(backend: B, eigenvalue_tie_tolerance: f64) -> Self {
        Self { backend, eigenvalue_tie_tolerance }
    }

    /// Computes all `min(n_rows, n_features)` components and the scores.
    ///
    /// # Errors
    /// `Decomposition` if the backend fails or returns non-finite values.
    pub fn fit(&self, standardized: &StandardizedMatrix) -> Result<PcaResult, AnalysisError> {
        let data = standardized.data();
        let n_samples = data.nrows();
        let n_features = data.ncols();
        if n_samples < 2 || n_features == 0 {
            return Err(AnalysisError::Validation(format!(
                "PCA needs at least 2 rows and 1 feature, got {}x{}",
                n_samples, n_features
            )));
        }

        let mut cov_matrix = data.t().dot(data);
        cov_matrix /= (n_samples - 1) as f64;

        let EighOutput { eigenvalues, eigenvectors } = self.backend.eigh_upper(&cov_matrix)?;
        if eigenvalues.len() != n_features || eigenvectors.dim() != (n_features, n_features) {
            return Err(AnalysisError::Decomposition(format!(
                "backend returned {} eigenvalues and a {:?} eigenvector matrix for {} features",
                eigenvalues.len(),
                eigenvectors.dim(),
                n_features
            )));
        }
        if eigenvalues.iter().chain(eigenvectors.iter()).any(|v| !v.is_finite()) {
            return Err(AnalysisError::Decomposition(
                "backend returned non-finite eigenvalues or eigenvectors".to_string(),
            ));
        }

        let mut eig_pairs: Vec<(f64, Array1<f64>)> = Vec::with_capacity(n_features);
        let mut dominant: Vec<usize> = Vec::with_capacity(n_features);
        for (&val, col) in eigenvalues.iter().zip(eigenvectors.columns()) {
            let mut eig_vec = col.to_owned();
            let norm = eig_vec.dot(&eig_vec).sqrt();
            if norm <= 1e-12 {
                return Err(AnalysisError::Decomposition("backend returned a zero eigenvector".to_string()));
            }
            eig_vec.mapv_inplace(|x| x / norm);
            dominant.push(fix_sign(&mut eig_vec));
            eig_pairs.push((val.max(0.0), eig_vec));
        }

        let order = self.component_order(&eig_pairs, &dominant);
        let final_rank = n_samples.min(n_features);
        trace!("Component order from backend indices: {:?}", order);

        let mut rotation = Array2::<f64>::zeros((n_features, final_rank));
        let mut sorted_eigenvalues = Vec::with_capacity(final_rank);
        for (i, &src) in order.iter().take(final_rank).enumerate() {
            let (val, vec) = &eig_pairs[src];
            sorted_eigenvalues.push(*val);
            rotation.column_mut(i).assign(vec);
        }
        let scores = data.dot(&rotation);

        info!(
            "PCA ({} backend) kept {} of {} components for {} rows.",
            self.backend.name(),
            final_rank,
            n_features,
            n_samples
        );
        debug!("Eigenvalues: {:?}", sorted_eigenvalues);

        Ok(PcaResult {
            rotation,
            eigenvalues: Array1::from(sorted_eigenvalues),
            scores,
            feature_names: standardized.feature_names().to_vec(),
        })
    }

    /// Indices into `eig_pairs` in output order.
    fn component_order(&self, eig_pairs: &[(f64, Array1<f64>)], dominant: &[usize]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..eig_pairs.len()).collect();
        // Stable, so exact ties keep backend order until regrouped below.
        order.sort_by(|&a, &b| eig_pairs[b].0.total_cmp(&eig_pairs[a].0));

        let mut start = 0;
        while start < order.len() {
            let anchor = eig_pairs[order[start]].0;
            let mut end = start + 1;
            while end < order.len() && self.is_tie(anchor, eig_pairs[order[end]].0) {
                end += 1;
            }
            if end - start > 1 {
                order[start..end].sort_by_key(|&idx| dominant[idx]);
            }
            start = end;
        }
        order
    }

    fn is_tie(&self, a: f64, b: f64) -> bool {
        let margin = self.eigenvalue_tie_tolerance * a.abs().max(b.abs()).max(1.0);
        approx_eq!(f64, a, b, epsilon = margin)
    }
}

/// Flips `component` so its dominant loading is positive; returns that loading's index.
fn fix_sign(component: &mut Array1<f64>) -> usize {
    let max_abs = component.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    let dominant = component
        .iter()
        .position(|x| x.abs() >= max_abs - SIGN_TIE_TOLERANCE)
        .unwrap_or(0);
    if component[dominant] < 0.0 {
        component.mapv_inplace(|x| -x);
    }
    dominant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThreadSafeStdError;
    use crate::standardize::Standardizer;
    use crate::table::TableLoader;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn standardized_from_csv(text: &str) -> StandardizedMatrix {
        let table = TableLoader::default().load(text.as_bytes()).unwrap();
        Standardizer::default().standardize(&table).unwrap()
    }

    fn random_standardized(n_samples: usize, n_features: usize, seed: u64) -> StandardizedMatrix {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let input = Array2::<f64>::random_using((n_samples, n_features), Uniform::new(-1.0, 1.0), &mut rng);
        let mut text = String::from("label");
        for j in 0..n_features {
            text.push_str(&format!(",f{}", j));
        }
        text.push('\n');
        for row in input.rows() {
            text.push('g');
            for v in row {
                text.push_str(&format!(",{:e}", v));
            }
            text.push('\n');
        }
        standardized_from_csv(&text)
    }

    fn assert_orthonormal(rotation: &Array2<f64>) {
        let k = rotation.ncols();
        for a in 0..k {
            for b in 0..k {
                let dot = rotation.column(a).dot(&rotation.column(b));
                let expected = if a == b { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(dot, expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn anti_correlated_pair_is_one_dimensional() {
        let standardized = standardized_from_csv("c,x,y\nA,1,4\nB,2,3\nA,3,2\nB,4,1\n");
        let result = PcaEngine::default().fit(&standardized).unwrap();

        assert_eq!(result.n_components(), 2);
        assert_abs_diff_eq!(result.eigenvalues()[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.eigenvalues()[1], 0.0, epsilon = 1e-12);

        // Equal-magnitude loadings: the first feature decides the sign.
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let pc1 = result.component(0).unwrap();
        assert_abs_diff_eq!(pc1[0], h, epsilon = 1e-12);
        assert_abs_diff_eq!(pc1[1], -h, epsilon = 1e-12);
        assert_orthonormal(result.rotation());
    }

    #[test]
    fn random_fit_is_orthonormal_and_descending() {
        let standardized = random_standardized(50, 7, 1337);
        let result = PcaEngine::default().fit(&standardized).unwrap();

        assert_eq!(result.n_components(), 7);
        assert_eq!(result.rotation().dim(), (7, 7));
        assert_eq!(result.scores().dim(), (50, 7));
        assert_orthonormal(result.rotation());
        let values = result.eigenvalues().to_vec();
        for w in values.windows(2) {
            assert!(w[0] >= w[1], "eigenvalues not descending: {:?}", values);
        }
        // Correlation matrix trace equals the feature count.
        assert_abs_diff_eq!(result.eigenvalues().sum(), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn scores_are_projections() {
        let standardized = random_standardized(12, 4, 7);
        let result = PcaEngine::default().fit(&standardized).unwrap();
        let expected = standardized.data().dot(result.rotation());
        for (a, b) in result.scores().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        // Score variance along each component equals its eigenvalue.
        for (i, column) in result.scores().columns().into_iter().enumerate() {
            let var = column.dot(&column) / (12.0 - 1.0);
            assert_abs_diff_eq!(var, result.eigenvalues()[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn wide_data_keeps_min_rows_features_components() {
        let standardized = random_standardized(3, 5, 42);
        let result = PcaEngine::default().fit(&standardized).unwrap();
        assert_eq!(result.n_components(), 3);
        assert_eq!(result.rotation().dim(), (5, 3));
        assert_eq!(result.scores().dim(), (3, 3));
        assert_orthonormal(result.rotation());
    }

    #[test]
    fn dominant_loading_is_positive() {
        let standardized = random_standardized(30, 5, 99);
        let result = PcaEngine::default().fit(&standardized).unwrap();
        for component in result.rotation().columns() {
            let max_abs = component.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
            let first = component.iter().find(|x| x.abs() >= max_abs - SIGN_TIE_TOLERANCE).unwrap();
            assert!(*first > 0.0, "dominant loading negative in {:?}", component);
        }
    }

    #[test]
    fn refit_is_identical() {
        let standardized = random_standardized(25, 6, 2025);
        let engine = PcaEngine::default();
        let first = engine.fit(&standardized).unwrap();
        let second = engine.fit(&standardized).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn uncorrelated_equal_variance_ties_follow_feature_order() {
        let standardized = standardized_from_csv("c,x,y\nA,1,1\nA,-1,1\nB,1,-1\nB,-1,-1\n");
        let result = PcaEngine::default().fit(&standardized).unwrap();
        assert_abs_diff_eq!(result.eigenvalues()[0], result.eigenvalues()[1], epsilon = 1e-12);
        let rotation = result.rotation();
        assert_abs_diff_eq!(rotation[[0, 0]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rotation[[1, 1]], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rotation[[0, 1]], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rotation[[1, 0]], 0.0, epsilon = 1e-12);
    }

    /// Returns a fixed decomposition regardless of input.
    struct FixedBackend;

    impl BackendEigh for FixedBackend {
        fn eigh_upper(&self, _matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
            Ok(EighOutput {
                eigenvalues: array![1.0, 3.0, 1.0 + 1e-13],
                eigenvectors: array![[0.0, -0.6, 0.8], [0.0, 0.8, 0.6], [-1.0, 0.0, 0.0]],
            })
        }
    }

    struct FailingBackend;

    impl BackendEigh for FailingBackend {
        fn eigh_upper(&self, _matrix: &Array2<f64>) -> Result<EighOutput, ThreadSafeStdError> {
            Err("no convergence".into())
        }
    }

    #[test]
    fn ordering_and_sign_rules_are_applied_to_backend_output() {
        let standardized = random_standardized(6, 3, 5);
        let result = PcaEngine::with_backend(FixedBackend, 1e-10).fit(&standardized).unwrap();

        // Largest eigenvalue first, then the tie group by dominant feature index (0 before 2).
        assert_eq!(result.eigenvalues()[0], 3.0);
        let expected = array![[-0.6, 0.8, 0.0], [0.8, 0.6, 0.0], [0.0, 0.0, 1.0]];
        // Column 2 was flipped so its dominant loading is positive.
        for (component, want) in result.rotation().columns().into_iter().zip(expected.rows()) {
            for (a, b) in component.iter().zip(want.iter()) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn backend_failure_is_a_decomposition_error() {
        let standardized = random_standardized(6, 3, 5);
        let err = PcaEngine::with_backend(FailingBackend, 1e-10).fit(&standardized).unwrap_err();
        assert!(matches!(err, AnalysisError::Decomposition(ref msg) if msg.contains("no convergence")));
    }
}
