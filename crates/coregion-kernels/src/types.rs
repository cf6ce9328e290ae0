//! Core types for kernel evaluation.

use scirs2_core::ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::base::KernelBase;
use crate::error::{KernelError, Result};
use crate::gradient::KernelGradients;

/// Result of a kernel evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelOutput {
    /// Pairwise covariance matrix, shape (|X|, |Z|)
    Full(Array2<f64>),
    /// Per-row self-covariances, shape (|X|,)
    Diag(Array1<f64>),
}

impl KernelOutput {
    /// Whether this is the elementwise-variance form.
    pub fn is_diag(&self) -> bool {
        matches!(self, KernelOutput::Diag(_))
    }

    /// Shape of the underlying array.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            KernelOutput::Full(m) => m.shape().to_vec(),
            KernelOutput::Diag(v) => v.shape().to_vec(),
        }
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        match self {
            KernelOutput::Full(m) => m.sum(),
            KernelOutput::Diag(v) => v.sum(),
        }
    }

    /// `Σ self ⊙ weights`; both must be the same variant and shape.
    pub fn weighted_sum(&self, weights: &KernelOutput) -> Result<f64> {
        if self.shape() != weights.shape() {
            return Err(KernelError::shape_mismatch(
                "weights",
                self.shape(),
                weights.shape(),
            ));
        }
        match (self, weights) {
            (KernelOutput::Full(k), KernelOutput::Full(w)) => Ok((k * w).sum()),
            (KernelOutput::Diag(k), KernelOutput::Diag(w)) => Ok((k * w).sum()),
            _ => Err(KernelError::ComputationError(
                "weights and kernel output disagree on diag mode".to_string(),
            )),
        }
    }

    /// Unwrap the full covariance matrix.
    pub fn into_full(self) -> Result<Array2<f64>> {
        match self {
            KernelOutput::Full(m) => Ok(m),
            KernelOutput::Diag(_) => Err(KernelError::ComputationError(
                "expected full covariance matrix, got diagonal".to_string(),
            )),
        }
    }

    /// Unwrap the variance vector.
    pub fn into_diag(self) -> Result<Array1<f64>> {
        match self {
            KernelOutput::Diag(v) => Ok(v),
            KernelOutput::Full(_) => Err(KernelError::ComputationError(
                "expected diagonal, got full covariance matrix".to_string(),
            )),
        }
    }
}

/// Trait for covariance functions over batches of inputs.
///
/// Inputs are row-major batches of the *full* feature width; each kernel
/// selects its active columns through its [`KernelBase`].
pub trait Kernel: Send + Sync {
    /// Shared kernel state.
    fn base(&self) -> &KernelBase;

    /// Mutable shared kernel state (parameter updates).
    fn base_mut(&mut self) -> &mut KernelBase;

    /// Pairwise covariance `K[i, j] = k(x_i, z_j)`; `z` defaults to `x`.
    fn covariance(&self, x: ArrayView2<'_, f64>, z: Option<ArrayView2<'_, f64>>)
        -> Result<Array2<f64>>;

    /// Self-covariances `k(x_i, x_i)` without forming the full matrix.
    fn variance(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    /// Gradient of a scalar loss w.r.t. every parameter's unconstrained storage.
    ///
    /// # Arguments
    /// * `x`, `z` - The inputs of the forward evaluation
    /// * `grad_output` - `∂L/∂K`, same variant and shape as the forward output
    fn backward(
        &self,
        x: ArrayView2<'_, f64>,
        z: Option<ArrayView2<'_, f64>>,
        grad_output: &KernelOutput,
    ) -> Result<KernelGradients>;

    /// Evaluate in full (`diag = false`) or elementwise-variance mode.
    ///
    /// In diagonal mode `z` is ignored.
    fn forward(
        &self,
        x: ArrayView2<'_, f64>,
        z: Option<ArrayView2<'_, f64>>,
        diag: bool,
    ) -> Result<KernelOutput> {
        log::trace!(
            "Evaluating kernel '{}' on {:?} (diag={})",
            self.name(),
            x.dim(),
            diag
        );
        if diag {
            self.variance(x).map(KernelOutput::Diag)
        } else {
            self.covariance(x, z).map(KernelOutput::Full)
        }
    }

    /// Kernel value for a single pair of input rows.
    fn compute(&self, x: &[f64], z: &[f64]) -> Result<f64> {
        let x = ArrayView2::from_shape((1, x.len()), x)?;
        let z = ArrayView2::from_shape((1, z.len()), z)?;
        let k = self.covariance(x, Some(z))?;
        Ok(k[[0, 0]])
    }

    /// Kernel name.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Number of active features.
    fn input_dim(&self) -> usize {
        self.base().input_dim()
    }

    /// Check if kernel is positive semi-definite.
    fn is_psd(&self) -> bool {
        true
    }
}

/// Check that two batches have the same width before any product is formed.
pub(crate) fn check_same_width(
    x: &ArrayView2<'_, f64>,
    z: &ArrayView2<'_, f64>,
) -> Result<()> {
    if x.ncols() != z.ncols() {
        return Err(KernelError::shape_mismatch(
            "Z",
            vec![z.nrows(), x.ncols()],
            vec![z.nrows(), z.ncols()],
        ));
    }
    Ok(())
}

fn default_name() -> String {
    "coregionalize".to_string()
}

/// Configuration for the coregionalization kernel.
///
/// Holds the scalar construction options; tensors (components, diagonal) are
/// passed to the builder directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoregionalizeConfig {
    /// Number of feature dimensions the kernel acts on
    pub input_dim: usize,
    /// Rank of the components matrix; only used when components are sampled
    #[serde(default)]
    pub rank: Option<usize>,
    /// Columns of the full input to select
    #[serde(default)]
    pub active_dims: Option<Vec<usize>>,
    /// Kernel name
    #[serde(default = "default_name")]
    pub name: String,
    /// Seed for random initialization of the components
    #[serde(default)]
    pub seed: Option<u64>,
}

impl CoregionalizeConfig {
    /// Create configuration with the given input dimension.
    pub fn new(input_dim: usize) -> Self {
        Self {
            input_dim,
            rank: None,
            active_dims: None,
            name: default_name(),
            seed: None,
        }
    }

    /// Set rank
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Set active dimensions
    pub fn with_active_dims(mut self, active_dims: Vec<usize>) -> Self {
        self.active_dims = Some(active_dims);
        self
    }

    /// Set kernel name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray::{arr1, arr2};

    #[test]
    fn test_config_builder() {
        let config = CoregionalizeConfig::new(4)
            .with_rank(2)
            .with_active_dims(vec![1, 2, 3, 4])
            .with_name("tasks")
            .with_seed(7);

        assert_eq!(config.input_dim, 4);
        assert_eq!(config.rank, Some(2));
        assert_eq!(config.active_dims, Some(vec![1, 2, 3, 4]));
        assert_eq!(config.name, "tasks");
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_config_json_defaults() {
        let config = CoregionalizeConfig::from_json(r#"{ "input_dim": 3 }"#).unwrap();
        assert_eq!(config, CoregionalizeConfig::new(3));
        assert_eq!(config.name, "coregionalize");
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = CoregionalizeConfig::new(5).with_rank(1).with_seed(42);
        let parsed = CoregionalizeConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_json_invalid() {
        let err = CoregionalizeConfig::from_json(r#"{ "rank": 2 }"#).unwrap_err();
        assert!(matches!(err, KernelError::InvalidConfig(_)));
    }

    #[test]
    fn test_output_unwrap() {
        let full = KernelOutput::Full(arr2(&[[1.0, 2.0], [3.0, 4.0]]));
        assert!(!full.is_diag());
        assert_eq!(full.shape(), vec![2, 2]);
        assert_eq!(full.sum(), 10.0);
        assert!(full.clone().into_diag().is_err());
        assert!(full.into_full().is_ok());

        let diag = KernelOutput::Diag(arr1(&[1.0, 2.0]));
        assert!(diag.is_diag());
        assert_eq!(
            diag.weighted_sum(&KernelOutput::Diag(arr1(&[2.0, 0.5])))
                .unwrap(),
            3.0
        );
        assert!(diag
            .weighted_sum(&KernelOutput::Diag(arr1(&[1.0])))
            .unwrap_err()
            .is_shape_error());
        assert!(diag.into_diag().is_ok());
    }
}
