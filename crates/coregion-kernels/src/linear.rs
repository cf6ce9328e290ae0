//! Linear (dot-product) kernel `k(x, z) = σ² xᵀ z`.
//!
//! The coregionalization kernel generalizes this one to a learned
//! low-rank-plus-diagonal weight matrix; both share the [`Kernel`] contract.

use scirs2_core::ndarray::{arr1, Array1, Array2, ArrayView2, Axis};

use crate::base::KernelBase;
use crate::error::Result;
use crate::gradient::KernelGradients;
use crate::parameter::Constraint;
use crate::types::{check_same_width, Kernel, KernelOutput};

/// Parameter name of the signal variance `σ²`.
pub const VARIANCE: &str = "variance";

/// Linear kernel with a positive signal variance.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearKernel {
    base: KernelBase,
}

impl LinearKernel {
    /// Create a linear kernel with unit variance acting on `0..input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        Self::with_options(input_dim, 1.0, None, "linear")
    }

    /// Create a linear kernel with explicit variance, active columns and name.
    pub fn with_options(
        input_dim: usize,
        variance: f64,
        active_dims: Option<Vec<usize>>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let mut base = KernelBase::new(input_dim, active_dims, name)?;
        base.register_param(VARIANCE, arr1(&[variance]).into_dyn(), Constraint::Positive)?;
        Ok(Self { base })
    }

    /// Current signal variance.
    pub fn variance_param(&self) -> Result<f64> {
        let value = self.base.get_param(VARIANCE)?;
        Ok(value.iter().next().copied().unwrap_or_default())
    }
}

impl Kernel for LinearKernel {
    fn base(&self) -> &KernelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut KernelBase {
        &mut self.base
    }

    fn covariance(
        &self,
        x: ArrayView2<'_, f64>,
        z: Option<ArrayView2<'_, f64>>,
    ) -> Result<Array2<f64>> {
        let variance = self.variance_param()?;
        let xs = self.base.slice_input(&x)?;
        let dot = match z {
            Some(z) => {
                check_same_width(&x, &z)?;
                let zs = self.base.slice_input(&z)?;
                xs.dot(&zs.t())
            }
            None => xs.dot(&xs.t()),
        };
        Ok(dot * variance)
    }

    fn variance(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let variance = self.variance_param()?;
        let xs = self.base.slice_input(&x)?;
        Ok(xs.mapv(|v| v * v).sum_axis(Axis(1)) * variance)
    }

    fn backward(
        &self,
        x: ArrayView2<'_, f64>,
        z: Option<ArrayView2<'_, f64>>,
        grad_output: &KernelOutput,
    ) -> Result<KernelGradients> {
        // K = σ² S, so ∂L/∂σ² = Σ G ⊙ S = Σ G ⊙ K / σ²
        let variance = self.variance_param()?;
        let weighted = self
            .forward(x, z, grad_output.is_diag())?
            .weighted_sum(grad_output)?;
        let grad_variance = arr1(&[weighted / variance]).into_dyn();

        let mut gradients = KernelGradients::new();
        gradients.push(
            VARIANCE,
            self.base
                .params()
                .get(VARIANCE)?
                .chain_gradient(&grad_variance)?,
        );
        Ok(gradients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient_check::{check_gradients, GradientCheckConfig};
    use approx::assert_abs_diff_eq;
    use scirs2_core::ndarray::arr2;

    #[test]
    fn test_linear_values() {
        let kernel = LinearKernel::with_options(2, 2.0, None, "lin").unwrap();
        let x = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let k = kernel.covariance(x.view(), None).unwrap();
        assert_abs_diff_eq!(k[[0, 1]], 22.0, epsilon = 1e-10);
        assert_abs_diff_eq!(k[[1, 0]], 22.0, epsilon = 1e-10);

        let v = kernel.variance(x.view()).unwrap();
        assert_abs_diff_eq!(v[0], 10.0, epsilon = 1e-10);
        assert_abs_diff_eq!(v[1], 50.0, epsilon = 1e-10);
        assert_eq!(kernel.name(), "lin");
    }

    #[test]
    fn test_linear_active_dims() {
        let kernel = LinearKernel::with_options(1, 1.0, Some(vec![2]), "lin").unwrap();
        let k = kernel.compute(&[9.0, 9.0, 2.0], &[9.0, 9.0, 3.0]).unwrap();
        assert_abs_diff_eq!(k, 6.0, epsilon = 1e-10);
    }

    #[test]
    fn test_linear_rejects_non_positive_variance() {
        assert!(LinearKernel::with_options(2, 0.0, None, "lin").is_err());
    }

    #[test]
    fn test_linear_gradients() {
        let mut kernel = LinearKernel::with_options(2, 1.5, None, "lin").unwrap();
        let x = arr2(&[[1.0, -2.0], [0.5, 0.5], [2.0, 1.0]]);
        let weights = KernelOutput::Full(arr2(&[
            [1.0, 0.5, -1.0],
            [0.0, 2.0, 1.0],
            [0.3, 0.3, 0.3],
        ]));
        let results =
            check_gradients(&mut kernel, x.view(), None, &weights, &GradientCheckConfig::default())
                .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "{:?}", results[0]);
    }
}
