//! Numeric gradient checking utilities for verifying analytical gradients.
//!
//! This module compares [`Kernel::backward`] against central finite
//! differences of the scalar loss `L = Σ W ⊙ K`, perturbing each parameter's
//! unconstrained storage one entry at a time.

use scirs2_core::ndarray::{ArrayD, ArrayView2};

use crate::error::{KernelError, Result};
use crate::types::{Kernel, KernelOutput};

/// Configuration for gradient checking
#[derive(Clone, Copy, Debug)]
pub struct GradientCheckConfig {
    /// Epsilon for finite difference computation
    pub epsilon: f64,
    /// Relative tolerance for gradient comparison
    pub rtol: f64,
    /// Absolute tolerance for gradient comparison
    pub atol: f64,
}

impl Default for GradientCheckConfig {
    fn default() -> Self {
        GradientCheckConfig {
            epsilon: 1e-5,
            rtol: 1e-3,
            atol: 1e-5,
        }
    }
}

/// Result of gradient checking for a single parameter
#[derive(Debug, Clone)]
pub struct GradientCheckResult {
    /// Name of the parameter being checked
    pub param_name: String,
    /// Maximum absolute difference between analytical and numeric gradients
    pub max_abs_diff: f64,
    /// Maximum relative difference
    pub max_rel_diff: f64,
    /// Whether the gradient check passed
    pub passed: bool,
    /// Number of elements checked
    pub num_elements: usize,
}

/// Scalar loss `Σ W ⊙ forward(x, z)`, evaluated in the mode `weights` implies.
pub fn weighted_loss<K: Kernel + ?Sized>(
    kernel: &K,
    x: ArrayView2<'_, f64>,
    z: Option<ArrayView2<'_, f64>>,
    weights: &KernelOutput,
) -> Result<f64> {
    kernel
        .forward(x, z, weights.is_diag())?
        .weighted_sum(weights)
}

/// Compute the numeric gradient for one parameter using central differences.
///
/// The parameter's storage is restored before returning, also on error.
pub fn compute_numeric_gradient<K: Kernel + ?Sized>(
    kernel: &mut K,
    x: ArrayView2<'_, f64>,
    z: Option<ArrayView2<'_, f64>>,
    weights: &KernelOutput,
    param_name: &str,
    config: &GradientCheckConfig,
) -> Result<ArrayD<f64>> {
    let original = kernel
        .base()
        .params()
        .get(param_name)?
        .unconstrained()
        .clone();

    let result = perturb_each(kernel, x, z, weights, param_name, &original, config);

    *kernel
        .base_mut()
        .params_mut()
        .get_mut(param_name)?
        .unconstrained_mut() = original;

    result
}

fn perturb_each<K: Kernel + ?Sized>(
    kernel: &mut K,
    x: ArrayView2<'_, f64>,
    z: Option<ArrayView2<'_, f64>>,
    weights: &KernelOutput,
    param_name: &str,
    original: &ArrayD<f64>,
    config: &GradientCheckConfig,
) -> Result<ArrayD<f64>> {
    let mut numeric = ArrayD::zeros(original.raw_dim());

    for (idx, slot) in numeric.iter_mut().enumerate() {
        let mut loss_at = |delta: f64| -> Result<f64> {
            let mut perturbed = original.clone();
            if let Some(v) = perturbed.iter_mut().nth(idx) {
                *v += delta;
            }
            *kernel
                .base_mut()
                .params_mut()
                .get_mut(param_name)?
                .unconstrained_mut() = perturbed;
            weighted_loss(&*kernel, x, z, weights)
        };

        let loss_plus = loss_at(config.epsilon)?;
        let loss_minus = loss_at(-config.epsilon)?;

        // (f(x+ε) - f(x-ε)) / (2ε)
        *slot = (loss_plus - loss_minus) / (2.0 * config.epsilon);
    }

    Ok(numeric)
}

/// Compare analytical and numeric gradients
pub fn compare_gradients(
    analytical: &ArrayD<f64>,
    numeric: &ArrayD<f64>,
    param_name: &str,
    config: &GradientCheckConfig,
) -> Result<GradientCheckResult> {
    if analytical.shape() != numeric.shape() {
        return Err(KernelError::shape_mismatch(
            format!("gradient of {}", param_name),
            numeric.shape().to_vec(),
            analytical.shape().to_vec(),
        ));
    }

    let mut max_abs_diff: f64 = 0.0;
    let mut max_rel_diff: f64 = 0.0;

    for (a, n) in analytical.iter().zip(numeric.iter()) {
        let abs_diff = (a - n).abs();
        let rel_diff = if n.abs() > 1e-10 {
            abs_diff / n.abs()
        } else {
            abs_diff
        };

        max_abs_diff = max_abs_diff.max(abs_diff);
        max_rel_diff = max_rel_diff.max(rel_diff);
    }

    let passed = max_abs_diff < config.atol || max_rel_diff < config.rtol;

    Ok(GradientCheckResult {
        param_name: param_name.to_string(),
        max_abs_diff,
        max_rel_diff,
        passed,
        num_elements: analytical.len(),
    })
}

/// Check every gradient returned by `backward` against finite differences.
pub fn check_gradients<K: Kernel + ?Sized>(
    kernel: &mut K,
    x: ArrayView2<'_, f64>,
    z: Option<ArrayView2<'_, f64>>,
    weights: &KernelOutput,
    config: &GradientCheckConfig,
) -> Result<Vec<GradientCheckResult>> {
    let analytical = kernel.backward(x, z, weights)?;
    let mut results = Vec::with_capacity(analytical.len());

    for component in &analytical.gradients {
        let numeric = compute_numeric_gradient(kernel, x, z, weights, &component.name, config)?;
        let result = compare_gradients(&component.values, &numeric, &component.name, config)?;
        if !result.passed {
            log::warn!(
                "Gradient check failed for '{}': max_abs_diff={:.3e}, max_rel_diff={:.3e}",
                result.param_name,
                result.max_abs_diff,
                result.max_rel_diff
            );
        }
        results.push(result);
    }

    Ok(results)
}
