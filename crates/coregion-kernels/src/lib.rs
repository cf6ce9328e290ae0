//! # Coregion-Kernels
//!
//! **Version**: 0.1.0-alpha.2 | **Status**: Alpha
//!
//! Covariance functions for multi-output Gaussian Process models.
//!
//! The centerpiece is the linear model of coregionalization,
//! `k(x, z) = xᵀ (C Cᵀ + D) z`, which maps one-hot "which output" features
//! through a learned low-rank-plus-diagonal quadratic form. It lets a GP share
//! statistical strength between correlated outputs.
//!
//! ## Features
//!
//! - ✅ **Coregionalization Kernel** - Low-rank `C` plus positive diagonal `D`
//! - ✅ **Linear Kernel** - `σ² xᵀz`, the single-weight special case
//! - ✅ **Constrained Parameters** - Positivity enforced through log-space storage
//! - ✅ **Analytic Gradients** - `backward` for every parameter, checked numerically
//! - ✅ **SGD Optimizer** - Momentum and gradient clipping over a parameter store
//! - ✅ **Input Slicing** - Kernels act on a chosen subset of input columns
//!
//! ## Architecture
//!
//! ### Kernel Trait
//!
//! All kernels implement the [`Kernel`] trait over batches of rows:
//!
//! ```rust
//! use coregion_kernels::{CoregionalizeKernel, Kernel};
//! use scirs2_core::ndarray::{arr2, Array2};
//!
//! let kernel = CoregionalizeKernel::builder(3)
//!     .components(Array2::eye(3))
//!     .build()
//!     .unwrap();
//!
//! let x = arr2(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]]);
//! let k = kernel.covariance(x.view(), None).unwrap();
//! assert_eq!(k, arr2(&[[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 2.0]]));
//! ```
//!
//! ### Multi-Output Inputs
//!
//! Outputs are coded as extra one-hot columns. `active_dims` tells the
//! coregionalization kernel which columns those are:
//!
//! ```rust
//! use coregion_kernels::{CoregionalizeKernel, Kernel};
//! use scirs2_core::ndarray::arr2;
//!
//! // column 0: a real-valued feature, columns 1..3: which of 3 outputs
//! let kernel = CoregionalizeKernel::builder(3)
//!     .rank(1)
//!     .active_dims(vec![1, 2, 3])
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let x = arr2(&[
//!     [0.3, 1.0, 0.0, 0.0],
//!     [0.7, 0.0, 0.0, 1.0],
//! ]);
//! let k = kernel.forward(x.view(), None, false).unwrap();
//! let variances = kernel.forward(x.view(), None, true).unwrap();
//! assert_eq!(k.shape(), vec![2, 2]);
//! assert_eq!(variances.shape(), vec![2]);
//! ```
//!
//! ### Training
//!
//! `backward` returns gradients w.r.t. unconstrained parameter storage, which
//! [`SgdOptimizer`] consumes:
//!
//! ```rust
//! use coregion_kernels::{CoregionalizeKernel, Kernel, KernelOutput, OptimizerConfig, SgdOptimizer};
//! use scirs2_core::ndarray::Array2;
//!
//! let mut kernel = CoregionalizeKernel::new(2, Some(1)).unwrap();
//! let x = Array2::eye(2);
//! let grad = KernelOutput::Full(Array2::ones((2, 2)));
//!
//! let mut opt = SgdOptimizer::new(OptimizerConfig::new(0.05)).unwrap();
//! let grads = kernel.backward(x.view(), None, &grad).unwrap();
//! opt.step(kernel.base_mut().params_mut(), &grads).unwrap();
//! ```
//!
//! ## Logging
//!
//! The crate logs through the `log` facade (`debug` on construction and
//! optimizer steps, `trace` on evaluation). Install any logger to see it.

pub mod base;
pub mod coregionalize;
pub mod error;
pub mod gradient;
pub mod gradient_check;
pub mod linear;
pub mod optim;
pub mod parameter;
pub mod types;

// Re-export main types for convenience
pub use base::KernelBase;
pub use coregionalize::{CoregionalizeBuilder, CoregionalizeKernel};
pub use error::{KernelError, Result, ShapeError};
pub use gradient::{GradientComponent, KernelGradients};
pub use gradient_check::{GradientCheckConfig, GradientCheckResult};
pub use linear::LinearKernel;
pub use optim::{GradClipMode, OptimizerConfig, SgdOptimizer};
pub use parameter::{Constraint, ParamStore, Parameter};
pub use types::{CoregionalizeConfig, Kernel, KernelOutput};

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray::arr2;

    #[test]
    fn test_kernel_trait_usage() {
        let kernels: Vec<Box<dyn Kernel>> = vec![
            Box::new(CoregionalizeKernel::new(2, Some(1)).unwrap()),
            Box::new(LinearKernel::new(2).unwrap()),
        ];

        let x = arr2(&[[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]]);

        for kernel in kernels {
            let full = kernel.forward(x.view(), None, false).unwrap();
            let diag = kernel.forward(x.view(), None, true).unwrap();
            assert_eq!(full.shape(), vec![3, 3]);
            assert_eq!(diag.shape(), vec![3]);
        }
    }

    #[test]
    fn test_kernel_names() {
        assert_eq!(
            CoregionalizeKernel::new(2, None).unwrap().name(),
            "coregionalize"
        );
        assert_eq!(LinearKernel::new(2).unwrap().name(), "linear");
    }

    #[test]
    fn test_psd_property() {
        assert!(CoregionalizeKernel::new(2, None).unwrap().is_psd());
        assert!(LinearKernel::new(2).unwrap().is_psd());
    }
}
