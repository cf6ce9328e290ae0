//! Linear model of coregionalization.
//!
//! `k(x, z) = xᵀ (C Cᵀ + D) z` where `C` is an `input_dim × rank` matrix and
//! `D` a positive diagonal. The typical use is modeling correlations among the
//! outputs of a multi-output GP: each data point carries one-hot features
//! naming the output it belongs to, and `C Cᵀ + D` becomes the learned
//! output covariance.
//!
//! When only a rank is given, `C` is sampled so that `C Cᵀ + D` has expected
//! value the identity matrix.
//!
//! ## Example
//!
//! ```rust
//! use coregion_kernels::{CoregionalizeKernel, Kernel};
//! use scirs2_core::ndarray::{arr1, arr2};
//!
//! let kernel = CoregionalizeKernel::builder(2)
//!     .components(arr2(&[[1.0], [1.0]]))
//!     .diagonal(arr1(&[0.5, 0.5]))
//!     .build()
//!     .unwrap();
//!
//! let x = arr2(&[[1.0, 0.0], [0.0, 1.0]]);
//! let k = kernel.covariance(x.view(), None).unwrap();
//! assert!((k[[0, 0]] - 1.5).abs() < 1e-12);
//! assert!((k[[0, 1]] - 1.0).abs() < 1e-12);
//! ```
//!
//! References: Álvarez, Rosasco, Lawrence (2012), *Kernels for Vector-Valued
//! Functions: a Review*.

use std::f64::consts::PI;

use scirs2_core::ndarray::{Array1, Array2, ArrayView2, Axis, Ix1, Ix2};
use scirs2_core::random::{thread_rng, Rng, SeedableRng, StdRng};

use crate::base::KernelBase;
use crate::error::{KernelError, Result};
use crate::gradient::KernelGradients;
use crate::parameter::Constraint;
use crate::types::{check_same_width, CoregionalizeConfig, Kernel, KernelOutput};

/// Parameter name of the components matrix `C`.
pub const COMPONENTS: &str = "components";
/// Parameter name of the diagonal vector `D`.
pub const DIAGONAL: &str = "diagonal";

/// Coregionalization kernel `k(x, z) = xᵀ (C Cᵀ + D) z`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoregionalizeKernel {
    base: KernelBase,
    rank: usize,
    has_diagonal: bool,
}

/// Builder for [`CoregionalizeKernel`].
#[derive(Debug, Clone)]
pub struct CoregionalizeBuilder {
    config: CoregionalizeConfig,
    components: Option<Array2<f64>>,
    diagonal: Option<Array1<f64>>,
}

impl CoregionalizeBuilder {
    /// Start a builder for the given input dimension.
    pub fn new(input_dim: usize) -> Self {
        Self::from_config(CoregionalizeConfig::new(input_dim))
    }

    /// Start a builder from a configuration.
    pub fn from_config(config: CoregionalizeConfig) -> Self {
        Self {
            config,
            components: None,
            diagonal: None,
        }
    }

    /// Rank of randomly initialized components. Ignored if components are given.
    pub fn rank(mut self, rank: usize) -> Self {
        self.config.rank = Some(rank);
        self
    }

    /// Explicit `(input_dim, rank)` components matrix.
    pub fn components(mut self, components: Array2<f64>) -> Self {
        self.components = Some(components);
        self
    }

    /// Explicit positive diagonal of length `input_dim`.
    pub fn diagonal(mut self, diagonal: Array1<f64>) -> Self {
        self.diagonal = Some(diagonal);
        self
    }

    /// Columns of the full input the kernel acts on.
    pub fn active_dims(mut self, active_dims: Vec<usize>) -> Self {
        self.config.active_dims = Some(active_dims);
        self
    }

    /// Kernel name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Seed for the random initialization of the components.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Validate the options and construct the kernel.
    pub fn build(self) -> Result<CoregionalizeKernel> {
        let CoregionalizeBuilder {
            config,
            components,
            diagonal,
        } = self;
        let input_dim = config.input_dim;
        let mut base = KernelBase::new(input_dim, config.active_dims, config.name)?;

        let components = match components {
            None => {
                let rank = config.rank.unwrap_or(input_dim);
                if rank == 0 {
                    return Err(KernelError::invalid_parameter("rank", rank, "must be positive"));
                }
                sample_components(input_dim, rank, config.seed)
            }
            Some(components) => {
                if let Some(rank) = config.rank.filter(|&r| r != components.ncols()) {
                    log::warn!(
                        "Ignoring rank {} for kernel '{}': components have {} columns",
                        rank,
                        base.name(),
                        components.ncols()
                    );
                }
                components
            }
        };

        let rank = components.ncols();
        if rank == 0 {
            return Err(KernelError::invalid_parameter(
                "rank",
                rank,
                "components must have at least one column",
            ));
        }
        if components.dim() != (input_dim, rank) {
            return Err(KernelError::shape_mismatch(
                COMPONENTS,
                vec![input_dim, rank],
                components.shape().to_vec(),
            ));
        }

        // Expected value of C Cᵀ is I * rank / input_dim; the default diagonal
        // fills the remainder so that E[C Cᵀ + D] = I.
        let diagonal = match diagonal {
            None if rank < input_dim => Some(Array1::from_elem(
                input_dim,
                1.0 - rank as f64 / input_dim as f64,
            )),
            None => None,
            Some(diagonal) => {
                if diagonal.len() != input_dim {
                    return Err(KernelError::shape_mismatch(
                        DIAGONAL,
                        vec![input_dim],
                        diagonal.shape().to_vec(),
                    ));
                }
                Some(diagonal)
            }
        };

        base.register_param(COMPONENTS, components.into_dyn(), Constraint::Real)?;
        let has_diagonal = diagonal.is_some();
        if let Some(diagonal) = diagonal {
            base.register_param(DIAGONAL, diagonal.into_dyn(), Constraint::Positive)?;
        }

        log::debug!(
            "Initialized coregionalization kernel '{}': input_dim={}, rank={}, diagonal={}",
            base.name(),
            input_dim,
            rank,
            has_diagonal
        );

        Ok(CoregionalizeKernel {
            base,
            rank,
            has_diagonal,
        })
    }
}

fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // Box-Muller; u1 in (0, 1] keeps the log finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn sample_components(input_dim: usize, rank: usize, seed: Option<u64>) -> Array2<f64> {
    let mut rng = if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut thread_rng())
    };
    let scale = 1.0 / (input_dim as f64).sqrt();
    Array2::from_shape_fn((input_dim, rank), |_| standard_normal(&mut rng) * scale)
}

impl CoregionalizeKernel {
    /// Create a kernel with randomly initialized components.
    ///
    /// `rank` defaults to `input_dim`.
    pub fn new(input_dim: usize, rank: Option<usize>) -> Result<Self> {
        let mut builder = Self::builder(input_dim);
        if let Some(rank) = rank {
            builder = builder.rank(rank);
        }
        builder.build()
    }

    /// Start a builder.
    pub fn builder(input_dim: usize) -> CoregionalizeBuilder {
        CoregionalizeBuilder::new(input_dim)
    }

    /// Construct from a configuration with randomly initialized components.
    pub fn from_config(config: CoregionalizeConfig) -> Result<Self> {
        CoregionalizeBuilder::from_config(config).build()
    }

    /// Rank of the components matrix.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Whether the kernel carries a diagonal term.
    pub fn has_diagonal(&self) -> bool {
        self.has_diagonal
    }

    /// Columns of the full input the kernel acts on.
    pub fn active_dims(&self) -> &[usize] {
        self.base.active_dims()
    }

    /// Current components matrix `C`.
    pub fn components(&self) -> Result<Array2<f64>> {
        Ok(self
            .base
            .get_param(COMPONENTS)?
            .into_dimensionality::<Ix2>()?)
    }

    /// Current diagonal `D`, if present.
    pub fn diagonal(&self) -> Result<Option<Array1<f64>>> {
        if !self.has_diagonal {
            return Ok(None);
        }
        let diagonal = self.base.get_param(DIAGONAL)?.into_dimensionality::<Ix1>()?;
        Ok(Some(diagonal))
    }

    /// Materialize the `input_dim × input_dim` matrix `C Cᵀ + D`.
    ///
    /// Evaluation never forms this matrix; it is meant for inspection.
    pub fn coregionalization_matrix(&self) -> Result<Array2<f64>> {
        let components = self.components()?;
        let mut matrix = components.dot(&components.t());
        if let Some(diagonal) = self.diagonal()? {
            matrix
                .diag_mut()
                .zip_mut_with(&diagonal, |m, &d| *m += d);
        }
        Ok(matrix)
    }

    /// Slice a batch to the active columns and project it onto the components.
    fn project(
        &self,
        input: &ArrayView2<'_, f64>,
        components: &Array2<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        let sliced = self.base.slice_input(input)?;
        let projected = sliced.dot(components);
        Ok((sliced, projected))
    }
}

impl Kernel for CoregionalizeKernel {
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
        let components = self.components()?;
        let diagonal = self.diagonal()?;
        let (xs, xc) = self.project(&x, &components)?;

        let (zs, zc) = match z {
            Some(z) => {
                check_same_width(&x, &z)?;
                self.project(&z, &components)?
            }
            None => (xs.clone(), xc.clone()),
        };

        let mut result = xc.dot(&zc.t());
        if let Some(diagonal) = &diagonal {
            result += &(&xs * diagonal).dot(&zs.t());
        }
        Ok(result)
    }

    fn variance(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let components = self.components()?;
        let diagonal = self.diagonal()?;
        let (xs, xc) = self.project(&x, &components)?;

        let mut result = xc.mapv(|v| v * v).sum_axis(Axis(1));
        if let Some(diagonal) = &diagonal {
            result += &xs.mapv(|v| v * v).dot(diagonal);
        }
        Ok(result)
    }

    fn backward(
        &self,
        x: ArrayView2<'_, f64>,
        z: Option<ArrayView2<'_, f64>>,
        grad_output: &KernelOutput,
    ) -> Result<KernelGradients> {
        let components = self.components()?;
        let (xs, xc) = self.project(&x, &components)?;

        let (grad_components, grad_diagonal) = match grad_output {
            KernelOutput::Full(grad) => {
                let (zs, zc) = match z {
                    Some(z) => {
                        check_same_width(&x, &z)?;
                        self.project(&z, &components)?
                    }
                    None => (xs.clone(), xc.clone()),
                };
                if grad.dim() != (xs.nrows(), zs.nrows()) {
                    return Err(KernelError::shape_mismatch(
                        "grad_output",
                        vec![xs.nrows(), zs.nrows()],
                        grad.shape().to_vec(),
                    ));
                }

                // ∂L/∂C = Xᵀ G Zc + Zᵀ Gᵀ Xc
                let grad_components =
                    xs.t().dot(&grad.dot(&zc)) + zs.t().dot(&grad.t().dot(&xc));
                // ∂L/∂D_k = Σ_ij G_ij X_ik Z_jk
                let grad_diagonal = self
                    .has_diagonal
                    .then(|| (&xs * &grad.dot(&zs)).sum_axis(Axis(0)));
                (grad_components, grad_diagonal)
            }
            KernelOutput::Diag(grad) => {
                if grad.len() != xs.nrows() {
                    return Err(KernelError::shape_mismatch(
                        "grad_output",
                        vec![xs.nrows()],
                        grad.shape().to_vec(),
                    ));
                }

                let weighted = &xc * &grad.view().insert_axis(Axis(1));
                let grad_components = xs.t().dot(&weighted) * 2.0;
                let grad_diagonal = self
                    .has_diagonal
                    .then(|| xs.mapv(|v| v * v).t().dot(grad));
                (grad_components, grad_diagonal)
            }
        };

        let params = self.base.params();
        let mut gradients = KernelGradients::new();
        gradients.push(
            COMPONENTS,
            params
                .get(COMPONENTS)?
                .chain_gradient(&grad_components.into_dyn())?,
        );
        if let Some(grad_diagonal) = grad_diagonal {
            gradients.push(
                DIAGONAL,
                params
                    .get(DIAGONAL)?
                    .chain_gradient(&grad_diagonal.into_dyn())?,
            );
        }
        Ok(gradients)
    }
}
