//! Shared state of every kernel: dimensions, active columns, name, parameters.
//!
//! Kernels hold a [`KernelBase`] by composition and expose it through
//! [`Kernel::base`](crate::Kernel::base). It provides input slicing and the
//! parameter registry used by optimizers.

use scirs2_core::ndarray::{Array2, ArrayD, ArrayView2, Axis};

use crate::error::{KernelError, Result, ShapeError};
use crate::parameter::{Constraint, ParamStore};

/// Dimensions, active columns, name, and parameter registry of a kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelBase {
    input_dim: usize,
    active_dims: Vec<usize>,
    name: String,
    params: ParamStore,
}

impl KernelBase {
    /// Create a kernel base.
    ///
    /// # Arguments
    /// * `input_dim` - Number of features the kernel acts on (must be positive)
    /// * `active_dims` - Columns of the full input to select; defaults to `0..input_dim`
    /// * `name` - Kernel name
    pub fn new(
        input_dim: usize,
        active_dims: Option<Vec<usize>>,
        name: impl Into<String>,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(KernelError::invalid_parameter(
                "input_dim",
                input_dim,
                "must be positive",
            ));
        }

        let active_dims = match active_dims {
            Some(dims) => {
                if dims.len() != input_dim {
                    return Err(KernelError::shape_mismatch(
                        "active_dims",
                        vec![input_dim],
                        vec![dims.len()],
                    ));
                }
                dims
            }
            None => (0..input_dim).collect(),
        };

        Ok(Self {
            input_dim,
            active_dims,
            name: name.into(),
            params: ParamStore::new(),
        })
    }

    /// Number of features after slicing.
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Columns selected from the full input.
    pub fn active_dims(&self) -> &[usize] {
        &self.active_dims
    }

    /// Kernel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum column count an input must have.
    pub fn required_width(&self) -> usize {
        self.active_dims.iter().max().map_or(0, |&d| d + 1)
    }

    fn is_identity_slice(&self, width: usize) -> bool {
        width == self.input_dim && self.active_dims.iter().enumerate().all(|(i, &d)| i == d)
    }

    /// Select the active columns of a batch of inputs.
    ///
    /// Fails with a shape error when the rows are too narrow to contain every
    /// active column.
    pub fn slice_input(&self, x: &ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (rows, cols) = x.dim();
        let required = self.required_width();
        if cols < required {
            let err = ShapeError::new("slice_input", vec![rows, required], vec![rows, cols])
                .with_context(format!(
                    "kernel '{}' reads columns {:?}",
                    self.name, self.active_dims
                ));
            return Err(err.into());
        }

        if self.is_identity_slice(cols) {
            Ok(x.to_owned())
        } else {
            Ok(x.select(Axis(1), &self.active_dims))
        }
    }

    /// Register a learnable parameter.
    pub fn register_param(
        &mut self,
        name: &str,
        value: ArrayD<f64>,
        constraint: Constraint,
    ) -> Result<()> {
        self.params.register(name, value, constraint)
    }

    /// Current public value of a parameter.
    pub fn get_param(&self, name: &str) -> Result<ArrayD<f64>> {
        self.params.value(name)
    }

    /// Overwrite the public value of a parameter.
    pub fn set_param(&mut self, name: &str, value: ArrayD<f64>) -> Result<()> {
        self.params.set_value(name, value)
    }

    /// Declare a domain restriction for a parameter.
    pub fn set_constraint(&mut self, name: &str, constraint: Constraint) -> Result<()> {
        self.params.set_constraint(name, constraint)
    }

    /// Parameter registry.
    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    /// Mutable parameter registry.
    pub fn params_mut(&mut self) -> &mut ParamStore {
        &mut self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray::{arr1, arr2};

    #[test]
    fn test_default_active_dims() {
        let base = KernelBase::new(3, None, "k").unwrap();
        assert_eq!(base.active_dims(), &[0, 1, 2]);
        assert_eq!(base.required_width(), 3);
        assert_eq!(base.name(), "k");
    }

    #[test]
    fn test_zero_input_dim_rejected() {
        let err = KernelBase::new(0, None, "k").unwrap_err();
        assert!(matches!(err, KernelError::InvalidParameter { .. }));
    }

    #[test]
    fn test_active_dims_length_mismatch() {
        let err = KernelBase::new(2, Some(vec![0, 1, 2]), "k").unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_slice_selects_columns() {
        let base = KernelBase::new(2, Some(vec![3, 1]), "k").unwrap();
        let x = arr2(&[[0.0, 1.0, 2.0, 3.0], [4.0, 5.0, 6.0, 7.0]]);
        let sliced = base.slice_input(&x.view()).unwrap();
        assert_eq!(sliced, arr2(&[[3.0, 1.0], [7.0, 5.0]]));
    }

    #[test]
    fn test_slice_identity() {
        let base = KernelBase::new(2, None, "k").unwrap();
        let x = arr2(&[[1.0, 2.0]]);
        assert_eq!(base.slice_input(&x.view()).unwrap(), x);
    }

    #[test]
    fn test_slice_prefix_of_wider_input() {
        let base = KernelBase::new(2, None, "k").unwrap();
        let x = arr2(&[[1.0, 2.0, 9.0]]);
        assert_eq!(base.slice_input(&x.view()).unwrap(), arr2(&[[1.0, 2.0]]));
    }

    #[test]
    fn test_slice_too_narrow() {
        let base = KernelBase::new(2, Some(vec![0, 4]), "k").unwrap();
        let x = arr2(&[[1.0, 2.0, 3.0]]);
        let err = base.slice_input(&x.view()).unwrap_err();
        assert!(err.is_shape_error());
        assert!(err.to_string().contains("[1, 5]"));
    }

    #[test]
    fn test_param_access() {
        let mut base = KernelBase::new(2, None, "k").unwrap();
        base.register_param("variance", arr1(&[1.5]).into_dyn(), Constraint::Real)
            .unwrap();
        base.set_constraint("variance", Constraint::Positive).unwrap();
        base.set_param("variance", arr1(&[2.5]).into_dyn()).unwrap();
        let value = base.get_param("variance").unwrap();
        assert!((value[[0]] - 2.5).abs() < 1e-12);
        assert!(base.set_param("variance", arr1(&[-1.0]).into_dyn()).is_err());
        assert!(base.get_param("missing").is_err());
    }
}
