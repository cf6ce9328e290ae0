//! Parameter gradients produced by [`Kernel::backward`](crate::Kernel::backward).
//!
//! Gradients are reported per parameter name and w.r.t. the parameter's
//! unconstrained storage, which is what optimizers update.

use scirs2_core::ndarray::ArrayD;

/// A single gradient component with its parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientComponent {
    /// Name of the parameter (e.g., "components", "diagonal")
    pub name: String,
    /// `∂L/∂u` with the same shape as the parameter
    pub values: ArrayD<f64>,
}

/// Gradients of a scalar loss for every parameter of a kernel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelGradients {
    /// One component per parameter, in registration order
    pub gradients: Vec<GradientComponent>,
}

impl KernelGradients {
    /// Create an empty gradient set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gradient component.
    pub fn push(&mut self, name: impl Into<String>, values: ArrayD<f64>) {
        self.gradients.push(GradientComponent {
            name: name.into(),
            values,
        });
    }

    /// Get a gradient by name.
    pub fn get_gradient(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.gradients
            .iter()
            .find(|g| g.name == name)
            .map(|g| &g.values)
    }

    /// Get all gradient names.
    pub fn gradient_names(&self) -> Vec<&str> {
        self.gradients.iter().map(|g| g.name.as_str()).collect()
    }

    /// Global L2 norm over all components.
    pub fn global_norm(&self) -> f64 {
        self.gradients
            .iter()
            .flat_map(|g| g.values.iter())
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt()
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.gradients.len()
    }

    /// Whether there are no components.
    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }
}
