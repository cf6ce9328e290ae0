//! Learnable kernel parameters with domain constraints.
//!
//! A [`Parameter`] keeps its value in an *unconstrained* representation so that
//! an optimizer can move it freely, while every read goes through the
//! constraint's transform and returns a value inside the declared domain.
//!
//! ```rust
//! use coregion_kernels::parameter::{Constraint, Parameter};
//! use scirs2_core::ndarray::{arr1, IxDyn};
//!
//! let mut param = Parameter::new("diagonal", arr1(&[0.5, 2.0]).into_dyn(), Constraint::Positive).unwrap();
//! // The optimizer works on log-space storage...
//! param.unconstrained_mut()[IxDyn(&[0])] = -10.0;
//! // ...and the public value stays positive.
//! assert!(param.value()[IxDyn(&[0])] > 0.0);
//! ```

use indexmap::IndexMap;
use scirs2_core::ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Domain restriction applied to a parameter's public value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Constraint {
    /// Any finite real value
    #[default]
    Real,
    /// Strictly positive values, stored in log space
    Positive,
}

impl Constraint {
    /// Check whether a public value lies in the domain.
    pub fn check(&self, value: f64) -> bool {
        match self {
            Constraint::Real => value.is_finite(),
            Constraint::Positive => value.is_finite() && value > 0.0,
        }
    }

    /// Map a public value to its unconstrained representation.
    pub fn to_unconstrained(&self, value: f64) -> f64 {
        match self {
            Constraint::Real => value,
            Constraint::Positive => value.ln(),
        }
    }

    /// Map an unconstrained value back into the domain.
    ///
    /// Positive values saturate at `[f64::MIN_POSITIVE, f64::MAX]` so that
    /// extreme storage never yields `0` or `inf`.
    pub fn to_constrained(&self, raw: f64) -> f64 {
        match self {
            Constraint::Real => raw,
            Constraint::Positive => raw.exp().clamp(f64::MIN_POSITIVE, f64::MAX),
        }
    }

    /// Derivative of the public value with respect to the unconstrained one.
    pub fn grad_scale(&self, raw: f64) -> f64 {
        match self {
            Constraint::Real => 1.0,
            Constraint::Positive => self.to_constrained(raw),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Constraint::Real => "must be finite",
            Constraint::Positive => "must be positive and finite",
        }
    }
}

/// A named learnable tensor with a domain constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    unconstrained: ArrayD<f64>,
    constraint: Constraint,
}

impl Parameter {
    /// Create a parameter from its public value.
    ///
    /// Fails with `InvalidParameter` if any entry lies outside the constraint.
    pub fn new(name: impl Into<String>, value: ArrayD<f64>, constraint: Constraint) -> Result<Self> {
        let name = name.into();
        validate(&name, &value, constraint)?;
        let unconstrained = value.mapv(|v| constraint.to_unconstrained(v));
        Ok(Self {
            name,
            unconstrained,
            constraint,
        })
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current constraint.
    pub fn constraint(&self) -> Constraint {
        self.constraint
    }

    /// Shape of the parameter tensor.
    pub fn shape(&self) -> &[usize] {
        self.unconstrained.shape()
    }

    /// Number of scalar entries.
    pub fn len(&self) -> usize {
        self.unconstrained.len()
    }

    /// Whether the tensor has no entries.
    pub fn is_empty(&self) -> bool {
        self.unconstrained.is_empty()
    }

    /// Public (constrained) value.
    pub fn value(&self) -> ArrayD<f64> {
        let constraint = self.constraint;
        self.unconstrained.mapv(|u| constraint.to_constrained(u))
    }

    /// Unconstrained storage.
    pub fn unconstrained(&self) -> &ArrayD<f64> {
        &self.unconstrained
    }

    /// Mutable unconstrained storage, for optimizers.
    pub fn unconstrained_mut(&mut self) -> &mut ArrayD<f64> {
        &mut self.unconstrained
    }

    /// Overwrite the public value. The shape must not change.
    pub fn set_value(&mut self, value: ArrayD<f64>) -> Result<()> {
        if value.shape() != self.shape() {
            return Err(KernelError::shape_mismatch(
                self.name.clone(),
                self.shape().to_vec(),
                value.shape().to_vec(),
            ));
        }
        validate(&self.name, &value, self.constraint)?;
        let constraint = self.constraint;
        self.unconstrained = value.mapv(|v| constraint.to_unconstrained(v));
        Ok(())
    }

    /// Change the constraint, re-encoding the current public value.
    pub fn set_constraint(&mut self, constraint: Constraint) -> Result<()> {
        if constraint == self.constraint {
            return Ok(());
        }
        let value = self.value();
        validate(&self.name, &value, constraint)?;
        self.unconstrained = value.mapv(|v| constraint.to_unconstrained(v));
        self.constraint = constraint;
        Ok(())
    }

    /// Chain a gradient w.r.t. the public value into one w.r.t. storage.
    pub fn chain_gradient(&self, grad_value: &ArrayD<f64>) -> Result<ArrayD<f64>> {
        if grad_value.shape() != self.shape() {
            return Err(KernelError::shape_mismatch(
                format!("gradient of {}", self.name),
                self.shape().to_vec(),
                grad_value.shape().to_vec(),
            ));
        }
        let constraint = self.constraint;
        let mut grad = grad_value.clone();
        grad.zip_mut_with(&self.unconstrained, |g, &u| *g *= constraint.grad_scale(u));
        Ok(grad)
    }
}

fn validate(name: &str, value: &ArrayD<f64>, constraint: Constraint) -> Result<()> {
    for (i, &v) in value.iter().enumerate() {
        if !constraint.check(v) {
            return Err(KernelError::invalid_parameter(
                format!("{}[{}]", name, i),
                v,
                constraint.describe(),
            ));
        }
    }
    Ok(())
}

/// Registry of a kernel's parameters, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamStore {
    params: IndexMap<String, Parameter>,
}

impl ParamStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new parameter. Re-registering a name replaces it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        value: ArrayD<f64>,
        constraint: Constraint,
    ) -> Result<()> {
        let param = Parameter::new(name, value, constraint)?;
        self.params.insert(param.name.clone(), param);
        Ok(())
    }

    /// Look up a parameter.
    pub fn get(&self, name: &str) -> Result<&Parameter> {
        self.params
            .get(name)
            .ok_or_else(|| KernelError::ParameterNotFound(name.to_string()))
    }

    /// Look up a parameter mutably.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Parameter> {
        self.params
            .get_mut(name)
            .ok_or_else(|| KernelError::ParameterNotFound(name.to_string()))
    }

    /// Whether a parameter is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Public value of a parameter.
    pub fn value(&self, name: &str) -> Result<ArrayD<f64>> {
        Ok(self.get(name)?.value())
    }

    /// Overwrite the public value of a parameter.
    pub fn set_value(&mut self, name: &str, value: ArrayD<f64>) -> Result<()> {
        self.get_mut(name)?.set_value(value)
    }

    /// Change the constraint of a parameter.
    pub fn set_constraint(&mut self, name: &str, constraint: Constraint) -> Result<()> {
        log::debug!("Setting constraint {:?} on parameter '{}'", constraint, name);
        self.get_mut(name)?.set_constraint(constraint)
    }

    /// Parameter names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.params.keys().map(|k| k.as_str()).collect()
    }

    /// Iterate over parameters.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    /// Iterate mutably over parameters.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.values_mut()
    }

    /// Number of registered parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameters are registered.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Total number of scalar entries across all parameters.
    pub fn num_scalars(&self) -> usize {
        self.params.values().map(Parameter::len).sum()
    }
}
