//! Error types for coregion-kernels.

use std::fmt;
use thiserror::Error;

/// Errors that can occur in kernel construction and evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Mismatched shapes between a tensor and what an operation expects
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(ShapeError),

    /// Invalid kernel or parameter value
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Lookup of a parameter that was never registered
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Kernel computation failed
    #[error("Kernel computation error: {0}")]
    ComputationError(String),

    /// Configuration could not be parsed or serialized
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Detailed shape mismatch with the expected and actual shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    /// Operation or tensor that was being checked
    pub operation: String,
    /// Expected shape
    pub expected: Vec<usize>,
    /// Shape that was provided
    pub actual: Vec<usize>,
    /// Additional context
    pub context: Option<String>,
}

impl ShapeError {
    /// Create a new shape error.
    pub fn new(operation: impl Into<String>, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        Self {
            operation: operation.into(),
            expected,
            actual,
            context: None,
        }
    }

    /// Add context to the error.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:?}, actual {:?}",
            self.operation, self.expected, self.actual
        )?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        Ok(())
    }
}

impl KernelError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(
        operation: impl Into<String>,
        expected: Vec<usize>,
        actual: Vec<usize>,
    ) -> Self {
        KernelError::ShapeMismatch(ShapeError::new(operation, expected, actual))
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        KernelError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this is a shape error.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, KernelError::ShapeMismatch(_))
    }
}

impl From<ShapeError> for KernelError {
    fn from(err: ShapeError) -> Self {
        KernelError::ShapeMismatch(err)
    }
}

impl From<scirs2_core::ndarray::ShapeError> for KernelError {
    fn from(err: scirs2_core::ndarray::ShapeError) -> Self {
        KernelError::ComputationError(err.to_string())
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::InvalidConfig(err.to_string())
    }
}

/// Result type for kernel operations
pub type Result<T> = std::result::Result<T, KernelError>;
