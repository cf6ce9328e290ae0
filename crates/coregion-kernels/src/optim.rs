//! SGD optimizer with momentum over a kernel's parameter store.
//!
//! Updates act on unconstrained storage, so constrained parameters (e.g. a
//! positive diagonal) stay inside their domain whatever the step size.

use std::collections::HashMap;

use scirs2_core::ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::gradient::KernelGradients;
use crate::parameter::ParamStore;

/// Gradient clipping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GradClipMode {
    /// Clip each entry to `[-clip, clip]`
    #[default]
    Value,
    /// Rescale all gradients when their global L2 norm exceeds `clip`
    Norm,
}

/// Configuration for [`SgdOptimizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Learning rate
    pub learning_rate: f64,
    /// Momentum factor in `[0, 1)`
    pub momentum: f64,
    /// Optional clipping threshold
    pub grad_clip: Option<f64>,
    /// How `grad_clip` is applied
    pub grad_clip_mode: GradClipMode,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.0,
            grad_clip: None,
            grad_clip_mode: GradClipMode::Value,
        }
    }
}

impl OptimizerConfig {
    /// Create configuration with the given learning rate.
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            ..Self::default()
        }
    }

    /// Set momentum
    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    /// Clip gradients by value or global norm
    pub fn with_grad_clip(mut self, clip: f64, mode: GradClipMode) -> Self {
        self.grad_clip = Some(clip);
        self.grad_clip_mode = mode;
        self
    }
}

fn check_learning_rate(lr: f64) -> Result<()> {
    if !(lr > 0.0 && lr.is_finite()) {
        return Err(KernelError::invalid_parameter(
            "learning_rate",
            lr,
            "must be positive and finite",
        ));
    }
    Ok(())
}

/// SGD optimizer with momentum.
#[derive(Debug)]
pub struct SgdOptimizer {
    config: OptimizerConfig,
    /// Momentum buffers for each parameter.
    velocity: HashMap<String, ArrayD<f64>>,
    steps: usize,
}

impl SgdOptimizer {
    /// Create a new SGD optimizer.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        check_learning_rate(config.learning_rate)?;
        if let Some(clip) = config.grad_clip {
            if !(clip > 0.0 && clip.is_finite()) {
                return Err(KernelError::invalid_parameter(
                    "grad_clip",
                    clip,
                    "must be positive and finite",
                ));
            }
        }
        if !(0.0..1.0).contains(&config.momentum) {
            return Err(KernelError::invalid_parameter(
                "momentum",
                config.momentum,
                "must be in [0, 1)",
            ));
        }
        Ok(Self {
            config,
            velocity: HashMap::new(),
            steps: 0,
        })
    }

    /// Apply gradient clipping if configured.
    fn clip_gradients(&self, gradients: &mut KernelGradients) {
        if let Some(clip_value) = self.config.grad_clip {
            match self.config.grad_clip_mode {
                GradClipMode::Value => {
                    for grad in gradients.gradients.iter_mut() {
                        grad.values.mapv_inplace(|g| g.clamp(-clip_value, clip_value));
                    }
                }
                GradClipMode::Norm => {
                    let total_norm = gradients.global_norm();
                    if total_norm > clip_value {
                        let scale = clip_value / total_norm;
                        for grad in gradients.gradients.iter_mut() {
                            grad.values.mapv_inplace(|g| g * scale);
                        }
                    }
                }
            }
        }
    }

    /// Take one descent step on every parameter in `params`.
    ///
    /// Every parameter must have a gradient of matching shape.
    pub fn step(&mut self, params: &mut ParamStore, gradients: &KernelGradients) -> Result<()> {
        let mut clipped = gradients.clone();
        self.clip_gradients(&mut clipped);

        // Validate everything before touching any parameter.
        for param in params.iter() {
            let grad = clipped.get_gradient(param.name()).ok_or_else(|| {
                KernelError::ComputationError(format!(
                    "Missing gradient for parameter: {}",
                    param.name()
                ))
            })?;
            if grad.shape() != param.shape() {
                return Err(KernelError::shape_mismatch(
                    format!("gradient of {}", param.name()),
                    param.shape().to_vec(),
                    grad.shape().to_vec(),
                ));
            }
        }

        for param in params.iter_mut() {
            let name = param.name().to_string();
            let Some(grad) = clipped.get_gradient(&name) else {
                continue;
            };

            let velocity = self
                .velocity
                .entry(name)
                .or_insert_with(|| ArrayD::zeros(grad.raw_dim()));

            // v = momentum * v + lr * grad
            let momentum = self.config.momentum;
            let lr = self.config.learning_rate;
            velocity.zip_mut_with(grad, |v, &g| *v = momentum * *v + lr * g);

            // u = u - v
            *param.unconstrained_mut() -= &*velocity;
        }

        self.steps += 1;
        log::debug!(
            "SGD step {}: lr={}, grad_norm={:.6}",
            self.steps,
            self.config.learning_rate,
            clipped.global_norm()
        );
        Ok(())
    }

    /// Reset momentum buffers.
    pub fn zero_grad(&mut self) {
        self.velocity.clear();
    }

    /// Current learning rate.
    pub fn get_lr(&self) -> f64 {
        self.config.learning_rate
    }

    /// Change the learning rate.
    pub fn set_lr(&mut self, lr: f64) -> Result<()> {
        check_learning_rate(lr)?;
        self.config.learning_rate = lr;
        Ok(())
    }

    /// Number of steps taken.
    pub fn steps(&self) -> usize {
        self.steps
    }
}
