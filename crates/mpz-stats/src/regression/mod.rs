//! Regression models.

mod linear;
mod logistic;

pub use linear::{linear_regression, simple_linear_regression, LinearFunction};
pub use logistic::{logistic_epoch, logistic_regression, predict};

use std::{fmt, sync::Arc};

use derive_builder::Builder;

/// Learning rate of a gradient method.
#[derive(Clone)]
pub enum LearningRate {
    /// The same rate in every epoch.
    Fixed(f64),
    /// A rate depending on the epoch, starting at `0`.
    Schedule(Arc<dyn Fn(usize) -> f64 + Send + Sync>),
}

impl LearningRate {
    /// Creates a rate schedule.
    pub fn schedule<F>(f: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + Sync + 'static,
    {
        Self::Schedule(Arc::new(f))
    }

    /// Returns the rate of the given epoch.
    pub fn at(&self, epoch: usize) -> f64 {
        match self {
            LearningRate::Fixed(rate) => *rate,
            LearningRate::Schedule(f) => f(epoch),
        }
    }
}

impl From<f64> for LearningRate {
    fn from(rate: f64) -> Self {
        Self::Fixed(rate)
    }
}

impl fmt::Debug for LearningRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningRate::Fixed(rate) => f.debug_tuple("Fixed").field(rate).finish(),
            LearningRate::Schedule(_) => f.debug_tuple("Schedule").finish_non_exhaustive(),
        }
    }
}

/// Gradient method configuration.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct GradientDescentConfig {
    /// Number of epochs.
    epochs: usize,
    /// Learning rate.
    #[builder(setter(into))]
    rate: LearningRate,
}

impl GradientDescentConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(LearningRate::Fixed(rate)) = &self.rate {
            if !rate.is_finite() {
                return Err(format!("learning rate must be finite, got {rate}"));
            }
        }

        Ok(())
    }
}

impl GradientDescentConfig {
    /// Creates a new builder for GradientDescentConfig.
    pub fn builder() -> GradientDescentConfigBuilder {
        GradientDescentConfigBuilder::default()
    }

    /// Returns the number of epochs.
    pub fn epochs(&self) -> usize {
        self.epochs
    }

    /// Returns the learning rate.
    pub fn rate(&self) -> &LearningRate {
        &self.rate
    }
}
