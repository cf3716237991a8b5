//! Statistics over secret-shared values.
//!
//! Every estimator in this crate records its computation on an
//! [`Arithmetic`](mpz_arith_core::Arithmetic) provider without branching on
//! secret data. Preconditions are structural (lengths, shapes, public
//! parameters) and are checked while the computation is recorded.

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]
#![deny(unsafe_code)]

pub mod array;
pub mod correlation;
pub mod descriptive;
mod guard;
pub mod histogram;
pub mod hypothesis;
pub mod matrix;
pub mod regression;
pub mod sampling;
pub mod survival;

pub use array::{ArrayError, Indices, MultiDimensionalArray};
pub use matrix::DesignMatrix;

use mpz_arith_core::{ArithError, Arithmetic, ArithmeticExt, Kind, Secret};

/// Statistics result type.
pub type Result<T, E = StatsError> = core::result::Result<T, E>;

/// Errors that can occur when recording a statistical computation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StatsError {
    /// Arithmetic provider error.
    #[error(transparent)]
    Arith(#[from] ArithError),
    /// Container error.
    #[error(transparent)]
    Array(#[from] ArrayError),
    /// An input which must not be empty was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Two inputs which must have equal lengths did not.
    #[error("length mismatch: expected {expected}, got {actual}")]
    Length {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Not enough samples for the statistic.
    #[error("at least {required} samples are required, got {actual}")]
    TooFewSamples {
        /// Required number of samples.
        required: usize,
        /// Actual number of samples.
        actual: usize,
    },
    /// Invalid bucket boundaries.
    #[error("invalid boundaries: {0}")]
    Boundaries(String),
    /// Invalid probabilities.
    #[error("invalid probabilities: {0}")]
    Probabilities(String),
    /// Records with differing covariate layouts.
    #[error("inconsistent covariate layout: {0}")]
    Layout(String),
    /// Invalid public parameter.
    #[error("invalid parameter: {0}")]
    Parameter(String),
}

impl StatsError {
    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(StatsError::Length { expected, actual });
        }

        Ok(())
    }

    pub(crate) fn check_non_empty<T>(values: &[T], what: &'static str) -> Result<()> {
        if values.is_empty() {
            return Err(StatsError::Empty(what));
        }

        Ok(())
    }
}

/// Records public values as known secret values.
pub(crate) fn known_all<A, K>(arith: &mut A, values: &[K::Clear]) -> Result<Vec<Secret<K>>>
where
    A: Arithmetic + ?Sized,
    K: Kind,
{
    values
        .iter()
        .map(|value| arith.known::<K>(*value).map_err(StatsError::from))
        .collect()
}
