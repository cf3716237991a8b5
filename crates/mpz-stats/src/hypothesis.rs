//! Test statistics for hypothesis tests.
//!
//! Only the statistics are computed, p-values can be derived from the revealed
//! statistic in the clear.

use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, SFixed};

use crate::{
    descriptive::moments,
    guard::guarded_div,
    histogram::{histogram, Boundaries},
    Result, StatsError,
};

/// Variance estimate used by the two-sample t-test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Variance {
    /// Separate variances for each sample (Welch's t-test).
    #[default]
    Unpooled,
    /// A pooled variance, assuming equal population variances.
    Pooled,
}

/// Computes the one-sample t-statistic `(mean(x) - mu) / (s / sqrt(n))`.
///
/// Yields `0` if the sample has zero variance.
#[tracing::instrument(level = "debug", skip_all, fields(n = xs.len()))]
pub fn t_test<A>(arith: &mut A, xs: &[SFixed], mu: SFixed) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let moments = moments(arith, xs)?;

    let diff = arith.sub(moments.mean, mu)?;
    let diff = arith.scale(diff, (xs.len() as f64).sqrt())?;
    let s = arith.sqrt(moments.variance)?;

    guarded_div(arith, diff, s)
}

/// Computes the two-sample t-statistic for the difference of the means of
/// `xs` and `ys`.
///
/// Yields `0` if both samples have zero variance.
#[tracing::instrument(level = "debug", skip_all, fields(n_x = xs.len(), n_y = ys.len(), variance = ?variance))]
pub fn two_sample_t_test<A>(
    arith: &mut A,
    xs: &[SFixed],
    ys: &[SFixed],
    variance: Variance,
) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let x = moments(arith, xs)?;
    let y = moments(arith, ys)?;
    let (n_x, n_y) = (xs.len() as f64, ys.len() as f64);

    let standard_error = match variance {
        Variance::Unpooled => {
            let v_x = arith.scale(x.variance, 1.0 / n_x)?;
            let v_y = arith.scale(y.variance, 1.0 / n_y)?;
            arith.add(v_x, v_y)?
        }
        Variance::Pooled => {
            let v_x = arith.scale(x.variance, n_x - 1.0)?;
            let v_y = arith.scale(y.variance, n_y - 1.0)?;
            let pooled = arith.add(v_x, v_y)?;
            arith.scale(pooled, (1.0 / n_x + 1.0 / n_y) / (n_x + n_y - 2.0))?
        }
    };
    let standard_error = arith.sqrt(standard_error)?;

    let diff = arith.sub(x.mean, y.mean)?;

    guarded_div(arith, diff, standard_error)
}

/// Expected bucket counts of a chi-square goodness-of-fit test.
#[derive(Debug, Clone)]
pub enum Expected {
    /// Public expected counts, which must be positive.
    Known(Vec<f64>),
    /// Secret expected counts, which must be non-negative.
    ///
    /// Buckets with an expected count of zero contribute `0`.
    Secret(Vec<SFixed>),
}

impl Expected {
    fn len(&self) -> usize {
        match self {
            Expected::Known(expected) => expected.len(),
            Expected::Secret(expected) => expected.len(),
        }
    }
}

/// Computes the chi-square statistic `sum((o - e)^2 / e)` of observed bucket
/// counts against expected counts.
#[tracing::instrument(level = "debug", skip_all, fields(buckets = observed.len()))]
pub fn chi_square<A>(arith: &mut A, observed: &[SFixed], expected: &Expected) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_non_empty(observed, "observed counts")?;
    StatsError::check_len(observed.len(), expected.len())?;

    let terms = match expected {
        Expected::Known(expected) => {
            if let Some(e) = expected.iter().find(|e| e.is_nan() || **e <= 0.0) {
                return Err(StatsError::Parameter(format!(
                    "expected counts must be positive, got {e}"
                )));
            }

            observed
                .iter()
                .zip(expected)
                .map(|(o, e)| {
                    let e_secret = arith.known::<Fixed>(*e)?;
                    let diff = arith.sub(*o, e_secret)?;
                    let square = arith.mul(diff, diff)?;
                    Ok(arith.scale(square, 1.0 / e)?)
                })
                .collect::<Result<Vec<_>>>()?
        }
        Expected::Secret(expected) => observed
            .iter()
            .zip(expected)
            .map(|(o, e)| {
                let diff = arith.sub(*o, *e)?;
                let square = arith.mul(diff, diff)?;
                guarded_div(arith, square, *e)
            })
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(arith.sum(&terms)?)
}

/// Computes the chi-square statistic of raw observations, which are first
/// bucketed by `boundaries`.
///
/// `k` boundaries define `k + 1` buckets, so `expected` must have `k + 1`
/// entries.
pub fn chi_square_bucketed<A>(
    arith: &mut A,
    values: &[SFixed],
    boundaries: &Boundaries<Fixed>,
    expected: &Expected,
) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_len(boundaries.len() + 1, expected.len())?;

    let counts = histogram(arith, values, boundaries)?;
    let observed = counts
        .iter()
        .map(|count| arith.to_fixed(*count).map_err(StatsError::from))
        .collect::<Result<Vec<_>>>()?;

    chi_square(arith, &observed, expected)
}
