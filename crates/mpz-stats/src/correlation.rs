//! Correlation.

use mpz_arith_core::{Arithmetic, ArithmeticExt, SFixed};

use crate::{
    descriptive::{deviations, mean},
    guard::guarded_div,
    Result, StatsError,
};

/// Means and centered second moments of a paired sample.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CoMoments {
    pub(crate) mean_x: SFixed,
    pub(crate) mean_y: SFixed,
    pub(crate) sxx: SFixed,
    pub(crate) syy: SFixed,
    pub(crate) sxy: SFixed,
}

pub(crate) fn co_moments<A>(arith: &mut A, xs: &[SFixed], ys: &[SFixed]) -> Result<CoMoments>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_len(xs.len(), ys.len())?;
    if xs.len() < 2 {
        return Err(StatsError::TooFewSamples {
            required: 2,
            actual: xs.len(),
        });
    }

    let mean_x = mean(arith, xs)?;
    let mean_y = mean(arith, ys)?;

    let dx = deviations(arith, xs, mean_x)?;
    let dy = deviations(arith, ys, mean_y)?;

    let sxx = arith.inner_product(&dx, &dx)?;
    let syy = arith.inner_product(&dy, &dy)?;
    let sxy = arith.inner_product(&dx, &dy)?;

    Ok(CoMoments {
        mean_x,
        mean_y,
        sxx,
        syy,
        sxy,
    })
}

/// Computes the Pearson correlation coefficient of a paired sample.
///
/// Yields `0` if either sample has zero variance.
#[tracing::instrument(level = "debug", skip_all, fields(n = xs.len()))]
pub fn correlation<A>(arith: &mut A, xs: &[SFixed], ys: &[SFixed]) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let CoMoments { sxx, syy, sxy, .. } = co_moments(arith, xs, ys)?;

    let den = arith.mul(sxx, syy)?;
    let den = arith.sqrt(den)?;

    guarded_div(arith, sxy, den)
}
