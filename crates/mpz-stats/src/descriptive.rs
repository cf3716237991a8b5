//! Descriptive statistics.

use mpz_arith_core::{Arithmetic, ArithmeticExt, SFixed};

use crate::{Result, StatsError};

/// Computes the sum of the observations.
pub fn sum<A>(arith: &mut A, xs: &[SFixed]) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_non_empty(xs, "observations")?;

    Ok(arith.sum(xs)?)
}

/// Computes the mean of the observations.
#[tracing::instrument(level = "debug", skip_all, fields(n = xs.len()))]
pub fn mean<A>(arith: &mut A, xs: &[SFixed]) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let sum = sum(arith, xs)?;

    Ok(arith.scale(sum, 1.0 / xs.len() as f64)?)
}

/// Computes the sum of squared deviations from `mean`.
pub(crate) fn sum_of_squares<A>(arith: &mut A, xs: &[SFixed], mean: SFixed) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let deviations = deviations(arith, xs, mean)?;

    Ok(arith.inner_product(&deviations, &deviations)?)
}

/// Returns `x - mean` for every observation.
pub(crate) fn deviations<A>(arith: &mut A, xs: &[SFixed], mean: SFixed) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    xs.iter()
        .map(|x| arith.sub(*x, mean).map_err(StatsError::from))
        .collect()
}

/// Computes the sample variance of the observations, normalized by `n - 1`.
#[tracing::instrument(level = "debug", skip_all, fields(n = xs.len()))]
pub fn variance<A>(arith: &mut A, xs: &[SFixed]) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    Ok(moments(arith, xs)?.variance)
}

/// Computes the sample standard deviation of the observations.
pub fn std_dev<A>(arith: &mut A, xs: &[SFixed]) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let variance = variance(arith, xs)?;

    Ok(arith.sqrt(variance)?)
}

/// Mean and sample variance of a sample.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Moments {
    pub(crate) mean: SFixed,
    pub(crate) variance: SFixed,
}

pub(crate) fn moments<A>(arith: &mut A, xs: &[SFixed]) -> Result<Moments>
where
    A: Arithmetic + ?Sized,
{
    if xs.len() < 2 {
        return Err(StatsError::TooFewSamples {
            required: 2,
            actual: xs.len(),
        });
    }

    let mean = mean(arith, xs)?;
    let ss = sum_of_squares(arith, xs, mean)?;
    let variance = arith.scale(ss, 1.0 / (xs.len() - 1) as f64)?;

    Ok(Moments { mean, variance })
}

#[cfg(test)]
mod tests {
    use mpz_arith_core::{join_all, test::evaluate, Fixed, Party};

    use super::*;

    const DATA: [f64; 10] = [65.0, 78.0, 88.0, 55.0, 48.0, 95.0, 66.0, 57.0, 79.0, 81.0];

    fn input<A: Arithmetic + ?Sized>(arith: &mut A, data: &[f64]) -> Result<Vec<SFixed>> {
        data.iter()
            .map(|x| arith.input_from::<Fixed>(Party::Alice, *x).map_err(StatsError::from))
            .collect()
    }

    #[test]
    fn test_descriptive() {
        let output = evaluate(|arith| {
            let xs = input(arith, &DATA)?;

            let sum = sum(arith, &xs)?;
            let mean = mean(arith, &xs)?;
            let variance = variance(arith, &xs)?;
            let std_dev = std_dev(arith, &xs)?;

            Ok::<_, StatsError>(join_all([
                arith.reveal(sum)?,
                arith.reveal(mean)?,
                arith.reveal(variance)?,
                arith.reveal(std_dev)?,
            ]))
        })
        .unwrap();

        let n = DATA.len() as f64;
        let expected_mean = DATA.iter().sum::<f64>() / n;
        let expected_variance =
            DATA.iter().map(|x| (x - expected_mean).powi(2)).sum::<f64>() / (n - 1.0);

        assert!((output[0] - 712.0).abs() < 1e-6);
        assert!((output[1] - expected_mean).abs() < 1e-4);
        assert!((output[2] - expected_variance).abs() < 1e-3);
        assert!((output[3] - expected_variance.sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_descriptive_preconditions() {
        let (mut alice, _) = mpz_arith_core::ideal::ideal_arith(0);
        let x = alice.known::<Fixed>(1.0).unwrap();

        assert!(matches!(mean(&mut alice, &[]), Err(StatsError::Empty(_))));
        assert!(matches!(
            variance(&mut alice, &[x]),
            Err(StatsError::TooFewSamples {
                required: 2,
                actual: 1
            })
        ));
    }
}
