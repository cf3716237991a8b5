//! Cox proportional hazards regression.
//!
//! Ties are handled with Breslow's method: the risk set of a record is every
//! record whose time is at or after its own.

use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, SFixed};

use crate::{
    regression::GradientDescentConfig,
    survival::{Covariate, CovariateKind, SortedSurvival, SurvivalRecord},
    Result, StatsError,
};

/// Computes the gradient of the Cox partial log-likelihood at `beta`, which
/// has one coefficient per covariate.
#[tracing::instrument(level = "debug", skip_all, fields(n = data.len()))]
pub fn cox_gradient<A>(arith: &mut A, data: &SortedSurvival, beta: &[SFixed]) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    let layout = data.layout();
    StatsError::check_len(layout.len(), beta.len())?;

    let one = arith.known::<Fixed>(1.0)?;

    // exp(l * beta_j) for every level l of every categorical covariate j.
    let level_factors = layout
        .iter()
        .zip(beta)
        .map(|(kind, beta)| match kind {
            CovariateKind::Continuous => Ok(Vec::new()),
            CovariateKind::Categorical(levels) => (0..*levels)
                .map(|level| {
                    if level == 0 {
                        return Ok(one);
                    }
                    let x = arith.scale_int(*beta, level as i64)?;
                    arith.exp(x)
                })
                .collect::<mpz_arith_core::Result<Vec<_>>>(),
        })
        .collect::<mpz_arith_core::Result<Vec<_>>>()?;

    let records = data.records();
    let xs = records
        .iter()
        .map(|record| covariate_values(arith, record))
        .collect::<Result<Vec<_>>>()?;
    let weights = records
        .iter()
        .map(|record| weight(arith, record, beta, &level_factors))
        .collect::<Result<Vec<_>>>()?;

    // Prefix sums over descending time: s[i] = [sum w, sum x_0 w, ...].
    let mut sums: Vec<Vec<SFixed>> = Vec::with_capacity(records.len());
    for (x, w) in xs.iter().zip(&weights) {
        let mut row = Vec::with_capacity(x.len() + 1);
        row.push(*w);
        for x in x {
            row.push(arith.mul(*x, *w)?);
        }

        if let Some(prev) = sums.last() {
            row = row
                .iter()
                .zip(prev)
                .map(|(a, b)| arith.add(*a, *b))
                .collect::<mpz_arith_core::Result<Vec<_>>>()?;
        }
        sums.push(row);
    }

    // Records tied with their successor take the successor's sums, so every
    // record sees the sums of the last record of its tie group.
    for i in (0..records.len().saturating_sub(1)).rev() {
        let tied = arith.leq(records[i].time, records[i + 1].time)?;
        let tied = arith.to_fixed(tied)?;

        let (head, tail) = sums.split_at_mut(i + 1);
        for (s, next) in head[i].iter_mut().zip(&tail[0]) {
            let diff = arith.sub(*next, *s)?;
            let delta = arith.mul(tied, diff)?;
            *s = arith.add(*s, delta)?;
        }
    }

    let mut gradient = vec![Vec::with_capacity(records.len()); beta.len()];
    for ((record, x), sums) in records.iter().zip(&xs).zip(&sums) {
        let inv = arith.div(one, sums[0])?;
        for (j, x) in x.iter().enumerate() {
            let expected = arith.mul(sums[j + 1], inv)?;
            let residual = arith.sub(*x, expected)?;
            gradient[j].push(arith.mul(record.status, residual)?);
        }
    }

    gradient
        .iter()
        .map(|terms| arith.sum(terms).map_err(StatsError::from))
        .collect()
}

/// Returns the value of every covariate of a record, a categorical covariate
/// taking the value of its level.
fn covariate_values<A>(arith: &mut A, record: &SurvivalRecord) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    record
        .covariates
        .iter()
        .map(|covariate| match covariate {
            Covariate::Continuous(x) => Ok(*x),
            Covariate::Categorical(indicators) => {
                let levels = indicators
                    .iter()
                    .enumerate()
                    .map(|(level, indicator)| arith.scale_int(*indicator, level as i64))
                    .collect::<mpz_arith_core::Result<Vec<_>>>()?;
                Ok(arith.sum(&levels)?)
            }
        })
        .collect()
}

/// Computes the relative risk `exp(beta · x)` of a record.
fn weight<A>(
    arith: &mut A,
    record: &SurvivalRecord,
    beta: &[SFixed],
    level_factors: &[Vec<SFixed>],
) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let mut linear = Vec::new();
    let mut factors = Vec::new();
    for ((covariate, beta), level_factors) in record.covariates.iter().zip(beta).zip(level_factors) {
        match covariate {
            Covariate::Continuous(x) => linear.push(arith.mul(*beta, *x)?),
            Covariate::Categorical(indicators) => {
                factors.push(arith.inner_product(indicators, level_factors)?)
            }
        }
    }

    let mut weight = if linear.is_empty() {
        arith.known::<Fixed>(1.0)?
    } else {
        let linear = arith.sum(&linear)?;
        arith.exp(linear)?
    };
    for factor in factors {
        weight = arith.mul(weight, factor)?;
    }

    Ok(weight)
}

/// Fits a Cox model by gradient ascent on the partial log-likelihood,
/// starting at `initial`.
///
/// The records are sorted once before the first epoch.
pub fn cox_regression<A>(
    arith: &mut A,
    records: Vec<SurvivalRecord>,
    initial: &[SFixed],
    config: &GradientDescentConfig,
) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    let data = SortedSurvival::sort(arith, records)?;

    cox_regression_sorted(arith, &data, initial, config)
}

/// Fits a Cox model on records which are already sorted.
#[tracing::instrument(level = "debug", skip_all, fields(n = data.len(), epochs = config.epochs()))]
pub fn cox_regression_sorted<A>(
    arith: &mut A,
    data: &SortedSurvival,
    initial: &[SFixed],
    config: &GradientDescentConfig,
) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_len(data.layout().len(), initial.len())?;

    let mut beta = initial.to_vec();
    for epoch in 0..config.epochs() {
        let rate = config.rate().at(epoch);
        tracing::debug!(epoch, rate, "cox regression epoch");

        let gradient = cox_gradient(arith, data, &beta)?;
        beta = beta
            .iter()
            .zip(&gradient)
            .map(|(beta, gradient)| {
                let step = arith.scale(*gradient, rate)?;
                arith.add(*beta, step)
            })
            .collect::<mpz_arith_core::Result<Vec<_>>>()?;
    }

    Ok(beta)
}

#[cfg(test)]
mod tests {
    use mpz_arith_core::{join_all, test::evaluate, Party};

    use super::*;
    use crate::known_all;

    const TIMES_0: [f64; 19] = [
        6.0, 19.0, 32.0, 42.0, 42.0, 43.0, 94.0, 126.0, 169.0, 207.0, 211.0, 227.0, 253.0, 255.0,
        270.0, 310.0, 316.0, 335.0, 346.0,
    ];
    const STATUS_0: [f64; 19] = [
        1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0,
        0.0,
    ];
    const TIMES_1: [f64; 61] = [
        4.0, 6.0, 10.0, 11.0, 11.0, 11.0, 13.0, 17.0, 20.0, 20.0, 21.0, 22.0, 24.0, 24.0, 29.0,
        30.0, 30.0, 31.0, 33.0, 34.0, 35.0, 39.0, 40.0, 41.0, 43.0, 45.0, 46.0, 50.0, 56.0, 61.0,
        61.0, 63.0, 68.0, 82.0, 85.0, 88.0, 89.0, 90.0, 93.0, 104.0, 110.0, 134.0, 137.0, 160.0,
        169.0, 171.0, 173.0, 175.0, 184.0, 201.0, 222.0, 235.0, 247.0, 260.0, 284.0, 290.0, 291.0,
        302.0, 304.0, 341.0, 345.0,
    ];
    const STATUS_1: [f64; 61] = [
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
        1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0,
        1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0,
        0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ];

    /// `(time, status, group)` of every record, group 0 first.
    fn dataset() -> Vec<(f64, f64, usize)> {
        let group_0 = TIMES_0.iter().zip(STATUS_0).map(|(t, s)| (*t, s, 0));
        let group_1 = TIMES_1.iter().zip(STATUS_1).map(|(t, s)| (*t, s, 1));

        group_0.chain(group_1).collect()
    }

    fn input_records<A: Arithmetic + ?Sized>(
        arith: &mut A,
        dataset: &[(f64, f64, usize)],
    ) -> Result<Vec<SurvivalRecord>> {
        dataset
            .iter()
            .map(|(time, status, group)| {
                let indicators = (0..2)
                    .map(|level| {
                        arith.input_from::<Fixed>(Party::Alice, if level == *group { 1.0 } else { 0.0 })
                    })
                    .collect::<mpz_arith_core::Result<Vec<_>>>()?;

                Ok(SurvivalRecord::new(
                    arith.input_from::<Fixed>(Party::Alice, *time)?,
                    arith.input_from::<Fixed>(Party::Bob, *status)?,
                    vec![Covariate::Categorical(indicators)],
                ))
            })
            .collect()
    }

    #[test]
    fn test_cox_gradient() {
        let mut dataset = dataset();
        dataset.sort_by(|a, b| b.0.total_cmp(&a.0));

        let output = evaluate(|arith| {
            let records = input_records(arith, &dataset)?;
            let data = SortedSurvival::assume_sorted(records)?;
            let beta = known_all::<_, Fixed>(arith, &[1.0])?;

            let gradient = cox_gradient(arith, &data, &beta)?;
            Ok::<_, StatsError>(join_all([arith.reveal(gradient[0])?]))
        })
        .unwrap();

        assert!((output[0] + 0.2586216).abs() < 1e-3, "{}", output[0]);
    }

    #[test]
    fn test_cox_gradient_continuous() {
        // Without ties the gradient is sum_i status_i (x_i - S1_i / S0_i) over
        // the records at or after t_i.
        let times = [9.0, 7.0, 4.0, 2.0];
        let status = [1.0, 0.0, 1.0, 1.0];
        let x = [0.5, -1.0, 2.0, 0.0];
        let beta = 0.3;

        let output = evaluate(|arith| {
            let records = (0..times.len())
                .map(|i| {
                    Ok(SurvivalRecord::new(
                        arith.input_from::<Fixed>(Party::Alice, times[i])?,
                        arith.input_from::<Fixed>(Party::Alice, status[i])?,
                        vec![Covariate::Continuous(
                            arith.input_from::<Fixed>(Party::Bob, x[i])?,
                        )],
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            let data = SortedSurvival::assume_sorted(records)?;
            let beta = known_all::<_, Fixed>(arith, &[beta])?;

            let gradient = cox_gradient(arith, &data, &beta)?;
            Ok::<_, StatsError>(join_all([arith.reveal(gradient[0])?]))
        })
        .unwrap();

        let mut expected = 0.0;
        for i in 0..times.len() {
            let (s0, s1) = (0..=i).fold((0.0, 0.0), |(s0, s1), m| {
                let w = (beta * x[m]).exp();
                (s0 + w, s1 + x[m] * w)
            });
            expected += status[i] * (x[i] - s1 / s0);
        }

        assert!((output[0] - expected).abs() < 1e-3, "{} != {expected}", output[0]);
    }

    #[test]
    fn test_cox_regression() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let dataset = dataset();
        let config = GradientDescentConfig::builder()
            .epochs(5)
            .rate(0.1)
            .build()
            .unwrap();

        let output = evaluate(|arith| {
            let records = input_records(arith, &dataset)?;
            let initial = known_all::<_, Fixed>(arith, &[1.0])?;

            let beta = cox_regression(arith, records, &initial, &config)?;
            Ok::<_, StatsError>(join_all([arith.reveal(beta[0])?]))
        })
        .unwrap();

        assert!((output[0] - 0.9610201).abs() < 1e-3, "{}", output[0]);
    }

    #[test]
    fn test_cox_preconditions() {
        let (mut alice, _) = mpz_arith_core::ideal::ideal_arith(0);
        let x = alice.known::<Fixed>(1.0).unwrap();
        let data = SortedSurvival::assume_sorted(vec![SurvivalRecord::new(
            x,
            x,
            vec![Covariate::Continuous(x)],
        )])
        .unwrap();

        assert!(matches!(
            cox_gradient(&mut alice, &data, &[x, x]),
            Err(StatsError::Length { .. })
        ));
        assert!(matches!(
            cox_regression(
                &mut alice,
                vec![],
                &[x],
                &GradientDescentConfig::builder()
                    .epochs(1)
                    .rate(0.1)
                    .build()
                    .unwrap()
            ),
            Err(StatsError::Empty(_))
        ));
    }
}
