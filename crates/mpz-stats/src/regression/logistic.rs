use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, SFixed};

use crate::{regression::GradientDescentConfig, DesignMatrix, Result, StatsError};

/// Computes `σ(β·x) = 1 / (1 + e^{-β·x})`, where `β_0` is the intercept.
///
/// `coefficients` must be one longer than `row`.
pub fn predict<A>(arith: &mut A, coefficients: &[SFixed], row: &[SFixed]) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_len(row.len() + 1, coefficients.len())?;

    let linear = arith.inner_product(&coefficients[1..], row)?;
    let linear = arith.add(coefficients[0], linear)?;

    let exp = arith.neg(linear)?;
    let exp = arith.exp(exp)?;

    let one = arith.known::<Fixed>(1.0)?;
    let den = arith.add(one, exp)?;

    Ok(arith.div(one, den)?)
}

/// Performs a single gradient descent step on the log-likelihood loss,
/// returning the updated coefficients.
pub fn logistic_epoch<A>(
    arith: &mut A,
    design: &DesignMatrix,
    labels: &[SFixed],
    coefficients: &[SFixed],
    rate: f64,
) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_len(design.height(), labels.len())?;
    StatsError::check_len(design.width() + 1, coefficients.len())?;

    let errors = design
        .rows()
        .iter()
        .zip(labels)
        .map(|(row, y)| {
            let p = predict(arith, coefficients, row)?;
            Ok(arith.sub(p, *y)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut updated = Vec::with_capacity(coefficients.len());
    for (j, beta) in coefficients.iter().enumerate() {
        let score = if j == 0 {
            arith.sum(&errors)?
        } else {
            let column = design
                .column(j - 1)
                .ok_or(StatsError::Empty("design matrix column"))?;
            arith.inner_product(&errors, &column)?
        };

        let step = arith.scale(score, rate)?;
        updated.push(arith.sub(*beta, step)?);
    }

    Ok(updated)
}

/// Fits a logistic regression model by gradient descent, starting at
/// `initial`.
///
/// `labels` are `0` or `1`, `initial` has an intercept followed by one
/// coefficient per column of `design`.
#[tracing::instrument(level = "debug", skip_all, fields(height = design.height(), width = design.width(), epochs = config.epochs()))]
pub fn logistic_regression<A>(
    arith: &mut A,
    design: &DesignMatrix,
    labels: &[SFixed],
    initial: &[SFixed],
    config: &GradientDescentConfig,
) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    StatsError::check_len(design.width() + 1, initial.len())?;

    let mut coefficients = initial.to_vec();
    for epoch in 0..config.epochs() {
        let rate = config.rate().at(epoch);
        tracing::debug!(epoch, rate, "logistic regression epoch");

        coefficients = logistic_epoch(arith, design, labels, &coefficients, rate)?;
    }

    Ok(coefficients)
}
