use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, SFixed};

use crate::{
    correlation::{co_moments, CoMoments},
    guard::guarded_div,
    DesignMatrix, Result, StatsError,
};

/// A secret affine function `x -> intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearFunction {
    /// Intercept.
    pub intercept: SFixed,
    /// Slope.
    pub slope: SFixed,
}

impl LinearFunction {
    /// Evaluates the function at `x`.
    pub fn apply<A>(&self, arith: &mut A, x: SFixed) -> Result<SFixed>
    where
        A: Arithmetic + ?Sized,
    {
        let y = arith.mul(self.slope, x)?;

        Ok(arith.add(self.intercept, y)?)
    }
}

/// Fits `y = a + b * x` by least squares.
///
/// The slope is `0` if `xs` has zero variance.
#[tracing::instrument(level = "debug", skip_all, fields(n = xs.len()))]
pub fn simple_linear_regression<A>(
    arith: &mut A,
    xs: &[SFixed],
    ys: &[SFixed],
) -> Result<LinearFunction>
where
    A: Arithmetic + ?Sized,
{
    let CoMoments {
        mean_x,
        mean_y,
        sxx,
        sxy,
        ..
    } = co_moments(arith, xs, ys)?;

    let slope = guarded_div(arith, sxy, sxx)?;
    let shift = arith.mul(slope, mean_x)?;
    let intercept = arith.sub(mean_y, shift)?;

    Ok(LinearFunction { intercept, slope })
}

/// Fits `y = X β` by ordinary least squares, returning `β`.
///
/// Solves the normal equations `XᵀX β = Xᵀy` by Gauss-Jordan elimination.
/// The elimination does not pivot, so the design must have full column rank.
/// Add an intercept column to the design to fit an intercept.
#[tracing::instrument(level = "debug", skip_all, fields(height = design.height(), width = design.width()))]
pub fn linear_regression<A>(arith: &mut A, design: &DesignMatrix, y: &[SFixed]) -> Result<Vec<SFixed>>
where
    A: Arithmetic + ?Sized,
{
    let (height, width) = (design.height(), design.width());
    StatsError::check_len(height, y.len())?;
    if height < width {
        return Err(StatsError::TooFewSamples {
            required: width,
            actual: height,
        });
    }

    let columns = (0..width)
        .map(|j| design.column(j).ok_or(StatsError::Empty("design matrix column")))
        .collect::<Result<Vec<_>>>()?;

    // Augmented system [XᵀX | Xᵀy].
    let mut system = columns
        .iter()
        .map(|a| {
            let mut row = columns
                .iter()
                .map(|b| arith.inner_product(a, b))
                .collect::<mpz_arith_core::Result<Vec<_>>>()?;
            row.push(arith.inner_product(a, y)?);
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()?;

    let one = arith.known::<Fixed>(1.0)?;
    for col in 0..width {
        let inv = arith.div(one, system[col][col])?;
        system[col] = system[col]
            .iter()
            .map(|x| arith.mul(*x, inv))
            .collect::<mpz_arith_core::Result<Vec<_>>>()?;

        let pivot = system[col].clone();
        for (i, row) in system.iter_mut().enumerate() {
            if i == col {
                continue;
            }

            let factor = row[col];
            for (x, p) in row.iter_mut().zip(&pivot) {
                let delta = arith.mul(factor, *p)?;
                *x = arith.sub(*x, delta)?;
            }
        }
    }

    Ok(system.into_iter().map(|row| row[width]).collect())
}
