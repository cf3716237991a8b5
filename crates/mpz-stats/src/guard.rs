use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, SFixed};

use crate::Result;

/// Computes `num / den` for a non-negative `den`, yielding `0` if `den` is
/// zero.
///
/// With `z = [den <= 0]` this is `num / (den + z) * (1 - z)`.
pub(crate) fn guarded_div<A>(arith: &mut A, num: SFixed, den: SFixed) -> Result<SFixed>
where
    A: Arithmetic + ?Sized,
{
    let zero = arith.known::<Fixed>(0.0)?;
    let one = arith.known::<Fixed>(1.0)?;

    let z = arith.leq(den, zero)?;
    let z = arith.to_fixed(z)?;

    let den = arith.add(den, z)?;
    let quotient = arith.div(num, den)?;
    let keep = arith.sub(one, z)?;

    Ok(arith.mul(quotient, keep)?)
}

#[cfg(test)]
mod tests {
    use mpz_arith_core::{join_all, test::evaluate, Party};
    use rstest::*;

    use super::*;
    use crate::StatsError;

    #[rstest]
    #[case(3.0, 2.0, 1.5)]
    #[case(3.0, 0.0, 0.0)]
    #[case(-1.0, 4.0, -0.25)]
    fn test_guarded_div(#[case] num: f64, #[case] den: f64, #[case] expected: f64) {
        let output = evaluate(|arith| {
            let num = arith.input_from::<Fixed>(Party::Alice, num)?;
            let den = arith.input_from::<Fixed>(Party::Bob, den)?;
            let q = guarded_div(arith, num, den)?;
            Ok::<_, StatsError>(join_all([arith.reveal(q)?]))
        })
        .unwrap();

        assert!((output[0] - expected).abs() < 1e-6);
    }
}
