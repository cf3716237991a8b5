//! Oblivious sampling from a categorical distribution.

use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, SFixed, SInt};

use crate::{Result, StatsError};

/// Probabilities of a categorical distribution.
#[derive(Debug, Clone)]
pub enum Probabilities {
    /// Public probabilities, normalized before sampling.
    Known(Vec<f64>),
    /// Secret probabilities.
    Secret {
        /// Probability masses, which must be non-negative.
        values: Vec<SFixed>,
        /// Whether the masses sum to `1`.
        normalized: bool,
    },
}

impl Probabilities {
    /// Returns the number of categories.
    pub fn len(&self) -> usize {
        match self {
            Probabilities::Known(values) => values.len(),
            Probabilities::Secret { values, .. } => values.len(),
        }
    }

    /// Returns `true` if there are no categories.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Draws a category index in `0..n` with the given probabilities, without
/// revealing it to either party.
///
/// Unnormalized secret masses which are all zero always yield `n - 1`.
#[tracing::instrument(level = "debug", skip_all, fields(n = probabilities.len()))]
pub fn sample<A>(arith: &mut A, probabilities: &Probabilities) -> Result<SInt>
where
    A: Arithmetic + ?Sized,
{
    let below = match probabilities {
        Probabilities::Known(values) => {
            let cumulative = known_cumulative(values)?;
            let r = arith.uniform()?;

            // The last cumulative sum is the total mass, which is always above r.
            cumulative[..cumulative.len() - 1]
                .iter()
                .map(|c| {
                    let c = arith.known::<Fixed>(*c)?;
                    arith.leq(c, r)
                })
                .collect::<mpz_arith_core::Result<Vec<_>>>()?
        }
        Probabilities::Secret { values, normalized } => {
            StatsError::check_non_empty(values, "probabilities")?;

            let r = arith.uniform()?;
            let r = if *normalized {
                r
            } else {
                let total = arith.sum(values)?;
                arith.mul(r, total)?
            };

            let mut below = Vec::with_capacity(values.len() - 1);
            let mut c = values[0];
            for p in &values[1..] {
                below.push(arith.leq(c, r)?);
                c = arith.add(c, *p)?;
            }
            below
        }
    };

    Ok(arith.sum(&below)?)
}

/// Draws `count` independent samples.
pub fn sample_many<A>(
    arith: &mut A,
    probabilities: &Probabilities,
    count: usize,
) -> Result<Vec<SInt>>
where
    A: Arithmetic + ?Sized,
{
    (0..count).map(|_| sample(arith, probabilities)).collect()
}

/// Normalized cumulative sums of public probabilities.
fn known_cumulative(values: &[f64]) -> Result<Vec<f64>> {
    StatsError::check_non_empty(values, "probabilities")?;

    if let Some(p) = values.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(StatsError::Probabilities(format!(
            "probabilities must be finite and non-negative, got {p}"
        )));
    }

    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return Err(StatsError::Probabilities(
            "probabilities must not all be zero".to_string(),
        ));
    }

    Ok(values
        .iter()
        .scan(0.0, |acc, p| {
            *acc += p / total;
            Some(*acc)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use mpz_arith_core::{ideal::IdealArith, join_all, test::evaluate, Party};
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;

    fn frequencies(draws: &[i64], n: usize) -> Vec<f64> {
        let mut counts = vec![0usize; n];
        for draw in draws {
            counts[*draw as usize] += 1;
        }
        counts
            .into_iter()
            .map(|count| count as f64 / draws.len() as f64)
            .collect()
    }

    fn draw<F>(probabilities: F, count: usize) -> Vec<i64>
    where
        F: Fn(&mut IdealArith) -> Result<Probabilities>,
    {
        evaluate(|arith| {
            let probabilities = probabilities(arith)?;
            let draws = sample_many(arith, &probabilities, count)?;
            let reveals = draws
                .into_iter()
                .map(|draw| arith.reveal(draw))
                .collect::<mpz_arith_core::Result<Vec<_>>>()?;
            Ok::<_, StatsError>(join_all(reveals))
        })
        .unwrap()
    }

    #[test]
    fn test_sample_known_converges() {
        let p = [0.1, 0.2, 0.3, 0.4];

        let draws = draw(|_| Ok(Probabilities::Known(p.to_vec())), 2000);

        for (freq, p) in frequencies(&draws, p.len()).into_iter().zip(p) {
            assert!((freq - p).abs() < 0.05, "{freq} != {p}");
        }
    }

    #[rstest]
    #[case::normalized(vec![0.25, 0.75], true)]
    #[case::unnormalized(vec![1.0, 3.0], false)]
    fn test_sample_secret_converges(#[case] p: Vec<f64>, #[case] normalized: bool) {
        let draws = draw(
            |arith| {
                let values = p
                    .iter()
                    .map(|p| arith.input_from::<Fixed>(Party::Alice, *p))
                    .collect::<mpz_arith_core::Result<Vec<_>>>()?;
                Ok(Probabilities::Secret { values, normalized })
            },
            2000,
        );

        let freq = frequencies(&draws, 2);
        assert!((freq[1] - 0.75).abs() < 0.05, "{}", freq[1]);
    }

    #[test]
    fn test_sample_one_hot_is_deterministic() {
        let draws = draw(|_| Ok(Probabilities::Known(vec![0.0, 0.0, 1.0, 0.0])), 50);
        assert_eq!(draws, vec![2; 50]);

        let draws = draw(
            |arith| {
                let values = [0.0, 5.0, 0.0]
                    .iter()
                    .map(|p| arith.input_from::<Fixed>(Party::Bob, *p))
                    .collect::<mpz_arith_core::Result<Vec<_>>>()?;
                Ok(Probabilities::Secret {
                    values,
                    normalized: false,
                })
            },
            50,
        );
        assert_eq!(draws, vec![1; 50]);
    }

    #[test]
    fn test_sample_single_category() {
        let draws = draw(|_| Ok(Probabilities::Known(vec![3.0])), 5);
        assert_eq!(draws, vec![0; 5]);
    }

    #[test]
    fn test_sample_preconditions() {
        let (mut alice, _) = mpz_arith_core::ideal::ideal_arith(0);

        assert!(matches!(
            sample(&mut alice, &Probabilities::Known(vec![])),
            Err(StatsError::Empty(_))
        ));
        assert!(matches!(
            sample(&mut alice, &Probabilities::Known(vec![0.5, -0.1])),
            Err(StatsError::Probabilities(_))
        ));
        assert!(matches!(
            sample(&mut alice, &Probabilities::Known(vec![0.0, 0.0])),
            Err(StatsError::Probabilities(_))
        ));
        assert!(matches!(
            sample(
                &mut alice,
                &Probabilities::Secret {
                    values: vec![],
                    normalized: true
                }
            ),
            Err(StatsError::Empty(_))
        ));
    }
}
