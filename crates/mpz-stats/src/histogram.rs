//! Oblivious histograms.
//!
//! A point is bucketed without revealing its bucket: it is compared against
//! every boundary and the resulting bucket index is expanded into a one-hot
//! vector, which is summed over all points.
//!
//! `k` boundaries `b_0 < ... < b_{k-1}` define `k + 1` buckets, bucket `j`
//! being `(b_{j-1}, b_j]` where the outer buckets are open-ended.

use mpz_arith_core::{Arithmetic, ArithmeticExt, Int, Kind, SInt, Secret};

use crate::{known_all, MultiDimensionalArray, Result, StatsError};

/// Bucket boundaries.
#[derive(Debug, Clone)]
pub struct Boundaries<K: Kind>(BoundariesRepr<K>);

#[derive(Debug, Clone)]
enum BoundariesRepr<K: Kind> {
    Known(Vec<K::Clear>),
    Secret(Vec<Secret<K>>),
}

impl<K: Kind> Boundaries<K> {
    /// Creates public boundaries, which must be strictly increasing.
    pub fn known(boundaries: Vec<K::Clear>) -> Result<Self> {
        StatsError::check_non_empty(&boundaries, "boundaries")?;

        if let Some(i) = boundaries
            .windows(2)
            .position(|pair| !matches!(pair[0].partial_cmp(&pair[1]), Some(std::cmp::Ordering::Less)))
        {
            return Err(StatsError::Boundaries(format!(
                "boundaries must be strictly increasing, got {:?} followed by {:?}",
                boundaries[i],
                boundaries[i + 1]
            )));
        }

        Ok(Self(BoundariesRepr::Known(boundaries)))
    }

    /// Creates secret boundaries.
    ///
    /// The boundaries must be strictly increasing, which can not be checked.
    pub fn secret(boundaries: Vec<Secret<K>>) -> Result<Self> {
        StatsError::check_non_empty(&boundaries, "boundaries")?;

        Ok(Self(BoundariesRepr::Secret(boundaries)))
    }

    /// Returns the number of boundaries.
    pub fn len(&self) -> usize {
        match &self.0 {
            BoundariesRepr::Known(boundaries) => boundaries.len(),
            BoundariesRepr::Secret(boundaries) => boundaries.len(),
        }
    }

    /// Returns `true` if there are no boundaries, which is never the case.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of buckets.
    pub fn buckets(&self) -> usize {
        self.len() + 1
    }

    fn to_secret<A>(&self, arith: &mut A) -> Result<Vec<Secret<K>>>
    where
        A: Arithmetic + ?Sized,
    {
        match &self.0 {
            BoundariesRepr::Known(boundaries) => known_all(arith, boundaries),
            BoundariesRepr::Secret(boundaries) => Ok(boundaries.clone()),
        }
    }
}

/// Computes the one-hot bucket indicator of `x`.
///
/// The result has `boundaries.len() + 1` entries, exactly one of which is `1`.
pub fn one_hot<A, K>(arith: &mut A, x: Secret<K>, boundaries: &[Secret<K>]) -> Result<Vec<SInt>>
where
    A: Arithmetic + ?Sized,
    K: Kind,
{
    StatsError::check_non_empty(boundaries, "boundaries")?;
    let k = boundaries.len();

    // Number of boundaries at or above x.
    let above = boundaries
        .iter()
        .map(|b| arith.leq(x, *b))
        .collect::<mpz_arith_core::Result<Vec<_>>>()?;
    let above = arith.sum(&above)?;

    let k_secret = arith.known::<Int>(k as i64)?;
    let idx = arith.sub(k_secret, above)?;

    // le[j] = [idx <= j] for j in 0..k, [idx <= k] is always 1.
    let mut le = (0..k)
        .map(|j| {
            let j = arith.known::<Int>(j as i64)?;
            arith.leq(idx, j)
        })
        .collect::<mpz_arith_core::Result<Vec<_>>>()?;
    le.push(arith.known::<Int>(1)?);

    let mut indicators = Vec::with_capacity(k + 1);
    indicators.push(le[0]);
    for j in 1..=k {
        indicators.push(arith.sub(le[j], le[j - 1])?);
    }

    Ok(indicators)
}

/// Computes the bucket counts of `values`.
#[tracing::instrument(level = "debug", skip_all, fields(n = values.len(), buckets = boundaries.buckets()))]
pub fn histogram<A, K>(
    arith: &mut A,
    values: &[Secret<K>],
    boundaries: &Boundaries<K>,
) -> Result<Vec<SInt>>
where
    A: Arithmetic + ?Sized,
    K: Kind,
{
    StatsError::check_non_empty(values, "values")?;

    let boundaries = boundaries.to_secret(arith)?;
    let indicators = values
        .iter()
        .map(|x| one_hot(arith, *x, &boundaries))
        .collect::<Result<Vec<_>>>()?;

    (0..boundaries.len() + 1)
        .map(|j| {
            let column = indicators.iter().map(|row| row[j]).collect::<Vec<_>>();
            Ok(arith.sum(&column)?)
        })
        .collect()
}

/// Computes the joint bucket counts of multi-dimensional points.
///
/// Axis `i` of the result is bucketed by `boundaries[i]`, the cell at
/// `(j_0, ..., j_{d-1})` counts the points falling into bucket `j_i` on every
/// axis `i`.
#[tracing::instrument(level = "debug", skip_all, fields(n = points.len(), axes = boundaries.len()))]
pub fn histogram_nd<A, K>(
    arith: &mut A,
    points: &[Vec<Secret<K>>],
    boundaries: &[Boundaries<K>],
) -> Result<MultiDimensionalArray<SInt>>
where
    A: Arithmetic + ?Sized,
    K: Kind,
{
    StatsError::check_non_empty(boundaries, "axes")?;
    StatsError::check_non_empty(points, "points")?;
    for point in points {
        StatsError::check_len(boundaries.len(), point.len())?;
    }

    let boundaries = boundaries
        .iter()
        .map(|boundaries| boundaries.to_secret(arith))
        .collect::<Result<Vec<_>>>()?;

    let mut counts: Option<MultiDimensionalArray<SInt>> = None;
    for point in points {
        let indicator = point_indicator(arith, point, &boundaries)?;
        counts = Some(match counts {
            Some(counts) => counts.try_zip_with(&indicator, |a, b| {
                arith.add(*a, *b).map_err(StatsError::from)
            })?,
            None => indicator,
        });
    }

    counts.ok_or(StatsError::Empty("points"))
}

/// Computes the joint one-hot indicator of a point.
fn point_indicator<A, K>(
    arith: &mut A,
    point: &[Secret<K>],
    boundaries: &[Vec<Secret<K>>],
) -> Result<MultiDimensionalArray<SInt>>
where
    A: Arithmetic + ?Sized,
    K: Kind,
{
    let mut axes = point
        .iter()
        .zip(boundaries)
        .map(|(x, boundaries)| {
            let indicators = one_hot(arith, *x, boundaries)?;
            Ok(MultiDimensionalArray::from_vec(indicators)?)
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter();

    let first = axes.next().ok_or(StatsError::Empty("axes"))?;
    axes.try_fold(first, |acc, axis| {
        acc.try_tensor_product(&axis, |a, b| arith.mul(*a, *b).map_err(StatsError::from))
    })
}

#[cfg(test)]
mod tests {
    use mpz_arith_core::{join_all, test::evaluate, Fixed, Party};
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;
    use rstest::*;

    use super::*;

    fn clear_bucket(x: i64, boundaries: &[i64]) -> usize {
        boundaries.iter().filter(|b| **b < x).count()
    }

    fn reveal_all<A: Arithmetic + ?Sized>(
        arith: &mut A,
        values: &[SInt],
    ) -> Result<mpz_arith_core::JoinAll<mpz_arith_core::Revealed<Int>>> {
        let reveals = values
            .iter()
            .map(|value| arith.reveal(*value))
            .collect::<mpz_arith_core::Result<Vec<_>>>()?;

        Ok(join_all(reveals))
    }

    #[rstest]
    #[case::known(false)]
    #[case::secret(true)]
    fn test_histogram_int(#[case] secret: bool) {
        let data = [1, 5, 7, 3, 9, 5, 34, 5, -1, -3];
        let buckets = [0, 5, 10];

        let output = evaluate(|arith| {
            let xs = data
                .iter()
                .map(|x| arith.input_from::<Int>(Party::Alice, *x))
                .collect::<mpz_arith_core::Result<Vec<_>>>()?;
            let boundaries = if secret {
                Boundaries::secret(
                    buckets
                        .iter()
                        .map(|b| arith.input_from::<Int>(Party::Bob, *b))
                        .collect::<mpz_arith_core::Result<Vec<_>>>()?,
                )?
            } else {
                Boundaries::<Int>::known(buckets.to_vec())?
            };

            let counts = histogram(arith, &xs, &boundaries)?;
            reveal_all(arith, &counts)
        })
        .unwrap();

        assert_eq!(output, vec![2, 5, 2, 1]);
        assert_eq!(output.iter().sum::<i64>(), data.len() as i64);
    }

    #[test]
    fn test_histogram_fixed() {
        let data = [0.1, 0.5, 0.7, 0.3, 0.9, 0.5, 3.4, 0.5, -0.1, -0.3];

        let output = evaluate(|arith| {
            let xs = data
                .iter()
                .map(|x| arith.input_from::<Fixed>(Party::Alice, *x))
                .collect::<mpz_arith_core::Result<Vec<_>>>()?;
            let boundaries = Boundaries::<Fixed>::known(vec![0.0, 0.5, 1.0])?;

            let counts = histogram(arith, &xs, &boundaries)?;
            reveal_all(arith, &counts)
        })
        .unwrap();

        assert_eq!(output, vec![2, 5, 2, 1]);
    }

    #[test]
    fn test_one_hot() {
        let buckets = [-2, 0, 4];

        for x in -4..7 {
            let output = evaluate(|arith| {
                let x = arith.input_from::<Int>(Party::Bob, x)?;
                let boundaries = known_all::<_, Int>(arith, &buckets)?;
                let indicators = one_hot(arith, x, &boundaries)?;
                reveal_all(arith, &indicators)
            })
            .unwrap();

            let mut expected = vec![0; buckets.len() + 1];
            expected[clear_bucket(x, &buckets)] = 1;
            assert_eq!(output, expected, "x = {x}");
        }
    }

    #[test]
    fn test_histogram_matches_clear() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let data: Vec<i64> = (0..40).map(|_| rng.gen_range(-20..20)).collect();
        let buckets = [-10, -3, 0, 5, 12];

        let output = evaluate(|arith| {
            let xs = data
                .iter()
                .map(|x| arith.input_from::<Int>(Party::Alice, *x))
                .collect::<mpz_arith_core::Result<Vec<_>>>()?;
            let counts = histogram(arith, &xs, &Boundaries::<Int>::known(buckets.to_vec())?)?;
            reveal_all(arith, &counts)
        })
        .unwrap();

        let mut expected = vec![0i64; buckets.len() + 1];
        for x in &data {
            expected[clear_bucket(*x, &buckets)] += 1;
        }

        assert_eq!(output, expected);
    }

    #[test]
    fn test_histogram_2d() {
        let x = [1, 3, 5, 6, 7, 8];
        let y = [2, 4, 5, 8, 9, 10];
        let buckets = [1, 4, 9];

        let output = evaluate(|arith| {
            let points = x
                .iter()
                .zip(&y)
                .map(|(x, y)| {
                    Ok(vec![
                        arith.input_from::<Int>(Party::Alice, *x)?,
                        arith.input_from::<Int>(Party::Alice, *y)?,
                    ])
                })
                .collect::<Result<Vec<_>>>()?;
            let boundaries = [
                Boundaries::<Int>::known(buckets.to_vec())?,
                Boundaries::<Int>::known(buckets.to_vec())?,
            ];

            let counts = histogram_nd(arith, &points, &boundaries)?;
            assert_eq!(counts.widths(), &[4, 4]);

            reveal_all(arith, &counts.into_entries())
        })
        .unwrap();

        let counts = MultiDimensionalArray::build(vec![4, 4], |index| output[index[0] * 4 + index[1]])
            .unwrap();

        assert_eq!(*counts.get(&[0, 0]).unwrap(), 0);
        assert_eq!(*counts.get(&[1, 1]).unwrap(), 1);
        assert_eq!(*counts.get(&[2, 2]).unwrap(), 3);
        assert_eq!(counts.iter().sum::<i64>(), x.len() as i64);

        for (x, y) in x.iter().zip(&y) {
            let index = [clear_bucket(*x, &buckets), clear_bucket(*y, &buckets)];
            assert!(*counts.get(&index).unwrap() >= 1);
        }
    }

    #[test]
    fn test_histogram_preconditions() {
        let (mut alice, _) = mpz_arith_core::ideal::ideal_arith(0);
        let x = alice.known::<Int>(1).unwrap();

        assert!(matches!(
            Boundaries::<Int>::known(vec![]),
            Err(StatsError::Empty(_))
        ));
        assert!(matches!(
            Boundaries::<Int>::known(vec![1, 3, 3]),
            Err(StatsError::Boundaries(_))
        ));
        assert!(matches!(
            Boundaries::<Fixed>::known(vec![1.0, f64::NAN]),
            Err(StatsError::Boundaries(_))
        ));

        let boundaries = Boundaries::<Int>::known(vec![0, 1]).unwrap();
        assert!(matches!(
            histogram(&mut alice, &[], &boundaries),
            Err(StatsError::Empty(_))
        ));
        assert!(matches!(
            histogram_nd(&mut alice, &[vec![x]], &[boundaries.clone(), boundaries]),
            Err(StatsError::Length { .. })
        ));
    }
}
