//! Survival analysis.

mod cox;

pub use cox::{cox_gradient, cox_regression, cox_regression_sorted};

use mpz_arith_core::{Arithmetic, ArithmeticExt, Int, SFixed};

use crate::{Result, StatsError};

/// A covariate of a survival record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Covariate {
    /// A continuous covariate.
    Continuous(SFixed),
    /// A categorical covariate with levels `0..n`, given as a one-hot vector
    /// of length `n`.
    ///
    /// The covariate enters the model as its level, so a single coefficient
    /// covers all levels.
    Categorical(Vec<SFixed>),
}

/// Shape of a covariate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovariateKind {
    /// A continuous covariate.
    Continuous,
    /// A categorical covariate with the given number of levels.
    Categorical(usize),
}

impl Covariate {
    /// Returns the shape of the covariate.
    pub fn kind(&self) -> CovariateKind {
        match self {
            Covariate::Continuous(_) => CovariateKind::Continuous,
            Covariate::Categorical(indicators) => CovariateKind::Categorical(indicators.len()),
        }
    }

    fn values(&self) -> Vec<SFixed> {
        match self {
            Covariate::Continuous(x) => vec![*x],
            Covariate::Categorical(indicators) => indicators.clone(),
        }
    }

    fn with_values(&self, values: &[SFixed]) -> Self {
        match self {
            Covariate::Continuous(_) => Covariate::Continuous(values[0]),
            Covariate::Categorical(_) => Covariate::Categorical(values.to_vec()),
        }
    }
}

/// A survival record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurvivalRecord {
    /// Time of the event or of censoring.
    pub time: SFixed,
    /// `1` if the event was observed, `0` if the record is censored.
    pub status: SFixed,
    /// Covariates.
    pub covariates: Vec<Covariate>,
}

impl SurvivalRecord {
    /// Creates a new survival record.
    pub fn new(time: SFixed, status: SFixed, covariates: Vec<Covariate>) -> Self {
        Self {
            time,
            status,
            covariates,
        }
    }

    /// Returns the covariate layout of the record.
    pub fn layout(&self) -> Vec<CovariateKind> {
        self.covariates.iter().map(Covariate::kind).collect()
    }

    fn fields(&self) -> Vec<SFixed> {
        let mut fields = vec![self.time, self.status];
        fields.extend(self.covariates.iter().flat_map(Covariate::values));
        fields
    }

    fn with_fields(&self, fields: &[SFixed]) -> Self {
        let mut offset = 2;
        let covariates = self
            .covariates
            .iter()
            .map(|covariate| {
                let width = covariate.values().len();
                let covariate = covariate.with_values(&fields[offset..offset + width]);
                offset += width;
                covariate
            })
            .collect();

        Self {
            time: fields[0],
            status: fields[1],
            covariates,
        }
    }
}

/// Survival records ordered by descending time.
#[derive(Debug, Clone)]
pub struct SortedSurvival {
    records: Vec<SurvivalRecord>,
    layout: Vec<CovariateKind>,
}

impl SortedSurvival {
    /// Obliviously sorts records by descending time.
    #[tracing::instrument(level = "debug", skip_all, fields(n = records.len()))]
    pub fn sort<A>(arith: &mut A, records: Vec<SurvivalRecord>) -> Result<Self>
    where
        A: Arithmetic + ?Sized,
    {
        let layout = validate(&records)?;

        let mut fields = records.iter().map(SurvivalRecord::fields).collect::<Vec<_>>();
        let n = fields.len();

        // Batcher's odd-even merge sort.
        let mut p = 1;
        while p < n {
            let mut k = p;
            while k >= 1 {
                for j in (k % p..n - k).step_by(2 * k) {
                    for i in 0..k.min(n - j - k) {
                        if (i + j) / (2 * p) == (i + j + k) / (2 * p) {
                            compare_swap(arith, &mut fields, i + j, i + j + k)?;
                        }
                    }
                }
                k /= 2;
            }
            p *= 2;
        }

        let records = records
            .iter()
            .zip(&fields)
            .map(|(record, fields)| record.with_fields(fields))
            .collect();

        Ok(Self { records, layout })
    }

    /// Wraps records which the caller asserts are ordered by descending time.
    ///
    /// Results computed from unordered records are meaningless.
    pub fn assume_sorted(records: Vec<SurvivalRecord>) -> Result<Self> {
        let layout = validate(&records)?;

        Ok(Self { records, layout })
    }

    /// Returns the records.
    pub fn records(&self) -> &[SurvivalRecord] {
        &self.records
    }

    /// Returns the covariate layout shared by all records.
    pub fn layout(&self) -> &[CovariateKind] {
        &self.layout
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records, which is never the case.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Checks that there is at least one record and all records share a layout.
fn validate(records: &[SurvivalRecord]) -> Result<Vec<CovariateKind>> {
    StatsError::check_non_empty(records, "survival records")?;

    let layout = records[0].layout();
    if let Some(kind) = layout.iter().find(|kind| **kind == CovariateKind::Categorical(0)) {
        return Err(StatsError::Layout(format!(
            "categorical covariates need at least one level, got {kind:?}"
        )));
    }

    if let Some((i, record)) = records
        .iter()
        .enumerate()
        .find(|(_, record)| record.layout() != layout)
    {
        return Err(StatsError::Layout(format!(
            "record {i} has layout {:?}, expected {layout:?}",
            record.layout()
        )));
    }

    Ok(layout)
}

/// Orders records `i < j` so that `i` has the later time.
fn compare_swap<A>(arith: &mut A, fields: &mut [Vec<SFixed>], i: usize, j: usize) -> Result<()>
where
    A: Arithmetic + ?Sized,
{
    let one = arith.known::<Int>(1)?;
    let ordered = arith.leq(fields[j][0], fields[i][0])?;
    let swap = arith.sub(one, ordered)?;
    let swap = arith.to_fixed(swap)?;

    let (head, tail) = fields.split_at_mut(j);
    for (a, b) in head[i].iter_mut().zip(tail[0].iter_mut()) {
        let diff = arith.sub(*b, *a)?;
        let delta = arith.mul(swap, diff)?;

        *a = arith.add(*a, delta)?;
        *b = arith.sub(*b, delta)?;
    }

    Ok(())
}
