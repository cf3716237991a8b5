//! Design matrices.

use mpz_arith_core::{Arithmetic, ArithmeticExt, Fixed, Party, SFixed};

use crate::{Result, StatsError};

/// A matrix of secret observations, one row per observation.
///
/// Every row has the same length and there is at least one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignMatrix {
    rows: Vec<Vec<SFixed>>,
    width: usize,
}

impl DesignMatrix {
    /// Creates a new design matrix from its rows.
    pub fn new(rows: Vec<Vec<SFixed>>) -> Result<Self> {
        StatsError::check_non_empty(&rows, "design matrix")?;

        let width = rows[0].len();
        if width == 0 {
            return Err(StatsError::Empty("design matrix row"));
        }

        for row in &rows {
            StatsError::check_len(width, row.len())?;
        }

        Ok(Self { rows, width })
    }

    /// Inputs a design matrix owned by a single party.
    ///
    /// The owner passes its rows, the other party passes `None`. Both parties
    /// must agree on the `(height, width)` of the data. If `intercept` is set,
    /// a leading column of known ones is added.
    pub fn input<A>(
        arith: &mut A,
        owner: Party,
        rows: Option<&[Vec<f64>]>,
        (height, width): (usize, usize),
        intercept: bool,
    ) -> Result<Self>
    where
        A: Arithmetic + ?Sized,
    {
        if let Some(rows) = rows {
            StatsError::check_len(height, rows.len())?;
            for row in rows {
                StatsError::check_len(width, row.len())?;
            }
        }

        let rows = (0..height)
            .map(|i| {
                let mut row = Vec::with_capacity(width + usize::from(intercept));
                if intercept {
                    row.push(arith.known::<Fixed>(1.0)?);
                }
                for j in 0..width {
                    let value = rows.map(|rows| rows[i][j]);
                    row.push(arith.input::<Fixed>(owner, value)?);
                }
                Ok(row)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(rows)
    }

    /// Returns the number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Vec<SFixed>] {
        &self.rows
    }

    /// Returns the `i`-th row.
    pub fn row(&self, i: usize) -> Option<&[SFixed]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    /// Returns the `j`-th column.
    pub fn column(&self, j: usize) -> Option<Vec<SFixed>> {
        (j < self.width).then(|| self.rows.iter().map(|row| row[j]).collect())
    }
}
