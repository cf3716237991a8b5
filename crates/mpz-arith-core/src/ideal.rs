//! Ideal two-party arithmetic functionality.
//!
//! The functionality plays the role of a trusted dealer: every value is kept as
//! a pair of additive shares in `Z_{2^64}`, one per party. Linear operations
//! are evaluated share-wise, interactive operations reconstruct, compute and
//! reshare.

use std::{
    mem,
    sync::{Arc, Mutex, MutexGuard},
};

use derive_builder::Builder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

use crate::{
    new_reveal, reveal::RevealOp, ArithError, Arithmetic, Execute, KindTag, Op, Party, Plain,
    Ptr, Result, RevealOutput,
};

const DEFAULT_PRECISION: usize = 24;
const MAX_PRECISION: usize = 48;

/// Ideal arithmetic configuration.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct IdealArithConfig {
    /// Number of fractional bits of fixed-point values.
    #[builder(default = "DEFAULT_PRECISION")]
    precision: usize,
}

impl IdealArithConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.precision {
            Some(precision) if precision == 0 || precision > MAX_PRECISION => Err(format!(
                "precision must be in 1..={MAX_PRECISION}, got {precision}"
            )),
            _ => Ok(()),
        }
    }
}

impl Default for IdealArithConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl IdealArithConfig {
    /// Creates a new builder for IdealArithConfig.
    pub fn builder() -> IdealArithConfigBuilder {
        IdealArithConfigBuilder::default()
    }

    /// Returns the number of fractional bits of fixed-point values.
    pub fn precision(&self) -> usize {
        self.precision
    }
}

/// Statistics of executed computations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of evaluated operations.
    pub ops: usize,
    /// Number of communication rounds, including the opening of reveals.
    pub rounds: usize,
}

/// Creates a pair of ideal arithmetic providers, one for each party, with the
/// default configuration.
pub fn ideal_arith(seed: u64) -> (IdealArith, IdealArith) {
    ideal_arith_with_config(seed, IdealArithConfig::default())
}

/// Creates a pair of ideal arithmetic providers, one for each party.
pub fn ideal_arith_with_config(seed: u64, config: IdealArithConfig) -> (IdealArith, IdealArith) {
    let inner = Arc::new(Mutex::new(Inner {
        config,
        rng: ChaCha12Rng::seed_from_u64(seed),
        shares: Default::default(),
        kinds: Vec::new(),
        programs: Default::default(),
        stats: ExecutionStats::default(),
    }));

    (
        IdealArith {
            party: Party::Alice,
            inner: inner.clone(),
        },
        IdealArith {
            party: Party::Bob,
            inner,
        },
    )
}

/// Ideal arithmetic provider for one party.
#[derive(Debug, Clone)]
pub struct IdealArith {
    party: Party,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    config: IdealArithConfig,
    rng: ChaCha12Rng,
    /// Committed shares, indexed by party.
    shares: [Vec<u64>; 2],
    /// Kinds of committed values.
    kinds: Vec<KindTag>,
    /// Pending programs, indexed by party.
    programs: [Program; 2],
    stats: ExecutionStats,
}

#[derive(Debug, Default)]
struct Program {
    ops: Vec<Op>,
    kinds: Vec<KindTag>,
    reveals: Vec<(RevealOp<Plain>, KindTag)>,
}

impl Program {
    fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.reveals.is_empty()
    }

    fn same_shape(&self, other: &Program) -> bool {
        self.ops.len() == other.ops.len()
            && self.reveals.len() == other.reveals.len()
            && self
                .ops
                .iter()
                .zip(&other.ops)
                .all(|(a, b)| a.same_shape(b))
            && self
                .reveals
                .iter()
                .zip(&other.reveals)
                .all(|((a, a_kind), (b, b_kind))| a.ptr() == b.ptr() && a_kind == b_kind)
    }
}

impl IdealArith {
    /// Returns the party of this provider.
    pub fn party(&self) -> Party {
        self.party
    }

    /// Returns the statistics accumulated over all executions.
    pub fn stats(&self) -> Result<ExecutionStats> {
        Ok(self.lock()?.stats)
    }

    /// Returns the number of fractional bits of fixed-point values.
    pub fn precision(&self) -> Result<usize> {
        Ok(self.lock()?.config.precision)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| ArithError::execute("ideal functionality poisoned"))
    }
}

impl Inner {
    /// Returns the kind of the value at `ptr` as seen by `party`.
    fn kind_of(&self, party: Party, ptr: Ptr) -> Result<KindTag> {
        let program = &self.programs[party.index()];
        let committed = self.kinds.len();
        let idx = ptr.as_usize();

        if idx < committed {
            Ok(self.kinds[idx])
        } else {
            program
                .kinds
                .get(idx - committed)
                .copied()
                .ok_or_else(|| ArithError::operand(ptr, committed + program.kinds.len()))
        }
    }

    fn expect_kind(&self, party: Party, ptr: Ptr, expected: KindTag) -> Result<()> {
        let actual = self.kind_of(party, ptr)?;
        if actual != expected {
            return Err(ArithError::kind(expected, actual));
        }

        Ok(())
    }

    fn same_kind(&self, party: Party, a: Ptr, b: Ptr) -> Result<KindTag> {
        let kind = self.kind_of(party, a)?;
        self.expect_kind(party, b, kind)?;

        Ok(kind)
    }

    /// Checks an operation recorded by `party` and returns the kind of its
    /// result.
    fn check_op(&self, party: Party, op: &Op) -> Result<KindTag> {
        match *op {
            Op::Input { owner, kind, value } => match value {
                Some(_) if party != owner => Err(ArithError::not_owner(owner, party)),
                None if party == owner => Err(ArithError::input(format!(
                    "{owner} must provide a value for its own input"
                ))),
                Some(value) if value.kind() != kind => Err(ArithError::kind(kind, value.kind())),
                _ => Ok(kind),
            },
            Op::Constant(value) => Ok(value.kind()),
            Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) => self.same_kind(party, a, b),
            Op::Scale(a, Plain::Int(_)) => self.kind_of(party, a),
            Op::Scale(a, Plain::Fixed(_)) => {
                self.expect_kind(party, a, KindTag::Fixed)?;
                Ok(KindTag::Fixed)
            }
            Op::Div(a, b) => {
                self.expect_kind(party, a, KindTag::Fixed)?;
                self.expect_kind(party, b, KindTag::Fixed)?;
                Ok(KindTag::Fixed)
            }
            Op::Leq(a, b) => {
                self.same_kind(party, a, b)?;
                Ok(KindTag::Int)
            }
            Op::ToFixed(a) => {
                self.expect_kind(party, a, KindTag::Int)?;
                Ok(KindTag::Fixed)
            }
            Op::Exp(a) | Op::Sqrt(a) => {
                self.expect_kind(party, a, KindTag::Fixed)?;
                Ok(KindTag::Fixed)
            }
            Op::Uniform => Ok(KindTag::Fixed),
        }
    }

    fn encode(&self, value: Plain) -> u64 {
        match value {
            Plain::Int(value) => value as u64,
            Plain::Fixed(value) => self.encode_fixed(value),
        }
    }

    fn encode_fixed(&self, value: f64) -> u64 {
        (value * self.scale()).round() as i64 as u64
    }

    fn decode(&self, value: u64, kind: KindTag) -> Plain {
        match kind {
            KindTag::Int => Plain::Int(value as i64),
            KindTag::Fixed => Plain::Fixed(self.decode_fixed(value)),
        }
    }

    fn decode_fixed(&self, value: u64) -> f64 {
        value as i64 as f64 / self.scale()
    }

    fn scale(&self) -> f64 {
        (1u64 << self.config.precision) as f64
    }

    /// Multiplies two fixed-point encodings, truncating with rounding.
    fn mul_fixed(&self, a: u64, b: u64) -> u64 {
        let precision = self.config.precision;
        let product = a as i64 as i128 * b as i64 as i128;
        ((product + (1i128 << (precision - 1))) >> precision) as i64 as u64
    }

    /// Divides two fixed-point encodings, rounding half away from zero and
    /// yielding zero for a zero divisor.
    fn div_fixed(&self, a: u64, b: u64) -> u64 {
        let num = (a as i64 as i128) << self.config.precision;
        let den = b as i64 as i128;
        if den == 0 {
            return 0;
        }

        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        let quotient = if num >= 0 {
            (num + den / 2) / den
        } else {
            (num - den / 2) / den
        };

        quotient as i64 as u64
    }

    /// Splits a value into two fresh additive shares.
    fn share(&mut self, value: u64) -> [u64; 2] {
        let mask: u64 = self.rng.gen();
        [mask, value.wrapping_sub(mask)]
    }

    fn value(&self, slot: &[[u64; 2]], idx: usize) -> [u64; 2] {
        let committed = self.kinds.len();
        if idx < committed {
            [self.shares[0][idx], self.shares[1][idx]]
        } else {
            slot[idx - committed]
        }
    }

    fn open(share: [u64; 2]) -> u64 {
        share[0].wrapping_add(share[1])
    }

    /// Evaluates a single operation with result kind `kind`, returning the
    /// shares of its result.
    fn eval(
        &mut self,
        op: Op,
        kind: KindTag,
        inputs: [Option<Plain>; 2],
        slot: &[[u64; 2]],
    ) -> Result<[u64; 2]> {
        let x: Vec<[u64; 2]> = op
            .operands()
            .into_iter()
            .map(|ptr| self.value(slot, ptr.as_usize()))
            .collect();

        let value = match op {
            Op::Input { owner, .. } => {
                let value = inputs[owner.index()].ok_or_else(|| {
                    ArithError::input(format!("missing value for input owned by {owner}"))
                })?;
                self.encode(value)
            }
            Op::Constant(value) => return Ok([self.encode(value), 0]),
            Op::Add(..) => {
                return Ok([x[0][0].wrapping_add(x[1][0]), x[0][1].wrapping_add(x[1][1])])
            }
            Op::Sub(..) => {
                return Ok([x[0][0].wrapping_sub(x[1][0]), x[0][1].wrapping_sub(x[1][1])])
            }
            Op::Scale(_, Plain::Int(c)) => return Ok(x[0].map(|s| s.wrapping_mul(c as u64))),
            Op::ToFixed(_) => {
                let precision = self.config.precision as u32;
                return Ok(x[0].map(|s| s.wrapping_shl(precision)));
            }
            Op::Scale(_, Plain::Fixed(c)) => {
                self.mul_fixed(Self::open(x[0]), self.encode_fixed(c))
            }
            Op::Mul(..) => {
                let (a, b) = (Self::open(x[0]), Self::open(x[1]));
                match kind {
                    KindTag::Int => a.wrapping_mul(b),
                    KindTag::Fixed => self.mul_fixed(a, b),
                }
            }
            Op::Div(..) => self.div_fixed(Self::open(x[0]), Self::open(x[1])),
            Op::Leq(..) => u64::from(Self::open(x[0]) as i64 <= Self::open(x[1]) as i64),
            Op::Exp(_) => self.encode_fixed(self.decode_fixed(Self::open(x[0])).exp()),
            Op::Sqrt(_) => self.encode_fixed(self.decode_fixed(Self::open(x[0])).max(0.0).sqrt()),
            Op::Uniform => {
                let draw: f64 = self.rng.gen();
                (draw * self.scale()).floor() as u64
            }
        };

        Ok(self.share(value))
    }

    /// Evaluates the pending programs.
    fn execute(&mut self) -> Result<()> {
        let [alice, bob] = mem::take(&mut self.programs);

        if !alice.same_shape(&bob) {
            return Err(ArithError::sync(format!(
                "parties recorded different computations: {} ops and {} reveals vs {} ops and {} reveals",
                alice.ops.len(),
                alice.reveals.len(),
                bob.ops.len(),
                bob.reveals.len()
            )));
        }

        let committed = self.kinds.len();
        let n = alice.ops.len();

        // Interaction depth of each pending op, committed values are available
        // at depth 0.
        let mut depth = vec![0usize; n];
        for (idx, op) in alice.ops.iter().enumerate() {
            let operand_depth = op
                .operands()
                .into_iter()
                .map(|ptr| ptr.as_usize())
                .filter(|&ptr| ptr >= committed)
                .map(|ptr| depth[ptr - committed])
                .max()
                .unwrap_or(0);
            depth[idx] = operand_depth + usize::from(!op.is_local());
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&idx| (depth[idx], idx));

        let mut slot = vec![[0u64; 2]; n];
        let mut layer = None;
        for idx in order {
            if layer != Some(depth[idx]) {
                layer = Some(depth[idx]);
                tracing::trace!(layer = depth[idx], "evaluating layer");
            }

            let inputs = [input_value(&alice.ops[idx]), input_value(&bob.ops[idx])];
            let shares = self.eval(alice.ops[idx], alice.kinds[idx], inputs, &slot)?;
            slot[idx] = shares;
        }

        let [shares_alice, shares_bob] = &mut self.shares;
        shares_alice.extend(slot.iter().map(|share| share[0]));
        shares_bob.extend(slot.iter().map(|share| share[1]));
        self.kinds.extend(alice.kinds);

        let rounds =
            depth.iter().copied().max().unwrap_or(0) + usize::from(!alice.reveals.is_empty());
        self.stats.ops += n;
        self.stats.rounds += rounds;

        tracing::debug!(ops = n, rounds, reveals = alice.reveals.len(), "executed");

        for (mut reveal, kind) in alice.reveals.into_iter().chain(bob.reveals) {
            let idx = reveal.ptr().as_usize();
            let value = self.decode(Self::open([self.shares[0][idx], self.shares[1][idx]]), kind);
            reveal.send(value)?;
        }

        Ok(())
    }
}

fn input_value(op: &Op) -> Option<Plain> {
    match op {
        Op::Input { value, .. } => *value,
        _ => None,
    }
}

impl Arithmetic for IdealArith {
    fn party(&self) -> Party {
        self.party
    }

    fn op_raw(&mut self, op: Op) -> Result<Ptr> {
        let mut this = self.lock()?;
        let kind = this.check_op(self.party, &op)?;

        let committed = this.kinds.len();
        let program = &mut this.programs[self.party.index()];
        let ptr = Ptr::new(committed + program.ops.len());

        tracing::trace!(party = %self.party, %ptr, ?op, "recorded op");

        program.ops.push(op);
        program.kinds.push(kind);

        Ok(ptr)
    }

    fn reveal_raw(&mut self, ptr: Ptr, kind: KindTag) -> Result<RevealOutput<Plain>> {
        let mut this = self.lock()?;
        this.expect_kind(self.party, ptr, kind)?;

        let (op, output) = new_reveal(ptr);
        this.programs[self.party.index()].reveals.push((op, kind));

        Ok(output)
    }
}

impl Execute for IdealArith {
    fn wants_execute(&self) -> bool {
        match self.lock() {
            Ok(this) => this.programs.iter().any(|program| !program.is_empty()),
            Err(err) => {
                tracing::error!(%err, "ideal provider state is poisoned");
                false
            }
        }
    }

    fn execute(&mut self) -> Result<()> {
        let mut this = self.lock()?;
        if this.programs.iter().all(Program::is_empty) {
            return Ok(());
        }

        this.execute()
    }
}
