//! Core types and traits for oblivious arithmetic over secret-shared values.
//!
//! A provider records operations into a dependency graph, handing out
//! [`Secret`] handles to values which are materialized only when the provider
//! [executes](Execute::execute). Plaintext leaves the provider exclusively
//! through [`reveal`](ArithmeticExt::reveal).

#![deny(missing_docs, unreachable_pub, unused_must_use)]
#![deny(clippy::all)]
#![deny(unsafe_code)]

mod error;
#[cfg(any(test, feature = "ideal"))]
pub mod ideal;
pub mod reveal;
mod value;

pub use error::ArithError;
pub use reveal::{join_all, new_reveal, Canceled, JoinAll, Map, Output, RevealOutput};
pub use value::{Fixed, Int, Kind, KindTag, Party, Plain, Ptr, SFixed, SInt, Secret};

use serde::{Deserialize, Serialize};

/// Arithmetic result type.
pub type Result<T, E = ArithError> = core::result::Result<T, E>;

/// A revealed clear value of kind `K`.
pub type Revealed<K> = Map<RevealOutput<Plain>, fn(Plain) -> <K as Kind>::Clear>;

/// An operation in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// A private input owned by `owner`.
    ///
    /// Only the owner provides the value, the other party passes `None`.
    Input {
        /// Owner of the input.
        owner: Party,
        /// Kind of the input.
        kind: KindTag,
        /// Value, present only for the owner.
        value: Option<Plain>,
    },
    /// A public constant.
    Constant(Plain),
    /// `a + b`.
    Add(Ptr, Ptr),
    /// `a - b`.
    Sub(Ptr, Ptr),
    /// `a * c` for a public constant `c`.
    Scale(Ptr, Plain),
    /// `a * b`.
    Mul(Ptr, Ptr),
    /// `a / b`, fixed-point only.
    Div(Ptr, Ptr),
    /// `[a <= b]`, an integer which is `1` or `0`.
    Leq(Ptr, Ptr),
    /// Converts an integer to fixed-point.
    ToFixed(Ptr),
    /// `e^a`.
    Exp(Ptr),
    /// `sqrt(a)`.
    Sqrt(Ptr),
    /// A uniform fixed-point draw in `[0, 1)` which neither party learns.
    Uniform,
}

impl Op {
    /// Returns the operands of the operation.
    pub fn operands(&self) -> Vec<Ptr> {
        match *self {
            Op::Input { .. } | Op::Constant(_) | Op::Uniform => Vec::new(),
            Op::Scale(a, _) | Op::ToFixed(a) | Op::Exp(a) | Op::Sqrt(a) => vec![a],
            Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) | Op::Div(a, b) | Op::Leq(a, b) => {
                vec![a, b]
            }
        }
    }

    /// Returns `true` if the operation can be evaluated without interaction.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Op::Input { .. }
                | Op::Constant(_)
                | Op::Add(..)
                | Op::Sub(..)
                | Op::Scale(_, Plain::Int(_))
                | Op::ToFixed(_)
        )
    }

    /// Returns `true` if both operations describe the same computation,
    /// ignoring private input values.
    pub fn same_shape(&self, other: &Op) -> bool {
        match (self, other) {
            (
                Op::Input {
                    owner: owner_a,
                    kind: kind_a,
                    ..
                },
                Op::Input {
                    owner: owner_b,
                    kind: kind_b,
                    ..
                },
            ) => owner_a == owner_b && kind_a == kind_b,
            _ => self == other,
        }
    }
}

/// An oblivious arithmetic provider.
///
/// This trait is object safe, see [`ArithmeticExt`] for the typed interface.
pub trait Arithmetic {
    /// Returns the party this provider computes for.
    fn party(&self) -> Party;

    /// Records an operation, returning a pointer to its result.
    fn op_raw(&mut self, op: Op) -> Result<Ptr>;

    /// Records a reveal of a value of the given kind to both parties.
    fn reveal_raw(&mut self, ptr: Ptr, kind: KindTag) -> Result<RevealOutput<Plain>>;
}

/// Extension trait for [`Arithmetic`].
pub trait ArithmeticExt: Arithmetic {
    /// Records a private input owned by `owner`.
    ///
    /// The owner must provide `Some` value, the other party `None`.
    fn input<K: Kind>(&mut self, owner: Party, value: Option<K::Clear>) -> Result<Secret<K>> {
        self.op_raw(Op::Input {
            owner,
            kind: K::TAG,
            value: value.map(K::into_plain),
        })
        .map(Secret::from_raw)
    }

    /// Records a private input owned by `owner`, providing `value` only if this
    /// party is the owner.
    fn input_from<K: Kind>(&mut self, owner: Party, value: K::Clear) -> Result<Secret<K>> {
        let value = (self.party() == owner).then_some(value);
        self.input(owner, value)
    }

    /// Records a public constant.
    fn known<K: Kind>(&mut self, value: K::Clear) -> Result<Secret<K>> {
        self.op_raw(Op::Constant(K::into_plain(value)))
            .map(Secret::from_raw)
    }

    /// Computes `a + b`.
    fn add<K: Kind>(&mut self, a: Secret<K>, b: Secret<K>) -> Result<Secret<K>> {
        self.op_raw(Op::Add(a.to_raw(), b.to_raw()))
            .map(Secret::from_raw)
    }

    /// Computes `a - b`.
    fn sub<K: Kind>(&mut self, a: Secret<K>, b: Secret<K>) -> Result<Secret<K>> {
        self.op_raw(Op::Sub(a.to_raw(), b.to_raw()))
            .map(Secret::from_raw)
    }

    /// Computes `-a`.
    fn neg<K: Kind>(&mut self, a: Secret<K>) -> Result<Secret<K>> {
        self.scale_int(a, -1)
    }

    /// Computes `a * b`.
    fn mul<K: Kind>(&mut self, a: Secret<K>, b: Secret<K>) -> Result<Secret<K>> {
        self.op_raw(Op::Mul(a.to_raw(), b.to_raw()))
            .map(Secret::from_raw)
    }

    /// Computes `a * c` for a public constant `c`.
    fn scale<K: Kind>(&mut self, a: Secret<K>, c: K::Clear) -> Result<Secret<K>> {
        self.op_raw(Op::Scale(a.to_raw(), K::into_plain(c)))
            .map(Secret::from_raw)
    }

    /// Computes `a * c` for a public integer `c`, which is always local.
    fn scale_int<K: Kind>(&mut self, a: Secret<K>, c: i64) -> Result<Secret<K>> {
        self.op_raw(Op::Scale(a.to_raw(), Plain::Int(c)))
            .map(Secret::from_raw)
    }

    /// Computes `a / b`.
    fn div(&mut self, a: SFixed, b: SFixed) -> Result<SFixed> {
        self.op_raw(Op::Div(a.to_raw(), b.to_raw()))
            .map(Secret::from_raw)
    }

    /// Computes `[a <= b]`.
    fn leq<K: Kind>(&mut self, a: Secret<K>, b: Secret<K>) -> Result<SInt> {
        self.op_raw(Op::Leq(a.to_raw(), b.to_raw()))
            .map(Secret::from_raw)
    }

    /// Converts an integer to fixed-point.
    fn to_fixed(&mut self, a: SInt) -> Result<SFixed> {
        self.op_raw(Op::ToFixed(a.to_raw())).map(Secret::from_raw)
    }

    /// Computes `e^a`.
    fn exp(&mut self, a: SFixed) -> Result<SFixed> {
        self.op_raw(Op::Exp(a.to_raw())).map(Secret::from_raw)
    }

    /// Computes `sqrt(a)`.
    fn sqrt(&mut self, a: SFixed) -> Result<SFixed> {
        self.op_raw(Op::Sqrt(a.to_raw())).map(Secret::from_raw)
    }

    /// Draws a uniform value in `[0, 1)` which neither party learns.
    fn uniform(&mut self) -> Result<SFixed> {
        self.op_raw(Op::Uniform).map(Secret::from_raw)
    }

    /// Computes the sum of `values`, which is zero if `values` is empty.
    fn sum<K: Kind>(&mut self, values: &[Secret<K>]) -> Result<Secret<K>> {
        let Some((first, rest)) = values.split_first() else {
            return self.known(K::ZERO);
        };

        rest.iter()
            .try_fold(*first, |acc, value| self.add(acc, *value))
    }

    /// Computes the inner product of `a` and `b`.
    fn inner_product<K: Kind>(&mut self, a: &[Secret<K>], b: &[Secret<K>]) -> Result<Secret<K>> {
        if a.len() != b.len() {
            return Err(ArithError::shape(a.len(), b.len()));
        }

        let products = a
            .iter()
            .zip(b)
            .map(|(a, b)| self.mul(*a, *b))
            .collect::<Result<Vec<_>>>()?;

        self.sum(&products)
    }

    /// Reveals a value to both parties.
    ///
    /// The returned output resolves once the provider executed.
    fn reveal<K: Kind>(&mut self, value: Secret<K>) -> Result<Revealed<K>> {
        let from_plain: fn(Plain) -> K::Clear = K::from_plain;
        self.reveal_raw(value.to_raw(), K::TAG)
            .map(|output| output.map(from_plain))
    }

    /// Composes two stages sequentially, the second stage receiving the output
    /// of the first.
    fn then<A, B, E, F, G>(&mut self, first: F, second: G) -> Result<B, E>
    where
        F: FnOnce(&mut Self) -> Result<A, E>,
        G: FnOnce(&mut Self, A) -> Result<B, E>,
    {
        let a = tracing::trace_span!("then", stage = 0).in_scope(|| first(self))?;
        tracing::trace_span!("then", stage = 1).in_scope(|| second(self, a))
    }

    /// Composes two independent stages.
    ///
    /// Neither stage can observe the output of the other, so the provider is
    /// free to evaluate them in the same rounds.
    fn both<A, B, E, F, G>(&mut self, a: F, b: G) -> Result<(A, B), E>
    where
        F: FnOnce(&mut Self) -> Result<A, E>,
        G: FnOnce(&mut Self) -> Result<B, E>,
    {
        let a = tracing::trace_span!("both", branch = 0).in_scope(|| a(self))?;
        let b = tracing::trace_span!("both", branch = 1).in_scope(|| b(self))?;

        Ok((a, b))
    }
}

impl<T> ArithmeticExt for T where T: ?Sized + Arithmetic {}

/// Execution of a recorded computation.
pub trait Execute {
    /// Returns `true` if the provider has pending operations or reveals.
    fn wants_execute(&self) -> bool;

    /// Executes all pending operations and resolves pending reveals.
    fn execute(&mut self) -> Result<()>;
}

/// An oblivious arithmetic provider which can execute.
pub trait Provider: Arithmetic + Execute {}

impl<T> Provider for T where T: ?Sized + Arithmetic + Execute {}
