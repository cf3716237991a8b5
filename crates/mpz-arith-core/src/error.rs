use crate::{KindTag, Party, Ptr};

/// Arithmetic provider error.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ArithError(ErrorRepr);

#[derive(Debug, thiserror::Error)]
enum ErrorRepr {
    #[error("operand {ptr} is not allocated, graph has {len} values")]
    Operand { ptr: Ptr, len: usize },
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: usize, actual: usize },
    #[error("kind mismatch: expected {expected:?}, got {actual:?}")]
    Kind { expected: KindTag, actual: KindTag },
    #[error("input error: {0}")]
    Input(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("parties out of sync: {0}")]
    Sync(Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("execution error: {0}")]
    Execute(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ArithError {
    /// Creates a new error for an operand which does not exist.
    pub fn operand(ptr: Ptr, len: usize) -> Self {
        Self(ErrorRepr::Operand { ptr, len })
    }

    /// Creates a new error for operands of mismatched length.
    pub fn shape(expected: usize, actual: usize) -> Self {
        Self(ErrorRepr::Shape { expected, actual })
    }

    /// Creates a new kind mismatch error.
    pub fn kind(expected: KindTag, actual: KindTag) -> Self {
        Self(ErrorRepr::Kind { expected, actual })
    }

    /// Creates a new input error.
    pub fn input<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(ErrorRepr::Input(err.into()))
    }

    /// Creates a new error for input provided by a party which does not own it.
    pub fn not_owner(owner: Party, party: Party) -> Self {
        Self::input(format!("{party} provided a value for an input owned by {owner}"))
    }

    /// Creates a new synchronization error.
    pub fn sync<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(ErrorRepr::Sync(err.into()))
    }

    /// Creates a new execution error.
    pub fn execute<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(ErrorRepr::Execute(err.into()))
    }

    /// Returns `true` if the error was caused by the parties recording
    /// different computations.
    pub fn is_sync(&self) -> bool {
        matches!(self.0, ErrorRepr::Sync(_))
    }

    /// Returns `true` if the error is an input error.
    pub fn is_input(&self) -> bool {
        matches!(self.0, ErrorRepr::Input(_))
    }
}

impl From<crate::Canceled> for ArithError {
    fn from(value: crate::Canceled) -> Self {
        Self(ErrorRepr::Execute(value.into()))
    }
}
