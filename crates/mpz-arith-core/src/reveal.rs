//! Revealed outputs.
//!
//! Providers are synchronous recorders, so a reveal resolves exactly when the
//! provider executes. Outputs are received with [`Output::try_recv`].

use futures::channel::oneshot;

use crate::Ptr;

/// Creates a new reveal operation and the output which it resolves.
#[doc(hidden)]
pub fn new_reveal<T>(ptr: Ptr) -> (RevealOp<T>, RevealOutput<T>) {
    let (send, recv) = oneshot::channel();
    (
        RevealOp {
            ptr,
            chan: Some(send),
        },
        RevealOutput { chan: recv },
    )
}

/// A value which becomes available after the provider executed.
pub trait Output {
    /// Success type.
    type Ok;

    /// Receives the value, returning `None` if the provider has not executed
    /// yet.
    ///
    /// Once a value is returned the output is spent and further calls fail.
    fn try_recv(&mut self) -> Result<Option<Self::Ok>, Canceled>;

    /// Maps the received value with `f`.
    fn map<F, O>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnOnce(Self::Ok) -> O,
    {
        Map {
            inner: self,
            f: Some(f),
        }
    }
}

/// Reveal canceled error.
///
/// Returned when the provider dropped the reveal without resolving it, eg.
/// because execution failed, or when a spent output is received again.
#[derive(Debug, thiserror::Error)]
#[error("reveal canceled")]
pub struct Canceled {
    _private: (),
}

impl Canceled {
    fn new() -> Self {
        Self { _private: () }
    }
}

/// Reveal operation, held by the provider.
#[derive(Debug)]
pub struct RevealOp<T> {
    ptr: Ptr,
    chan: Option<oneshot::Sender<T>>,
}

impl<T> RevealOp<T> {
    /// Returns the pointer to the value being revealed.
    pub fn ptr(&self) -> Ptr {
        self.ptr
    }

    /// Sends the revealed value.
    pub fn send(&mut self, value: T) -> Result<(), Canceled> {
        let chan = self.chan.take().ok_or_else(Canceled::new)?;
        // The receiver may have been dropped, which is not an error.
        _ = chan.send(value);

        Ok(())
    }
}

/// A revealed value, available once the provider executed.
#[derive(Debug)]
#[must_use = "reveals are only useful if received"]
pub struct RevealOutput<T> {
    chan: oneshot::Receiver<T>,
}

impl<T> Output for RevealOutput<T> {
    type Ok = T;

    fn try_recv(&mut self) -> Result<Option<T>, Canceled> {
        self.chan.try_recv().map_err(|_| Canceled::new())
    }
}

/// Maps an output value to a different type.
///
/// Returned by [`Output::map`].
#[derive(Debug)]
#[must_use = "reveals are only useful if received"]
pub struct Map<I, F> {
    inner: I,
    f: Option<F>,
}

impl<I, F, O> Output for Map<I, F>
where
    I: Output,
    F: FnOnce(I::Ok) -> O,
{
    type Ok = O;

    fn try_recv(&mut self) -> Result<Option<O>, Canceled> {
        if self.f.is_none() {
            return Err(Canceled::new());
        }

        match self.inner.try_recv()? {
            Some(value) => {
                let f = self.f.take().ok_or_else(Canceled::new)?;
                Ok(Some(f(value)))
            }
            None => Ok(None),
        }
    }
}

/// Joins a collection of outputs into a single output.
pub fn join_all<O>(outputs: impl IntoIterator<Item = O>) -> JoinAll<O>
where
    O: Output,
{
    let pending: Vec<O> = outputs.into_iter().collect();
    let done = pending.iter().map(|_| None).collect();
    JoinAll {
        pending,
        done,
        taken: false,
    }
}

/// Output of a collection of outputs, in order.
///
/// Returned by [`join_all`].
#[must_use = "reveals are only useful if received"]
pub struct JoinAll<O: Output> {
    pending: Vec<O>,
    done: Vec<Option<O::Ok>>,
    taken: bool,
}

impl<O> Output for JoinAll<O>
where
    O: Output,
{
    type Ok = Vec<O::Ok>;

    fn try_recv(&mut self) -> Result<Option<Self::Ok>, Canceled> {
        if self.taken {
            return Err(Canceled::new());
        }

        for (output, done) in self.pending.iter_mut().zip(self.done.iter_mut()) {
            if done.is_none() {
                *done = output.try_recv()?;
            }
        }

        if !self.done.iter().all(Option::is_some) {
            return Ok(None);
        }
        self.taken = true;

        Ok(Some(
            std::mem::take(&mut self.done).into_iter().flatten().collect(),
        ))
    }
}
