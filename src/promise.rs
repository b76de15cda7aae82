use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use log::{debug, trace};

use crate::adapter::{adapt, Callback};
use crate::cell::{Registration, Resolution, ResolutionCell};
use crate::chain::{chain_with, Continue, FailurePolicy};
use crate::registry::Listener;
use crate::state::{Failure, State};
use crate::Error;

/// A value that becomes available later, or a failure.
///
/// A `Promise` is a cheap handle; clones share the same underlying cell.
/// It is resolved at most once, with [`set`](Promise::set) or
/// [`fail`](Promise::fail), by whichever thread computes the outcome.
/// Listeners registered before or after resolution see exactly one
/// notification each.
///
/// # Examples
///
/// ```
/// use promise_chain::{Error, Promise};
///
/// let p = Promise::<String>::new();
/// assert!(!p.is_available());
/// p.set("X".to_string()).unwrap();
/// assert!(p.is_available());
/// assert_eq!(p.get().unwrap(), "X");
/// assert!(matches!(p.set("Y".to_string()), Err(Error::AlreadyResolved)));
/// ```
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    name: Cow<'static, str>,
    cell: ResolutionCell<T>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.shared.cell.peek() {
            State::Unresolved => "unresolved",
            State::Resolved(_) => "resolved",
            State::Failed(_) => "failed",
        };
        f.debug_struct("Promise")
            .field("name", &self.name())
            .field("state", &state)
            .finish()
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Promise<T> {
    pub fn new() -> Self {
        Self::named("unnamed")
    }

    /// An unresolved promise with a diagnostic name. The name only shows up
    /// in logs and `Debug` output.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::from_state(name.into(), State::Unresolved)
    }

    /// A promise that is already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        Self::from_state("resolved".into(), State::Resolved(Arc::new(value)))
    }

    /// A promise that has already failed.
    pub fn failed(failure: Failure) -> Self {
        Self::from_state("failed".into(), State::Failed(failure))
    }

    fn from_state(name: Cow<'static, str>, state: State<Arc<T>>) -> Self {
        Self {
            shared: Arc::new(Shared { name, cell: ResolutionCell::with_state(state) }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// True once the promise holds a value or a failure.
    pub fn is_available(&self) -> bool {
        self.shared.cell.is_terminal()
    }

    /// The current state without blocking. Values are shared, not copied.
    pub fn peek(&self) -> State<Arc<T>> {
        self.shared.cell.peek()
    }

    /// Present only if the promise failed.
    pub fn get_error(&self) -> Option<Failure> {
        self.peek().failure().cloned()
    }

    /// True if both handles refer to the same promise.
    pub fn same(&self, other: &Promise<T>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Resolves with `value` and notifies every waiting listener on the
    /// calling thread.
    pub fn set(&self, value: T) -> Result<(), Error> {
        let resolution = self.shared.cell.resolve_success(value)?;
        debug!("promise `{}` resolved", self.name());
        self.fire(resolution);
        Ok(())
    }

    /// Resolves with a failure. Passing `None` is rejected with
    /// [`Error::InvalidArgument`] and leaves the promise as it was.
    pub fn fail(&self, failure: impl Into<Option<Failure>>) -> Result<(), Error> {
        let resolution = self.shared.cell.resolve_failure(failure.into())?;
        debug!("promise `{}` failed", self.name());
        self.fire(resolution);
        Ok(())
    }

    /// Resolves from a `Result`, picking `set` or `fail`.
    pub fn complete(&self, outcome: Result<T, Failure>) -> Result<(), Error> {
        match outcome {
            Ok(value) => self.set(value),
            Err(failure) => self.fail(failure),
        }
    }

    fn fire(&self, resolution: Resolution<T>) {
        trace!(
            "promise `{}` notifying {} listener(s)",
            self.name(),
            resolution.listeners.len()
        );
        resolution.fire();
    }

    /// Registers `listener`. If the promise is already resolved it runs
    /// right here, before this call returns, and is not stored.
    ///
    /// Registering the same handle twice while unresolved fails with
    /// [`Error::DuplicateListener`].
    pub fn on_resolved(&self, listener: &Listener<T>) -> Result<(), Error> {
        match self.shared.cell.register(listener)? {
            Registration::Pending => {
                trace!("promise `{}` got a listener", self.name());
            }
            Registration::Immediate(state) => {
                trace!("promise `{}` already resolved, notifying now", self.name());
                listener.notify(&state);
            }
        }
        Ok(())
    }

    /// Registers a fresh listener built from `callback`.
    pub fn on_outcome<F>(&self, callback: F) -> &Self
    where
        F: Fn(Result<&T, &Failure>) + Send + Sync + 'static,
    {
        self.register_fresh(Listener::new(callback))
    }

    /// Registers a fresh listener with separate success and error arms.
    pub fn when_available<S, E>(&self, success: S, error: E) -> &Self
    where
        S: Fn(&T) + Send + Sync + 'static,
        E: Fn(&Failure) + Send + Sync + 'static,
    {
        self.register_fresh(Listener::split(success, error))
    }

    fn register_fresh(&self, listener: Listener<T>) -> &Self {
        let registered = self.on_resolved(&listener);
        debug_assert!(registered.is_ok(), "a fresh listener is never a duplicate");
        self
    }

    /// Blocks the calling thread until the promise is resolved. There is
    /// no timeout; an unresolved promise blocks forever.
    pub fn await_resolution(&self) {
        self.shared.cell.await_terminal();
    }

    /// Blocks for at most `timeout`. Returns whether the promise resolved.
    pub fn await_timeout(&self, timeout: Duration) -> bool {
        self.shared.cell.await_terminal_timeout(timeout).is_terminal()
    }

    /// A callback for legacy APIs that resolves this promise.
    pub fn callback(&self) -> impl Callback<T> + Clone {
        let (on_success, on_error) = (self.clone(), self.clone());
        adapt(move |value| on_success.set(value), move |failure| on_error.fail(failure))
    }
}

impl<T: Clone> Promise<T> {
    /// The success value.
    ///
    /// Fails with [`Error::NotResolved`] before resolution and with
    /// [`Error::Failed`] if the promise failed.
    pub fn get(&self) -> Result<T, Error> {
        match self.peek() {
            State::Unresolved => Err(Error::NotResolved),
            State::Resolved(value) => Ok((*value).clone()),
            State::Failed(failure) => Err(Error::Failed(failure)),
        }
    }

    /// Blocks until resolved, then behaves like [`get`](Promise::get).
    pub fn wait(&self) -> Result<T, Error> {
        self.await_resolution();
        self.get()
    }
}

impl<T> Promise<T>
where
    T: Send + Sync + 'static,
{
    /// Runs `continuation` once this promise succeeds and returns a promise
    /// for the continuation's eventual result. See [`chain`](crate::chain()).
    pub fn then<R, C>(&self, continuation: C) -> Promise<R>
    where
        R: Clone + Send + Sync + 'static,
        C: Continue<R> + Send + Sync + 'static,
    {
        chain_with(self, continuation, FailurePolicy::default())
    }
}

fn ready<T: Clone>(state: State<Arc<T>>) -> Poll<Result<T, Failure>> {
    match state {
        State::Unresolved => Poll::Pending,
        State::Resolved(value) => Poll::Ready(Ok((*value).clone())),
        State::Failed(failure) => Poll::Ready(Err(failure)),
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T, Failure>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        ready(self.shared.cell.poll_terminal(cx.waker()))
    }
}

impl<T: Clone> Future for &Promise<T> {
    type Output = Result<T, Failure>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        ready(self.shared.cell.poll_terminal(cx.waker()))
    }
}
