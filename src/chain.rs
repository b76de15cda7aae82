//! Linking a promise to a computation that produces another promise.
//!
//! There is no suspension here. A continuation is a closure that may be
//! called any number of times; each call checks whether its inputs are ready
//! and, the first time they are, resolves its output promise. [`chain`]
//! calls it when the source promise resolves and folds the output, now or
//! later, into one result promise.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::promise::Promise;
use crate::state::{Failure, State};

/// Something that can be (re-)invoked to obtain its output promise.
///
/// Implementations must hand back the same output promise on every call and
/// must not resolve it more than once. Plain closures returning a promise
/// qualify; [`Continuation`] enforces both rules for you.
pub trait Continue<R> {
    fn invoke(&self) -> Promise<R>;
}

impl<R, F> Continue<R> for F
where
    F: Fn() -> Promise<R>,
{
    fn invoke(&self) -> Promise<R> {
        self()
    }
}

type Step<R> = dyn Fn() -> Option<Result<R, Failure>> + Send + Sync + 'static;

/// A re-invocable computation with a declared output promise.
///
/// The step closure captures its inputs and returns `None` while any of them
/// is still missing. Once it returns an outcome, the output is resolved and
/// later invocations leave it alone without running the step again.
///
/// # Examples
///
/// ```
/// use promise_chain::{Continue, Continuation, Promise};
///
/// let a = Promise::<i32>::new();
/// let b = Promise::<i32>::new();
/// let sum = {
///     let (a, b) = (a.clone(), b.clone());
///     Continuation::new("sum", move || Some(Ok(a.get().ok()? + b.get().ok()?)))
/// };
/// sum.rerun_on(&a).rerun_on(&b);
///
/// a.set(1).unwrap();
/// assert!(!sum.output().is_available());
/// b.set(2).unwrap();
/// assert_eq!(sum.invoke().get().unwrap(), 3);
/// ```
pub struct Continuation<R> {
    output: Promise<R>,
    step: Arc<Step<R>>,
}

impl<R> Clone for Continuation<R> {
    fn clone(&self) -> Self {
        Self { output: self.output.clone(), step: self.step.clone() }
    }
}

impl<R> fmt::Debug for Continuation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation").field("output", &self.output).finish()
    }
}

impl<R> Continuation<R> {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, step: F) -> Self
    where
        F: Fn() -> Option<Result<R, Failure>> + Send + Sync + 'static,
    {
        Self { output: Promise::named(name), step: Arc::new(step) }
    }

    pub fn output(&self) -> &Promise<R> {
        &self.output
    }
}

impl<R> Continuation<R>
where
    R: Send + Sync + 'static,
{
    /// Re-invokes this continuation whenever `input` succeeds.
    pub fn rerun_on<S>(&self, input: &Promise<S>) -> &Self
    where
        S: Send + Sync + 'static,
    {
        let this = self.clone();
        input.when_available(
            move |_| {
                this.invoke();
            },
            |_| {},
        );
        self
    }
}

impl<R> Continue<R> for Continuation<R> {
    fn invoke(&self) -> Promise<R> {
        if !self.output.is_available() {
            if let Some(outcome) = (self.step)() {
                // Two threads may both get here; only one of them wins.
                if let Err(err) = self.output.complete(outcome) {
                    warn!("continuation `{}` lost a race: {}", self.output.name(), err);
                }
            }
        }
        self.output.clone()
    }
}

/// What a chain does when its source promise fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the result promise with the source's failure.
    #[default]
    Propagate,
    /// Drop the failure; the result promise then never resolves.
    Swallow,
}

/// Runs `continuation` once `source` succeeds and returns a promise for the
/// continuation's eventual outcome, failing fast if `source` fails.
///
/// If `source` is already resolved the continuation runs before this
/// returns, and if its output is already resolved too, so is the result.
pub fn chain<S, R, C>(source: &Promise<S>, continuation: C) -> Promise<R>
where
    S: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    C: Continue<R> + Send + Sync + 'static,
{
    chain_with(source, continuation, FailurePolicy::default())
}

/// [`chain`] with an explicit [`FailurePolicy`] for the source's failure.
/// A failure of the continuation's own output is always forwarded.
pub fn chain_with<S, R, C>(source: &Promise<S>, continuation: C, policy: FailurePolicy) -> Promise<R>
where
    S: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    C: Continue<R> + Send + Sync + 'static,
{
    let result = Promise::named(format!("return {}", source.name()));
    let target = result.clone();
    source.on_outcome(move |outcome| match outcome {
        Ok(_) => {
            let dependent = continuation.invoke();
            debug!("`{}` continued into `{}`", target.name(), dependent.name());
            forward(&dependent, &target);
        }
        Err(failure) => match policy {
            FailurePolicy::Propagate => settle(&target, Err(failure.clone())),
            FailurePolicy::Swallow => {
                debug!("`{}` swallowed source failure: {}", target.name(), failure);
            }
        },
    });
    result
}

fn forward<R>(dependent: &Promise<R>, target: &Promise<R>)
where
    R: Clone + Send + Sync + 'static,
{
    match dependent.peek() {
        State::Resolved(value) => settle(target, Ok((*value).clone())),
        State::Failed(failure) => settle(target, Err(failure)),
        State::Unresolved => {
            let target = target.clone();
            dependent.on_outcome(move |outcome| {
                settle(&target, outcome.cloned().map_err(Failure::clone));
            });
        }
    }
}

fn settle<R>(target: &Promise<R>, outcome: Result<R, Failure>) {
    if let Err(err) = target.complete(outcome) {
        warn!("chain result `{}` not updated: {}", target.name(), err);
    }
}
