//! The lock-guarded heart of a promise.
//!
//! State, listeners and async wakers live behind one `Mutex`, paired with a
//! `Condvar` for blocking waiters. Every decision about a transition is made
//! while holding the lock; every callback runs after it has been dropped.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::Waker;
use std::time::{Duration, Instant};

use log::trace;

use crate::registry::{Listener, ListenerRegistry, Snapshot};
use crate::state::{Failure, State};
use crate::Error;

#[derive(Debug)]
struct Inner<T> {
    state: State<Arc<T>>,
    listeners: ListenerRegistry<T>,
    wakers: Vec<Waker>,
}

#[derive(Debug)]
pub(crate) struct ResolutionCell<T> {
    inner: Mutex<Inner<T>>,
    resolved: Condvar,
}

/// What a successful transition hands back to the resolving thread: the
/// terminal state and the listeners owed a notification.
pub(crate) struct Resolution<T> {
    pub state: State<Arc<T>>,
    pub listeners: Snapshot<T>,
}

impl<T> Resolution<T> {
    pub fn fire(self) {
        self.listeners.fire_all(&self.state);
    }
}

/// Outcome of adding a listener.
pub(crate) enum Registration<T> {
    /// Stored; it fires when the cell resolves.
    Pending,
    /// The cell was already terminal; deliver this state right away.
    Immediate(State<Arc<T>>),
}

impl<T> ResolutionCell<T> {
    pub fn with_state(state: State<Arc<T>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                listeners: ListenerRegistry::default(),
                wakers: Vec::new(),
            }),
            resolved: Condvar::new(),
        }
    }

    // Listeners never run under the lock, so a poisoned guard still holds
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn resolve_success(&self, value: T) -> Result<Resolution<T>, Error> {
        self.transition(Some(State::Resolved(Arc::new(value))))
    }

    pub fn resolve_failure(&self, failure: Option<Failure>) -> Result<Resolution<T>, Error> {
        self.transition(failure.map(State::Failed))
    }

    // A terminal cell reports `AlreadyResolved` before the argument is
    // looked at.
    fn transition(&self, next: Option<State<Arc<T>>>) -> Result<Resolution<T>, Error> {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return Err(Error::AlreadyResolved);
        }
        let next = next.ok_or(Error::InvalidArgument("failure must be present"))?;
        inner.state = next.clone();
        let listeners = inner.listeners.take_snapshot();
        let wakers = std::mem::take(&mut inner.wakers);
        drop(inner);

        self.resolved.notify_all();
        for waker in wakers {
            waker.wake();
        }
        Ok(Resolution { state: next, listeners })
    }

    pub fn peek(&self) -> State<Arc<T>> {
        self.lock().state.clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock().state.is_terminal()
    }

    pub fn await_terminal(&self) -> State<Arc<T>> {
        let mut inner = self.lock();
        while !inner.state.is_terminal() {
            inner = self
                .resolved
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
        inner.state.clone()
    }

    /// Like `await_terminal`, giving up after `timeout`. Returns
    /// `Unresolved` on timeout.
    pub fn await_terminal_timeout(&self, timeout: Duration) -> State<Arc<T>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        while !inner.state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            inner = self
                .resolved
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        inner.state.clone()
    }

    pub fn register(&self, listener: &Listener<T>) -> Result<Registration<T>, Error> {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return Ok(Registration::Immediate(inner.state.clone()));
        }
        if inner.listeners.contains(listener) {
            return Err(Error::DuplicateListener);
        }
        inner.listeners.push(listener.clone());
        trace!("listener stored, {} waiting", inner.listeners.len());
        Ok(Registration::Pending)
    }

    /// Returns the terminal state if there is one, otherwise parks `waker`
    /// until resolution.
    pub fn poll_terminal(&self, waker: &Waker) -> State<Arc<T>> {
        let mut inner = self.lock();
        if !inner.state.is_terminal() && !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
        inner.state.clone()
    }
}
