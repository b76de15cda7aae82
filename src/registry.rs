use std::fmt;
use std::sync::Arc;

use crate::state::{Failure, State};

type Callback<T> = dyn Fn(Result<&T, &Failure>) + Send + Sync + 'static;

/// A handle to a callback registered on a promise.
///
/// Clones share identity: registering a clone on a promise that already
/// holds the original is a duplicate.
pub struct Listener<T> {
    callback: Arc<Callback<T>>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self { callback: self.callback.clone() }
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &Arc::as_ptr(&self.callback))
            .finish()
    }
}

impl<T> Listener<T> {
    /// A listener receiving either the value or the failure, never both.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Result<&T, &Failure>) + Send + Sync + 'static,
    {
        Self { callback: Arc::new(callback) }
    }

    /// A listener with separate success and error arms.
    pub fn split<S, E>(success: S, error: E) -> Self
    where
        S: Fn(&T) + Send + Sync + 'static,
        E: Fn(&Failure) + Send + Sync + 'static,
    {
        Self::new(move |outcome| match outcome {
            Ok(value) => success(value),
            Err(failure) => error(failure),
        })
    }

    pub fn same(&self, other: &Listener<T>) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }

    /// Deliver a terminal state. Nothing happens for `Unresolved`.
    pub(crate) fn notify(&self, state: &State<Arc<T>>) {
        match state.outcome() {
            Some(Ok(value)) => (self.callback)(Ok(&**value)),
            Some(Err(failure)) => (self.callback)(Err(failure)),
            None => {}
        }
    }
}

/// Listeners waiting on one promise, in registration order.
///
/// Lives inside the promise's cell and is only touched under its lock.
/// Firing happens on a snapshot taken out of the registry, after the lock
/// has been released.
#[derive(Debug)]
pub(crate) struct ListenerRegistry<T> {
    listeners: Vec<Listener<T>>,
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self { listeners: Vec::new() }
    }
}

impl<T> ListenerRegistry<T> {
    pub fn contains(&self, listener: &Listener<T>) -> bool {
        self.listeners.iter().any(|l| l.same(listener))
    }

    pub fn push(&mut self, listener: Listener<T>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Empties the registry. Each stored listener is owed exactly one
    /// notification, which the returned snapshot delivers.
    pub fn take_snapshot(&mut self) -> Snapshot<T> {
        Snapshot { listeners: std::mem::take(&mut self.listeners) }
    }
}

/// Listeners detached from their registry, ready to be fired.
pub(crate) struct Snapshot<T> {
    listeners: Vec<Listener<T>>,
}

impl<T> Snapshot<T> {
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn fire_all(self, state: &State<Arc<T>>) {
        for listener in self.listeners {
            listener.notify(state);
        }
    }
}
