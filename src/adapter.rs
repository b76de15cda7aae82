//! Bridging legacy callback APIs to promises.
//!
//! A callback-based API expects some object with a success arm and an error
//! arm. Write a small shim from that API's callback shape to [`Callback`],
//! then hand it an [`Adapter`] (usually from
//! [`Promise::callback`](crate::Promise::callback)).
//!
//! # Examples
//!
//! ```
//! use promise_chain::{Callback, Promise};
//! use std::thread;
//!
//! // A legacy API reporting its answer through a callback on some thread.
//! fn find_user<C: Callback<String> + Send + 'static>(id: u32, callback: C) {
//!     thread::spawn(move || {
//!         let _ = callback.success(format!("Esteemed customer {id}"));
//!     });
//! }
//!
//! let user = Promise::<String>::named("user");
//! find_user(7, user.callback());
//! assert_eq!(user.wait().unwrap(), "Esteemed customer 7");
//! ```

use crate::state::Failure;
use crate::Error;

/// The single-success/single-error shape most legacy callbacks boil down to.
pub trait Callback<T> {
    fn success(&self, value: T) -> Result<(), Error>;
    fn error(&self, failure: Failure) -> Result<(), Error>;
}

/// A [`Callback`] made of two functions.
#[derive(Clone)]
pub struct Adapter<S, F> {
    on_success: S,
    on_error: F,
}

/// Builds a [`Callback`] whose success arm calls `on_success` and whose
/// error arm calls `on_error`.
pub fn adapt<T, S, F>(on_success: S, on_error: F) -> Adapter<S, F>
where
    S: Fn(T) -> Result<(), Error>,
    F: Fn(Failure) -> Result<(), Error>,
{
    Adapter { on_success, on_error }
}

impl<T, S, F> Callback<T> for Adapter<S, F>
where
    S: Fn(T) -> Result<(), Error>,
    F: Fn(Failure) -> Result<(), Error>,
{
    fn success(&self, value: T) -> Result<(), Error> {
        (self.on_success)(value)
    }

    fn error(&self, failure: Failure) -> Result<(), Error> {
        (self.on_error)(failure)
    }
}
