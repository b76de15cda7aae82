//! Single-assignment promises for code that wants to read linearly while
//! its results arrive later through callbacks.
//!
//! A [`Promise`] starts out empty and is resolved exactly once, with a value
//! or a [`Failure`]. Listeners may be registered before or after that
//! happens and are notified exactly once either way, on the resolving
//! thread or, if already resolved, right away. [`chain`] turns "when this
//! resolves, compute that" into a third promise for the final outcome.
//!
//! # Examples
//!
//! ```
//! use promise_chain::{chain, Continuation, Failure, Promise};
//! use std::thread;
//!
//! let text = Promise::<String>::named("gas price text");
//! let price = {
//!     let input = text.clone();
//!     chain(&text, Continuation::new("gas price", move || {
//!         let text = input.get().ok()?;
//!         Some(text.parse::<u32>().map_err(Failure::new))
//!     }))
//! };
//! assert!(!price.is_available());
//!
//! let producer = text.clone();
//! thread::spawn(move || producer.set("100".into()))
//!     .join()
//!     .expect("The producer thread has panicked")
//!     .unwrap();
//! assert_eq!(price.wait().unwrap(), 100);
//! ```

use thiserror::Error;

mod adapter;
mod cell;
mod chain;
mod promise;
mod registry;
mod state;

pub use adapter::{adapt, Adapter, Callback};
pub use chain::{chain, chain_with, Continuation, Continue, FailurePolicy};
pub use promise::Promise;
pub use registry::Listener;
pub use state::{Failure, State};

/// Contract violations reported to the caller of the offending operation,
/// plus [`Error::Failed`] for reading a promise that failed.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("promise has already been resolved")]
    AlreadyResolved,
    #[error("promise hasn't been resolved yet")]
    NotResolved,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("listener is already registered on this promise")]
    DuplicateListener,
    #[error("promise failed: {0}")]
    Failed(Failure),
}
