use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// The failure a promise may be resolved with.
///
/// Wraps any error in an `Arc` so that every listener and every consumer
/// sees the very same error instance. Use [`Failure::ptr_eq`] to check
/// identity.
#[derive(Clone)]
pub struct Failure(Arc<dyn StdError + Send + Sync + 'static>);

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdError for Message {}

impl Failure {
    pub fn new<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure(Arc::new(err))
    }

    /// A failure carrying nothing but a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Failure(Arc::new(Message(message.into())))
    }

    /// True if both handles point at the same error instance.
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Failure::new(err)
    }
}

impl std::ops::Deref for Failure {
    type Target = dyn StdError + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.0).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Where a promise stands. Leaves `Unresolved` at most once and never
/// changes again afterwards.
#[derive(Debug, Clone)]
pub enum State<T> {
    Unresolved,
    Resolved(T),
    Failed(Failure),
}

impl<T> State<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, State::Unresolved)
    }

    /// The terminal outcome, borrowed. `None` while unresolved.
    pub fn outcome(&self) -> Option<Result<&T, &Failure>> {
        match self {
            State::Unresolved => None,
            State::Resolved(value) => Some(Ok(value)),
            State::Failed(failure) => Some(Err(failure)),
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            State::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl<T> Default for State<T> {
    fn default() -> Self {
        State::Unresolved
    }
}
