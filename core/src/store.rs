//! Reducer-backed state container shared by the session and pet-profile
//! machines.
//!
//! State lives in a `tokio::sync::watch` channel so screens can subscribe and
//! re-render on change. Each async operation calls [`Store::begin`] to get a
//! [`Ticket`]; only the holder of the newest ticket may dispatch. Results of
//! superseded operations are dropped, so the last operation started wins
//! rather than the last one to finish.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::debug;

/// A state type with a pure transition function.
pub trait Reducer: Default + Clone {
    type Action: Debug;

    fn reduce(self, action: Self::Action) -> Self;
}

/// Identifies one in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

pub(crate) struct Store<S> {
    state: watch::Sender<S>,
    generation: AtomicU64,
}

impl<S: Reducer> Store<S> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(S::default());
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.subscribe()
    }

    /// Starts a new operation, superseding any in flight, and applies the
    /// opening `action` under the same lock.
    pub fn begin(&self, action: S::Action) -> Ticket {
        let mut ticket = Ticket(0);
        self.state.send_modify(|state| {
            ticket = Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
            *state = std::mem::take(state).reduce(action);
        });
        ticket
    }

    /// Applies `action` if `ticket` is still the newest operation. Returns
    /// whether it was applied.
    pub fn dispatch(&self, ticket: Ticket, action: S::Action) -> bool {
        self.state.send_if_modified(|state| {
            let current = self.generation.load(Ordering::SeqCst);
            if current != ticket.0 {
                debug!(?action, ticket = ticket.0, current, "discarding result of superseded operation");
                return false;
            }
            *state = std::mem::take(state).reduce(action);
            true
        })
    }

    /// Whether `ticket` belongs to the newest operation.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Applies `action` regardless of in-flight operations. Used for local
    /// toggles that do not involve I/O.
    pub fn apply(&self, action: S::Action) {
        self.state
            .send_modify(|state| *state = std::mem::take(state).reduce(action));
    }
}
