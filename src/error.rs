//! Errors raised while assembling a diode.
//!
//! Losing data is not an error: it is reported through an [`Alerter`](crate::Alerter).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiodeError {
    /// The ring needs at least one slot.
    #[error("invalid diode configuration: capacity must be at least 1 (got {capacity})")]
    InvalidConfiguration { capacity: usize },

    /// Another [`Consumer`](crate::Consumer) handle is still alive.
    #[error("a consumer handle for this diode is already active")]
    ConsumerActive,
}
