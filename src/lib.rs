//! Lossy many-to-one relay ("diode") for no-std targets with `alloc`.
//!
//! # Highlights
//! - Lock-free MPSC ring: any number of producers, exactly one consumer.
//! - Producers never block and never fail; pressure never flows back to them.
//! - A consumer that falls behind jumps to the newest value and reports the exact loss.
//!
//! # Quick start
//! ```
//! use ph_diode::{CountingAlerter, Diode};
//!
//! let readings = [10u32, 11, 12, 13];
//! let alerts = CountingAlerter::new();
//! let diode = Diode::with_alerter(2, &alerts).unwrap();
//! let mut consumer = diode.consumer().unwrap();
//!
//! diode.set(&readings[0]);
//! assert_eq!(consumer.try_next(), Some(&10));
//!
//! for r in &readings[1..] {
//!     diode.set(r);
//! }
//! // Lagged by 3 with room for 2: skip to the newest value.
//! assert_eq!(consumer.try_next(), Some(&13));
//! assert_eq!(alerts.missed(), 2);
//! assert_eq!(consumer.try_next(), None);
//! ```
//!
//! # No-std
//! The crate is `#![no_std]` and needs `alloc` for the slot array. Tests require `std`.
//!
//! # Safety and concurrency
//! Only one [`Consumer`] may be alive per diode; [`Diode::consumer`] returns
//! [`DiodeError::ConsumerActive`] otherwise. A `Consumer` is not `Clone` and reads through
//! `&mut self`. Producers need no coordination.
//!
//! # Semantics
//! - Sequence numbers are `u64`, starting at `0`, claimed in `set` order.
//! - `try_next` delivers in strictly increasing sequence order.
//! - Every sequence number the consumer passes is either delivered or counted in exactly one
//!   [`Alerter::alert`] call.
//! - The diode holds `&'a T` only; it never copies, drops, or frees the values it relays.
#![no_std]

extern crate alloc;

pub mod alert;
pub mod diode;
pub mod error;
mod slot;

pub use alert::{AlertFn, Alerter, CountingAlerter, LogAlerter, NoopAlerter};
pub use diode::{Consumer, DEFAULT_CAPACITY, Diode, DiodeConfig, PollStats, Producer};
pub use error::DiodeError;

#[cfg(test)]
extern crate std;
