//! Loss sinks invoked by the consumer when unread values were overwritten.
//!
//! # Contract
//! - `alert` runs inline on the consumer thread, at most once per read, and only when
//!   the consumer detected a loss. It must return promptly.
//! - A sink must not call back into the diode it observes.
//! - `missed` is the exact number of sequence numbers skipped by that read.

use portable_atomic::{AtomicU64, Ordering};

use alloc::boxed::Box;
use alloc::sync::Arc;

/// Receives the number of values a consumer could not deliver.
pub trait Alerter {
    fn alert(&self, missed: u64);
}

/// Sink that ignores every report. Used when no sink is configured.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopAlerter;

impl Alerter for NoopAlerter {
    #[inline(always)]
    fn alert(&self, _missed: u64) {}
}

/// Adapts a closure into a sink.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlertFn<F>(pub F);

impl<F: Fn(u64)> Alerter for AlertFn<F> {
    #[inline]
    fn alert(&self, missed: u64) {
        (self.0)(missed)
    }
}

/// `None` behaves like [`NoopAlerter`].
impl<A: Alerter> Alerter for Option<A> {
    #[inline]
    fn alert(&self, missed: u64) {
        if let Some(inner) = self {
            inner.alert(missed);
        }
    }
}

impl<A: Alerter + ?Sized> Alerter for &A {
    #[inline]
    fn alert(&self, missed: u64) {
        (**self).alert(missed)
    }
}

impl<A: Alerter + ?Sized> Alerter for Arc<A> {
    #[inline]
    fn alert(&self, missed: u64) {
        (**self).alert(missed)
    }
}

impl<A: Alerter + ?Sized> Alerter for Box<A> {
    #[inline]
    fn alert(&self, missed: u64) {
        (**self).alert(missed)
    }
}

/// Reports every loss through the `log` facade at `warn` level.
#[derive(Copy, Clone, Debug)]
pub struct LogAlerter {
    target: &'static str,
}

impl LogAlerter {
    pub const DEFAULT_TARGET: &'static str = "ph_diode";

    pub const fn new() -> Self {
        Self {
            target: Self::DEFAULT_TARGET,
        }
    }

    /// Log under `target` instead of the crate name.
    pub const fn with_target(target: &'static str) -> Self {
        Self { target }
    }

    #[inline]
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for LogAlerter {
    fn default() -> Self {
        Self::new()
    }
}

impl Alerter for LogAlerter {
    fn alert(&self, missed: u64) {
        log::warn!(target: self.target, "diode consumer fell behind, dropped {missed} values");
    }
}

/// Lock-free loss totals, readable from any thread.
#[derive(Debug, Default)]
pub struct CountingAlerter {
    events: AtomicU64,
    missed: AtomicU64,
}

impl CountingAlerter {
    pub const fn new() -> Self {
        Self {
            events: AtomicU64::new(0),
            missed: AtomicU64::new(0),
        }
    }

    /// Number of loss reports received.
    #[inline]
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Sum of every reported `missed` count.
    #[inline]
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    /// Return the totals and zero them.
    pub fn take(&self) -> (u64, u64) {
        (
            self.events.swap(0, Ordering::Relaxed),
            self.missed.swap(0, Ordering::Relaxed),
        )
    }
}

impl Alerter for CountingAlerter {
    #[inline]
    fn alert(&self, missed: u64) {
        self.events.fetch_add(1, Ordering::Relaxed);
        self.missed.fetch_add(missed, Ordering::Relaxed);
    }
}
