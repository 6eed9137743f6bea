//! Lock-free MPSC diode: many producers, one consumer, lossy under pressure.
//!
//! # Overview
//! - Any number of producers call [`Diode::set`]; it never blocks and never fails.
//! - Exactly one [`Consumer`] reads with [`Consumer::try_next`]; it never blocks either.
//! - Producers claim sequence numbers from a shared write cursor; the slot for sequence `s`
//!   is `s % capacity`.
//! - If the consumer lags by more than `capacity`, it jumps to the newest claimed record and
//!   reports the number of skipped values to the [`Alerter`].
//!
//! # Memory ordering
//! Producers claim a sequence with a relaxed `fetch_add`, then publish the packed
//! `(sequence, &T)` record with a release compare-exchange. The consumer snapshots the write
//! cursor, then acquires the slot word. A slot that still holds an older sequence belongs to a
//! claim whose store has not landed yet; the consumer leaves it for a later call. A slot that
//! already holds a newer sequence was lapped, and the gap is reported as lost.
//!
//! # Values
//! The diode relays `&'a T` and never copies, drops, or frees a `T`. Every referent must
//! outlive the diode, which the borrow checker enforces.

use alloc::boxed::Box;
use core::fmt;

use crossbeam_utils::CachePadded;
use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::alert::{Alerter, NoopAlerter};
use crate::error::DiodeError;
use crate::slot::Slot;

/// Capacity used by [`DiodeConfig::default`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// Validated construction parameters, reusable across diodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiodeConfig {
    capacity: usize,
}

impl DiodeConfig {
    pub const fn new(capacity: usize) -> Result<Self, DiodeError> {
        if capacity < 1 {
            return Err(DiodeError::InvalidConfiguration { capacity });
        }
        Ok(Self { capacity })
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DiodeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PollStats {
    pub read: usize,
    pub dropped: u64,
    /// Newest claimed sequence when the poll finished, `None` before the first `set`.
    pub newest: Option<u64>,
}

/// Overwrite ring relaying references from many producers to one consumer.
pub struct Diode<'a, T, A = NoopAlerter> {
    write_cursor: CachePadded<AtomicU64>,
    // Parked here while no consumer handle is alive.
    read_cursor: CachePadded<AtomicU64>,
    consumer_active: AtomicBool,
    slots: Box<[Slot<'a, T>]>,
    alerter: A,
}

impl<'a, T> Diode<'a, T> {
    /// A diode that discards loss reports.
    pub fn new(capacity: usize) -> Result<Self, DiodeError> {
        Self::with_alerter(capacity, NoopAlerter)
    }
}

impl<'a, T, A: Alerter> Diode<'a, T, A> {
    pub fn with_alerter(capacity: usize, alerter: A) -> Result<Self, DiodeError> {
        Ok(Self::from_config(DiodeConfig::new(capacity)?, alerter))
    }

    pub fn from_config(config: DiodeConfig, alerter: A) -> Self {
        let capacity = config.capacity();
        log::debug!(target: "ph_diode", "creating diode with capacity {capacity}");
        Self {
            write_cursor: CachePadded::new(AtomicU64::new(0)),
            read_cursor: CachePadded::new(AtomicU64::new(0)),
            consumer_active: AtomicBool::new(false),
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            alerter,
        }
    }
}

impl<'a, T, A> Diode<'a, T, A> {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of sequence numbers claimed so far.
    #[inline]
    pub fn written(&self) -> u64 {
        self.write_cursor.load(Ordering::Acquire)
    }

    #[inline]
    pub fn alerter(&self) -> &A {
        &self.alerter
    }

    #[inline(always)]
    fn slot_for(&self, seq: u64) -> &Slot<'a, T> {
        &self.slots[(seq % self.slots.len() as u64) as usize]
    }

    /// Hand `value` to the consumer. May overwrite unread data; never blocks.
    #[inline]
    pub fn set(&self, value: &'a T) {
        let seq = self.write_cursor.fetch_add(1, Ordering::Relaxed);
        self.slot_for(seq).store(seq, value);
    }

    /// Create a producer handle. Any number may be active.
    #[inline]
    pub fn producer(&self) -> Producer<'_, 'a, T, A> {
        Producer { diode: self }
    }

    /// Claim the consumer handle. Only one may be active; dropping it releases the claim
    /// and parks the read cursor so the next handle resumes where this one stopped.
    pub fn consumer(&self) -> Result<Consumer<'_, 'a, T, A>, DiodeError> {
        self.consumer_active
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| DiodeError::ConsumerActive)?;
        Ok(Consumer {
            diode: self,
            read: self.read_cursor.load(Ordering::Relaxed),
            dropped_accum: 0,
        })
    }
}

impl<T, A> fmt::Debug for Diode<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diode")
            .field("capacity", &self.capacity())
            .field("written", &self.written())
            .field("consumer_active", &self.consumer_active.load(Ordering::Relaxed))
            .finish()
    }
}

pub struct Producer<'d, 'a, T, A = NoopAlerter> {
    diode: &'d Diode<'a, T, A>,
}

impl<T, A> Clone for Producer<'_, '_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A> Copy for Producer<'_, '_, T, A> {}

impl<'d, 'a, T, A> Producer<'d, 'a, T, A> {
    #[inline]
    pub fn set(&self, value: &'a T) {
        self.diode.set(value)
    }
}

/// The single reading side of a [`Diode`].
///
/// Not `Clone`; reads take `&mut self`. The handle may move to another thread but only one
/// thread reads at a time.
pub struct Consumer<'d, 'a, T, A = NoopAlerter> {
    diode: &'d Diode<'a, T, A>,
    read: u64,
    dropped_accum: u64,
}

impl<'d, 'a, T, A: Alerter> Consumer<'d, 'a, T, A> {
    /// How many values have been reported lost since this handle was created (or reset).
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped_accum
    }

    /// Zero the running total behind [`dropped`](Self::dropped). The alerter is unaffected.
    #[inline]
    pub fn reset_dropped(&mut self) {
        self.dropped_accum = 0;
    }

    /// Next sequence number this handle expects to read.
    #[inline]
    pub fn position(&self) -> u64 {
        self.read
    }

    /// Claimed but not yet consumed sequence numbers. May exceed the capacity.
    #[inline]
    pub fn pending(&self) -> u64 {
        self.diode.written() - self.read
    }

    /// Next value, or `None` when nothing new has been published.
    #[inline]
    pub fn try_next(&mut self) -> Option<&'a T> {
        self.try_next_seq().map(|(_, value)| value)
    }

    /// Like [`try_next`](Self::try_next), also returning the sequence number delivered.
    pub fn try_next_seq(&mut self) -> Option<(u64, &'a T)> {
        let written = self.diode.written();
        if self.read == written {
            return None;
        }

        let capacity = self.diode.capacity() as u64;
        let lag = written - self.read;
        let mut missed = 0;
        if lag > capacity {
            missed = lag - 1;
            self.read = written - 1;
        }

        let delivered = match self.diode.slot_for(self.read).load() {
            Some((seq, value)) if seq >= self.read => {
                // `seq > self.read`: a later lap overwrote the record we were after.
                missed += seq - self.read;
                self.read = seq + 1;
                Some((seq, value))
            }
            // The claim for `self.read` has not been stored yet.
            _ => None,
        };

        self.report(missed);
        delivered
    }

    /// Deliver the next value to `hook`, if one is ready.
    ///
    /// Returns false when nothing was delivered. A loss detected by the same read is still
    /// reported to the alerter, so `false` does not imply the consumer stayed put.
    #[inline]
    pub fn poll_one(&mut self, hook: impl FnOnce(u64, &'a T)) -> bool {
        let mut hook = Some(hook);
        let stats = self.poll_up_to(1, |seq, v| {
            if let Some(hook) = hook.take() {
                hook(seq, v);
            }
        });
        stats.read == 1
    }

    /// Deliver up to `max` values in sequence order, stopping at the first read that yields
    /// nothing. `dropped` in the result counts every loss reported during the poll.
    pub fn poll_up_to(&mut self, max: usize, mut hook: impl FnMut(u64, &'a T)) -> PollStats {
        let dropped_before = self.dropped_accum;
        let mut read = 0usize;

        while read < max {
            match self.try_next_seq() {
                Some((seq, value)) => {
                    hook(seq, value);
                    read += 1;
                }
                None => break,
            }
        }

        PollStats {
            read,
            dropped: self.dropped_accum - dropped_before,
            newest: self.diode.written().checked_sub(1),
        }
    }

    /// Fast-forward so the next read yields the newest claimed value.
    /// Skipped values are reported to the alerter.
    pub fn skip_to_latest(&mut self) {
        let written = self.diode.written();
        if written > self.read + 1 {
            let missed = written - 1 - self.read;
            self.read = written - 1;
            self.report(missed);
        }
    }

    #[inline]
    fn report(&mut self, missed: u64) {
        if missed > 0 {
            self.dropped_accum += missed;
            self.diode.alerter.alert(missed);
        }
    }
}

impl<T, A> Drop for Consumer<'_, '_, T, A> {
    fn drop(&mut self) {
        self.diode.read_cursor.store(self.read, Ordering::Relaxed);
        self.diode.consumer_active.store(false, Ordering::Release);
    }
}
