//! Ring slots holding one `(sequence, &T)` record each.
//!
//! A record is packed into a single 128-bit atomic word: the high half holds `sequence + 1`
//! (`0` marks a slot that was never written), the low half holds the exposed address of the
//! referent. Readers therefore see either the whole old record or the whole new one.
//!
//! Stores keep the highest sequence: a producer that lost the race to a later lap leaves the
//! slot untouched, so a slot never regresses to an older record.

use core::marker::PhantomData;
use core::ptr;

use portable_atomic::{AtomicU128, Ordering};

const EMPTY: u128 = 0;

// The low half of a record holds a full address.
const _: () = assert!(core::mem::size_of::<usize>() <= 8);

#[inline(always)]
const fn tag_of(word: u128) -> u64 {
    (word >> 64) as u64
}

pub(crate) struct Slot<'a, T> {
    word: AtomicU128,
    _values: PhantomData<&'a T>,
}

impl<'a, T> Slot<'a, T> {
    pub(crate) const fn new() -> Self {
        Self {
            word: AtomicU128::new(EMPTY),
            _values: PhantomData,
        }
    }

    #[inline(always)]
    fn pack(seq: u64, value: &'a T) -> u128 {
        let addr = ptr::from_ref(value).expose_provenance() as u64;
        ((seq.wrapping_add(1) as u128) << 64) | addr as u128
    }

    /// Publish `value` under `seq` unless the slot already holds a later sequence.
    #[inline]
    pub(crate) fn store(&self, seq: u64, value: &'a T) {
        let word = Self::pack(seq, value);
        let tag = tag_of(word);
        let mut current = self.word.load(Ordering::Relaxed);
        loop {
            if tag_of(current) >= tag {
                return;
            }
            match self
                .word
                .compare_exchange_weak(current, word, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// The record currently in the slot, if any.
    #[inline]
    pub(crate) fn load(&self) -> Option<(u64, &'a T)> {
        let word = self.word.load(Ordering::Acquire);
        let tag = tag_of(word);
        if tag == 0 {
            return None;
        }
        let value = ptr::with_exposed_provenance::<T>(word as u64 as usize);
        // SAFETY: every non-empty word was packed by `store` from a `&'a T`, and the slot
        // cannot outlive `'a`.
        Some((tag - 1, unsafe { &*value }))
    }
}
