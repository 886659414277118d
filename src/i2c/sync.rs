// Licensed under the Apache-2.0 license

//! Interrupt-to-caller signalling.
//!
//! A blocked transfer names the interrupt causes it cares about and waits for
//! any of them with a deadline. The interrupt handler posts every cause it saw.
//! Lock order used by the driver: transaction mutex, then critical section.
//! A critical section is never held across [`InterruptEvent::wait`].

use embedded_hal::delay::DelayNs;
use fugit::MillisDurationU32;
use portable_atomic::{AtomicU32, Ordering};

use crate::i2c::registers::Interrupts;

/// Granularity of [`PollingEvent`] waits.
pub const POLL_INTERVAL_US: u32 = 10;

/// Auto-clearing event bitmask.
pub trait InterruptEvent {
    /// Records `bits` as having fired. Callable from interrupt context.
    fn post(&self, bits: Interrupts);

    /// Forgets any earlier occurrence of `bits`.
    fn clear(&self, bits: Interrupts);

    /// Blocks until any bit in `mask` has been posted or `timeout` elapses.
    ///
    /// Returns the posted bits within `mask` and consumes them. An empty
    /// result means the deadline passed.
    fn wait(&self, mask: Interrupts, timeout: MillisDurationU32) -> Interrupts;
}

impl<E: InterruptEvent + ?Sized> InterruptEvent for &E {
    fn post(&self, bits: Interrupts) {
        (**self).post(bits);
    }

    fn clear(&self, bits: Interrupts) {
        (**self).clear(bits);
    }

    fn wait(&self, mask: Interrupts, timeout: MillisDurationU32) -> Interrupts {
        (**self).wait(mask, timeout)
    }
}

/// Event object for bare-metal targets: an atomic bitmask polled with a
/// delay provider until the deadline.
pub struct PollingEvent<D> {
    bits: AtomicU32,
    delay: spin::Mutex<D>,
}

impl<D: DelayNs> PollingEvent<D> {
    pub const fn new(delay: D) -> Self {
        Self {
            bits: AtomicU32::new(0),
            delay: spin::Mutex::new(delay),
        }
    }

    fn take(&self, mask: Interrupts) -> Interrupts {
        let prev = self.bits.fetch_and(!mask.bits(), Ordering::AcqRel);
        Interrupts::from_bits_retain(prev & mask.bits())
    }

    /// Bits posted and not yet consumed.
    pub fn pending(&self) -> Interrupts {
        Interrupts::from_bits_retain(self.bits.load(Ordering::Acquire))
    }
}

impl<D: DelayNs> InterruptEvent for PollingEvent<D> {
    fn post(&self, bits: Interrupts) {
        self.bits.fetch_or(bits.bits(), Ordering::AcqRel);
    }

    fn clear(&self, bits: Interrupts) {
        self.bits.fetch_and(!bits.bits(), Ordering::AcqRel);
    }

    fn wait(&self, mask: Interrupts, timeout: MillisDurationU32) -> Interrupts {
        let budget_us = timeout.ticks().saturating_mul(1000);
        let mut waited_us = 0u32;
        loop {
            let hit = self.take(mask);
            if !hit.is_empty() || waited_us >= budget_us {
                return hit;
            }
            self.delay.lock().delay_us(POLL_INTERVAL_US);
            waited_us = waited_us.saturating_add(POLL_INTERVAL_US);
        }
    }
}
