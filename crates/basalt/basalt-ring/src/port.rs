//! Host runtime port: the shims a bare-metal build would swap out.
//!
//! On a microcontroller the lock is an interrupt mask and `interrupt_active`
//! inspects the active-exception register. On a hosted build the lock is the
//! `std` mutex held by the ring, there is no interrupt context, and
//! writes-from-interrupt are disabled at configuration time, so the gate
//! never drops data.

use std::sync::atomic::{Ordering, fence as atomic_fence};

/// Data barrier issued at every lock boundary.
#[inline(always)]
pub(crate) fn fence() {
    atomic_fence(Ordering::SeqCst);
}

/// Whether the caller runs in interrupt context. Constantly false on a
/// hosted runtime.
#[inline(always)]
pub(crate) fn interrupt_active() -> bool {
    false
}
