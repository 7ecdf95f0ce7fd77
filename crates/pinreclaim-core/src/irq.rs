//! Scoped interrupt masking
//!
//! The platform supplies the `critical-section` implementation. On the
//! target it masks interrupts and returns the previous mask; on a host it is
//! a global lock.

use core::marker::PhantomData;

use critical_section::RestoreState;

/// Interrupts stay masked for the lifetime of the guard
///
/// Dropping the guard restores the exact mask that was in place when it was
/// created, on every exit path. Guards may nest as long as they are dropped
/// in reverse order, which scoping guarantees. The guard is neither `Send`
/// nor `Sync`: the mask belongs to the core that took it.
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct InterruptGuard {
    state: RestoreState,
    _not_send: PhantomData<*mut ()>,
}

impl InterruptGuard {
    /// Mask interrupts
    #[inline(always)]
    pub fn new() -> Self {
        // SAFETY: paired with the release in Drop, and the guard cannot be
        // moved to another core.
        let state = unsafe { critical_section::acquire() };
        Self {
            state,
            _not_send: PhantomData,
        }
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    #[inline(always)]
    fn drop(&mut self) {
        // SAFETY: `state` came from the matching acquire in `new`.
        unsafe { critical_section::release(self.state) }
    }
}

/// Run `f` with interrupts masked
///
/// Always inlined so the masked region stays inside the caller's section.
#[inline(always)]
pub fn masked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = InterruptGuard::new();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_nests() {
        let outer = InterruptGuard::new();
        {
            let _inner = InterruptGuard::new();
        }
        drop(outer);
        // A fresh section can be taken once both are gone
        critical_section::with(|_| {});
    }

    #[test]
    fn test_masked_returns_value() {
        assert_eq!(masked(|| 7), 7);
    }
}
