//! Monotonic millisecond clock fed by the tick interrupt.

use core::sync::atomic::{AtomicBool, Ordering};

/// Millisecond timestamp. Wraps every 65 536 ms.
pub type Timestamp = u16;

/// Difference between two [`Timestamp`]s, computed with wrapping subtraction.
pub type Duration = u16;

/// System time base.
///
/// The interrupt side only ever adds to `pending`. Both sides drain it with
/// an atomic swap, so each tick reaches `millis` exactly once no matter how
/// a [`tick`](Self::tick) interleaves with a [`now`](Self::now).
pub struct Clock {
    pending: Counter,
    millis: Counter,
    busy: AtomicBool,
}

impl Clock {
    /// Clock at zero, ready to live in a `static`
    pub const fn new() -> Self {
        Self {
            pending: Counter::new(),
            millis: Counter::new(),
            busy: AtomicBool::new(false),
        }
    }

    /// Account for one tick. Call from the tick interrupt only.
    ///
    /// If a foreground read is in progress the tick stays in the
    /// accumulator and is merged by the next drain.
    #[inline]
    pub fn tick(&self) {
        self.pending.add(1);
        if !self.busy.load(Ordering::Acquire) {
            self.merge();
        }
    }

    /// Current time. Call from the foreground only.
    pub fn now(&self) -> Timestamp {
        self.busy.store(true, Ordering::Release);
        self.merge();
        let now = self.millis.get();
        self.busy.store(false, Ordering::Release);
        now
    }

    /// Milliseconds since `since`, wrapping past [`Timestamp::MAX`].
    pub fn elapsed(&self, since: Timestamp) -> Duration {
        self.now().wrapping_sub(since)
    }

    /// Ticks observed by the interrupt but not merged yet
    pub fn ticks_pending(&self) -> u16 {
        self.pending.get()
    }

    #[inline]
    fn merge(&self) {
        let ticks = self.pending.take();
        if ticks != 0 {
            self.millis.add(ticks);
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapping 16-bit counter with atomic add and take.
#[cfg(target_has_atomic = "16")]
struct Counter(core::sync::atomic::AtomicU16);

#[cfg(target_has_atomic = "16")]
impl Counter {
    const fn new() -> Self {
        Self(core::sync::atomic::AtomicU16::new(0))
    }

    #[inline]
    fn add(&self, n: u16) {
        self.0.fetch_add(n, Ordering::AcqRel);
    }

    #[inline]
    fn take(&self) -> u16 {
        self.0.swap(0, Ordering::AcqRel)
    }

    #[inline]
    fn get(&self) -> u16 {
        self.0.load(Ordering::Acquire)
    }

    #[cfg(test)]
    fn set(&self, value: u16) {
        self.0.store(value, Ordering::Release);
    }
}

// AVR has no read-modify-write atomics wider than a byte.
#[cfg(not(target_has_atomic = "16"))]
struct Counter(critical_section::Mutex<core::cell::Cell<u16>>);

#[cfg(not(target_has_atomic = "16"))]
impl Counter {
    const fn new() -> Self {
        Self(critical_section::Mutex::new(core::cell::Cell::new(0)))
    }

    #[inline]
    fn add(&self, n: u16) {
        critical_section::with(|cs| {
            let cell = self.0.borrow(cs);
            cell.set(cell.get().wrapping_add(n));
        });
    }

    #[inline]
    fn take(&self) -> u16 {
        critical_section::with(|cs| self.0.borrow(cs).replace(0))
    }

    #[inline]
    fn get(&self) -> u16 {
        critical_section::with(|cs| self.0.borrow(cs).get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let clock = Clock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.ticks_pending(), 0);
    }

    #[test]
    fn tick_merges_when_idle() {
        let clock = Clock::new();
        for _ in 0..5 {
            clock.tick();
        }
        assert_eq!(clock.ticks_pending(), 0);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn tick_during_read_is_deferred_not_lost() {
        let clock = Clock::new();
        clock.tick();

        // Interrupt lands while a foreground read holds the flag.
        clock.busy.store(true, Ordering::Release);
        clock.tick();
        clock.tick();
        assert_eq!(clock.ticks_pending(), 2);
        clock.busy.store(false, Ordering::Release);

        assert_eq!(clock.now(), 3);
        assert_eq!(clock.ticks_pending(), 0);
    }

    #[test]
    fn deferred_ticks_merge_on_next_tick() {
        let clock = Clock::new();
        clock.busy.store(true, Ordering::Release);
        clock.tick();
        clock.busy.store(false, Ordering::Release);
        clock.tick();
        assert_eq!(clock.ticks_pending(), 0);
        assert_eq!(clock.millis.get(), 2);
    }

    #[test]
    fn elapsed_wraps() {
        let clock = Clock::new();
        clock.millis.set(5);
        assert_eq!(clock.elapsed(Timestamp::MAX - 4), 10);
    }

    #[test]
    fn counter_wraps_at_width() {
        let clock = Clock::new();
        clock.millis.set(u16::MAX);
        clock.tick();
        assert_eq!(clock.now(), 0);
    }
}
