//! Clock accounting under interleaved ticks and reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use atmega128_tickos::rtos::{Clock, Timestamp};

#[test]
fn concurrent_ticks_are_never_lost() {
    const TICKS: u16 = 50_000;
    let clock = Clock::new();
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..TICKS {
                clock.tick();
            }
            done.store(true, Ordering::Release);
        });

        // Foreground reads race the "interrupt" and must never go backwards.
        let mut last: Timestamp = 0;
        while !done.load(Ordering::Acquire) {
            let now = clock.now();
            assert!(now >= last, "clock went back from {} to {}", last, now);
            last = now;
        }
    });

    assert_eq!(clock.now(), TICKS);
    assert_eq!(clock.ticks_pending(), 0);
}

#[test]
fn static_clock_is_usable() {
    static CLOCK: Clock = Clock::new();
    let start = CLOCK.now();
    CLOCK.tick();
    CLOCK.tick();
    assert_eq!(CLOCK.elapsed(start), 2);
}

proptest::proptest! {
    /// Any interleaving of ticks and reads reports exactly the ticks seen.
    #[test]
    fn reads_count_every_tick(ops in proptest::collection::vec(proptest::bool::ANY, 0..2_000)) {
        let clock = Clock::new();
        let mut ticks: u16 = 0;
        for tick in ops {
            if tick {
                clock.tick();
                ticks = ticks.wrapping_add(1);
            } else {
                assert_eq!(clock.now(), ticks);
            }
        }
        assert_eq!(clock.now(), ticks);
    }

    /// `elapsed` is wrapping subtraction from the current reading.
    #[test]
    fn elapsed_matches_wrapping_sub(start in 0u16..=u16::MAX, extra in 0u16..5_000) {
        let clock = Clock::new();
        for _ in 0..extra {
            clock.tick();
        }
        assert_eq!(clock.elapsed(start), extra.wrapping_sub(start));
    }
}
