//! Recurring wall timer.
//!
//! Each timer owns a dedicated thread that fires the callback every period.
//! A callback that overruns its slot does not accumulate a backlog: the next
//! fire time skips past every missed slot.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;
use zenoh::Result;

struct TimerShared {
    cancelled: Mutex<bool>,
    cv: Condvar,
}

pub struct Timer {
    period: Duration,
    shared: Arc<TimerShared>,
    handle: Option<JoinHandle<()>>,
}

impl Timer {
    pub(crate) fn spawn<F>(name: &str, period: Duration, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err("Timer period must be non-zero".into());
        }

        let shared = Arc::new(TimerShared {
            cancelled: Mutex::new(false),
            cv: Condvar::new(),
        });

        let handle = {
            let shared = shared.clone();
            std::thread::Builder::new()
                .name(format!("timer-{name}"))
                .spawn(move || run_loop(period, shared, callback))?
        };

        debug!("[TIM] Timer started: period={:?}", period);

        Ok(Self {
            period,
            shared,
            handle: Some(handle),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. The callback will not fire again once this returns.
    pub fn cancel(&mut self) {
        {
            let mut cancelled = self.shared.cancelled.lock();
            *cancelled = true;
            self.shared.cv.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("[TIM] Timer cancelled: period={:?}", self.period);
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_loop<F>(period: Duration, shared: Arc<TimerShared>, mut callback: F)
where
    F: FnMut(),
{
    let mut next = Instant::now() + period;
    loop {
        {
            let mut cancelled = shared.cancelled.lock();
            loop {
                if *cancelled {
                    return;
                }
                if Instant::now() >= next {
                    break;
                }
                shared.cv.wait_until(&mut cancelled, next);
            }
        }
        callback();
        next = next_fire(next, period, Instant::now());
    }
}

/// Advance `next` by one period, skipping past slots already missed.
fn next_fire(next: Instant, period: Duration, now: Instant) -> Instant {
    let mut next = next + period;
    if let Some(behind) = now.checked_duration_since(next) {
        let skipped = behind.as_nanos() / period.as_nanos() + 1;
        next += period * skipped as u32;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn next_fire_on_schedule() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let next = start + period;
        // Callback finished well before the next slot
        assert_eq!(
            next_fire(next, period, start + Duration::from_millis(150)),
            next + period
        );
    }

    #[test]
    fn next_fire_skips_missed_slots() {
        let start = Instant::now();
        let period = Duration::from_millis(100);
        let next = start + period;
        // Callback overran by 3.5 periods; fire time lands in the future
        let now = start + Duration::from_millis(460);
        let fire = next_fire(next, period, now);
        assert!(fire > now);
        assert_eq!(fire, start + Duration::from_millis(500));
    }

    #[test]
    fn zero_period_rejected() {
        assert!(Timer::spawn("t", Duration::ZERO, || {}).is_err());
    }

    #[test]
    fn fires_and_cancels() {
        let count = Arc::new(AtomicU32::new(0));
        let mut timer = {
            let count = count.clone();
            Timer::spawn("t", Duration::from_millis(10), move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };

        std::thread::sleep(Duration::from_millis(100));
        timer.cancel();
        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 2, "expected at least 2 fires, got {fired}");

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), fired);
    }
}
