//! Silence-triggered flush timer.
//!
//! A restartable one-shot timer: `schedule` arms it (replacing any armed
//! timer), `cancel` disarms it. When an armed timer survives its grace period
//! the flush callback runs exactly once.
//!
//! Each arming gets a generation number and a cancel channel. Replacing or
//! cancelling drops the channel's sender, which wakes the timer thread
//! immediately. A thread that does time out still has to prove, under the
//! state lock, that its generation is the armed one before it may fire.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Timer state machine.
#[derive(Debug)]
enum TimerState {
    Idle,
    Armed {
        generation: u64,
        /// Dropping this sender cancels the timer thread.
        _cancel: Sender<()>,
    },
}

#[derive(Debug)]
struct SchedulerState {
    timer: TimerState,
    generation: u64,
    fired: u64,
}

struct Shared {
    state: Mutex<SchedulerState>,
    on_fire: Box<dyn Fn() + Send + Sync>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fires if `generation` is still the armed timer.
    ///
    /// The callback runs with the state lock held so a concurrent `schedule`
    /// or `cancel` either happens entirely before (and this call is a no-op)
    /// or entirely after the flush.
    fn fire(&self, generation: u64) {
        let mut state = self.lock();
        let current = matches!(
            state.timer,
            TimerState::Armed { generation: armed, .. } if armed == generation
        );
        if !current {
            return;
        }
        state.timer = TimerState::Idle;
        state.fired += 1;
        tracing::debug!(generation, "silence grace period elapsed, flushing");
        (self.on_fire)();
    }
}

/// Restartable one-shot timer that runs a flush callback after silence.
pub struct FlushScheduler {
    shared: Arc<Shared>,
}

impl FlushScheduler {
    /// Creates an idle scheduler that calls `on_fire` when a timer elapses.
    pub fn new(on_fire: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    timer: TimerState::Idle,
                    generation: 0,
                    fired: 0,
                }),
                on_fire: Box::new(on_fire),
            }),
        }
    }

    /// Arms a new timer for `grace`, atomically replacing any armed one.
    pub fn schedule(&self, grace: Duration) {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);

        let generation = {
            let mut state = self.shared.lock();
            state.generation += 1;
            let generation = state.generation;
            // Replacing the state drops the previous sender, cancelling its thread.
            state.timer = TimerState::Armed {
                generation,
                _cancel: cancel_tx,
            };
            generation
        };

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("voxlate-flush".to_string())
            .spawn(move || wait_then_fire(&shared, generation, grace, cancel_rx));

        if let Err(e) = spawned {
            tracing::warn!("failed to spawn flush timer thread: {e}");
            let mut state = self.shared.lock();
            if matches!(state.timer, TimerState::Armed { generation: armed, .. } if armed == generation)
            {
                state.timer = TimerState::Idle;
            }
        }
    }

    /// Cancels the armed timer, if any.
    ///
    /// Returns true if a timer was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.lock();
        let was_armed = matches!(state.timer, TimerState::Armed { .. });
        state.timer = TimerState::Idle;
        was_armed
    }

    /// Returns true while a timer is armed.
    pub fn is_armed(&self) -> bool {
        matches!(self.shared.lock().timer, TimerState::Armed { .. })
    }

    /// Number of times a timer has fired.
    pub fn fired(&self) -> u64 {
        self.shared.lock().fired
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn wait_then_fire(shared: &Shared, generation: u64, grace: Duration, cancel_rx: Receiver<()>) {
    match cancel_rx.recv_timeout(grace) {
        Err(RecvTimeoutError::Timeout) => shared.fire(generation),
        // Sender dropped (replaced or cancelled)
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn counting_scheduler() -> (FlushScheduler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let scheduler = FlushScheduler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (scheduler, count)
    }

    #[test]
    fn test_fires_once_after_grace() {
        let (scheduler, count) = counting_scheduler();

        scheduler.schedule(Duration::from_millis(40));
        assert!(scheduler.is_armed());
        thread::sleep(Duration::from_millis(200));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.fired(), 1);
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let (scheduler, count) = counting_scheduler();

        scheduler.schedule(Duration::from_millis(50));
        assert!(scheduler.cancel());
        thread::sleep(Duration::from_millis(150));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_armed());
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let (scheduler, count) = counting_scheduler();

        assert!(!scheduler.cancel());
        assert!(!scheduler.cancel());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reschedule_debounces_to_single_flush_from_second_call() {
        let fired_at = Arc::new(Mutex::new(Vec::<Instant>::new()));
        let sink = Arc::clone(&fired_at);
        let scheduler = FlushScheduler::new(move || {
            if let Ok(mut times) = sink.lock() {
                times.push(Instant::now());
            }
        });

        let grace = Duration::from_millis(150);
        scheduler.schedule(grace);
        thread::sleep(Duration::from_millis(75));
        let second_call = Instant::now();
        scheduler.schedule(grace);

        // The first timer would have fired by now
        thread::sleep(Duration::from_millis(110));
        assert!(fired_at.lock().unwrap().is_empty());

        thread::sleep(Duration::from_millis(300));
        let times = fired_at.lock().unwrap();
        assert_eq!(times.len(), 1);
        assert!(times[0].duration_since(second_call) >= grace);
        assert_eq!(scheduler.fired(), 1);
    }

    #[test]
    fn test_rapid_rescheduling_fires_once() {
        let (scheduler, count) = counting_scheduler();

        for _ in 0..20 {
            scheduler.schedule(Duration::from_millis(60));
            thread::sleep(Duration::from_millis(2));
        }
        thread::sleep(Duration::from_millis(300));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_can_rearm_after_firing() {
        let (scheduler, count) = counting_scheduler();

        scheduler.schedule(Duration::from_millis(20));
        thread::sleep(Duration::from_millis(120));
        scheduler.schedule(Duration::from_millis(20));
        thread::sleep(Duration::from_millis(120));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let (scheduler, count) = counting_scheduler();

        scheduler.schedule(Duration::from_millis(40));
        drop(scheduler);
        thread::sleep(Duration::from_millis(150));

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
