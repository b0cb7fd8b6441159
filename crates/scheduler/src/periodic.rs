//! Repeating timers
//!
//! A [`PeriodicTask`] invokes a callback every `period`, the first call one
//! full period after it is armed. The callback runs on the timer's own task
//! and should hand long work off (spawn) so that a slow tick never delays the
//! next one. Every timer owns a [`CancellationToken`] and can be stopped on
//! its own; [`TimerSet`] groups timers so they can be stopped together.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::cancel::{CancellationRegistry, CancellationToken};

/// Identifier of a timer inside a [`TimerSet`].
pub type TimerId = u64;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A repeating timer running on the current tokio runtime.
///
/// Dropping the task stops it.
pub struct PeriodicTask {
    name: String,
    period: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Arm a timer calling `tick` every `period`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(name: impl Into<String>, period: Duration, tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::spawn_with_token(name, period, CancellationToken::new(), tick)
    }

    /// Arm a timer that stops when `token` is cancelled.
    pub fn spawn_with_token<F>(
        name: impl Into<String>,
        period: Duration,
        token: CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let period = if period < MIN_PERIOD {
            tracing::warn!(timer = %name, ?period, "timer period too small, clamping");
            MIN_PERIOD
        } else {
            period
        };

        let task_token = token.clone();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        tracing::trace!(timer = %task_name, "tick");
                        tick();
                    }
                }
            }

            tracing::debug!(timer = %task_name, "timer stopped");
        });

        Self {
            name,
            period,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. No tick starts after this returns.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the underlying task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A collection of independently cancelable timers.
///
/// # Example
///
/// ```no_run
/// use kiosk_scheduler::TimerSet;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let timers = TimerSet::new();
/// let id = timers.every("reload", Duration::from_secs(60), || println!("reload"));
/// timers.stop(id);
/// timers.stop_all();
/// # }
/// ```
#[derive(Default)]
pub struct TimerSet {
    registry: CancellationRegistry,
    tasks: Mutex<Vec<(TimerId, PeriodicTask)>>,
    next_id: AtomicU64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a new repeating timer and return its id.
    pub fn every<F>(&self, name: impl Into<String>, period: Duration, tick: F) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.registry.register(id);
        let task = PeriodicTask::spawn_with_token(name, period, token, tick);
        tracing::debug!(timer = %task.name(), id, period = ?task.period(), "timer armed");
        self.tasks.lock().push((id, task));
        id
    }

    /// Stop one timer. Returns `false` if the id is unknown or already stopped.
    pub fn stop(&self, id: TimerId) -> bool {
        let stopped = self.registry.cancel(id);
        self.tasks.lock().retain(|(task_id, _)| *task_id != id);
        stopped
    }

    /// Stop every timer in the set, returning how many were running.
    pub fn stop_all(&self) -> usize {
        let stopped = self.registry.cancel_all();
        self.tasks.lock().clear();
        stopped
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.registry.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let tick_count = count.clone();
        (count, move || {
            tick_count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_a_full_period() {
        let (count, tick) = counter();
        let _task = PeriodicTask::spawn("test", Duration::from_secs(15), tick);

        time::sleep(Duration::from_secs(14)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_repeat_every_period() {
        let (count, tick) = counter();
        let _task = PeriodicTask::spawn("test", Duration::from_secs(15), tick);

        time::sleep(Duration::from_secs(46)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_task_never_ticks_again() {
        let (count, tick) = counter();
        let task = PeriodicTask::spawn("test", Duration::from_secs(10), tick);

        time::sleep(Duration::from_secs(11)).await;
        task.stop();
        time::sleep(Duration::from_secs(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(task.is_stopped());
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_set_stops_one_timer_independently() {
        let timers = TimerSet::new();
        let (fast, fast_tick) = counter();
        let (slow, slow_tick) = counter();

        let fast_id = timers.every("fast", Duration::from_secs(5), fast_tick);
        timers.every("slow", Duration::from_secs(10), slow_tick);
        assert_eq!(timers.len(), 2);

        time::sleep(Duration::from_secs(11)).await;
        assert!(timers.stop(fast_id));
        assert!(!timers.stop(fast_id));
        time::sleep(Duration::from_secs(20)).await;

        assert_eq!(fast.load(Ordering::SeqCst), 2);
        assert_eq!(slow.load(Ordering::SeqCst), 3);
        assert_eq!(timers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_set_stop_all() {
        let timers = TimerSet::new();
        let (count, tick) = counter();
        timers.every("a", Duration::from_secs(1), tick);
        let (other, other_tick) = counter();
        timers.every("b", Duration::from_secs(1), other_tick);

        assert_eq!(timers.stop_all(), 2);
        assert!(timers.is_empty());

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(other.load(Ordering::SeqCst), 0);
    }
}
