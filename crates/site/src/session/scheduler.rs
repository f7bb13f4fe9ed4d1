//! Expiry deadline and countdown tick scheduling.
//!
//! A scheduler owns exactly one deadline and one recurring one-second tick.
//! Arming always replaces whatever was armed before, so a stale deadline can
//! never fire after a new session window has been set.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use super::clock::{Clock, ManualClock};

/// Countdown refresh period.
pub const TICK_PERIOD: TimeDelta = TimeDelta::seconds(1);

/// What a scheduler reports when polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The countdown should be refreshed.
    Tick,
    /// The armed deadline has passed. The scheduler disarms itself.
    Deadline,
}

/// Owner of one deadline handle and one interval handle.
pub trait Scheduler: Send {
    /// Cancel anything armed, then arm a deadline and start ticking.
    fn arm(&mut self, deadline: DateTime<Utc>);

    /// Cancel the deadline and the tick.
    fn cancel(&mut self);

    fn is_armed(&self) -> bool;

    /// The armed deadline, if any.
    fn deadline(&self) -> Option<DateTime<Utc>>;

    /// Wait for (or, for manual schedulers, check) the next event.
    ///
    /// Returns `None` when nothing is armed, or for manual schedulers when
    /// nothing is due yet. The deadline wins over a tick that is due at the
    /// same time.
    fn next_event(&mut self) -> impl Future<Output = Option<TimerEvent>> + Send;
}

// =============================================================================
// Tokio
// =============================================================================

/// Real-time scheduler backed by the tokio timer wheel.
///
/// Missed ticks are skipped rather than bursted.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    armed: Option<Armed>,
}

#[derive(Debug)]
struct Armed {
    deadline: DateTime<Utc>,
    at: Instant,
    interval: Interval,
}

impl TokioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for TokioScheduler {
    fn arm(&mut self, deadline: DateTime<Utc>) {
        self.cancel();

        let remaining = (deadline - Utc::now()).to_std().unwrap_or_default();
        let period = TICK_PERIOD.to_std().unwrap_or_default();
        let now = Instant::now();
        let mut interval = tokio::time::interval_at(now + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.armed = Some(Armed {
            deadline,
            at: now + remaining,
            interval,
        });
    }

    fn cancel(&mut self) {
        self.armed = None;
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.armed.as_ref().map(|armed| armed.deadline)
    }

    async fn next_event(&mut self) -> Option<TimerEvent> {
        let armed = self.armed.as_mut()?;

        let event = tokio::select! {
            biased;
            () = tokio::time::sleep_until(armed.at) => TimerEvent::Deadline,
            _ = armed.interval.tick() => TimerEvent::Tick,
        };

        if event == TimerEvent::Deadline {
            self.cancel();
        }
        Some(event)
    }
}

// =============================================================================
// Manual
// =============================================================================

/// Scheduler driven by a [`ManualClock`].
///
/// Polling never blocks: it reports what is due at the clock's current
/// instant. Ticks missed while the clock jumped are coalesced into one.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    deadline: Option<DateTime<Utc>>,
    next_tick: Option<DateTime<Utc>>,
}

impl ManualScheduler {
    #[must_use]
    pub const fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            deadline: None,
            next_tick: None,
        }
    }
}

impl Scheduler for ManualScheduler {
    fn arm(&mut self, deadline: DateTime<Utc>) {
        self.cancel();
        self.deadline = Some(deadline);
        self.next_tick = Some(self.clock.now() + TICK_PERIOD);
    }

    fn cancel(&mut self) {
        self.deadline = None;
        self.next_tick = None;
    }

    fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    async fn next_event(&mut self) -> Option<TimerEvent> {
        let now = self.clock.now();

        if self.deadline.is_some_and(|deadline| deadline <= now) {
            self.cancel();
            return Some(TimerEvent::Deadline);
        }

        let next_tick = self.next_tick?;
        if next_tick > now {
            return None;
        }

        let mut following = next_tick + TICK_PERIOD;
        while following <= now {
            following += TICK_PERIOD;
        }
        self.next_tick = Some(following);
        Some(TimerEvent::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    #[tokio::test]
    async fn test_manual_scheduler_tick_then_deadline() {
        let clock = ManualClock::new(start());
        let mut scheduler = ManualScheduler::new(clock.clone());
        scheduler.arm(start() + TimeDelta::seconds(3));

        assert_eq!(scheduler.next_event().await, None);

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(scheduler.next_event().await, Some(TimerEvent::Tick));
        assert_eq!(scheduler.next_event().await, None);

        clock.advance(TimeDelta::seconds(2));
        assert_eq!(scheduler.next_event().await, Some(TimerEvent::Deadline));
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.next_event().await, None);
    }

    #[tokio::test]
    async fn test_manual_scheduler_coalesces_missed_ticks() {
        let clock = ManualClock::new(start());
        let mut scheduler = ManualScheduler::new(clock.clone());
        scheduler.arm(start() + TimeDelta::hours(1));

        clock.advance(TimeDelta::seconds(10));
        assert_eq!(scheduler.next_event().await, Some(TimerEvent::Tick));
        assert_eq!(scheduler.next_event().await, None);
    }

    #[tokio::test]
    async fn test_manual_scheduler_rearm_replaces_deadline() {
        let clock = ManualClock::new(start());
        let mut scheduler = ManualScheduler::new(clock.clone());
        scheduler.arm(start() + TimeDelta::seconds(5));
        scheduler.arm(start() + TimeDelta::seconds(50));

        clock.advance(TimeDelta::seconds(6));
        assert_eq!(scheduler.next_event().await, Some(TimerEvent::Tick));
        assert_eq!(scheduler.deadline(), Some(start() + TimeDelta::seconds(50)));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_unarmed_returns_none() {
        let mut scheduler = TokioScheduler::new();
        assert_eq!(scheduler.next_event().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_past_deadline_fires_first() {
        let mut scheduler = TokioScheduler::new();
        scheduler.arm(Utc::now() - TimeDelta::seconds(1));
        assert_eq!(scheduler.next_event().await, Some(TimerEvent::Deadline));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_ticks_before_deadline() {
        let mut scheduler = TokioScheduler::new();
        scheduler.arm(Utc::now() + TimeDelta::minutes(10));
        assert_eq!(scheduler.next_event().await, Some(TimerEvent::Tick));
        assert!(scheduler.is_armed());
    }
}
