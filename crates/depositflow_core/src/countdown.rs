use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Remaining(u64),
    Expired,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownState {
    Running,
    Expired,
    Stopped,
}

/// Session clock. Remaining time is always derived from the absolute elapsed
/// time since `started_at`, so late or skipped ticks never skew it.
#[derive(Debug, Clone)]
pub struct Countdown {
    started_at: Instant,
    max: Duration,
    state: CountdownState,
}

impl Countdown {
    pub fn start(max: Duration, now: Instant) -> Self {
        Self {
            started_at: now,
            max,
            state: CountdownState::Running,
        }
    }

    /// Whole seconds left, rounded up so zero is only reported once the full
    /// duration has elapsed.
    pub fn remaining_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started_at);
        let left = self.max.saturating_sub(elapsed);
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }

    pub fn tick(&mut self, now: Instant) -> CountdownTick {
        if self.state != CountdownState::Running {
            return CountdownTick::Stopped;
        }

        match self.remaining_at(now) {
            0 => {
                self.state = CountdownState::Expired;
                CountdownTick::Expired
            }
            remaining => CountdownTick::Remaining(remaining),
        }
    }

    pub fn stop(&mut self) {
        if self.state == CountdownState::Running {
            self.state = CountdownState::Stopped;
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == CountdownState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::{Countdown, CountdownTick};
    use std::time::Duration;
    use tokio::time::Instant;

    #[test]
    fn remaining_is_non_increasing_and_never_negative() {
        let start = Instant::now();
        let countdown = Countdown::start(Duration::from_secs(180), start);

        let mut previous = u64::MAX;
        for millis in (0..=200_000u64).step_by(250) {
            let remaining = countdown.remaining_at(start + Duration::from_millis(millis));
            assert!(remaining <= previous);
            assert!(remaining <= 180);
            if millis >= 180_000 {
                assert_eq!(remaining, 0);
            } else {
                assert!(remaining > 0);
            }
            previous = remaining;
        }
    }

    #[test]
    fn recomputes_from_elapsed_time_after_a_stall() {
        let start = Instant::now();
        let mut countdown = Countdown::start(Duration::from_secs(180), start);

        assert_eq!(countdown.tick(start), CountdownTick::Remaining(180));
        assert_eq!(
            countdown.tick(start + Duration::from_secs(95)),
            CountdownTick::Remaining(85)
        );
    }

    #[test]
    fn expires_exactly_once() {
        let start = Instant::now();
        let mut countdown = Countdown::start(Duration::from_secs(3), start);

        assert_eq!(
            countdown.tick(start + Duration::from_secs(3)),
            CountdownTick::Expired
        );
        assert!(!countdown.is_running());
        assert_eq!(
            countdown.tick(start + Duration::from_secs(4)),
            CountdownTick::Stopped
        );
    }

    #[test]
    fn stopped_countdown_stays_silent() {
        let start = Instant::now();
        let mut countdown = Countdown::start(Duration::from_secs(3), start);
        countdown.stop();

        assert_eq!(
            countdown.tick(start + Duration::from_secs(10)),
            CountdownTick::Stopped
        );
    }
}
