use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Fixed-interval rate limiter: admits at most one frame per period.
///
/// The first call returns immediately. If an iteration overruns, the next
/// wait returns right away and the schedule restarts from that point, so
/// throughput drops below target instead of bursting to catch up.
pub struct Pacer {
    interval: Interval,
    period: Duration,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_nanos(1));
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    pub async fn wait(&mut self) {
        self.interval.tick().await;
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn first_wait_is_immediate() {
        let mut pacer = Pacer::new(Duration::from_secs(5));
        let start = Instant::now();
        pacer.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn waits_at_least_one_period_between_frames() {
        let mut pacer = Pacer::new(Duration::from_millis(20));
        let start = Instant::now();
        for _ in 0..4 {
            pacer.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn zero_period_is_clamped() {
        let mut pacer = Pacer::new(Duration::ZERO);
        assert!(pacer.period() > Duration::ZERO);
        pacer.wait().await;
    }
}
