use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Latency milestones of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTiming {
    /// Run start to the first raw delta of any kind.
    pub time_to_first_token: Option<Duration>,
    /// Run start to the first delta classified as final content.
    pub time_to_first_content: Option<Duration>,
}

/// Records the milestones while a run is in flight.
///
/// Marks are idempotent; the first observation wins. Instants come from the
/// tokio clock so paused-clock tests see exact values.
#[derive(Debug)]
pub struct TimingTracker {
    started_at: Instant,
    first_byte_at: Option<Instant>,
    first_content_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl TimingTracker {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
            first_byte_at: None,
            first_content_at: None,
            ended_at: None,
        }
    }

    /// Marks arrival of the first raw delta, whatever channel it lands on.
    pub fn mark_first_byte(&mut self) {
        if self.first_byte_at.is_none() {
            self.first_byte_at = Some(Instant::now());
        }
    }

    /// Marks the first delta classified as final content.
    pub fn mark_first_content(&mut self) {
        if self.first_content_at.is_none() {
            self.first_content_at = Some(Instant::now());
        }
    }

    pub fn mark_ended(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Instant::now());
        }
    }

    pub fn snapshot(&self) -> RunTiming {
        RunTiming {
            time_to_first_token: self.first_byte_at.map(|at| at - self.started_at),
            time_to_first_content: self.first_content_at.map(|at| at - self.started_at),
        }
    }

    /// Total wall time, frozen at the end mark once the run closed.
    pub fn elapsed(&self) -> Duration {
        match self.ended_at {
            Some(ended) => ended - self.started_at,
            None => self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn marks_measure_from_start() {
        let mut timing = TimingTracker::start();
        advance(Duration::from_millis(120)).await;
        timing.mark_first_byte();
        advance(Duration::from_millis(80)).await;
        timing.mark_first_content();
        timing.mark_ended();

        let snapshot = timing.snapshot();
        assert_eq!(snapshot.time_to_first_token, Some(Duration::from_millis(120)));
        assert_eq!(snapshot.time_to_first_content, Some(Duration::from_millis(200)));
        assert_eq!(timing.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn first_mark_wins() {
        let mut timing = TimingTracker::start();
        advance(Duration::from_millis(10)).await;
        timing.mark_first_byte();
        advance(Duration::from_millis(10)).await;
        timing.mark_first_byte();
        assert_eq!(
            timing.snapshot().time_to_first_token,
            Some(Duration::from_millis(10))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unmarked_milestones_stay_none() {
        let timing = TimingTracker::start();
        assert_eq!(timing.snapshot(), RunTiming::default());
    }
}
