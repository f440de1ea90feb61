use std::time::{Duration, Instant};

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    pub name: &'static str,
    pub duration: Duration,
}

/// Wall-clock durations of the stages of one composite, in execution order.
#[derive(Debug, Clone, Default)]
pub struct CompositeTimings {
    steps: Vec<StepTiming>,
}

impl CompositeTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timer: Timer) {
        self.steps.push(StepTiming {
            name: timer.name,
            duration: timer.start.elapsed(),
        });
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn log_summary(&self) {
        let total = self.total_duration().as_secs_f64();
        for step in &self.steps {
            let share = if total > 0.0 {
                step.duration.as_secs_f64() / total * 100.0
            } else {
                0.0
            };
            info!(
                step = step.name,
                "{:>12.3}ms ({:>5.1}%)",
                step.duration.as_secs_f64() * 1000.0,
                share
            );
        }
        info!("Total {:.3}ms", total * 1000.0);
    }
}

/// Started when a stage begins; handed to [`CompositeTimings::record`] when it ends.
pub struct Timer {
    start: Instant,
    name: &'static str,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }
}
