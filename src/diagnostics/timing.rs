//! Wall-clock timings of the pipeline stages of one cycle.
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: String,
    pub ms: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    /// Stages in execution order; skipped stages are absent.
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn stage_ms(&self, stage: &str) -> Option<f64> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| s.ms)
    }
}

/// Lap timer: each [`lap`](Self::lap) records the time since the previous one.
pub struct CycleTimer {
    start: Instant,
    last: Instant,
    stages: Vec<StageTiming>,
}

impl CycleTimer {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            stages: Vec::with_capacity(3),
        }
    }

    pub fn lap(&mut self, stage: &str) {
        let now = Instant::now();
        self.stages.push(StageTiming {
            stage: stage.to_owned(),
            ms: millis(now - self.last),
        });
        self.last = now;
    }

    pub fn finish(self) -> TimingBreakdown {
        TimingBreakdown {
            total_ms: millis(self.start.elapsed()),
            stages: self.stages,
        }
    }
}

#[inline]
fn millis(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
