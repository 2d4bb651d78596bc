//! Wall-clock bookkeeping for the stages of a comparison run (solving, report writing, plotting).
use log::info;
use std::time::{Duration, Instant};
use tabled::{builder::Builder, settings::Style};

/// Human readable unit for a duration: returns the unit and the value expressed in it.
pub fn elapsed_time(elapsed: Duration) -> (String, f64) {
    let time = elapsed.as_millis();
    if time < 1000 {
        (" ms".to_string(), elapsed.as_secs_f64() * 1e3)
    } else if time < 60_000 {
        (" s".to_string(), elapsed.as_secs_f64())
    } else if time < 3_600_000 {
        (" min".to_string(), elapsed.as_secs_f64() / 60.0)
    } else {
        (" h".to_string(), elapsed.as_secs_f64() / 3600.0)
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let (unit, value) = elapsed_time(elapsed);
    format!("{:.3}{}", value, unit)
}

#[derive(Debug, Clone)]
pub struct StageTimer {
    start: Instant,
    current: Option<(String, Instant)>,
    stages: Vec<(String, Duration)>,
}

impl Default for StageTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTimer {
    pub fn new() -> StageTimer {
        StageTimer {
            start: Instant::now(),
            current: None,
            stages: Vec::new(),
        }
    }
    /// starts a stage, closing the previous one if it is still open
    pub fn tic(&mut self, stage: &str) {
        self.tac();
        self.current = Some((stage.to_string(), Instant::now()));
    }

    pub fn tac(&mut self) {
        if let Some((stage, begin)) = self.current.take() {
            let elapsed = begin.elapsed();
            info!("{} took {}", stage, format_elapsed(elapsed));
            match self.stages.iter().position(|(name, _)| *name == stage) {
                Some(i) => self.stages[i].1 += elapsed,
                None => self.stages.push((stage, elapsed)),
            }
        }
    }

    pub fn stage(&self, stage: &str) -> Option<Duration> {
        self.stages
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, d)| *d)
    }

    pub fn stages(&self) -> &[(String, Duration)] {
        &self.stages
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// stage, time, share of the total
    pub fn table(&self) -> String {
        let total = self.total().as_secs_f64().max(f64::MIN_POSITIVE);
        let mut builder = Builder::default();
        builder.push_record(["stage", "time", "% of total"]);
        for (stage, elapsed) in &self.stages {
            builder.push_record([
                stage.clone(),
                format_elapsed(*elapsed),
                format!("{:.1}", 100.0 * elapsed.as_secs_f64() / total),
            ]);
        }
        builder.push_record([
            "total".to_string(),
            format_elapsed(self.total()),
            "100.0".to_string(),
        ]);
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}
