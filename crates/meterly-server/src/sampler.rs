//! Background sampler: keeps one gauge moving independently of traffic.
//!
//! The loop runs until its shutdown channel flips to `true` (or the sender is
//! dropped). A failed sample is logged and the previous gauge value stays.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};

use meterly_core::error::{MeterlyError, Result};
use meterly_core::Gauge;

/// Produces the next gauge value.
pub trait SampleSource: Send + 'static {
    fn sample(&mut self) -> Result<f64>;
}

/// Uniform integer draw from `[min, max)`.
pub struct UniformSource {
    rng: StdRng,
    range: Range<u64>,
}

impl UniformSource {
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min >= max {
            return Err(MeterlyError::BadConfig(format!(
                "sampler range is empty: [{min}, {max})"
            )));
        }
        Ok(Self {
            rng: StdRng::from_entropy(),
            range: min..max,
        })
    }
}

impl SampleSource for UniformSource {
    fn sample(&mut self) -> Result<f64> {
        Ok(self.rng.gen_range(self.range.clone()) as f64)
    }
}

pub struct Sampler<S> {
    gauge: Gauge,
    source: S,
    interval: Duration,
}

impl<S: SampleSource> Sampler<S> {
    pub fn new(gauge: Gauge, source: S, interval: Duration) -> Self {
        Self {
            gauge,
            source,
            interval,
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "sampler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("sampler stopped");
    }

    fn tick(&mut self) {
        match self.source.sample() {
            Ok(v) => self.gauge.set(v),
            Err(e) => tracing::warn!(error = %e, "sample failed; gauge keeps previous value"),
        }
    }
}
