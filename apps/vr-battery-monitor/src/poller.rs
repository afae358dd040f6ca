use std::thread;

use crate::config::Settings;
use crate::devices::{self, DeviceRegistry};
use crate::logger::Logger;
use crate::sink::MetricsSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Pushed { devices: usize },
    /// No device produced a reading, so nothing was sent.
    Skipped,
    Failed { reason: String },
}

/// Collect, encode, push, sleep. Runs on the calling thread.
pub struct Poller<R, S> {
    registry: R,
    sink: S,
    settings: Settings,
}

impl<R, S> Poller<R, S>
where
    R: DeviceRegistry,
    S: MetricsSink,
{
    pub fn new(registry: R, sink: S, settings: Settings) -> Self {
        Self {
            registry,
            sink,
            settings,
        }
    }

    pub fn run_cycle(&self, logger: &mut Logger) -> CycleOutcome {
        let batch = devices::collect(&self.registry, &self.settings.measurement, logger);
        if batch.is_empty() {
            return CycleOutcome::Skipped;
        }
        let payload = batch.encode();
        if payload.is_empty() {
            return CycleOutcome::Skipped;
        }

        match self.sink.push(&payload) {
            Ok(()) => CycleOutcome::Pushed {
                devices: batch.readings.len(),
            },
            Err(err) => {
                let reason = err.to_string();
                logger.log(&reason);
                CycleOutcome::Failed { reason }
            }
        }
    }

    /// Never returns. Per-cycle failures are logged by `run_cycle` and the
    /// loop carries on after the configured interval.
    pub fn run(&self, logger: &mut Logger) -> ! {
        let interval = self.settings.interval();
        loop {
            let outcome = self.run_cycle(logger);
            tracing::debug!(?outcome, "poll cycle finished");
            thread::sleep(interval);
        }
    }

    #[cfg(test)]
    fn into_parts(self) -> (R, S, Settings) {
        (self.registry, self.sink, self.settings)
    }
}
