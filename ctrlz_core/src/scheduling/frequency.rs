//! Loop period drift diagnostic
//!
//! Tracks an exponentially weighted moving average of the wall-clock time
//! between `spin_once()` calls and reports when it leaves the ±40 % band
//! around the nominal `dt`.

use std::time::Instant;

const NEW_SAMPLE_WEIGHT: f64 = 0.001;
const TOLERANCE: f64 = 0.4;

/// Result of feeding one period sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Drift {
    InBand,
    /// Estimate just left the band
    Left(f64),
    /// Estimate just came back
    Recovered(f64),
    /// Still outside, already reported
    StillOut,
}

pub(crate) struct FrequencyMonitor {
    nominal: f64,
    estimate: f64,
    last: Option<Instant>,
    out_of_band: bool,
}

impl FrequencyMonitor {
    pub fn new(nominal: f64) -> Self {
        Self {
            nominal,
            estimate: nominal,
            last: None,
            out_of_band: false,
        }
    }

    /// Feed the current instant. The first call only records it.
    pub fn sample(&mut self, now: Instant) -> Drift {
        let drift = match self.last {
            Some(last) => self.observe(now.duration_since(last).as_secs_f64()),
            None => Drift::InBand,
        };
        self.last = Some(now);
        drift
    }

    pub fn observe(&mut self, period: f64) -> Drift {
        self.estimate = self.estimate * (1.0 - NEW_SAMPLE_WEIGHT) + period * NEW_SAMPLE_WEIGHT;

        let outside = self.estimate > self.nominal * (1.0 + TOLERANCE)
            || self.estimate < self.nominal * (1.0 - TOLERANCE);

        match (outside, self.out_of_band) {
            (true, false) => {
                self.out_of_band = true;
                Drift::Left(self.estimate)
            }
            (true, true) => Drift::StillOut,
            (false, true) => {
                self.out_of_band = false;
                Drift::Recovered(self.estimate)
            }
            (false, false) => Drift::InBand,
        }
    }

    /// Current period estimate in seconds
    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}
