//! Ephemeris data sources feeding the writer.
//!
//! The writer never talks to an ephemeris service directly; it samples an
//! [`EphemerisDataSource`], which exposes a covered range, the timestamps it
//! actually holds, and a value function that may interpolate internally. Any
//! backing store (remote API, cache, archive) plugs in behind this trait.

use hifitime::Epoch;

use crate::weft_errors::WeftError;

pub trait EphemerisDataSource {
    /// First covered instant.
    fn start(&self) -> Epoch;

    /// Last covered instant.
    fn end(&self) -> Epoch;

    /// The timestamps backing this source, finite and ascending. Coverage
    /// analysis is computed from these.
    fn timestamps(&self) -> &[Epoch];

    /// The quantity's value at `t`, which must lie in `[start, end]`.
    ///
    /// Sources may interpolate between their own samples; for wrapping
    /// quantities any consistent representative is acceptable, as the writer
    /// unwraps before fitting.
    fn value_at(&self, t: Epoch) -> Result<f64, WeftError>;
}

/// A data source over pre-fetched `(timestamp, value)` samples.
///
/// Values between samples are linearly interpolated; queries before the
/// first or after the last sample (but inside the declared range) clamp to
/// the nearest sample value.
#[derive(Debug, Clone)]
pub struct SampledDataSource {
    timestamps: Vec<Epoch>,
    values: Vec<f64>,
}

impl SampledDataSource {
    /// Build a source from ascending samples.
    pub fn new(samples: Vec<(Epoch, f64)>) -> Result<Self, WeftError> {
        if samples.is_empty() {
            return Err(WeftError::EmptyDataSource);
        }
        let (timestamps, values) = samples.into_iter().unzip();
        Ok(SampledDataSource { timestamps, values })
    }
}

impl EphemerisDataSource for SampledDataSource {
    fn start(&self) -> Epoch {
        self.timestamps[0]
    }

    fn end(&self) -> Epoch {
        self.timestamps[self.timestamps.len() - 1]
    }

    fn timestamps(&self) -> &[Epoch] {
        &self.timestamps
    }

    fn value_at(&self, t: Epoch) -> Result<f64, WeftError> {
        if t < self.start() || t > self.end() {
            return Err(WeftError::OutOfRange(t));
        }

        let index = self.timestamps.partition_point(|&ts| ts <= t);
        if index == 0 {
            return Ok(self.values[0]);
        }
        if index == self.timestamps.len() {
            return Ok(self.values[index - 1]);
        }

        let t0 = self.timestamps[index - 1];
        let t1 = self.timestamps[index];
        let v0 = self.values[index - 1];
        let v1 = self.values[index];

        let span = (t1 - t0).to_seconds();
        let fraction = (t - t0).to_seconds() / span;
        Ok(v0 + (v1 - v0) * fraction)
    }
}
