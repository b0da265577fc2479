use hifitime::{Duration, Epoch};

use weft::calendar::day_start;
use weft::{EphemerisDataSource, SampledDataSource, WeftError};

/// An analytic data source: regular timestamps, exact values at any instant.
///
/// Writers sample between listed timestamps; backing those samples with a
/// closed-form function keeps fit inputs exact and test tolerances honest.
pub struct AnalyticSource<F: Fn(Epoch) -> f64> {
    timestamps: Vec<Epoch>,
    function: F,
}

impl<F: Fn(Epoch) -> f64> AnalyticSource<F> {
    pub fn new(start: Epoch, end: Epoch, step: Duration, function: F) -> Self {
        let mut timestamps = Vec::new();
        let mut t = start;
        while t <= end {
            timestamps.push(t);
            t = t + step;
        }
        AnalyticSource {
            timestamps,
            function,
        }
    }
}

impl<F: Fn(Epoch) -> f64> EphemerisDataSource for AnalyticSource<F> {
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
        Ok((self.function)(t))
    }
}

/// Hourly constant-valued source between two midnights, endpoints included.
#[allow(dead_code)]
pub fn hourly_constant(
    start_day: (i32, u8, u8),
    end_day: (i32, u8, u8),
    value: f64,
) -> SampledDataSource {
    let start = day_start(start_day);
    let end = day_start(end_day);
    let hours = ((end - start).to_seconds() / 3600.0) as usize;
    let samples = (0..=hours)
        .map(|i| (start + Duration::from_hours(i as f64), value))
        .collect();
    SampledDataSource::new(samples).unwrap()
}

/// Smallest angular distance between two values on a wrapping circle.
#[allow(dead_code)]
pub fn circular_distance(a: f64, b: f64, span: f64) -> f64 {
    let diff = (a - b).rem_euclid(span);
    diff.min(span - diff)
}
