//! Injected trace sink for reader and writer decisions.
//!
//! Block selection during reads and block skipping during writes are worth
//! observing but must not drag in process-global logging state. Both the
//! [`crate::reader::WeftReader`] and the [`crate::writer::WeftWriter`] accept
//! a shared [`TraceSink`]; the default [`NullSink`] discards everything, and
//! tests use [`MemorySink`] to assert on decisions deterministically.

use std::sync::Mutex;

use hifitime::Epoch;

use crate::constants::Date;

/// One observable decision made by a reader or writer.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A multi-year block answered a read.
    MultiYearSelected { start_year: i16, duration: u16 },
    /// A monthly block answered a read.
    MonthlySelected { year: i16, month: u8 },
    /// A single forty-eight hour block answered a read.
    FortyEightHourSelected { center: Date },
    /// Two adjacent forty-eight hour blocks were blended.
    BlendApplied {
        left_center: Date,
        right_center: Date,
        left_weight: f64,
        right_weight: f64,
    },
    /// The writer dropped a candidate block below the coverage threshold.
    BlockSkipped {
        kind: &'static str,
        start: Epoch,
        coverage: f64,
        threshold: f64,
    },
    /// The writer dropped a candidate block for lack of fit samples.
    FitSkipped { kind: &'static str, start: Epoch },
    /// A parsed monthly block carries a day count outside 28..=31.
    UnusualDayCount { year: i16, month: u8, day_count: u8 },
}

pub trait TraceSink: Send + Sync {
    fn record(&self, event: TraceEvent);
}

/// Discards every event. The default sink.
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn record(&self, _event: TraceEvent) {}
}

/// Accumulates events in memory so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().expect("trace sink poisoned").clone()
    }
}

impl TraceSink for MemorySink {
    fn record(&self, event: TraceEvent) {
        self.events.lock().expect("trace sink poisoned").push(event);
    }
}
