//! Priority-based evaluation of a parsed [`WeftFile`].
//!
//! A reader resolves an instant to a value by trying block kinds from the
//! highest precision down: forty-eight hour blocks, then monthly, then
//! multi-year. Within the forty-eight hour level the two blocks adjacent to
//! an instant may both cover it (their windows overlap by 24 hours); the
//! reader then blends the two values linearly so the curve stays continuous
//! across midnights.
//!
//! Readers hold shared ownership of an immutable file, so any number of them
//! may evaluate concurrently; lazy section materialization synchronizes
//! inside the file.

use std::sync::Arc;

use hifitime::{Duration, Epoch};

use crate::blocks::{Block, FortyEightHourBlock};
use crate::calendar::date_of;
use crate::constants::SECONDS_PER_DAY;
use crate::trace::{NullSink, TraceEvent, TraceSink};
use crate::weft_errors::WeftError;
use crate::weft_file::WeftFile;

pub struct WeftReader {
    file: Arc<WeftFile>,
    sink: Arc<dyn TraceSink>,
}

impl WeftReader {
    pub fn new(file: Arc<WeftFile>) -> Self {
        Self::with_trace(file, Arc::new(NullSink))
    }

    /// A reader reporting block selections and blend weights to `sink`.
    pub fn with_trace(file: Arc<WeftFile>, sink: Arc<dyn TraceSink>) -> Self {
        WeftReader { file, sink }
    }

    pub fn file(&self) -> &WeftFile {
        &self.file
    }

    /// Earliest and latest instant any block covers.
    pub fn date_range(&self) -> Option<(Epoch, Epoch)> {
        self.file.coverage_bounds()
    }

    /// Evaluate the stored quantity at `t`.
    ///
    /// Candidates are searched in priority order (forty-eight hour, monthly,
    /// multi-year); the first kind with a covering block answers. The raw
    /// polynomial value is post-processed by the file's value behavior.
    /// Instants no block covers fail with [`WeftError::OutOfRange`]; the
    /// reader never extrapolates.
    pub fn value_at(&self, t: Epoch) -> Result<f64, WeftError> {
        if let Some(value) = self.forty_eight_hour_value(t) {
            return Ok(value);
        }

        // Coverage is half-open, so at a boundary instant the block whose
        // coverage begins there wins over the one ending there.
        for block in &self.file.blocks {
            if let Block::Monthly(monthly) = block {
                if monthly.contains(t) {
                    self.sink.record(TraceEvent::MonthlySelected {
                        year: monthly.year,
                        month: monthly.month,
                    });
                    return Ok(self.apply_behavior(monthly.evaluate(t)));
                }
            }
        }

        for block in &self.file.blocks {
            if let Block::MultiYear(multi_year) = block {
                if multi_year.contains(t) {
                    self.sink.record(TraceEvent::MultiYearSelected {
                        start_year: multi_year.start_year,
                        duration: multi_year.duration,
                    });
                    return Ok(self.apply_behavior(multi_year.evaluate(t)));
                }
            }
        }

        Err(WeftError::OutOfRange(t))
    }

    /// Evaluate over `[start, end]` at fixed steps. Each item carries its own
    /// result so a range straddling the coverage edge still yields the
    /// covered part.
    pub fn value_in_range(
        &self,
        start: Epoch,
        end: Epoch,
        step: Duration,
    ) -> impl Iterator<Item = (Epoch, Result<f64, WeftError>)> + '_ {
        let mut next = start;
        std::iter::from_fn(move || {
            if next > end {
                return None;
            }
            let current = next;
            next = current + step;
            Some((current, self.value_at(current)))
        })
    }

    /// Forty-eight hour lookup: locate sections by date containment, binary
    /// search the run for the greatest center at or before `t`, and consider
    /// that block and its neighbors. One covering block evaluates directly;
    /// two trigger the linear blend.
    fn forty_eight_hour_value(&self, t: Epoch) -> Option<f64> {
        let date = date_of(t);
        let mut covering: Vec<&FortyEightHourBlock> = Vec::new();

        for (index, section) in self.file.sections.iter().enumerate() {
            if !section.header.contains_date(date) {
                continue;
            }
            let blocks = self.file.section_blocks(index);
            let after = blocks.partition_point(|block| block.center() <= t);
            let first_candidate = after.saturating_sub(2);
            let last_candidate = (after + 1).min(blocks.len());
            for block in &blocks[first_candidate..last_candidate] {
                if block.contains(t) && !covering.iter().any(|c| c.center_date == block.center_date)
                {
                    covering.push(block);
                }
            }
        }

        covering.sort_by_key(|block| block.center_date);

        match covering.as_slice() {
            [] => None,
            [only] => {
                self.sink.record(TraceEvent::FortyEightHourSelected {
                    center: only.center_date,
                });
                Some(self.apply_behavior(only.evaluate(t)))
            }
            [left, right, ..] => Some(self.blend(left, right, t)),
        }
    }

    /// Linear blend of two adjacent forty-eight hour blocks.
    ///
    /// The overlap zone is the 24 hours centered on the midnight between the
    /// two blocks; the left weight falls linearly from 1 at the left center's
    /// day end to 0 at the right center.
    fn blend(&self, left: &FortyEightHourBlock, right: &FortyEightHourBlock, t: Epoch) -> f64 {
        let left_weight =
            ((right.center() - t).to_seconds() / SECONDS_PER_DAY).clamp(0.0, 1.0);
        let right_weight = 1.0 - left_weight;

        let left_value = left.evaluate(t);
        let mut right_value = right.evaluate(t);

        // Wrapping quantities blend on the representative of the right value
        // nearest the left one, so a 359°/1° pair blends through 360, not 180.
        if let Some((min, max)) = self.file.preamble.behavior.wrapping_range() {
            let span = max - min;
            let difference = (right_value - left_value + span / 2.0).rem_euclid(span) - span / 2.0;
            right_value = left_value + difference;
        }

        self.sink.record(TraceEvent::BlendApplied {
            left_center: left.center_date,
            right_center: right.center_date,
            left_weight,
            right_weight,
        });

        self.apply_behavior(left_weight * left_value + right_weight * right_value)
    }

    fn apply_behavior(&self, value: f64) -> f64 {
        self.file.preamble.behavior.apply(value)
    }
}
