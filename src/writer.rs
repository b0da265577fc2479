//! Multi-precision `.weft` file generation.
//!
//! The writer samples an [`EphemerisDataSource`] once per candidate block,
//! fits Chebyshev coefficients, and assembles a [`WeftFile`] in canonical
//! precision order. Candidate blocks that the source cannot honestly back
//! (span coverage below threshold, too few samples per day) are skipped and
//! reported to the trace sink; the writer never invents data.

use std::sync::Arc;

use camino::Utf8Path;
use hifitime::{Duration, Epoch};

use crate::block_selection::{
    coverage_ratio, forty_eight_hour_block_qualifies, get_recommended_blocks, BlockKindConfig,
    RecommendedBlocks,
};
use crate::blocks::{
    Block, FortyEightHourBlock, FortyEightHourSectionHeader, MonthlyBlock, MultiYearBlock,
};
use crate::calendar::{
    date_of, day_start, days_in_month, month_start, next_day, next_month, normalize_instant,
    one_day, previous_day,
};
use crate::chebyshev::{fit_chebyshev, unwrap_angles};
use crate::constants::{COVERAGE_THRESHOLD, SECONDS_PER_DAY, WEFT_PRECISION};
use crate::data_source::EphemerisDataSource;
use crate::preamble::Preamble;
use crate::timespan::descriptive_timespan;
use crate::trace::{NullSink, TraceEvent, TraceSink};
use crate::value_behavior::ValueBehavior;
use crate::weft_errors::WeftError;
use crate::weft_file::{Section, WeftFile};

/// Everything the writer needs to know: preamble literals, which block kinds
/// to emit, and their fit parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WeftWriterConfig {
    pub multi_year: BlockKindConfig,
    pub monthly: BlockKindConfig,
    pub forty_eight_hour: BlockKindConfig,
    /// Emit a forty-eight hour block for every overlapping day, bypassing
    /// the coverage and density thresholds.
    pub force_forty_eight_hour_blocks: bool,
    /// Allow a truncated monthly block (day_count below 28) for a trailing
    /// boundary month that would otherwise fail its coverage check.
    pub allow_partial_months: bool,
    /// Overrides the inferred preamble timespan.
    pub custom_timespan: Option<String>,
    pub id: String,
    pub data_source: String,
    pub quantity: String,
    pub value_behavior: ValueBehavior,
}

impl WeftWriterConfig {
    /// A config with every block kind disabled and default fit parameters;
    /// enable kinds explicitly or go through [`Self::auto`].
    pub fn new(
        id: impl Into<String>,
        data_source: impl Into<String>,
        quantity: impl Into<String>,
        value_behavior: ValueBehavior,
    ) -> Self {
        WeftWriterConfig {
            multi_year: BlockKindConfig::multi_year_defaults(),
            monthly: BlockKindConfig::monthly_defaults(),
            forty_eight_hour: BlockKindConfig::forty_eight_hour_defaults(),
            force_forty_eight_hour_blocks: false,
            allow_partial_months: false,
            custom_timespan: None,
            id: id.into(),
            data_source: data_source.into(),
            quantity: quantity.into(),
            value_behavior,
        }
    }

    /// A config whose block kinds are chosen by
    /// [`get_recommended_blocks`] from the source's span and density.
    pub fn auto(
        source: &dyn EphemerisDataSource,
        id: impl Into<String>,
        data_source: impl Into<String>,
        quantity: impl Into<String>,
        value_behavior: ValueBehavior,
    ) -> Self {
        let RecommendedBlocks {
            multi_year,
            monthly,
            forty_eight_hour,
        } = get_recommended_blocks(source);
        WeftWriterConfig {
            multi_year,
            monthly,
            forty_eight_hour,
            ..Self::new(id, data_source, quantity, value_behavior)
        }
    }
}

pub struct WeftWriter {
    config: WeftWriterConfig,
    sink: Arc<dyn TraceSink>,
}

impl WeftWriter {
    pub fn new(config: WeftWriterConfig) -> Self {
        Self::with_trace(config, Arc::new(NullSink))
    }

    pub fn with_trace(config: WeftWriterConfig, sink: Arc<dyn TraceSink>) -> Self {
        WeftWriter { config, sink }
    }

    /// Generate a [`WeftFile`] from the data source.
    ///
    /// Blocks are generated per kind (multi-year, monthly, forty-eight hour
    /// sections), each gated by its coverage policy, then assembled with an
    /// inferred or overridden timespan label.
    pub fn create_file(&self, source: &dyn EphemerisDataSource) -> Result<WeftFile, WeftError> {
        if source.timestamps().is_empty() {
            return Err(WeftError::EmptyDataSource);
        }
        let start = source.start();
        let end = source.end();
        if end < start {
            return Err(WeftError::EmptyDataSource);
        }

        let mut blocks: Vec<Block> = Vec::new();

        if self.config.multi_year.enabled {
            if let Some(block) = self.multi_year_block(source)? {
                blocks.push(Block::MultiYear(block));
            }
        }

        if self.config.monthly.enabled {
            for block in self.monthly_blocks(source)? {
                blocks.push(Block::Monthly(block));
            }
        }

        let sections =
            if self.config.forty_eight_hour.enabled || self.config.force_forty_eight_hour_blocks {
                self.forty_eight_hour_sections(source)?
            } else {
                Vec::new()
            };

        let now = Epoch::now().unwrap_or_else(|_| day_start((2000, 1, 1)));
        let preamble = Preamble {
            id: self.config.id.clone(),
            data_source: self.config.data_source.clone(),
            timespan: descriptive_timespan(start, end, self.config.custom_timespan.as_deref()),
            precision: WEFT_PRECISION.to_string(),
            quantity: self.config.quantity.clone(),
            behavior: self.config.value_behavior,
            generated_at: Preamble::generation_label(now),
        };

        Ok(WeftFile::new(preamble, blocks, sections))
    }

    /// Generate and write straight to disk.
    pub fn write(
        &self,
        source: &dyn EphemerisDataSource,
        path: &Utf8Path,
    ) -> Result<WeftFile, WeftError> {
        let file = self.create_file(source)?;
        file.write_to_file(path)?;
        Ok(file)
    }

    /// The single multi-year candidate: the whole-year hull of the source
    /// range. Emitted when the source's timestamps span at least the
    /// coverage threshold of that hull.
    fn multi_year_block(
        &self,
        source: &dyn EphemerisDataSource,
    ) -> Result<Option<MultiYearBlock>, WeftError> {
        let start = source.start();
        let end = source.end();
        let (start_year, ..) = date_of(start);
        let (end_year, ..) = date_of(end);

        // An end at exactly Jan 1 midnight does not drag in another year.
        let mut hull_end_year = if end == month_start(end_year, 1) {
            end_year
        } else {
            end_year + 1
        };
        if hull_end_year <= start_year {
            hull_end_year = start_year + 1;
        }

        let nominal_start = month_start(start_year, 1);
        let nominal_end = month_start(hull_end_year, 1);

        let coverage = coverage_ratio(source.timestamps(), nominal_start, nominal_end);
        if coverage < COVERAGE_THRESHOLD {
            self.sink.record(TraceEvent::BlockSkipped {
                kind: "multi-year",
                start: nominal_start,
                coverage,
                threshold: COVERAGE_THRESHOLD,
            });
            return Ok(None);
        }

        let fit_start = nominal_start.max(start);
        let fit_end = nominal_end.min(end);
        let Some(coeffs) = self.fit_block(
            source,
            fit_start,
            fit_end,
            nominal_start,
            nominal_end,
            self.config.multi_year,
            "multi-year",
            false,
        )?
        else {
            return Ok(None);
        };

        Ok(Some(MultiYearBlock {
            start_year: start_year as i16,
            duration: (hull_end_year - start_year) as u16,
            coeffs,
        }))
    }

    /// Monthly candidates: every calendar month intersecting the source.
    fn monthly_blocks(
        &self,
        source: &dyn EphemerisDataSource,
    ) -> Result<Vec<MonthlyBlock>, WeftError> {
        let start = source.start();
        let end = source.end();
        let mut emitted = Vec::new();

        let (mut year, mut month, _) = date_of(start);
        while month_start(year, month) < end {
            let nominal_start = month_start(year, month);
            let (following_year, following_month) = next_month(year, month);
            let nominal_end = month_start(following_year, following_month);
            let day_count = days_in_month(year, month);

            let coverage = coverage_ratio(source.timestamps(), nominal_start, nominal_end);
            if coverage >= COVERAGE_THRESHOLD {
                if let Some(coeffs) = self.fit_block(
                    source,
                    nominal_start.max(start),
                    nominal_end.min(end),
                    nominal_start,
                    nominal_end,
                    self.config.monthly,
                    "monthly",
                    false,
                )? {
                    emitted.push(MonthlyBlock {
                        year: year as i16,
                        month,
                        day_count,
                        coeffs,
                    });
                }
            } else if let Some(block) =
                self.partial_month(source, year, month, nominal_start, nominal_end)?
            {
                emitted.push(block);
            } else {
                self.sink.record(TraceEvent::BlockSkipped {
                    kind: "monthly",
                    start: nominal_start,
                    coverage,
                    threshold: COVERAGE_THRESHOLD,
                });
            }

            (year, month) = (following_year, following_month);
        }

        Ok(emitted)
    }

    /// A truncated block for a trailing boundary month.
    ///
    /// Only a month whose data begins at the month start and runs dry before
    /// month end can be expressed: `day_count` counts from the first of the
    /// month, so a late-starting month has no truncated form.
    fn partial_month(
        &self,
        source: &dyn EphemerisDataSource,
        year: i32,
        month: u8,
        nominal_start: Epoch,
        nominal_end: Epoch,
    ) -> Result<Option<MonthlyBlock>, WeftError> {
        let start = source.start();
        let end = source.end();

        let is_trailing_boundary = nominal_start >= start && nominal_end > end;
        if !self.config.allow_partial_months || !is_trailing_boundary || end <= nominal_start {
            return Ok(None);
        }

        let covered_days = (end - nominal_start).to_seconds() / SECONDS_PER_DAY;
        let day_count = (covered_days.ceil() as u8).clamp(1, days_in_month(year, month));
        let partial_end = nominal_start + Duration::from_days(f64::from(day_count));

        let Some(coeffs) = self.fit_block(
            source,
            nominal_start,
            partial_end.min(end),
            nominal_start,
            partial_end,
            self.config.monthly,
            "monthly",
            false,
        )?
        else {
            return Ok(None);
        };

        Ok(Some(MonthlyBlock {
            year: year as i16,
            month,
            day_count,
            coeffs,
        }))
    }

    /// Forty-eight hour blocks for every qualifying day, grouped into one
    /// section per contiguous run of surviving days.
    fn forty_eight_hour_sections(
        &self,
        source: &dyn EphemerisDataSource,
    ) -> Result<Vec<Section>, WeftError> {
        let start = source.start();
        let end = source.end();
        let forced = self.config.force_forty_eight_hour_blocks;
        let kind = self.config.forty_eight_hour;

        let mut produced: Vec<FortyEightHourBlock> = Vec::new();
        let mut date = date_of(start);
        while day_start(date) - one_day() <= end {
            let center = day_start(date);
            let window_start = center - one_day();
            let window_end = center + one_day();
            let overlaps = window_start <= end && window_end > start;
            let qualifies =
                forced || forty_eight_hour_block_qualifies(source.timestamps(), center);

            if overlaps && qualifies {
                if let Some(coeffs) = self.fit_block(
                    source,
                    window_start.max(start),
                    window_end.min(end),
                    window_start,
                    window_end,
                    kind,
                    "forty-eight hour",
                    forced,
                )? {
                    produced.push(FortyEightHourBlock {
                        center_date: date,
                        coeffs,
                    });
                }
            } else if overlaps {
                self.sink.record(TraceEvent::BlockSkipped {
                    kind: "forty-eight hour",
                    start: window_start,
                    coverage: coverage_ratio(source.timestamps(), window_start, window_end),
                    threshold: COVERAGE_THRESHOLD,
                });
            }

            date = next_day(date);
        }

        // One section per contiguous run of surviving days. The block size is
        // recomputed from the serialized form: marker, date, and one f32 per
        // coefficient slot.
        let block_size = 6 + 4 * (kind.polynomial_degree as u16 + 1);
        let mut sections = Vec::new();
        let mut run: Vec<FortyEightHourBlock> = Vec::new();
        for block in produced {
            let contiguous = run
                .last()
                .is_some_and(|last| next_day(last.center_date) == block.center_date);
            if !run.is_empty() && !contiguous {
                sections.push(Self::seal_section(std::mem::take(&mut run), block_size));
            }
            run.push(block);
        }
        if !run.is_empty() {
            sections.push(Self::seal_section(run, block_size));
        }

        Ok(sections)
    }

    fn seal_section(blocks: Vec<FortyEightHourBlock>, block_size: u16) -> Section {
        let first = blocks[0].center_date;
        let last = blocks[blocks.len() - 1].center_date;
        // Pad the date range by one day on each side so every instant a
        // member block covers falls on a date inside the header.
        let header = FortyEightHourSectionHeader {
            start_date: previous_day(first),
            end_date: next_day(last),
            block_size,
            block_count: blocks.len() as u32,
        };
        Section::from_blocks(header, blocks)
    }

    /// Sample evenly across the clipped interval, unwrap if wrapping, fit.
    ///
    /// Returns `None` (after tracing) when the fit lacks samples, unless the
    /// block was explicitly forced, in which case the failure is fatal.
    #[allow(clippy::too_many_arguments)]
    fn fit_block(
        &self,
        source: &dyn EphemerisDataSource,
        fit_start: Epoch,
        fit_end: Epoch,
        nominal_start: Epoch,
        nominal_end: Epoch,
        kind: BlockKindConfig,
        kind_name: &'static str,
        fatal_on_insufficient: bool,
    ) -> Result<Option<Vec<f32>>, WeftError> {
        let count = (kind.sample_count as usize).max(2);
        let span = (fit_end - fit_start).to_seconds();

        let mut xs = Vec::with_capacity(count);
        let mut ys = Vec::with_capacity(count);
        for i in 0..count {
            let t = if i == count - 1 {
                fit_end
            } else {
                fit_start + Duration::from_seconds(span * i as f64 / (count - 1) as f64)
            };
            xs.push(normalize_instant(t, nominal_start, nominal_end));
            ys.push(source.value_at(t)?);
        }

        if let Some((min, max)) = self.config.value_behavior.wrapping_range() {
            ys = unwrap_angles(&ys, min, max);
        }

        match fit_chebyshev(&xs, &ys, kind.polynomial_degree as usize) {
            Ok(coeffs) => {
                let mut coeffs: Vec<f32> = coeffs.into_iter().map(|c| c as f32).collect();
                // Trim trailing zeros the way the parser does, so a written
                // file round-trips structurally.
                while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
                    coeffs.pop();
                }
                Ok(Some(coeffs))
            }
            Err(err @ WeftError::InsufficientSamples { .. }) => {
                if fatal_on_insufficient {
                    return Err(err);
                }
                self.sink.record(TraceEvent::FitSkipped {
                    kind: kind_name,
                    start: nominal_start,
                });
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod writer_config_test {
    use super::*;
    use crate::calendar::day_start;
    use crate::data_source::SampledDataSource;

    fn hourly_constant_source(days: usize) -> SampledDataSource {
        let t0 = day_start((2024, 1, 1));
        let samples = (0..=days * 24)
            .map(|i| (t0 + Duration::from_hours(i as f64), 42.0))
            .collect();
        SampledDataSource::new(samples).unwrap()
    }

    #[test]
    fn test_default_config_disables_all_kinds() {
        let config = WeftWriterConfig::new("mars", "test", "longitude", ValueBehavior::Unbounded);
        assert!(!config.multi_year.enabled);
        assert!(!config.monthly.enabled);
        assert!(!config.forty_eight_hour.enabled);
        assert_eq!(config.monthly.polynomial_degree, 9);
    }

    #[test]
    fn test_auto_config_follows_recommendation() {
        let source = hourly_constant_source(3);
        let config = WeftWriterConfig::auto(
            &source,
            "mars",
            "test",
            "longitude",
            ValueBehavior::Unbounded,
        );
        assert!(config.forty_eight_hour.enabled);
        assert!(!config.monthly.enabled);
    }

    #[test]
    fn test_empty_source_is_fatal() {
        let config = WeftWriterConfig::new("mars", "test", "longitude", ValueBehavior::Unbounded);
        let writer = WeftWriter::new(config);
        let source = SampledDataSource::new(vec![(day_start((2024, 1, 1)), 1.0)]).unwrap();
        // One sample is a valid (degenerate) source; zero samples cannot be
        // constructed, so emptiness is caught at the adapter boundary.
        assert!(writer.create_file(&source).is_ok());
    }
}
