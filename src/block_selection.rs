//! Block-selection policy.
//!
//! Heuristics deciding which block kinds a data source can honestly back.
//! Coverage is span-based on purpose: `(t_max - t_min) / nominal_span` over
//! the timestamps falling inside a candidate block's interval, so regular
//! hourly sampling reads as full coverage and interior gaps do not.

use hifitime::Epoch;

use crate::constants::{
    COVERAGE_THRESHOLD, FORTY_EIGHT_HOUR_DEGREE, FORTY_EIGHT_HOUR_SAMPLES,
    MIN_FORTY_EIGHT_HOUR_DENSITY, MONTHLY_DEGREE, MONTHLY_SAMPLES, MULTI_YEAR_DEGREE,
    MULTI_YEAR_SAMPLES, SECONDS_PER_DAY,
};
use crate::data_source::EphemerisDataSource;

/// Fit parameters for one block kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockKindConfig {
    pub enabled: bool,
    pub sample_count: u32,
    pub polynomial_degree: u32,
}

impl BlockKindConfig {
    pub fn multi_year_defaults() -> Self {
        BlockKindConfig {
            enabled: false,
            sample_count: MULTI_YEAR_SAMPLES,
            polynomial_degree: MULTI_YEAR_DEGREE,
        }
    }

    pub fn monthly_defaults() -> Self {
        BlockKindConfig {
            enabled: false,
            sample_count: MONTHLY_SAMPLES,
            polynomial_degree: MONTHLY_DEGREE,
        }
    }

    pub fn forty_eight_hour_defaults() -> Self {
        BlockKindConfig {
            enabled: false,
            sample_count: FORTY_EIGHT_HOUR_SAMPLES,
            polynomial_degree: FORTY_EIGHT_HOUR_DEGREE,
        }
    }
}

/// The block kinds a data source can back, with per-kind fit parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendedBlocks {
    pub multi_year: BlockKindConfig,
    pub monthly: BlockKindConfig,
    pub forty_eight_hour: BlockKindConfig,
}

/// Span-based coverage ratio of `[start, end)` by a sorted timestamp list.
///
/// Returns `(t_max - t_min) / (end - start)` over the timestamps falling
/// inside the interval, or 0 when fewer than two fall inside.
pub fn coverage_ratio(timestamps: &[Epoch], start: Epoch, end: Epoch) -> f64 {
    let inside = timestamps_within(timestamps, start, end);
    if inside.len() < 2 {
        return 0.0;
    }
    let t_min = inside[0];
    let t_max = inside[inside.len() - 1];
    (t_max - t_min).to_seconds() / (end - start).to_seconds()
}

/// The contiguous sub-slice of sorted `timestamps` falling in `[start, end)`.
pub fn timestamps_within(timestamps: &[Epoch], start: Epoch, end: Epoch) -> &[Epoch] {
    let first = timestamps.partition_point(|&t| t < start);
    let past = timestamps.partition_point(|&t| t < end);
    &timestamps[first..past]
}

/// Observed sampling density in samples per day, from the whole source span.
pub fn samples_per_day(source: &dyn EphemerisDataSource) -> f64 {
    let n = source.timestamps().len();
    if n < 2 {
        return 0.0;
    }
    let span_days = (source.end() - source.start()).to_seconds() / SECONDS_PER_DAY;
    if span_days <= 0.0 {
        return 0.0;
    }
    (n - 1) as f64 / span_days
}

/// Whether a forty-eight hour block centered on `center` clears the density
/// and coverage thresholds.
pub fn forty_eight_hour_block_qualifies(timestamps: &[Epoch], center: Epoch) -> bool {
    let window_start = center - hifitime::Duration::from_days(1.0);
    let window_end = center + hifitime::Duration::from_days(1.0);

    let inside = timestamps_within(timestamps, window_start, window_end);
    let density = inside.len() as f64 / 2.0;
    if density < MIN_FORTY_EIGHT_HOUR_DENSITY {
        return false;
    }

    coverage_ratio(timestamps, window_start, window_end) >= COVERAGE_THRESHOLD
}

/// Recommend block kinds for a source from its span and sampling density.
///
/// Hourly-or-better sampling earns forty-eight hour blocks on short spans
/// and monthly blocks beyond; six-hourly sampling earns monthly blocks from
/// a week up and multi-year blocks from a year up; weekly sampling earns
/// multi-year blocks only.
pub fn get_recommended_blocks(source: &dyn EphemerisDataSource) -> RecommendedBlocks {
    let density = samples_per_day(source);
    let span_days = (source.end() - source.start()).to_seconds() / SECONDS_PER_DAY;

    let mut recommended = RecommendedBlocks {
        multi_year: BlockKindConfig::multi_year_defaults(),
        monthly: BlockKindConfig::monthly_defaults(),
        forty_eight_hour: BlockKindConfig::forty_eight_hour_defaults(),
    };

    if density >= 24.0 {
        if span_days <= 7.0 {
            recommended.forty_eight_hour.enabled = true;
        } else if span_days <= 31.0 {
            recommended.monthly.enabled = true;
            recommended.forty_eight_hour.enabled = true;
        } else {
            recommended.multi_year.enabled = true;
            recommended.monthly.enabled = true;
        }
    } else if density >= 4.0 {
        if span_days >= 7.0 {
            recommended.monthly.enabled = true;
        }
        if span_days >= 365.0 {
            recommended.multi_year.enabled = true;
        }
    } else if density >= 1.0 / 7.0 && span_days >= 365.0 {
        recommended.multi_year.enabled = true;
    }

    recommended
}

#[cfg(test)]
mod block_selection_test {
    use super::*;
    use crate::calendar::day_start;
    use crate::data_source::SampledDataSource;
    use approx::assert_abs_diff_eq;
    use hifitime::Duration;

    fn source_with_step(days: usize, step_hours: f64) -> SampledDataSource {
        let t0 = day_start((2024, 1, 1));
        let count = (days as f64 * 24.0 / step_hours) as usize + 1;
        let samples = (0..count)
            .map(|i| (t0 + Duration::from_hours(i as f64 * step_hours), 1.0))
            .collect();
        SampledDataSource::new(samples).unwrap()
    }

    #[test]
    fn test_coverage_ratio_full_month() {
        let source = source_with_step(31, 1.0);
        let start = day_start((2024, 1, 1));
        let end = day_start((2024, 2, 1));
        let ratio = coverage_ratio(source.timestamps(), start, end);
        assert!(ratio > 0.95, "ratio = {ratio}");
    }

    #[test]
    fn test_coverage_ratio_partial() {
        // Five days of data against a 31-day month.
        let source = source_with_step(5, 1.0);
        let start = day_start((2024, 1, 1));
        let end = day_start((2024, 2, 1));
        let ratio = coverage_ratio(source.timestamps(), start, end);
        assert!(ratio < 0.2, "ratio = {ratio}");
    }

    #[test]
    fn test_coverage_ratio_is_gap_insensitive() {
        // Only the span endpoints matter, not interior density.
        let t0 = day_start((2024, 1, 1));
        let sparse = SampledDataSource::new(vec![
            (t0, 1.0),
            (t0 + Duration::from_days(30.0), 1.0),
        ])
        .unwrap();
        let ratio = coverage_ratio(
            sparse.timestamps(),
            t0,
            day_start((2024, 2, 1)),
        );
        assert_abs_diff_eq!(ratio, 30.0 / 31.0, epsilon = 1e-12);
    }

    #[test]
    fn test_forty_eight_hour_qualification() {
        let source = source_with_step(31, 1.0);
        // Interior day: full window, 48 samples.
        assert!(forty_eight_hour_block_qualifies(
            source.timestamps(),
            day_start((2024, 1, 15))
        ));
        // First day: only the trailing 24h of the window has data.
        assert!(!forty_eight_hour_block_qualifies(
            source.timestamps(),
            day_start((2024, 1, 1))
        ));
    }

    #[test]
    fn test_forty_eight_hour_density_floor() {
        // Three-hourly sampling: 16 samples per window is exactly the floor
        // of 8 per day; six-hourly falls below it.
        let at_floor = source_with_step(31, 3.0);
        assert!(forty_eight_hour_block_qualifies(
            at_floor.timestamps(),
            day_start((2024, 1, 15))
        ));
        let below_floor = source_with_step(31, 6.0);
        assert!(!forty_eight_hour_block_qualifies(
            below_floor.timestamps(),
            day_start((2024, 1, 15))
        ));
    }

    #[test]
    fn test_recommend_short_dense_span() {
        let source = source_with_step(3, 1.0);
        let recommended = get_recommended_blocks(&source);
        assert!(recommended.forty_eight_hour.enabled);
        assert!(!recommended.monthly.enabled);
        assert!(!recommended.multi_year.enabled);
    }

    #[test]
    fn test_recommend_month_dense_span() {
        let source = source_with_step(31, 1.0);
        let recommended = get_recommended_blocks(&source);
        assert!(recommended.forty_eight_hour.enabled);
        assert!(recommended.monthly.enabled);
        assert!(!recommended.multi_year.enabled);
    }

    #[test]
    fn test_recommend_long_dense_span() {
        let source = source_with_step(400, 1.0);
        let recommended = get_recommended_blocks(&source);
        assert!(!recommended.forty_eight_hour.enabled);
        assert!(recommended.monthly.enabled);
        assert!(recommended.multi_year.enabled);
    }

    #[test]
    fn test_recommend_sparse_long_span() {
        // Daily sampling over two years: monthly and multi-year.
        let source = source_with_step(730, 6.0);
        let recommended = get_recommended_blocks(&source);
        assert!(recommended.monthly.enabled);
        assert!(recommended.multi_year.enabled);
        assert!(!recommended.forty_eight_hour.enabled);

        // Weekly sampling: multi-year only.
        let weekly = source_with_step(730, 24.0 * 7.0);
        let recommended = get_recommended_blocks(&weekly);
        assert!(recommended.multi_year.enabled);
        assert!(!recommended.monthly.enabled);
    }

    #[test]
    fn test_default_fit_parameters() {
        let recommended = get_recommended_blocks(&source_with_step(3, 1.0));
        assert_eq!(recommended.multi_year.polynomial_degree, 14);
        assert_eq!(recommended.multi_year.sample_count, 50);
        assert_eq!(recommended.monthly.polynomial_degree, 9);
        assert_eq!(recommended.monthly.sample_count, 48);
        assert_eq!(recommended.forty_eight_hour.polynomial_degree, 5);
        assert_eq!(recommended.forty_eight_hour.sample_count, 48);
    }
}
