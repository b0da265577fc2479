pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Magic string opening every weft preamble.
pub const WEFT_MAGIC: &str = "#weft!";
/// Format version emitted by this crate.
pub const WEFT_VERSION: &str = "v0.02";
/// Fitting method literal carried in the preamble.
pub const WEFT_METHOD: &str = "chebychevs";
/// Coefficient width literal carried in the preamble.
pub const WEFT_PRECISION: &str = "32bit";

/// Fraction of a block's nominal span that must be backed by data-source
/// timestamps before the block is emitted.
pub const COVERAGE_THRESHOLD: f64 = 0.666;
/// Minimum sampling density for forty-eight hour blocks, in samples per day.
pub const MIN_FORTY_EIGHT_HOUR_DENSITY: f64 = 8.0;

// Per-kind fit defaults.
pub const MULTI_YEAR_DEGREE: u32 = 14;
pub const MULTI_YEAR_SAMPLES: u32 = 50;
pub const MONTHLY_DEGREE: u32 = 9;
pub const MONTHLY_SAMPLES: u32 = 48;
pub const FORTY_EIGHT_HOUR_DEGREE: u32 = 5;
pub const FORTY_EIGHT_HOUR_SAMPLES: u32 = 48;

/// A calendar date in UTC, used for block coverage bookkeeping.
pub type Date = (i32, u8, u8);
