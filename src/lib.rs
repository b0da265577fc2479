//! Weft: a compact binary ephemeris format storing one scalar astronomical
//! quantity as a function of time, using piecewise Chebyshev polynomials at
//! three precision levels (multi-year, monthly, forty-eight hour).

pub mod block_selection;
pub mod blocks;
pub mod calendar;
pub mod chebyshev;
pub mod constants;
pub mod data_source;
pub mod preamble;
pub mod reader;
pub mod timespan;
pub mod trace;
pub mod value_behavior;
pub mod weft_errors;
pub mod weft_file;
pub mod writer;

pub use data_source::{EphemerisDataSource, SampledDataSource};
pub use preamble::Preamble;
pub use reader::WeftReader;
pub use value_behavior::ValueBehavior;
pub use weft_errors::WeftError;
pub use weft_file::WeftFile;
pub use writer::{WeftWriter, WeftWriterConfig};
