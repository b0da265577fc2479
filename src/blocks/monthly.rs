//! Monthly block (`0x00 00`).
//!
//! One Chebyshev series per calendar month. The workhorse precision level:
//! fine enough for most charting uses, coarse enough to keep files small.
//!
//! Binary layout, big-endian, after the two marker bytes:
//!
//! * `i16` year
//! * `u8` month (1–12)
//! * `u8` day count
//! * `u32` coefficient count
//! * `f32 × count` coefficients
//!
//! `day_count` is the length of the coverage interval in days. It normally
//! equals the month's calendar length (28–31) but partial blocks written at a
//! data-range boundary may carry less; readers accept any positive value.

use std::io::Write;

use hifitime::{Duration, Epoch};
use nom::{multi::count, number::complete::be_f32, Parser};

use crate::blocks::codec::{read_header_bytes, verify_marker};
use crate::calendar::{month_start, normalize_instant};
use crate::chebyshev::evaluate_chebyshev;
use crate::weft_errors::WeftError;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBlock {
    pub year: i16,
    /// Month number, 1–12.
    pub month: u8,
    /// Days covered from the first of the month.
    pub day_count: u8,
    /// Chebyshev coefficients, lowest order first.
    pub coeffs: Vec<f32>,
}

impl MonthlyBlock {
    pub const MARKER: [u8; 2] = [0x00, 0x00];

    /// Coverage interval `[year-month-01, year-month-01 + day_count days)`.
    pub fn coverage(&self) -> (Epoch, Epoch) {
        let start = month_start(i32::from(self.year), self.month);
        let end = start + Duration::from_days(f64::from(self.day_count));
        (start, end)
    }

    pub fn contains(&self, t: Epoch) -> bool {
        let (start, end) = self.coverage();
        start <= t && t < end
    }

    /// Evaluate the series at `t`, which must lie inside the coverage
    /// interval. Raw value; value-behavior post-processing is the reader's.
    pub fn evaluate(&self, t: Epoch) -> f64 {
        let (start, end) = self.coverage();
        let x = normalize_instant(t, start, end);
        let coeffs: Vec<f64> = self.coeffs.iter().map(|&c| f64::from(c)).collect();
        evaluate_chebyshev(&coeffs, x)
    }

    /// True when `day_count` is outside the 28–31 band of real calendar
    /// months, i.e. the block is a boundary partial.
    pub fn is_partial(&self) -> bool {
        !(28..=31).contains(&self.day_count)
    }

    /// Parse a block positioned at its marker.
    pub fn parse(input: &[u8]) -> Result<(&[u8], Self), WeftError> {
        const CONTEXT: &str = "monthly block";
        let input = verify_marker(input, Self::MARKER, CONTEXT)?;
        let (input, header) = read_header_bytes::<8>(input, CONTEXT)?;

        let year = i16::from_be_bytes([header[0], header[1]]);
        let month = header[2];
        let day_count = header[3];
        let coeff_count = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

        if !(1..=12).contains(&month) {
            return Err(WeftError::InvalidFieldValue {
                field: "monthly month",
                value: i64::from(month),
            });
        }
        if day_count == 0 {
            return Err(WeftError::InvalidFieldValue {
                field: "monthly day_count",
                value: 0,
            });
        }

        let (input, coeffs) = count(be_f32, coeff_count as usize)
            .parse(input)
            .map_err(|_: nom::Err<nom::error::Error<&[u8]>>| {
                WeftError::TruncatedBlock("monthly coefficients")
            })?;

        Ok((
            input,
            MonthlyBlock {
                year,
                month,
                day_count,
                coeffs,
            },
        ))
    }

    /// Serialize the block, returning the number of bytes written.
    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<u32, WeftError> {
        w.write_all(&Self::MARKER)?;
        w.write_all(&self.year.to_be_bytes())?;
        w.write_all(&[self.month, self.day_count])?;
        w.write_all(&(self.coeffs.len() as u32).to_be_bytes())?;
        for c in &self.coeffs {
            w.write_all(&c.to_be_bytes())?;
        }
        Ok(self.byte_len())
    }

    pub fn byte_len(&self) -> u32 {
        10 + 4 * self.coeffs.len() as u32
    }
}
