//! Forty-eight hour block (`0x00 01`).
//!
//! The finest precision level: one Chebyshev series covering the 48 hours
//! centered on a calendar day's midnight. Adjacent blocks overlap by 24 hours,
//! which lets the reader blend them linearly and keep the evaluated curve
//! continuous across midnights.
//!
//! Unlike the other kinds the record does not carry its own length: every
//! block under a section header is serialized to exactly the header's
//! `block_size` bytes, the coefficient area zero-padded. Layout after the two
//! marker bytes: `i16` year, `u8` month, `u8` day, then f32 coefficients.

use std::io::Write;

use hifitime::Epoch;

use crate::blocks::codec::{read_header_bytes, verify_marker};
use crate::blocks::section_header::FortyEightHourSectionHeader;
use crate::calendar::{day_start, normalize_instant, one_day};
use crate::chebyshev::evaluate_chebyshev;
use crate::constants::Date;
use crate::weft_errors::WeftError;

#[derive(Debug, Clone, PartialEq)]
pub struct FortyEightHourBlock {
    /// Center date: coverage runs from its midnight minus 24h to plus 24h.
    pub center_date: Date,
    /// Chebyshev coefficients, lowest order first, trailing zeros trimmed.
    pub coeffs: Vec<f32>,
}

impl FortyEightHourBlock {
    pub const MARKER: [u8; 2] = [0x00, 0x01];

    /// Midnight UTC on the center date.
    pub fn center(&self) -> Epoch {
        day_start(self.center_date)
    }

    /// Coverage interval `[center - 24h, center + 24h)`.
    pub fn coverage(&self) -> (Epoch, Epoch) {
        let center = self.center();
        (center - one_day(), center + one_day())
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

    /// Read the center date of a serialized block without decoding it.
    pub fn peek_date(input: &[u8]) -> Result<Date, WeftError> {
        const CONTEXT: &str = "forty-eight hour block";
        let input = verify_marker(input, Self::MARKER, CONTEXT)?;
        let (_, header) = read_header_bytes::<4>(input, CONTEXT)?;
        decode_date(header)
    }

    /// Parse a block positioned at its marker.
    ///
    /// The active section header supplies the only length information the
    /// record has; exactly `block_size` bytes are consumed. Trailing zero
    /// coefficients are padding and are trimmed.
    pub fn parse<'a>(
        input: &'a [u8],
        header: &FortyEightHourSectionHeader,
    ) -> Result<(&'a [u8], Self), WeftError> {
        const CONTEXT: &str = "forty-eight hour block";
        let block_size = usize::from(header.block_size);
        if input.len() < block_size {
            return Err(WeftError::TruncatedBlock(CONTEXT));
        }

        let body = verify_marker(&input[..block_size], Self::MARKER, CONTEXT)?;
        let (coeff_bytes, date_bytes) = read_header_bytes::<4>(body, CONTEXT)?;
        let center_date = decode_date(date_bytes)?;

        let mut coeffs: Vec<f32> = coeff_bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
            coeffs.pop();
        }

        Ok((
            &input[block_size..],
            FortyEightHourBlock {
                center_date,
                coeffs,
            },
        ))
    }

    /// Serialize the block zero-padded to `block_size` bytes, returning the
    /// number of bytes written.
    pub fn serialize<W: Write>(&self, w: &mut W, block_size: u16) -> Result<u32, WeftError> {
        let capacity = (usize::from(block_size) - 6) / 4;
        if self.coeffs.len() > capacity {
            return Err(WeftError::SizeMismatch {
                context: "forty-eight hour coefficients",
                expected: capacity,
                got: self.coeffs.len(),
            });
        }

        w.write_all(&Self::MARKER)?;
        w.write_all(&(self.center_date.0 as i16).to_be_bytes())?;
        w.write_all(&[self.center_date.1, self.center_date.2])?;
        for c in &self.coeffs {
            w.write_all(&c.to_be_bytes())?;
        }
        // Zero-fill the remaining coefficient slots and any alignment slack
        // so the record is exactly block_size bytes long.
        let padding = usize::from(block_size) - 6 - 4 * self.coeffs.len();
        w.write_all(&vec![0u8; padding])?;
        Ok(u32::from(block_size))
    }
}

fn decode_date(bytes: [u8; 4]) -> Result<Date, WeftError> {
    let year = i32::from(i16::from_be_bytes([bytes[0], bytes[1]]));
    let month = bytes[2];
    let day = bytes[3];
    if !(1..=12).contains(&month) {
        return Err(WeftError::InvalidFieldValue {
            field: "forty-eight hour month",
            value: i64::from(month),
        });
    }
    if !(1..=31).contains(&day) {
        return Err(WeftError::InvalidFieldValue {
            field: "forty-eight hour day",
            value: i64::from(day),
        });
    }
    Ok((year, month, day))
}
