//! Multi-year block (`0x00 03`).
//!
//! The coarsest block kind: one Chebyshev series covering several whole
//! calendar years. The cheapest per byte and the least precise, it backs any
//! instant that no finer block covers.
//!
//! Binary layout, big-endian, after the two marker bytes:
//!
//! * `i16` start year
//! * `u16` duration in years
//! * `u32` coefficient count
//! * `f32 × count` coefficients

use std::io::Write;

use hifitime::Epoch;
use nom::{multi::count, number::complete::be_f32, Parser};

use crate::blocks::codec::{read_header_bytes, verify_marker};
use crate::calendar::{month_start, normalize_instant};
use crate::chebyshev::evaluate_chebyshev;
use crate::weft_errors::WeftError;

#[derive(Debug, Clone, PartialEq)]
pub struct MultiYearBlock {
    /// First calendar year covered.
    pub start_year: i16,
    /// Number of years covered.
    pub duration: u16,
    /// Chebyshev coefficients, lowest order first.
    pub coeffs: Vec<f32>,
}

impl MultiYearBlock {
    pub const MARKER: [u8; 2] = [0x00, 0x03];

    /// Coverage interval `[start_year-01-01, (start_year+duration)-01-01)`.
    pub fn coverage(&self) -> (Epoch, Epoch) {
        let start = month_start(i32::from(self.start_year), 1);
        let end = month_start(i32::from(self.start_year) + i32::from(self.duration), 1);
        (start, end)
    }

    pub fn contains(&self, t: Epoch) -> bool {
        let (start, end) = self.coverage();
        start <= t && t < end
    }

    /// Evaluate the series at `t`, which must lie inside the coverage
    /// interval. The raw value is returned; value-behavior post-processing
    /// is the reader's job.
    pub fn evaluate(&self, t: Epoch) -> f64 {
        let (start, end) = self.coverage();
        let x = normalize_instant(t, start, end);
        let coeffs: Vec<f64> = self.coeffs.iter().map(|&c| f64::from(c)).collect();
        evaluate_chebyshev(&coeffs, x)
    }

    /// Parse a block positioned at its marker.
    ///
    /// Return
    /// ----------
    /// * The remaining input and the parsed block.
    pub fn parse(input: &[u8]) -> Result<(&[u8], Self), WeftError> {
        const CONTEXT: &str = "multi-year block";
        let input = verify_marker(input, Self::MARKER, CONTEXT)?;
        let (input, header) = read_header_bytes::<8>(input, CONTEXT)?;

        let start_year = i16::from_be_bytes([header[0], header[1]]);
        let duration = u16::from_be_bytes([header[2], header[3]]);
        let coeff_count = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

        if duration == 0 {
            return Err(WeftError::InvalidFieldValue {
                field: "multi-year duration",
                value: 0,
            });
        }

        let (input, coeffs) = count(be_f32, coeff_count as usize)
            .parse(input)
            .map_err(|_: nom::Err<nom::error::Error<&[u8]>>| {
                WeftError::TruncatedBlock("multi-year coefficients")
            })?;

        Ok((
            input,
            MultiYearBlock {
                start_year,
                duration,
                coeffs,
            },
        ))
    }

    /// Serialize the block, returning the number of bytes written.
    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<u32, WeftError> {
        w.write_all(&Self::MARKER)?;
        w.write_all(&self.start_year.to_be_bytes())?;
        w.write_all(&self.duration.to_be_bytes())?;
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

#[cfg(test)]
mod multi_year_test {
    use super::*;
    use crate::calendar::day_start;
    use approx::assert_abs_diff_eq;

    fn sample_block() -> MultiYearBlock {
        MultiYearBlock {
            start_year: 2020,
            duration: 10,
            coeffs: vec![180.0, 5.5, -0.25],
        }
    }

    #[test]
    fn test_serialize_layout() {
        let mut buffer = Vec::new();
        let written = sample_block().serialize(&mut buffer).unwrap();
        assert_eq!(written as usize, buffer.len());
        assert_eq!(&buffer[0..2], &[0x00, 0x03]);
        assert_eq!(&buffer[2..4], &2020i16.to_be_bytes());
        assert_eq!(&buffer[4..6], &10u16.to_be_bytes());
        assert_eq!(&buffer[6..10], &3u32.to_be_bytes());
        assert_eq!(&buffer[10..14], &180.0f32.to_be_bytes());
    }

    #[test]
    fn test_parse_round_trip() {
        let block = sample_block();
        let mut buffer = Vec::new();
        block.serialize(&mut buffer).unwrap();
        let (rest, parsed) = MultiYearBlock::parse(&buffer).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, block);
    }

    #[test]
    fn test_parse_truncated() {
        let mut buffer = Vec::new();
        sample_block().serialize(&mut buffer).unwrap();
        buffer.truncate(buffer.len() - 2);
        assert!(matches!(
            MultiYearBlock::parse(&buffer),
            Err(WeftError::TruncatedBlock(_))
        ));
    }

    #[test]
    fn test_parse_zero_duration() {
        let block = MultiYearBlock {
            start_year: 2020,
            duration: 0,
            coeffs: vec![1.0],
        };
        let mut buffer = Vec::new();
        block.serialize(&mut buffer).unwrap();
        assert!(matches!(
            MultiYearBlock::parse(&buffer),
            Err(WeftError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn test_contains_half_open() {
        let block = sample_block();
        assert!(block.contains(day_start((2020, 1, 1))));
        assert!(block.contains(day_start((2029, 12, 31))));
        assert!(!block.contains(day_start((2030, 1, 1))));
        assert!(!block.contains(day_start((2019, 12, 31))));
    }

    #[test]
    fn test_evaluate_constant() {
        let block = MultiYearBlock {
            start_year: 2020,
            duration: 2,
            coeffs: vec![42.0],
        };
        assert_abs_diff_eq!(block.evaluate(day_start((2020, 7, 1))), 42.0);
        assert_abs_diff_eq!(block.evaluate(day_start((2021, 12, 31))), 42.0);
    }
}
