//! Forty-eight hour section header (`0x00 02`).
//!
//! Carries no polynomial data. A header announces a run of forty-eight hour
//! blocks: the date range they span, the fixed serialized size of each block,
//! and how many follow. The fixed size is what makes lazy, seekable access to
//! individual blocks possible.
//!
//! Binary layout, big-endian, after the two marker bytes:
//!
//! * `i16 u8 u8` start date (year, month, day)
//! * `i16 u8 u8` end date
//! * `u16` block size in bytes, marker included
//! * `u32` block count

use std::io::Write;

use crate::blocks::codec::{read_header_bytes, verify_marker};
use crate::constants::Date;
use crate::weft_errors::WeftError;

/// Smallest legal block size: marker, date, and one coefficient.
const MIN_BLOCK_SIZE: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FortyEightHourSectionHeader {
    pub start_date: Date,
    pub end_date: Date,
    /// Serialized length of every following block, marker included.
    pub block_size: u16,
    /// Number of blocks following this header.
    pub block_count: u32,
}

impl FortyEightHourSectionHeader {
    pub const MARKER: [u8; 2] = [0x00, 0x02];
    pub const BYTE_LEN: u32 = 16;

    /// True when a calendar date falls within `[start_date, end_date]`,
    /// both bounds inclusive.
    pub fn contains_date(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Number of f32 coefficient slots each member block carries.
    pub fn coefficient_capacity(&self) -> usize {
        (usize::from(self.block_size) - 6) / 4
    }

    /// Parse a header positioned at its marker.
    pub fn parse(input: &[u8]) -> Result<(&[u8], Self), WeftError> {
        const CONTEXT: &str = "section header";
        let input = verify_marker(input, Self::MARKER, CONTEXT)?;
        let (input, header) = read_header_bytes::<14>(input, CONTEXT)?;

        let start_date = decode_date(&header[0..4], "section start date")?;
        let end_date = decode_date(&header[4..8], "section end date")?;
        let block_size = u16::from_be_bytes([header[8], header[9]]);
        let block_count = u32::from_be_bytes([header[10], header[11], header[12], header[13]]);

        if end_date < start_date {
            return Err(WeftError::OutOfOrderBlock(
                "section end date precedes start date",
            ));
        }
        // Blocks are 16-bit aligned and must at least hold marker, date and
        // one coefficient.
        if block_size < MIN_BLOCK_SIZE || block_size % 2 != 0 {
            return Err(WeftError::SizeMismatch {
                context: "section block_size",
                expected: usize::from(MIN_BLOCK_SIZE),
                got: usize::from(block_size),
            });
        }

        Ok((
            input,
            FortyEightHourSectionHeader {
                start_date,
                end_date,
                block_size,
                block_count,
            },
        ))
    }

    /// Serialize the header, returning the number of bytes written.
    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<u32, WeftError> {
        w.write_all(&Self::MARKER)?;
        write_date(w, self.start_date)?;
        write_date(w, self.end_date)?;
        w.write_all(&self.block_size.to_be_bytes())?;
        w.write_all(&self.block_count.to_be_bytes())?;
        Ok(Self::BYTE_LEN)
    }
}

fn decode_date(bytes: &[u8], field: &'static str) -> Result<Date, WeftError> {
    let year = i32::from(i16::from_be_bytes([bytes[0], bytes[1]]));
    let month = bytes[2];
    let day = bytes[3];
    if !(1..=12).contains(&month) {
        return Err(WeftError::InvalidFieldValue {
            field,
            value: i64::from(month),
        });
    }
    if !(1..=31).contains(&day) {
        return Err(WeftError::InvalidFieldValue {
            field,
            value: i64::from(day),
        });
    }
    Ok((year, month, day))
}

fn write_date<W: Write>(w: &mut W, date: Date) -> Result<(), WeftError> {
    w.write_all(&(date.0 as i16).to_be_bytes())?;
    w.write_all(&[date.1, date.2])?;
    Ok(())
}
