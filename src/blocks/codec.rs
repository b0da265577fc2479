//! Shared low-level helpers for block (de)serialization.

use crate::weft_errors::WeftError;

/// Consume and verify a two-byte block marker.
pub(crate) fn verify_marker<'a>(
    input: &'a [u8],
    marker: [u8; 2],
    context: &'static str,
) -> Result<&'a [u8], WeftError> {
    if input.len() < 2 {
        return Err(WeftError::TruncatedBlock(context));
    }
    if input[..2] != marker {
        return Err(WeftError::BadMarker(input[0], input[1]));
    }
    Ok(&input[2..])
}

/// Read a fixed-size header, failing with [`WeftError::TruncatedBlock`] when
/// the input runs short.
pub(crate) fn read_header_bytes<'a, const N: usize>(
    input: &'a [u8],
    context: &'static str,
) -> Result<(&'a [u8], [u8; N]), WeftError> {
    if input.len() < N {
        return Err(WeftError::TruncatedBlock(context));
    }
    let mut header = [0u8; N];
    header.copy_from_slice(&input[..N]);
    Ok((&input[N..], header))
}
