mod common;

use common::hourly_constant;
use hifitime::Epoch;
use weft::blocks::{Block, MonthlyBlock};
use weft::{ValueBehavior, WeftFile, WeftReader, WeftWriter, WeftWriterConfig};

fn monthly_only_config() -> WeftWriterConfig {
    let mut config = WeftWriterConfig::new(
        "mars",
        "jpl:horizons",
        "longitude",
        ValueBehavior::Wrapping { min: 0.0, max: 360.0 },
    );
    config.monthly.enabled = true;
    config
}

/// A constant January source writes exactly one monthly block, and the bytes
/// survive a parse/serialize round trip untouched.
#[test]
fn test_constant_month_round_trip() {
    let source = hourly_constant((2024, 1, 1), (2024, 2, 1), 120.5);
    let writer = WeftWriter::new(monthly_only_config());
    let file = writer.create_file(&source).unwrap();

    assert_eq!(file.blocks.len(), 1);
    assert!(file.sections.is_empty());
    match &file.blocks[0] {
        Block::Monthly(MonthlyBlock {
            year,
            month,
            day_count,
            coeffs,
        }) => {
            assert_eq!(*year, 2024);
            assert_eq!(*month, 1);
            assert_eq!(*day_count, 31);
            // Degree 9 fit: up to ten coefficients, trailing zeros trimmed.
            assert!((1..=10).contains(&coeffs.len()));
        }
        other => panic!("expected a monthly block, got {other:?}"),
    }

    let bytes = file.to_bytes().unwrap();
    let parsed = WeftFile::parse(bytes.clone()).unwrap();
    assert_eq!(parsed.preamble, file.preamble);
    assert_eq!(parsed.blocks, file.blocks);
    assert_eq!(parsed.to_bytes().unwrap(), bytes);

    let reader = WeftReader::new(std::sync::Arc::new(parsed));
    let t = Epoch::from_gregorian_utc(2024, 1, 15, 12, 0, 0, 0);
    let value = reader.value_at(t).unwrap();
    assert!((value - 120.5).abs() < 1e-3, "value = {value}");
}

/// The serialized monthly block layout is endian-exact.
#[test]
fn test_monthly_block_wire_layout() {
    let source = hourly_constant((2024, 1, 1), (2024, 2, 1), 120.5);
    let writer = WeftWriter::new(monthly_only_config());
    let file = writer.create_file(&source).unwrap();
    let bytes = file.to_bytes().unwrap();

    // The first block starts right after the preamble newline.
    let block_start = bytes.iter().position(|&b| b == b'\n').unwrap() + 1;
    let block = &bytes[block_start..];
    assert_eq!(&block[0..2], &[0x00, 0x00]);
    assert_eq!(i16::from_be_bytes([block[2], block[3]]), 2024);
    assert_eq!(block[4], 1);
    assert_eq!(block[5], 31);
    let coeff_count = u32::from_be_bytes([block[6], block[7], block[8], block[9]]);
    assert_eq!(block.len(), 10 + 4 * coeff_count as usize);

    // First coefficient is near the constant value, stored as big-endian f32.
    let c0 = f32::from_be_bytes([block[10], block[11], block[12], block[13]]);
    assert!((f64::from(c0) - 120.5).abs() < 1e-3);
}

/// The preamble of writer output carries the configured literals and an
/// inferred timespan.
#[test]
fn test_writer_preamble_fields() {
    let source = hourly_constant((2024, 1, 1), (2024, 2, 1), 120.5);
    let writer = WeftWriter::new(monthly_only_config());
    let file = writer.create_file(&source).unwrap();

    assert_eq!(file.preamble.id, "mars");
    assert_eq!(file.preamble.data_source, "jpl:horizons");
    assert_eq!(file.preamble.precision, "32bit");
    assert_eq!(file.preamble.quantity, "longitude");
    assert_eq!(file.preamble.timespan, "2024");
    assert_eq!(
        file.preamble.behavior,
        ValueBehavior::Wrapping { min: 0.0, max: 360.0 }
    );

    let rendered = file.preamble.to_string();
    assert!(rendered.starts_with("#weft! v0.02 mars jpl:horizons 2024 32bit longitude wrapping[0,360] chebychevs generated@"));
    assert!(rendered.ends_with('\n'));
}

/// A custom timespan overrides the inferred label.
#[test]
fn test_custom_timespan_override() {
    let source = hourly_constant((2024, 1, 1), (2024, 2, 1), 120.5);
    let mut config = monthly_only_config();
    config.custom_timespan = Some("jan-2024".to_string());
    let file = WeftWriter::new(config).create_file(&source).unwrap();
    assert_eq!(file.preamble.timespan, "jan-2024");
}

/// Files round-trip through disk, parent directories included.
#[test]
fn test_file_io_round_trip() {
    let source = hourly_constant((2024, 1, 1), (2024, 2, 1), 120.5);
    let writer = WeftWriter::new(monthly_only_config());

    let dir = std::env::temp_dir().join("weft_io_test");
    let path_buf = dir.join("mars_longitude.weft");
    let path = camino::Utf8Path::from_path(&path_buf).unwrap();

    let written = writer.write(&source, path).unwrap();
    let read_back = WeftFile::read_from_file(path).unwrap();
    assert_eq!(read_back.preamble, written.preamble);
    assert_eq!(read_back.blocks, written.blocks);

    std::fs::remove_dir_all(&dir).ok();
}

/// Forty-eight hour runs survive the round trip, lazy parse included.
#[test]
fn test_forty_eight_hour_round_trip() {
    let source = hourly_constant((2024, 1, 1), (2024, 1, 10), 10.0);
    let mut config = monthly_only_config();
    config.monthly.enabled = false;
    config.forty_eight_hour.enabled = true;
    let file = WeftWriter::new(config).create_file(&source).unwrap();
    assert_eq!(file.sections.len(), 1);

    let bytes = file.to_bytes().unwrap();
    let parsed = WeftFile::parse(bytes.clone()).unwrap();
    assert_eq!(parsed.sections.len(), 1);
    assert_eq!(
        parsed.sections[0].header,
        file.sections[0].header
    );
    assert_eq!(parsed.section_blocks(0), file.section_blocks(0));
    assert_eq!(parsed.to_bytes().unwrap(), bytes);

    // Block records all share the header's fixed size: degree 5 fits in
    // marker + date + six coefficients.
    assert_eq!(parsed.sections[0].header.block_size, 30);
}
