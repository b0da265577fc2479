//! The `.weft` file container.
//!
//! A [`WeftFile`] owns a parsed preamble, the freestanding multi-year and
//! monthly blocks, and one [`Section`] per forty-eight hour run. Parsing
//! validates the whole block stream structurally (markers, sizes, ordering,
//! section counts) but defers decoding forty-eight hour coefficients: each
//! section remembers the byte offset of its run and materializes on first
//! touch. The file is immutable once parsed, so shared readers are safe; the
//! one-shot fill goes through a [`OnceLock`].
//!
//! Block kinds appear in the stream in increasing precision: multi-year,
//! then monthly, then forty-eight hour sections. Truncating a file at any
//! block boundary therefore yields a still-valid file of lower maximum
//! precision.

use std::fmt;
use std::io::{BufWriter, Write};
use std::sync::OnceLock;

use camino::Utf8Path;
use hifitime::Epoch;
use itertools::Itertools;

use crate::blocks::{
    Block, FortyEightHourBlock, FortyEightHourSectionHeader, MonthlyBlock, MultiYearBlock,
};
use crate::calendar::day_start;
use crate::preamble::Preamble;
use crate::timespan::descriptive_timespan;
use crate::trace::{NullSink, TraceEvent, TraceSink};
use crate::weft_errors::WeftError;

/// A run of forty-eight hour blocks under one section header.
///
/// Parsed sections hold only `(offset, block_count)` into the file's byte
/// buffer until a reader touches them; writer-built sections are born
/// materialized.
#[derive(Debug)]
pub struct Section {
    pub header: FortyEightHourSectionHeader,
    offset: usize,
    cache: OnceLock<Vec<FortyEightHourBlock>>,
}

impl Section {
    /// A section materialized from freshly generated blocks.
    pub fn from_blocks(
        header: FortyEightHourSectionHeader,
        blocks: Vec<FortyEightHourBlock>,
    ) -> Self {
        Section {
            header,
            offset: 0,
            cache: OnceLock::from(blocks),
        }
    }

    fn from_offset(header: FortyEightHourSectionHeader, offset: usize) -> Self {
        Section {
            header,
            offset,
            cache: OnceLock::new(),
        }
    }

    /// The section's blocks, decoding them from `data` on first touch.
    ///
    /// The run was structurally validated during [`WeftFile::parse`], so the
    /// deferred decode cannot fail.
    fn blocks<'a>(&'a self, data: &[u8]) -> &'a [FortyEightHourBlock] {
        self.cache.get_or_init(|| {
            let mut blocks = Vec::with_capacity(self.header.block_count as usize);
            let mut input = &data[self.offset..];
            for _ in 0..self.header.block_count {
                let (rest, block) = FortyEightHourBlock::parse(input, &self.header)
                    .expect("section run validated at parse time");
                blocks.push(block);
                input = rest;
            }
            blocks
        })
    }
}

/// A parsed or freshly written `.weft` file.
#[derive(Debug)]
pub struct WeftFile {
    pub preamble: Preamble,
    /// Multi-year and monthly blocks, in file order.
    pub blocks: Vec<Block>,
    /// Forty-eight hour sections, in file order.
    pub sections: Vec<Section>,
    /// Backing bytes for lazily decoded sections. Empty for writer output.
    data: Vec<u8>,
}

// Parse-loop precision gate: once a kind has been seen, lower-precision
// markers are malformed.
#[derive(PartialEq, PartialOrd)]
enum ParseStage {
    MultiYear,
    Monthly,
    FortyEightHour,
}

impl WeftFile {
    /// Assemble a file from generated parts, already in canonical order.
    pub fn new(preamble: Preamble, blocks: Vec<Block>, sections: Vec<Section>) -> Self {
        WeftFile {
            preamble,
            blocks,
            sections,
            data: Vec::new(),
        }
    }

    /// Parse a file from an owned byte buffer.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, WeftError> {
        Self::parse_with_trace(bytes, &NullSink)
    }

    /// Parse, reporting advisory conditions (unusual day counts) to `sink`.
    ///
    /// Walks the block stream after the preamble, enforcing the precision
    /// ordering and, for each section header, that exactly `block_count`
    /// forty-eight hour records of `block_size` bytes follow in strictly
    /// increasing date order. Forty-eight hour coefficient payloads are not
    /// decoded here; sections record their run's offset for later.
    pub fn parse_with_trace(bytes: Vec<u8>, sink: &dyn TraceSink) -> Result<Self, WeftError> {
        let (preamble, mut pos) = Preamble::parse(&bytes)?;

        let mut blocks = Vec::new();
        let mut sections = Vec::new();
        let mut stage = ParseStage::MultiYear;

        while pos < bytes.len() {
            let input = &bytes[pos..];
            if input.len() < 2 {
                return Err(WeftError::TruncatedBlock("block marker"));
            }
            let marker = [input[0], input[1]];

            match marker {
                MultiYearBlock::MARKER => {
                    if stage > ParseStage::MultiYear {
                        return Err(WeftError::OutOfOrderBlock(
                            "multi-year block after higher-precision blocks",
                        ));
                    }
                    let (rest, block) = MultiYearBlock::parse(input)?;
                    pos = bytes.len() - rest.len();
                    blocks.push(Block::MultiYear(block));
                }
                MonthlyBlock::MARKER => {
                    if stage > ParseStage::Monthly {
                        return Err(WeftError::OutOfOrderBlock(
                            "monthly block after forty-eight hour sections",
                        ));
                    }
                    stage = ParseStage::Monthly;
                    let (rest, block) = MonthlyBlock::parse(input)?;
                    pos = bytes.len() - rest.len();
                    if block.is_partial() {
                        sink.record(TraceEvent::UnusualDayCount {
                            year: block.year,
                            month: block.month,
                            day_count: block.day_count,
                        });
                    }
                    blocks.push(Block::Monthly(block));
                }
                FortyEightHourSectionHeader::MARKER => {
                    stage = ParseStage::FortyEightHour;
                    let (rest, header) = FortyEightHourSectionHeader::parse(input)?;
                    pos = bytes.len() - rest.len();
                    let run_offset = pos;
                    pos = Self::scan_section_run(&bytes, pos, &header)?;
                    sections.push(Section::from_offset(header, run_offset));
                }
                FortyEightHourBlock::MARKER => {
                    return Err(WeftError::OutOfOrderBlock(
                        "forty-eight hour block outside a section",
                    ));
                }
                [a, b] => return Err(WeftError::BadMarker(a, b)),
            }
        }

        Ok(WeftFile {
            preamble,
            blocks,
            sections,
            data: bytes,
        })
    }

    /// Validate one section's run of forty-eight hour records without
    /// decoding coefficients. Returns the offset just past the run.
    fn scan_section_run(
        bytes: &[u8],
        mut pos: usize,
        header: &FortyEightHourSectionHeader,
    ) -> Result<usize, WeftError> {
        let block_size = usize::from(header.block_size);
        let mut previous_date = None;

        for seen in 0..header.block_count {
            let input = &bytes[pos..];
            if input.len() < 2 || [input[0], input[1]] != FortyEightHourBlock::MARKER {
                return Err(WeftError::BlockCountMismatch {
                    expected: header.block_count,
                    got: seen,
                });
            }
            if input.len() < block_size {
                return Err(WeftError::TruncatedBlock("forty-eight hour block"));
            }
            let date = FortyEightHourBlock::peek_date(input)?;
            if previous_date.is_some_and(|previous| date <= previous) {
                return Err(WeftError::OutOfOrderBlock(
                    "forty-eight hour blocks not in chronological order",
                ));
            }
            previous_date = Some(date);
            pos += block_size;
        }

        Ok(pos)
    }

    /// The blocks of section `index`, materializing them if needed.
    pub fn section_blocks(&self, index: usize) -> &[FortyEightHourBlock] {
        self.sections[index].blocks(&self.data)
    }

    /// Serialize the whole file in canonical precision order.
    pub fn serialize<W: Write>(&self, w: &mut W) -> Result<(), WeftError> {
        w.write_all(self.preamble.to_string().as_bytes())?;

        for block in &self.blocks {
            if matches!(block, Block::MultiYear(_)) {
                block.serialize(w)?;
            }
        }
        for block in &self.blocks {
            if matches!(block, Block::Monthly(_)) {
                block.serialize(w)?;
            }
        }

        for (index, section) in self.sections.iter().enumerate() {
            let blocks = self.section_blocks(index);
            if blocks.len() != section.header.block_count as usize {
                return Err(WeftError::BlockCountMismatch {
                    expected: section.header.block_count,
                    got: blocks.len() as u32,
                });
            }
            section.header.serialize(w)?;
            for block in blocks {
                block.serialize(w, section.header.block_size)?;
            }
        }

        Ok(())
    }

    /// Serialize into a fresh byte buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WeftError> {
        let mut buffer = Vec::new();
        self.serialize(&mut buffer)?;
        Ok(buffer)
    }

    /// Read and parse a `.weft` file from disk.
    pub fn read_from_file(path: &Utf8Path) -> Result<Self, WeftError> {
        let bytes = std::fs::read(path)?;
        Self::parse(bytes)
    }

    /// Write the file to disk, creating parent directories as needed.
    pub fn write_to_file(&self, path: &Utf8Path) -> Result<(), WeftError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        self.serialize(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Earliest coverage start and latest coverage end across all blocks.
    pub fn coverage_bounds(&self) -> Option<(Epoch, Epoch)> {
        let mut bounds: Option<(Epoch, Epoch)> = None;
        let mut fold = |start: Epoch, end: Epoch| {
            bounds = Some(match bounds {
                None => (start, end),
                Some((min_start, max_end)) => (min_start.min(start), max_end.max(end)),
            });
        };

        for block in &self.blocks {
            let (start, end) = block.coverage();
            fold(start, end);
        }
        for index in 0..self.sections.len() {
            for block in self.section_blocks(index) {
                let (start, end) = block.coverage();
                fold(start, end);
            }
        }

        bounds
    }

    /// Splice several preamble-compatible files into one.
    ///
    /// Fields id, data source, precision, quantity and value behavior must
    /// match byte-for-byte across inputs; timespan and generation timestamp
    /// are recomputed. Multi-year blocks sort longest-first then by start
    /// year, monthly blocks by date. Sections with identical headers merge:
    /// their blocks sort by center date (first occurrence wins on duplicate
    /// days) and `block_count` is recomputed.
    pub fn combine(files: Vec<WeftFile>, new_timespan: Option<&str>) -> Result<Self, WeftError> {
        let Some(first) = files.first() else {
            return Err(WeftError::EmptyDataSource);
        };
        for other in files.iter().skip(1) {
            first.preamble.check_compatible(&other.preamble)?;
        }

        let mut blocks: Vec<Block> = Vec::new();
        let mut runs: Vec<(FortyEightHourSectionHeader, Vec<FortyEightHourBlock>)> = Vec::new();

        for file in &files {
            blocks.extend(file.blocks.iter().cloned());
            for index in 0..file.sections.len() {
                let header = file.sections[index].header.clone();
                let section_blocks = file.section_blocks(index).to_vec();
                if let Some((_, merged)) = runs.iter_mut().find(|(existing, _)| {
                    existing.start_date == header.start_date
                        && existing.end_date == header.end_date
                        && existing.block_size == header.block_size
                }) {
                    merged.extend(section_blocks);
                } else {
                    runs.push((header, section_blocks));
                }
            }
        }

        blocks.sort_by_key(block_sort_key);

        runs.sort_by_key(|(header, _)| header.start_date);
        let sections = runs
            .into_iter()
            .map(|(mut header, mut section_blocks)| {
                section_blocks.sort_by_key(|block| block.center_date);
                section_blocks.dedup_by_key(|block| block.center_date);
                header.block_count = section_blocks.len() as u32;
                Section::from_blocks(header, section_blocks)
            })
            .collect_vec();

        let mut preamble = first.preamble.clone();
        let combined = WeftFile::new(preamble.clone(), blocks, sections);
        let (start, end) = combined
            .coverage_bounds()
            .unwrap_or_else(|| (day_start((2000, 1, 1)), day_start((2000, 1, 1))));
        preamble.timespan = descriptive_timespan(start, end, new_timespan);
        preamble.generated_at =
            Preamble::generation_label(Epoch::now().unwrap_or_else(|_| day_start((2000, 1, 1))));

        Ok(WeftFile {
            preamble,
            ..combined
        })
    }

    /// Summary of the file's contents.
    pub fn info(&self) -> FileInfo {
        let multi_year_count = self
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::MultiYear(_)))
            .count();
        let monthly_count = self.blocks.len() - multi_year_count;
        let forty_eight_hour_count = self
            .sections
            .iter()
            .map(|s| s.header.block_count as usize)
            .sum();

        FileInfo {
            id: self.preamble.id.clone(),
            quantity: self.preamble.quantity.clone(),
            behavior: self.preamble.behavior.to_string(),
            timespan: self.preamble.timespan.clone(),
            multi_year_count,
            monthly_count,
            section_count: self.sections.len(),
            forty_eight_hour_count,
            coverage: self.coverage_bounds(),
        }
    }
}

fn block_sort_key(block: &Block) -> (u8, i32, i32, u8) {
    match block {
        // Longer multi-year blocks sort first.
        Block::MultiYear(b) => (0, -i32::from(b.duration), i32::from(b.start_year), 1),
        Block::Monthly(b) => (1, 0, i32::from(b.year), b.month),
    }
}

/// Per-file summary, printable as a fixed-width table.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub id: String,
    pub quantity: String,
    pub behavior: String,
    pub timespan: String,
    pub multi_year_count: usize,
    pub monthly_count: usize,
    pub section_count: usize,
    pub forty_eight_hour_count: usize,
    pub coverage: Option<(Epoch, Epoch)>,
}

const LABEL_WIDTH: usize = 18;
const VALUE_WIDTH: usize = 40;

fn info_row(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    writeln!(
        f,
        "| {:<label$}| {:<value$}|",
        label,
        value,
        label = LABEL_WIDTH,
        value = VALUE_WIDTH
    )
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = format!(
            "+{:-<label$}+{:-<value$}+",
            "",
            "",
            label = LABEL_WIDTH + 1,
            value = VALUE_WIDTH + 1
        );

        writeln!(f, "{border}")?;
        info_row(f, "Weft File", "")?;
        writeln!(f, "{border}")?;
        info_row(f, "Id", &self.id)?;
        info_row(f, "Quantity", &self.quantity)?;
        info_row(f, "Behavior", &self.behavior)?;
        info_row(f, "Timespan", &self.timespan)?;
        info_row(f, "Multi-year", &format!("{} blocks", self.multi_year_count))?;
        info_row(f, "Monthly", &format!("{} blocks", self.monthly_count))?;
        info_row(
            f,
            "Forty-eight hour",
            &format!(
                "{} blocks in {} sections",
                self.forty_eight_hour_count, self.section_count
            ),
        )?;
        let coverage = match self.coverage {
            Some((start, end)) => format!("{start} - {end}"),
            None => "empty".to_string(),
        };
        info_row(f, "Coverage", &coverage)?;
        writeln!(f, "{border}")
    }
}
