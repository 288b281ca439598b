//! Row-by-row rewriting of OLD-layout records into the NEW layout.
//!
//! The transformer is driven entirely by a transformation descriptor: it
//! samples the input's first usable row to learn the real column count,
//! back-fills the descriptor to full coverage, then streams the file one
//! row at a time. Change kinds apply per column in the fixed order
//! `ignore → type → size → nb_decs → move_before → move_after`; the move
//! kinds are recognized but unimplemented and are skipped with a warning.
//! Data errors abort the whole run on first occurrence.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, info, warn};

use crate::{
    classify::ColumnType,
    descriptor::{ChangeKind, ColumnChange, Descriptor, StripSide},
    error::RecastError,
    numeric,
};

/// Lines shorter than this many bytes carry no record and are skipped.
const MIN_ROW_BYTES: usize = 3;

/// One input row as a positional value list.
///
/// Ignored columns are marked removed rather than deleted so sibling
/// columns keep stable indices for the rest of the pass; serialization
/// drops the marked values.
#[derive(Debug, Clone)]
pub struct Record {
    values: Vec<String>,
    removed: Vec<bool>,
}

impl Record {
    pub fn split(line: &str, delimiter: char) -> Self {
        let values: Vec<String> = line.split(delimiter).map(str::to_string).collect();
        let removed = vec![false; values.len()];
        Record { values, removed }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn value(&self, index: usize) -> &str {
        &self.values[index]
    }

    fn set(&mut self, index: usize, value: String) {
        self.values[index] = value;
    }

    fn remove(&mut self, index: usize) {
        self.removed[index] = true;
    }

    /// Serializes the surviving columns in input order.
    pub fn serialize(&self, delimiter: char) -> String {
        self.values
            .iter()
            .zip(&self.removed)
            .filter(|(_, removed)| !**removed)
            .map(|(value, _)| value.as_str())
            .join(&delimiter.to_string())
    }
}

/// Applies a back-filled descriptor to rows of the OLD-layout file.
pub struct RecordTransformer {
    actions: Vec<ColumnChange>,
    delimiter: char,
}

impl RecordTransformer {
    /// Builds a transformer for a file with `column_count` real columns.
    ///
    /// The descriptor is back-filled with `none` entries so every ordinal
    /// up to the real column count is covered; trailing columns must never
    /// be dropped silently.
    pub fn new(mut descriptor: Descriptor, column_count: usize, delimiter: char) -> Self {
        if let Some(highest) = descriptor.highest_ordinal()
            && highest.one_based() > column_count
        {
            warn!(
                "descriptor names {highest} but the sampled row has only {column_count} column(s)"
            );
        }
        descriptor.back_fill(column_count);
        RecordTransformer {
            actions: descriptor.entries().to_vec(),
            delimiter,
        }
    }

    pub fn column_count(&self) -> usize {
        self.actions.len()
    }

    /// Rewrites one input row. `line_no` is the 1-based input line number,
    /// used for error reporting only.
    pub fn transform_row(&self, line: &str, line_no: u64) -> Result<String, RecastError> {
        let mut record = Record::split(line, self.delimiter);
        if record.len() < self.actions.len() {
            return Err(RecastError::SchemaMismatch {
                line: line_no,
                found: record.len(),
                expected: self.actions.len(),
            });
        }
        for change in &self.actions {
            for kind in ChangeKind::APPLY_ORDER {
                if !change.has(kind) {
                    continue;
                }
                match self.apply(kind, change, &mut record) {
                    Err(err @ RecastError::UnsupportedChange { .. }) => {
                        warn!("{err}; change skipped");
                    }
                    other => other?,
                }
            }
        }
        Ok(record.serialize(self.delimiter))
    }

    fn apply(
        &self,
        kind: ChangeKind,
        change: &ColumnChange,
        record: &mut Record,
    ) -> Result<(), RecastError> {
        match kind {
            ChangeKind::Ignore => {
                record.remove(change.ordinal.zero_based());
                Ok(())
            }
            ChangeKind::Type => self.apply_type(change, record),
            ChangeKind::Size => self.apply_size(change, record),
            // Folded into the type handler.
            ChangeKind::NbDecs => Ok(()),
            ChangeKind::MoveBefore | ChangeKind::MoveAfter => {
                Err(RecastError::UnsupportedChange {
                    column: change.name(),
                    kind: kind.token().to_string(),
                })
            }
        }
    }

    /// Managed transitions: `T_NUM_V4=>T_NUM`, `T_NUM=>T_NUM`,
    /// `T_DATE_8=>T_DATE_DB2`. Any other pair is left untouched.
    fn apply_type(&self, change: &ColumnChange, record: &mut Record) -> Result<(), RecastError> {
        let index = change.ordinal.zero_based();
        let (type_old, type_new) = change
            .type_change
            .expect("validated descriptor entry with a type change");

        match (type_old, type_new) {
            (ColumnType::NumPacked4 | ColumnType::Num, ColumnType::Num) => {
                let (size_old, size_new) = change
                    .size_change
                    .expect("validated descriptor entry with a size pair");
                let (decs_old, decs_new) = change
                    .decs_change
                    .expect("validated numeric entry with an nb_decs pair");
                let rewritten = numeric::reencode(
                    &change.name(),
                    record.value(index),
                    size_old,
                    size_new,
                    decs_old,
                    decs_new,
                )?;
                record.set(index, rewritten);
            }
            (ColumnType::Date8, ColumnType::DateIso) => {
                let rewritten = reformat_date(&change.name(), record.value(index))?;
                record.set(index, rewritten);
            }
            (old, new) => {
                debug!(
                    "column {}: type change {old}=>{new} is not managed; value left as-is",
                    change.name()
                );
            }
        }
        Ok(())
    }

    /// Width changes apply to text columns only, and never alongside a type
    /// change (the type handler owns the width in that case).
    fn apply_size(&self, change: &ColumnChange, record: &mut Record) -> Result<(), RecastError> {
        if change.has(ChangeKind::Type) {
            return Ok(());
        }
        if !matches!(change.type_change, Some((ColumnType::Text, _))) {
            return Ok(());
        }
        let Some((size_old, size_new)) = change.size_change else {
            return Ok(());
        };
        let count = size_old.abs_diff(size_new);
        if count == 0 {
            return Ok(());
        }

        let index = change.ordinal.zero_based();
        let value = record.value(index);
        let trimmed = match change.strip.unwrap_or(StripSide::Auto) {
            StripSide::Right => rtrim(value, count),
            StripSide::Left => ltrim(value, count),
            StripSide::Auto => {
                let prefix: String = value.chars().take(count).collect();
                if prefix.trim().is_empty() {
                    ltrim(value, count)
                } else {
                    rtrim(value, count)
                }
            }
        };
        record.set(index, trimmed);
        Ok(())
    }
}

fn rtrim(value: &str, count: usize) -> String {
    let keep = value.chars().count().saturating_sub(count);
    value.chars().take(keep).collect()
}

fn ltrim(value: &str, count: usize) -> String {
    value.chars().skip(count).collect()
}

fn reformat_date(column: &str, value: &str) -> Result<String, RecastError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(" ".repeat(10));
    }
    match (trimmed.get(..4), trimmed.get(4..6), trimmed.get(6..8)) {
        (Some(year), Some(month), Some(day)) if trimmed.len() == 8 => {
            Ok(format!("{year}-{month}-{day}"))
        }
        _ => Err(RecastError::Validation {
            column: column.to_string(),
            value: value.to_string(),
            reason: "expected an 8-byte YYYYMMDD date".to_string(),
        }),
    }
}

/// Streams `input` through the transformer into `output`.
///
/// The first usable row is sampled for the real column count and then
/// processed like any other. An input with no usable rows is a no-op, not
/// an error. Returns the number of rows written.
pub fn transform<R: BufRead, W: Write>(
    descriptor: Descriptor,
    input: R,
    mut output: W,
    delimiter: char,
) -> Result<u64> {
    let mut lines = input.lines();
    let mut line_no: u64 = 0;

    let mut first_usable = None;
    for line in lines.by_ref() {
        let line = line.context("Reading input row")?;
        line_no += 1;
        if line.len() < MIN_ROW_BYTES {
            continue;
        }
        first_usable = Some(line);
        break;
    }
    let Some(first_line) = first_usable else {
        info!("input contains no usable rows; nothing to transform");
        return Ok(0);
    };

    let column_count = first_line.trim_end().split(delimiter).count();
    let transformer = RecordTransformer::new(descriptor, column_count, delimiter);
    debug!(
        "sampled {column_count} column(s) from line {line_no}; descriptor covers {}",
        transformer.column_count()
    );

    let mut written: u64 = 0;
    let mut emit = |line: &str, line_no: u64, output: &mut W| -> Result<()> {
        let row = transformer
            .transform_row(line, line_no)
            .with_context(|| format!("Transforming line {line_no}"))?;
        writeln!(output, "{row}").context("Writing output row")?;
        written += 1;
        Ok(())
    };

    emit(&first_line, line_no, &mut output)?;
    for line in lines {
        let line = line.context("Reading input row")?;
        line_no += 1;
        if line.len() < MIN_ROW_BYTES {
            continue;
        }
        emit(&line, line_no, &mut output)?;
    }
    output.flush().context("Flushing output")?;
    Ok(written)
}
