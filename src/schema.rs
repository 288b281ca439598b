//! Schema model and sample-row scanning.
//!
//! A [`Schema`] is built from exactly one delimiter-separated sample row,
//! assumed representative of the whole file. Columns are purely positional:
//! the only identity a column has is its 1-based [`ColumnOrdinal`], which is
//! what makes the "no reordering between versions" assumption visible in the
//! types. Byte offsets recorded per column are descriptive metadata; the
//! transform stage re-splits every row of the real file independently.

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use crate::{
    classify::{self, ColumnType},
    error::RecastError,
};

/// 1-based positional column index, rendered as `C-<n>` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnOrdinal(usize);

impl ColumnOrdinal {
    /// Builds an ordinal from a 1-based column number.
    pub fn new(one_based: usize) -> Self {
        debug_assert!(one_based >= 1, "column ordinals are 1-based");
        Self(one_based)
    }

    pub fn from_zero_based(index: usize) -> Self {
        Self(index + 1)
    }

    pub fn zero_based(self) -> usize {
        self.0 - 1
    }

    pub fn one_based(self) -> usize {
        self.0
    }

    /// Parses a `C-<n>` column name.
    pub fn parse_name(name: &str) -> Result<Self> {
        let Some(number) = name.strip_prefix("C-") else {
            bail!("column name '{name}' does not match the C-<n> convention");
        };
        let one_based: usize = number
            .parse()
            .with_context(|| format!("column name '{name}' has a non-numeric index"))?;
        if one_based == 0 {
            bail!("column name '{name}' is out of range; ordinals start at C-1");
        }
        Ok(Self(one_based))
    }
}

impl fmt::Display for ColumnOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// One positional field of the sample row, with its inferred physical layout.
///
/// Created once per sample-row scan and immutable thereafter.
#[derive(Debug, Clone)]
pub struct Column {
    pub ordinal: ColumnOrdinal,
    pub sample: String,
    /// Byte offset of the first sample byte within the row.
    pub start: usize,
    /// Byte offset of the last sample byte within the row.
    pub end: usize,
    pub size: usize,
    pub column_type: ColumnType,
    /// Digits after the decimal mark; meaningful for numeric types only.
    pub decimal_count: usize,
}

impl Column {
    pub fn name(&self) -> String {
        self.ordinal.to_string()
    }
}

/// JSON view of a column, matching the layout emitted by `describe`.
#[derive(Debug, Serialize)]
struct ColumnDump<'a> {
    name: String,
    sample: &'a str,
    idx_start: usize,
    idx_end: usize,
    size: usize,
    #[serde(rename = "type")]
    column_type: &'static str,
}

/// Ordered set of columns inferred from one sample row.
#[derive(Debug, Clone)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    /// Scans one sample row into positional columns.
    ///
    /// The row must already be stripped of its trailing newline. A trailing
    /// delimiter is appended when missing so the final column is classified
    /// on its raw trailing text; whitespace padding after the final
    /// delimiter is not a column.
    pub fn from_sample_row(row: &str, delimiter: char) -> Self {
        let owned;
        let row = if row.trim_end().ends_with(delimiter) {
            row
        } else {
            let mut appended = String::with_capacity(row.len() + 1);
            appended.push_str(row);
            appended.push(delimiter);
            owned = appended;
            &owned
        };

        let mut columns = Vec::new();
        let mut start = 0usize;
        for (pos, _) in row.match_indices(delimiter) {
            let sample = &row[start..pos];
            let classification = classify::classify(sample);
            columns.push(Column {
                ordinal: ColumnOrdinal::from_zero_based(columns.len()),
                sample: sample.to_string(),
                start,
                end: start + sample.len().saturating_sub(1),
                size: sample.len(),
                column_type: classification.column_type,
                decimal_count: classification.decimal_count,
            });
            start = pos + delimiter.len_utf8();
        }
        Schema { columns }
    }

    /// Samples the first row of `reader` and scans it.
    pub fn from_reader<R: BufRead>(mut reader: R, delimiter: char) -> Result<Self> {
        let mut row = String::new();
        let read = reader.read_line(&mut row).context("Reading sample row")?;
        if read == 0 {
            return Err(RecastError::Format("empty input, no row to sample".into()).into());
        }
        let row = row.trim_end_matches(['\n', '\r']);
        Ok(Self::from_sample_row(row, delimiter))
    }

    /// Samples the first row of the file at `path`.
    pub fn from_file(path: &Path, delimiter: char) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
        Self::from_reader(BufReader::new(file), delimiter)
            .with_context(|| format!("Sampling {path:?}"))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Writes the schema as a pretty-printed JSON array.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let dump: Vec<ColumnDump<'_>> = self
            .columns
            .iter()
            .map(|column| ColumnDump {
                name: column.name(),
                sample: &column.sample,
                idx_start: column.start,
                idx_end: column.end,
                size: column.size,
                column_type: column.column_type.token(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut writer, &dump).context("Writing schema JSON")?;
        writer.write_all(b"\n").context("Writing schema JSON")?;
        Ok(())
    }
}
