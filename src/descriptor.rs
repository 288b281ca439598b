//! Persisted transformation descriptor ("format file").
//!
//! The descriptor is the sole contract between the diff and transform stages:
//! a JSON array with one object per column, each carrying a comma-joined
//! `changes` list (or the literal `none`) and `old=>new` payload strings for
//! `type`, `size`, and `nb_decs`. It is persisted to disk, frequently
//! hand-edited, and must round-trip. Embedded spaces inside values are
//! tolerated (`"10 => 12"` parses like `"10=>12"`).

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{classify::ColumnType, schema::ColumnOrdinal};

/// Which side of a text column to strip when its width shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripSide {
    Auto,
    Right,
    Left,
}

impl StripSide {
    pub fn letter(&self) -> &'static str {
        match self {
            StripSide::Auto => "A",
            StripSide::Right => "R",
            StripSide::Left => "L",
        }
    }

    pub fn parse(letter: &str) -> Result<Self> {
        Ok(match letter {
            "A" => StripSide::Auto,
            "R" => StripSide::Right,
            "L" => StripSide::Left,
            other => bail!("size_strip must be one of A, R, L; found '{other}'"),
        })
    }
}

/// One kind of per-column change. `move_before`/`move_after` are recognized
/// and validated but have no implementation in the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Ignore,
    Type,
    Size,
    NbDecs,
    MoveBefore,
    MoveAfter,
}

impl ChangeKind {
    /// Fixed application order within a single column.
    pub const APPLY_ORDER: [ChangeKind; 6] = [
        ChangeKind::Ignore,
        ChangeKind::Type,
        ChangeKind::Size,
        ChangeKind::NbDecs,
        ChangeKind::MoveBefore,
        ChangeKind::MoveAfter,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            ChangeKind::Ignore => "ignore",
            ChangeKind::Type => "type",
            ChangeKind::Size => "size",
            ChangeKind::NbDecs => "nb_decs",
            ChangeKind::MoveBefore => "move_before",
            ChangeKind::MoveAfter => "move_after",
        }
    }

    fn parse(token: &str) -> Result<Self> {
        Ok(match token {
            "ignore" => ChangeKind::Ignore,
            "type" => ChangeKind::Type,
            "size" => ChangeKind::Size,
            "nb_decs" => ChangeKind::NbDecs,
            "move_before" => ChangeKind::MoveBefore,
            "move_after" => ChangeKind::MoveAfter,
            other => bail!("unknown change kind '{other}'"),
        })
    }
}

/// Per-column change descriptor. An entry with no detected difference carries
/// no kinds and serializes as the sentinel `changes: "none"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub ordinal: ColumnOrdinal,
    /// Kinds present for this column, in wire order.
    pub kinds: Vec<ChangeKind>,
    pub type_change: Option<(ColumnType, ColumnType)>,
    pub size_change: Option<(usize, usize)>,
    pub decs_change: Option<(usize, usize)>,
    pub strip: Option<StripSide>,
    pub move_before: Option<ColumnOrdinal>,
    pub move_after: Option<ColumnOrdinal>,
}

impl ColumnChange {
    /// The `none` sentinel entry for a column without differences.
    pub fn none(ordinal: ColumnOrdinal) -> Self {
        Self {
            ordinal,
            kinds: Vec::new(),
            type_change: None,
            size_change: None,
            decs_change: None,
            strip: None,
            move_before: None,
            move_after: None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn has(&self, kind: ChangeKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn name(&self) -> String {
        self.ordinal.to_string()
    }
}

/// Raw wire shape of one descriptor entry.
#[derive(Debug, Serialize, Deserialize)]
struct RawChange {
    name: String,
    changes: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nb_decs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size_strip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    move_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    move_after: Option<String>,
}

/// Ordered mapping from column ordinal to [`ColumnChange`].
///
/// After [`Descriptor::back_fill`], every ordinal from 1 up to the real
/// column count of the target file is covered; the transform stage relies on
/// this to never silently drop trailing columns.
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    entries: Vec<ColumnChange>,
}

impl Descriptor {
    pub fn new(mut entries: Vec<ColumnChange>) -> Self {
        entries.sort_by_key(|entry| entry.ordinal);
        Self { entries }
    }

    pub fn entries(&self) -> &[ColumnChange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn highest_ordinal(&self) -> Option<ColumnOrdinal> {
        self.entries.iter().map(|entry| entry.ordinal).max()
    }

    /// Fills interior gaps and the trailing range up to `column_count` with
    /// `none` entries, leaving a dense ordinal range 1..=max.
    pub fn back_fill(&mut self, column_count: usize) {
        let highest = self
            .highest_ordinal()
            .map(ColumnOrdinal::one_based)
            .unwrap_or(0);
        let target = highest.max(column_count);
        let mut filled = Vec::with_capacity(target);
        let mut existing = std::mem::take(&mut self.entries).into_iter().peekable();
        for one_based in 1..=target {
            let ordinal = ColumnOrdinal::new(one_based);
            match existing.peek() {
                Some(entry) if entry.ordinal == ordinal => {
                    filled.push(existing.next().expect("peeked entry"));
                }
                _ => filled.push(ColumnChange::none(ordinal)),
            }
        }
        self.entries = filled;
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening format file {path:?}"))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing format file {path:?}"))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: Vec<RawChange> = serde_json::from_reader(reader).context("Parsing format JSON")?;
        let entries = raw
            .into_iter()
            .map(ColumnChange::try_from)
            .collect::<Result<Vec<_>>>()?;
        let descriptor = Self::new(entries);
        // Each ordinal owns exactly one entry; a hand-edit that repeats a
        // name would otherwise shadow later columns during back-fill.
        if let Some(pair) = descriptor
            .entries
            .windows(2)
            .find(|pair| pair[0].ordinal == pair[1].ordinal)
        {
            bail!("duplicate descriptor entry for column {}", pair[0].ordinal);
        }
        Ok(descriptor)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating format file {path:?}"))?;
        self.write_json(file)
    }

    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let raw: Vec<RawChange> = self.entries.iter().map(RawChange::from).collect();
        serde_json::to_writer_pretty(&mut writer, &raw).context("Writing format JSON")?;
        writer.write_all(b"\n").context("Writing format JSON")?;
        Ok(())
    }
}

impl TryFrom<RawChange> for ColumnChange {
    type Error = anyhow::Error;

    fn try_from(raw: RawChange) -> Result<Self> {
        // Hand-edited descriptors often carry spaces inside values.
        let name = strip_spaces(&raw.name);
        let ordinal = ColumnOrdinal::parse_name(&name)?;
        let changes = strip_spaces(&raw.changes);

        if changes == "none" {
            return Ok(ColumnChange::none(ordinal));
        }

        let validate = |result: Result<ColumnChange>| {
            result.with_context(|| format!("descriptor entry {name}"))
        };
        validate((|| {
            let kinds = changes
                .split(',')
                .map(ChangeKind::parse)
                .collect::<Result<Vec<_>>>()?;
            ensure!(!kinds.is_empty(), "empty changes list");

            // Non-sentinel entries always carry the type and size pairs.
            let type_value = raw
                .type_change
                .as_deref()
                .map(strip_spaces)
                .context("missing 'type' value")?;
            let type_change = Some(parse_type_pair(&type_value)?);
            let size_value = raw
                .size
                .as_deref()
                .map(strip_spaces)
                .context("missing 'size' value")?;
            let size_change = Some(parse_int_pair(&size_value).context("bad 'size' value")?);

            let decs_change = raw
                .nb_decs
                .as_deref()
                .map(strip_spaces)
                .map(|value| parse_int_pair(&value).context("bad 'nb_decs' value"))
                .transpose()?;
            let strip = raw
                .size_strip
                .as_deref()
                .map(strip_spaces)
                .map(|letter| StripSide::parse(&letter))
                .transpose()?;
            let move_before = raw
                .move_before
                .as_deref()
                .map(strip_spaces)
                .map(|target| ColumnOrdinal::parse_name(&target))
                .transpose()?;
            let move_after = raw
                .move_after
                .as_deref()
                .map(strip_spaces)
                .map(|target| ColumnOrdinal::parse_name(&target))
                .transpose()?;

            if kinds.contains(&ChangeKind::NbDecs) {
                ensure!(decs_change.is_some(), "missing 'nb_decs' value");
            }
            if let Some((old, new)) = type_change
                && matches!(
                    (old, new),
                    (ColumnType::NumPacked4, ColumnType::Num) | (ColumnType::Num, ColumnType::Num)
                )
                && kinds.contains(&ChangeKind::Type)
            {
                ensure!(
                    decs_change.is_some(),
                    "numeric type change requires an 'nb_decs' value"
                );
            }
            if kinds.contains(&ChangeKind::MoveBefore) {
                ensure!(move_before.is_some(), "missing 'move_before' value");
            }
            if kinds.contains(&ChangeKind::MoveAfter) {
                ensure!(move_after.is_some(), "missing 'move_after' value");
            }

            Ok(ColumnChange {
                ordinal,
                kinds,
                type_change,
                size_change,
                decs_change,
                strip,
                move_before,
                move_after,
            })
        })())
    }
}

impl From<&ColumnChange> for RawChange {
    fn from(change: &ColumnChange) -> Self {
        if change.is_none() {
            return RawChange {
                name: change.name(),
                changes: "none".to_string(),
                type_change: None,
                size: None,
                nb_decs: None,
                size_strip: None,
                move_before: None,
                move_after: None,
            };
        }
        RawChange {
            name: change.name(),
            changes: change.kinds.iter().map(ChangeKind::token).join(", "),
            type_change: change
                .type_change
                .map(|(old, new)| format!("{old}=>{new}")),
            size: change.size_change.map(|(old, new)| format!("{old}=>{new}")),
            nb_decs: change.decs_change.map(|(old, new)| format!("{old}=>{new}")),
            size_strip: change.strip.map(|side| side.letter().to_string()),
            move_before: change.move_before.map(|target| target.to_string()),
            move_after: change.move_after.map(|target| target.to_string()),
        }
    }
}

fn strip_spaces(value: &str) -> String {
    value.chars().filter(|c| *c != ' ').collect()
}

fn split_pair(value: &str) -> Result<(&str, &str)> {
    value
        .split_once("=>")
        .with_context(|| format!("'{value}' is not an old=>new pair"))
}

fn parse_int_pair(value: &str) -> Result<(usize, usize)> {
    let (old, new) = split_pair(value)?;
    Ok((
        old.parse()
            .with_context(|| format!("'{old}' is not an integer"))?,
        new.parse()
            .with_context(|| format!("'{new}' is not an integer"))?,
    ))
}

fn parse_type_pair(value: &str) -> Result<(ColumnType, ColumnType)> {
    let (old, new) = split_pair(value)?;
    Ok((old.parse()?, new.parse()?))
}
