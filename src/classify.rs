//! Column type classification heuristics.
//!
//! A column's type is a pure function of its sample text. The checks run in
//! strict priority order so that the fixed 27-byte packed-decimal display
//! form wins over the generic numeric pattern it would otherwise also match:
//!
//! 1. wider than 29 bytes → `Text` (no numeric/date heuristics attempted)
//! 2. blank → `Unknown`
//! 3. `YYYYMMDD` → `Date8`
//! 4. `YYYY-MM-DD` → `DateIso`
//! 5. 27 bytes with the decimal mark at offset 16 → `NumPacked4`
//! 6. generic signed decimal → `Num`
//! 7. everything else → `Text`
//!
//! Classification never fails; ambiguity is data, not an error.

use std::{fmt, str::FromStr, sync::LazyLock};

use anyhow::bail;
use regex::Regex;

/// Samples wider than this are always text; no heuristic applies.
pub const TEXT_WIDTH_CEILING: usize = 29;
/// Total width of the packed-decimal display form.
pub const PACKED_WIDTH: usize = 27;
/// Absolute byte offset of the decimal mark within a packed value.
pub const PACKED_MARK_POS: usize = 16;

static DATE_8_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[12]\d{3}[01]\d[0123]\d$").expect("date8 pattern"));
static DATE_ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[12]\d{3}-[01]\d-[0123]\d$").expect("iso date pattern"));
static PACKED_BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d.]*$").expect("packed body pattern"));
static NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d[\d.]*$").expect("numeric pattern"));

/// Closed set of column types inferable from one sample value.
///
/// The `Display`/`FromStr` tokens are the on-disk vocabulary of schema dumps
/// and transformation descriptors and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Blank or unclassifiable sample.
    Unknown,
    /// Fixed 27-byte signed-decimal display form with the mark at offset 16.
    NumPacked4,
    /// `YYYYMMDD`.
    Date8,
    Text,
    /// Generic signed decimal with variable width and decimals.
    Num,
    /// `YYYY-MM-DD`.
    DateIso,
}

impl ColumnType {
    pub fn token(&self) -> &'static str {
        match self {
            ColumnType::Unknown => "T_UNKNOW",
            ColumnType::NumPacked4 => "T_NUM_V4",
            ColumnType::Date8 => "T_DATE_8",
            ColumnType::Text => "T_TEXT",
            ColumnType::Num => "T_NUM",
            ColumnType::DateIso => "T_DATE_DB2",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Ok(match token {
            "T_UNKNOW" => ColumnType::Unknown,
            "T_NUM_V4" => ColumnType::NumPacked4,
            "T_DATE_8" => ColumnType::Date8,
            "T_TEXT" => ColumnType::Text,
            "T_NUM" => ColumnType::Num,
            "T_DATE_DB2" => ColumnType::DateIso,
            other => bail!("unknown column type token '{other}'"),
        })
    }
}

/// Result of classifying one sample value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub column_type: ColumnType,
    /// Digits after the decimal mark; zero unless the type is numeric.
    pub decimal_count: usize,
}

/// Classifies a single column sample.
pub fn classify(sample: &str) -> Classification {
    if sample.len() > TEXT_WIDTH_CEILING {
        return Classification {
            column_type: ColumnType::Text,
            decimal_count: 0,
        };
    }
    if sample.trim().is_empty() {
        return Classification {
            column_type: ColumnType::Unknown,
            decimal_count: 0,
        };
    }
    if sample.len() == 8 && DATE_8_RE.is_match(sample) {
        return Classification {
            column_type: ColumnType::Date8,
            decimal_count: 0,
        };
    }
    if sample.len() == 10 && DATE_ISO_RE.is_match(sample) {
        return Classification {
            column_type: ColumnType::DateIso,
            decimal_count: 0,
        };
    }
    if is_packed(sample) {
        return Classification {
            column_type: ColumnType::NumPacked4,
            decimal_count: decimal_count(sample),
        };
    }
    if is_num(sample) {
        return Classification {
            column_type: ColumnType::Num,
            decimal_count: decimal_count(sample),
        };
    }
    Classification {
        column_type: ColumnType::Text,
        decimal_count: 0,
    }
}

/// Digits after the last decimal mark in the sample, with the first `,`
/// normalized to `.` beforehand.
pub fn decimal_count(sample: &str) -> usize {
    let normalized = sample.replacen(',', ".", 1);
    match normalized.rfind('.') {
        Some(idx) => normalized.len() - idx - 1,
        None => 0,
    }
}

fn is_packed(sample: &str) -> bool {
    if sample.len() != PACKED_WIDTH {
        return false;
    }
    let normalized = sample.replacen(',', ".", 1);
    if normalized.as_bytes()[PACKED_MARK_POS] != b'.' {
        return false;
    }
    let unsigned = normalized.replacen('-', " ", 1);
    let body = unsigned.trim();
    // An all-blank remainder is an encoded zero/blank numeric.
    body.is_empty() || PACKED_BODY_RE.is_match(body)
}

fn is_num(sample: &str) -> bool {
    let normalized = sample.replacen(',', ".", 1);
    let unsigned = normalized.replacen('-', " ", 1);
    let body = unsigned.trim();
    if body.matches('.').count() != 1 {
        return false;
    }
    NUM_RE.is_match(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_of(sample: &str) -> ColumnType {
        classify(sample).column_type
    }

    #[test]
    fn oversized_samples_are_text() {
        let sample = "X".repeat(TEXT_WIDTH_CEILING + 1);
        assert_eq!(type_of(&sample), ColumnType::Text);
        // Even when the content would otherwise look numeric.
        let numeric = format!("{},00", "1".repeat(28));
        assert_eq!(type_of(&numeric), ColumnType::Text);
    }

    #[test]
    fn blank_samples_are_unknown() {
        for sample in ["", " ", "          "] {
            let cls = classify(sample);
            assert_eq!(cls.column_type, ColumnType::Unknown);
            assert_eq!(cls.decimal_count, 0);
        }
    }

    #[test]
    fn compact_dates_are_detected() {
        assert_eq!(type_of("20230401"), ColumnType::Date8);
        assert_eq!(type_of("19991231"), ColumnType::Date8);
        // Century digit outside [12] falls through.
        assert_eq!(type_of("30230401"), ColumnType::Text);
    }

    #[test]
    fn iso_dates_are_detected() {
        assert_eq!(type_of("2023-04-01"), ColumnType::DateIso);
        assert_eq!(type_of("2023/04/01"), ColumnType::Text);
    }

    #[test]
    fn packed_form_needs_width_and_mark_position() {
        let packed = "        123456789,1234567890";
        assert_eq!(packed.len(), 28);
        // One byte too wide: generic numeric instead.
        assert_eq!(type_of(packed), ColumnType::Num);

        let packed = "       123456789,1234567890";
        assert_eq!(packed.len(), PACKED_WIDTH);
        let cls = classify(packed);
        assert_eq!(cls.column_type, ColumnType::NumPacked4);
        assert_eq!(cls.decimal_count, 10);
    }

    #[test]
    fn packed_form_accepts_sign_and_blank_body() {
        let negative = "      -123456789,1234567890";
        assert_eq!(negative.len(), PACKED_WIDTH);
        assert_eq!(type_of(negative), ColumnType::NumPacked4);

        let blank = format!("{:16}.{:10}", "", "");
        assert_eq!(blank.len(), PACKED_WIDTH);
        assert_eq!(type_of(&blank), ColumnType::NumPacked4);
    }

    #[test]
    fn generic_numbers_are_detected() {
        let cls = classify("0001234,56");
        assert_eq!(cls.column_type, ColumnType::Num);
        assert_eq!(cls.decimal_count, 2);

        let cls = classify("-12.5");
        assert_eq!(cls.column_type, ColumnType::Num);
        assert_eq!(cls.decimal_count, 1);
    }

    #[test]
    fn integers_without_a_mark_are_text() {
        // No decimal mark means no numeric classification.
        assert_eq!(type_of("123456"), ColumnType::Text);
    }

    #[test]
    fn free_text_falls_through() {
        assert_eq!(type_of("HELLO WORLD"), ColumnType::Text);
        assert_eq!(type_of("12A34,5"), ColumnType::Text);
        assert_eq!(type_of("1,2,3"), ColumnType::Text);
    }

    #[test]
    fn decimal_count_uses_last_mark() {
        assert_eq!(decimal_count("0001234,56"), 2);
        assert_eq!(decimal_count("123.4567"), 4);
        assert_eq!(decimal_count("123456"), 0);
    }

    #[test]
    fn tokens_round_trip() {
        for column_type in [
            ColumnType::Unknown,
            ColumnType::NumPacked4,
            ColumnType::Date8,
            ColumnType::Text,
            ColumnType::Num,
            ColumnType::DateIso,
        ] {
            let parsed: ColumnType = column_type.token().parse().expect("token parses");
            assert_eq!(parsed, column_type);
        }
        assert!("T_BOGUS".parse::<ColumnType>().is_err());
    }
}
