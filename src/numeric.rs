//! Fixed-width signed display-decimal re-encoding.
//!
//! Values follow the mainframe display-numeric convention: a fixed total
//! width, an implied decimal mark at `width - decimals - 1`, at most one
//! leading sign. Re-encoding renders the same quantity into a new
//! width/decimals layout, truncating (never rounding) excess fractional
//! digits. The emitted decimal mark is `,`, matching the export convention.

use crate::error::RecastError;

/// Re-encodes one fixed-width decimal value from the old layout into the new.
///
/// A value that is blank once marks, signs, and whitespace are stripped
/// encodes an absent/zero quantity and maps to `size_new` spaces without any
/// further validation.
pub fn reencode(
    column: &str,
    value: &str,
    size_old: usize,
    size_new: usize,
    decs_old: usize,
    decs_new: usize,
) -> Result<String, RecastError> {
    let normalized = value.replace(',', ".");

    let is_blank = normalized
        .chars()
        .all(|c| c == '.' || c == '-' || c.is_whitespace());
    if is_blank {
        return Ok(" ".repeat(size_new));
    }

    let fail = |reason: &str| RecastError::Validation {
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if normalized.len() != size_old {
        return Err(fail(&format!(
            "expected {size_old} byte(s), found {}",
            normalized.len()
        )));
    }
    if normalized.matches('.').count() != 1 {
        return Err(fail("expected exactly one decimal mark"));
    }
    if decs_old + 1 > size_old {
        return Err(fail("decimal count exceeds the old width"));
    }
    let mark = size_old - decs_old - 1;
    if normalized.as_bytes()[mark] != b'.' {
        return Err(fail(&format!("decimal mark is not at offset {mark}")));
    }
    if normalized.matches('-').count() > 1 {
        return Err(fail("more than one sign character"));
    }

    let negative = normalized[..mark].contains('-');
    let integer_raw = match normalized[..mark].find('-') {
        Some(sign) => &normalized[sign + 1..mark],
        None => &normalized[..mark],
    };
    let fraction_raw = &normalized[mark + 1..];

    let mut integer = integer_raw.trim().trim_start_matches('0');
    if integer.is_empty() {
        integer = "0";
    }
    let mut fraction = fraction_raw.trim();
    if fraction.is_empty() {
        fraction = "0";
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("integer part contains non-digits"));
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(fail("fractional part contains non-digits"));
    }

    // One slot for the decimal mark, one for the sign/space column.
    let integer_slot = size_new as isize - 2 - decs_new as isize;
    let integer_pad = integer_slot - integer.len() as isize;
    // A positive integer part may spill into the sign column when it fills
    // the width exactly.
    let exact_fit = integer_pad == -1 && !negative;
    if integer_pad < 0 && !exact_fit {
        return Err(fail(&format!(
            "value does not fit a width of {size_new} with {decs_new} decimal(s)"
        )));
    }

    let fraction = if fraction.len() < decs_new {
        let mut padded = String::from(fraction);
        padded.extend(std::iter::repeat_n('0', decs_new - padded.len()));
        padded
    } else {
        fraction[..decs_new].to_string()
    };

    let mut out = String::with_capacity(size_new);
    if exact_fit {
        out.push_str(integer);
    } else {
        out.push(if negative { '-' } else { ' ' });
        out.extend(std::iter::repeat_n('0', integer_pad as usize));
        out.push_str(integer);
    }
    out.push(',');
    out.push_str(&fraction);
    debug_assert_eq!(out.len(), size_new);
    Ok(out)
}
