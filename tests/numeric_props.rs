//! Property tests for the fixed-width decimal re-encoder.

use csv_recast::numeric::reencode;
use proptest::prelude::*;

/// Builds the canonical display form for a value in the given layout:
/// sign column, zero-padded integer digits, mark, fractional digits.
fn canonical(int_slot: usize, decs: usize, int_value: u64, frac_value: u64, negative: bool) -> String {
    format!(
        "{}{:0int_slot$},{:0decs$}",
        if negative { '-' } else { ' ' },
        int_value,
        frac_value,
    )
}

proptest! {
    #[test]
    fn reencoding_into_the_same_layout_is_idempotent(
        int_slot in 1usize..=9,
        decs in 1usize..=6,
        int_value in 0u64..1_000_000_000,
        frac_value in 0u64..1_000_000,
        negative in any::<bool>(),
    ) {
        let int_value = int_value % 10u64.pow(int_slot as u32);
        let frac_value = frac_value % 10u64.pow(decs as u32);
        let value = canonical(int_slot, decs, int_value, frac_value, negative);
        let width = value.len();
        prop_assert_eq!(width, int_slot + decs + 2);

        let once = reencode("C-1", &value, width, width, decs, decs).unwrap();
        prop_assert_eq!(&once, &value);
        let twice = reencode("C-1", &once, width, width, decs, decs).unwrap();
        prop_assert_eq!(&twice, &once);
    }

    #[test]
    fn widening_preserves_all_digits(
        int_slot in 1usize..=6,
        decs in 1usize..=4,
        extra_int in 1usize..=3,
        extra_decs in 1usize..=3,
        int_value in 0u64..1_000_000,
        frac_value in 0u64..10_000,
        negative in any::<bool>(),
    ) {
        let int_value = int_value % 10u64.pow(int_slot as u32);
        let frac_value = frac_value % 10u64.pow(decs as u32);
        let value = canonical(int_slot, decs, int_value, frac_value, negative);
        let width = value.len();
        let new_width = width + extra_int + extra_decs;
        let new_decs = decs + extra_decs;

        let widened = reencode("C-1", &value, width, new_width, decs, new_decs).unwrap();
        prop_assert_eq!(widened.len(), new_width);
        let expected = canonical(
            int_slot + extra_int,
            new_decs,
            int_value,
            frac_value * 10u64.pow(extra_decs as u32),
            negative,
        );
        prop_assert_eq!(widened, expected);
    }

    #[test]
    fn truncation_never_rounds(
        frac in 100u64..1_000,
    ) {
        // Three fractional digits reduced to one: the emitted digit is the
        // first one, regardless of what follows it.
        let value = format!(" 0001,{frac:03}");
        let out = reencode("C-1", &value, 9, 7, 3, 1).unwrap();
        let first_digit = value.as_bytes()[6] as char;
        prop_assert_eq!(out, format!(" 0001,{first_digit}"));
    }
}
