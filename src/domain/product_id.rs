//! Catalog product identifiers
//!
//! SlamJam PIDs are a fixed `J` prefix followed by a zero-padded
//! six-digit number (`J001000`). Sweeps build ids from numbers; on-demand
//! lookups accept either a full PID or a bare number.

/// Prefix shared by every catalog PID
pub const PID_PREFIX: char = 'J';

/// Width of the zero-padded numeric suffix
pub const PID_DIGITS: usize = 6;

/// Format a numeric id as a catalog PID
pub fn product_id(number: u32) -> String {
    format!("{PID_PREFIX}{number:0width$}", width = PID_DIGITS)
}

/// All PIDs from `start` to `end` inclusive, empty when `start > end`
pub fn pid_range(start: u32, end: u32) -> impl Iterator<Item = String> {
    (start..=end).map(product_id)
}

/// Accept `J001000` as-is and turn a bare `1000` into `J001000`
pub fn normalize_pid(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.parse::<u32>().ok().map(product_id);
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(product_id(1000), "J001000");
        assert_eq!(product_id(0), "J000000");
        assert_eq!(product_id(123_456), "J123456");
    }

    #[test]
    fn range_is_inclusive() {
        let ids: Vec<_> = pid_range(1000, 1002).collect();
        assert_eq!(ids, vec!["J001000", "J001001", "J001002"]);
        assert_eq!(pid_range(5, 4).count(), 0);
    }

    #[test]
    fn normalizes_lookup_input() {
        assert_eq!(normalize_pid("1000").as_deref(), Some("J001000"));
        assert_eq!(normalize_pid(" J205310 ").as_deref(), Some("J205310"));
        assert_eq!(normalize_pid("   "), None);
    }

    proptest! {
        #[test]
        fn six_digit_numbers_round_trip(n in 0u32..1_000_000) {
            let pid = product_id(n);
            prop_assert_eq!(pid.len(), 1 + PID_DIGITS);
            prop_assert!(pid.starts_with(PID_PREFIX));
            prop_assert_eq!(pid[1..].parse::<u32>().unwrap(), n);
        }
    }
}
