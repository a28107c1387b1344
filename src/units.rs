//! Decimal amount conversion
//!
//! User input and display values are decimal strings ("1.5"), on-chain values
//! are raw integers scaled by the token's precision. All conversion happens
//! on `U256` so large balances never pass through floating point.

use alloy_primitives::U256;
use thiserror::Error;

/// Precision of the native currency as seen through the EVM relay
pub const NATIVE_DECIMALS: u8 = 18;

/// Precision of vault share tokens
pub const SHARE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("invalid amount \"{0}\"")]
    Invalid(String),

    #[error("amount must not be negative: \"{0}\"")]
    Negative(String),

    #[error("amount \"{0}\" does not fit in 256 bits")]
    Overflow(String),
}

/// 10^decimals
pub fn scale(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Parse a decimal string into a raw integer with `decimals` precision.
///
/// Empty input is zero. Digits past the token precision are truncated, the
/// same way a floor of `amount * 10^decimals` would behave.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, UnitsError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    if trimmed.starts_with('-') {
        return Err(UnitsError::Negative(trimmed.to_string()));
    }

    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(UnitsError::Invalid(trimmed.to_string()));
    }

    let overflow = || UnitsError::Overflow(trimmed.to_string());

    let int_value = if int_part.is_empty() {
        U256::ZERO
    } else {
        int_part.parse::<U256>().map_err(|_| overflow())?
    };

    let decimals_usize = decimals as usize;
    let mut frac_digits: String = frac_part.chars().take(decimals_usize).collect();
    while frac_digits.len() < decimals_usize {
        frac_digits.push('0');
    }
    let frac_value = if frac_digits.is_empty() {
        U256::ZERO
    } else {
        frac_digits.parse::<U256>().map_err(|_| overflow())?
    };

    int_value
        .checked_mul(scale(decimals))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(overflow)
}

/// Render a raw integer as an exact decimal string with trailing zeros removed.
pub fn format_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let unit = scale(decimals);
    let int_part = raw / unit;
    let frac_part = raw % unit;

    if frac_part.is_zero() {
        return int_part.to_string();
    }

    let frac = format!("{:0>width$}", frac_part.to_string(), width = decimals as usize);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

/// Render a raw integer with exactly `places` fractional digits (truncated).
pub fn format_fixed(raw: U256, decimals: u8, places: u8) -> String {
    let unit = scale(decimals);
    let int_part = raw / unit;

    if places == 0 {
        return int_part.to_string();
    }

    let frac = if decimals == 0 {
        String::new()
    } else {
        format!("{:0>width$}", (raw % unit).to_string(), width = decimals as usize)
    };

    let mut shown: String = frac.chars().take(places as usize).collect();
    while shown.len() < places as usize {
        shown.push('0');
    }

    format!("{}.{}", int_part, shown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_units("5", 18).unwrap(), U256::from(5u64) * scale(18));
        assert_eq!(parse_units("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units(".25", 2).unwrap(), U256::from(25u64));
        assert_eq!(parse_units("3.", 2).unwrap(), U256::from(300u64));
        assert_eq!(parse_units("", 8).unwrap(), U256::ZERO);
        assert_eq!(parse_units("  42 ", 0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_parse_truncates_excess_precision() {
        // 6-decimal token, 8 digits supplied
        assert_eq!(parse_units("0.12345678", 6).unwrap(), U256::from(123_456u64));
        assert_eq!(parse_units("0.0000001", 6).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_units("-1", 18), Err(UnitsError::Negative(_))));
        assert!(matches!(parse_units("abc", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1.2.3", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units(".", 18), Err(UnitsError::Invalid(_))));
        assert!(matches!(parse_units("1e18", 18), Err(UnitsError::Invalid(_))));
    }

    #[test]
    fn test_format_units_trims() {
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_units(U256::from(100u64) * scale(18), 18), "100");
        assert_eq!(format_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(format_units(U256::from(50u64), 0), "50");
        assert_eq!(format_units(U256::from(1u64), 18), "0.000000000000000001");
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(U256::from(1_234_567u64), 6, 2), "1.23");
        assert_eq!(format_fixed(U256::from(5u64), 0, 6), "5.000000");
        assert_eq!(format_fixed(U256::ZERO, 18, 6), "0.000000");
        assert_eq!(format_fixed(U256::from(7u64), 1, 0), "0");
    }

    #[test]
    fn test_parse_format_agree_on_full_precision() {
        let raw = "123456789012345678901234567890".parse::<U256>().unwrap();
        let text = format_units(raw, 18);
        assert_eq!(assert_ok!(parse_units(&text, 18)), raw);
    }
}
