//! Australian Business Number checksum
//!
//! Subtract 1 from the first digit, weight the 11 digits by
//! `[10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19]`; the weighted sum of a valid
//! ABN is divisible by 89.

use thiserror::Error;

const WEIGHTS: [u32; 11] = [10, 1, 3, 5, 7, 9, 11, 13, 15, 17, 19];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbnError {
    #[error("ABN must be 11 digits, found {0}")]
    Length(usize),

    #[error("ABN may only contain digits and spaces")]
    Characters,

    #[error("ABN checksum does not match")]
    Checksum,
}

/// Validate an ABN, ignoring spaces. Returns the bare 11 digits.
pub fn validate_abn(input: &str) -> Result<String, AbnError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.chars().all(|c| c.is_ascii_digit()) {
        return Err(AbnError::Characters);
    }
    if compact.len() != 11 {
        return Err(AbnError::Length(compact.len()));
    }

    let sum: u32 = compact
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            let digit = if i == 0 { d.saturating_sub(1) } else { d };
            digit * WEIGHTS[i]
        })
        .sum();

    // A leading zero cannot be decremented
    if compact.starts_with('0') || sum % 89 != 0 {
        return Err(AbnError::Checksum);
    }
    Ok(compact)
}

pub fn is_valid_abn(input: &str) -> bool {
    validate_abn(input).is_ok()
}

/// Group as `XX XXX XXX XXX`
pub fn format_abn(digits: &str) -> String {
    if digits.len() != 11 || !digits.is_ascii() {
        return digits.to_string();
    }
    format!(
        "{} {} {} {}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..11]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_valid_abn() {
        assert_eq!(validate_abn("51 824 753 556").unwrap(), "51824753556");
        assert!(is_valid_abn("51824753556"));
    }

    #[test]
    fn test_checksum_failure() {
        assert_eq!(validate_abn("51 824 753 557"), Err(AbnError::Checksum));
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(validate_abn("5182475355"), Err(AbnError::Length(10)));
        assert_eq!(validate_abn("51-824-753-556"), Err(AbnError::Characters));
        assert_eq!(validate_abn(""), Err(AbnError::Length(0)));
    }

    #[test]
    fn test_format_abn() {
        assert_eq!(format_abn("51824753556"), "51 824 753 556");
        assert_eq!(format_abn("123"), "123");
    }
}
