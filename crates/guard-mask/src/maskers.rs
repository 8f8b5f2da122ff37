//! Format-aware masking shapes
//!
//! Canonical redaction shapes for the common value formats. Classifiers
//! call these so their `masked_value` output and the engine's convenience
//! surface never disagree. Every shape produced here contains at least one
//! mask character and fails the pattern that detected the original value,
//! which is what keeps re-scans of masked text quiet.

use sha2::{Digest, Sha256};

/// Keep `prefix` leading and `suffix` trailing characters, mask the interior
///
/// The interior is always at least 3 mask characters. If the preserved
/// regions would cover the whole value, the whole value is masked instead.
pub fn partial(value: &str, prefix: usize, suffix: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if prefix + suffix >= chars.len() {
        return "*".repeat(chars.len());
    }
    let interior = (chars.len() - prefix - suffix).max(3);
    let head: String = chars[..prefix].iter().collect();
    let tail: String = chars[chars.len() - suffix..].iter().collect();
    format!("{}{}{}", head, "*".repeat(interior), tail)
}

/// Mask an email address, keeping the domain: `***@example.com`
pub fn mask_email(value: &str) -> String {
    match value.find('@') {
        Some(idx) => format!("***@{}", &value[idx + 1..]),
        None => "***@***".to_string(),
    }
}

/// Mask a payment card number, keeping separators and the last 4 digits
///
/// `4111-1111-1111-1111` becomes `****-****-****-1111`; an unseparated
/// 16-digit number becomes `************1111`.
pub fn mask_card(value: &str) -> String {
    let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count <= 4 {
        return "*".repeat(value.chars().count());
    }
    let mut remaining = digit_count;
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                remaining -= 1;
                if remaining < 4 {
                    c
                } else {
                    '*'
                }
            } else {
                c
            }
        })
        .collect()
}

/// Mask an IBAN, keeping the country code and the last 4 characters
pub fn mask_iban(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 6), tail)
}

/// Mask a phone number, keeping the dialing prefix and the last 4 digits
///
/// Digit positions between the prefix and the final 4 digits become `*`
/// while separators keep their place: `+49 170 1234567` becomes
/// `+49 *** ***4567`.
pub fn mask_phone(value: &str) -> String {
    let digit_positions: Vec<usize> = value
        .char_indices()
        .filter(|(_, c)| c.is_ascii_digit())
        .map(|(i, _)| i)
        .collect();
    if digit_positions.len() <= 4 {
        return "*".repeat(value.chars().count());
    }

    // Dialing prefix: a leading '+' and up to three country-code digits
    let prefix_end = if value.starts_with('+') {
        let mut end = 1;
        for &pos in digit_positions.iter().take(3) {
            if pos == end {
                end = pos + 1;
            } else {
                break;
            }
        }
        end
    } else {
        0
    };

    let keep_from = digit_positions[digit_positions.len() - 4];
    value
        .char_indices()
        .map(|(i, c)| {
            if i < prefix_end || i >= keep_from || !c.is_ascii_digit() {
                c
            } else {
                '*'
            }
        })
        .collect()
}

/// Mask digits in place, keeping only the trailing `keep` digits
pub fn mask_digits_keep_last(value: &str, keep: usize) -> String {
    let digit_count = value.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count <= keep {
        return "*".repeat(value.chars().count());
    }
    let mut remaining = digit_count;
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                remaining -= 1;
                if remaining < keep {
                    c
                } else {
                    '*'
                }
            } else {
                c
            }
        })
        .collect()
}

/// Stable fingerprint mask: `[HASH:a1b2c3d4]`
///
/// The same input always yields the same tag, so correlating repeated
/// values stays possible without retaining them.
pub fn hash_mask(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    format!("[HASH:{}]", &hex::encode(digest)[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_basic() {
        assert_eq!(partial("4532015112830366", 0, 4), "************0366");
        assert_eq!(partial("DE89370400440532013000", 2, 4), "DE****************3000");
    }

    #[test]
    fn test_partial_short_value_fully_masked() {
        assert_eq!(partial("abcd", 2, 2), "****");
        assert_eq!(partial("abc", 4, 4), "***");
    }

    #[test]
    fn test_partial_minimum_interior() {
        // 6 chars with 2+2 preserved leaves only 2 interior chars, padded to 3
        assert_eq!(partial("abcdef", 2, 2), "ab***ef");
    }

    #[test]
    fn test_mask_email_keeps_domain() {
        assert_eq!(mask_email("alice@example.com"), "***@example.com");
        assert_eq!(mask_email("not-an-email"), "***@***");
    }

    #[test]
    fn test_mask_card_shapes() {
        assert_eq!(mask_card("4111-1111-1111-1111"), "****-****-****-1111");
        assert_eq!(mask_card("4532015112830366"), "************0366");
        assert_eq!(mask_card("1234"), "****");
    }

    #[test]
    fn test_mask_iban() {
        assert_eq!(mask_iban("DE89370400440532013000"), "DE****************3000");
        assert_eq!(mask_iban("DE8937"), "******");
    }

    #[test]
    fn test_mask_phone_international() {
        assert_eq!(mask_phone("+49 170 1234567"), "+49 *** ***4567");
    }

    #[test]
    fn test_mask_phone_domestic() {
        assert_eq!(mask_phone("555-123-4567"), "***-***-4567");
        assert_eq!(mask_phone("1234"), "****");
    }

    #[test]
    fn test_mask_digits_keep_last() {
        assert_eq!(mask_digits_keep_last("12345678", 2), "******78");
        assert_eq!(mask_digits_keep_last("12", 4), "**");
    }

    #[test]
    fn test_hash_mask_stable() {
        let a = hash_mask("secret-value");
        let b = hash_mask("secret-value");
        assert_eq!(a, b);
        assert!(a.starts_with("[HASH:"));
        assert_eq!(a.len(), "[HASH:]".len() + 8);
        assert_ne!(a, hash_mask("other-value"));
    }
}
