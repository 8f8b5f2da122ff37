//! Checksum and structural validators used for confidence scoring.
//!
//! Every function here is pure and allocation-free where possible.
//! Validators never reject a candidate outright; classifiers use them
//! to move confidence up or down so that a failed checksum still shows
//! up as a low-confidence match.

/// Luhn check over the digits of `value`. Non-digit characters
/// (spaces, dashes) are skipped so formatted card numbers validate.
pub fn luhn_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 12 || digits.len() > 19 {
        return false;
    }
    let mut sum = 0u32;
    for (i, d) in digits.iter().rev().enumerate() {
        let mut d = *d;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// IBAN validation per ISO 13616: rearrange, expand letters to
/// numbers and check the big-integer value mod 97 equals 1. The
/// remainder is computed digit-by-digit to avoid arbitrary precision.
pub fn iban_valid(value: &str) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    if cleaned.len() < 15 || cleaned.len() > 34 {
        return false;
    }
    if !cleaned[..2].chars().all(|c| c.is_ascii_uppercase()) {
        return false;
    }
    if !cleaned[2..4].chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let rearranged = format!("{}{}", &cleaned[4..], &cleaned[..4]);
    let mut remainder = 0u64;
    for c in rearranged.chars() {
        let n = match c.to_digit(36) {
            Some(n) => n as u64,
            None => return false,
        };
        // Letters expand to two digits (A=10), digits to one.
        remainder = if n < 10 {
            (remainder * 10 + n) % 97
        } else {
            (remainder * 100 + n) % 97
        };
    }
    remainder == 1
}

/// Structural SSN validation: area 001-899 excluding 666, group and
/// serial non-zero. Expects the dashed `AAA-GG-SSSS` form.
pub fn ssn_valid(value: &str) -> bool {
    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() != 3 || parts[0].len() != 3 || parts[1].len() != 2 || parts[2].len() != 4 {
        return false;
    }
    let area: u32 = match parts[0].parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    let group: u32 = match parts[1].parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    let serial: u32 = match parts[2].parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    area > 0 && area != 666 && area < 900 && group > 0 && serial > 0
}

/// ABA routing number checksum: weighted sum (3, 7, 1 repeating) over
/// nine digits must be a non-zero multiple of ten.
pub fn aba_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 9 {
        return false;
    }
    let weights = [3u32, 7, 1, 3, 7, 1, 3, 7, 1];
    let sum: u32 = digits.iter().zip(weights.iter()).map(|(d, w)| d * w).sum();
    sum != 0 && sum % 10 == 0
}

/// NPI validation: Luhn over the 10-digit identifier with the `80840`
/// country prefix the standard prescribes.
pub fn npi_valid(value: &str) -> bool {
    if value.len() != 10 || !value.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    luhn_valid(&format!("80840{value}"))
}

/// DEA registration number check digit: first letter is a registrant
/// type code, and `(d1+d3+d5) + 2*(d2+d4+d6)` must end in the seventh
/// digit.
pub fn dea_valid(value: &str) -> bool {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() != 9 {
        return false;
    }
    if !chars[0].is_ascii_uppercase() || !chars[1].is_ascii_uppercase() {
        return false;
    }
    let digits: Vec<u32> = match chars[2..].iter().map(|c| c.to_digit(10)).collect() {
        Some(d) => d,
        None => return false,
    };
    let odd = digits[0] + digits[2] + digits[4];
    let even = digits[1] + digits[3] + digits[5];
    (odd + even * 2) % 10 == digits[6]
}

/// Shannon entropy in bits per byte. Random tokens sit near 4.5-6.0,
/// English prose near 3.5-4.5, repeated filler well below that.
pub fn shannon_entropy(value: &str) -> f64 {
    if value.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for b in value.bytes() {
        counts[b as usize] += 1;
    }
    let len = value.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Heuristic for machine-generated secrets: mixed character classes
/// and a high alphanumeric ratio, unlike natural-language words.
pub fn is_secret_like(value: &str) -> bool {
    if value.len() < 8 {
        return false;
    }
    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut alnum = 0usize;
    for c in value.chars() {
        if c.is_ascii_uppercase() {
            has_upper = true;
        } else if c.is_ascii_lowercase() {
            has_lower = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        }
        if c.is_ascii_alphanumeric() {
            alnum += 1;
        }
    }
    let classes = [has_upper, has_lower, has_digit]
        .iter()
        .filter(|&&b| b)
        .count();
    classes >= 2 && alnum * 10 >= value.chars().count() * 7
}

/// Well-known or private-range addresses that rarely identify a person.
pub fn is_common_ip(value: &str) -> bool {
    matches!(
        value,
        "127.0.0.1" | "0.0.0.0" | "255.255.255.255" | "1.1.1.1" | "8.8.8.8" | "8.8.4.4"
    ) || value.starts_with("10.")
        || value.starts_with("192.168.")
        || value.starts_with("172.16.")
        || value.starts_with("169.254.")
}
