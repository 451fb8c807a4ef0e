//! Phone number utilities

use regex::Regex;
use once_cell::sync::Lazy;

// International phone number regex (E.164 format)
static E164_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 pattern")
});

/// Number of leading characters kept visible when masking (`+8491`)
const MASK_VISIBLE_PREFIX: usize = 5;

/// Number of trailing digits kept visible when masking
const MASK_VISIBLE_SUFFIX: usize = 4;

/// Shorter inputs are not phone numbers worth masking
const MIN_MASKABLE_LEN: usize = 8;

/// Normalize a phone number by removing common formatting characters
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check if a phone number is already in canonical E.164 form
pub fn is_e164(phone: &str) -> bool {
    E164_REGEX.is_match(phone)
}

/// Mask a phone number for logs and responses (e.g., +8491***5678)
///
/// Numbers too short to mask meaningfully are returned unchanged.
pub fn mask_phone_number(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < MIN_MASKABLE_LEN {
        return phone.to_string();
    }

    // always hide at least one character between prefix and suffix
    let prefix_len = MASK_VISIBLE_PREFIX.min(chars.len() - MASK_VISIBLE_SUFFIX - 1);
    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[chars.len() - MASK_VISIBLE_SUFFIX..].iter().collect();
    format!("{}***{}", prefix, suffix)
}
