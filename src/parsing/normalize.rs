//! Text normalization for scraped values
//!
//! Listing and detail pages mix currency symbols, thousand separators and
//! unit suffixes ("km", "€", "cv") freely, so numeric fields are reduced to
//! their decimal digits instead of being parsed per field.

use regex::Regex;
use std::sync::OnceLock;

/// Keeps only the decimal digits of `text`, as ASCII
///
/// Any Unicode decimal digit counts ("٣٤٥", "１２"), so the result always
/// parses as a number. Returns "0" when nothing is left, which covers empty
/// input and the "N/A" sentinel.
///
/// # Example
///
/// ```
/// use carros_crawler::parsing::digits_only;
///
/// assert_eq!(digits_only("12.500 km"), "12500");
/// assert_eq!(digits_only("€ 8.750"), "8750");
/// assert_eq!(digits_only("N/A"), "0");
/// ```
pub fn digits_only(text: &str) -> String {
    let digits: String = text
        .chars()
        .filter_map(decimal_value)
        .filter_map(|value| char::from_digit(value, 10))
        .collect();

    if digits.is_empty() {
        "0".to_string()
    } else {
        digits
    }
}

/// Value of a decimal digit (general category Nd) in any script
///
/// Decimal digits are encoded in contiguous runs of ten, zero first, so the
/// value is the offset from the start of the run modulo ten.
fn decimal_value(c: char) -> Option<u32> {
    if let Some(value) = c.to_digit(10) {
        return Some(value);
    }
    if c.is_ascii() || !is_decimal_digit(c) {
        return None;
    }

    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }

    Some((c as u32 - start) % 10)
}

fn is_decimal_digit(c: char) -> bool {
    static DECIMAL_DIGIT: OnceLock<Option<Regex>> = OnceLock::new();

    let mut buf = [0u8; 4];
    DECIMAL_DIGIT
        .get_or_init(|| Regex::new(r"^\p{Nd}$").ok())
        .as_ref()
        .map_or(c.is_ascii_digit(), |re| re.is_match(c.encode_utf8(&mut buf)))
}

/// Digits of `text` as a number; 0 when there are none or they overflow
pub fn to_count(text: &str) -> u64 {
    digits_only(text).parse().unwrap_or(0)
}

/// Collapses runs of whitespace and trims both ends
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
