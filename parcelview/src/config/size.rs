//! Human-readable size parsing (e.g., "8MB", "650KB").

use thiserror::Error;

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '8MB', '650KB', or '1024'")]
pub struct SizeParseError {
    input: String,
}

impl SizeParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports:
/// - Bare numbers (treated as bytes)
/// - KB/K suffix (1024 bytes)
/// - MB/M suffix (1024² bytes)
/// - GB/G suffix (1024³ bytes)
/// - Case-insensitive
/// - Whitespace tolerant
///
/// # Examples
///
/// ```
/// use parcelview::config::parse_size;
///
/// assert_eq!(parse_size("650000").unwrap(), 650_000);
/// assert_eq!(parse_size("8MB").unwrap(), 8 * 1024 * 1024);
/// assert_eq!(parse_size("512 kb").unwrap(), 512 * 1024);
/// ```
pub fn parse_size(s: &str) -> Result<usize, SizeParseError> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();
    let unit = upper.strip_suffix('B').unwrap_or(&upper);

    let (num_str, multiplier) = if let Some(n) = unit.strip_suffix('G') {
        (n, GB)
    } else if let Some(n) = unit.strip_suffix('M') {
        (n, MB)
    } else if let Some(n) = unit.strip_suffix('K') {
        (n, KB)
    } else {
        (unit, 1)
    };

    let num: usize = num_str.trim().parse().map_err(|_| SizeParseError::new(s))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| SizeParseError::new(s))
}

/// Format a byte count using the largest unit that divides it evenly.
///
/// # Examples
///
/// ```
/// use parcelview::config::format_size;
///
/// assert_eq!(format_size(8 * 1024 * 1024), "8MB");
/// assert_eq!(format_size(650_000), "650000");
/// ```
pub fn format_size(bytes: usize) -> String {
    if bytes >= GB && bytes.is_multiple_of(GB) {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes.is_multiple_of(MB) {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes.is_multiple_of(KB) {
        format!("{}KB", bytes / KB)
    } else {
        format!("{}", bytes)
    }
}
