//! Small formatting helpers shared by the relay pipeline and the chat handlers.

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats a byte count as a human-readable size.
///
/// The unit is the largest power of 1024 not exceeding `bytes` (capped at GB),
/// the magnitude is rounded to two decimals and trailing zeros are dropped.
///
/// # Examples
///
/// ```
/// use file_relay_bot::utils::format_size;
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(1024 * 1024), "1 MB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut divisor: u64 = 1;
    while exponent < SIZE_UNITS.len() - 1 && bytes >= divisor * 1024 {
        divisor *= 1024;
        exponent += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64 / divisor as f64;
    let rounded = (value * 100.0).round() / 100.0;

    format!("{rounded} {}", SIZE_UNITS[exponent])
}

/// Safely truncates a string to a maximum character length (not bytes).
///
/// This is UTF-8 safe and will not panic on multi-byte characters.
///
/// # Examples
///
/// ```
/// use file_relay_bot::utils::truncate_str;
/// let s = "Привет, мир!";
/// assert_eq!(truncate_str(s, 6), "Привет");
/// ```
pub fn truncate_str(s: impl AsRef<str>, max_chars: usize) -> String {
    let s = s.as_ref();
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    s.char_indices()
        .nth(max_chars)
        .map_or_else(|| s.to_string(), |(pos, _)| s[..pos].to_string())
}

/// Shortens text for display, appending `...` when it was cut.
///
/// # Examples
///
/// ```
/// use file_relay_bot::utils::ellipsize;
/// assert_eq!(ellipsize("annual_report.pdf", 6), "annual...");
/// assert_eq!(ellipsize("a.pdf", 6), "a.pdf");
/// ```
#[must_use]
pub fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", truncate_str(text, max_chars))
    } else {
        text.to_string()
    }
}
