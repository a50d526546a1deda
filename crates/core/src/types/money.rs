//! Minor-currency-unit money formatting.
//!
//! All monetary values in the service contract are integers in minor
//! currency units (e.g., cents for USD), which avoids floating-point
//! rounding. Formatting is the only client-side money computation.

/// Format an amount in minor currency units for display.
///
/// Known currency codes render with their symbol (`$12.34`); unknown codes
/// fall back to `CODE 12.34`.
///
/// # Example
///
/// ```rust
/// # use greenmarket_core::format_minor_units;
/// assert_eq!(format_minor_units(1999, "USD"), "$19.99");
/// assert_eq!(format_minor_units(1999, "SEK"), "SEK 19.99");
/// ```
#[must_use]
pub fn format_minor_units(cents: i64, currency_code: &str) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let magnitude = format!("{}.{:02}", abs / 100, abs % 100);

    currency_symbol(currency_code).map_or_else(
        || format!("{currency_code} {sign}{magnitude}"),
        |symbol| format!("{sign}{symbol}{magnitude}"),
    )
}

/// Symbol for a known ISO 4217 currency code.
fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" | "CAD" | "AUD" => Some("$"),
        "EUR" => Some("\u{20ac}"),
        "GBP" => Some("\u{a3}"),
        _ => None,
    }
}
