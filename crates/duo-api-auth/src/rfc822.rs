//! RFC 822-style date formatting for the `X-Duo-Date` header.
//!
//! The verifier recomputes the signature from the transmitted date header, so
//! the format here must match it byte for byte:
//!
//! ```text
//! ddd, dd MMM yyyy HH:mm:ss +ZZzz
//! ```
//!
//! Weekday and month abbreviations are always English. The zone is the
//! whole-hour UTC offset; offset minutes are not represented (the verifier
//! computes the same value). A zero offset formats as `-0000`.

use chrono::{DateTime, FixedOffset, Utc};

/// Format a timestamp in the wire format expected by the signature verifier.
///
/// # Examples
///
/// ```
/// use chrono::{FixedOffset, TimeZone};
/// use duo_api_auth::rfc822::format_rfc822;
///
/// let date = FixedOffset::east_opt(0)
///     .unwrap()
///     .with_ymd_and_hms(2012, 12, 7, 17, 18, 0)
///     .unwrap();
/// assert_eq!(format_rfc822(&date), "Fri, 07 Dec 2012 17:18:00 -0000");
/// ```
#[must_use]
pub fn format_rfc822(date: &DateTime<FixedOffset>) -> String {
    let stamp = date.format("%a, %d %b %Y %H:%M:%S");
    let offset_hours = date.offset().local_minus_utc() / 3600;
    // Sign, two zero-padded hour digits, then zero-fill to four digits.
    let (sign, hours) = if offset_hours > 0 {
        ('+', offset_hours)
    } else {
        ('-', -offset_hours)
    };
    format!("{stamp} {sign}{hours:02}00")
}

/// Format a UTC timestamp; always carries the `-0000` zone.
#[must_use]
pub fn format_rfc822_utc(date: &DateTime<Utc>) -> String {
    format_rfc822(&date.fixed_offset())
}
