//! Helpers for reading multi-valued request headers

use http::HeaderMap;
use http::header::{HeaderName, ToStrError};

/// Collect every value of a repeatable header
///
/// Each header line may hold a single value or a comma-separated list.
/// Values are trimmed and empty entries are dropped; order of appearance
/// is preserved.
///
/// # Errors
///
/// Returns an error if any line of the header is not visible ASCII.
pub fn header_list(headers: &HeaderMap, name: &HeaderName) -> Result<Vec<String>, ToStrError> {
    let mut values = Vec::new();

    for raw in headers.get_all(name) {
        values.extend(
            raw.to_str()?
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned),
        );
    }

    Ok(values)
}

/// Read a single header as text, returning `None` when absent
///
/// # Errors
///
/// Returns an error if the header value is not visible ASCII.
pub fn header_text<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Result<Option<&'a str>, ToStrError> {
    headers.get(name).map(|v| v.to_str()).transpose()
}
