use std::collections::BTreeMap;

/// Parse `Key=value; Other=value` into a map with lowercased keys
///
/// Segments without `=` are skipped; the last occurrence of a key wins.
pub(crate) fn parse_pairs(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|segment| segment.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Interpret a boolean flag, `None` when the spelling is not recognised
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
