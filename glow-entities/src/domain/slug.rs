/// Lower-case ASCII slug.
///
/// Runs of anything that is not an ASCII letter or digit collapse into a
/// single `_`; leading and trailing separators are dropped. An input with no
/// usable characters slugs to `"unknown"`.
///
/// Non-ASCII letters are treated as separators, not transliterated, so
/// `"Café"` slugs to `"caf"` where the host's own slugify gives `"cafe"`.
/// Every catalog name is ASCII, so generated ids match the host's.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        "unknown".to_string()
    } else {
        out
    }
}

/// Stable entity identity for a (device, measurement) pair.
pub fn entity_unique_id(device_id: &str, measurement_name: &str) -> String {
    slugify(&format!("{device_id}_{measurement_name}"))
}
