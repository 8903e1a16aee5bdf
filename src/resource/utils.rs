/// Returns the part of `path` after its last `/`.
///
/// Compute Engine reports zones, regions and machine types as partial or full
/// resource URLs (e.g. `projects/p1/zones/us-east1-b`); only the trailing
/// segment is the resource name. A path without any `/` is returned as is.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Checks whether `name` is usable as a Compute Engine resource name.
///
/// Names are non-empty, at most 63 bytes long, and consist of lowercase ASCII
/// letters, digits and `-`.
pub(super) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
