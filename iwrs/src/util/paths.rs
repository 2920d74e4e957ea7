//! Object path containment helpers.
//!
//! iwd nests object paths: an adapter's path prefixes its devices' paths,
//! which prefix their networks' paths. The owner of any object is recovered
//! by cutting its path down to the owner's segment depth.

use crate::types::constants::path_depth;

/// Truncates `path` to its first `segments` `/`-separated segments.
///
/// The empty segment before the leading slash counts, so `/a/b` has three
/// segments. Paths that are already short enough are returned unchanged.
pub(crate) fn truncate_path(path: &str, segments: usize) -> &str {
    match segments
        .checked_sub(1)
        .and_then(|n| path.match_indices('/').nth(n))
    {
        Some((idx, _)) => &path[..idx],
        None => path,
    }
}

/// Path of the adapter owning the object at `path`.
pub(crate) fn adapter_path(path: &str) -> &str {
    truncate_path(path, path_depth::ADAPTER)
}

/// Path of the device owning the object at `path`.
pub(crate) fn device_path(path: &str) -> &str {
    truncate_path(path, path_depth::DEVICE)
}
