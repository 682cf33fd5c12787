//! Path helpers for normalized, slash-separated layer paths.

use crate::{FlattenError, FlattenResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Normalizes a slash-separated entry path.
///
/// Leading `/` and `./` prefixes, empty segments and `.` segments are dropped; a trailing
/// separator is preserved since it distinguishes directory entries. Paths containing `..`
/// components escape the tree and are rejected, as are paths that normalize to nothing.
///
/// ```
/// use flattenfs::normalize_path;
///
/// assert_eq!(normalize_path("./etc//hosts").unwrap(), "etc/hosts");
/// assert_eq!(normalize_path("/usr/bin/").unwrap(), "usr/bin/");
/// assert!(normalize_path("../escape").is_err());
/// ```
pub fn normalize_path(path: &str) -> FlattenResult<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(FlattenError::PathEscapesRoot(path.to_string())),
            segment => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(FlattenError::EmptyPath);
    }

    let mut normalized = segments.join("/");
    if path.ends_with('/') {
        normalized.push('/');
    }

    Ok(normalized)
}

/// Returns `true` if `path` is a strict descendant of the directory `dir`.
///
/// A path is a strict descendant of a directory iff it lies beneath it and is not the
/// directory's own entry. Trailing separators on either argument are ignored.
pub fn is_strict_descendant(path: &str, dir: &str) -> bool {
    let path = path.trim_end_matches('/');
    let dir = dir.trim_end_matches('/');

    path.len() > dir.len() + 1
        && path.as_bytes()[dir.len()] == b'/'
        && path.starts_with(dir)
}

/// Splits a normalized path into its containing directory and final segment.
///
/// The containing directory is `""` for top-level paths. A trailing separator on the
/// input is ignored.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

/// Joins a containing directory and a child name, treating `""` as the root.
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
