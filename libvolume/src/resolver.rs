//! Request name resolution.
//!
//! The container host addresses volumes by a single opaque name. A name of the
//! form `volume/sub/dir` selects the backend volume `volume` and asks for the
//! directory `sub/dir` inside it; the subdirectory is not a backend entity.

use std::path::PathBuf;

use crate::types::ResolvedName;

/// Split `request_name` on its first `/` into a volume name and an optional,
/// lexically cleaned subdirectory.
pub fn resolve(request_name: &str) -> ResolvedName {
    match request_name.split_once('/') {
        Some((volume, rest)) => {
            // The subdirectory always lives below the mount point, even when
            // the request spells it with a leading separator.
            let cleaned = clean(rest);
            let relative = cleaned.trim_start_matches('/');
            ResolvedName {
                volume: volume.to_owned(),
                subdir: (!relative.is_empty() && relative != ".")
                    .then(|| PathBuf::from(relative)),
            }
        }
        None => ResolvedName {
            volume: request_name.to_owned(),
            subdir: None,
        },
    }
}

/// Lexical path cleaning: collapses repeated separators, drops `.` segments
/// and resolves `..` against the segment before it. Returns `.` for an
/// empty result.
fn clean(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // `..` above the root is the root.
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_owned(),
        (false, false) => joined,
    }
}
