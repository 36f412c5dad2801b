//! Library path resolution.

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Resolve a caller-supplied media path against the library directory.
///
/// Exactly one leading separator is stripped before joining. No
/// canonicalization or existence check happens here.
pub fn resolve_media_path(library_dir: impl AsRef<Path>, media_filepath: &str) -> PathBuf {
    let relative = media_filepath
        .strip_prefix('/')
        .or_else(|| media_filepath.strip_prefix(MAIN_SEPARATOR))
        .unwrap_or(media_filepath);

    library_dir.as_ref().join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_single_leading_separator() {
        assert_eq!(
            resolve_media_path("/library", "/shows/ep1.mkv"),
            PathBuf::from("/library/shows/ep1.mkv")
        );
    }

    #[test]
    fn test_relative_path_is_joined() {
        assert_eq!(
            resolve_media_path("/library", "shows/ep1.mkv"),
            PathBuf::from("/library/shows/ep1.mkv")
        );
    }

    #[test]
    fn test_only_one_separator_is_stripped() {
        // The remainder is absolute again, so the join replaces the library dir.
        assert_eq!(
            resolve_media_path("/library", "//shows/ep1.mkv"),
            PathBuf::from("/shows/ep1.mkv")
        );
    }

    #[test]
    fn test_no_normalization() {
        assert_eq!(
            resolve_media_path("/library/", "/a/../b.ts"),
            PathBuf::from("/library/a/../b.ts")
        );
    }
}
