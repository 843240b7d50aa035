// Storage key resolution

/// Join an optional folder prefix and a file name into an object key.
///
/// An empty or whitespace-only folder yields the file name unchanged.
/// Otherwise exactly one trailing `/` is stripped from the folder before
/// joining. Embedded slashes and key characters are passed through as-is.
pub fn resolve_key(folder: &str, filename: &str) -> String {
    if folder.trim().is_empty() {
        return filename.to_string();
    }

    let folder = folder.strip_suffix('/').unwrap_or(folder);
    format!("{}/{}", folder, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_folder_returns_filename() {
        assert_eq!(resolve_key("", "f.txt"), "f.txt");
        assert_eq!(resolve_key("   ", "f.txt"), "f.txt");
        assert_eq!(resolve_key("\t\n", "f.txt"), "f.txt");
    }

    #[test]
    fn test_trailing_slash_is_optional() {
        assert_eq!(resolve_key("testing", "f.txt"), "testing/f.txt");
        assert_eq!(resolve_key("testing/", "f.txt"), "testing/f.txt");
        assert_eq!(
            resolve_key("testing/", "upload_testing.txt"),
            resolve_key("testing", "upload_testing.txt")
        );
    }

    #[test]
    fn test_only_one_trailing_slash_stripped() {
        assert_eq!(resolve_key("testing//", "f.txt"), "testing//f.txt");
    }

    #[test]
    fn test_no_normalization() {
        assert_eq!(resolve_key("a/b/c", "f.txt"), "a/b/c/f.txt");
        assert_eq!(resolve_key("/root", "f.txt"), "/root/f.txt");
        assert_eq!(resolve_key(" spaced ", "f.txt"), " spaced /f.txt");
        assert_eq!(resolve_key("dir", "sub/f 1%.txt"), "dir/sub/f 1%.txt");
    }

    #[test]
    fn test_single_slash_folder() {
        assert_eq!(resolve_key("/", "f.txt"), "/f.txt");
    }
}
