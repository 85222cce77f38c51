//! Path normalization for report output.

use std::path::Path;

use crate::InspectorError;

/// Normalizes a file path to a canonical UTF-8 string with forward slashes.
///
/// # Process
/// 1. Canonicalizes the path using `dunce::canonicalize` (removes `\\?\` prefix on Windows)
/// 2. Converts to UTF-8 string
/// 3. Replaces backslashes with forward slashes
///
/// # Errors
/// - `InspectorError::IoError` if canonicalization fails (file not found, permissions, etc.)
/// - `InspectorError::ParseFailure` if the path contains non-UTF-8 characters
pub fn normalize_path(path: &Path) -> Result<String, InspectorError> {
    let canonical = dunce::canonicalize(path)?;
    let s = canonical.to_str().ok_or_else(|| {
        InspectorError::ParseFailure(format!("Non-UTF-8 path: {}", canonical.display()))
    })?;
    Ok(s.replace('\\', "/"))
}

/// Renders `path` relative to `root` when it lies beneath it, with forward slashes.
///
/// Falls back to the normalized absolute path otherwise.
pub fn display_path(path: &Path, root: &Path) -> Result<String, InspectorError> {
    let full = normalize_path(path)?;
    let base = normalize_path(root)?;
    let relative = full
        .strip_prefix(&base)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty());
    Ok(relative.map(str::to_string).unwrap_or(full))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_cargo_manifest() {
        let cargo_manifest = std::env::var("CARGO_MANIFEST_DIR")
            .map(|dir| Path::new(&dir).join("Cargo.toml"))
            .unwrap();

        let normalized = normalize_path(&cargo_manifest).unwrap();
        assert!(normalized.contains('/'));
        assert!(normalized.ends_with("Cargo.toml"));
        assert!(!normalized.contains('\\'));
    }

    #[test]
    fn test_normalize_nonexistent_path() {
        let result = normalize_path(Path::new("/this/does/not/exist/nowhere_spec.rb"));
        assert!(result.is_err());
    }

    #[test]
    fn test_display_path_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("spec").join("models");
        std::fs::create_dir_all(&nested).unwrap();
        let file = nested.join("user_spec.rb");
        std::fs::write(&file, "").unwrap();

        assert_eq!(
            display_path(&file, dir.path()).unwrap(),
            "spec/models/user_spec.rb"
        );
    }

    #[test]
    fn test_display_path_root_is_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("user_spec.rb");
        std::fs::write(&file, "").unwrap();

        // Nothing left after stripping: keep the full path.
        let shown = display_path(&file, &file).unwrap();
        assert!(shown.ends_with("/user_spec.rb"));
    }
}
