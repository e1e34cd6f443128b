//! Path normalization for joining diff paths with report paths.
//!
//! Git emits repository-relative paths with forward slashes; coverage tools
//! emit anything from package-relative names to absolute native paths. Every
//! map key in this crate goes through [`normalize`] first so the two sides
//! can be joined reliably.

use std::path::Path;

/// Convert a path to forward-slash form and strip a leading `./`.
pub fn normalize(path: &str) -> String {
    let slashed = path.replace('\\', "/");
    let trimmed = slashed.strip_prefix("./").unwrap_or(&slashed);
    trimmed.trim_end_matches('/').to_string()
}

/// Lexically clean a forward-slash path: collapse `.` and `..` components.
pub fn clean(path: &str) -> String {
    let normalized = normalize(path);
    let mut parts: Vec<&str> = Vec::new();
    for comp in normalized.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Join two forward-slash path fragments and clean the result.
pub fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        clean(rest)
    } else {
        clean(&format!("{}/{}", base, rest))
    }
}

/// Make `path` relative to the invocation working directory when it is
/// absolute and lives underneath it; otherwise return it normalized.
pub fn relative_to_cwd(path: &str) -> String {
    let normalized = normalize(path);
    if !Path::new(&normalized).is_absolute() {
        return normalized;
    }
    match std::env::current_dir() {
        Ok(cwd) => {
            let cwd = normalize(&cwd.to_string_lossy());
            match normalized.strip_prefix(&format!("{}/", cwd)) {
                Some(rel) => rel.to_string(),
                None => normalized,
            }
        }
        Err(_) => normalized,
    }
}

/// Compare two normalized paths, case-insensitively on platforms whose
/// filesystems are case-insensitive.
pub fn paths_equal(a: &str, b: &str) -> bool {
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_slashes() {
        assert_eq!(normalize("src\\main\\App.java"), "src/main/App.java");
        assert_eq!(normalize("./src/lib.rs"), "src/lib.rs");
    }

    #[test]
    fn test_clean_components() {
        assert_eq!(clean("src/./a/../b.rs"), "src/b.rs");
        assert_eq!(clean("a//b"), "a/b");
        assert_eq!(clean("../x"), "../x");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("src/main/java", "com/example/App.java"), "src/main/java/com/example/App.java");
        assert_eq!(join("", "a.ts"), "a.ts");
        assert_eq!(join("pkg/..", "a.ts"), "a.ts");
    }

    #[test]
    fn test_relative_path_passthrough() {
        assert_eq!(relative_to_cwd("src/lib.rs"), "src/lib.rs");
    }
}
