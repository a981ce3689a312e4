//! Path handling shared by all providers.
//!
//! Importers receive paths from file headers written on any platform, so
//! both `/` and `\` separate components. Providers key their lookups on the
//! normalized form.

use alloc::{string::String, vec::Vec};

pub const SEPARATOR: char = '/';

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Returns the normalized form of `path`, or `None` if it does not name a
/// resource.
///
/// ```
/// use asset_io_core::path::normalize;
///
/// assert_eq!(normalize("textures\\wood.png").as_deref(), Some("textures/wood.png"));
/// assert_eq!(normalize("./models//crate/../tri.obj").as_deref(), Some("models/tri.obj"));
/// assert_eq!(normalize("/"), None);
/// ```
pub fn normalize(path: &str) -> Option<String> {
    if path.contains('\0') {
        return None;
    }
    let mut components: Vec<&str> = Vec::new();
    for component in path.split(is_separator) {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            name => components.push(name),
        }
    }
    if components.is_empty() {
        return None;
    }
    Some(components.join("/"))
}

/// Final component of `path`.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Everything before the final component, without the trailing separator.
pub fn parent(path: &str) -> &str {
    let trimmed = path.trim_end_matches(is_separator);
    match trimmed.rfind(is_separator) {
        Some(pos) => &trimmed[..pos],
        None => "",
    }
}

/// Extension of the final component, without the dot.
///
/// Leading dots of hidden files do not start an extension.
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) => Some(&name[pos + 1..]),
    }
}

/// Resolves `relative` against the directory containing `base`, the way a
/// model refers to its material and texture files.
pub fn join(base: &str, relative: &str) -> String {
    let dir = parent(base);
    let mut joined = String::with_capacity(dir.len() + relative.len() + 1);
    if !dir.is_empty() {
        joined.push_str(dir);
        joined.push(SEPARATOR);
    }
    joined.push_str(relative);
    joined
}

/// Case-insensitive comparison of two normalized paths.
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        for path in ["a/b", "a\\b", "a//b", "./a/b", "a/c/../b", "/a/b/", "../a/b"] {
            assert_eq!(normalize(path).as_deref(), Some("a/b"), "{path}");
        }
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("."), None);
        assert_eq!(normalize("a/.."), None);
        assert_eq!(normalize("a\0b"), None);
    }

    #[test]
    fn test_normalize_idempotent() {
        let once = normalize("models\\.\\crate\\..\\crate.3ds").unwrap();
        assert_eq!(normalize(&once).as_deref(), Some(once.as_str()));
    }

    #[test]
    fn test_components() {
        assert_eq!(file_name("models/crate.obj"), "crate.obj");
        assert_eq!(file_name("crate.obj"), "crate.obj");
        assert_eq!(file_name("models\\textures\\"), "textures");
        assert_eq!(parent("models/crate.obj"), "models");
        assert_eq!(parent("crate.obj"), "");
        assert_eq!(extension("models/crate.OBJ"), Some("OBJ"));
        assert_eq!(extension("models.d/crate"), None);
        assert_eq!(extension(".hidden"), None);
        assert_eq!(extension("$$$___magic___$$$.3ds"), Some("3ds"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("models/crate.obj", "crate.mtl"), "models/crate.mtl");
        assert_eq!(join("crate.obj", "textures/wood.png"), "textures/wood.png");
        assert_eq!(
            normalize(&join("models/crate.obj", "../textures/wood.png")).as_deref(),
            Some("textures/wood.png")
        );
    }
}
