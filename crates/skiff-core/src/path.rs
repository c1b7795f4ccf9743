//! Remote path joining.
//!
//! Remote paths are always `/`-separated regardless of the local platform,
//! so [`std::path::Path`] is the wrong tool here.

/// Join an entry name onto a parent remote path.
pub fn join(parent: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if name.is_empty() {
        return normalize(parent);
    }

    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
