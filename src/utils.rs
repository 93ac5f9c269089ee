use std::path::{Component, Path, PathBuf};

const SIZE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

/// Lexically normalizes a path without touching the filesystem.
pub fn normalize_path(source: &Path) -> PathBuf {
    let mut new_path = PathBuf::new();

    for component in source.components() {
        match component {
            // Skip the current-dir marker "."
            Component::CurDir => {}

            // For "..", pop the last normal component; a relative path keeps leading ".."
            Component::ParentDir => match new_path.components().next_back() {
                Some(Component::Normal(_)) => {
                    new_path.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => new_path.push(".."),
            },

            // For normal components, push them
            other => new_path.push(other.as_os_str()),
        }
    }

    new_path
}

/// Computes the path of `to` as seen from the directory `from`.
///
/// Both paths are normalized first. When they are equal the result is empty.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize_path(from);
    let to = normalize_path(to);

    let from_components: Vec<Component> = from.components().collect();
    let to_components: Vec<Component> = to.components().collect();

    let shared = from_components
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();

    for _ in shared..from_components.len() {
        result.push("..");
    }

    for component in &to_components[shared..] {
        result.push(component.as_os_str());
    }

    result
}

/// Renders a path with forward slashes so it can be used as a stable string key.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Drops a query-string-like suffix (`?` and everything after it).
pub fn strip_query(path: &str) -> &str {
    match path.split_once('?') {
        Some((head, _)) => head,
        None => path,
    }
}

/// Formats a byte count using binary multiples, e.g. `14 B` or `1.5 KB`.
pub fn human_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;

    // compare the value as it will be printed, so 1023.999 KB becomes 1 MB and not 1024 KB
    while (value * 100.0).round() / 100.0 >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');

    format!("{} {}", rendered, SIZE_UNITS[unit])
}
