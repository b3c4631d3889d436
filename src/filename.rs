/// Characters that are not allowed in file names on common filesystems
const ILLEGAL: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Removes every filesystem-illegal character from a title
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !ILLEGAL.contains(c)).collect()
}

/// Builds the save name for a video: sanitized title (or "video") plus extension
pub fn derive_file_name(title: Option<&str>, ext: &str) -> String {
    let title = match title {
        Some(t) if !t.is_empty() => t,
        _ => "video",
    };
    format!("{}.{}", sanitize_title(title), ext)
}
