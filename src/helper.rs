use std::path::Path;

use crate::DEFAULT_MIME_TYPE;

// Helper method for parsing tags
pub fn parse_tags(tags: Option<String>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Guesses a MIME type from a file extension
pub fn guess_mime_type(path: &Path) -> &'static str {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_MIME_TYPE)
}

/// First line of `content`, cut to `max_chars` characters
pub fn content_preview(content: &str, max_chars: usize) -> String {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut preview: String = first_line.chars().take(max_chars).collect();
    if first_line.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}

/// Human readable size in MB, the way the file list shows it
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_splits_and_trims() {
        assert_eq!(
            parse_tags(Some("a, b,,c ".to_string())),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn mime_guess_uses_extension() {
        assert_eq!(guess_mime_type(Path::new("chart.PNG")), "image/png");
        assert_eq!(guess_mime_type(Path::new("scan.bmp")), "image/bmp");
        assert_eq!(guess_mime_type(Path::new("photo.tiff")), "image/tiff");
        assert!(guess_mime_type(Path::new("icon.ico")).starts_with("image/"));
        assert_eq!(guess_mime_type(Path::new("a.txt")), "text/plain");
        assert_eq!(guess_mime_type(Path::new("blob")), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn preview_skips_blank_lines_and_truncates() {
        assert_eq!(content_preview("\n\nhello world", 5), "hello...");
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("", 10), "");
    }

    #[test]
    fn size_is_shown_in_megabytes() {
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(2048), "0.00 MB");
    }
}
