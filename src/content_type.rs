//! Extension-based `Content-Type` lookup.

/// Fallback for unknown or missing extensions.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Map an object key to its response `Content-Type`.
///
/// Only the extension of the final path segment is considered, compared
/// case-insensitively.  Object bytes are never inspected.
pub fn content_type(key: &str) -> &'static str {
    let Some(ext) = extension(key) else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Substring after the last `.` in the final `/`-separated segment.
fn extension(key: &str) -> Option<&str> {
    let segment = key.rsplit('/').next().unwrap_or(key);
    segment.rsplit_once('.').map(|(_, ext)| ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_types_carry_charset() {
        assert_eq!(content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type("app.css"), "text/css; charset=utf-8");
        assert_eq!(
            content_type("bundle.js"),
            "application/javascript; charset=utf-8"
        );
        assert_eq!(
            content_type("data.json"),
            "application/json; charset=utf-8"
        );
    }

    #[test]
    fn test_image_types() {
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("a.jpg"), "image/jpeg");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a.gif"), "image/gif");
        assert_eq!(content_type("a.svg"), "image/svg+xml");
        assert_eq!(content_type("favicon.ico"), "image/x-icon");
        assert_eq!(content_type("a.webp"), "image/webp");
    }

    #[test]
    fn test_font_types() {
        assert_eq!(content_type("f.woff"), "font/woff");
        assert_eq!(content_type("f.woff2"), "font/woff2");
        assert_eq!(content_type("f.ttf"), "font/ttf");
        assert_eq!(content_type("f.eot"), "application/vnd.ms-fontobject");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(content_type("A.JS"), content_type("a.js"));
        assert_eq!(content_type("PAGE.Html"), "text/html; charset=utf-8");
        assert_eq!(content_type("photo.JPEG"), "image/jpeg");
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(content_type("archive.tar.gz"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type("README"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(""), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type("trailing."), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_only_final_segment_counts() {
        assert_eq!(content_type("v1.2/readme"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type("assets.v2/app.css"), "text/css; charset=utf-8");
    }

    #[test]
    fn test_uses_last_dot() {
        assert_eq!(content_type("app.min.js"), "application/javascript; charset=utf-8");
        assert_eq!(content_type("docs/page.backup.html"), "text/html; charset=utf-8");
    }
}
