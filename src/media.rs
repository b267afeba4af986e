use image::ImageFormat;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

/// Picks the content type to relay: the upstream header when present, else
/// whatever the bytes look like, else PNG.
pub fn resolve_content_type(header: Option<&str>, bytes: &[u8]) -> String {
    header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| detect_mime_type(bytes).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

pub fn is_image_mime(content_type: &str) -> bool {
    content_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Makes a caller-supplied name safe for a quoted `Content-Disposition` filename.
pub fn sanitize_filename(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !ch.is_control() && !matches!(ch, '"' | '\\' | '/' | ';'))
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.').trim();
    if trimmed.is_empty() {
        "generated-image.png".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn header_wins_over_sniffing() {
        assert_eq!(resolve_content_type(Some("image/webp"), &PNG_MAGIC), "image/webp");
    }

    #[test]
    fn sniffs_when_header_missing() {
        assert_eq!(resolve_content_type(None, &PNG_MAGIC), "image/png");
        assert_eq!(resolve_content_type(Some("  "), b"GIF89a....."), "image/gif");
        assert_eq!(resolve_content_type(None, b"plain text"), DEFAULT_IMAGE_MIME);
    }

    #[test]
    fn image_prefix_check() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("Image/JPEG; charset=binary"));
        assert!(!is_image_mime("text/html"));
    }

    #[test]
    fn filename_sanitizing() {
        assert_eq!(sanitize_filename("x.png"), "x.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(
            sanitize_filename("a\"; filename=evil.exe\r\nX-Injected: 1"),
            "a filename=evil.exeX-Injected: 1"
        );
        assert_eq!(sanitize_filename("  "), "generated-image.png");
        assert_eq!(sanitize_filename("\"\""), "generated-image.png");
    }
}
