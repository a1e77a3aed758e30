//! MIME type resolution for uploaded documents.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn mime_for_filename(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        "pdf"          => "application/pdf",
        _              => "application/octet-stream",
    }
}

/// Whether the OCR backends accept this MIME type.
pub fn is_supported_document(mime: &str) -> bool {
    mime.starts_with("image/") || mime == "application/pdf"
}

/// Pick the MIME type for an upload: the declared content type when it is
/// usable, otherwise the filename extension, otherwise JPEG.
pub fn resolve_upload_mime(content_type: Option<&str>, filename: Option<&str>) -> String {
    if let Some(declared) = content_type {
        let declared = declared.split(';').next().unwrap_or("").trim().to_lowercase();
        if is_supported_document(&declared) {
            return declared;
        }
    }
    match filename.map(mime_for_filename) {
        Some(mime) if is_supported_document(mime) => mime.to_string(),
        _ => "image/jpeg".to_string(),
    }
}
