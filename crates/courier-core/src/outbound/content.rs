//! Content classification for file sources.
//!
//! Decides the MIME type of a file source and whether it should travel
//! through the platform's photo pipeline or as a generic document. Detection
//! precedence: explicit override, magic-byte sniffing, file extension.
//!
//! Only `image/jpeg`, `image/jpg` and `image/png` classify as photos.
//! Everything else — notably animated GIF — stays a document, because the
//! photo pipeline re-encodes lossily.

use std::path::{Path, PathBuf};

use crate::foundation::error::{MessageError, MessageResult};

/// Where the bytes of an outbound file come from.
///
/// Resolution precedence when several could apply is fixed: platform file id,
/// remote URL, local path, raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A file already known to the platform.
    Id(String),
    /// A remote URL.
    Url(String),
    /// A local file.
    Path(PathBuf),
    /// An in-memory buffer, optionally with a file-name hint used to derive
    /// the upload name and extension.
    Bytes {
        /// Raw content.
        data: Vec<u8>,
        /// Optional name hint, e.g. `"report.pdf"`.
        name_hint: Option<String>,
    },
}

impl FileSource {
    /// Convenience constructor for a bytes source without a name hint.
    pub fn bytes(data: Vec<u8>) -> Self {
        Self::Bytes {
            data,
            name_hint: None,
        }
    }
}

/// The result of classifying a file source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Detected MIME type.
    pub mime: String,
    /// `true` when the source should go through the photo pipeline.
    pub is_image: bool,
}

/// MIME types routed to the photo pipeline.
const PHOTO_MIMES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Classifies a file source.
///
/// Precedence: `override_mime` when given, magic-byte sniffing of the content
/// (URL sources are fetched first, path sources read from disk), then the
/// file extension.
///
/// # Errors
///
/// [`MessageError::UnknownMime`] when no detection path produces a type;
/// [`MessageError::Io`] / [`MessageError::Fetch`] when the source itself
/// cannot be read.
pub async fn classify(source: &FileSource, override_mime: Option<&str>) -> MessageResult<Classification> {
    if let Some(mime) = override_mime {
        return Ok(classification(mime.to_owned()));
    }

    let mime = match source {
        FileSource::Id(_) => None,
        FileSource::Bytes { data, name_hint } => sniff_mime(data)
            .map(str::to_owned)
            .or_else(|| name_hint.as_deref().and_then(mime_from_name)),
        FileSource::Path(path) => {
            let data = tokio::fs::read(path).await?;
            sniff_mime(&data)
                .map(str::to_owned)
                .or_else(|| path.to_str().and_then(mime_from_name))
        }
        FileSource::Url(url) => fetch_and_sniff(url)
            .await?
            .or_else(|| mime_from_name(url)),
    };

    mime.map(classification).ok_or(MessageError::UnknownMime)
}

fn classification(mime: String) -> Classification {
    let is_image = PHOTO_MIMES.contains(&mime.as_str());
    Classification { mime, is_image }
}

#[cfg(feature = "fetch")]
async fn fetch_and_sniff(url: &str) -> MessageResult<Option<String>> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| MessageError::Fetch(e.to_string()))?;
    let data = response
        .bytes()
        .await
        .map_err(|e| MessageError::Fetch(e.to_string()))?;
    tracing::debug!(url, len = data.len(), "fetched url for classification");
    Ok(sniff_mime(&data).map(str::to_owned))
}

#[cfg(not(feature = "fetch"))]
async fn fetch_and_sniff(_url: &str) -> MessageResult<Option<String>> {
    // Without the fetch feature only the URL's extension is available.
    Ok(None)
}

/// Detects a MIME type from leading magic bytes.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    if data.starts_with(PNG) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.starts_with(b"RIFF") && data.len() >= 12 && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else if data.starts_with(b"BM") {
        Some("image/bmp")
    } else if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        Some("image/tiff")
    } else if data.starts_with(b"%PDF-") {
        Some("application/pdf")
    } else if data.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
        Some("application/zip")
    } else if data.starts_with(b"OggS") {
        Some("audio/ogg")
    } else if data.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        Some("video/webm")
    } else {
        None
    }
}

/// Maps a file name or URL to a MIME type by its extension.
pub fn mime_from_name(name: &str) -> Option<String> {
    // Strip query/fragment so URLs resolve like plain names.
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "ogg" | "oga" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => return None,
    };
    Some(mime.to_owned())
}

/// Maps a MIME type back to a canonical file extension (with leading dot).
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    Some(match mime {
        "image/jpeg" | "image/jpg" | "image/jpe" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tif",
        "application/pdf" => ".pdf",
        "application/zip" => ".zip",
        "audio/ogg" => ".ogg",
        "audio/mpeg" => ".mp3",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "text/plain" => ".txt",
        _ => return None,
    })
}
