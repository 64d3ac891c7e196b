//! # Tipos de Contenido
//! src/http/mime.rs
//!
//! Content-Type a partir de la extensión del archivo.

use std::path::Path;

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Tabla extensión → Content-Type
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("mpd", "application/dash+xml"),
    ("m4s", "video/mp4"),
    ("ssa", TEXT_PLAIN),
    ("ass", TEXT_PLAIN),
    ("srt", TEXT_PLAIN),
    ("html", TEXT_HTML),
    ("js", "application/javascript"),
    ("css", "text/css"),
];

/// Content-Type para `path`; `application/octet-stream` si no se reconoce
pub fn content_type(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return OCTET_STREAM;
    };

    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}
