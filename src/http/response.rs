//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Todas las respuestas tienen la misma forma fija:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/dash+xml\r\n
//! Content-Length: 1234\r\n
//! \r\n
//! <body>
//! ```
//!
//! El body puede estar en memoria (listados, manifiestos, errores) o ser un
//! archivo que se copia al socket por bloques, usando un buffer que provee
//! el llamador (la arena de la conexión).
//!
//! ## Ejemplo de uso
//!
//! ```
//! use media_server::http::{Response, StatusCode};
//!
//! let response = Response::text(StatusCode::Ok, "eng2.srt\nep1/manifest.mpd");
//!
//! let mut out = Vec::new();
//! let mut scratch = [0u8; 64];
//! response.write_to(&mut out, &mut scratch, false).unwrap();
//! ```

use super::mime::TEXT_PLAIN;
use super::StatusCode;
use std::fmt;
use std::io::{self, Read, Write};

/// Cuerpo de una respuesta
pub enum Body {
    /// Contenido en memoria
    Bytes(Vec<u8>),

    /// Archivo abierto y su tamaño
    File { reader: Box<dyn Read + Send>, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::File { len, .. } => f.debug_struct("File").field("len", len).finish(),
        }
    }
}

/// Representa una respuesta HTTP completa
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    content_type: &'static str,
    body: Body,
}

impl Response {
    /// Respuesta con body en memoria
    pub fn new(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body: Body::Bytes(body),
        }
    }

    /// Respuesta `text/plain`
    pub fn text(status: StatusCode, body: &str) -> Self {
        Self::new(status, TEXT_PLAIN, body.as_bytes().to_vec())
    }

    /// Respuesta con un archivo como body
    pub fn file(content_type: &'static str, reader: Box<dyn Read + Send>, len: u64) -> Self {
        Self {
            status: StatusCode::Ok,
            content_type,
            body: Body::File { reader, len },
        }
    }

    /// 404 con mensaje en texto plano
    pub fn not_found(message: &str) -> Self {
        Self::text(StatusCode::NotFound, message)
    }

    /// 400 con mensaje en texto plano
    pub fn bad_request(message: &str) -> Self {
        Self::text(StatusCode::BadRequest, message)
    }

    /// Status line + headers
    pub fn head_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
            self.status,
            self.content_type,
            self.body.len()
        )
        .into_bytes()
    }

    /// Escribe la respuesta completa en `out`
    ///
    /// `scratch` es el buffer de copia para bodies de archivo. Con
    /// `head_only` solo se envían status line y headers (HEAD).
    pub fn write_to<W: Write>(self, out: &mut W, scratch: &mut [u8], head_only: bool) -> io::Result<()> {
        out.write_all(&self.head_bytes())?;

        if !head_only {
            match self.body {
                Body::Bytes(bytes) => out.write_all(&bytes)?,
                Body::File { mut reader, len } => copy_exact(&mut reader, out, scratch, len)?,
            }
        }

        out.flush()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// Copia exactamente `len` bytes de `reader` a `out`
///
/// Si el archivo se acorta mientras se envía, falla: el Content-Length ya
/// fue anunciado y no se puede cumplir.
fn copy_exact<R: Read + ?Sized, W: Write>(
    reader: &mut R,
    out: &mut W,
    scratch: &mut [u8],
    len: u64,
) -> io::Result<()> {
    let mut remaining = len;
    while remaining > 0 {
        let want = scratch.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = match reader.read(&mut scratch[..want]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "file shorter than announced Content-Length",
                ))
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        out.write_all(&scratch[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}
