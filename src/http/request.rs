//! # Parsing de Requests HTTP
//! src/http/request.rs
//!
//! El servidor solo necesita la request line; los headers se ignoran.
//!
//! ## Formato de la Request Line
//!
//! ```text
//! GET /show/ep1.mkv HTTP/1.1\r\n
//! ```
//!
//! 1. **Método**: `GET` o `HEAD`
//! 2. **Target**: path crudo (sin decodificar) y query opcional
//! 3. **Versión**: opcional; si está, `HTTP/1.0` o `HTTP/1.1`
//!
//! El `Request` no copia nada: todos sus campos apuntan al buffer de la
//! arena de la conexión y viven exactamente lo mismo que ella.

use thiserror::Error;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Request vacío
    #[error("empty request")]
    EmptyRequest,

    /// No hay `\r\n` que cierre la request line
    #[error("request line is not terminated")]
    MissingLineTerminator,

    /// Falta el método o el target
    #[error("invalid request line format")]
    InvalidRequestLine,

    /// Bytes que no son UTF-8
    #[error("request line is not valid UTF-8")]
    InvalidEncoding,

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid HTTP version: {0}")]
    InvalidHttpVersion(String),
}

/// Request HTTP parseado, prestado del buffer de la conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    method: Method,

    /// Path crudo, sin query (ej: "/show/ep1.mkv")
    path: &'a str,

    /// Query string sin el `?`, si existe
    query: Option<&'a str>,

    version: Option<&'a str>,
}

impl<'a> Request<'a> {
    /// Parsea la request line desde los bytes leídos del socket
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use media_server::http::Request;
    ///
    /// let raw = b"GET /show/ep1.mkv HTTP/1.1\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/show/ep1.mkv");
    /// ```
    pub fn parse(buffer: &'a [u8]) -> Result<Self, ParseError> {
        if buffer.is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        // 1. Aislar la request line
        let line_end = buffer
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or(ParseError::MissingLineTerminator)?;
        let line = std::str::from_utf8(&buffer[..line_end])
            .map_err(|_| ParseError::InvalidEncoding)?;

        // 2. METHOD SP TARGET [SP VERSION]
        let (method, rest) = line.split_once(' ').ok_or(ParseError::InvalidRequestLine)?;
        let (target, version) = match rest.split_once(' ') {
            Some((target, version)) => (target, Some(version)),
            None => (rest, None),
        };

        if method.is_empty() {
            return Err(ParseError::InvalidRequestLine);
        }
        let method = Method::parse(method)?;

        if let Some(version) = version {
            if version != "HTTP/1.0" && version != "HTTP/1.1" {
                return Err(ParseError::InvalidHttpVersion(version.to_string()));
            }
        }

        // 3. Separar la query; el path queda sin decodificar
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        Ok(Request {
            method,
            path,
            query,
            version,
        })
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn query(&self) -> Option<&'a str> {
        self.query
    }

    pub fn version(&self) -> Option<&'a str> {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.path(), "/");
        assert_eq!(request.version(), Some("HTTP/1.0"));
    }

    #[test]
    fn test_parse_without_version() {
        let raw = b"GET /show/ep1.mkv\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/show/ep1.mkv");
        assert_eq!(request.version(), None);
    }

    #[test]
    fn test_parse_ignores_headers() {
        let raw = b"HEAD /css/app.css HTTP/1.1\r\nHost: localhost:8080\r\nbroken header\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.method(), Method::HEAD);
        assert_eq!(request.path(), "/css/app.css");
    }

    #[test]
    fn test_parse_splits_query() {
        let raw = b"GET /js/app.js?v=3 HTTP/1.1\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/js/app.js");
        assert_eq!(request.query(), Some("v=3"));
    }

    #[test]
    fn test_path_is_not_decoded() {
        let raw = b"GET /my%20show/ep%201.mkv HTTP/1.1\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "/my%20show/ep%201.mkv");
    }

    #[test]
    fn test_empty_target() {
        let raw = b"GET  HTTP/1.1\r\n\r\n";
        let request = Request::parse(raw).unwrap();

        assert_eq!(request.path(), "");
    }

    // ==================== Errores ====================

    #[test]
    fn test_empty_request() {
        assert_eq!(Request::parse(b""), Err(ParseError::EmptyRequest));
    }

    #[test]
    fn test_missing_terminator() {
        assert_eq!(
            Request::parse(b"GET / HTTP/1.1"),
            Err(ParseError::MissingLineTerminator)
        );
    }

    #[test]
    fn test_invalid_request_line() {
        assert_eq!(
            Request::parse(b"GET\r\n\r\n"),
            Err(ParseError::InvalidRequestLine)
        );
    }

    #[test]
    fn test_unsupported_method() {
        let result = Request::parse(b"DELETE / HTTP/1.1\r\n\r\n");
        assert!(matches!(result, Err(ParseError::UnsupportedMethod(_))));
    }

    #[test]
    fn test_invalid_version() {
        let result = Request::parse(b"GET / HTTP/2.0\r\n\r\n");
        assert!(matches!(result, Err(ParseError::InvalidHttpVersion(_))));
    }

    #[test]
    fn test_invalid_encoding() {
        assert_eq!(
            Request::parse(b"\xff\xfe / HTTP/1.1\r\n\r\n"),
            Err(ParseError::InvalidEncoding)
        );
    }
}
