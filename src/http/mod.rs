//! # Módulo HTTP
//!
//! Implementación mínima de HTTP/1.x sin librerías de alto nivel:
//!
//! - Parsing de la request line
//! - Respuestas de forma fija (status, Content-Type, Content-Length, body)
//! - Status codes 200 / 400 / 404
//! - Content-Type por extensión
//!
//! No hay keep-alive, chunked transfer ni rangos: una conexión, un request,
//! una respuesta.

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

// Re-exportamos los tipos principales para facilitar su uso
pub use request::{Method, ParseError, Request};
pub use response::{Body, Response};
pub use status::StatusCode;
