//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones y las encola en un pool fijo de workers
//! 3. Descarta conexiones cuando la cola está llena
//! 4. Atiende cada conexión dentro de su propia arena

pub mod pool;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use pool::{ConnectionQueue, ThreadPool};
pub use tcp::Server;
