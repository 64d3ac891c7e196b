//! # Media Server
//! src/lib.rs
//!
//! Servidor HTTP concurrente que sirve assets estáticos y, la primera vez
//! que se pide un archivo de medio, lo empaqueta a DASH (manifiesto +
//! segmentos + subtítulos aparte) y guarda el resultado en caché.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `config`: Configuración CLI/env, inmutable después del arranque
//! - `logging`: Inicialización de `tracing`
//! - `arena`: Memoria por conexión, liberada como una unidad
//! - `fs`: Adaptador del sistema de archivos
//! - `http`: Parsing de la request line y escritura de respuestas
//! - `router`: Reglas de ruteo y despacho
//! - `server`: Loop de aceptación y pool de workers
//! - `packager`: Orquestador de empaquetado bajo demanda
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use media_server::config::Config;
//! use media_server::server::Server;
//!
//! let config = Config::default();
//! let server = Server::new(config);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod arena;
pub mod config;
pub mod fs;
pub mod http;
pub mod logging;
pub mod packager;
pub mod router;
pub mod server;
