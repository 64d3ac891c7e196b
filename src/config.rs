//! # Configuración del Servidor
//! src/config.rs
//!
//! Este módulo define la configuración del servidor de medios con soporte
//! completo para argumentos CLI y variables de entorno.
//!
//! La configuración se construye una sola vez al arrancar y luego se comparte
//! como `Arc<Config>` (inmutable) con el router y el empaquetador.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./media_server --port 8080 \
//!   -i /srv/media \
//!   -o /srv/cache \
//!   --workers 8 \
//!   --queue-capacity 1024
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! MEDIA_PORT=8080 MEDIA_INPUT_ROOT=/srv/media ./media_server
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Tamaño del buffer con el que se copian los archivos al socket
pub const COPY_CHUNK_BYTES: usize = 64 * 1024;

/// Errores de validación de la configuración
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("workers must be >= 1")]
    NoWorkers,

    #[error("queue capacity must be >= 1")]
    EmptyQueue,

    #[error("max request bytes must be >= 1")]
    EmptyRequestLimit,

    #[error("arena size {arena} is too small (need at least {needed} bytes)")]
    ArenaTooSmall { arena: usize, needed: usize },
}

/// Configuración del servidor de medios
#[derive(Debug, Clone, Parser)]
#[command(name = "media_server")]
#[command(about = "Servidor HTTP concurrente que empaqueta medios a DASH bajo demanda")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "MEDIA_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "MEDIA_HOST")]
    pub host: String,

    // === Raíces del sistema de archivos ===

    /// Directorio con los medios de origen
    #[arg(short = 'i', long = "input", default_value = ".", env = "MEDIA_INPUT_ROOT")]
    pub input_root: PathBuf,

    /// Directorio donde se guardan los paquetes generados
    /// (si no se indica, junto al archivo de origen)
    #[arg(short = 'o', long = "output", env = "MEDIA_OUTPUT_ROOT")]
    pub output_root: Option<PathBuf>,

    /// Directorio de assets estáticos (por defecto `<input>/web`)
    #[arg(long = "web-root", env = "MEDIA_WEB_ROOT")]
    pub web_root: Option<PathBuf>,

    // === Pool de workers ===

    /// Número de workers (por defecto, el paralelismo detectado)
    #[arg(short = 'w', long = "workers", env = "MEDIA_WORKERS")]
    pub workers: Option<usize>,

    /// Capacidad de la cola circular de conexiones
    #[arg(long = "queue-capacity", default_value = "1024", env = "MEDIA_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    // === Memoria por conexión ===

    /// Límite de la arena de cada conexión, en bytes
    #[arg(long = "arena-size", default_value = "1048576", env = "MEDIA_ARENA_SIZE")]
    pub arena_size: usize,

    /// Tamaño máximo de la cabecera de un request
    #[arg(long = "max-request-bytes", default_value = "8192", env = "MEDIA_MAX_REQUEST_BYTES")]
    pub max_request_bytes: usize,

    // === Logging ===

    /// Nivel de log por defecto (RUST_LOG tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "MEDIA_LOG")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use media_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Número efectivo de workers del pool
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Directorio de assets estáticos
    pub fn web_root(&self) -> PathBuf {
        match &self.web_root {
            Some(dir) => dir.clone(),
            None => self.input_root.join("web"),
        }
    }

    pub fn output_root(&self) -> Option<&Path> {
        self.output_root.as_deref()
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::EmptyQueue);
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::EmptyRequestLimit);
        }

        // La arena debe poder contener la cabecera y el buffer de copia
        let needed = self.max_request_bytes + COPY_CHUNK_BYTES;
        if self.arena_size < needed {
            return Err(ConfigError::ArenaTooSmall {
                arena: self.arena_size,
                needed,
            });
        }

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn log_summary(&self) {
        info!(address = %self.address(), "configuración de red");
        info!(
            input = %self.input_root.display(),
            output = %self
                .output_root
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(junto al origen)".to_string()),
            web = %self.web_root().display(),
            "raíces del sistema de archivos"
        );
        info!(
            workers = self.worker_count(),
            queue = self.queue_capacity,
            arena = self.arena_size,
            "pool de workers"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            input_root: PathBuf::from("."),
            output_root: None,
            web_root: None,
            workers: None,
            queue_capacity: 1024,
            arena_size: 1024 * 1024,
            max_request_bytes: 8192,
            log_level: "info".to_string(),
        }
    }
}
