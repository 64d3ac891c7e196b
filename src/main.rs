//! # Media Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada del servidor de medios.

use media_server::config::Config;
use media_server::logging;
use media_server::server::Server;
use std::process;
use tracing::{error, info};

fn main() {
    // Crear configuración (CLI + variables de entorno)
    let config = Config::new();
    logging::init(&config.log_level);

    if let Err(e) = config.validate() {
        error!(error = %e, "configuración inválida");
        process::exit(1);
    }

    if !config.input_root.is_dir() {
        error!(input = %config.input_root.display(), "la raíz de entrada no es un directorio");
        process::exit(1);
    }

    // La raíz de salida se crea si no existe
    if let Some(output) = config.output_root() {
        if let Err(e) = std::fs::create_dir_all(output) {
            error!(output = %output.display(), error = %e, "no se pudo crear la raíz de salida");
            process::exit(1);
        }
    }

    info!("media_server v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    // Iniciar el servidor (esto bloqueará el thread)
    let server = Server::new(config);
    if let Err(e) = server.run() {
        error!(error = %e, "error fatal");
        process::exit(1);
    }
}
