//! # Logging
//! src/logging.rs
//!
//! Inicializa el subscriber de `tracing`. El nivel por defecto viene de la
//! configuración; si `RUST_LOG` está definida, tiene prioridad.

use tracing_subscriber::EnvFilter;

/// Instala el subscriber global
///
/// Llamarla más de una vez no tiene efecto (útil en tests).
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init("debug");
        init("not a valid filter ===");
    }
}
