//! # Orquestador de Empaquetado
//! src/packager/mod.rs
//!
//! La primera vez que se pide un medio de origen se empaqueta a DASH
//! (manifiesto + segmentos + subtítulos aparte); las siguientes veces se
//! responde desde la caché.
//!
//! ## Flujo
//!
//! ```text
//! ¿existe <destino>-index? ── sí ──→ devolver su contenido (sin escrituras)
//!          │ no
//!          ↓
//! crear <destino>/ → remux → ¿ok? ── sí ──→ escribir <destino>-index
//!                              │ no
//!                              ↓
//!              borrar lo que agregó este intento → "" (el router responde 404)
//! ```
//!
//! El archivo `-index` (centinela) es la única fuente de verdad de "ya
//! empaquetado": se escribe solo después de cerrar todas las salidas, así
//! que nunca nombra un archivo inexistente. Si el proceso se interrumpe
//! antes, el siguiente request vuelve a empaquetar desde cero.
//!
//! La limpieza de un intento fallido toca solo lo que ese intento creó: si
//! el directorio destino ya existía, se borran únicamente las entradas
//! nuevas; si lo creó el intento, se borra entero.
//!
//! Dos workers que piden el mismo título a la vez empaquetan los dos; gana
//! el último centinela escrito. Una vez que existe un centinela, ningún
//! intento fallido borra nada del destino.

pub mod codecs;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod media;
pub mod remux;

#[cfg(test)]
pub(crate) mod fake;

pub use media::{MediaError, MediaLibrary, UnavailableLibrary};

use crate::fs::{with_suffix, EntryKind, FileSystem};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Sufijo del centinela, pegado al nombre del directorio destino
pub const SENTINEL_SUFFIX: &str = "-index";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("source has no playable audio/video streams")]
    NoPlayableStreams,

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Un pedido de empaquetado
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageJob {
    /// Archivo de origen
    pub source: PathBuf,
    /// Directorio donde se escriben manifiesto, segmentos y subtítulos
    pub destination: PathBuf,
    /// Prefijo con el que se publican las rutas generadas
    pub public_dir: String,
}

impl PackageJob {
    pub fn sentinel_path(&self) -> PathBuf {
        with_suffix(&self.destination, SENTINEL_SUFFIX)
    }
}

/// Empaquetado bajo demanda, visto desde el router
pub trait Orchestrator: Send + Sync {
    /// Devuelve las rutas del paquete separadas por `\n`, o `""` si falló
    fn package(&self, job: &PackageJob) -> String;
}

/// Orquestador sobre una biblioteca de medios concreta
pub struct Packager<L> {
    library: L,
    fs: Arc<dyn FileSystem>,
}

impl<L: MediaLibrary> Packager<L> {
    pub fn new(library: L, fs: Arc<dyn FileSystem>) -> Self {
        Self { library, fs }
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Igual que `package`, pero con el error explícito
    pub fn try_package(&self, job: &PackageJob) -> Result<String, PackageError> {
        if !self.fs.exists(&job.source) {
            return Err(PackageError::SourceMissing(job.source.clone()));
        }

        // 1. Cache hit: devolver el centinela tal cual
        let sentinel = job.sentinel_path();
        if self.fs.exists(&sentinel) {
            debug!(sentinel = %sentinel.display(), "paquete en caché");
            let contents = self.fs.read_file(&sentinel)?;
            return Ok(String::from_utf8_lossy(&contents).into_owned());
        }

        // 2. Generar
        info!(source = %job.source.display(), destination = %job.destination.display(), "empaquetando");
        let preexisting = if self.fs.is_dir(&job.destination) {
            Some(self.fs.list_dir(&job.destination)?)
        } else {
            None
        };
        self.fs.create_dir_all(&job.destination)?;

        let generated = match remux::remux(&self.library, &job.source, &job.destination, &job.public_dir) {
            Ok(generated) => generated,
            Err(e) => {
                self.discard(job, preexisting.as_deref());
                return Err(e);
            }
        };

        // 3. Confirmar: todas las salidas ya están cerradas
        let listing = generated.join("\n");
        if let Err(e) = self.fs.write_atomic(&sentinel, listing.as_bytes()) {
            if self.fs.exists(&sentinel) {
                warn!(sentinel = %sentinel.display(), error = %e, "otro intento confirmó el paquete primero");
                let contents = self.fs.read_file(&sentinel)?;
                return Ok(String::from_utf8_lossy(&contents).into_owned());
            }
            self.discard(job, preexisting.as_deref());
            return Err(e.into());
        }

        info!(files = generated.len(), sentinel = %sentinel.display(), "paquete generado");
        Ok(listing)
    }

    /// Deshace un intento fallido
    ///
    /// `preexisting` son las entradas que ya tenía el destino antes del
    /// intento, o `None` si el intento creó el directorio.
    fn discard(&self, job: &PackageJob, preexisting: Option<&[String]>) {
        let destination = &job.destination;
        if self.fs.exists(&job.sentinel_path()) {
            debug!(destination = %destination.display(), "paquete confirmado por otro intento, nada que limpiar");
            return;
        }

        let result = match preexisting {
            None => self.fs.remove_dir_all(destination),
            Some(before) => self.remove_new_entries(destination, before),
        };
        if let Err(e) = result {
            warn!(destination = %destination.display(), error = %e, "no se pudo limpiar el intento fallido");
        }
    }

    fn remove_new_entries(&self, destination: &Path, before: &[String]) -> io::Result<()> {
        for name in self.fs.list_dir(destination)? {
            if before.binary_search(&name).is_ok() {
                continue;
            }
            let path = destination.join(&name);
            match self.fs.entry_kind(&path) {
                Some(EntryKind::Directory) => self.fs.remove_dir_all(&path)?,
                Some(EntryKind::File) => self.fs.remove_file(&path)?,
                None => {}
            }
        }
        Ok(())
    }
}

impl<L: MediaLibrary> Orchestrator for Packager<L> {
    fn package(&self, job: &PackageJob) -> String {
        match self.try_package(job) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(source = %job.source.display(), error = %e, "empaquetado fallido");
                String::new()
            }
        }
    }
}
