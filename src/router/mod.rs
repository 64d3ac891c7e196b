//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo clasifica cada request en una `Route` y la despacha.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → reglas (en orden) → Route → dispatch → Response
//! ```
//!
//! Las reglas se evalúan en prioridad fija y gana la primera que aplica:
//!
//! 1. `""` o `/` → `index.html` del directorio web
//! 2. `..` en cualquier parte de la ruta → 400, sin tocar el sistema de archivos
//! 3. `/css/*`, `/js/*` → asset estático del directorio web
//! 4. extensión de medio (`mkv`, `mp4`) → empaquetado bajo demanda
//! 5. forma en disco: raíz de salida primero, después raíz de entrada
//!    (directorio → listado, archivo → contenido, nada → 404)
//!
//! Como mucho se hacen dos `stat` por request.

use crate::config::Config;
use crate::fs::{EntryKind, FileSystem};
use crate::http::{mime, Request, Response, StatusCode};
use crate::packager::{Orchestrator, PackageJob};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Extensiones de contenedores de origen que se empaquetan
pub const MEDIA_EXTENSIONS: &[&str] = &["mkv", "mp4"];

/// Prefijos servidos desde el directorio web
pub const STATIC_PREFIXES: &[&str] = &["/css/", "/js/"];

const INDEX_FILE: &str = "index.html";

/// Resultado de clasificar un request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Archivo del directorio web con Content-Type fijo
    StaticAsset {
        path: PathBuf,
        content_type: &'static str,
    },
    /// Medio de origen a empaquetar
    MediaAsset(PackageJob),
    DirectoryListing(PathBuf),
    RawFile(PathBuf),
    NotFound,
    BadRequest,
}

/// Una regla devuelve `Some` si le corresponde el path
type Rule = fn(&Router, &str) -> Option<Route>;

/// Reglas en orden de prioridad
const RULES: &[Rule] = &[
    Router::index_rule,
    Router::traversal_rule,
    Router::static_rule,
    Router::media_rule,
];

/// Router del servidor de medios
pub struct Router {
    config: Arc<Config>,
    fs: Arc<dyn FileSystem>,
    packager: Arc<dyn Orchestrator>,
}

impl Router {
    pub fn new(config: Arc<Config>, fs: Arc<dyn FileSystem>, packager: Arc<dyn Orchestrator>) -> Self {
        Self {
            config,
            fs,
            packager,
        }
    }

    /// Clasifica y despacha un request
    ///
    /// # Ejemplo
    /// ```no_run
    /// # use media_server::router::Router;
    /// # use media_server::http::Request;
    /// # fn demo(router: &Router) {
    /// let raw = b"GET /show/ep1.mkv HTTP/1.1\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    /// let response = router.route(&request);
    /// # }
    /// ```
    pub fn route(&self, request: &Request) -> Response {
        let route = self.classify(request.path());
        debug!(
            method = request.method().as_str(),
            path = request.path(),
            query = request.query(),
            version = request.version(),
            route = ?route,
            "ruta"
        );
        self.dispatch(route)
    }

    /// Deriva la ruta a partir del path y del estado del disco
    pub fn classify(&self, path: &str) -> Route {
        RULES
            .iter()
            .find_map(|rule| rule(self, path))
            .unwrap_or_else(|| self.filesystem_rule(path))
    }

    // ==================== Reglas ====================

    fn index_rule(&self, path: &str) -> Option<Route> {
        if path.is_empty() || path == "/" {
            return Some(Route::StaticAsset {
                path: self.config.web_root().join(INDEX_FILE),
                content_type: mime::TEXT_HTML,
            });
        }
        None
    }

    fn traversal_rule(&self, path: &str) -> Option<Route> {
        path.contains("..").then_some(Route::BadRequest)
    }

    fn static_rule(&self, path: &str) -> Option<Route> {
        if !STATIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
            return None;
        }
        let file = self.config.web_root().join(relative(path));
        Some(Route::StaticAsset {
            content_type: mime::content_type(&file),
            path: file,
        })
    }

    fn media_rule(&self, path: &str) -> Option<Route> {
        let rel = relative(path);
        let rel_path = Path::new(rel);
        let ext = rel_path.extension()?.to_str()?;
        if !MEDIA_EXTENSIONS.contains(&ext) {
            return None;
        }
        let stem = rel_path.file_stem()?.to_str()?;

        let source = self.config.input_root.join(rel_path);
        let job = match self.config.output_root() {
            Some(out) => PackageJob {
                source,
                destination: out.join(stem),
                public_dir: stem.to_string(),
            },
            None => {
                let url_dir = rel.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
                let public_dir = if url_dir.is_empty() {
                    stem.to_string()
                } else {
                    format!("{}/{}", url_dir, stem)
                };
                PackageJob {
                    destination: source.with_file_name(stem),
                    source,
                    public_dir,
                }
            }
        };
        Some(Route::MediaAsset(job))
    }

    /// Última regla: siempre decide
    fn filesystem_rule(&self, path: &str) -> Route {
        let rel = relative(path);
        let roots = self
            .config
            .output_root()
            .into_iter()
            .chain(std::iter::once(self.config.input_root.as_path()));

        for root in roots {
            let candidate = root.join(rel);
            match self.fs.entry_kind(&candidate) {
                Some(EntryKind::Directory) => return Route::DirectoryListing(candidate),
                Some(EntryKind::File) => return Route::RawFile(candidate),
                None => continue,
            }
        }
        Route::NotFound
    }

    // ==================== Dispatch ====================

    fn dispatch(&self, route: Route) -> Response {
        match route {
            Route::StaticAsset { path, content_type } => self.serve_file(&path, content_type),
            Route::RawFile(path) => {
                let content_type = mime::content_type(&path);
                self.serve_file(&path, content_type)
            }
            Route::DirectoryListing(dir) => match self.fs.list_dir(&dir) {
                Ok(names) => Response::text(StatusCode::Ok, &names.join("\n")),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "no se pudo listar el directorio");
                    Response::not_found("not found")
                }
            },
            Route::MediaAsset(job) => {
                let listing = self.packager.package(&job);
                if listing.is_empty() {
                    Response::not_found("can't generate media")
                } else {
                    Response::text(StatusCode::Ok, &listing)
                }
            }
            Route::NotFound => Response::not_found("not found"),
            Route::BadRequest => Response::bad_request("bad request"),
        }
    }

    fn serve_file(&self, path: &Path, content_type: &'static str) -> Response {
        match self.fs.open_read(path) {
            Ok((reader, stat)) => Response::file(content_type, reader, stat.size),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "archivo no disponible");
                Response::not_found("not found")
            }
        }
    }
}

/// Path del URL sin las barras iniciales, para unirlo a una raíz
fn relative(path: &str) -> &str {
    path.trim_start_matches('/')
}
