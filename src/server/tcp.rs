//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread acepta conexiones y las entrega al pool; cada worker atiende
//! una conexión completa (un request, una respuesta) y la cierra.
//!
//! ## Ciclo de vida de una conexión
//!
//! ```text
//! arena nueva → leer cabecera → parsear → router → escribir respuesta
//!      ↑                                                    │
//!      └──────────── drop: arena liberada, socket cerrado ←─┘
//! ```
//!
//! La arena se libera al salir de `handle_connection` por cualquier camino
//! (éxito, 400, 404, error de I/O).

use crate::arena::Arena;
use crate::config::{Config, COPY_CHUNK_BYTES};
use crate::fs::{FileSystem, LocalFs};
use crate::http::{Method, Request, Response};
use crate::packager::{Orchestrator, Packager, UnavailableLibrary};
use crate::router::Router;
use crate::server::pool::ThreadPool;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Límites de memoria de cada conexión
#[derive(Debug, Clone, Copy)]
struct ConnectionLimits {
    arena_size: usize,
    max_request_bytes: usize,
}

impl ConnectionLimits {
    fn from_config(config: &Config) -> Self {
        Self {
            arena_size: config.arena_size,
            max_request_bytes: config.max_request_bytes,
        }
    }
}

/// Servidor HTTP concurrente con pool fijo de workers
pub struct Server {
    config: Arc<Config>,
    router: Arc<Router>,
}

impl Server {
    /// Arma el servidor con el sistema de archivos local y el backend de
    /// empaquetado disponible
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFs);
        let packager = default_orchestrator(Arc::clone(&fs));
        let router = Router::new(Arc::clone(&config), fs, packager);
        Self::with_router(config, router)
    }

    /// Servidor con un router ya construido
    pub fn with_router(config: Arc<Config>, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    pub fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(self.config.address())
    }

    /// Bind + loop de aceptación; solo retorna si el bind falla
    pub fn run(&self) -> io::Result<()> {
        let listener = self.bind()?;
        info!(address = %listener.local_addr()?, "servidor escuchando");
        self.serve(listener)
    }

    /// Loop de aceptación sobre un listener ya abierto
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        let router = Arc::clone(&self.router);
        let limits = ConnectionLimits::from_config(&self.config);

        let pool = ThreadPool::spawn(
            self.config.worker_count(),
            self.config.queue_capacity,
            move |stream: TcpStream| {
                if let Err(e) = handle_connection(stream, &router, limits) {
                    debug!(error = %e, "conexión terminada con error");
                }
            },
        )?;
        info!(
            workers = pool.workers(),
            queue = self.config.queue_capacity,
            "pool de conexiones listo"
        );

        accept_loop(&listener, &pool);
        Ok(())
    }
}

/// Entrega cada conexión aceptada al pool
fn accept_loop(listener: &TcpListener, pool: &ThreadPool<TcpStream>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(rejected) = pool.submit(stream) {
                    // Cola llena: se cierra sin respuesta
                    debug!(queued = pool.queued(), "cola llena, conexión descartada");
                    drop(rejected);
                }
            }
            Err(e) => {
                warn!(error = %e, "error al aceptar conexión");
            }
        }
    }
}

/// Backend real si se compiló con `ffmpeg`; si no, uno que siempre falla
fn default_orchestrator(fs: Arc<dyn FileSystem>) -> Arc<dyn Orchestrator> {
    #[cfg(feature = "ffmpeg")]
    {
        match crate::packager::ffmpeg::FfmpegLibrary::new() {
            Ok(library) => return Arc::new(Packager::new(library, fs)),
            Err(e) => warn!(error = %e, "FFmpeg no disponible, empaquetado deshabilitado"),
        }
    }

    #[cfg(not(feature = "ffmpeg"))]
    info!("compilado sin backend de empaquetado; los medios responderán 404");

    Arc::new(Packager::new(UnavailableLibrary, fs))
}

/// Atiende una conexión de punta a punta
fn handle_connection(mut stream: TcpStream, router: &Router, limits: ConnectionLimits) -> io::Result<()> {
    let mut arena = Arena::new(limits.arena_size);

    let head = arena.read_request(&mut stream, limits.max_request_bytes)?;
    if head.is_empty() {
        debug!("conexión cerrada sin request");
        return Ok(());
    }

    let (response, head_only) = match Request::parse(arena.get(head)) {
        Ok(request) => (router.route(&request), request.method() == Method::HEAD),
        Err(e) => {
            debug!(error = %e, "request inválido");
            (Response::bad_request(&e.to_string()), false)
        }
    };

    let status = response.status();
    let scratch = arena.alloc(COPY_CHUNK_BYTES)?;
    response.write_to(&mut stream, arena.get_mut(scratch), head_only)?;

    let arena_used = arena.release();
    if status.is_success() {
        debug!(status = status.as_u16(), arena = arena_used, "respuesta enviada");
    } else {
        debug!(status = %status, arena = arena_used, "respuesta de error enviada");
    }
    Ok(())
}
