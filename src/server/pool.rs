//! # Pool de Workers
//! src/server/pool.rs
//!
//! Un conjunto fijo de workers drena una cola circular de capacidad fija.
//!
//! ```text
//! accept ──try_push──→ [ ring (C) ] ──pop──→ worker 0..N
//!             │
//!             └── llena → Err(item): el llamador cierra la conexión
//! ```
//!
//! Una sola cola compartida (sin colas por worker ni robo de trabajo)
//! mantiene el orden FIFO de aceptación. Los workers viven lo mismo que el
//! proceso y nunca se hace `join`; un pánico en el handler se registra y el
//! worker sigue con el siguiente elemento.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use tracing::{debug, trace, warn};

struct Ring<T> {
    slots: Box<[Option<T>]>,
    /// Siguiente posición a leer (contador monotónico)
    head: u64,
    /// Siguiente posición a escribir
    tail: u64,
}

impl<T> Ring<T> {
    fn len(&self) -> usize {
        (self.tail - self.head) as usize
    }

    fn slot(&self, counter: u64) -> usize {
        (counter % self.slots.len() as u64) as usize
    }
}

/// Cola circular acotada y thread-safe
pub struct ConnectionQueue<T> {
    ring: Mutex<Ring<T>>,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> ConnectionQueue<T> {
    /// Crea una cola con `capacity` posiciones (mínimo 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Self {
            ring: Mutex::new(Ring {
                slots: slots.into_boxed_slice(),
                head: 0,
                tail: 0,
            }),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Un worker que entró en pánico no invalida la cola: el anillo no
    /// queda a medio modificar en ningún punto de pánico
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Encola sin bloquear
    ///
    /// Retorna `Err(item)` si la cola está llena, devolviendo el elemento
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut ring = self.lock();
        if ring.len() >= self.capacity {
            return Err(item);
        }

        let at = ring.slot(ring.tail);
        ring.slots[at] = Some(item);
        ring.tail += 1;
        drop(ring);

        // Notificar a un worker esperando
        self.not_empty.notify_one();
        Ok(())
    }

    /// Desencola el elemento más antiguo
    ///
    /// Bloquea hasta que haya uno disponible
    pub fn pop(&self) -> T {
        let mut ring = self.lock();
        loop {
            if ring.len() > 0 {
                let at = ring.slot(ring.head);
                ring.head += 1;
                if let Some(item) = ring.slots[at].take() {
                    return item;
                }
                continue;
            }
            ring = self
                .not_empty
                .wait(ring)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Pool fijo de workers que procesa elementos de tipo `T`
pub struct ThreadPool<T> {
    queue: Arc<ConnectionQueue<T>>,
    workers: usize,
}

impl<T: Send + 'static> ThreadPool<T> {
    /// Lanza `workers` threads que ejecutan `handler` sobre cada elemento
    pub fn spawn<F>(workers: usize, capacity: usize, handler: F) -> io::Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let queue = Arc::new(ConnectionQueue::new(capacity));
        let handler = Arc::new(handler);

        for i in 0..workers {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            thread::Builder::new()
                .name(format!("worker-{}", i))
                .spawn(move || Self::worker_loop(queue, handler))?;
        }

        debug!(workers, capacity = queue.capacity(), "pool iniciado");
        Ok(Self { queue, workers })
    }

    /// Loop principal del worker
    fn worker_loop<F: Fn(T)>(queue: Arc<ConnectionQueue<T>>, handler: Arc<F>) {
        trace!("worker listo");
        loop {
            let item = queue.pop();
            if panic::catch_unwind(AssertUnwindSafe(|| handler(item))).is_err() {
                warn!("pánico en el handler, el worker continúa");
            }
        }
    }

    /// Entrega un elemento al pool; `Err(item)` si la cola está llena
    pub fn submit(&self, item: T) -> Result<(), T> {
        self.queue.try_push(item)
    }

    /// Elementos esperando en la cola
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}
