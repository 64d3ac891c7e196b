//! # Arena por Conexión
//! src/arena.rs
//!
//! Región de memoria tipo *bump allocator*: cada conexión adquiere una arena
//! al empezar y la libera como una unidad al terminar. Las asignaciones solo
//! avanzan la marca de agua (`watermark`); no existe liberación individual.
//!
//! ```text
//! region: [ request ......|scratch ............|          ]
//!          ^0              ^slot.offset         ^watermark ^limit
//! ```
//!
//! Las asignaciones se devuelven como `Slot` (offset + longitud) en lugar de
//! referencias, así la arena puede seguir creciendo sin invalidarlas. La
//! liberación ocurre en `Drop`, por lo que ningún camino de salida (éxito,
//! request malformado, 404, error de I/O) puede olvidarla.

use std::io::{self, Read};
use thiserror::Error;
use tracing::trace;

/// Capacidad inicial reservada; la región crece bajo demanda hasta el límite
const INITIAL_CAPACITY: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },
}

impl From<ArenaError> for io::Error {
    fn from(err: ArenaError) -> Self {
        io::Error::new(io::ErrorKind::OutOfMemory, err)
    }
}

/// Referencia a una asignación dentro de una arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    offset: usize,
    len: usize,
}

impl Slot {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Región de memoria de una conexión
#[derive(Debug)]
pub struct Arena {
    region: Vec<u8>,
    watermark: usize,
    limit: usize,
}

impl Arena {
    /// Crea una arena que nunca crecerá más allá de `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self {
            region: Vec::with_capacity(limit.min(INITIAL_CAPACITY)),
            watermark: 0,
            limit,
        }
    }

    /// Reserva `len` bytes (inicializados a cero)
    pub fn alloc(&mut self, len: usize) -> Result<Slot, ArenaError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(ArenaError::Exhausted {
                requested: len,
                remaining,
            });
        }

        let offset = self.watermark;
        self.watermark += len;
        if self.region.len() < self.watermark {
            self.region.resize(self.watermark, 0);
        }

        Ok(Slot { offset, len })
    }

    /// Recorta la asignación más reciente a `new_len` bytes
    ///
    /// Solo la última asignación puede recortarse; cualquier otro slot se
    /// devuelve intacto.
    pub fn shrink_last(&mut self, slot: Slot, new_len: usize) -> Slot {
        if slot.offset + slot.len != self.watermark || new_len >= slot.len {
            return slot;
        }
        self.watermark = slot.offset + new_len;
        Slot {
            offset: slot.offset,
            len: new_len,
        }
    }

    pub fn get(&self, slot: Slot) -> &[u8] {
        &self.region[slot.offset..slot.offset + slot.len]
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut [u8] {
        &mut self.region[slot.offset..slot.offset + slot.len]
    }

    /// Lee la cabecera de un request HTTP dentro de la arena
    ///
    /// Lee hasta encontrar `\r\n\r\n`, hasta EOF o hasta `max` bytes. Un slot
    /// vacío significa que el peer cerró sin enviar nada.
    pub fn read_request<R: Read>(&mut self, reader: &mut R, max: usize) -> io::Result<Slot> {
        let slot = self.alloc(max)?;
        let mut filled = 0;

        while filled < max {
            let n = {
                let buf = self.get_mut(slot);
                match reader.read(&mut buf[filled..]) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            };
            if n == 0 {
                break;
            }

            // Solo hace falta revisar la zona recién leída (más 3 bytes de solape)
            let scan_from = filled.saturating_sub(3);
            filled += n;
            if contains_head_terminator(&self.get(slot)[scan_from..filled]) {
                break;
            }
        }

        Ok(self.shrink_last(slot, filled))
    }

    /// Bytes asignados hasta ahora
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.watermark
    }

    /// Libera la arena explícitamente y devuelve la marca de agua final
    pub fn release(self) -> usize {
        self.watermark
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        trace!(watermark = self.watermark, limit = self.limit, "arena liberada");
    }
}

fn contains_head_terminator(bytes: &[u8]) -> bool {
    bytes.windows(4).any(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(arena: &mut Arena, bytes: &[u8]) -> Slot {
        let slot = arena.alloc(bytes.len()).unwrap();
        arena.get_mut(slot).copy_from_slice(bytes);
        slot
    }
    use std::io::Cursor;

    #[test]
    fn test_alloc_advances_watermark() {
        let mut arena = Arena::new(64);
        let a = arena.alloc(10).unwrap();
        let b = arena.alloc(20).unwrap();

        assert_eq!(a.len(), 10);
        assert_eq!(b.len(), 20);
        assert_eq!(arena.watermark(), 30);
        assert_eq!(arena.remaining(), 34);
    }

    #[test]
    fn test_alloc_exhausted() {
        let mut arena = Arena::new(16);
        arena.alloc(10).unwrap();
        let err = arena.alloc(7).unwrap_err();

        assert_eq!(
            err,
            ArenaError::Exhausted {
                requested: 7,
                remaining: 6
            }
        );
        // Un fallo no mueve la marca de agua
        assert_eq!(arena.watermark(), 10);
    }

    #[test]
    fn test_alloc_and_get() {
        let mut arena = Arena::new(64);
        let hello = push(&mut arena, b"hello");
        let world = push(&mut arena, b"world");

        assert_eq!(arena.get(hello), b"hello");
        assert_eq!(arena.get(world), b"world");
    }

    #[test]
    fn test_slots_survive_growth() {
        let mut arena = Arena::new(INITIAL_CAPACITY * 4);
        let first = push(&mut arena, b"first");
        arena.alloc(INITIAL_CAPACITY * 2).unwrap();

        assert_eq!(arena.get(first), b"first");
    }

    #[test]
    fn test_shrink_last_only() {
        let mut arena = Arena::new(64);
        let a = arena.alloc(8).unwrap();
        let b = arena.alloc(8).unwrap();

        // `a` no es la última asignación: no cambia
        assert_eq!(arena.shrink_last(a, 2), a);

        let b = arena.shrink_last(b, 3);
        assert_eq!(b.len(), 3);
        assert_eq!(arena.watermark(), 11);
    }

    #[test]
    fn test_release_returns_watermark() {
        let mut arena = Arena::new(64);
        arena.alloc(12).unwrap();
        assert_eq!(arena.release(), 12);
    }

    // ==================== Lectura de requests ====================

    #[test]
    fn test_read_request_stops_at_terminator() {
        let mut arena = Arena::new(1024);
        let mut input = Cursor::new(b"GET / HTTP/1.0\r\n\r\n".to_vec());

        let slot = arena.read_request(&mut input, 512).unwrap();

        assert_eq!(arena.get(slot), b"GET / HTTP/1.0\r\n\r\n");
        assert_eq!(arena.watermark(), slot.len());
    }

    #[test]
    fn test_read_request_empty_peer() {
        let mut arena = Arena::new(1024);
        let mut input = Cursor::new(Vec::new());

        let slot = arena.read_request(&mut input, 512).unwrap();

        assert!(slot.is_empty());
        assert_eq!(arena.watermark(), 0);
    }

    #[test]
    fn test_read_request_truncates_at_max() {
        let mut arena = Arena::new(1024);
        let mut input = Cursor::new(vec![b'a'; 100]);

        let slot = arena.read_request(&mut input, 16).unwrap();

        assert_eq!(slot.len(), 16);
    }

    #[test]
    fn test_read_request_larger_than_arena() {
        let mut arena = Arena::new(8);
        let mut input = Cursor::new(b"GET / HTTP/1.0\r\n\r\n".to_vec());

        let err = arena.read_request(&mut input, 512).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::OutOfMemory);
    }

    /// Reader que entrega los datos de a un byte, para partir el terminador
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_read_request_split_terminator() {
        let mut arena = Arena::new(1024);
        let mut input = Trickle(Cursor::new(b"GET /a HTTP/1.1\r\n\r\nextra".to_vec()));

        let slot = arena.read_request(&mut input, 512).unwrap();

        assert_eq!(arena.get(slot), b"GET /a HTTP/1.1\r\n\r\n");
    }
}
