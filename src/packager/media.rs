//! # Interfaz con la Biblioteca de Empaquetado
//! src/packager/media.rs
//!
//! El demux/mux de contenedores lo hace una biblioteca externa. Este módulo
//! define el contrato que el orquestador necesita de ella (`MediaLibrary`),
//! los descriptores de streams y la aritmética de time bases.
//!
//! ## Operaciones del contrato
//!
//! ```text
//! open_input → probe_streams → new_output → add_stream → write_header
//!           → read_next_packet* → write_packet* → write_trailer → (drop = close)
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errores reportados por la biblioteca de empaquetado
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("can't open '{path}': {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("can't read stream info: {0}")]
    Probe(String),

    #[error("can't create output '{path}': {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("can't add stream: {0}")]
    Stream(String),

    #[error("can't write header: {0}")]
    Header(String),

    #[error("can't process packet: {0}")]
    Packet(String),

    #[error("can't write trailer: {0}")]
    Trailer(String),

    #[error("no media packaging backend is available")]
    Unavailable,
}

/// Tipo de medio de un stream elemental
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Video,
    Audio,
    Subtitle,
    Other,
}

/// Identificador de códec, independiente de la biblioteca
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodecId {
    H264,
    Hevc,
    Vp9,
    Av1,
    Mp3,
    Aac,
    Ac3,
    Eac3,
    Opus,
    Flac,
    Ssa,
    Ass,
    Srt,
    SubRip,
    Other(String),
}

/// Unidad racional de los timestamps de un stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub num: i32,
    pub den: i32,
}

impl TimeBase {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }
}

/// Reescala `value` de `from` a `to`, redondeando al más cercano
/// (mitades lejos de cero)
pub fn rescale(value: i64, from: TimeBase, to: TimeBase) -> i64 {
    let numer = i128::from(value) * i128::from(from.num) * i128::from(to.den);
    let denom = i128::from(from.den) * i128::from(to.num);
    if denom == 0 {
        return 0;
    }

    // Normalizar el signo del denominador
    let (numer, denom) = if denom < 0 { (-numer, -denom) } else { (numer, denom) };
    let half = denom / 2;
    let rounded = if numer >= 0 {
        (numer + half) / denom
    } else {
        (numer - half) / denom
    };

    i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN })
}

/// Un stream elemental del contenedor de origen
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub index: usize,
    pub media_type: MediaType,
    pub codec: CodecId,
    /// Bits por segundo; 0 = sin definir
    pub bit_rate: u64,
    /// Muestras por frame de audio; 0 = sin definir
    pub frame_size: u32,
    pub time_base: TimeBase,
    /// Tags de metadatos del contenedor (`language`, `BPS`, ...)
    pub tags: HashMap<String, String>,
}

impl StreamDescriptor {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn language(&self) -> Option<&str> {
        self.tag("language")
    }
}

/// Parámetros que se sobrescriben al copiar un stream al destino
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOverrides {
    pub bit_rate: Option<u64>,
    pub frame_size: Option<u32>,
}

/// Tipo de contenedor de salida
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Manifiesto DASH + segmentos fragmentados
    Dash,
    /// Archivo de subtítulos de un solo stream; el nombre es el del muxer
    Subtitle { muxer: &'static str },
}

/// Paquete demultiplexado, tal como lo expone la biblioteca
pub trait MediaPacket {
    fn stream_index(&self) -> usize;
    fn set_stream_index(&mut self, index: usize);
    fn pts(&self) -> Option<i64>;
    fn set_pts(&mut self, pts: Option<i64>);
    fn dts(&self) -> Option<i64>;
    fn set_dts(&mut self, dts: Option<i64>);
    fn duration(&self) -> i64;
    fn set_duration(&mut self, duration: i64);
    /// Borra la posición en bytes del origen (no aplica al destino)
    fn clear_position(&mut self);
}

/// Biblioteca externa de demux/mux
///
/// Los handles (`Input`, `Output`) se cierran al hacer drop.
pub trait MediaLibrary: Send + Sync {
    type Input;
    type Output;
    type Packet: MediaPacket;

    fn open_input(&self, path: &Path) -> Result<Self::Input, MediaError>;

    fn probe_streams(&self, input: &Self::Input) -> Vec<StreamDescriptor>;

    fn new_output(&self, kind: OutputKind, path: &Path) -> Result<Self::Output, MediaError>;

    /// Agrega al destino una copia del stream `source_index` del origen;
    /// devuelve el índice del stream creado
    fn add_stream(
        &self,
        output: &mut Self::Output,
        input: &Self::Input,
        source_index: usize,
        overrides: StreamOverrides,
    ) -> Result<usize, MediaError>;

    fn write_header(&self, output: &mut Self::Output, options: &[(&str, &str)]) -> Result<(), MediaError>;

    /// Time base de un stream de salida (definitivo tras `write_header`)
    fn output_time_base(&self, output: &Self::Output, index: usize) -> TimeBase;

    /// `Ok(None)` al llegar al final del origen
    fn read_next_packet(&self, input: &mut Self::Input) -> Result<Option<Self::Packet>, MediaError>;

    fn write_packet(&self, output: &mut Self::Output, packet: &mut Self::Packet) -> Result<(), MediaError>;

    fn write_trailer(&self, output: &mut Self::Output) -> Result<(), MediaError>;
}

/// Backend usado cuando el binario se compila sin soporte de empaquetado
///
/// Todo intento de abrir un origen falla con `MediaError::Unavailable`; el
/// resto del servidor funciona con normalidad.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLibrary;

impl MediaPacket for Infallible {
    fn stream_index(&self) -> usize {
        match *self {}
    }
    fn set_stream_index(&mut self, _index: usize) {
        match *self {}
    }
    fn pts(&self) -> Option<i64> {
        match *self {}
    }
    fn set_pts(&mut self, _pts: Option<i64>) {
        match *self {}
    }
    fn dts(&self) -> Option<i64> {
        match *self {}
    }
    fn set_dts(&mut self, _dts: Option<i64>) {
        match *self {}
    }
    fn duration(&self) -> i64 {
        match *self {}
    }
    fn set_duration(&mut self, _duration: i64) {
        match *self {}
    }
    fn clear_position(&mut self) {
        match *self {}
    }
}

impl MediaLibrary for UnavailableLibrary {
    type Input = Infallible;
    type Output = Infallible;
    type Packet = Infallible;

    fn open_input(&self, _path: &Path) -> Result<Infallible, MediaError> {
        Err(MediaError::Unavailable)
    }

    fn probe_streams(&self, input: &Infallible) -> Vec<StreamDescriptor> {
        match *input {}
    }

    fn new_output(&self, _kind: OutputKind, _path: &Path) -> Result<Infallible, MediaError> {
        Err(MediaError::Unavailable)
    }

    fn add_stream(
        &self,
        output: &mut Infallible,
        _input: &Infallible,
        _source_index: usize,
        _overrides: StreamOverrides,
    ) -> Result<usize, MediaError> {
        match *output {}
    }

    fn write_header(&self, output: &mut Infallible, _options: &[(&str, &str)]) -> Result<(), MediaError> {
        match *output {}
    }

    fn output_time_base(&self, output: &Infallible, _index: usize) -> TimeBase {
        match *output {}
    }

    fn read_next_packet(&self, input: &mut Infallible) -> Result<Option<Infallible>, MediaError> {
        match *input {}
    }

    fn write_packet(&self, output: &mut Infallible, _packet: &mut Infallible) -> Result<(), MediaError> {
        match *output {}
    }

    fn write_trailer(&self, output: &mut Infallible) -> Result<(), MediaError> {
        match *output {}
    }
}
