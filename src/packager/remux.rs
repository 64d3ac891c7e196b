//! # Remux a DASH
//! src/packager/remux.rs
//!
//! Ejecuta un empaquetado completo contra una `MediaLibrary`:
//!
//! 1. Abre el origen y clasifica cada stream con la lista de códecs.
//! 2. Audio/video aceptado → stream del manifiesto (índices en orden
//!    ascendente del origen). Subtítulo aceptado → archivo propio, con el
//!    header escrito de inmediato.
//! 3. Escribe el header del manifiesto (necesita todos los streams declarados).
//! 4. Demultiplexa una sola vez: reescala timestamps y escribe cada paquete
//!    en su salida. En el manifiesto un timestamp sin definir cuenta como 0;
//!    en los subtítulos sigue sin definir.
//! 5. Escribe los trailers y cierra todo.
//!
//! Cualquier error corta el intento; limpiar las salidas parciales es
//! responsabilidad del llamador.

use super::codecs::{self, Acceptance};
use super::media::{
    rescale, MediaLibrary, MediaPacket, MediaType, OutputKind, StreamDescriptor, StreamOverrides,
    TimeBase,
};
use super::PackageError;
use std::path::Path;
use tracing::debug;

/// Nombre del manifiesto dentro del directorio destino
pub const MANIFEST_NAME: &str = "manifest.mpd";

/// Opciones del muxer DASH
pub const DASH_OPTIONS: &[(&str, &str)] = &[("index_correction", "1"), ("streaming", "1")];

/// Lenguaje usado cuando el stream no trae el tag `language`
const UNKNOWN_LANGUAGE: &str = "unknown";

/// Destino de un stream del origen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    Excluded,
    /// Índice del stream en el manifiesto
    Manifest(usize),
    /// Archivo de subtítulos propio
    Subtitle { file_name: String, muxer: &'static str },
}

/// Plan de empaquetado: un destino por cada stream del origen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan {
    pub targets: Vec<StreamTarget>,
}

impl StreamPlan {
    /// Construye el plan recorriendo los streams en orden de origen
    pub fn build(streams: &[StreamDescriptor]) -> Self {
        let mut next_manifest_index = 0;
        let targets = streams
            .iter()
            .map(|stream| match codecs::classify(stream) {
                Some(Acceptance::Manifest) => {
                    let index = next_manifest_index;
                    next_manifest_index += 1;
                    StreamTarget::Manifest(index)
                }
                Some(Acceptance::Subtitle { extension, muxer }) => StreamTarget::Subtitle {
                    file_name: format!(
                        "{}{}.{}",
                        stream.language().unwrap_or(UNKNOWN_LANGUAGE),
                        stream.index,
                        extension
                    ),
                    muxer,
                },
                None => StreamTarget::Excluded,
            })
            .collect();

        Self { targets }
    }

    /// Índice en el manifiesto del stream `source_index`, si va ahí
    pub fn manifest_index(&self, source_index: usize) -> Option<usize> {
        match self.targets.get(source_index) {
            Some(StreamTarget::Manifest(index)) => Some(*index),
            _ => None,
        }
    }

    pub fn manifest_stream_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t, StreamTarget::Manifest(_)))
            .count()
    }
}

/// Parámetros que hay que completar al copiar un stream al manifiesto
pub fn overrides_for(stream: &StreamDescriptor) -> StreamOverrides {
    let bit_rate = if stream.bit_rate == 0 {
        stream.tag("BPS").and_then(|bps| bps.trim().parse::<u64>().ok())
    } else {
        None
    };

    let frame_size = if stream.media_type == MediaType::Audio && stream.frame_size == 0 {
        Some(codecs::default_frame_size(&stream.codec))
    } else {
        None
    };

    StreamOverrides { bit_rate, frame_size }
}

/// Reescala pts/dts/duración; un timestamp sin definir cuenta como 0
pub fn rescale_packet<P: MediaPacket>(packet: &mut P, from: TimeBase, to: TimeBase) {
    let pts = packet.pts().unwrap_or(0);
    let dts = packet.dts().unwrap_or(0);
    packet.set_pts(Some(rescale(pts, from, to)));
    packet.set_dts(Some(rescale(dts, from, to)));
    packet.set_duration(rescale(packet.duration(), from, to));
    packet.clear_position();
}

/// Reescala un paquete de subtítulos: solo los timestamps definidos y una
/// duración positiva; lo demás queda igual
pub fn rescale_subtitle_packet<P: MediaPacket>(packet: &mut P, from: TimeBase, to: TimeBase) {
    packet.set_pts(packet.pts().map(|pts| rescale(pts, from, to)));
    packet.set_dts(packet.dts().map(|dts| rescale(dts, from, to)));
    if packet.duration() > 0 {
        packet.set_duration(rescale(packet.duration(), from, to));
    }
}

/// Salida de subtítulos abierta para un stream del origen
struct SubtitleOutput<O> {
    output: O,
    time_base: TimeBase,
}

/// Empaqueta `source` dentro de `destination`
///
/// Devuelve las rutas generadas como `<public_dir>/<archivo>`: primero los
/// subtítulos en orden de origen y al final el manifiesto.
pub fn remux<L: MediaLibrary>(
    library: &L,
    source: &Path,
    destination: &Path,
    public_dir: &str,
) -> Result<Vec<String>, PackageError> {
    let mut input = library.open_input(source)?;
    let streams = library.probe_streams(&input);
    let plan = StreamPlan::build(&streams);

    if plan.manifest_stream_count() == 0 {
        return Err(PackageError::NoPlayableStreams);
    }

    let public = |name: &str| {
        if public_dir.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", public_dir, name)
        }
    };

    let mut generated = Vec::new();
    let mut manifest = library.new_output(OutputKind::Dash, &destination.join(MANIFEST_NAME))?;
    let mut subtitles: Vec<Option<SubtitleOutput<L::Output>>> = Vec::with_capacity(streams.len());

    // Declarar streams: manifiesto diferido, subtítulos inmediatos
    for (stream, target) in streams.iter().zip(&plan.targets) {
        let mut subtitle = None;
        match target {
            StreamTarget::Excluded => {
                debug!(index = stream.index, codec = ?stream.codec, "stream excluido");
            }
            StreamTarget::Manifest(_) => {
                library.add_stream(&mut manifest, &input, stream.index, overrides_for(stream))?;
            }
            StreamTarget::Subtitle { file_name, muxer } => {
                let path = destination.join(file_name);
                let mut output = library.new_output(OutputKind::Subtitle { muxer: *muxer }, &path)?;
                let out_index =
                    library.add_stream(&mut output, &input, stream.index, StreamOverrides::default())?;
                library.write_header(&mut output, &[])?;
                let time_base = library.output_time_base(&output, out_index);
                generated.push(public(file_name));
                subtitle = Some(SubtitleOutput { output, time_base });
            }
        }
        subtitles.push(subtitle);
    }

    library.write_header(&mut manifest, DASH_OPTIONS)?;
    generated.push(public(MANIFEST_NAME));

    let manifest_time_bases: Vec<TimeBase> = (0..plan.manifest_stream_count())
        .map(|index| library.output_time_base(&manifest, index))
        .collect();

    // Demux único
    while let Some(mut packet) = library.read_next_packet(&mut input)? {
        let source_index = packet.stream_index();
        let Some(stream) = streams.get(source_index) else {
            continue;
        };

        if let Some(out_index) = plan.manifest_index(source_index) {
            rescale_packet(&mut packet, stream.time_base, manifest_time_bases[out_index]);
            packet.set_stream_index(out_index);
            library.write_packet(&mut manifest, &mut packet)?;
        } else if let Some(Some(subtitle)) = subtitles.get_mut(source_index) {
            rescale_subtitle_packet(&mut packet, stream.time_base, subtitle.time_base);
            packet.set_stream_index(0);
            library.write_packet(&mut subtitle.output, &mut packet)?;
        }
    }

    library.write_trailer(&mut manifest)?;
    for subtitle in subtitles.iter_mut().flatten() {
        library.write_trailer(&mut subtitle.output)?;
    }

    // Cerrar todas las salidas antes de devolver la lista
    drop(subtitles);
    drop(manifest);

    Ok(generated)
}
