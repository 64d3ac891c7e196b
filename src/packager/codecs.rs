//! # Lista de Códecs Permitidos
//! src/packager/codecs.rs
//!
//! Tabla (tipo de medio, códec) → tratamiento. Lo que no está en la tabla se
//! excluye del paquete sin avisar: no se transcodifica nada.

use super::media::{CodecId, MediaType, StreamDescriptor};

/// Tratamiento de un stream aceptado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Va al manifiesto DASH
    Manifest,
    /// Se extrae a un archivo aparte con esta extensión y este muxer
    Subtitle {
        extension: &'static str,
        muxer: &'static str,
    },
}

struct Rule {
    media_type: MediaType,
    codec: CodecId,
    acceptance: Acceptance,
}

const fn manifest(media_type: MediaType, codec: CodecId) -> Rule {
    Rule {
        media_type,
        codec,
        acceptance: Acceptance::Manifest,
    }
}

const fn subtitle(codec: CodecId, extension: &'static str, muxer: &'static str) -> Rule {
    Rule {
        media_type: MediaType::Subtitle,
        codec,
        acceptance: Acceptance::Subtitle { extension, muxer },
    }
}

/// 4 códecs de video, 5 de audio y 2 familias de subtítulos (SSA/ASS, SubRip)
const ALLOW_LIST: &[Rule] = &[
    manifest(MediaType::Video, CodecId::H264),
    manifest(MediaType::Video, CodecId::Hevc),
    manifest(MediaType::Video, CodecId::Vp9),
    manifest(MediaType::Video, CodecId::Av1),
    manifest(MediaType::Audio, CodecId::Mp3),
    manifest(MediaType::Audio, CodecId::Aac),
    manifest(MediaType::Audio, CodecId::Ac3),
    manifest(MediaType::Audio, CodecId::Eac3),
    manifest(MediaType::Audio, CodecId::Opus),
    // No existe un muxer "ssa": el de ASS escribe ambos
    subtitle(CodecId::Ssa, "ssa", "ass"),
    subtitle(CodecId::Ass, "ass", "ass"),
    subtitle(CodecId::Srt, "srt", "srt"),
    subtitle(CodecId::SubRip, "srt", "srt"),
];

/// Muestras por frame cuando el origen no lo declara
const FRAME_SIZES: &[(CodecId, u32)] = &[
    (CodecId::Mp3, 1152),
    (CodecId::Ac3, 1536),
    (CodecId::Eac3, 1536),
    (CodecId::Flac, 4096),
    (CodecId::Opus, 960),
];

const DEFAULT_FRAME_SIZE: u32 = 1024;

/// Decide qué hacer con un stream del origen; `None` = excluido
pub fn classify(stream: &StreamDescriptor) -> Option<Acceptance> {
    ALLOW_LIST
        .iter()
        .find(|rule| rule.media_type == stream.media_type && rule.codec == stream.codec)
        .map(|rule| rule.acceptance)
}

/// Frame size por defecto para un códec de audio
pub fn default_frame_size(codec: &CodecId) -> u32 {
    FRAME_SIZES
        .iter()
        .find(|(known, _)| known == codec)
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_FRAME_SIZE)
}
