//! # Backend FFmpeg
//! src/packager/ffmpeg.rs
//!
//! Implementación de `MediaLibrary` sobre `ffmpeg-next`. Solo copia streams
//! (sin decodificar ni codificar). Se compila con `--features ffmpeg`.

use super::media::{
    CodecId, MediaError, MediaLibrary, MediaPacket, MediaType, OutputKind, StreamDescriptor,
    StreamOverrides, TimeBase,
};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{codec, encoder, format, media, Dictionary, Packet, Rational};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Paquete de FFmpeg
pub struct FfmpegPacket(Packet);

impl MediaPacket for FfmpegPacket {
    fn stream_index(&self) -> usize {
        self.0.stream()
    }
    fn set_stream_index(&mut self, index: usize) {
        self.0.set_stream(index);
    }
    fn pts(&self) -> Option<i64> {
        self.0.pts()
    }
    fn set_pts(&mut self, pts: Option<i64>) {
        self.0.set_pts(pts);
    }
    fn dts(&self) -> Option<i64> {
        self.0.dts()
    }
    fn set_dts(&mut self, dts: Option<i64>) {
        self.0.set_dts(dts);
    }
    fn duration(&self) -> i64 {
        self.0.duration()
    }
    fn set_duration(&mut self, duration: i64) {
        self.0.set_duration(duration);
    }
    fn clear_position(&mut self) {
        self.0.set_position(-1);
    }
}

/// Biblioteca de empaquetado respaldada por libavformat
#[derive(Debug, Clone, Copy)]
pub struct FfmpegLibrary;

impl FfmpegLibrary {
    /// Inicializa FFmpeg y baja su log a nivel de error
    pub fn new() -> Result<Self, MediaError> {
        ffmpeg::init().map_err(|e| MediaError::Probe(e.to_string()))?;
        ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Error);
        Ok(Self)
    }
}

fn codec_id(id: codec::Id) -> CodecId {
    match id {
        codec::Id::H264 => CodecId::H264,
        codec::Id::HEVC => CodecId::Hevc,
        codec::Id::VP9 => CodecId::Vp9,
        codec::Id::AV1 => CodecId::Av1,
        codec::Id::MP3 => CodecId::Mp3,
        codec::Id::AAC => CodecId::Aac,
        codec::Id::AC3 => CodecId::Ac3,
        codec::Id::EAC3 => CodecId::Eac3,
        codec::Id::OPUS => CodecId::Opus,
        codec::Id::FLAC => CodecId::Flac,
        codec::Id::SSA => CodecId::Ssa,
        codec::Id::ASS => CodecId::Ass,
        codec::Id::SRT => CodecId::Srt,
        codec::Id::SUBRIP => CodecId::SubRip,
        other => CodecId::Other(format!("{:?}", other).to_lowercase()),
    }
}

fn media_type(medium: media::Type) -> MediaType {
    match medium {
        media::Type::Video => MediaType::Video,
        media::Type::Audio => MediaType::Audio,
        media::Type::Subtitle => MediaType::Subtitle,
        _ => MediaType::Other,
    }
}

fn time_base(rational: Rational) -> TimeBase {
    TimeBase::new(rational.numerator(), rational.denominator())
}

fn output_error(path: &Path, e: ffmpeg::Error) -> MediaError {
    MediaError::Output {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

impl MediaLibrary for FfmpegLibrary {
    type Input = format::context::Input;
    type Output = format::context::Output;
    type Packet = FfmpegPacket;

    fn open_input(&self, path: &Path) -> Result<Self::Input, MediaError> {
        format::input(&path).map_err(|e| MediaError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn probe_streams(&self, input: &Self::Input) -> Vec<StreamDescriptor> {
        input
            .streams()
            .map(|stream| {
                let params = stream.parameters();
                // SAFETY: `params` apunta al codecpar vivo del stream
                let (bit_rate, frame_size) = unsafe {
                    let raw = params.as_ptr();
                    ((*raw).bit_rate, (*raw).frame_size)
                };
                let tags: HashMap<String, String> = stream
                    .metadata()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();

                StreamDescriptor {
                    index: stream.index(),
                    media_type: media_type(params.medium()),
                    codec: codec_id(params.id()),
                    bit_rate: u64::try_from(bit_rate).unwrap_or(0),
                    frame_size: u32::try_from(frame_size).unwrap_or(0),
                    time_base: time_base(stream.time_base()),
                    tags,
                }
            })
            .collect()
    }

    fn new_output(&self, kind: OutputKind, path: &Path) -> Result<Self::Output, MediaError> {
        let muxer = match kind {
            OutputKind::Dash => "dash",
            OutputKind::Subtitle { muxer } => muxer,
        };
        debug!(path = %path.display(), muxer, "abriendo salida");
        format::output_as(&path, muxer).map_err(|e| output_error(path, e))
    }

    fn add_stream(
        &self,
        output: &mut Self::Output,
        input: &Self::Input,
        source_index: usize,
        overrides: StreamOverrides,
    ) -> Result<usize, MediaError> {
        let source = input
            .stream(source_index)
            .ok_or_else(|| MediaError::Stream(format!("no stream {} in source", source_index)))?;

        let mut stream = output
            .add_stream(encoder::find(codec::Id::None))
            .map_err(|e| MediaError::Stream(e.to_string()))?;
        stream.set_parameters(source.parameters());

        // SAFETY: `parameters()` envuelve el codecpar del stream recién creado,
        // que pertenece a `output`
        unsafe {
            let raw = stream.parameters().as_mut_ptr();
            (*raw).codec_tag = 0;
            if let Some(bit_rate) = overrides.bit_rate {
                (*raw).bit_rate = i64::try_from(bit_rate).unwrap_or(i64::MAX);
            }
            if let Some(frame_size) = overrides.frame_size {
                (*raw).frame_size = i32::try_from(frame_size).unwrap_or(i32::MAX);
            }
        }

        Ok(stream.index())
    }

    fn write_header(&self, output: &mut Self::Output, options: &[(&str, &str)]) -> Result<(), MediaError> {
        let mut dict = Dictionary::new();
        for (key, value) in options {
            dict.set(key, value);
        }
        output
            .write_header_with(dict)
            .map(|_| ())
            .map_err(|e| MediaError::Header(e.to_string()))
    }

    fn output_time_base(&self, output: &Self::Output, index: usize) -> TimeBase {
        output
            .stream(index)
            .map(|s| time_base(s.time_base()))
            .unwrap_or(TimeBase::new(0, 1))
    }

    fn read_next_packet(&self, input: &mut Self::Input) -> Result<Option<Self::Packet>, MediaError> {
        let mut packet = Packet::empty();
        match packet.read(input) {
            Ok(()) => Ok(Some(FfmpegPacket(packet))),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(MediaError::Packet(e.to_string())),
        }
    }

    fn write_packet(&self, output: &mut Self::Output, packet: &mut Self::Packet) -> Result<(), MediaError> {
        packet
            .0
            .write_interleaved(output)
            .map_err(|e| MediaError::Packet(e.to_string()))
    }

    fn write_trailer(&self, output: &mut Self::Output) -> Result<(), MediaError> {
        output
            .write_trailer()
            .map_err(|e| MediaError::Trailer(e.to_string()))
    }
}
