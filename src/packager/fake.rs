//! Biblioteca de medios falsa para tests
//!
//! Registra cada llamada y crea archivos reales en disco, así los tests del
//! orquestador pueden revisar tanto el contrato como el resultado en el
//! sistema de archivos.

use super::media::{
    MediaError, MediaLibrary, MediaPacket, OutputKind, StreamDescriptor, StreamOverrides, TimeBase,
};
use std::collections::{HashMap, VecDeque};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct FakePacket {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub position: i64,
}

impl FakePacket {
    pub fn new(stream_index: usize, pts: Option<i64>, dts: Option<i64>, duration: i64) -> Self {
        Self {
            stream_index,
            pts,
            dts,
            duration,
            position: 4096,
        }
    }
}

impl MediaPacket for FakePacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }
    fn set_stream_index(&mut self, index: usize) {
        self.stream_index = index;
    }
    fn pts(&self) -> Option<i64> {
        self.pts
    }
    fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }
    fn dts(&self) -> Option<i64> {
        self.dts
    }
    fn set_dts(&mut self, dts: Option<i64>) {
        self.dts = dts;
    }
    fn duration(&self) -> i64 {
        self.duration
    }
    fn set_duration(&mut self, duration: i64) {
        self.duration = duration;
    }
    fn clear_position(&mut self) {
        self.position = -1;
    }
}

/// Contenido del "contenedor" de origen
#[derive(Debug, Clone, Default)]
pub struct FakeSource {
    streams: Vec<StreamDescriptor>,
    packets: Vec<FakePacket>,
    fail_after: Option<usize>,
}

impl FakeSource {
    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self {
            streams,
            ..Self::default()
        }
    }

    pub fn with_packets(mut self, packets: Vec<FakePacket>) -> Self {
        self.packets = packets;
        self
    }

    /// La lectura falla después de entregar `n` paquetes
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

pub struct FakeInput {
    streams: Vec<StreamDescriptor>,
    packets: VecDeque<FakePacket>,
    delivered: usize,
    fail_after: Option<usize>,
}

pub struct FakeOutput {
    path: PathBuf,
    kind: OutputKind,
    streams: usize,
}

#[derive(Debug, Default)]
struct Record {
    declared: Vec<(usize, StreamOverrides)>,
    packets: Vec<FakePacket>,
}

#[derive(Debug, Default)]
struct State {
    opens: usize,
    outputs: HashMap<PathBuf, Record>,
    headers: Vec<PathBuf>,
    manifest_options: Vec<(String, String)>,
    trailers: usize,
}

type OpenHook = Box<dyn Fn() + Send + Sync>;

pub struct FakeLibrary {
    source: FakeSource,
    state: Mutex<State>,
    on_open: Option<OpenHook>,
}

impl FakeLibrary {
    pub fn new(source: FakeSource) -> Self {
        Self {
            source,
            state: Mutex::new(State::default()),
            on_open: None,
        }
    }

    /// Corre `hook` al abrir la entrada, antes de leer nada
    pub fn with_open_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }

    pub fn written(&self, path: &Path) -> Vec<FakePacket> {
        self.state
            .lock()
            .unwrap()
            .outputs
            .get(path)
            .map(|r| r.packets.clone())
            .unwrap_or_default()
    }

    pub fn declared_streams(&self, path: &Path) -> Vec<(usize, StreamOverrides)> {
        self.state
            .lock()
            .unwrap()
            .outputs
            .get(path)
            .map(|r| r.declared.clone())
            .unwrap_or_default()
    }

    pub fn header_order(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().headers.clone()
    }

    pub fn manifest_options(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().manifest_options.clone()
    }

    pub fn trailers_written(&self) -> usize {
        self.state.lock().unwrap().trailers
    }
}

fn append(path: &Path, line: &str) -> Result<(), MediaError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{}", line))
        .map_err(|e| MediaError::Packet(e.to_string()))
}

impl MediaLibrary for FakeLibrary {
    type Input = FakeInput;
    type Output = FakeOutput;
    type Packet = FakePacket;

    fn open_input(&self, path: &Path) -> Result<FakeInput, MediaError> {
        self.state.lock().unwrap().opens += 1;
        if let Some(hook) = &self.on_open {
            hook();
        }
        if self.source.streams.is_empty() {
            return Err(MediaError::Open {
                path: path.to_path_buf(),
                reason: "no streams".to_string(),
            });
        }
        Ok(FakeInput {
            streams: self.source.streams.clone(),
            packets: self.source.packets.iter().cloned().collect(),
            delivered: 0,
            fail_after: self.source.fail_after,
        })
    }

    fn probe_streams(&self, input: &FakeInput) -> Vec<StreamDescriptor> {
        input.streams.clone()
    }

    fn new_output(&self, kind: OutputKind, path: &Path) -> Result<FakeOutput, MediaError> {
        fs::File::create(path).map_err(|e| MediaError::Output {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.state
            .lock()
            .unwrap()
            .outputs
            .insert(path.to_path_buf(), Record::default());
        Ok(FakeOutput {
            path: path.to_path_buf(),
            kind,
            streams: 0,
        })
    }

    fn add_stream(
        &self,
        output: &mut FakeOutput,
        _input: &FakeInput,
        source_index: usize,
        overrides: StreamOverrides,
    ) -> Result<usize, MediaError> {
        let mut state = self.state.lock().unwrap();
        let record = state.outputs.entry(output.path.clone()).or_default();
        record.declared.push((source_index, overrides));
        output.streams += 1;
        Ok(output.streams - 1)
    }

    fn write_header(&self, output: &mut FakeOutput, options: &[(&str, &str)]) -> Result<(), MediaError> {
        append(&output.path, "header")?;
        if output.kind == OutputKind::Dash {
            // Como el muxer DASH real: un segmento de init por stream
            let dir = output.path.parent().unwrap_or(Path::new("."));
            for i in 0..output.streams {
                fs::write(dir.join(format!("init-stream{}.m4s", i)), b"init")
                    .map_err(|e| MediaError::Header(e.to_string()))?;
            }
        }

        let mut state = self.state.lock().unwrap();
        state.headers.push(output.path.clone());
        if output.kind == OutputKind::Dash {
            state.manifest_options = options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }
        Ok(())
    }

    fn output_time_base(&self, output: &FakeOutput, _index: usize) -> TimeBase {
        match output.kind {
            OutputKind::Dash => TimeBase::new(1, 90_000),
            OutputKind::Subtitle { .. } => TimeBase::new(1, 1000),
        }
    }

    fn read_next_packet(&self, input: &mut FakeInput) -> Result<Option<FakePacket>, MediaError> {
        if input.fail_after == Some(input.delivered) {
            return Err(MediaError::Packet("corrupt packet".to_string()));
        }
        input.delivered += 1;
        Ok(input.packets.pop_front())
    }

    fn write_packet(&self, output: &mut FakeOutput, packet: &mut FakePacket) -> Result<(), MediaError> {
        append(&output.path, &format!("packet {}", packet.stream_index))?;
        self.state
            .lock()
            .unwrap()
            .outputs
            .entry(output.path.clone())
            .or_default()
            .packets
            .push(packet.clone());
        Ok(())
    }

    fn write_trailer(&self, output: &mut FakeOutput) -> Result<(), MediaError> {
        append(&output.path, "trailer")?;
        self.state.lock().unwrap().trailers += 1;
        Ok(())
    }
}
