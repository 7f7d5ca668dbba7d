//! WAV-file backed audio device.
//!
//! Stands in for a microphone on a console: acquiring the device decodes the
//! file, and stopping it streams the recording into the capture pipeline in
//! fixed-size chunks. Any input layout is normalized to 16-bit mono PCM at the
//! source sample rate.

use crate::error::TutorChatError;

use chat_core::capture::{AudioDevice, ChunkSink, MediaHandle};
use chat_core::error::CaptureError;

use common::ErrorLocation;

use std::io::{Cursor, Read};
use std::panic::Location;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};

pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Bytes handed to the pipeline per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone)]
pub struct WavFileDevice {
    path: PathBuf,
    chunk_size: usize,
}

impl WavFileDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioDevice for WavFileDevice {
    type Handle = WavFileHandle;

    async fn acquire(&self) -> Result<WavFileHandle, CaptureError> {
        let path = self.path.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let recording = read_wav_file(&path)?;
            let audio = recording.encode()?;
            Ok::<_, TutorChatError>((recording, audio))
        })
        .await
        .map_err(|e| CaptureError::Device {
            message: format!("WAV reader task failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let (recording, audio) = decoded.map_err(|e| CaptureError::DeviceUnavailable {
            message: format!("Cannot open {}: {e}", self.path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(
            "Opened {} ({} samples at {} Hz)",
            self.path.display(),
            recording.sample_count,
            recording.sample_rate
        );

        Ok(WavFileHandle {
            audio,
            chunk_size: self.chunk_size,
            sink: None,
        })
    }
}

pub struct WavFileHandle {
    audio: Vec<u8>,
    chunk_size: usize,
    sink: Option<ChunkSink>,
}

impl MediaHandle for WavFileHandle {
    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }

    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError> {
        if self.sink.is_some() {
            return Err(CaptureError::Device {
                message: String::from("WAV device is already recording"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };

        for chunk in self.audio.chunks(self.chunk_size) {
            if !sink.push(chunk.to_vec()) {
                return Err(CaptureError::Device {
                    message: String::from("Capture was discarded while flushing"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.sink = None;
        self.audio = Vec::new();
        debug!("WAV device released");
    }
}

/// Mono 16-bit samples decoded from a WAV source.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoRecording {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub sample_count: usize,
}

impl MonoRecording {
    /// Encode as a 16-bit mono WAV file. Empty when there are no samples.
    pub fn encode(&self) -> Result<Vec<u8>, TutorChatError> {
        if self.samples.is_empty() {
            return Ok(Vec::new());
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for sample in &self.samples {
                writer.write_sample(*sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

pub fn read_wav_file(path: &Path) -> Result<MonoRecording, TutorChatError> {
    let reader = WavReader::open(path)?;
    decode_mono(reader)
}

pub fn read_wav<R: Read>(source: R) -> Result<MonoRecording, TutorChatError> {
    decode_mono(WavReader::new(source)?)
}

fn decode_mono<R: Read>(mut reader: WavReader<R>) -> Result<MonoRecording, TutorChatError> {
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits) if bits <= 16 => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits) => {
            let shift = u32::from(bits).saturating_sub(16);
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| (s >> shift) as i16))
                .collect::<Result<Vec<_>, _>>()?
        }
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|sample| sample.map(|s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let samples: Vec<i16> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|s| i32::from(*s)).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    };

    Ok(MonoRecording {
        sample_count: samples.len(),
        samples,
        sample_rate: spec.sample_rate,
    })
}
