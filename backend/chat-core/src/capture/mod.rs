//! Microphone capture with guaranteed device release.
//!
//! A capture holds the device through a [`DeviceLease`]; the lease releases the
//! handle exactly once, either explicitly on stop/cancel or when dropped.

use crate::error::capture::CaptureError;
use crate::observers::{Observers, SubscriptionId};

use common::ErrorLocation;

use std::future::Future;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::mpsc;

/// Receives recorded chunks from a running [`MediaHandle`], in order.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    chunks: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChunkSink {
    /// Deliver one chunk. Empty chunks are skipped.
    ///
    /// Returns `false` once the capture has been finalized or discarded.
    pub fn push(&self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return !self.chunks.is_closed();
        }
        self.chunks.send(chunk).is_ok()
    }
}

/// An exclusively held input device.
pub trait MediaHandle: Send + 'static {
    fn mime_type(&self) -> &str;

    /// Begin recording into `sink`.
    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError>;

    /// Stop recording. Every chunk must have been pushed to the sink when this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Hand the hardware back. Called exactly once per handle.
    fn release(&mut self);
}

/// Source of [`MediaHandle`]s, e.g. the platform's microphone permission prompt.
pub trait AudioDevice: Send + Sync + 'static {
    type Handle: MediaHandle;

    /// Request exclusive access. Fails with [`CaptureError::DeviceUnavailable`]
    /// when access is denied or no device exists.
    fn acquire(&self) -> impl Future<Output = Result<Self::Handle, CaptureError>> + Send;
}

/// Owns a handle and releases it exactly once.
pub struct DeviceLease<H: MediaHandle> {
    handle: Option<H>,
}

impl<H: MediaHandle> DeviceLease<H> {
    pub fn new(handle: H) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            debug!("Audio device released");
        }
    }
}

impl<H: MediaHandle> Drop for DeviceLease<H> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A finalized, immutable recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCapture {
    data: Arc<[u8]>,
    mime_type: String,
    chunk_count: usize,
    duration: Duration,
}

impl AudioCapture {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, chunk_count: usize, duration: Duration) -> Self {
        Self {
            data: Arc::from(data),
            mime_type: mime_type.into(),
            chunk_count,
            duration,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Wall-clock time between start and stop.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

struct RecordingSession<H: MediaHandle> {
    lease: DeviceLease<H>,
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    mime_type: String,
    started_at: Instant,
}

pub struct AudioCapturePipeline<D: AudioDevice> {
    device: D,
    session: Option<RecordingSession<D::Handle>>,
    device_errors: Observers<CaptureError>,
}

impl<D: AudioDevice> AudioCapturePipeline<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            session: None,
            device_errors: Observers::new(),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_some()
    }

    /// Acquire the device and start buffering chunks.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::AlreadyCapturing`] if a capture is running (it keeps running)
    /// - [`CaptureError::DeviceUnavailable`] if access is denied
    /// - [`CaptureError::Device`] if the device fails to start; it is released first
    pub async fn start_capture(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Err(CaptureError::AlreadyCapturing {
                message: String::from("A capture is already in progress"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let handle = self
            .device
            .acquire()
            .await
            .inspect_err(|e| self.report(e))?;

        let mut lease = DeviceLease::new(handle);
        let (sink, chunks) = mpsc::unbounded_channel();
        let mime_type = match lease.handle_mut() {
            Some(handle) => {
                handle
                    .start(ChunkSink { chunks: sink })
                    .inspect_err(|e| self.report(e))?;
                handle.mime_type().to_string()
            }
            None => String::new(),
        };

        info!("Audio capture started ({mime_type})");
        self.session = Some(RecordingSession {
            lease,
            chunks,
            mime_type,
            started_at: Instant::now(),
        });
        Ok(())
    }

    /// Finalize the running capture. `Ok(None)` when nothing was recording.
    ///
    /// The device is released whether or not finalization succeeds.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::Device`] if the device failed while stopping
    /// - [`CaptureError::Finalize`] if no audio was captured
    pub fn stop_capture(&mut self) -> Result<Option<AudioCapture>, CaptureError> {
        let Some(mut session) = self.session.take() else {
            debug!("stop_capture with no active capture ignored");
            return Ok(None);
        };

        let stopped = match session.lease.handle_mut() {
            Some(handle) => handle.stop(),
            None => Ok(()),
        };
        session.lease.release();

        let mut data = Vec::new();
        let mut chunk_count = 0;
        while let Ok(chunk) = session.chunks.try_recv() {
            data.extend_from_slice(&chunk);
            chunk_count += 1;
        }

        stopped.inspect_err(|e| self.report(e))?;

        if data.is_empty() {
            return Err(CaptureError::Finalize {
                message: String::from("No audio was captured"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let capture = AudioCapture::new(
            data,
            session.mime_type,
            chunk_count,
            session.started_at.elapsed(),
        );
        info!(
            "Audio capture finalized: {} bytes in {} chunks",
            capture.len(),
            capture.chunk_count()
        );
        Ok(Some(capture))
    }

    /// Discard the running capture and release the device.
    pub fn cancel_capture(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Some(Err(e)) = session.lease.handle_mut().map(|handle| handle.stop()) {
                debug!("Device error while cancelling capture: {e}");
            }
            session.lease.release();
            info!("Audio capture cancelled");
        }
    }

    pub fn on_device_error<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&CaptureError) + Send + Sync + 'static,
    {
        self.device_errors.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.device_errors.unsubscribe(id)
    }

    fn report(&self, error: &CaptureError) {
        warn!("Audio device error: {error}");
        self.device_errors.notify(error);
    }
}

impl<D: AudioDevice> Drop for AudioCapturePipeline<D> {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("Capture pipeline dropped while recording, releasing device");
            self.cancel_capture();
        }
    }
}
