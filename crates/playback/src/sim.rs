//! Deterministic software surface.
//!
//! `SimulatedSurface` renders a single flat colour through the current
//! filter descriptor and only moves when [`SimHandle::advance`] is called.
//! Metadata, seeks, and encoder teardown all complete on a later `advance`,
//! which reproduces the asynchronous behaviour of a real decoder without
//! any wall-clock dependence.
//!
//! Captured chunks use a small frame format (see [`decode_frames`]) so
//! callers can check both the recorded span and the composited colour.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_edit_model::blob::BlobHandle;
use vidtrim_edit_model::source::Source;
use vidtrim_render_engine::compositor::FilterDescriptor;

use crate::surface::{CaptureEvent, CaptureFormat, CaptureStream, RenderSurface};

const FRAME_MAGIC: &[u8; 4] = b"SIMF";
const FRAME_LEN: usize = 4 + 8 + 8 + 3;
const SIM_MIME_TYPE: &str = "video/webm";

/// Content a simulated surface pretends to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMedia {
    /// Duration reported once metadata is decoded.
    pub duration_secs: f64,

    /// Colour of every source frame.
    pub base_color: [u8; 3],

    /// Number of `advance` calls before metadata is available.
    pub metadata_delay: u32,
}

impl SimulatedMedia {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            base_color: [200, 120, 40],
            metadata_delay: 1,
        }
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.base_color = color;
        self
    }
}

/// One decoded frame span of a simulated capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimFrame {
    pub start_secs: f64,
    pub end_secs: f64,
    pub rgb: [u8; 3],
}

/// Split concatenated simulated chunks back into frames. Trailing bytes
/// that do not form a whole frame are ignored.
pub fn decode_frames(bytes: &[u8]) -> Vec<SimFrame> {
    bytes
        .chunks_exact(FRAME_LEN)
        .filter(|frame| &frame[..4] == FRAME_MAGIC)
        .map(|frame| {
            let mut start = [0u8; 8];
            let mut end = [0u8; 8];
            start.copy_from_slice(&frame[4..12]);
            end.copy_from_slice(&frame[12..20]);
            SimFrame {
                start_secs: f64::from_le_bytes(start),
                end_secs: f64::from_le_bytes(end),
                rgb: [frame[20], frame[21], frame[22]],
            }
        })
        .collect()
}

/// Total play length covered by `frames`.
pub fn recorded_secs(frames: &[SimFrame]) -> f64 {
    frames.iter().map(|f| f.end_secs - f.start_secs).sum()
}

fn encode_frame(start_secs: f64, end_secs: f64, rgb: [u8; 3]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_LEN);
    out.extend_from_slice(FRAME_MAGIC);
    out.extend_from_slice(&start_secs.to_le_bytes());
    out.extend_from_slice(&end_secs.to_le_bytes());
    out.extend_from_slice(&rgb);
    out
}

#[derive(Debug)]
struct SimCapture {
    id: u64,
    recording: bool,
    stop_requested: bool,
    events: VecDeque<CaptureEvent>,
}

#[derive(Debug)]
struct SimState {
    media: SimulatedMedia,
    bound: Option<BlobHandle>,
    metadata_countdown: u32,
    metadata_ready: bool,
    position: f64,
    playing: bool,
    muted: bool,
    filter: FilterDescriptor,
    pending_seek: Option<(f64, u32)>,
    seek_latency: u32,
    seek_count: usize,
    capture_supported: bool,
    capture: Option<SimCapture>,
    next_capture_id: u64,
    bind_error: Option<String>,
}

impl SimState {
    fn reset_playback(&mut self) {
        self.metadata_countdown = self.media.metadata_delay;
        self.metadata_ready = false;
        self.position = 0.0;
        self.playing = false;
        self.pending_seek = None;
        self.capture = None;
    }

    fn advance(&mut self, dt: f64) {
        if self.bound.is_none() {
            return;
        }

        if !self.metadata_ready {
            if self.metadata_countdown <= 1 {
                self.metadata_ready = true;
            } else {
                self.metadata_countdown -= 1;
            }
        }

        if let Some((target, remaining)) = self.pending_seek {
            if remaining <= 1 && self.metadata_ready {
                self.position = target.clamp(0.0, self.media.duration_secs.max(0.0));
                self.pending_seek = None;
            } else {
                self.pending_seek = Some((target, remaining.saturating_sub(1)));
            }
        }

        let from = self.position;
        if self.playing && self.metadata_ready {
            self.position = (self.position + dt.max(0.0)).min(self.media.duration_secs);
            if self.position >= self.media.duration_secs {
                self.playing = false;
            }
        }
        let to = self.position;

        let rgb = self.filter.apply_rgb(self.media.base_color);
        if let Some(capture) = self.capture.as_mut() {
            if capture.stop_requested {
                capture.stop_requested = false;
                capture.recording = false;
                capture.events.push_back(CaptureEvent::Stopped);
            } else if capture.recording && to > from {
                capture
                    .events
                    .push_back(CaptureEvent::Chunk(encode_frame(from, to, rgb)));
            }
        }
    }
}

/// Shared control handle for a [`SimulatedSurface`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    state: Rc<RefCell<SimState>>,
}

impl SimHandle {
    /// Move simulated time forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        self.state.borrow_mut().advance(dt);
    }

    pub fn position(&self) -> f64 {
        self.state.borrow().position
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    pub fn is_muted(&self) -> bool {
        self.state.borrow().muted
    }

    pub fn is_bound(&self) -> bool {
        self.state.borrow().bound.is_some()
    }

    /// Handle of the currently bound source.
    pub fn bound_source(&self) -> Option<BlobHandle> {
        self.state.borrow().bound.clone()
    }

    /// Number of seeks requested since creation.
    pub fn seek_count(&self) -> usize {
        self.state.borrow().seek_count
    }

    /// The descriptor the surface is currently rendering with.
    pub fn filter(&self) -> FilterDescriptor {
        self.state.borrow().filter
    }

    /// Number of `advance` calls a seek needs before it settles.
    pub fn set_seek_latency(&self, advances: u32) {
        self.state.borrow_mut().seek_latency = advances;
    }

    /// Toggle whether `open_capture` succeeds.
    pub fn set_capture_supported(&self, supported: bool) {
        self.state.borrow_mut().capture_supported = supported;
    }

    /// Make the next `bind` fail with `message`, leaving the surface unbound.
    pub fn fail_next_bind(&self, message: &str) {
        self.state.borrow_mut().bind_error = Some(message.to_string());
    }

    /// Whether a capture is open and has not been torn down.
    pub fn capture_active(&self) -> bool {
        self.state.borrow().capture.is_some()
    }

    /// Inject an encoder failure into the open capture.
    pub fn fail_capture(&self, message: &str) {
        if let Some(capture) = self.state.borrow_mut().capture.as_mut() {
            capture.recording = false;
            capture
                .events
                .push_back(CaptureEvent::Failed(message.to_string()));
        }
    }
}

/// A [`RenderSurface`] backed by simulated media.
pub struct SimulatedSurface {
    name: String,
    state: Rc<RefCell<SimState>>,
}

impl SimulatedSurface {
    pub fn new(name: impl Into<String>, media: SimulatedMedia) -> Self {
        let state = SimState {
            metadata_countdown: media.metadata_delay,
            media,
            bound: None,
            metadata_ready: false,
            position: 0.0,
            playing: false,
            muted: false,
            filter: FilterDescriptor::default(),
            pending_seek: None,
            seek_latency: 1,
            seek_count: 0,
            capture_supported: true,
            capture: None,
            next_capture_id: 0,
            bind_error: None,
        };
        Self {
            name: name.into(),
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: Rc::clone(&self.state),
        }
    }
}

impl RenderSurface for SimulatedSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&mut self, source: &Source) -> VidtrimResult<()> {
        let mut state = self.state.borrow_mut();
        state.reset_playback();
        if let Some(message) = state.bind_error.take() {
            state.bound = None;
            return Err(VidtrimError::playback(message));
        }
        state.bound = Some(source.handle().clone());
        Ok(())
    }

    fn unbind(&mut self) {
        let mut state = self.state.borrow_mut();
        state.bound = None;
        state.reset_playback();
    }

    fn duration(&self) -> Option<f64> {
        let state = self.state.borrow();
        state.metadata_ready.then_some(state.media.duration_secs)
    }

    fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.state.borrow_mut();
        if state.bound.is_none() {
            return;
        }
        state.seek_count += 1;
        let latency = state.seek_latency;
        state.pending_seek = Some((secs.max(0.0), latency));
    }

    fn is_seeking(&self) -> bool {
        self.state.borrow().pending_seek.is_some()
    }

    fn play(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.bound.is_some() {
            state.playing = true;
        }
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    fn apply_filter(&mut self, filter: &FilterDescriptor) {
        self.state.borrow_mut().filter = *filter;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn open_capture(&mut self, format: &CaptureFormat) -> VidtrimResult<Box<dyn CaptureStream>> {
        let mut state = self.state.borrow_mut();
        if state.bound.is_none() {
            return Err(VidtrimError::capture_unavailable("Surface has no source"));
        }
        if !state.capture_supported || format.mime_type != SIM_MIME_TYPE {
            return Err(VidtrimError::capture_unavailable(format!(
                "{} cannot encode {}",
                self.name, format.mime_type
            )));
        }
        state.next_capture_id += 1;
        let id = state.next_capture_id;
        state.capture = Some(SimCapture {
            id,
            recording: false,
            stop_requested: false,
            events: VecDeque::new(),
        });
        Ok(Box::new(SimCaptureStream {
            state: Rc::clone(&self.state),
            id,
        }))
    }
}

struct SimCaptureStream {
    state: Rc<RefCell<SimState>>,
    id: u64,
}

impl SimCaptureStream {
    fn with_capture<T>(&self, f: impl FnOnce(&mut SimCapture) -> T) -> Option<T> {
        let mut state = self.state.borrow_mut();
        state
            .capture
            .as_mut()
            .filter(|capture| capture.id == self.id)
            .map(f)
    }
}

impl CaptureStream for SimCaptureStream {
    fn start(&mut self) -> VidtrimResult<()> {
        self.with_capture(|capture| capture.recording = true)
            .ok_or_else(|| VidtrimError::capture("Simulated capture was torn down"))
    }

    fn request_stop(&mut self) -> VidtrimResult<()> {
        self.with_capture(|capture| {
            if capture.recording {
                capture.stop_requested = true;
            }
        })
        .ok_or_else(|| VidtrimError::capture("Simulated capture was torn down"))
    }

    fn poll_event(&mut self) -> Option<CaptureEvent> {
        self.with_capture(|capture| capture.events.pop_front())
            .flatten()
    }

    fn cancel(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.capture.as_ref().is_some_and(|c| c.id == self.id) {
            state.capture = None;
        }
    }

    fn mime_type(&self) -> &str {
        SIM_MIME_TYPE
    }
}
