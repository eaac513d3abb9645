//! GStreamer-backed rendering surface and capture stream.

use std::cell::Cell;
use std::sync::mpsc;

use gst::prelude::*;
use gstreamer as gst;
use vidtrim_common::clock::MonotonicClock;
use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_edit_model::source::Source;
use vidtrim_playback::{CaptureEvent, CaptureFormat, CaptureStream, RenderSurface};
use vidtrim_render_engine::compositor::FilterDescriptor;

use crate::pipeline::{
    build_capture_description, build_playback_launch, init_gstreamer, launch_pipeline,
    missing_elements, PipelineRole, BALANCE_ELEMENTS, CAPTURE_BIN, CAPTURE_ELEMENTS, CAPTURE_SINK,
    CAPTURE_VALVE, DEFAULT_VIDEO_SINK, SPLIT_ELEMENT, WEBM_MIME_TYPE,
};

/// A `decodebin ! videobalance` pipeline presented as a [`RenderSurface`].
///
/// Queries are answered from the pipeline directly; bus messages are drained
/// whenever the position is read.
pub struct GstSurface {
    name: String,
    role: PipelineRole,
    video_sink: String,
    pipeline: Option<gst::Pipeline>,
    filter: FilterDescriptor,
    playing: Cell<bool>,
    pending_seek: Cell<Option<f64>>,
    capture_errors: Option<mpsc::Sender<CaptureEvent>>,
}

impl GstSurface {
    pub fn new(name: impl Into<String>, role: PipelineRole) -> VidtrimResult<Self> {
        init_gstreamer()?;
        Ok(Self {
            name: name.into(),
            role,
            video_sink: DEFAULT_VIDEO_SINK.to_string(),
            pipeline: None,
            filter: FilterDescriptor::default(),
            playing: Cell::new(false),
            pending_seek: Cell::new(None),
            capture_errors: None,
        })
    }

    /// Render through `sink` (a launch fragment such as `autovideosink`).
    pub fn with_video_sink(mut self, sink: impl Into<String>) -> Self {
        self.video_sink = sink.into();
        self
    }

    fn push_filter(&self) {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };
        for (name, values) in BALANCE_ELEMENTS.iter().zip(self.filter.video_balance_chain()) {
            let Some(balance) = pipeline.by_name(name) else {
                tracing::warn!(surface = %self.name, element = *name, "Balance stage missing");
                continue;
            };
            balance.set_property("brightness", values.brightness);
            balance.set_property("saturation", values.saturation);
            balance.set_property("contrast", values.contrast);
        }
    }

    fn try_seek(&self, secs: f64) -> bool {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return false;
        };
        let target = gst::ClockTime::from_nseconds(MonotonicClock::secs_to_ns(secs));
        pipeline
            .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE, target)
            .is_ok()
    }

    fn drain_bus(&self) {
        let Some(bus) = self.pipeline.as_ref().and_then(|p| p.bus()) else {
            return;
        };
        while let Some(msg) = bus.pop() {
            match msg.view() {
                gst::MessageView::Eos(_) => {
                    self.playing.set(false);
                    tracing::debug!(surface = %self.name, "End of stream");
                }
                gst::MessageView::Error(e) => {
                    let from_capture = msg
                        .src()
                        .is_some_and(|src| src.path_string().contains(CAPTURE_BIN));
                    tracing::warn!(
                        surface = %self.name,
                        error = %e.error(),
                        from_capture,
                        "Pipeline error"
                    );
                    if from_capture {
                        if let Some(tx) = self.capture_errors.as_ref() {
                            let _ = tx.send(CaptureEvent::Failed(e.error().to_string()));
                        }
                    } else {
                        self.playing.set(false);
                    }
                }
                _ => {}
            }
        }
    }
}

impl RenderSurface for GstSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn bind(&mut self, source: &Source) -> VidtrimResult<()> {
        self.unbind();
        let launch = build_playback_launch(source.path(), self.role, &self.video_sink);
        let pipeline = launch_pipeline(&launch)?;
        pipeline.set_state(gst::State::Paused).map_err(|e| {
            VidtrimError::playback(format!("Failed to open {}: {e:?}", source.display_name()))
        })?;

        tracing::debug!(surface = %self.name, %launch, "Pipeline prerolling");
        self.pipeline = Some(pipeline);
        self.push_filter();
        Ok(())
    }

    fn unbind(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            if let Err(e) = pipeline.set_state(gst::State::Null) {
                tracing::warn!(surface = %self.name, error = ?e, "Failed to stop pipeline");
            }
        }
        self.playing.set(false);
        self.pending_seek.set(None);
        self.capture_errors = None;
    }

    fn duration(&self) -> Option<f64> {
        let duration = self
            .pipeline
            .as_ref()?
            .query_duration::<gst::ClockTime>()?;
        Some(MonotonicClock::ns_to_secs(duration.nseconds()))
    }

    fn position(&self) -> f64 {
        self.drain_bus();
        self.pipeline
            .as_ref()
            .and_then(|p| p.query_position::<gst::ClockTime>())
            .map_or(0.0, |t| MonotonicClock::ns_to_secs(t.nseconds()))
    }

    fn seek(&mut self, secs: f64) {
        if self.pipeline.is_none() {
            return;
        }
        if self.try_seek(secs) {
            self.pending_seek.set(None);
        } else {
            // Not prerolled yet; retried on play or on the next seek check.
            self.pending_seek.set(Some(secs));
        }
    }

    fn is_seeking(&self) -> bool {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return false;
        };
        if let Some(secs) = self.pending_seek.get() {
            if !self.try_seek(secs) {
                return true;
            }
            self.pending_seek.set(None);
        }
        // A flushing seek leaves the pipeline in an async state change until
        // it has prerolled at the new position.
        matches!(
            pipeline.state(gst::ClockTime::ZERO).0,
            Ok(gst::StateChangeSuccess::Async)
        )
    }

    fn play(&mut self) {
        let Some(pipeline) = self.pipeline.clone() else {
            return;
        };
        if let Some(secs) = self.pending_seek.take() {
            if !self.try_seek(secs) {
                tracing::warn!(surface = %self.name, secs, "Deferred seek failed");
            }
        }
        match pipeline.set_state(gst::State::Playing) {
            Ok(_) => self.playing.set(true),
            Err(e) => tracing::warn!(surface = %self.name, error = ?e, "Failed to play"),
        }
    }

    fn pause(&mut self) {
        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };
        if let Err(e) = pipeline.set_state(gst::State::Paused) {
            tracing::warn!(surface = %self.name, error = ?e, "Failed to pause");
        }
        self.playing.set(false);
    }

    fn is_playing(&self) -> bool {
        self.playing.get()
    }

    fn apply_filter(&mut self, filter: &FilterDescriptor) {
        self.filter = *filter;
        self.push_filter();
    }

    fn set_muted(&mut self, _muted: bool) {
        // Pipelines decode video only; there is no audio branch to silence.
    }

    fn open_capture(&mut self, format: &CaptureFormat) -> VidtrimResult<Box<dyn CaptureStream>> {
        if self.role != PipelineRole::Primary {
            return Err(VidtrimError::capture_unavailable(format!(
                "{} is a preview surface",
                self.name
            )));
        }
        let Some(pipeline) = self.pipeline.clone() else {
            return Err(VidtrimError::capture_unavailable("Surface has no source"));
        };
        let missing = missing_elements(CAPTURE_ELEMENTS);
        if !missing.is_empty() {
            return Err(VidtrimError::capture_unavailable(format!(
                "Missing GStreamer elements: {}",
                missing.join(", ")
            )));
        }

        let (stream, errors) = GstCaptureStream::attach(&pipeline, format)?;
        self.capture_errors = Some(errors);
        Ok(Box::new(stream))
    }
}

impl Drop for GstSurface {
    fn drop(&mut self) {
        self.unbind();
    }
}

/// A capture branch hung off the primary pipeline's `tee`.
///
/// A pad probe on the capture sink forwards every encoded buffer, and the
/// EOS that follows a stop request, over a channel.
pub struct GstCaptureStream {
    pipeline: gst::Pipeline,
    tee: gst::Element,
    tee_pad: Option<gst::Pad>,
    bin: gst::Bin,
    valve: gst::Element,
    sink: gst::Element,
    events: mpsc::Receiver<CaptureEvent>,
    attached: bool,
}

impl GstCaptureStream {
    fn attach(
        pipeline: &gst::Pipeline,
        format: &CaptureFormat,
    ) -> VidtrimResult<(Self, mpsc::Sender<CaptureEvent>)> {
        let description = build_capture_description(format)?;
        let bin = gst::parse::bin_from_description(&description, true).map_err(|e| {
            VidtrimError::capture_unavailable(format!("Failed to build capture branch: {e}"))
        })?;
        bin.set_property("name", CAPTURE_BIN);

        let tee = pipeline
            .by_name(SPLIT_ELEMENT)
            .ok_or_else(|| VidtrimError::capture_unavailable("Pipeline has no capture split"))?;
        let valve = bin
            .by_name(CAPTURE_VALVE)
            .ok_or_else(|| VidtrimError::capture("Capture branch has no valve"))?;
        let sink = bin
            .by_name(CAPTURE_SINK)
            .ok_or_else(|| VidtrimError::capture("Capture branch has no sink"))?;

        let (tx, rx) = mpsc::channel();
        let probe_tx = tx.clone();
        let sink_pad = sink
            .static_pad("sink")
            .ok_or_else(|| VidtrimError::capture("Capture sink has no pad"))?;
        sink_pad.add_probe(
            gst::PadProbeType::BUFFER | gst::PadProbeType::EVENT_DOWNSTREAM,
            move |_, info| {
                match info.data {
                    Some(gst::PadProbeData::Buffer(ref buffer)) => {
                        if let Ok(map) = buffer.map_readable() {
                            let _ = probe_tx.send(CaptureEvent::Chunk(map.as_slice().to_vec()));
                        }
                    }
                    Some(gst::PadProbeData::Event(ref event))
                        if event.type_() == gst::EventType::Eos =>
                    {
                        let _ = probe_tx.send(CaptureEvent::Stopped);
                    }
                    _ => {}
                }
                gst::PadProbeReturn::Ok
            },
        );

        pipeline
            .add(&bin)
            .map_err(|e| VidtrimError::capture(format!("Failed to add capture branch: {e}")))?;

        let mut stream = Self {
            pipeline: pipeline.clone(),
            tee: tee.clone(),
            tee_pad: None,
            bin: bin.clone(),
            valve,
            sink,
            events: rx,
            attached: true,
        };

        // The sink stays PLAYING while the pipeline pauses so the encoder can
        // drain after playback stops.
        stream.sink.set_locked_state(true);
        if stream.sink.set_state(gst::State::Playing).is_err() {
            stream.detach();
            return Err(VidtrimError::capture_unavailable("Capture sink refused to start"));
        }

        let tee_pad = tee.request_pad_simple("src_%u").ok_or_else(|| {
            VidtrimError::capture_unavailable("Failed to request a split pad")
        });
        let tee_pad = match tee_pad {
            Ok(pad) => pad,
            Err(e) => {
                stream.detach();
                return Err(e);
            }
        };
        stream.tee_pad = Some(tee_pad.clone());

        let linked = bin
            .static_pad("sink")
            .ok_or_else(|| VidtrimError::capture("Capture branch has no input"))
            .and_then(|input| {
                tee_pad
                    .link(&input)
                    .map_err(|e| VidtrimError::capture(format!("Failed to link capture: {e:?}")))
            })
            .and_then(|_| {
                bin.sync_state_with_parent().map_err(|e| {
                    VidtrimError::capture(format!("Capture branch failed to start: {e}"))
                })
            });
        if let Err(e) = linked {
            stream.detach();
            return Err(e);
        }

        tracing::debug!(mime_type = %format.mime_type, "Capture branch attached");
        Ok((stream, tx))
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.valve.set_property("drop", true);

        if let Some(pad) = self.tee_pad.take() {
            if let Some(peer) = pad.peer() {
                let _ = pad.unlink(&peer);
            }
            self.tee.release_request_pad(&pad);
        }

        self.sink.set_locked_state(false);
        let _ = self.sink.set_state(gst::State::Null);
        let _ = self.bin.set_state(gst::State::Null);
        if let Err(e) = self.pipeline.remove(&self.bin) {
            tracing::warn!(error = %e, "Failed to remove capture branch");
        }
        tracing::debug!("Capture branch detached");
    }
}

impl CaptureStream for GstCaptureStream {
    fn start(&mut self) -> VidtrimResult<()> {
        if !self.attached {
            return Err(VidtrimError::capture("Capture branch was torn down"));
        }
        self.valve.set_property("drop", false);
        Ok(())
    }

    fn request_stop(&mut self) -> VidtrimResult<()> {
        if !self.attached {
            return Err(VidtrimError::capture("Capture branch was torn down"));
        }
        self.valve.set_property("drop", true);

        // EOS goes in behind the valve so the encoder and muxer finalize.
        let encoder_input = self
            .valve
            .static_pad("src")
            .and_then(|pad| pad.peer())
            .ok_or_else(|| VidtrimError::capture("Capture valve is not linked"))?;
        if !encoder_input.send_event(gst::event::Eos::new()) {
            tracing::warn!("Failed to send EOS to capture branch; output may be truncated");
            return Err(VidtrimError::capture("Encoder rejected end of stream"));
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<CaptureEvent> {
        self.events.try_recv().ok()
    }

    fn cancel(&mut self) {
        self.detach();
    }

    fn mime_type(&self) -> &str {
        WEBM_MIME_TYPE
    }
}

impl Drop for GstCaptureStream {
    fn drop(&mut self) {
        self.detach();
    }
}
