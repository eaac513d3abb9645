//! GStreamer pipeline construction for playback and capture.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use vidtrim_common::clock::MonotonicClock;
use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_playback::CaptureFormat;

/// Names of the `videobalance` elements that carry the filter, one per
/// stage in chain order.
pub const BALANCE_ELEMENTS: [&str; 3] = ["balance_brightness", "balance_saturate", "balance_contrast"];

/// Name of the `tee` that feeds display and capture.
pub const SPLIT_ELEMENT: &str = "split";

/// Name of the capture bin once attached to a pipeline.
pub const CAPTURE_BIN: &str = "capture";

/// Name of the valve gating the capture branch.
pub const CAPTURE_VALVE: &str = "capture_valve";

/// Name of the sink at the end of the capture branch.
pub const CAPTURE_SINK: &str = "capture_sink";

/// Container MIME type the capture branch can produce.
pub const WEBM_MIME_TYPE: &str = "video/webm";

/// Default display sink; renders nowhere but keeps real-time pacing.
pub const DEFAULT_VIDEO_SINK: &str = "fakesink sync=true";

/// Elements every playback pipeline needs.
pub const PLAYBACK_ELEMENTS: &[&str] = &[
    "filesrc",
    "decodebin",
    "queue",
    "videoconvert",
    "videobalance",
    "tee",
    "fakesink",
];

/// Elements the WebM capture branch needs.
pub const CAPTURE_ELEMENTS: &[&str] = &["valve", "vp8enc", "webmmux"];

/// Which side of an edit session a pipeline serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineRole {
    /// Played, filtered, and captured.
    Primary,
    /// Muted scrub preview; never captured.
    Preview,
}

/// Whether a GStreamer element factory is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAvailability {
    pub element: &'static str,
    pub available: bool,
    pub required_for: &'static str,
}

/// Decoded properties of a media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// Launch description for a playback pipeline over `path`.
pub fn build_playback_launch(path: &Path, role: PipelineRole, video_sink: &str) -> String {
    let path = escape_path(path);
    let balance = BALANCE_ELEMENTS
        .iter()
        .map(|name| format!("videobalance name={name}"))
        .collect::<Vec<_>>()
        .join(" ! ");
    match role {
        PipelineRole::Primary => format!(
            "filesrc location=\"{path}\" ! decodebin ! video/x-raw ! queue ! videoconvert ! {balance} ! videoconvert ! tee name={SPLIT_ELEMENT} {SPLIT_ELEMENT}. ! queue ! {video_sink}"
        ),
        PipelineRole::Preview => format!(
            "filesrc location=\"{path}\" ! decodebin ! video/x-raw ! queue ! videoconvert ! {balance} ! videoconvert ! {video_sink}"
        ),
    }
}

/// Bin description for a capture branch hung off the primary `tee`.
///
/// The valve starts closed; buffers only reach the encoder once the capture
/// is started.
pub fn build_capture_description(format: &CaptureFormat) -> VidtrimResult<String> {
    if format.mime_type != WEBM_MIME_TYPE {
        return Err(VidtrimError::capture_unavailable(format!(
            "Unsupported capture container: {}",
            format.mime_type
        )));
    }
    let bitrate_bps = u64::from(format.video_bitrate_kbps.max(1)) * 1000;
    // leaky queue: the capture branch must never stall playback.
    Ok(format!(
        "queue max-size-buffers=8 leaky=downstream ! valve name={CAPTURE_VALVE} drop=true ! videoconvert ! vp8enc deadline=1 target-bitrate={bitrate_bps} ! webmmux streamable=true ! fakesink name={CAPTURE_SINK} sync=false async=false"
    ))
}

/// Whether this host can record `format` at all.
pub fn capture_supported(format: &CaptureFormat) -> bool {
    format.mime_type == WEBM_MIME_TYPE
        && init_gstreamer().is_ok()
        && missing_elements(CAPTURE_ELEMENTS).is_empty()
}

/// Report every element vidtrim relies on.
pub fn probe_elements() -> VidtrimResult<Vec<ElementAvailability>> {
    init_gstreamer()?;
    let playback = PLAYBACK_ELEMENTS.iter().copied().map(|element| ElementAvailability {
        element,
        available: gst::ElementFactory::find(element).is_some(),
        required_for: "playback",
    });
    let capture = CAPTURE_ELEMENTS.iter().copied().map(|element| ElementAvailability {
        element,
        available: gst::ElementFactory::find(element).is_some(),
        required_for: "capture",
    });
    Ok(playback.chain(capture).collect())
}

/// Factories from `elements` that are not installed.
pub fn missing_elements(elements: &[&'static str]) -> Vec<&'static str> {
    elements
        .iter()
        .copied()
        .filter(|element| gst::ElementFactory::find(element).is_none())
        .collect()
}

/// Decode just enough of `path` to learn its duration and frame size.
pub fn probe_media(path: &Path, timeout: Duration) -> VidtrimResult<MediaInfo> {
    init_gstreamer()?;
    if !path.is_file() {
        return Err(VidtrimError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let launch = format!(
        "filesrc location=\"{}\" ! decodebin ! video/x-raw ! fakesink name=probe",
        escape_path(path)
    );
    let pipeline = launch_pipeline(&launch)?;
    let result = preroll_and_query(&pipeline, timeout);
    let _ = pipeline.set_state(gst::State::Null);
    result
}

fn preroll_and_query(pipeline: &gst::Pipeline, timeout: Duration) -> VidtrimResult<MediaInfo> {
    pipeline
        .set_state(gst::State::Paused)
        .map_err(|e| VidtrimError::playback(format!("Failed to preroll: {e:?}")))?;
    wait_for_state(pipeline, gst::State::Paused, timeout, "probe")?;

    let duration = pipeline
        .query_duration::<gst::ClockTime>()
        .ok_or_else(|| VidtrimError::playback("Media reports no duration"))?;

    let caps = pipeline
        .by_name("probe")
        .and_then(|sink| sink.static_pad("sink"))
        .and_then(|pad| pad.current_caps());
    let structure = caps.as_ref().and_then(|caps| caps.structure(0));

    Ok(MediaInfo {
        duration_secs: MonotonicClock::ns_to_secs(duration.nseconds()),
        width: structure.and_then(|s| s.get::<i32>("width").ok()),
        height: structure.and_then(|s| s.get::<i32>("height").ok()),
    })
}

/// Parse `launch` into a pipeline.
pub fn launch_pipeline(launch: &str) -> VidtrimResult<gst::Pipeline> {
    init_gstreamer()?;

    let element = gst::parse::launch(launch)
        .map_err(|e| VidtrimError::playback(format!("Failed to build pipeline: {e}")))?;

    element
        .dynamic_cast::<gst::Pipeline>()
        .map_err(|_| VidtrimError::playback("Launch string did not produce a pipeline"))
}

/// Wait for an asynchronous state change to land.
///
/// On failure the first error on the bus is folded into the returned
/// message.
pub fn wait_for_state(
    pipeline: &gst::Pipeline,
    target: gst::State,
    timeout: Duration,
    name: &str,
) -> VidtrimResult<()> {
    let timeout = gst::ClockTime::from_nseconds(
        u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX),
    );
    match pipeline.state(timeout) {
        (Ok(_), state, _) if state == target => Ok(()),
        (Ok(_), state, _) => {
            tracing::warn!(
                pipeline = name,
                ?state,
                ?target,
                "Pipeline did not reach target state within timeout"
            );
            Ok(())
        }
        (Err(e), _, _) => {
            let detail = first_bus_error(pipeline).unwrap_or_else(|| format!("{e:?}"));
            Err(VidtrimError::playback(format!(
                "{name} pipeline failed to reach {target:?}: {detail}"
            )))
        }
    }
}

fn first_bus_error(pipeline: &gst::Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    while let Some(msg) = bus.pop() {
        if let gst::MessageView::Error(e) = msg.view() {
            return Some(e.error().to_string());
        }
    }
    None
}

pub(crate) fn init_gstreamer() -> VidtrimResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(VidtrimError::capture_unavailable(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn primary_launch_splits_after_balance() {
        let launch = build_playback_launch(
            &PathBuf::from("/tmp/clip.webm"),
            PipelineRole::Primary,
            DEFAULT_VIDEO_SINK,
        );
        assert!(launch.starts_with("filesrc location=\"/tmp/clip.webm\""));
        let brightness = launch.find("videobalance name=balance_brightness").unwrap();
        let saturate = launch.find("videobalance name=balance_saturate").unwrap();
        let contrast = launch.find("videobalance name=balance_contrast").unwrap();
        let tee = launch.find("tee name=split").unwrap();
        assert!(brightness < saturate && saturate < contrast && contrast < tee);
        assert!(launch.ends_with("fakesink sync=true"));
    }

    #[test]
    fn preview_launch_has_no_capture_split() {
        let launch = build_playback_launch(
            &PathBuf::from("/tmp/clip.webm"),
            PipelineRole::Preview,
            DEFAULT_VIDEO_SINK,
        );
        assert_eq!(launch.matches("videobalance").count(), 3);
        assert!(!launch.contains("tee"));
    }

    #[test]
    fn launch_escapes_quotes_in_path() {
        let launch = build_playback_launch(
            &PathBuf::from("/tmp/my \"clip\".webm"),
            PipelineRole::Preview,
            DEFAULT_VIDEO_SINK,
        );
        assert!(launch.contains("location=\"/tmp/my \\\"clip\\\".webm\""));
    }

    #[test]
    fn capture_description_encodes_webm_at_bitrate() {
        let description = build_capture_description(&CaptureFormat {
            mime_type: "video/webm".to_string(),
            video_bitrate_kbps: 1200,
        })
        .unwrap();
        assert!(description.contains("valve name=capture_valve drop=true"));
        assert!(description.contains("target-bitrate=1200000"));
        assert!(description.contains("webmmux"));
    }

    #[test]
    fn capture_description_rejects_other_containers() {
        let err = build_capture_description(&CaptureFormat {
            mime_type: "video/mp4".to_string(),
            video_bitrate_kbps: 2500,
        })
        .unwrap_err();
        assert!(err.is_capture_unavailable());
    }
}
