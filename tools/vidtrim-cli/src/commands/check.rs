//! Check GStreamer capabilities.

use vidtrim_capture_engine::pipeline::probe_elements;
use vidtrim_common::config::AppConfig;
use vidtrim_playback::CaptureFormat;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("vidtrim System Check");
    println!("{}", "=".repeat(50));

    let elements = probe_elements()?;
    for e in &elements {
        let status = if e.available { "[OK]" } else { "[MISSING]" };
        println!("{status} {} (needed for {})", e.element, e.required_for);
    }

    let playback_ok = elements
        .iter()
        .filter(|e| e.required_for == "playback")
        .all(|e| e.available);
    let capture_ok = elements.iter().all(|e| e.available);

    let format = CaptureFormat {
        mime_type: config.export.mime_type.clone(),
        video_bitrate_kbps: config.export.video_bitrate_kbps,
    };

    println!();
    println!(
        "Export format: {} @ {} kbps",
        format.mime_type, format.video_bitrate_kbps
    );
    if !vidtrim_capture_engine::pipeline::capture_supported(&format) {
        println!("[WARN] Export format is not supported on this host");
    }

    println!();
    match (playback_ok, capture_ok) {
        (true, true) => println!("All capabilities are available. vidtrim is ready."),
        (true, false) => println!("Playback works, but exporting is unavailable. See above."),
        _ => println!("Required playback elements are missing. See above."),
    }

    Ok(())
}
