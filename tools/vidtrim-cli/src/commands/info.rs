//! Show media information.

use std::path::PathBuf;
use std::time::Duration;

use vidtrim_capture_engine::pipeline::probe_media;
use vidtrim_edit_model::blob::BlobStore;
use vidtrim_edit_model::window::TrimWindow;

pub fn run(input: PathBuf, json: bool) -> anyhow::Result<()> {
    let info = probe_media(&input, Duration::from_secs(10))
        .map_err(|e| anyhow::anyhow!("Failed to probe media: {e}"))?;

    let mut blobs = BlobStore::new();
    let handle = blobs.insert_file(&input)?;
    let window = TrimWindow::default().fit_to(info.duration_secs);

    if json {
        let report = serde_json::json!({
            "path": input,
            "handle": handle.as_str(),
            "duration_secs": info.duration_secs,
            "width": info.width,
            "height": info.height,
            "default_window": window,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Media: {}", input.display());
    println!("  Handle: {handle}");
    println!("  Duration: {:.2}s", info.duration_secs);
    match (info.width, info.height) {
        (Some(w), Some(h)) => println!("  Resolution: {w}x{h}"),
        _ => println!("  Resolution: unknown"),
    }
    println!(
        "  Default window: {:.2}s - {:.2}s",
        window.start(),
        window.end()
    );

    Ok(())
}
