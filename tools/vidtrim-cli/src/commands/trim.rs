//! Trim a window out of a video and save it.

use anyhow::Context;
use vidtrim_capture_engine::backend::{build_surfaces, BackendKind, BackendOptions};
use vidtrim_capture_engine::{DriverConfig, EditSession, Pace, SessionConfig, SessionDriver};
use vidtrim_common::config::AppConfig;
use vidtrim_edit_model::filter::FilterState;
use vidtrim_playback::sim::SimulatedMedia;
use vidtrim_render_engine::export::SaveRequest;

use crate::TrimArgs;

pub async fn run(args: TrimArgs, config: &AppConfig) -> anyhow::Result<()> {
    let kind = if args.simulate {
        BackendKind::Simulated
    } else {
        BackendKind::Gstreamer
    };
    let options = BackendOptions {
        video_sink: args.video_sink.clone(),
        simulated_media: SimulatedMedia::new(args.sim_duration),
    };
    let surfaces = build_surfaces(kind, &options)?;
    tracing::debug!(?kind, "Surfaces ready");

    let driver_config = DriverConfig::from(&config.playback);
    let mut driver = match surfaces.simulated {
        Some((primary, secondary)) => {
            let step = driver_config.tick_interval;
            SessionDriver::new(driver_config, Pace::Simulated { step }).on_tick(move |dt| {
                primary.advance(dt);
                secondary.advance(dt);
            })
        }
        None => SessionDriver::new(driver_config, Pace::RealTime),
    };

    let mut session = EditSession::new(
        SessionConfig::from(config),
        surfaces.primary,
        surfaces.secondary,
    );

    println!("Loading: {}", args.input.display());
    session
        .load_file(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    let duration = driver.wait_for_metadata(&mut session).await?;
    println!("  Duration: {duration:.2}s");

    let filter = session.set_filter(FilterState::new(
        args.brightness,
        args.saturation,
        args.contrast,
    ));
    if !filter.is_neutral() {
        println!("  Filter: {}", session.descriptor().css());
    }

    if let Some(start) = args.start {
        session.set_start(start);
        let end = args
            .end
            .unwrap_or(start + config.export.default_window_secs);
        session.set_end(end);
    } else if let Some(end) = args.end {
        session.set_end(end);
    }
    let window = session.window();
    println!(
        "  Window: {:.2}s - {:.2}s ({:.2}s)",
        window.start(),
        window.end(),
        window.length()
    );

    println!("Recording...");
    let outcome = tokio::select! {
        result = driver.run_export(&mut session) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let Some(result) = outcome else {
        session.abort_export();
        anyhow::bail!("Export interrupted");
    };
    let artifact = result?.context("Nothing was exported")?;
    println!(
        "  Recorded {:.2}s in {} chunks ({} bytes)",
        artifact.recorded_secs, artifact.chunk_count, artifact.byte_len
    );

    let request = SaveRequest {
        output_dir: args.output,
        filename: args
            .filename
            .unwrap_or_else(|| config.export.default_filename.clone()),
        write_metadata: args.metadata,
    };
    match session.save_artifact_as(&request).await? {
        Some(path) => println!("Export complete: {}", path.display()),
        None => println!("Export produced no artifact"),
    }

    Ok(())
}
