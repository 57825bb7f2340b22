/// Live position tracker
///
/// Reads frames from a camera, video file or image directory, maps every
/// tracked person to floor coordinates and streams them over UDP.
///
/// No detection model is bundled: the stub detector reports no people, so
/// packets stay empty until a real `Detector` is plugged in.
///
/// Usage:
///   cargo run --release --example live_tracker [settings.json] [source]
///   cargo run --release --features opencv --example live_tracker -- settings.json 0
///
/// Press Enter to stop.
use livetrack::{AppSettings, LiveTracker, SequentialTracker, StubDetector};
use std::env;
use std::io::BufRead;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    livetrack::init()?;

    let args: Vec<String> = env::args().collect();
    let mut settings = match args.get(1) {
        Some(path) => AppSettings::from_file(path)?,
        None => {
            log::info!("No settings file given, using defaults");
            AppSettings::default()
        }
    };
    if let Some(source) = args.get(2) {
        settings.video.source = source.clone();
    }
    settings.validate()?;

    log::info!(
        "Source {:?}, smoother {:?}, UDP {}",
        settings.video.video_source(),
        settings.tracking.smoother,
        settings.network.address()
    );

    let mut tracker = LiveTracker::new(&settings, StubDetector::new(), SequentialTracker::new())?;

    let stop = tracker.stop_handle();
    std::thread::spawn(move || {
        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_ok() {
            log::info!("Stop requested");
            stop.stop();
        }
    });

    let stats = tracker.start()?;
    log::info!(
        "Done: {} cycles, {} positions sent, {} skipped, {} send failures, avg {:.1} fps",
        stats.cycles,
        stats.positions_sent,
        stats.skipped_cycles,
        stats.send_failures,
        tracker.fps().average()
    );
    Ok(())
}
