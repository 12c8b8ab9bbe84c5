use std::io::{self, BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use log::{info, warn};

use pixelbooth::{AnalysisRequest, BoothError, BoothEvent, BoothSession, Config};

/// PixelBooth - operator console for an unattended photo booth.
///
/// Starts a booth session with simulated telemetry and shutter, then reads
/// operator commands from stdin, one per line. Session events are logged as
/// they happen.
///
/// # Environment Variables
///
/// All optional:
/// * `TELEMETRY_INTERVAL_MS` - Telemetry tick period (default: "3000")
/// * `COUNTDOWN_INTERVAL_MS` - Countdown step period (default: "1000")
/// * `PAPER_DROP_PROBABILITY` - Per-tick paper usage chance (default: "0.10")
/// * `SESSION_BUMP_PROBABILITY` - Per-tick session chance (default: "0.05")
/// * `LOW_PAPER_THRESHOLD` - Low paper warning level in percent (default: "20")
/// * `GEMINI_API_KEY` - Captioning API key; without it captions fall back
/// * `GEMINI_MODEL` - Captioning model (default: "gemini-2.5-flash")
/// * `GEMINI_API_URL` - Captioning API base URL
/// * `CAPTION_TIMEOUT_SECONDS` - HTTP timeout for captioning (default: "30")
/// * `SEED_DEMO_PHOTOS` - Start with the demo gallery (default: "true")
///
/// # Usage
///
/// ```bash
/// export GEMINI_API_KEY="..."
/// ./pixelbooth
/// > capture
/// > photos
/// > analyze photo-0
/// ```
fn main() -> Result<()> {
    // Initialize logger to output to stdout, using RUST_LOG env var or info level by default
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stdout)
        .filter_level(
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|level| level.parse().ok())
                .unwrap_or(log::LevelFilter::Info),
        )
        .init();

    let config = load_config().context("Failed to load configuration")?;

    info!("PixelBooth console starting...");
    if config.gemini_api_key.is_none() {
        warn!("No GEMINI_API_KEY set; every caption will be the fallback caption");
    }

    let mut session = BoothSession::from_config(&config);
    let events = session.subscribe();
    thread::Builder::new()
        .name("event-log".to_string())
        .spawn(move || {
            for event in events {
                log_event(&event);
            }
        })
        .context("Failed to start event logger")?;

    print_help();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else { continue };
        let argument = words.next();

        match (command, argument) {
            ("status", _) => println!("{}", serde_json::to_string_pretty(&session.status())?),
            ("photos", _) => {
                for photo in session.photos() {
                    let caption = photo
                        .analysis
                        .as_ref()
                        .map(|a| format!("{} {}", a.caption, a.tags.join(" ")))
                        .unwrap_or_default();
                    println!(
                        "{}  {}  {:?}  {}",
                        photo.id,
                        photo.captured_at.format("%Y-%m-%d %H:%M"),
                        photo.analysis_state,
                        caption
                    );
                }
            }
            ("capture", _) => {
                if !session.trigger_capture() {
                    println!("A countdown is already running");
                }
            }
            ("cancel", _) => {
                if !session.cancel_capture() {
                    println!("Nothing to cancel");
                }
            }
            ("flash", _) => {
                session.toggle_flash();
            }
            ("select", Some(id)) => match session.select_photo(id) {
                Some(photo) => match session.displayed_analysis() {
                    Some(analysis) => println!("{}: {} {}", photo.id, analysis.caption, analysis.tags.join(" ")),
                    None => println!("{}: not analyzed yet", photo.id),
                },
                None => println!("No photo '{}'", id),
            },
            ("analyze", Some(id)) => match session.request_analysis(id) {
                AnalysisRequest::Started(_) => println!("Analyzing {}...", id),
                AnalysisRequest::Busy => println!("{} is already being analyzed", id),
                AnalysisRequest::NotFound => println!("No photo '{}'", id),
            },
            ("delete", Some(id)) => {
                if !session.delete_photo(id) {
                    println!("No photo '{}'", id);
                }
            }
            ("refill", level) => {
                let level = level.and_then(|l| l.parse().ok()).unwrap_or(100);
                session.refill_paper(level);
            }
            ("quit", _) | ("exit", _) => break,
            _ => print_help(),
        }
    }

    session.shutdown();
    info!("PixelBooth console stopped");
    Ok(())
}

fn load_config() -> Result<Config, BoothError> {
    let config = Config::load()?;
    info!(
        "Telemetry every {:?}, countdown every {:?}, low paper below {}%",
        config.telemetry_interval, config.countdown_interval, config.low_paper_threshold
    );
    Ok(config)
}

fn log_event(event: &BoothEvent) {
    match event {
        BoothEvent::Countdown(n) => info!("Countdown: {}", n),
        BoothEvent::CaptureCompleted(photo) => info!("Captured {} ({})", photo.id, photo.url),
        BoothEvent::CaptureFailed(reason) => warn!("Capture failed: {}. Try again.", reason),
        BoothEvent::CaptureCancelled => info!("Capture cancelled"),
        BoothEvent::FlashToggled(enabled) => info!("Flash {}", if *enabled { "on" } else { "off" }),
        BoothEvent::StatusChanged(status) => info!(
            "Status: paper {}%, {} sessions, printer {:?}",
            status.paper_level, status.session_count, status.printer_status
        ),
        BoothEvent::PaperLow(level) => warn!("Paper low: {}% left", level),
        BoothEvent::PhotoDeleted(id) => info!("Deleted {}", id),
        BoothEvent::AnalysisFinished { photo_id, state } => {
            info!("Analysis of {} finished: {:?}", photo_id, state)
        }
    }
}

fn print_help() {
    println!("Commands: status | photos | capture | cancel | flash | select <id> | analyze <id> | delete <id> | refill [level] | quit");
}
