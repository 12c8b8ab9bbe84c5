mod common;

use std::sync::Arc;
use std::time::Duration;

use pixelbooth::gallery::demo_photos;
use pixelbooth::{
    AnalysisRequest, AnalysisState, BoothEvent, BoothSession, BoothStatus, CaptureState,
    SessionClock, TelemetrySimulator, TickOutcome,
};

use common::{CountingShutter, FlakyCaptioner, GatedCaptioner, sample_result};

fn manual_session(shutter: Arc<CountingShutter>) -> BoothSession {
    BoothSession::builder()
        .telemetry(Box::new(TelemetrySimulator::with_seed(
            BoothStatus::default(),
            0.0,
            0.0,
            7,
        )))
        .shutter(shutter)
        .captioner(Arc::new(FlakyCaptioner::new(0)))
        .photos(demo_photos())
        .build()
}

#[test]
fn test_delete_then_capture_scenario() {
    let shutter = Arc::new(CountingShutter::default());
    let session = manual_session(shutter.clone());
    assert_eq!(session.photos().len(), 8);

    assert!(session.delete_photo("photo-3"));
    let photos = session.photos();
    assert_eq!(photos.len(), 7);
    assert!(photos.iter().all(|p| p.id != "photo-3"));

    let sessions_before = session.status().session_count;
    assert!(session.trigger_capture());
    for _ in 0..3 {
        session.tick_countdown();
    }

    let photos = session.photos();
    assert_eq!(photos.len(), 8);
    assert_eq!(photos[0].url, "https://booth.test/capture-0.jpg");
    assert_eq!(photos[1].id, "photo-0");
    assert_eq!(session.status().session_count, sessions_before + 1);
    assert_eq!(session.capture_state(), CaptureState::Idle);
    assert_eq!(shutter.fired(), 1);
}

#[test]
fn test_trigger_while_arming_is_noop() {
    let session = manual_session(Arc::new(CountingShutter::default()));
    assert!(session.trigger_capture());
    session.tick_countdown();
    assert_eq!(session.remaining_countdown(), Some(2));

    assert!(!session.trigger_capture());
    assert_eq!(session.remaining_countdown(), Some(2));
}

#[test]
fn test_cancel_during_countdown_produces_no_photo() {
    for steps in 0..3 {
        let shutter = Arc::new(CountingShutter::default());
        let session = manual_session(shutter.clone());
        let sessions_before = session.status().session_count;

        session.trigger_capture();
        for _ in 0..steps {
            session.tick_countdown();
        }
        assert!(session.cancel_capture());
        assert_eq!(session.capture_state(), CaptureState::Idle);
        assert!(matches!(session.tick_countdown(), TickOutcome::Idle));

        assert_eq!(session.photos().len(), 8);
        assert_eq!(session.status().session_count, sessions_before);
        assert_eq!(shutter.fired(), 0);
    }
}

#[test]
fn test_capture_events_are_published_in_order() {
    let session = manual_session(Arc::new(CountingShutter::default()));
    let events = session.subscribe();

    session.trigger_capture();
    for _ in 0..3 {
        session.tick_countdown();
    }

    let received: Vec<BoothEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 5, "{:?}", received);
    assert_eq!(received[0], BoothEvent::Countdown(3));
    assert_eq!(received[1], BoothEvent::Countdown(2));
    assert_eq!(received[2], BoothEvent::Countdown(1));
    assert!(matches!(&received[3], BoothEvent::CaptureCompleted(photo) if photo.id == session.photos()[0].id));
    assert!(matches!(&received[4], BoothEvent::StatusChanged(status) if status.session_count == 143));
}

#[test]
fn test_shutter_failure_is_surfaced_and_recoverable() {
    let shutter = Arc::new(CountingShutter::failing());
    let session = manual_session(shutter.clone());
    let events = session.subscribe();

    session.trigger_capture();
    for _ in 0..3 {
        session.tick_countdown();
    }
    assert_eq!(session.photos().len(), 8);
    assert_eq!(session.status().session_count, 142);
    assert!(events.try_iter().any(|e| matches!(e, BoothEvent::CaptureFailed(_))));

    shutter.fail.store(false, std::sync::atomic::Ordering::SeqCst);
    assert!(session.trigger_capture());
}

#[test]
fn test_double_analysis_request_calls_gateway_once() {
    let (captioner, release) = GatedCaptioner::new();
    let session = BoothSession::builder()
        .captioner(captioner.clone())
        .photos(demo_photos())
        .build();
    let events = session.subscribe();

    let first = session.request_analysis("photo-1");
    let second = session.request_analysis("photo-1");
    assert!(matches!(second, AnalysisRequest::Busy));

    release.send(()).unwrap();
    match first {
        AnalysisRequest::Started(handle) => assert_eq!(handle.wait(), AnalysisState::Done),
        other => panic!("expected analysis to start, got {:?}", other),
    }
    assert_eq!(captioner.calls(), 1);
    assert_eq!(session.photo("photo-1").unwrap().analysis, Some(sample_result()));
    assert_eq!(
        events.recv_timeout(Duration::from_secs(1)).unwrap(),
        BoothEvent::AnalysisFinished {
            photo_id: "photo-1".to_string(),
            state: AnalysisState::Done,
        }
    );
}

#[test]
fn test_selection_scopes_displayed_analysis() {
    let session = manual_session(Arc::new(CountingShutter::default()));
    if let AnalysisRequest::Started(handle) = session.request_analysis("photo-0") {
        handle.wait();
    }

    session.select_photo("photo-0");
    assert_eq!(session.displayed_analysis(), Some(sample_result()));
    session.select_photo("photo-2");
    assert_eq!(session.displayed_analysis(), None);
    session.clear_selection();
    assert!(session.selected_photo().is_none());
}

#[test]
fn test_delete_is_idempotent_and_announced_once() {
    let session = manual_session(Arc::new(CountingShutter::default()));
    let events = session.subscribe();
    assert!(session.delete_photo("photo-7"));
    assert!(!session.delete_photo("photo-7"));

    let received: Vec<BoothEvent> = events.try_iter().collect();
    assert_eq!(received, vec![BoothEvent::PhotoDeleted("photo-7".to_string())]);
}

#[test]
fn test_flash_toggle_is_published() {
    let session = manual_session(Arc::new(CountingShutter::default()));
    let events = session.subscribe();
    assert!(session.flash_enabled());
    assert!(!session.toggle_flash());
    assert_eq!(events.try_recv().unwrap(), BoothEvent::FlashToggled(false));
}

#[test]
fn test_low_paper_notice_is_raised_once_per_refill() {
    let status = BoothStatus {
        paper_level: 21,
        ..BoothStatus::default()
    };
    let session = BoothSession::builder()
        .telemetry(Box::new(TelemetrySimulator::with_seed(status, 1.0, 0.0, 3)))
        .low_paper_threshold(20)
        .build();
    let events = session.subscribe();

    for _ in 0..4 {
        session.tick_telemetry();
    }
    assert_eq!(session.status().paper_level, 17);

    let low: Vec<u8> = events
        .try_iter()
        .filter_map(|e| match e {
            BoothEvent::PaperLow(level) => Some(level),
            _ => None,
        })
        .collect();
    assert_eq!(low, vec![19]);

    session.refill_paper(21);
    assert_eq!(session.status().paper_level, 21);
    for _ in 0..2 {
        session.tick_telemetry();
    }

    let low: Vec<u8> = events
        .try_iter()
        .filter_map(|e| match e {
            BoothEvent::PaperLow(level) => Some(level),
            _ => None,
        })
        .collect();
    assert_eq!(low, vec![19]);
}

#[test]
fn test_timed_session_completes_capture_on_its_own() {
    let shutter = Arc::new(CountingShutter::default());
    let mut session = BoothSession::builder()
        .shutter(shutter.clone())
        .photos(demo_photos())
        .clock(SessionClock::Timed {
            telemetry_interval: Duration::from_millis(20),
            countdown_interval: Duration::from_millis(20),
        })
        .build();
    let events = session.subscribe();

    assert!(session.trigger_capture());
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    let mut completed = false;
    while !completed && std::time::Instant::now() < deadline {
        if let Ok(event) = events.recv_timeout(Duration::from_millis(100)) {
            completed = matches!(event, BoothEvent::CaptureCompleted(_));
        }
    }
    assert!(completed);
    assert_eq!(session.photos().len(), 9);
    assert_eq!(shutter.fired(), 1);

    session.shutdown();
    session.shutdown();
}

#[test]
fn test_timed_cancel_stops_countdown() {
    let shutter = Arc::new(CountingShutter::default());
    let session = BoothSession::builder()
        .shutter(shutter.clone())
        .photos(demo_photos())
        .clock(SessionClock::Timed {
            telemetry_interval: Duration::from_secs(60),
            countdown_interval: Duration::from_millis(200),
        })
        .build();

    assert!(session.trigger_capture());
    assert!(session.cancel_capture());
    std::thread::sleep(Duration::from_millis(800));

    assert_eq!(shutter.fired(), 0);
    assert_eq!(session.photos().len(), 8);
    assert_eq!(session.capture_state(), CaptureState::Idle);
}

#[test]
fn test_racing_trigger_and_cancel_never_strand_a_countdown() {
    let session = BoothSession::builder()
        .shutter(Arc::new(CountingShutter::default()))
        .clock(SessionClock::Timed {
            telemetry_interval: Duration::from_secs(60),
            countdown_interval: Duration::from_millis(5),
        })
        .build();

    for _ in 0..50 {
        std::thread::scope(|scope| {
            scope.spawn(|| session.trigger_capture());
            scope.spawn(|| session.cancel_capture());
        });

        // Whatever won the race, an armed sequence must still count down.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while session.capture_state() != CaptureState::Idle
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(session.capture_state(), CaptureState::Idle);
    }
}
