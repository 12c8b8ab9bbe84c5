#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use pixelbooth::captioning::{CaptionRequest, Captioner};
use pixelbooth::error::{CaptionError, CaptureError, NetworkError};
use pixelbooth::{AnalysisResult, CaptionProvider, PhotoLoader, ShutterTrigger};

/// Shutter that counts how often it fired and can be told to fail.
#[derive(Default)]
pub struct CountingShutter {
    pub fired: AtomicUsize,
    pub last_flash: Mutex<Option<bool>>,
    pub fail: AtomicBool,
}

impl CountingShutter {
    pub fn failing() -> Self {
        let shutter = Self::default();
        shutter.fail.store(true, Ordering::SeqCst);
        shutter
    }

    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl ShutterTrigger for CountingShutter {
    fn capture(&self, flash_enabled: bool) -> Result<String, CaptureError> {
        let n = self.fired.fetch_add(1, Ordering::SeqCst);
        *self.last_flash.lock().unwrap() = Some(flash_enabled);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CaptureError::ShutterFailed {
                reason: "lens cap on".to_string(),
            });
        }
        Ok(format!("https://booth.test/capture-{}.jpg", n))
    }
}

pub fn sample_result() -> AnalysisResult {
    AnalysisResult {
        caption: "Squad goals at the summer party".to_string(),
        tags: vec!["#summer".to_string(), "#squad".to_string(), "#booth".to_string()],
    }
}

/// Captioner that holds every call until the test releases it.
pub struct GatedCaptioner {
    pub calls: AtomicUsize,
    gate: Mutex<Receiver<()>>,
}

impl GatedCaptioner {
    pub fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let captioner = Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(rx),
        });
        (captioner, tx)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Captioner for GatedCaptioner {
    fn caption(&self, _url: &str) -> Result<AnalysisResult, CaptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.lock().unwrap().recv();
        Ok(sample_result())
    }
}

/// Captioner whose backend is unreachable for the first `outages` calls.
pub struct FlakyCaptioner {
    pub calls: AtomicUsize,
    outages: usize,
}

impl FlakyCaptioner {
    pub fn new(outages: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outages,
        }
    }
}

impl Captioner for FlakyCaptioner {
    fn caption(&self, _url: &str) -> Result<AnalysisResult, CaptionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.outages {
            return Err(CaptionError::Unavailable {
                reason: "captioning service down".to_string(),
            });
        }
        Ok(sample_result())
    }
}

/// Captioner that blows up mid-call.
pub struct PanickingCaptioner;

impl Captioner for PanickingCaptioner {
    fn caption(&self, _url: &str) -> Result<AnalysisResult, CaptionError> {
        panic!("captioning backend crashed");
    }
}

/// Loader serving fixed bytes, or failing when none are given.
pub struct StaticLoader(pub Option<Vec<u8>>);

impl PhotoLoader for StaticLoader {
    fn load(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        self.0.clone().ok_or_else(|| NetworkError::RequestFailed {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Provider answering with a canned reply and remembering the last request.
pub struct CannedProvider {
    reply: Result<String, u16>,
    pub last_request: Arc<Mutex<Option<CaptionRequest>>>,
}

impl CannedProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            last_request: Arc::new(Mutex::new(None)),
        }
    }
}

impl CaptionProvider for CannedProvider {
    fn generate(&self, request: &CaptionRequest) -> Result<String, CaptionError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(CaptionError::ProviderFailed {
                status: Some(*status),
                message: "quota exceeded".to_string(),
            }),
        }
    }
}

/// First bytes of a PNG file.
pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
