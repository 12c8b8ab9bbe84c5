//! Photo collection with single-flight AI analysis.
//!
//! The collection is the only owner of [`Photo`] records; callers always get
//! clones. Analysis runs on a background thread per request, and a photo whose
//! analysis is `Pending` refuses further requests until the first one lands.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::captioning::{AnalysisResult, Captioner};
use crate::config::constants;

/// Progress of the AI analysis attached to a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisState {
    None,
    Pending,
    Done,
    Failed,
}

/// One captured image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub url: String,
    pub captured_at: DateTime<Utc>,
    pub analysis: Option<AnalysisResult>,
    pub analysis_state: AnalysisState,
}

impl Photo {
    /// A photo captured now, with a fresh id and no analysis.
    pub fn new(url: String) -> Self {
        Self::with_id(format!("photo-{}", uuid::Uuid::new_v4()), url, Utc::now())
    }

    pub fn with_id(id: impl Into<String>, url: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            captured_at,
            analysis: None,
            analysis_state: AnalysisState::None,
        }
    }
}

/// The gallery shown to operators when the console starts without a camera.
///
/// Photos are newest first, `photo-0` .. `photo-7`, taken 15 minutes apart.
pub fn demo_photos() -> Vec<Photo> {
    let now = Utc::now();
    (0..constants::DEMO_PHOTO_COUNT)
        .map(|i| {
            Photo::with_id(
                format!("photo-{}", i),
                format!("https://picsum.photos/400/600?random={}", i),
                now - Duration::minutes(constants::DEMO_PHOTO_SPACING_MINUTES * i as i64),
            )
        })
        .collect()
}

/// What happened to an analysis request.
#[derive(Debug)]
pub enum AnalysisRequest {
    /// A background analysis was started.
    Started(AnalysisHandle),
    /// An analysis for this photo is already in flight.
    Busy,
    /// No photo carries this id.
    NotFound,
}

/// Handle to a background analysis.
#[derive(Debug)]
pub struct AnalysisHandle {
    photo_id: String,
    completion: Completion,
}

#[derive(Debug)]
enum Completion {
    Running(JoinHandle<AnalysisState>),
    Settled(AnalysisState),
}

impl AnalysisHandle {
    pub fn photo_id(&self) -> &str {
        &self.photo_id
    }

    /// Block until the analysis has been merged back, returning the final state.
    pub fn wait(self) -> AnalysisState {
        match self.completion {
            Completion::Running(handle) => handle.join().unwrap_or(AnalysisState::Failed),
            Completion::Settled(state) => state,
        }
    }
}

/// Callback run on the analysis thread once the result has been merged.
pub type AnalysisListener = Arc<dyn Fn(&str, AnalysisState) + Send + Sync>;

#[derive(Default)]
struct CollectionState {
    photos: Vec<Photo>,
    selected: Option<String>,
}

/// Ordered, newest-first set of photos.
///
/// Cloning a `PhotoCollection` yields another handle to the same set.
#[derive(Clone)]
pub struct PhotoCollection {
    state: Arc<Mutex<CollectionState>>,
    captioner: Arc<dyn Captioner>,
    listener: Option<AnalysisListener>,
}

impl PhotoCollection {
    /// Create an empty collection that captions through `captioner`.
    pub fn new(captioner: Arc<dyn Captioner>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectionState::default())),
            captioner,
            listener: None,
        }
    }

    /// Create a collection pre-filled with `photos`, kept in the given order.
    pub fn with_photos(captioner: Arc<dyn Captioner>, photos: Vec<Photo>) -> Self {
        let collection = Self::new(captioner);
        collection.lock().photos = photos;
        collection
    }

    /// Register a callback fired whenever an analysis finishes.
    pub fn on_analysis_finished(mut self, listener: AnalysisListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn lock(&self) -> MutexGuard<'_, CollectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of every photo, newest first.
    pub fn snapshot(&self) -> Vec<Photo> {
        self.lock().photos.clone()
    }

    pub fn get(&self, id: &str) -> Option<Photo> {
        self.lock().photos.iter().find(|p| p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().photos.is_empty()
    }

    /// Put a photo at the front of the collection.
    pub fn insert(&self, photo: Photo) {
        debug!("Adding photo {} to gallery", photo.id);
        self.lock().photos.insert(0, photo);
    }

    /// Remove the photo with `id`. Returns whether anything was removed.
    ///
    /// Deleting the selected photo also clears the selection.
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.lock();
        let before = state.photos.len();
        state.photos.retain(|p| p.id != id);
        let removed = state.photos.len() != before;
        if removed {
            if state.selected.as_deref() == Some(id) {
                state.selected = None;
            }
            info!("Deleted photo {}", id);
        }
        removed
    }

    /// Open a photo in the detail view.
    ///
    /// Returns the selected photo, or `None` (leaving the selection untouched)
    /// if the id is unknown.
    pub fn select(&self, id: &str) -> Option<Photo> {
        let mut state = self.lock();
        let photo = state.photos.iter().find(|p| p.id == id).cloned()?;
        state.selected = Some(photo.id.clone());
        Some(photo)
    }

    pub fn clear_selection(&self) {
        self.lock().selected = None;
    }

    pub fn selected(&self) -> Option<Photo> {
        let state = self.lock();
        let id = state.selected.as_deref()?;
        state.photos.iter().find(|p| p.id == id).cloned()
    }

    /// Analysis of the photo currently open in the detail view.
    ///
    /// Analyses of other photos stay on their records but are not displayed.
    pub fn displayed_analysis(&self) -> Option<AnalysisResult> {
        self.selected().and_then(|p| p.analysis)
    }

    /// Start captioning the photo with `id` on a background thread.
    ///
    /// The photo is marked `Pending` before this returns, so a second request
    /// for the same photo is answered with [`AnalysisRequest::Busy`] until the
    /// first one has been merged back as `Done` or `Failed`.
    pub fn request_analysis(&self, id: &str) -> AnalysisRequest {
        let url = {
            let mut state = self.lock();
            let Some(photo) = state.photos.iter_mut().find(|p| p.id == id) else {
                debug!("Analysis requested for unknown photo {}", id);
                return AnalysisRequest::NotFound;
            };
            if photo.analysis_state == AnalysisState::Pending {
                debug!("Analysis for photo {} already in flight", id);
                return AnalysisRequest::Busy;
            }
            photo.analysis_state = AnalysisState::Pending;
            photo.url.clone()
        };

        let worker = self.clone();
        let photo_id = id.to_string();
        let spawned = thread::Builder::new()
            .name("photo-caption".to_string())
            .spawn(move || worker.run_analysis(&photo_id, &url));

        let completion = match spawned {
            Ok(handle) => Completion::Running(handle),
            Err(e) => {
                error!("Could not start analysis thread for photo {}: {}", id, e);
                Completion::Settled(self.finish_analysis(id, None))
            }
        };
        AnalysisRequest::Started(AnalysisHandle {
            photo_id: id.to_string(),
            completion,
        })
    }

    fn run_analysis(&self, id: &str, url: &str) -> AnalysisState {
        info!("Analyzing photo {}", id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.captioner.caption(url)));
        let result = match outcome {
            Ok(Ok(result)) => Some(result),
            Ok(Err(e)) => {
                warn!("Captioning unavailable for photo {}: {}", id, e);
                None
            }
            Err(_) => {
                error!("Captioning backend panicked while analyzing photo {}", id);
                None
            }
        };
        self.finish_analysis(id, result)
    }

    fn finish_analysis(&self, id: &str, result: Option<AnalysisResult>) -> AnalysisState {
        let final_state = if result.is_some() {
            AnalysisState::Done
        } else {
            AnalysisState::Failed
        };

        {
            let mut state = self.lock();
            match state.photos.iter_mut().find(|p| p.id == id) {
                Some(photo) => {
                    photo.analysis_state = final_state;
                    if let Some(result) = result {
                        photo.analysis = Some(result);
                    }
                }
                None => debug!("Photo {} was deleted before its analysis finished", id),
            }
        }

        if let Some(listener) = &self.listener {
            listener(id, final_state);
        }
        final_state
    }
}
