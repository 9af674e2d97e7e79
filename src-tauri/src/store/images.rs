use std::sync::Mutex;

use serde::Serialize;

use super::lock;

/// Detection results for one uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_id: String,
    pub image_url: String,
    pub image_name: String,
    pub dugong_count: u32,
    pub mother_calf_count: u32,
    pub image_class: String,
    pub created_at: String,
    pub captured_date: Option<String>,
}

impl ImageResult {
    /// Each mother-calf pair is two animals.
    pub fn total_count(&self) -> u32 {
        self.mother_calf_count
            .saturating_mul(2)
            .saturating_add(self.dugong_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub session_id: Option<String>,
    pub results: Vec<ImageResult>,
    pub current_index: usize,
    pub total: usize,
}

#[derive(Default)]
struct ImageState {
    session_id: Option<String>,
    results: Vec<ImageResult>,
    current: usize,
}

impl ImageState {
    fn clamp(&mut self) {
        self.current = self.current.min(self.results.len().saturating_sub(1));
    }
}

/// Results for the current session plus which one is being viewed.
/// Kept in memory only.
#[derive(Default)]
pub struct ImageResultStore {
    state: Mutex<ImageState>,
}

impl ImageResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list wholesale. The viewer keeps its position when the
    /// list grows and is pulled back when it shrinks.
    pub fn replace_all(&self, session_id: &str, results: Vec<ImageResult>) -> usize {
        let mut state = lock(&self.state);
        if state.session_id.as_deref() != Some(session_id) {
            state.current = 0;
        }
        state.session_id = Some(session_id.to_string());
        state.results = results;
        state.clamp();
        state.results.len()
    }

    pub fn select(&self, index: usize) -> usize {
        let mut state = lock(&self.state);
        state.current = index;
        state.clamp();
        state.current
    }

    /// Step forward. Returns false at the last image.
    pub fn next(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current + 1 < state.results.len() {
            state.current += 1;
            true
        } else {
            false
        }
    }

    /// Step back. Returns false at the first image.
    pub fn previous(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current > 0 {
            state.current -= 1;
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<ImageResult> {
        let state = lock(&self.state);
        state.results.get(state.current).cloned()
    }

    pub fn find_by_name(&self, image_name: &str) -> Option<ImageResult> {
        lock(&self.state)
            .results
            .iter()
            .find(|r| r.image_name == image_name)
            .cloned()
    }

    /// Change one image's class in place. Returns false when the image is
    /// not in the list.
    pub fn set_image_class(&self, image_name: &str, image_class: &str) -> bool {
        let mut state = lock(&self.state);
        match state.results.iter_mut().find(|r| r.image_name == image_name) {
            Some(result) => {
                result.image_class = image_class.to_string();
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> usize {
        lock(&self.state).results.len()
    }

    pub fn clear_store(&self) {
        *lock(&self.state) = ImageState::default();
    }

    pub fn snapshot(&self) -> ResultsSnapshot {
        let state = lock(&self.state);
        ResultsSnapshot {
            session_id: state.session_id.clone(),
            results: state.results.clone(),
            current_index: state.current,
            total: state.results.len(),
        }
    }
}
