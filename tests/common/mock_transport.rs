/*!
 * Mock player and store implementations for testing
 *
 * The player shares its state through a tracker so tests can move the play
 * head and inspect seeks after the player has been handed to a workspace.
 * The flaky store wraps the in-memory store and fails on demand.
 */

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use caploop::captions::{Caption, CaptionId};
use caploop::errors::StoreError;
use caploop::playback::{PlaybackState, Transport};
use caploop::store::{CaptionStore, CaptionUpdate, MemoryStore};

/// Shared state of a mock player
#[derive(Debug)]
pub struct PlayerTracker {
    /// Play head in seconds
    pub position: f64,
    /// Media length reported to the engine
    pub duration: Option<f64>,
    /// Whether the player answers queries
    pub ready: bool,
    /// Every seek target in order
    pub seeks: Vec<f64>,
    /// Number of position reads
    pub position_reads: usize,
    pub state: PlaybackState,
}

impl Default for PlayerTracker {
    fn default() -> Self {
        Self {
            position: 0.0,
            duration: Some(120.0),
            ready: true,
            seeks: Vec::new(),
            position_reads: 0,
            state: PlaybackState::Playing,
        }
    }
}

/// Player driven entirely by the test
#[derive(Debug, Clone, Default)]
pub struct MockPlayer {
    tracker: Arc<Mutex<PlayerTracker>>,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(duration: Option<f64>) -> Self {
        let player = Self::default();
        player.tracker.lock().unwrap().duration = duration;
        player
    }

    /// Get the shared tracker
    pub fn tracker(&self) -> Arc<Mutex<PlayerTracker>> {
        self.tracker.clone()
    }

    pub fn set_position(&self, position: f64) {
        self.tracker.lock().unwrap().position = position;
    }

    pub fn set_ready(&self, ready: bool) {
        self.tracker.lock().unwrap().ready = ready;
    }

    pub fn position(&self) -> f64 {
        self.tracker.lock().unwrap().position
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.tracker.lock().unwrap().seeks.clone()
    }

    pub fn clear_seeks(&self) {
        self.tracker.lock().unwrap().seeks.clear();
    }
}

impl Transport for MockPlayer {
    fn current_time(&self) -> f64 {
        let mut tracker = self.tracker.lock().unwrap();
        tracker.position_reads += 1;
        tracker.position
    }

    fn duration(&self) -> Option<f64> {
        self.tracker.lock().unwrap().duration
    }

    fn seek(&mut self, seconds: f64) {
        let mut tracker = self.tracker.lock().unwrap();
        tracker.position = seconds;
        tracker.seeks.push(seconds);
    }

    fn is_ready(&self) -> bool {
        self.tracker.lock().unwrap().ready
    }

    fn playback_state(&self) -> PlaybackState {
        self.tracker.lock().unwrap().state
    }
}

/// Which store calls should fail
#[derive(Debug, Default)]
pub struct StoreFailures {
    pub load: bool,
    pub save: bool,
    pub update: bool,
    pub delete: bool,
    /// Number of calls that reached the inner store
    pub call_count: usize,
}

/// In-memory store that fails on demand
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failures: Arc<Mutex<StoreFailures>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn failures(&self) -> Arc<Mutex<StoreFailures>> {
        self.failures.clone()
    }

    pub fn fail_all(&self, fail: bool) {
        let mut failures = self.failures.lock().unwrap();
        failures.load = fail;
        failures.save = fail;
        failures.update = fail;
        failures.delete = fail;
    }

    fn gate(&self, failing: impl Fn(&StoreFailures) -> bool) -> Result<(), StoreError> {
        let mut failures = self.failures.lock().unwrap();
        if failing(&failures) {
            return Err(StoreError::Backend("simulated outage".to_string()));
        }
        failures.call_count += 1;
        Ok(())
    }
}

#[async_trait]
impl CaptionStore for FlakyStore {
    async fn load_captions(&self, subject_id: &str) -> Result<Vec<Caption>, StoreError> {
        self.gate(|f| f.load)?;
        self.inner.load_captions(subject_id).await
    }

    async fn save_caption(&self, subject_id: &str, caption: &Caption) -> Result<Caption, StoreError> {
        self.gate(|f| f.save)?;
        self.inner.save_caption(subject_id, caption).await
    }

    async fn update_caption(&self, id: &CaptionId, update: &CaptionUpdate) -> Result<Caption, StoreError> {
        self.gate(|f| f.update)?;
        self.inner.update_caption(id, update).await
    }

    async fn delete_caption(&self, id: &CaptionId) -> Result<bool, StoreError> {
        self.gate(|f| f.delete)?;
        self.inner.delete_caption(id).await
    }
}
