//! Test fixtures: candidate images, stores and sessions backed by temp directories.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use glimpse::embedding::{MockModelLoader, MockSimilarityModel, ModelLoader, ModelRegistry};
use glimpse::session::{LearningSession, SessionConfig};
use glimpse::storage::AttemptStore;
use glimpse::training::{RecordingJobRunner, TriggerConfig};
use glimpse::{CandidateIndex, Candidates};
use image::{ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

/// Side length of generated candidate images.
pub const IMAGE_SIDE: u32 = 8;

/// Encodes a solid-colour PNG.
pub fn solid_png(rgb: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(IMAGE_SIDE, IMAGE_SIDE, Rgb(rgb));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("PNG encoding should succeed");
    buf.into_inner()
}

/// Four distinct PNG candidates; `seed` makes sets distinct across attempts.
pub fn png_candidates(seed: u8) -> Candidates {
    Candidates::from_bytes((0..4u8).map(|i| solid_png([seed, i.wrapping_mul(60), 255 - seed])))
        .expect("four candidates")
}

/// Shorthand for a 1-based candidate index.
pub fn idx(i: u8) -> CandidateIndex {
    CandidateIndex::new(i).expect("index in 1..=4")
}

/// Baseline mock: trusted on "cherry", untrusted on "apple", uniform otherwise.
pub fn baseline_model() -> MockSimilarityModel {
    MockSimilarityModel::new()
        .with_scores("cherry", [0.04, 0.06, 0.70, 0.20])
        .with_scores("apple", [0.30, 0.28, 0.22, 0.20])
}

/// An opened store in its own temp directory.
pub struct TestStore {
    pub store: AttemptStore,
    pub dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = AttemptStore::open(dir.path()).expect("store should open");
        Self { store, dir }
    }

    /// A second handle on the same root (as another process would have).
    pub fn reopen(&self) -> AttemptStore {
        AttemptStore::open(self.dir.path()).expect("store should reopen")
    }
}

/// A session over mock models and a recording runner.
pub struct TestSession {
    pub session: LearningSession,
    pub runner: Arc<RecordingJobRunner>,
    pub dir: TempDir,
}

/// Builder for [`TestSession`].
pub struct TestSessionBuilder {
    loader: MockModelLoader,
    config: SessionConfig,
}

impl Default for TestSessionBuilder {
    fn default() -> Self {
        Self {
            loader: MockModelLoader::new(baseline_model()),
            config: SessionConfig::default(),
        }
    }
}

impl TestSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(mut self, model: MockSimilarityModel) -> Self {
        self.loader = MockModelLoader::new(model);
        self
    }

    pub fn finetuned(mut self, model: MockSimilarityModel) -> Self {
        self.loader = self.loader.with_finetuned(model);
        self
    }

    /// Launch after `labels` labels with no minimum interval.
    pub fn train_every(mut self, labels: u64) -> Self {
        self.config.trigger = TriggerConfig::default()
            .with_label_threshold(labels)
            .with_min_interval(Duration::ZERO);
        self
    }

    pub fn build(self) -> TestSession {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = AttemptStore::open(dir.path()).expect("store should open");
        let runner = Arc::new(RecordingJobRunner::new());
        let session = LearningSession::new(
            store,
            Arc::new(ModelRegistry::new(self.loader)),
            self.config,
            runner.clone(),
        );
        TestSession {
            session,
            runner,
            dir,
        }
    }
}

/// Registry over any loader, for scorer-level tests.
pub fn registry(loader: impl ModelLoader + 'static) -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(loader))
}
