use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::challenge::{CandidateIndex, Candidates};
use crate::constants::{FAILURE_PARTITION_DIR, SUCCESS_PARTITION_DIR};
use crate::hashing::{hash_candidates, short_hex};
use crate::selection::ModelVariant;

use super::error::{StorageError, StorageResult};

const SUCCESS_PREFIX: &str = "success";
const FAILURE_PREFIX: &str = "failed";
const ID_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";
const ID_HASH_LEN: usize = 8;

/// Which half of the store an attempt lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Attempts the target application accepted.
    Successes,
    /// Attempts the target application rejected.
    Failures,
}

impl Partition {
    /// Partition for an outcome.
    pub fn for_outcome(succeeded: bool) -> Self {
        if succeeded {
            Partition::Successes
        } else {
            Partition::Failures
        }
    }

    /// Directory name under the store root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Partition::Successes => SUCCESS_PARTITION_DIR,
            Partition::Failures => FAILURE_PARTITION_DIR,
        }
    }

    /// Prefix of every id in this partition.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Partition::Successes => SUCCESS_PREFIX,
            Partition::Failures => FAILURE_PREFIX,
        }
    }

    /// Both partitions, successes first.
    pub fn all() -> [Partition; 2] {
        [Partition::Successes, Partition::Failures]
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Attempt identifier: `success_YYYYMMDD_HHMMSS_ffffff-<hash>` or `failed_…`.
///
/// Ids sort lexicographically by recording time within a partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttemptId(String);

impl AttemptId {
    /// Builds the id for an attempt recorded at `recorded_at` with `candidates`.
    pub fn generate(partition: Partition, recorded_at: DateTime<Utc>, candidates: &Candidates) -> Self {
        let digest = hash_candidates(candidates);
        Self(format!(
            "{}_{}-{}",
            partition.id_prefix(),
            recorded_at.format(ID_TIMESTAMP_FORMAT),
            short_hex(&digest, ID_HASH_LEN)
        ))
    }

    /// Parses and validates an id string.
    pub fn parse(id: &str) -> StorageResult<Self> {
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_chars || Self::partition_of(id).is_none() {
            return Err(StorageError::InvalidId { id: id.to_string() });
        }
        Ok(Self(id.to_string()))
    }

    /// Returns the partition encoded in the id prefix.
    pub fn partition(&self) -> Partition {
        // parse/generate guarantee a known prefix
        Self::partition_of(&self.0).unwrap_or(Partition::Failures)
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn partition_of(id: &str) -> Option<Partition> {
        Partition::all().into_iter().find(|p| {
            id.strip_prefix(p.id_prefix())
                .is_some_and(|rest| rest.starts_with('_') && rest.len() > 1)
        })
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AttemptId {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AttemptId> for String {
    fn from(id: AttemptId) -> Self {
        id.0
    }
}

/// Where a label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelSource {
    /// Entered by an operator.
    Manual,
    /// Copied from a later success with the same question.
    RetroactiveFromSuccess,
    /// Predicted by the baseline model with a trusted gate.
    ImmediateModel,
}

impl LabelSource {
    /// Returns `true` for labels produced without a human.
    pub fn is_automatic(self) -> bool {
        !matches!(self, LabelSource::Manual)
    }
}

impl fmt::Display for LabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LabelSource::Manual => "manual",
            LabelSource::RetroactiveFromSuccess => "retroactive-from-success",
            LabelSource::ImmediateModel => "immediate-model",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// A label to write onto an unlabeled attempt.
pub struct LabelUpdate {
    /// 1-based correct candidate.
    pub correct_answer: CandidateIndex,
    /// Origin of the label.
    pub source: LabelSource,
    /// Model confidence in percent, for model-derived labels.
    pub confidence: Option<f32>,
}

impl LabelUpdate {
    /// Creates a label update.
    pub fn new(correct_answer: CandidateIndex, source: LabelSource) -> Self {
        Self {
            correct_answer,
            source,
            confidence: None,
        }
    }

    /// Attaches a confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Stored attempt metadata (`metadata.json`); images live next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt id (also the directory name).
    pub id: AttemptId,
    /// Question as shown.
    pub question: String,
    /// Candidate the solver picked, if any.
    #[serde(default)]
    pub chosen_index: Option<CandidateIndex>,
    /// Ground truth from the target application.
    pub succeeded: bool,
    /// Correct candidate, once known.
    #[serde(default)]
    pub correct_answer: Option<CandidateIndex>,
    /// Whether the label was produced automatically.
    #[serde(default)]
    pub auto_labeled: bool,
    /// Origin of the label.
    #[serde(default)]
    pub label_source: Option<LabelSource>,
    /// Model confidence for model-derived labels, in percent.
    #[serde(default)]
    pub label_confidence: Option<f32>,
    /// When the label was written.
    #[serde(default)]
    pub labeled_at: Option<DateTime<Utc>>,
    /// When the attempt was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Variant whose scores drove the choice.
    #[serde(default)]
    pub model_used: Option<ModelVariant>,
    /// Solve-time best score in percent.
    #[serde(default)]
    pub confidence: Option<f32>,
    /// Solve-time margin in percent.
    #[serde(default)]
    pub margin: Option<f32>,
    /// Whether the solve-time gate passed.
    #[serde(default)]
    pub trusted: bool,
}

impl Attempt {
    /// Partition the attempt belongs to.
    pub fn partition(&self) -> Partition {
        Partition::for_outcome(self.succeeded)
    }

    /// Returns `true` once `correct_answer` is known.
    pub fn is_labeled(&self) -> bool {
        self.correct_answer.is_some()
    }

    /// Applies `update` to an unlabeled attempt; returns `false` if already labeled.
    pub fn apply_label(&mut self, update: &LabelUpdate, now: DateTime<Utc>) -> bool {
        if self.is_labeled() {
            return false;
        }
        self.correct_answer = Some(update.correct_answer);
        self.label_source = Some(update.source);
        self.auto_labeled = update.source.is_automatic();
        self.label_confidence = update.confidence;
        self.labeled_at = Some(now);
        true
    }

    /// Checks data-model invariants.
    pub fn validate(&self) -> StorageResult<()> {
        let invalid = |reason: &str| StorageError::InvalidRecord {
            id: self.id.to_string(),
            reason: reason.to_string(),
        };

        if self.id.partition() != self.partition() {
            return Err(invalid("id prefix does not match outcome"));
        }
        if self.succeeded {
            if self.chosen_index.is_none() {
                return Err(invalid("success without a chosen candidate"));
            }
            if self.correct_answer != self.chosen_index {
                return Err(invalid("success must be labeled with the chosen candidate"));
            }
        }
        if self.label_source.is_some() && !self.is_labeled() {
            return Err(invalid("label source without a label"));
        }
        Ok(())
    }
}

/// Everything needed to append a new attempt.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    /// Question as shown.
    pub question: String,
    /// Candidate images in on-screen order.
    pub candidates: Candidates,
    /// Candidate the solver picked, if any.
    pub chosen_index: Option<CandidateIndex>,
    /// Ground truth from the target application.
    pub succeeded: bool,
    /// Variant whose scores drove the choice.
    pub model_used: Option<ModelVariant>,
    /// Solve-time best score in percent.
    pub confidence: Option<f32>,
    /// Solve-time margin in percent.
    pub margin: Option<f32>,
    /// Whether the solve-time gate passed.
    pub trusted: bool,
}

impl NewAttempt {
    /// Creates an attempt with no solve-time details.
    pub fn new(
        question: impl Into<String>,
        candidates: Candidates,
        chosen_index: Option<CandidateIndex>,
        succeeded: bool,
    ) -> Self {
        Self {
            question: question.into(),
            candidates,
            chosen_index,
            succeeded,
            model_used: None,
            confidence: None,
            margin: None,
            trusted: false,
        }
    }

    /// Attaches solve-time details.
    pub fn with_solve_details(
        mut self,
        model_used: ModelVariant,
        confidence: f32,
        margin: f32,
        trusted: bool,
    ) -> Self {
        self.model_used = Some(model_used);
        self.confidence = Some(confidence);
        self.margin = Some(margin);
        self.trusted = trusted;
        self
    }

    /// Builds the stored metadata; successes are labeled with their chosen candidate.
    pub fn to_attempt(&self, recorded_at: DateTime<Utc>) -> Attempt {
        let partition = Partition::for_outcome(self.succeeded);
        let correct_answer = if self.succeeded { self.chosen_index } else { None };

        Attempt {
            id: AttemptId::generate(partition, recorded_at, &self.candidates),
            question: self.question.clone(),
            chosen_index: self.chosen_index,
            succeeded: self.succeeded,
            correct_answer,
            auto_labeled: false,
            label_source: None,
            label_confidence: None,
            labeled_at: None,
            recorded_at,
            model_used: self.model_used,
            confidence: self.confidence,
            margin: self.margin,
            trusted: self.trusted,
        }
    }
}
