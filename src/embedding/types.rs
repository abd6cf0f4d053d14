use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::challenge::CandidateIndex;
use crate::constants::{CandidateCountError, validate_candidate_count};

/// Per-candidate match probabilities (fractions summing to ~1), in candidate order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScores(Vec<f32>);

impl CandidateScores {
    /// Wraps one fraction per candidate.
    pub fn new(scores: Vec<f32>) -> Result<Self, CandidateCountError> {
        validate_candidate_count(scores.len())?;
        Ok(Self(scores))
    }

    /// Returns the score of one candidate.
    pub fn get(&self, index: CandidateIndex) -> f32 {
        self.0[index.zero_based()]
    }

    /// Returns the raw fractions.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Returns the scores scaled to percentages.
    pub fn percentages(&self) -> Vec<f32> {
        self.0.iter().map(|s| s * 100.0).collect()
    }

    /// Returns the sum of all fractions (≈ 1 for a well-formed result).
    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Returns `(index, fraction)` pairs sorted by score descending; ties keep candidate order.
    pub fn ranked(&self) -> Vec<(CandidateIndex, f32)> {
        let mut ranked: Vec<(CandidateIndex, f32)> = CandidateIndex::all()
            .zip(self.0.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
    }

    /// Returns the highest-scoring candidate.
    pub fn best(&self) -> (CandidateIndex, f32) {
        self.ranked()[0]
    }
}
