//! Challenge input types shared by every stage of the pipeline.
//!
//! A challenge is a question plus exactly [`NUM_CANDIDATES`] opaque images. Candidate
//! identity is the 1-based [`CandidateIndex`]; it never changes between solving, storing
//! and training.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CandidateCountError, NUM_CANDIDATES, validate_candidate_count};

/// One candidate image as raw encoded bytes (PNG/JPEG).
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateImage(Vec<u8>);

impl CandidateImage {
    /// Wraps encoded image bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the image and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the byte length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no bytes are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CandidateImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CandidateImage({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for CandidateImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Ordered candidate set (always exactly [`NUM_CANDIDATES`] images).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates(Vec<CandidateImage>);

impl Candidates {
    /// Builds a candidate set, rejecting the wrong number of images.
    pub fn new(images: Vec<CandidateImage>) -> Result<Self, CandidateCountError> {
        validate_candidate_count(images.len())?;
        Ok(Self(images))
    }

    /// Builds a candidate set from raw byte buffers.
    pub fn from_bytes<I, B>(images: I) -> Result<Self, CandidateCountError>
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self::new(images.into_iter().map(CandidateImage::new).collect())
    }

    /// Returns the image at a 1-based index.
    pub fn get(&self, index: CandidateIndex) -> &CandidateImage {
        &self.0[index.zero_based()]
    }

    /// Iterates `(index, image)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (CandidateIndex, &CandidateImage)> {
        CandidateIndex::all().zip(self.0.iter())
    }

    /// Returns the images as a slice (0-based order).
    pub fn as_slice(&self) -> &[CandidateImage] {
        &self.0
    }

    /// Returns the number of candidates (always [`NUM_CANDIDATES`]).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 1-based candidate index in `1..=NUM_CANDIDATES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CandidateIndex(u8);

impl CandidateIndex {
    /// Creates an index, returning `None` outside `1..=NUM_CANDIDATES`.
    pub fn new(one_based: u8) -> Option<Self> {
        if (1..=NUM_CANDIDATES as u8).contains(&one_based) {
            Some(Self(one_based))
        } else {
            None
        }
    }

    /// Creates an index from a 0-based position.
    pub fn from_zero_based(position: usize) -> Option<Self> {
        u8::try_from(position + 1).ok().and_then(Self::new)
    }

    /// Returns the 1-based value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Returns the 0-based position.
    pub fn zero_based(self) -> usize {
        usize::from(self.0) - 1
    }

    /// Iterates every valid index in order.
    pub fn all() -> impl Iterator<Item = CandidateIndex> {
        (1..=NUM_CANDIDATES as u8).map(CandidateIndex)
    }
}

impl fmt::Display for CandidateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for CandidateIndex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!("candidate index {value} outside 1..={NUM_CANDIDATES}")
        })
    }
}

impl From<CandidateIndex> for u8 {
    fn from(index: CandidateIndex) -> Self {
        index.0
    }
}

/// A rendered challenge as handed over by the driver.
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Target concept, e.g. `"Cherry"`.
    pub question: String,
    /// Candidate images in on-screen order.
    pub candidates: Candidates,
}

impl Challenge {
    /// Creates a challenge.
    pub fn new(question: impl Into<String>, candidates: Candidates) -> Self {
        Self {
            question: question.into(),
            candidates,
        }
    }
}
