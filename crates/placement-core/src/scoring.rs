//! Placement scoring.
//!
//! A placement's pixel error is normalized by the diagonal between the first
//! and third reference calibration corners, which makes the score
//! independent of the reference image resolution. Physical distances use a
//! linear pixel-to-unit scale derived from the reference image width.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Face diagonals shorter than this (in pixels) cannot serve as a scale reference.
pub const MIN_FACE_DIAGONAL_PX: f64 = 1e-12;

/// Errors produced by [`ScoringEngine`] and [`PhysicalScale`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("part arrays differ in length (names={names}, reference={reference}, mapped={mapped})")]
    LengthMismatch {
        names: usize,
        reference: usize,
        mapped: usize,
    },
    #[error("no parts to score")]
    NoParts,
    #[error("calibration corners 1 and 3 coincide (diagonal={diagonal_px:e} px)")]
    DegenerateScaleReference { diagonal_px: f64 },
    #[error("physical width must be positive and finite (got {0})")]
    InvalidPhysicalWidth(f64),
    #[error("reference image width must be positive")]
    InvalidImageWidth,
}

/// Physical units per reference-image pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PhysicalScale {
    reference_width_px: u32,
    physical_width: f64,
}

impl PhysicalScale {
    /// `physical_width` is the real-world width covered by the full
    /// reference image, in any unit (centimeters by default in the UI).
    pub fn from_reference_width(
        reference_width_px: u32,
        physical_width: f64,
    ) -> Result<Self, ScoreError> {
        if reference_width_px == 0 {
            return Err(ScoreError::InvalidImageWidth);
        }
        if !physical_width.is_finite() || physical_width <= 0.0 {
            return Err(ScoreError::InvalidPhysicalWidth(physical_width));
        }
        Ok(Self {
            reference_width_px,
            physical_width,
        })
    }

    pub fn reference_width_px(&self) -> u32 {
        self.reference_width_px
    }

    pub fn physical_width(&self) -> f64 {
        self.physical_width
    }

    #[inline]
    pub fn units_per_px(&self) -> f64 {
        self.physical_width / self.reference_width_px as f64
    }
}

/// Score for one named part.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartScore {
    pub part: String,
    /// Distance between the mapped placement and the ground truth, reference pixels.
    pub distance_px: f64,
    /// `distance_px` in physical units, rounded to 2 decimals.
    pub distance_physical: f64,
    /// 0..=100
    pub score: u8,
}

/// A part left out of scoring because its placement could not be mapped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedPart {
    pub part: String,
    pub reason: String,
}

/// Output of a scoring run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub scores: Vec<PartScore>,
    /// Rounded mean of `scores[..].score`.
    pub average_score: u8,
    #[serde(default)]
    pub skipped: Vec<SkippedPart>,
}

/// Turns mapped-vs-ground-truth offsets into scores.
#[derive(Clone, Copy, Debug)]
pub struct ScoringEngine {
    scale: PhysicalScale,
}

impl ScoringEngine {
    pub fn new(scale: PhysicalScale) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> PhysicalScale {
        self.scale
    }

    /// Score index-aligned placements.
    ///
    /// `reference` holds ground-truth positions and `mapped` the target
    /// placements already mapped into reference pixels. `calibration_ref`
    /// are the reference-image calibration corners; corners 0 and 2 define
    /// the normalizing diagonal.
    pub fn score(
        &self,
        parts: &[String],
        reference: &[Point2<f64>],
        mapped: &[Point2<f64>],
        calibration_ref: &[Point2<f64>; 4],
    ) -> Result<SessionResult, ScoreError> {
        if parts.len() != reference.len() || parts.len() != mapped.len() {
            return Err(ScoreError::LengthMismatch {
                names: parts.len(),
                reference: reference.len(),
                mapped: mapped.len(),
            });
        }
        if parts.is_empty() {
            return Err(ScoreError::NoParts);
        }

        let diagonal_px = nalgebra::distance(&calibration_ref[0], &calibration_ref[2]);
        if diagonal_px.is_nan() || diagonal_px < MIN_FACE_DIAGONAL_PX {
            return Err(ScoreError::DegenerateScaleReference { diagonal_px });
        }

        let units_per_px = self.scale.units_per_px();
        let scores: Vec<PartScore> = parts
            .iter()
            .zip(reference.iter().zip(mapped.iter()))
            .map(|(name, (gt, placed))| {
                let distance_px = nalgebra::distance(gt, placed);
                let score = score_from_normalized_error(distance_px / diagonal_px);
                log::trace!("{name}: {distance_px:.2} px -> {score}");
                PartScore {
                    part: name.clone(),
                    distance_px,
                    distance_physical: round_to_hundredths(distance_px * units_per_px),
                    score,
                }
            })
            .collect();

        let average_score = average_score(&scores);
        Ok(SessionResult {
            scores,
            average_score,
            skipped: Vec::new(),
        })
    }
}

/// `round(max(0, 1 - normalized) * 100)`.
///
/// Errors larger than the face diagonal clamp to 0, never negative. `NaN`
/// input also yields 0 since `f64::max` discards it.
pub fn score_from_normalized_error(normalized: f64) -> u8 {
    ((1.0 - normalized) * 100.0).max(0.0).round().min(100.0) as u8
}

fn average_score(scores: &[PartScore]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u32 = scores.iter().map(|s| u32::from(s.score)).sum();
    (f64::from(sum) / scores.len() as f64).round() as u8
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
