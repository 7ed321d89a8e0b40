//! Calibration and marking session.
//!
//! The session owns the four point collections (calibration corners and
//! part placements, for the reference and target image) and the results
//! derived from them. It changes only through named actions; every action
//! that touches a point set drops the derived results, and
//! [`CalibrationSession::compute`] replaces them in a single assignment.

use std::fmt;

use nalgebra::Point2;
use placement_core::{
    homography_from_4pt, is_convex_quad, Homography, PhysicalScale, ScoringEngine, SessionResult,
    SkippedPart,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::catalog::PartCatalog;
use crate::error::{ComputeError, SessionError};

/// Calibration corners required on each image.
pub const CALIBRATION_POINTS: usize = 4;

/// Physical width of the reference image used when none is configured.
pub const DEFAULT_PHYSICAL_WIDTH: f64 = 100.0;

/// Which of the two images an action refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The complete reference picture; ground truth lives here.
    Reference,
    /// The photograph of the physical re-creation.
    Target,
}

/// The two point collections kept per side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointSet {
    Calibration,
    Parts,
}

/// Collection mode. Any mode may be selected from any other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Idle,
    CalibratingReference,
    CalibratingTarget,
    MarkingReferenceParts,
    MarkingTargetParts,
}

impl Mode {
    /// The side and point set clicks are collected into, `None` when idle.
    pub fn collects(self) -> Option<(Side, PointSet)> {
        match self {
            Mode::Idle => None,
            Mode::CalibratingReference => Some((Side::Reference, PointSet::Calibration)),
            Mode::CalibratingTarget => Some((Side::Target, PointSet::Calibration)),
            Mode::MarkingReferenceParts => Some((Side::Reference, PointSet::Parts)),
            Mode::MarkingTargetParts => Some((Side::Target, PointSet::Parts)),
        }
    }
}

/// Native pixel size of a loaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Why a click did not add a point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// The current mode does not collect points on this side.
    ModeMismatch,
    /// No image has been loaded on this side yet.
    NoImage,
    /// The point set already holds its required number of points.
    AtCapacity,
    /// The coordinates are not finite.
    InvalidPoint,
}

/// Result of [`CalibrationSession::click`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickOutcome {
    Accepted { set: PointSet, index: usize },
    Ignored(IgnoreReason),
}

/// Point counts against their capacities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub reference_calibration: usize,
    pub target_calibration: usize,
    pub reference_parts: usize,
    pub target_parts: usize,
    pub parts_required: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.reference_calibration == CALIBRATION_POINTS
            && self.target_calibration == CALIBRATION_POINTS
            && self.reference_parts == self.parts_required
            && self.target_parts == self.parts_required
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "calibration reference {}/{CALIBRATION_POINTS}, target {}/{CALIBRATION_POINTS}; \
             parts reference {}/{}, target {}/{}",
            self.reference_calibration,
            self.target_calibration,
            self.reference_parts,
            self.parts_required,
            self.target_parts,
            self.parts_required,
        )
    }
}

#[derive(Clone, Debug, Default)]
struct SideState {
    image: Option<ImageInfo>,
    calibration: Vec<Point2<f64>>,
    parts: Vec<Point2<f64>>,
}

impl SideState {
    fn points(&self, set: PointSet) -> &[Point2<f64>] {
        match set {
            PointSet::Calibration => &self.calibration,
            PointSet::Parts => &self.parts,
        }
    }

    fn points_mut(&mut self, set: PointSet) -> &mut Vec<Point2<f64>> {
        match set {
            PointSet::Calibration => &mut self.calibration,
            PointSet::Parts => &mut self.parts,
        }
    }

    fn calibration_quad(&self) -> Option<[Point2<f64>; 4]> {
        <[Point2<f64>; 4]>::try_from(self.calibration.as_slice()).ok()
    }

    fn clear_points(&mut self) {
        self.calibration.clear();
        self.parts.clear();
    }
}

/// Everything a successful compute produces, committed as one value.
#[derive(Clone, Debug)]
struct Derived {
    forward: Homography,
    inverse: Homography,
    result: SessionResult,
}

/// Interactive calibration and marking session for one image pair.
#[derive(Clone, Debug)]
pub struct CalibrationSession {
    catalog: PartCatalog,
    physical_width: f64,
    validate_calibration_order: bool,
    mode: Mode,
    reference: SideState,
    target: SideState,
    derived: Option<Derived>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new(PartCatalog::default())
    }
}

impl CalibrationSession {
    pub fn new(catalog: PartCatalog) -> Self {
        Self {
            catalog,
            physical_width: DEFAULT_PHYSICAL_WIDTH,
            validate_calibration_order: false,
            mode: Mode::Idle,
            reference: SideState::default(),
            target: SideState::default(),
            derived: None,
        }
    }

    /// Require both calibration quads to be convex in click order before
    /// computing.
    pub fn with_calibration_order_check(mut self, enabled: bool) -> Self {
        self.validate_calibration_order = enabled;
        self
    }

    pub fn with_physical_width(mut self, width: f64) -> Result<Self, SessionError> {
        self.set_physical_width(width)?;
        Ok(self)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn catalog(&self) -> &PartCatalog {
        &self.catalog
    }

    pub fn physical_width(&self) -> f64 {
        self.physical_width
    }

    pub fn validates_calibration_order(&self) -> bool {
        self.validate_calibration_order
    }

    pub fn image(&self, side: Side) -> Option<ImageInfo> {
        self.side(side).image
    }

    pub fn calibration_points(&self, side: Side) -> &[Point2<f64>] {
        self.side(side).points(PointSet::Calibration)
    }

    pub fn part_placements(&self, side: Side) -> &[Point2<f64>] {
        self.side(side).points(PointSet::Parts)
    }

    /// Committed reference-to-target homography, if any.
    pub fn homography(&self) -> Option<&Homography> {
        self.derived.as_ref().map(|d| &d.forward)
    }

    /// Committed target-to-reference homography, if any.
    pub fn inverse_homography(&self) -> Option<&Homography> {
        self.derived.as_ref().map(|d| &d.inverse)
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.derived.as_ref().map(|d| &d.result)
    }

    pub fn progress(&self) -> Progress {
        Progress {
            reference_calibration: self.reference.calibration.len(),
            target_calibration: self.target.calibration.len(),
            reference_parts: self.reference.parts.len(),
            target_parts: self.target.parts.len(),
            parts_required: self.catalog.len(),
        }
    }

    /// `true` when [`Self::compute`] would get past its input check.
    pub fn is_ready(&self) -> bool {
        self.reference.image.is_some() && self.progress().is_complete()
    }

    /// Name of the next part to mark on `side`, `None` once all are placed.
    pub fn next_part(&self, side: Side) -> Option<&str> {
        self.catalog.get(self.side(side).parts.len())
    }

    pub fn select_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            log::debug!("mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    /// Register a newly loaded image on `side`.
    ///
    /// Replacing an image discards that side's calibration corners and part
    /// placements together with any computed results.
    pub fn load_image(&mut self, side: Side, image: ImageInfo) {
        let state = self.side_mut(side);
        let replaced = state.image.replace(image).is_some();
        state.clear_points();
        self.invalidate();
        log::debug!(
            "{side:?} image {}x{} {}",
            image.width,
            image.height,
            if replaced { "replaced" } else { "loaded" }
        );
    }

    /// Add a point on `side` if the current mode collects there and the
    /// set has room. Ignored clicks leave the session untouched.
    pub fn click(&mut self, side: Side, point: Point2<f64>) -> ClickOutcome {
        let outcome = self.try_push(side, point);
        match outcome {
            ClickOutcome::Accepted { set, index } => {
                self.invalidate();
                log::debug!(
                    "{side:?} {set:?} #{index} at ({:.1}, {:.1})",
                    point.x,
                    point.y
                );
            }
            ClickOutcome::Ignored(reason) => {
                log::trace!("{side:?} click ignored in {:?}: {reason:?}", self.mode);
            }
        }
        outcome
    }

    fn try_push(&mut self, side: Side, point: Point2<f64>) -> ClickOutcome {
        let set = match self.mode.collects() {
            Some((mode_side, set)) if mode_side == side => set,
            _ => return ClickOutcome::Ignored(IgnoreReason::ModeMismatch),
        };
        if !(point.x.is_finite() && point.y.is_finite()) {
            return ClickOutcome::Ignored(IgnoreReason::InvalidPoint);
        }

        let capacity = self.capacity(set);
        let state = self.side_mut(side);
        if state.image.is_none() {
            return ClickOutcome::Ignored(IgnoreReason::NoImage);
        }
        let points = state.points_mut(set);
        if points.len() >= capacity {
            return ClickOutcome::Ignored(IgnoreReason::AtCapacity);
        }
        points.push(point);
        ClickOutcome::Accepted {
            set,
            index: points.len() - 1,
        }
    }

    /// Remove the most recent point from the set the current mode collects
    /// into on `side`.
    pub fn undo_last(&mut self, side: Side) -> Option<Point2<f64>> {
        let (mode_side, set) = self.mode.collects()?;
        if mode_side != side {
            return None;
        }
        let removed = self.side_mut(side).points_mut(set).pop()?;
        self.invalidate();
        log::debug!("{side:?} {set:?} undo");
        Some(removed)
    }

    /// Set the real-world width covered by the reference image.
    pub fn set_physical_width(&mut self, width: f64) -> Result<(), SessionError> {
        if !width.is_finite() || width <= 0.0 {
            return Err(SessionError::InvalidPhysicalWidth(width));
        }
        if width != self.physical_width {
            self.physical_width = width;
            self.invalidate();
        }
        Ok(())
    }

    /// Clear all four point sets and the computed results, back to idle.
    /// Loaded images are kept.
    pub fn reset(&mut self) {
        self.reference.clear_points();
        self.target.clear_points();
        self.derived = None;
        self.mode = Mode::Idle;
        log::debug!("session reset");
    }

    /// Estimate the homography, map target placements into reference
    /// pixels and score them.
    ///
    /// Allowed in any mode. Nothing is committed unless estimation,
    /// inversion and scoring all succeed; on error the session is exactly
    /// as it was. Parts whose placement cannot be mapped are reported in
    /// [`SessionResult::skipped`] instead of failing the whole run.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self), fields(parts = self.catalog.len()))
    )]
    pub fn compute(&mut self) -> Result<&SessionResult, ComputeError> {
        let derived = match self.evaluate() {
            Ok(derived) => derived,
            Err(err) => {
                log::warn!("compute failed: {err}");
                return Err(err);
            }
        };

        log::info!(
            "scored {} parts, average {}/100 ({} skipped)",
            derived.result.scores.len(),
            derived.result.average_score,
            derived.result.skipped.len()
        );
        let derived = self.derived.insert(derived);
        Ok(&derived.result)
    }

    fn evaluate(&self) -> Result<Derived, ComputeError> {
        let progress = self.progress();
        let (reference_quad, target_quad, image) = match (
            self.reference.calibration_quad(),
            self.target.calibration_quad(),
            self.reference.image,
        ) {
            (Some(r), Some(t), Some(image)) if progress.is_complete() => (r, t, image),
            _ => return Err(ComputeError::Incomplete(progress)),
        };

        if self.validate_calibration_order {
            for (side, quad) in [(Side::Reference, &reference_quad), (Side::Target, &target_quad)] {
                if !is_convex_quad(quad) {
                    return Err(ComputeError::CalibrationOrder { side });
                }
            }
        }

        let forward = homography_from_4pt(&reference_quad, &target_quad)
            .map_err(ComputeError::DegenerateConfiguration)?;
        let inverse = forward.inverse().map_err(ComputeError::SingularMatrix)?;
        let scale = PhysicalScale::from_reference_width(image.width, self.physical_width)?;

        let n = self.catalog.len();
        let mut names = Vec::with_capacity(n);
        let mut ground_truth = Vec::with_capacity(n);
        let mut mapped = Vec::with_capacity(n);
        let mut skipped = Vec::new();

        let placements = self.reference.parts.iter().zip(&self.target.parts);
        for (name, (gt, placed)) in self.catalog.iter().zip(placements) {
            match inverse.apply(*placed) {
                Ok(p) => {
                    names.push(name.to_string());
                    ground_truth.push(*gt);
                    mapped.push(p);
                }
                Err(err) => {
                    log::warn!("{name}: placement skipped: {err}");
                    skipped.push(SkippedPart {
                        part: name.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut result =
            ScoringEngine::new(scale).score(&names, &ground_truth, &mapped, &reference_quad)?;
        result.skipped = skipped;

        Ok(Derived {
            forward,
            inverse,
            result,
        })
    }

    fn capacity(&self, set: PointSet) -> usize {
        match set {
            PointSet::Calibration => CALIBRATION_POINTS,
            PointSet::Parts => self.catalog.len(),
        }
    }

    fn side(&self, side: Side) -> &SideState {
        match side {
            Side::Reference => &self.reference,
            Side::Target => &self.target,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Reference => &mut self.reference,
            Side::Target => &mut self.target,
        }
    }

    fn invalidate(&mut self) {
        if self.derived.take().is_some() {
            log::debug!("computed results invalidated");
        }
    }
}
