//! Geometry and scoring core for comparing landmark placements across two
//! views of a planar target.
//!
//! This crate is purely numeric: it knows nothing about images, clicks or
//! sessions. All functions are pure and return new values.
//!
//! - [`solve_linear_system`]: Gauss-Jordan elimination with partial pivoting.
//! - [`homography_from_4pt`]: four-point DLT with `h9 = 1`.
//! - [`Homography::inverse`], [`Homography::apply`]: closed-form inverse and
//!   projective point mapping.
//! - [`ScoringEngine`]: pixel offsets to physical distances and 0..=100 scores.
//!
//! ```
//! use nalgebra::Point2;
//! use placement_core::homography_from_4pt;
//!
//! let src = [
//!     Point2::new(0.0, 0.0),
//!     Point2::new(100.0, 0.0),
//!     Point2::new(100.0, 100.0),
//!     Point2::new(0.0, 100.0),
//! ];
//! let dst = src.map(|p| Point2::new(p.x + 10.0, p.y + 5.0));
//!
//! let h = homography_from_4pt(&src, &dst)?;
//! let q = h.apply(Point2::new(50.0, 50.0))?;
//! assert!((q.x - 60.0).abs() < 1e-9 && (q.y - 55.0).abs() < 1e-9);
//! # Ok::<(), placement_core::HomographyError>(())
//! ```

mod homography;
mod linsolve;
mod logger;
mod scoring;

pub use homography::{
    estimate_homography, homography_from_4pt, is_convex_quad, Degeneracy, Homography,
    HomographyError, Quad, COLLINEARITY_TOLERANCE, DETERMINANT_TOLERANCE, PROJECTION_TOLERANCE,
};
pub use linsolve::{solve_linear_system, LinearSolveError, PIVOT_TOLERANCE};
pub use scoring::{
    score_from_normalized_error, PartScore, PhysicalScale, ScoreError, ScoringEngine,
    SessionResult, SkippedPart, MIN_FACE_DIAGONAL_PX,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
