use placement_core::{HomographyError, ScoreError};

use crate::session::{Progress, Side};

/// Errors from building or configuring a session.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("part catalog is empty")]
    EmptyCatalog,
    #[error("part name at index {index} is blank")]
    BlankPartName { index: usize },
    #[error("duplicate part name {0:?}")]
    DuplicatePart(String),
    #[error("physical width must be positive and finite (got {0})")]
    InvalidPhysicalWidth(f64),
}

/// Errors returned by [`crate::CalibrationSession::compute`].
///
/// None of these modify the session; previously committed results stay.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ComputeError {
    #[error("incomplete input: {0}")]
    Incomplete(Progress),
    #[error("{side:?} calibration corners do not form a convex quadrilateral in the clicked order")]
    CalibrationOrder { side: Side },
    #[error("no unique homography for the calibration corners")]
    DegenerateConfiguration(#[source] HomographyError),
    #[error("estimated homography cannot be inverted")]
    SingularMatrix(#[source] HomographyError),
    #[error(transparent)]
    Score(#[from] ScoreError),
}
