//! Interactive session for scoring part placements against a reference.
//!
//! A [`CalibrationSession`] collects four calibration corners and one point
//! per catalog part on each of two images, then computes a reference to
//! target homography and per-part scores with `placement-core`.
//!
//! Flow:
//! - pick a [`Mode`] and [`click`](CalibrationSession::click) points on the
//!   matching [`Side`],
//! - call [`compute`](CalibrationSession::compute) once [`Progress`] is complete,
//! - draw [`overlay`] output on top of both images.
//!
//! Session settings can be loaded from JSON with [`SessionConfig`].

mod catalog;
mod config;
mod error;
mod overlay;
mod session;

pub use catalog::{PartCatalog, DEFAULT_PARTS};
pub use config::{ConfigError, SessionConfig};
pub use error::{ComputeError, SessionError};
pub use overlay::{overlay, LabeledPoint, Overlay, SideOverlay};
pub use session::{
    CalibrationSession, ClickOutcome, IgnoreReason, ImageInfo, Mode, PointSet, Progress, Side,
    CALIBRATION_POINTS, DEFAULT_PHYSICAL_WIDTH,
};

pub use placement_core::{PartScore, SessionResult, SkippedPart};
