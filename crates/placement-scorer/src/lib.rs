//! High-level facade for the `placement-*` workspace.
//!
//! Compare where parts were placed on a photographed re-creation of a flat
//! picture against where they sit in the reference picture. Four
//! corresponding calibration corners on each image fix a homography; target
//! placements are mapped back into reference pixels and scored by their
//! offset relative to the face diagonal.
//!
//! ## Quickstart
//!
//! ```
//! use placement_scorer::{CalibrationSession, ImageInfo, Mode, PartCatalog, Point2, Side};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = CalibrationSession::new(PartCatalog::new(["Nose Tip"])?);
//! let image = ImageInfo { width: 200, height: 200 };
//! session.load_image(Side::Reference, image);
//! session.load_image(Side::Target, image);
//!
//! let corners = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)];
//! for (mode, side) in [
//!     (Mode::CalibratingReference, Side::Reference),
//!     (Mode::CalibratingTarget, Side::Target),
//! ] {
//!     session.select_mode(mode);
//!     for (x, y) in corners {
//!         session.click(side, Point2::new(x, y));
//!     }
//! }
//! session.select_mode(Mode::MarkingReferenceParts);
//! session.click(Side::Reference, Point2::new(50.0, 50.0));
//! session.select_mode(Mode::MarkingTargetParts);
//! session.click(Side::Target, Point2::new(50.0, 50.0));
//!
//! let result = session.compute()?;
//! assert_eq!(result.average_score, 100);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `placement_scorer::core`: linear solver, homography estimation and
//!   inversion, point mapping, scoring.
//! - `placement_scorer::session`: the calibration session state machine,
//!   part catalogs, JSON configuration and overlay data.

pub use placement_core as core;
pub use placement_session as session;

pub use nalgebra::Point2;

pub use placement_core::{
    homography_from_4pt, init_with_level, Homography, HomographyError, PartScore, SessionResult,
    SkippedPart,
};
pub use placement_session::{
    overlay, CalibrationSession, ClickOutcome, ComputeError, ImageInfo, Mode, Overlay,
    PartCatalog, SessionConfig, Side,
};

#[cfg(feature = "tracing")]
pub use placement_core::init_tracing;
