//! Display data derived from a session.
//!
//! The renderer calls [`overlay`] whenever it needs to redraw; nothing here
//! is cached or pushed.

use nalgebra::Point2;
use serde::Serialize;

use crate::session::{CalibrationSession, Mode, Side};

/// A point with the text drawn next to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabeledPoint {
    pub label: String,
    pub position: Point2<f64>,
}

/// Markers for one image, in that image's pixel space.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SideOverlay {
    /// Calibration corners labeled `"1"` to `"4"` in click order.
    pub calibration: Vec<LabeledPoint>,
    /// Part placements labeled with their part names.
    pub parts: Vec<LabeledPoint>,
}

/// Everything the UI draws on top of the two images.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Overlay {
    pub mode: Mode,
    pub reference: SideOverlay,
    pub target: SideOverlay,
    /// Reference ground-truth parts projected onto the target image,
    /// labeled `"G:<part>"`. Empty until a homography is committed.
    pub projected_ground_truth: Vec<LabeledPoint>,
}

/// Project the current session state into drawable markers.
pub fn overlay(session: &CalibrationSession) -> Overlay {
    let projected_ground_truth = match session.homography() {
        Some(h) => session
            .catalog()
            .iter()
            .zip(session.part_placements(Side::Reference))
            .filter_map(|(name, p)| {
                h.apply(*p).ok().map(|position| LabeledPoint {
                    label: format!("G:{name}"),
                    position,
                })
            })
            .collect(),
        None => Vec::new(),
    };

    Overlay {
        mode: session.mode(),
        reference: side_overlay(session, Side::Reference),
        target: side_overlay(session, Side::Target),
        projected_ground_truth,
    }
}

fn side_overlay(session: &CalibrationSession, side: Side) -> SideOverlay {
    let calibration = session
        .calibration_points(side)
        .iter()
        .enumerate()
        .map(|(i, p)| LabeledPoint {
            label: (i + 1).to_string(),
            position: *p,
        })
        .collect();
    let parts = session
        .catalog()
        .iter()
        .zip(session.part_placements(side))
        .map(|(name, p)| LabeledPoint {
            label: name.to_string(),
            position: *p,
        })
        .collect();
    SideOverlay { calibration, parts }
}
