use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Point2};
use placement_core::{homography_from_4pt, Degeneracy, HomographyError, Quad};
use placement_session::{
    overlay, CalibrationSession, ClickOutcome, ComputeError, ImageInfo, Mode, PartCatalog,
    SessionConfig, Side,
};

const IMAGE: ImageInfo = ImageInfo {
    width: 200,
    height: 200,
};

fn square() -> [Point2<f64>; 4] {
    [
        Point2::new(0.0, 0.0),
        Point2::new(100.0, 0.0),
        Point2::new(100.0, 100.0),
        Point2::new(0.0, 100.0),
    ]
}

fn click_all(session: &mut CalibrationSession, mode: Mode, side: Side, points: &[Point2<f64>]) {
    session.select_mode(mode);
    for p in points {
        assert!(
            matches!(session.click(side, *p), ClickOutcome::Accepted { .. }),
            "click at {p:?} was ignored"
        );
    }
}

fn session_with(
    parts: &[&str],
    reference_quad: &[Point2<f64>; 4],
    target_quad: &[Point2<f64>; 4],
    ground_truth: &[Point2<f64>],
    placements: &[Point2<f64>],
) -> CalibrationSession {
    let mut s = CalibrationSession::new(PartCatalog::new(parts.iter().copied()).expect("catalog"));
    s.load_image(Side::Reference, IMAGE);
    s.load_image(Side::Target, IMAGE);
    click_all(&mut s, Mode::CalibratingReference, Side::Reference, reference_quad);
    click_all(&mut s, Mode::CalibratingTarget, Side::Target, target_quad);
    click_all(&mut s, Mode::MarkingReferenceParts, Side::Reference, ground_truth);
    click_all(&mut s, Mode::MarkingTargetParts, Side::Target, placements);
    s
}

#[test]
fn identical_calibration_gives_identity() {
    let gt = [Point2::new(50.0, 50.0)];
    let mut s = session_with(&["Nose"], &square(), &square(), &gt, &gt);
    s.compute().expect("compute");

    let h = s.homography().expect("homography");
    assert_abs_diff_eq!(h.h, Matrix3::identity(), epsilon = 1e-9);
    let q = h.apply(Point2::new(50.0, 50.0)).expect("apply");
    assert_abs_diff_eq!(q.x, 50.0, epsilon = 1e-9);
    assert_abs_diff_eq!(q.y, 50.0, epsilon = 1e-9);
}

#[test]
fn translated_calibration_maps_by_offset() {
    let target = square().map(|p| Point2::new(p.x + 10.0, p.y + 5.0));
    let gt = [Point2::new(20.0, 30.0)];
    let placed = [Point2::new(30.0, 35.0)];
    let mut s = session_with(&["Nose"], &square(), &target, &gt, &placed);
    let result = s.compute().expect("compute").clone();
    assert_eq!(result.average_score, 100);

    let h = s.homography().expect("homography");
    for (x, y) in [(0.0, 0.0), (-40.0, 7.5), (123.0, 456.0)] {
        let q = h.apply(Point2::new(x, y)).expect("apply");
        assert_abs_diff_eq!(q.x, x + 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(q.y, y + 5.0, epsilon = 1e-6);
    }
}

#[test]
fn exact_and_diagonal_offsets_score_100_and_0() {
    let gt = [Point2::new(20.0, 30.0), Point2::new(0.0, 0.0)];
    let placed = [Point2::new(20.0, 30.0), Point2::new(100.0, 100.0)];
    let mut s = session_with(&["Nose", "Chin"], &square(), &square(), &gt, &placed);
    let result = s.compute().expect("compute");

    assert_eq!(result.scores[0].part, "Nose");
    assert_eq!(result.scores[0].score, 100);
    assert_abs_diff_eq!(result.scores[0].distance_px, 0.0, epsilon = 1e-9);
    assert_eq!(result.scores[1].score, 0);
    // 200 px wide reference over 100 units.
    assert_abs_diff_eq!(result.scores[1].distance_physical, 70.71, epsilon = 1e-9);
    assert_eq!(result.average_score, 50);
    assert!(result.skipped.is_empty());
}

#[test]
fn collinear_calibration_commits_nothing() {
    let line = [
        Point2::new(0.0, 0.0),
        Point2::new(50.0, 0.0),
        Point2::new(100.0, 0.0),
        Point2::new(150.0, 0.0),
    ];
    let gt = [Point2::new(10.0, 10.0)];
    let mut s = session_with(&["Nose"], &line, &square(), &gt, &gt);

    assert!(matches!(
        s.compute(),
        Err(ComputeError::DegenerateConfiguration(_))
    ));
    assert!(s.homography().is_none());
    assert!(s.inverse_homography().is_none());
    assert!(s.result().is_none());
    assert!(overlay(&s).projected_ground_truth.is_empty());
}

#[test]
fn slanted_collinear_target_is_reported_as_degenerate() {
    let target = [0.0, 1.0, 2.0, 3.0].map(|k| Point2::new(12.5 + 137.1 * k, 7.3 + 50.727 * k));
    let gt = [Point2::new(10.0, 10.0)];
    let mut s = session_with(&["Nose"], &square(), &target, &gt, &gt);

    assert!(matches!(
        s.compute(),
        Err(ComputeError::DegenerateConfiguration(
            HomographyError::DegenerateConfiguration(Degeneracy::Collinear {
                quad: Quad::Target,
                ..
            })
        ))
    ));
    assert!(s.homography().is_none());
    assert!(s.result().is_none());
}

#[test]
fn perspective_placements_on_mapped_ground_truth_score_perfectly() {
    let target = [
        Point2::new(12.0, 8.0),
        Point2::new(180.0, 25.0),
        Point2::new(170.0, 190.0),
        Point2::new(20.0, 160.0),
    ];
    let gt = [
        Point2::new(30.0, 40.0),
        Point2::new(70.0, 40.0),
        Point2::new(50.0, 65.0),
    ];
    let h = homography_from_4pt(&square(), &target).expect("homography");
    let placed: Vec<Point2<f64>> = gt.iter().map(|p| h.apply(*p).expect("apply")).collect();

    let mut s = session_with(&["Left Eye", "Right Eye", "Nose Tip"], &square(), &target, &gt, &placed);
    let result = s.compute().expect("compute");
    for score in &result.scores {
        assert_eq!(score.score, 100, "{}", score.part);
        assert!(score.distance_px < 1e-6);
    }
    assert_eq!(result.average_score, 100);

    let o = overlay(&s);
    assert_eq!(o.projected_ground_truth.len(), 3);
    for (g, p) in o.projected_ground_truth.iter().zip(&placed) {
        assert_abs_diff_eq!(g.position.x, p.x, epsilon = 1e-6);
        assert_abs_diff_eq!(g.position.y, p.y, epsilon = 1e-6);
    }
}

#[test]
fn configured_session_runs_end_to_end() {
    let cfg = SessionConfig::from_json_str(r#"{ "parts": ["Mouth"], "physical_width": 20 }"#)
        .expect("config");
    let mut s = cfg.build_session().expect("session");
    s.load_image(Side::Reference, IMAGE);
    s.load_image(Side::Target, IMAGE);
    click_all(&mut s, Mode::CalibratingReference, Side::Reference, &square());
    click_all(&mut s, Mode::CalibratingTarget, Side::Target, &square());
    click_all(&mut s, Mode::MarkingReferenceParts, Side::Reference, &[Point2::new(50.0, 50.0)]);
    click_all(&mut s, Mode::MarkingTargetParts, Side::Target, &[Point2::new(60.0, 50.0)]);
    assert!(s.is_ready());

    let result = s.compute().expect("compute");
    // 10 px at 0.1 units/px; 10 / 141.42 of the diagonal.
    assert_abs_diff_eq!(result.scores[0].distance_physical, 1.0, epsilon = 1e-9);
    assert_eq!(result.scores[0].score, 93);
}
