use crate::linsolve::{solve_linear_system, LinearSolveError};
use nalgebra::{DMatrix, DVector, Matrix3, Point2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Determinant magnitude below which a homography is treated as singular.
pub const DETERMINANT_TOLERANCE: f64 = 1e-12;

/// Projective denominator magnitude below which a mapping is rejected.
pub const PROJECTION_TOLERANCE: f64 = 1e-12;

/// Sine of the corner angle below which three points count as collinear.
///
/// Relative to edge lengths, so it is independent of the pixel scale.
pub const COLLINEARITY_TOLERANCE: f64 = 1e-9;

/// Which of the two quads a degeneracy was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quad {
    Source,
    Target,
}

/// Why four correspondences do not determine a unique homography.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum Degeneracy {
    #[error("{quad:?} corners {corners:?} are collinear or coincide")]
    Collinear { quad: Quad, corners: [usize; 3] },
    #[error(transparent)]
    Solve(#[from] LinearSolveError),
}

/// Errors produced while estimating, inverting or applying a [`Homography`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum HomographyError {
    #[error("degenerate point configuration (collinear or repeated points)")]
    DegenerateConfiguration(#[source] Degeneracy),
    #[error("homography is not invertible (det={det:e})")]
    SingularMatrix { det: f64 },
    #[error("point maps to infinity (w={w:e})")]
    DegenerateProjection { w: f64 },
    #[error("expected 4 correspondences, got {src} source and {dst} target points")]
    PointCount { src: usize, dst: usize },
}

/// Planar projective transform, `dst ~ H * src` in homogeneous coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    /// Build from nine coefficients in row-major order `[h1, ..., h9]`.
    pub fn from_row_major(h: [f64; 9]) -> Self {
        Self::new(Matrix3::from_row_slice(&h))
    }

    /// Coefficients in row-major order, the layout used for display.
    pub fn to_row_major(&self) -> [f64; 9] {
        let h = &self.h;
        [
            h[(0, 0)],
            h[(0, 1)],
            h[(0, 2)],
            h[(1, 0)],
            h[(1, 1)],
            h[(1, 2)],
            h[(2, 0)],
            h[(2, 1)],
            h[(2, 2)],
        ]
    }

    /// Determinant by cofactor expansion along the first row.
    pub fn determinant(&self) -> f64 {
        let [a, b, c, d, e, f, g, h, i] = self.to_row_major();
        a * (e * i - f * h) - b * (d * i - f * g) + c * (d * h - e * g)
    }

    /// Map `p` through the homography.
    ///
    /// Fails with [`HomographyError::DegenerateProjection`] when the
    /// homogeneous denominator vanishes, i.e. `p` lies on the line sent to
    /// infinity.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Result<Point2<f64>, HomographyError> {
        let [h0, h1, h2, h3, h4, h5, h6, h7, h8] = self.to_row_major();
        let w = h6 * p.x + h7 * p.y + h8;
        if w.is_nan() || w.abs() < PROJECTION_TOLERANCE {
            return Err(HomographyError::DegenerateProjection { w });
        }
        Ok(Point2::new(
            (h0 * p.x + h1 * p.y + h2) / w,
            (h3 * p.x + h4 * p.y + h5) / w,
        ))
    }

    /// Closed-form inverse via the adjugate.
    ///
    /// The result is not rescaled, so its bottom-right entry is generally
    /// not 1.
    pub fn inverse(&self) -> Result<Self, HomographyError> {
        let [a, b, c, d, e, f, g, h, i] = self.to_row_major();
        let det = self.determinant();
        if det.is_nan() || det.abs() < DETERMINANT_TOLERANCE {
            return Err(HomographyError::SingularMatrix { det });
        }
        let inv_det = 1.0 / det;
        Ok(Self::from_row_major([
            (e * i - f * h) * inv_det,
            (c * h - b * i) * inv_det,
            (b * f - c * e) * inv_det,
            (f * g - d * i) * inv_det,
            (a * i - c * g) * inv_det,
            (c * d - a * f) * inv_det,
            (d * h - e * g) * inv_det,
            (b * g - a * h) * inv_det,
            (a * e - b * d) * inv_det,
        ]))
    }
}

/// Compute H such that `dst ~ H * src` from exactly four correspondences.
///
/// The scale gauge is fixed by `h9 = 1`, leaving eight unknowns. For each
/// correspondence `(x, y) -> (u, v)`:
///
/// ```text
/// h1 x + h2 y + h3 - u h7 x - u h8 y = u
/// h4 x + h5 y + h6 - v h7 x - v h8 y = v
/// ```
///
/// Corner order must be consistent between `src` and `dst`. Either quad
/// having three collinear or two coincident corners is rejected before the
/// system is solved.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
pub fn homography_from_4pt(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Result<Homography, HomographyError> {
    check_quad(src, Quad::Source)?;
    check_quad(dst, Quad::Target)?;

    let mut a = DMatrix::<f64>::zeros(8, 8);
    let mut b = DVector::<f64>::zeros(8);

    for k in 0..4 {
        let (x, y) = (src[k].x, src[k].y);
        let (u, v) = (dst[k].x, dst[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -x * u;
        a[(r0, 7)] = -y * u;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -x * v;
        a[(r1, 7)] = -y * v;
        b[r1] = v;
    }

    let x = solve_linear_system(&a, &b)
        .map_err(|e| HomographyError::DegenerateConfiguration(e.into()))?;

    Ok(Homography::from_row_major([
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    ]))
}

fn check_quad(pts: &[Point2<f64>; 4], quad: Quad) -> Result<(), HomographyError> {
    const TRIPLES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];
    for corners in TRIPLES {
        let [i, j, k] = corners;
        if nearly_collinear(pts[i], pts[j], pts[k]) {
            return Err(HomographyError::DegenerateConfiguration(
                Degeneracy::Collinear { quad, corners },
            ));
        }
    }
    Ok(())
}

/// Twice the triangle area against the square of its longest edge.
/// Coincident points give a zero area and are reported as collinear.
fn nearly_collinear(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    let (ab, ac, bc) = (b - a, c - a, c - b);
    let cross = ab.x * ac.y - ab.y * ac.x;
    let longest = ab.norm_squared().max(ac.norm_squared()).max(bc.norm_squared());
    cross.is_nan() || cross.abs() <= COLLINEARITY_TOLERANCE * longest
}

/// Slice front-end for [`homography_from_4pt`].
pub fn estimate_homography(
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
) -> Result<Homography, HomographyError> {
    let count_err = HomographyError::PointCount {
        src: src.len(),
        dst: dst.len(),
    };
    let src: &[Point2<f64>; 4] = src.try_into().map_err(|_| count_err)?;
    let dst: &[Point2<f64>; 4] = dst.try_into().map_err(|_| count_err)?;
    homography_from_4pt(src, dst)
}

/// `true` if the four points, taken in order, bound a strictly convex
/// quadrilateral. Self-intersecting ("bow-tie") orderings and quads with
/// a corner that is straight up to [`COLLINEARITY_TOLERANCE`] are rejected.
pub fn is_convex_quad(pts: &[Point2<f64>; 4]) -> bool {
    let mut sign = 0.0_f64;
    for k in 0..4 {
        let p0 = pts[k];
        let p1 = pts[(k + 1) % 4];
        let p2 = pts[(k + 2) % 4];
        let e0 = p1 - p0;
        let e1 = p2 - p1;
        let cross = e0.x * e1.y - e0.y * e1.x;
        if cross.is_nan() || cross.abs() <= COLLINEARITY_TOLERANCE * e0.norm() * e1.norm() {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn square(side: f64) -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(side, 0.0),
            Point2::new(side, side),
            Point2::new(0.0, side),
        ]
    }

    fn perspective() -> Homography {
        Homography::from_row_major([
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ])
    }

    #[test]
    fn identity_correspondence_gives_identity() {
        let pts = square(100.0);
        let h = homography_from_4pt(&pts, &pts).expect("estimate");
        assert_abs_diff_eq!(h.h, Matrix3::identity(), epsilon = 1e-9);

        let p = h.apply(Point2::new(50.0, 50.0)).expect("apply");
        assert_close(p, Point2::new(50.0, 50.0), 1e-9);
    }

    #[test]
    fn translation_is_recovered() {
        let src = square(100.0);
        let dst = src.map(|p| Point2::new(p.x + 10.0, p.y + 5.0));
        let h = homography_from_4pt(&src, &dst).expect("estimate");

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(37.5, -12.0),
            Point2::new(250.0, 400.0),
        ] {
            let q = h.apply(p).expect("apply");
            assert_close(q, Point2::new(p.x + 10.0, p.y + 5.0), 1e-8);
        }
    }

    #[test]
    fn fit_reproduces_training_points() {
        let gt = perspective();
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(180.0, 0.0),
            Point2::new(180.0, 130.0),
            Point2::new(0.0, 130.0),
        ];
        let dst = src.map(|p| gt.apply(p).expect("apply"));
        let h = homography_from_4pt(&src, &dst).expect("estimate");

        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(h.apply(*s).expect("apply"), *d, 1e-6);
        }
        for p in [Point2::new(60.0, 40.0), Point2::new(150.0, 120.0)] {
            let expected = gt.apply(p).expect("apply");
            assert_close(h.apply(p).expect("apply"), expected, 1e-5);
        }
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(30.0, 0.0),
        ];
        let err = homography_from_4pt(&src, &square(30.0)).unwrap_err();
        assert_eq!(
            err,
            HomographyError::DegenerateConfiguration(Degeneracy::Collinear {
                quad: Quad::Source,
                corners: [1, 2, 3],
            })
        );
    }

    #[test]
    fn slanted_collinear_target_is_degenerate() {
        // Rounding leaves the DLT pivots above tolerance for this line.
        let origin = Point2::new(12.5, 7.3);
        let step = nalgebra::Vector2::new(137.1, 50.727);
        let dst = [0.0, 1.0, 2.0, 3.0].map(|k| origin + step * k);

        let err = homography_from_4pt(&square(100.0), &dst).unwrap_err();
        assert!(matches!(
            err,
            HomographyError::DegenerateConfiguration(Degeneracy::Collinear {
                quad: Quad::Target,
                ..
            })
        ));
    }

    #[test]
    fn repeated_point_is_degenerate() {
        let mut src = square(1.0);
        src[3] = src[1];
        let err = homography_from_4pt(&src, &square(1.0)).unwrap_err();
        assert!(matches!(
            err,
            HomographyError::DegenerateConfiguration(Degeneracy::Collinear {
                quad: Quad::Source,
                ..
            })
        ));
    }

    #[test]
    fn large_pixel_quads_are_not_flagged() {
        let src = square(4000.0);
        let dst = [
            Point2::new(310.0, 220.0),
            Point2::new(3900.0, 150.0),
            Point2::new(3700.0, 2950.0),
            Point2::new(420.0, 3100.0),
        ];
        assert!(homography_from_4pt(&src, &dst).is_ok());
    }

    #[test]
    fn double_inverse_restores_matrix() {
        let h = perspective();
        let back = h.inverse().and_then(|inv| inv.inverse()).expect("invertible");
        assert_abs_diff_eq!(back.h, h.h, epsilon = 1e-9);
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::from_row_major([
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ]);
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(50.0, -20.0),
            Point2::new(320.0, 200.0),
        ] {
            let q = h.apply(p).expect("forward");
            let back = inv.apply(q).expect("backward");
            assert_close(back, p, 1e-9);
        }
    }

    #[test]
    fn inverse_is_not_renormalized() {
        let h = Homography::from_row_major([2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]);
        let inv = h.inverse().expect("invertible");
        assert_abs_diff_eq!(inv.h[(0, 0)], 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(inv.h[(2, 2)], 1.0, epsilon = 1e-15);

        let scaled = Homography::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 4.0]);
        let inv = scaled.inverse().expect("invertible");
        assert_abs_diff_eq!(inv.h[(2, 2)], 0.25, epsilon = 1e-15);
    }

    #[test]
    fn singular_matrix_fails_to_invert() {
        let h = Homography::from_row_major([1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            h.inverse(),
            Err(HomographyError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn point_on_horizon_is_rejected() {
        // w = 0.01 x - 1 vanishes at x = 100
        let h = Homography::from_row_major([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.01, 0.0, -1.0]);
        assert!(matches!(
            h.apply(Point2::new(100.0, 7.0)),
            Err(HomographyError::DegenerateProjection { .. })
        ));
        assert!(h.apply(Point2::new(50.0, 7.0)).is_ok());
    }

    #[test]
    fn slice_front_end_checks_counts() {
        let pts = square(10.0);
        assert_eq!(
            estimate_homography(&pts[..3], &pts),
            Err(HomographyError::PointCount { src: 3, dst: 4 })
        );
        assert!(estimate_homography(&pts, &pts).is_ok());
    }

    #[test]
    fn convexity_check() {
        assert!(is_convex_quad(&square(10.0)));

        let mut ccw = square(10.0);
        ccw.reverse();
        assert!(is_convex_quad(&ccw));

        let bow_tie = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_convex_quad(&bow_tie));

        let dart = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_convex_quad(&dart));

        // Straight corner at (10, 0) up to rounding.
        let flat_corner = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 1e-13),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_convex_quad(&flat_corner));
    }

    #[test]
    fn serializes_as_plain_numbers() {
        let json = serde_json::to_string(&Homography::identity()).expect("serialize");
        let back: Homography = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Homography::identity());
    }
}
