//! Run a synthetic session and print the result as JSON.
//!
//! Usage: `score_session [config.json]`. Without a config the default six
//! face parts and a physical width of 100 are used.

use placement_scorer::{overlay, ImageInfo, Mode, Point2, SessionConfig, Side};

#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
#[cfg(not(feature = "tracing"))]
use placement_scorer::init_with_level;
#[cfg(feature = "tracing")]
use placement_scorer::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    init_with_level(LevelFilter::Info)?;

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::load_json(path)?,
        None => SessionConfig::default(),
    };
    let mut session = config.build_session()?;

    session.load_image(Side::Reference, ImageInfo { width: 400, height: 500 });
    session.load_image(Side::Target, ImageInfo { width: 1200, height: 900 });

    // Same face corners photographed at an angle.
    let reference_corners = [
        Point2::new(50.0, 60.0),
        Point2::new(350.0, 60.0),
        Point2::new(350.0, 440.0),
        Point2::new(50.0, 440.0),
    ];
    let target_corners = [
        Point2::new(210.0, 140.0),
        Point2::new(930.0, 110.0),
        Point2::new(980.0, 820.0),
        Point2::new(170.0, 760.0),
    ];

    session.select_mode(Mode::CalibratingReference);
    for p in reference_corners {
        session.click(Side::Reference, p);
    }
    session.select_mode(Mode::CalibratingTarget);
    for p in target_corners {
        session.click(Side::Target, p);
    }

    let truth = placement_scorer::homography_from_4pt(&reference_corners, &target_corners)?;
    let n = session.catalog().len();
    session.select_mode(Mode::MarkingReferenceParts);
    for i in 0..n {
        let t = (i as f64 + 0.5) / n as f64;
        session.click(Side::Reference, Point2::new(80.0 + 240.0 * t, 120.0 + 280.0 * t));
    }

    // Each placement lands a little further off its true spot.
    let ground_truth = session.part_placements(Side::Reference).to_vec();
    session.select_mode(Mode::MarkingTargetParts);
    for (i, gt) in ground_truth.iter().enumerate() {
        let exact = truth.apply(*gt)?;
        let drift = 6.0 * i as f64;
        session.click(Side::Target, Point2::new(exact.x + drift, exact.y - drift / 2.0));
    }
    log::info!("progress: {}", session.progress());

    let result = session.compute()?;
    println!("{}", serde_json::to_string_pretty(result)?);

    let drawn = overlay(&session);
    println!(
        "overlay: {} projected ground-truth markers",
        drawn.projected_ground_truth.len()
    );
    Ok(())
}
