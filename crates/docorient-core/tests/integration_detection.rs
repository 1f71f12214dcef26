//! End-to-end detection on synthetic documents.
#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use docorient_core::estimator::{AbstainReason, Method};
use docorient_core::test_utils::{blank, text_page, DocumentScene};
use docorient_core::{
    apply_rotation, detect_orientation, quick_estimate, Detector, DetectorConfig, ImageView, Rotation,
};

#[test]
fn test_detects_all_four_rotations() {
    let scene = DocumentScene::new(600, 425);
    let detector = Detector::new();
    for rotation in Rotation::ALL {
        let img = scene.render_rotated(rotation);
        let result = detector.detect(&img.view());
        assert_eq!(result.angle, rotation, "{result:#?}");
        assert!(result.confidence > 0.0);
        assert!(result.winning_method.is_some());
        assert_eq!(result.per_method_details.len(), Method::ALL.len());
    }
}

#[test]
fn test_tilted_card_upside_down() {
    for tilt in [-2.0, 2.0] {
        let img = DocumentScene::new(1200, 850)
            .with_card(1000.0, 650.0)
            .with_tilt(tilt)
            .render_rotated(Rotation::Deg180);

        let result = detect_orientation(&img.view());
        assert_eq!(result.angle, Rotation::Deg180, "tilt {tilt}: {result:#?}");

        let contour = result.per_method_details[&Method::BoundaryContour];
        assert_eq!(contour.angle, Rotation::Deg180);
        assert!(contour.confidence > 60.0, "tilt {tilt}: {contour:?}");
        assert_eq!(quick_estimate(&img.view()), Rotation::Deg180);
    }
}

#[test]
fn test_uniform_images_have_no_opinion() {
    let detector = Detector::new();
    for gray in [0, 128, 255] {
        let img = blank(50, 50, gray);
        let result = detector.detect(&img.view());

        assert_eq!(result.angle, Rotation::Deg0, "gray {gray}");
        assert_eq!(result.confidence, 0.0, "gray {gray}");
        assert_eq!(result.winning_method, None);
        assert_eq!(result.per_angle_votes.total(), 0.0);
        for (method, detail) in &result.per_method_details {
            assert_eq!(detail.confidence, 0.0, "{method} at gray {gray}");
            assert_eq!(detail.angle, Rotation::Deg0, "{method} at gray {gray}");
            assert!(detail.abstain_reason().is_some(), "{method} at gray {gray}");
        }
    }
}

#[test]
fn test_tiny_image_abstains_everywhere() {
    let img = blank(8, 40, 200);
    let result = Detector::new().detect(&img.view());
    assert_eq!(result.confidence, 0.0);
    assert!(result
        .per_method_details
        .values()
        .all(|r| r.abstain_reason() == Some(AbstainReason::TooSmall)));
}

#[test]
fn test_text_bars_turned_quarter() {
    let page = text_page(240, 180, 6);
    let img = apply_rotation(&page.view(), Rotation::Deg90);
    let detector = Detector::new();

    let text = detector.estimate_method(Method::TextLines, &img.view());
    assert_eq!(text.angle, Rotation::Deg90, "{text:?}");
    assert!(text.confidence > 90.0);

    let result = detector.detect(&img.view());
    assert_eq!(result.per_method_details[&Method::TextLines], text);
}

#[test]
fn test_quick_estimate_falls_back_to_upright() {
    // Narrow stripes: no outline and no frame-filling page.
    let (w, h) = (64, 64);
    let data: Vec<u8> = (0..w * h)
        .map(|i| if (i % w) / 4 % 2 == 0 { 0 } else { 255 })
        .collect();
    let img = ImageView::gray(&data, w, h).unwrap();
    let detector = Detector::new();
    assert_eq!(
        detector.estimate_method(Method::BoundaryContour, &img).abstain_reason(),
        Some(AbstainReason::NoContour)
    );
    assert_eq!(detector.quick_estimate(&img), Rotation::Deg0);
}

#[test]
fn test_scan_cropped_to_page() {
    let scene = DocumentScene::new(600, 380)
        .with_card(600.0, 380.0)
        .with_border(0.0, 0);
    let detector = Detector::new();
    for rotation in Rotation::ALL {
        let img = scene.render_rotated(rotation);
        assert_eq!(detector.quick_estimate(&img.view()), rotation);
        let result = detector.detect(&img.view());
        assert_eq!(result.angle, rotation, "{result:#?}");
        assert!(result.per_method_details[&Method::BoundaryContour].confidence > 0.0);
    }
}

#[test]
fn test_borderless_text_page_quick_estimate() {
    let page = text_page(240, 180, 6);
    let img = apply_rotation(&page.view(), Rotation::Deg270);
    // The white page fills the frame and stands in for the outline.
    assert_eq!(Detector::new().quick_estimate(&img.view()), Rotation::Deg270);
}

#[test]
fn test_edge_to_edge_text_bars() {
    let (w, h) = (240, 180);
    let mut data = vec![255u8; w * h];
    for i in 0..6 {
        let top = 20 + 25 * i;
        data[top * w..(top + 8) * w].fill(0);
    }
    let page = ImageView::gray(&data, w, h).unwrap();
    let img = apply_rotation(&page, Rotation::Deg90);

    let text = Detector::new().estimate_method(Method::TextLines, &img.view());
    assert_eq!(text.angle, Rotation::Deg90, "{text:?}");
    assert!(text.confidence > 0.0);
}

#[test]
fn test_pipeline_stats() {
    let img = DocumentScene::new(1200, 850).render_rotated(Rotation::Deg90);
    let (result, stats) = Detector::new().detect_with_stats(&img.view());

    assert_eq!(result.angle, Rotation::Deg90);
    assert_eq!(stats.decimation, 2);
    assert!(stats.active_estimators >= 1 && stats.active_estimators <= 4);
    assert!(stats.total_ms >= stats.preprocess_ms);
    assert!(stats.total_ms >= stats.combine_ms);
    assert!(stats.boundary_contour_ms >= 0.0);
}

#[test]
fn test_decimation_can_be_disabled() {
    let img = DocumentScene::new(1200, 850).render_rotated(Rotation::Deg270);
    let config = DetectorConfig::builder().max_dimension(0).build();
    let (result, stats) = Detector::with_config(config).detect_with_stats(&img.view());
    assert_eq!(stats.decimation, 1);
    assert_eq!(result.angle, Rotation::Deg270);
}

#[test]
fn test_single_method_weights() {
    let scene = DocumentScene::new(600, 425).render_rotated(Rotation::Deg180);
    let weights = docorient_core::MethodWeights {
        edge_lines: 0.0,
        boundary_contour: 1.0,
        gradient_direction: 0.0,
        text_lines: 0.0,
    };
    let config = DetectorConfig::builder().weights(weights).build();
    let result = Detector::with_config(config).detect(&scene.view());

    assert_eq!(result.angle, Rotation::Deg180);
    assert_eq!(result.winning_method, Some(Method::BoundaryContour));
    assert_eq!(result.confidence, 100.0);
}
