#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use divan::bench;
use docorient_core::estimator::Method;
use docorient_core::test_utils::{to_rgb, DocumentScene};
use docorient_core::{Detector, DetectorConfig, Rotation};

fn main() {
    divan::main();
}

#[bench]
fn bench_full_detect_1200x850(bencher: divan::Bencher) {
    let img = DocumentScene::new(1200, 850).render_rotated(Rotation::Deg90);
    let detector = Detector::new();

    bencher.bench_local(|| detector.detect(&img.view()));
}

#[bench]
fn bench_full_detect_sequential(bencher: divan::Bencher) {
    let img = DocumentScene::new(1200, 850).render_rotated(Rotation::Deg90);
    let detector = Detector::with_config(DetectorConfig::builder().parallel(false).build());

    bencher.bench_local(|| detector.detect(&img.view()));
}

#[bench]
fn bench_full_detect_rgb_4k(bencher: divan::Bencher) {
    let img = to_rgb(&DocumentScene::new(3840, 2160).render_rotated(Rotation::Deg180));
    let detector = Detector::new();

    bencher.bench_local(|| detector.detect(&img.view()));
}

#[bench]
fn bench_quick_estimate(bencher: divan::Bencher) {
    let img = DocumentScene::new(1200, 850).render_rotated(Rotation::Deg270);
    let detector = Detector::new();

    bencher.bench_local(|| detector.quick_estimate(&img.view()));
}

#[bench(args = Method::ALL)]
fn bench_single_estimator(bencher: divan::Bencher, method: Method) {
    let img = DocumentScene::new(1024, 724).render();
    let detector = Detector::new();

    bencher.bench_local(|| detector.estimate_method(method, &img.view()));
}
