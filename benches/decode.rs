use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_barcode::decoder::code128::modules_for_values;
use rust_barcode::decoder::{ReaderRegistry, modules_to_pattern};
use rust_barcode::synth::{Placement, Symbology, render};
use rust_barcode::{Detector, Frame, detect};

fn bench_decoder_set(c: &mut Criterion) {
    let registry = ReaderRegistry::with_defaults();
    let set = registry
        .resolve(&["ean_reader", "code_39_reader", "code_128_reader"])
        .expect("built-in readers");
    let modules = Symbology::Code128.encode("Hello, World").expect("encodable");
    let pattern = modules_to_pattern(&modules, 3, 10);
    c.bench_function("decoder_set_code128_last", |b| {
        b.iter(|| set.decode(black_box(&pattern)))
    });

    let reversed = pattern.reversed();
    c.bench_function("decoder_set_code128_reversed", |b| {
        b.iter(|| set.decode(black_box(&reversed)))
    });
}

fn bench_code128_set_c(c: &mut Criterion) {
    let registry = ReaderRegistry::with_defaults();
    let set = registry.resolve(&["code_128_reader"]).expect("built-in reader");
    // start C, 12 34 56 78, check, stop
    let modules = modules_for_values(&[105, 12, 34, 56, 78, 47]).expect("codebook values");
    let pattern = modules_to_pattern(&modules, 2, 10);
    c.bench_function("code128_set_c", |b| b.iter(|| set.decode(black_box(&pattern))));
}

fn bench_detect_frame(c: &mut Criterion) {
    let detector = Detector::new();
    let frame = render(Symbology::Code128, "123456", &Placement::centered(640, 480, 4))
        .expect("encodable");
    c.bench_function("detect_code128_640x480", |b| {
        b.iter(|| detector.detect(black_box(&frame)))
    });

    let blank = Frame::gray(640, 480, vec![128u8; 640 * 480]);
    c.bench_function("detect_blank_640x480", |b| {
        b.iter(|| detector.detect(black_box(&blank)))
    });
}

fn bench_detect_rgb(c: &mut Criterion) {
    let image = vec![128u8; 1280 * 720 * 3];
    c.bench_function("detect_1280x720_rgb", |b| {
        b.iter(|| detect(black_box(&image), black_box(1280), black_box(720)))
    });
}

criterion_group!(
    benches,
    bench_decoder_set,
    bench_code128_set_c,
    bench_detect_frame,
    bench_detect_rgb
);
criterion_main!(benches);
