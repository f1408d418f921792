//! End-to-end locate-and-decode on synthetic frames
//!
//! Each frame is rendered from known text, so the decoded code, format and
//! reading direction are checked exactly.

use rust_barcode::config::{LocatorConfig, ScannerConfig};
use rust_barcode::detector::locate;
use rust_barcode::models::{Direction, Point};
use rust_barcode::preprocess::prepare;
use rust_barcode::synth::{Placement, Symbology, render};
use rust_barcode::{Pipeline, ScanFailure, decode_single};

fn config(readers: &[&str]) -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.decoder.readers = readers.iter().map(|r| r.to_string()).collect();
    config
}

#[test]
fn test_code128_horizontal() {
    let frame = render(Symbology::Code128, "123456", &Placement::centered(640, 480, 4)).unwrap();
    let result = decode_single(&config(&["code_128_reader"]), &frame).unwrap();

    let code = result.code_result.as_ref().expect("no code decoded");
    assert_eq!(code.code, "123456");
    assert_eq!(code.format, "code_128");
    assert_eq!(code.direction, Direction::Forward);
    assert!(code.checksum_valid);
    assert!(result.failure.is_none());
    assert!(result.bbox.is_some());
    assert!(result.line.is_some());
    assert!(!result.boxes.is_empty());
}

#[test]
fn test_code128_rotated() {
    let placement = Placement::centered(640, 480, 4).rotated_degrees(20.0);
    let frame = render(Symbology::Code128, "123456", &placement).unwrap();
    let result = decode_single(&config(&["code_128_reader"]), &frame).unwrap();
    assert_eq!(result.code(), Some("123456"));

    let angle = result.angle.expect("decoded result carries its box angle");
    // axial angle: 20 deg and 200 deg describe the same bars
    let diff = (angle.to_degrees() - 20.0).rem_euclid(180.0);
    assert!(diff < 8.0 || diff > 172.0, "angle {}", angle.to_degrees());
}

#[test]
fn test_upside_down_reads_reverse() {
    let placement = Placement::centered(640, 480, 4).rotated_degrees(180.0);
    let frame = render(Symbology::Code128, "123456", &placement).unwrap();
    let result = decode_single(&config(&["code_128_reader"]), &frame).unwrap();

    let code = result.code_result.as_ref().expect("no code decoded");
    assert_eq!(code.code, "123456");
    assert_eq!(code.direction, Direction::Reverse);
}

#[test]
fn test_ean13_off_center() {
    let placement = Placement::centered(640, 480, 4).at(Point::new(300.0, 160.0));
    let frame = render(Symbology::Ean13, "590123412345", &placement.with_bar_height(140.0)).unwrap();
    let result = decode_single(&config(&["ean_reader"]), &frame).unwrap();
    assert_eq!(result.code(), Some("5901234123457"));
    assert_eq!(result.code_result.unwrap().format, "ean_13");
}

#[test]
fn test_reader_order_picks_matching_symbology() {
    let frame = render(Symbology::Code39, "CODE-39", &Placement::centered(800, 480, 4)).unwrap();
    let result = decode_single(
        &config(&["code_128_reader", "ean_reader", "code_39_reader"]),
        &frame,
    )
    .unwrap();
    assert_eq!(result.code(), Some("CODE-39"));
    assert_eq!(result.code_result.unwrap().format, "code_39");
}

#[test]
fn test_disabled_reader_does_not_decode() {
    let frame = render(Symbology::Ean8, "9638507", &Placement::centered(640, 480, 4)).unwrap();
    let result = decode_single(&config(&["code_128_reader"]), &frame).unwrap();
    assert!(result.code_result.is_none());
    assert!(matches!(result.failure, Some(ScanFailure::Decode(_))));
    assert!(!result.boxes.is_empty());
}

#[test]
fn test_pipeline_reuse_across_frames() {
    let pipeline = Pipeline::from_config(&config(&["upc_reader", "code_128_reader"])).unwrap();
    let upc = render(Symbology::UpcA, "03600029145", &Placement::centered(640, 480, 4)).unwrap();
    let c128 = render(Symbology::Code128, "Hello", &Placement::centered(640, 480, 4)).unwrap();

    let first = pipeline.process(0, &upc);
    let second = pipeline.process(1, &c128);
    assert_eq!(first.code(), Some("036000291452"));
    assert_eq!(second.code(), Some("Hello"));
    assert_eq!(second.frame_id, 1);
}

#[test]
fn test_default_half_sample_decodes_retail_codes() {
    let cases = [
        (Symbology::Ean13, "590123412345", "5901234123457", "ean_reader"),
        (Symbology::UpcA, "03600029145", "036000291452", "upc_reader"),
        (Symbology::Ean8, "9638507", "96385074", "ean_8_reader"),
    ];
    for (width, height, unit) in [(640, 480, 3), (640, 480, 4), (480, 320, 4), (800, 600, 4)] {
        for (symbology, text, expected, reader) in cases {
            let config = config(&[reader]);
            assert!(config.locator.half_sample);
            let frame = render(symbology, text, &Placement::centered(width, height, unit)).unwrap();
            let result = decode_single(&config, &frame).unwrap();
            assert_eq!(
                result.code(),
                Some(expected),
                "{:?} at {}x{} unit {}: {:?}",
                symbology,
                width,
                height,
                unit,
                result.failure
            );
        }
    }
}

#[test]
fn test_one_box_per_symbol() {
    let locator = LocatorConfig::default();
    for (width, height, unit) in [(480, 320, 4), (640, 480, 3), (640, 480, 4), (800, 600, 4)] {
        for (symbology, text) in [(Symbology::Code128, "123456"), (Symbology::Ean13, "590123412345")] {
            let frame = render(symbology, text, &Placement::centered(width, height, unit)).unwrap();
            let raster = prepare(&frame, locator.half_sample).unwrap();
            let boxes: Vec<_> = locate(&raster, &locator)
                .iter()
                .map(|b| b.scaled(raster.scale()))
                .collect();
            assert_eq!(boxes.len(), 1, "{:?} at {}x{} unit {}: {:?}", symbology, width, height, unit, boxes);

            let modules: u32 = symbology.encode(text).unwrap().iter().map(|&m| m as u32).sum();
            let symbol_length = (modules * unit) as f32;
            assert!(
                boxes[0].length() > 0.75 * symbol_length,
                "{:?} at {}x{}: box {} for symbol {}",
                symbology,
                width,
                height,
                boxes[0].length(),
                symbol_length
            );
        }
    }
}

#[test]
fn test_code39_mod43_reports_its_format() {
    let frame = render(Symbology::Code39Mod43, "SHELF4", &Placement::centered(800, 480, 4)).unwrap();
    let result = decode_single(&config(&["code_39_mod43_reader"]), &frame).unwrap();
    let code = result.code_result.expect("no code decoded");
    assert_eq!(code.code, "SHELF4");
    assert_eq!(code.format, "code_39_mod43");
    assert!(code.checksum_valid);
}
