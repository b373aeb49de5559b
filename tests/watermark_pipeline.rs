//! End-to-end test of the public API: template → spec → composite → export
//! → decode.
//!
//! Uses only the built-in font so results do not depend on installed fonts.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
use photomark::imaging::{
    Anchor, Compositor, ExportFormat, FontChain, ImagingError, Placement, Quality, WatermarkSpec,
    load_image, render_preview, resize_to_fit, resolve_position, save_image, watermark_file,
};
use photomark::template::WatermarkTemplate;
use std::path::Path;
use tempfile::TempDir;

fn compositor() -> Compositor {
    Compositor::new(FontChain::builtin_only())
}

fn solid_rgb(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

fn write_png(path: &Path, image: &DynamicImage) {
    save_image(image, path, ExportFormat::Png, Quality::default()).unwrap();
}

#[test]
fn preset_grid_matches_reference_numbers() {
    let cases = [
        (Anchor::TopLeft, (10, 10)),
        (Anchor::TopCenter, (400, 10)),
        (Anchor::MidCenter, (400, 375)),
        (Anchor::BottomRight, (790, 720)),
    ];
    for (anchor, expected) in cases {
        let origin = resolve_position((1000, 800), (200, 50), Placement::preset(anchor), 10);
        assert_eq!(origin, expected, "{anchor}");
    }
}

#[test]
fn template_to_png_export_round_trip() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("photo.png");
    let output = tmp.path().join("photo_marked.png");
    let photo = solid_rgb(320, 240, [0, 0, 0]);
    write_png(&source, &photo);

    let template = WatermarkTemplate::from_json(
        r#"{"text": "PHOTOMARK", "opacity": 100, "color": [255, 255, 255],
            "position_mode": "top-left"}"#,
    )
    .unwrap();
    let spec = template.to_spec_for_image((320, 240));

    let exported = watermark_file(
        &compositor(),
        &source,
        &output,
        &spec,
        ExportFormat::Png,
        Quality::default(),
    )
    .unwrap();
    assert_eq!((exported.width, exported.height), (320, 240));

    let written = load_image(&output).unwrap().to_rgba8();
    let layout = compositor().layout((320, 240), &spec);
    let (x, y, w, h) = layout.ink_rect();

    // Ink starts right at the top-left margin and is pure white
    assert_eq!((x, y), (10, 10));
    let white = written
        .enumerate_pixels()
        .filter(|(_, _, p)| **p == Rgba([255, 255, 255, 255]))
        .count();
    assert!(white > 0);

    // Nothing outside the ink rectangle changed
    for (px, py, p) in written.enumerate_pixels() {
        let inside = (px as i32) >= x
            && (px as i32) < x + w as i32
            && (py as i32) >= y
            && (py as i32) < y + h as i32;
        if !inside {
            assert_eq!(*p, Rgba([0, 0, 0, 255]), "pixel {px},{py} changed");
        }
    }
}

#[test]
fn jpeg_export_flattens_translucent_pixels_onto_white() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("translucent.jpg");

    // Fully transparent canvas with a half-transparent black watermark
    let canvas = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 0])));
    let rendered = compositor().apply(
        &canvas,
        &WatermarkSpec::new("#")
            .with_color([0, 0, 0, 128])
            .with_placement(Placement::manual(0, 0)),
    );
    save_image(
        &DynamicImage::ImageRgba8(rendered),
        &output,
        ExportFormat::Jpeg,
        Quality::new(100),
    )
    .unwrap();

    let decoded = load_image(&output).unwrap();
    assert!(!decoded.color().has_alpha());
    let rgb = decoded.to_rgb8();
    // Untouched transparent area becomes white
    let corner = rgb.get_pixel(60, 60).0;
    assert!(corner.iter().all(|&c| c >= 250), "corner {corner:?}");
    // Half-alpha black becomes mid grey: 255 * (1 - 128/255) = 127
    let darkest = rgb.pixels().map(|p| p.0[0]).min().unwrap();
    assert!((darkest as i32 - 127).abs() <= 12, "darkest {darkest}");
}

#[test]
fn preview_is_downscaled_export() {
    let photo = solid_rgb(1600, 1200, [40, 80, 120]);
    let spec = WatermarkSpec::new("Preview").with_placement(Placement::relative(0.5, 0.5));
    let c = compositor();

    let preview = render_preview(&c, &photo, &spec, (800, 600));
    assert_eq!(preview.dimensions(), (800, 600));

    let export = DynamicImage::ImageRgba8(c.apply(&photo, &spec));
    assert_eq!(preview, resize_to_fit(&export, (800, 600)));
}

#[test]
fn small_image_is_never_upscaled() {
    let photo = solid_rgb(100, 80, [1, 2, 3]);
    assert_eq!(resize_to_fit(&photo, (800, 600)).dimensions(), (100, 80));
}

#[test]
fn repeated_renders_are_byte_identical() {
    let photo = solid_rgb(300, 200, [200, 100, 50]);
    let spec = WatermarkSpec::new("Same every time")
        .with_color([0, 0, 255, 90])
        .with_placement(Placement::preset(Anchor::BottomCenter));
    let c = compositor();
    let first = c.apply(&photo, &spec);
    for _ in 0..3 {
        assert_eq!(c.apply(&photo, &spec).as_raw(), first.as_raw());
    }
}

#[test]
fn corrupt_source_reports_error_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("broken.jpg");
    let output = tmp.path().join("out.jpg");
    std::fs::write(&source, b"\xFF\xD8\xFF garbage").unwrap();

    let result = watermark_file(
        &compositor(),
        &source,
        &output,
        &WatermarkSpec::new("x"),
        ExportFormat::Jpeg,
        Quality::default(),
    );
    assert!(matches!(result, Err(ImagingError::Decode { .. })));
    assert!(!output.exists());
}

#[test]
fn cjk_text_still_renders_with_builtin_font() {
    let photo = solid_rgb(200, 100, [0, 0, 0]);
    let spec = WatermarkSpec::new("水印")
        .with_color([255, 255, 255, 255])
        .with_placement(Placement::preset(Anchor::MidCenter));
    let out = compositor().apply(&photo, &spec);
    assert!(out.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
}
