//! End-to-end behaviour of the segmentation and output stages on synthetic
//! studio shots.

mod common;

use common::{alpha_at, backdrop, disc, rect, reference_dish, rgb_at, BACKDROP, SHADOW, SUBJECT};
use dish_cutout::{
    cutout_from_image, segmentation::Segmenter, CutoutConfig, SegmentationConfig,
};
use image::DynamicImage;

fn segmenter() -> Segmenter {
    Segmenter::new(&SegmentationConfig::default())
}

#[test]
fn test_border_connected_backdrop_is_removed() {
    let mut image = backdrop(80, 80);
    rect(&mut image, 20, 20, 40, 40, SUBJECT);

    let outcome = segmenter().run(&image).unwrap();

    for (x, y, pixel) in outcome.image.enumerate_pixels() {
        let inside = (20..60).contains(&x) && (20..60).contains(&y);
        if !inside {
            assert_eq!(pixel[3], 0, "backdrop pixel ({}, {}) kept", x, y);
        }
    }
    // well inside the patch, beyond the feather ramp
    for y in 23..57 {
        for x in 23..57 {
            assert_eq!(alpha_at(&outcome.image, x, y), 255);
        }
    }
    assert_eq!(outcome.report.flood_filled_pixels, 80 * 80 - 40 * 40);
}

#[test]
fn test_enclosed_backdrop_coloured_patch_survives() {
    let mut image = backdrop(100, 100);
    rect(&mut image, 30, 30, 40, 40, SUBJECT);
    // a dark sauce spot that looks exactly like the backdrop
    rect(&mut image, 46, 46, 8, 8, BACKDROP);

    let outcome = segmenter().run(&image).unwrap();

    for y in 46..54 {
        for x in 46..54 {
            assert_eq!(alpha_at(&outcome.image, x, y), 255, "enclosed pixel ({}, {}) removed", x, y);
            assert_eq!(rgb_at(&outcome.image, x, y), [112, 112, 112]);
        }
    }
    assert_eq!(outcome.report.foreground_pixels, 40 * 40);
}

#[test]
fn test_pipeline_only_changes_alpha() {
    let mut image = backdrop(90, 70);
    disc(&mut image, 45, 35, 18, SUBJECT);
    disc(&mut image, 10, 10, 3, SUBJECT);

    let first = segmenter().run(&image).unwrap();
    let second = segmenter().run(&first.image).unwrap();

    for ((src, a), b) in image.pixels().zip(first.image.pixels()).zip(second.image.pixels()) {
        assert_eq!(src.0[..3], a.0[..3]);
        assert_eq!(a.0[..3], b.0[..3]);
    }
    // input alpha is ignored, so the second pass decides the same alpha
    assert_eq!(first.mask, second.mask);
}

#[test]
fn test_only_largest_blob_survives() {
    let mut image = backdrop(120, 60);
    rect(&mut image, 10, 10, 30, 30, SUBJECT);
    rect(&mut image, 80, 20, 10, 10, SUBJECT);

    let outcome = segmenter().run(&image).unwrap();

    assert_eq!(outcome.report.components.components_found, 2);
    assert_eq!(outcome.report.components.kept_pixels, 900);
    assert_eq!(outcome.report.components.discarded_pixels, 100);
    for y in 20..30 {
        for x in 80..90 {
            assert_eq!(alpha_at(&outcome.image, x, y), 0);
        }
    }
    assert_eq!(alpha_at(&outcome.image, 25, 25), 255);
}

#[test]
fn test_feather_is_monotonic_from_backdrop_inwards() {
    let config = SegmentationConfig {
        feather_radius: 4,
        ..SegmentationConfig::default()
    };
    let mut image = backdrop(80, 80);
    rect(&mut image, 20, 20, 40, 40, SUBJECT);

    let outcome = Segmenter::new(&config).run(&image).unwrap();

    let row: Vec<u8> = (0..40).map(|x| alpha_at(&outcome.image, x, 40)).collect();
    assert!(row.windows(2).all(|w| w[0] <= w[1]), "alpha ramp not monotonic: {:?}", row);
    assert_eq!(&row[19..24], &[0, 64, 128, 191, 255]);
    assert!(row[24..].iter().all(|&a| a == 255));
}

#[test]
fn test_shadow_halo_is_trimmed() {
    let mut image = backdrop(120, 120);
    disc(&mut image, 60, 60, 34, SHADOW);
    disc(&mut image, 60, 60, 26, SUBJECT);

    let outcome = segmenter().run(&image).unwrap();

    assert!(outcome.report.shadow.pixels_removed > 0);
    assert!(outcome.report.shadow.passes_run >= 1);
    // outermost halo pixel goes, the dish itself stays
    assert_eq!(alpha_at(&outcome.image, 60 + 34, 60), 0);
    assert_eq!(alpha_at(&outcome.image, 60, 60), 255);
    assert_eq!(rgb_at(&outcome.image, 60, 60), [240, 200, 60]);
}

#[test]
fn test_reference_shot_produces_canonical_cutout() {
    let source = reference_dish();
    let result =
        cutout_from_image(&DynamicImage::ImageRgba8(source.clone()), &CutoutConfig::default())
            .unwrap();
    let output = &result.image;

    assert_eq!(output.dimensions(), (512, 512));
    assert_eq!(result.original_dimensions, (1024, 768));
    assert!(!result.is_degenerate());

    // scaled by 0.5: 512x384 content centred vertically, circle radius 150 at (256, 256)
    for (x, y, pixel) in output.enumerate_pixels() {
        let dx = f64::from(x) + 0.5 - 256.0;
        let dy = f64::from(y) + 0.5 - 256.0;
        if (dx * dx + dy * dy).sqrt() > 160.0 {
            assert_eq!(pixel[3], 0, "pixel ({}, {}) outside the dish is visible", x, y);
        }
    }
    for y in 0..64 {
        assert_eq!(alpha_at(output, 256, y), 0);
        assert_eq!(alpha_at(output, 256, 511 - y), 0);
    }

    for &(x, y) in &[(256, 256), (200, 256), (256, 180), (300, 320)] {
        assert_eq!(alpha_at(output, x, y), 255);
        let rgb = rgb_at(output, x, y);
        for (channel, expected) in rgb.iter().zip([240u8, 200, 60]) {
            assert!(channel.abs_diff(expected) <= 1, "colour drifted at ({}, {}): {:?}", x, y, rgb);
        }
    }

    // the encoded PNG decodes to the same canvas
    let decoded = image::load_from_memory(result.png_bytes()).unwrap().to_rgba8();
    assert_eq!(&decoded, output);
}

#[test]
fn test_all_backdrop_gives_transparent_canvas() {
    let image = backdrop(200, 150);
    let result =
        cutout_from_image(&DynamicImage::ImageRgba8(image), &CutoutConfig::default()).unwrap();

    assert!(result.is_degenerate());
    assert_eq!(result.dimensions(), (512, 512));
    assert!(result.image.pixels().all(|p| p[3] == 0));
    assert_eq!(result.mask.statistics().transparent_ratio, 1.0);
}

#[test]
fn test_feathered_edge_keeps_subject_colour_after_resize() {
    let result = cutout_from_image(
        &DynamicImage::ImageRgba8(reference_dish()),
        &CutoutConfig::default(),
    )
    .unwrap();

    let edge: Vec<[u8; 4]> = result
        .image
        .pixels()
        .map(|p| p.0)
        .filter(|p| p[3] > 0 && p[3] < 255)
        .collect();
    assert!(!edge.is_empty());
    for pixel in &edge {
        assert!(pixel[2] <= 80, "backdrop grey leaked into the edge: {:?}", pixel);
        assert!(pixel[0].abs_diff(240) <= 2, "edge red drifted: {:?}", pixel);
    }
}
