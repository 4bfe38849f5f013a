//! Rotation and cropping combined with the centroid pipeline

use std::f64::consts::PI;

use image::{GrayImage, Luma};
use spotlab::image_proc::{
    crop_around_center, find_centroid, largest_rotated_rect, rotate_image, CentroidConfig,
};
use spotlab::AnalysisError;
use test_helpers::{disc_image, output_path};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_quarter_turn_moves_centroid() {
    init_logging();
    let img = disc_image(101, 81, 70.0, 40.0, 6.0, 0, 255);
    let rotated = rotate_image(&img, 90.0).unwrap();
    assert_eq!(rotated.dimensions(), (81, 101));

    // Counter-clockwise: (x, y) -> (y, W - 1 - x)
    let c = find_centroid(&rotated, &CentroidConfig::default()).unwrap();
    assert!((c.x - 40.0).abs() < 1e-6, "x = {}", c.x);
    assert!((c.y - 30.0).abs() < 1e-6, "y = {}", c.y);
}

#[test]
fn test_arbitrary_rotation_moves_centroid() {
    init_logging();
    let (w, h) = (101u32, 81u32);
    let img = disc_image(w, h, 70.0, 40.0, 8.0, 0, 255);
    let rotated = rotate_image(&img, 30.0).unwrap();
    rotated.save(output_path("rotated_disc_30deg.png")).unwrap();

    let theta = 30f64.to_radians();
    let (rw, rh) = rotated.dimensions();
    let out_cx = (rw as f64 - 1.0) / 2.0;
    let out_cy = (rh as f64 - 1.0) / 2.0;
    let dx = 70.0 - (w as f64 - 1.0) / 2.0;
    let dy = 40.0 - (h as f64 - 1.0) / 2.0;
    let expected_x = out_cx + dx * theta.cos() + dy * theta.sin();
    let expected_y = out_cy - dx * theta.sin() + dy * theta.cos();

    let c = find_centroid(&rotated, &CentroidConfig::default()).unwrap();
    assert!(
        (c.x - expected_x).abs() < 1.5 && (c.y - expected_y).abs() < 1.5,
        "centroid ({:.2}, {:.2}) expected ({expected_x:.2}, {expected_y:.2})",
        c.x,
        c.y
    );
}

#[test]
fn test_full_turn_in_quarter_steps() {
    init_logging();
    let img = GrayImage::from_fn(13, 7, |x, y| Luma([(x * 17 + y * 3) as u8]));
    let mut current = img.clone();
    for step in 1..=4 {
        current = rotate_image(&current, 90.0).unwrap();
        if step % 2 == 1 {
            assert_eq!(current.dimensions(), (7, 13));
        }
    }
    assert_eq!(current, img);
    assert_eq!(rotate_image(&img, 0.0).unwrap(), img);
}

#[test]
fn test_crop_keeps_spot_relative_to_centre() {
    init_logging();
    let img = disc_image(200, 150, 110.0, 80.0, 7.0, 0, 255);
    let cropped = crop_around_center(&img, 80, 60).unwrap();
    assert_eq!(cropped.dimensions(), (80, 60));

    // Offset is ((200 - 80) / 2, (150 - 60) / 2) = (60, 45)
    let c = find_centroid(&cropped, &CentroidConfig::default()).unwrap();
    assert!((c.x - 50.0).abs() < 1e-6);
    assert!((c.y - 35.0).abs() < 1e-6);
}

#[test]
fn test_crop_clamps_and_rejects() {
    let img = GrayImage::new(30, 20);
    let clamped = crop_around_center(&img, 1000, 1000).unwrap();
    assert_eq!(clamped.dimensions(), (30, 20));

    assert!(matches!(
        crop_around_center(&img, 10, 0),
        Err(AnalysisError::InvalidDimensions(_))
    ));
}

#[test]
fn test_inscribed_rect_then_crop() {
    init_logging();
    let img = GrayImage::from_pixel(120, 80, Luma([200]));
    let angle = 20.0;
    let rotated = rotate_image(&img, angle).unwrap();
    let (iw, ih) = largest_rotated_rect(120.0, 80.0, angle * PI / 180.0).unwrap();
    assert!(iw > 0.0 && iw < 120.0);
    assert!(ih > 0.0 && ih < 80.0);

    // Corners of the inscribed rectangle touch the rotated edges; back off a
    // few pixels so bilinear blending at the border stays out of the crop
    let cropped =
        crop_around_center(&rotated, iw.floor() as u32 - 10, ih.floor() as u32 - 10).unwrap();
    assert!(cropped.pixels().all(|p| p[0] >= 190), "black corners survived the crop");
}
