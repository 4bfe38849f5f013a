//! Centroid pipeline against synthetic discs with known centres

use image::{GrayImage, Luma};
use ndarray::Array2;
use rand::Rng;
use spotlab::image_proc::{
    array_to_gray_image, find_centroid, Centroid, CentroidConfig, EdgeMode,
};
use test_helpers::{disc_image, output_path, seeded_rng};

const WIDTH: u32 = 160;
const HEIGHT: u32 = 140;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_near(c: &Centroid, cx: f64, cy: f64, label: &str) {
    let err = ((c.x - cx).powi(2) + (c.y - cy).powi(2)).sqrt();
    assert!(
        err < 1.0,
        "{label}: centroid ({:.3}, {:.3}) vs truth ({cx:.3}, {cy:.3}), error {err:.3}",
        c.x,
        c.y
    );
}

#[test]
fn test_disc_radii_3_to_50() {
    init_logging();
    let config = CentroidConfig::default();

    for radius in [3.0, 4.0, 5.5, 8.0, 12.0, 17.3, 25.0, 33.0, 41.7, 50.0] {
        let (cx, cy) = (79.3, 68.6);
        let img = disc_image(WIDTH, HEIGHT, cx, cy, radius, 15, 250);
        let c = find_centroid(&img, &config)
            .unwrap_or_else(|| panic!("no centroid for radius {radius}"));
        assert_near(&c, cx, cy, &format!("radius {radius}"));
        assert!(c.x >= 0.0 && c.x < WIDTH as f64);
        assert!(c.y >= 0.0 && c.y < HEIGHT as f64);
    }
}

/// Disc centres whose rim sits `gap` pixels from each of the four edges.
fn edge_placements(radius: f64, gap: f64) -> [(f64, f64); 4] {
    let near = radius + gap;
    let far_x = WIDTH as f64 - 1.0 - radius - gap;
    let far_y = HEIGHT as f64 - 1.0 - radius - gap;
    [
        (near, 70.3),
        (far_x, 68.6),
        (79.4, near),
        (81.2, far_y),
    ]
}

fn check_edge_placements(config: &CentroidConfig, label: &str) {
    for radius in [3.0, 10.0] {
        for gap in [0.0, 1.0, 2.0, 3.0, 4.0] {
            for (cx, cy) in edge_placements(radius, gap) {
                let img = disc_image(WIDTH, HEIGHT, cx, cy, radius, 0, 255);
                let c = find_centroid(&img, config).unwrap_or_else(|| {
                    panic!("{label}: no centroid for r={radius} at ({cx}, {cy})")
                });
                assert_near(&c, cx, cy, &format!("{label} r={radius} at ({cx}, {cy})"));
            }
        }
    }
}

#[test]
fn test_near_edge_placements() {
    init_logging();
    check_edge_placements(&CentroidConfig::default(), "border");
}

#[test]
fn test_near_edge_placements_canny() {
    init_logging();
    let config = CentroidConfig {
        edge_mode: EdgeMode::canny(),
        ..Default::default()
    };
    check_edge_placements(&config, "canny");
}

#[test]
fn test_large_discs_in_corners() {
    init_logging();
    let config = CentroidConfig::default();

    for radius in [25.0, 50.0] {
        let placements = [
            (radius + 1.0, radius + 0.4),
            (WIDTH as f64 - 1.0 - radius, radius + 2.7),
            (radius + 0.2, HEIGHT as f64 - 1.0 - radius),
            (WIDTH as f64 - 2.0 - radius, HEIGHT as f64 - 1.0 - radius),
        ];
        for (cx, cy) in placements {
            let img = disc_image(WIDTH, HEIGHT, cx, cy, radius, 0, 255);
            let c = find_centroid(&img, &config)
                .unwrap_or_else(|| panic!("no centroid for r={radius} at ({cx}, {cy})"));
            assert_near(&c, cx, cy, &format!("r={radius} at ({cx}, {cy})"));
        }
    }
}

#[test]
fn test_canny_edges_match_border_following() {
    init_logging();
    let img = disc_image(WIDTH, HEIGHT, 61.5, 70.25, 14.0, 5, 245);

    let border = find_centroid(&img, &CentroidConfig::default()).unwrap();
    let canny = find_centroid(
        &img,
        &CentroidConfig {
            edge_mode: EdgeMode::canny(),
            ..Default::default()
        },
    )
    .unwrap();

    assert_near(&border, 61.5, 70.25, "border");
    assert_near(&canny, 61.5, 70.25, "canny");
}

#[test]
fn test_noisy_background() {
    init_logging();
    let mut rng = seeded_rng(2024);
    let mut frame = Array2::<u8>::zeros((HEIGHT as usize, WIDTH as usize));
    for v in frame.iter_mut() {
        *v = rng.random_range(0..60);
    }
    let (cx, cy) = (100.0, 50.0);
    for ((row, col), v) in frame.indexed_iter_mut() {
        let dx = col as f64 - cx;
        let dy = row as f64 - cy;
        if dx * dx + dy * dy <= 81.0 {
            *v = rng.random_range(241..=255);
        }
    }

    let img = array_to_gray_image(&frame.view());
    img.save(output_path("centroid_noisy_disc.png")).unwrap();

    let c = find_centroid(&img, &CentroidConfig::default()).unwrap();
    assert_near(&c, cx, cy, "noisy");
}

#[test]
fn test_uniform_frames_return_none() {
    init_logging();
    let config = CentroidConfig::default();
    for level in [0u8, 100, 240, 255] {
        let img = GrayImage::from_pixel(64, 64, Luma([level]));
        assert!(
            find_centroid(&img, &config).is_none(),
            "uniform level {level} produced a centroid"
        );
    }
}

#[test]
fn test_all_dark_with_texture_returns_none() {
    init_logging();
    let img = GrayImage::from_fn(50, 50, |x, y| Luma([((x + y) % 200) as u8]));
    assert!(find_centroid(&img, &CentroidConfig::default()).is_none());
}
