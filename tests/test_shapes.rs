//! Shape classification on rasterized masks.

mod common;

use imageproc::point::Point;
use shapepilot::detection::contours::find_external_contours;
use shapepilot::detection::shapes::{circularity, classify_shape, find_primary_shape};

use common::*;

fn single_contour(mask: &image::GrayImage) -> Contour {
    let mut contours = find_external_contours(mask);
    assert_eq!(contours.len(), 1, "expected exactly one contour");
    contours.remove(0)
}

#[test]
fn test_square_is_square() {
    let contour = single_contour(&mask_with_rect(50, 50, 100, 100));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::Square);
    assert_eq!(class.vertices, 4);
}

#[test]
fn test_wide_rectangle_is_rectangle() {
    let contour = single_contour(&mask_with_rect(20, 60, 160, 80));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::Rectangle);
    assert_eq!(class.vertices, 4);
}

#[test]
fn test_diamond_is_quadrilateral() {
    // Square bounding box but only half of it filled
    let contour = single_contour(&mask_with_polygon(&[(100, 10), (190, 100), (100, 190), (10, 100)]));
    let class = classify_shape(&contour);

    assert_eq!(class.vertices, 4);
    assert_eq!(class.kind, ShapeKind::Quadrilateral);
}

#[test]
fn test_triangle() {
    let contour = single_contour(&mask_with_polygon(&[(100, 20), (180, 180), (20, 180)]));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::Triangle);
    assert_eq!(class.vertices, 3);
}

#[test]
fn test_hexagon() {
    let contour = single_contour(&mask_with_polygon(&[
        (180, 100),
        (140, 169),
        (60, 169),
        (20, 100),
        (60, 31),
        (140, 31),
    ]));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::Hexagon);
    assert_eq!(class.vertices, 6);
}

#[test]
fn test_disc_is_circle() {
    let contour = single_contour(&mask_with_circle(100, 100, 80));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::Circle);
    assert!(class.vertices > 6, "got {} vertices", class.vertices);
}

#[test]
fn test_small_blob_is_too_small() {
    let contour = single_contour(&mask_with_rect(10, 10, 20, 20));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::TooSmall);
    assert!(!class.kind.is_reportable());
}

#[test]
fn test_degenerate_contours() {
    let empty = Contour::new(vec![]);
    let class = classify_shape(&empty);
    assert_eq!(class.kind, ShapeKind::Degenerate);
    assert_eq!(class.vertices, 0);

    let segment = Contour::new(vec![Point::new(0, 0), Point::new(10, 0)]);
    assert_eq!(classify_shape(&segment).kind, ShapeKind::Degenerate);
}

#[test]
fn test_circularity_of_ideal_shapes() {
    let r = 50.0;
    let disc = circularity(std::f64::consts::PI * r * r, 2.0 * std::f64::consts::PI * r);
    assert!((disc - 1.0).abs() < 1e-9);

    // square: 4π·s² / (4s)² = π/4
    let square = circularity(100.0, 40.0);
    assert!((square - std::f64::consts::FRAC_PI_4).abs() < 1e-9);

    assert_eq!(circularity(100.0, 0.0), 0.0);
}

#[test]
fn test_primary_shape_picks_largest_qualifying() {
    let mut mask = mask_with_rect(10, 10, 40, 40);
    let big = mask_with_rect(80, 80, 100, 100);
    for (x, y, p) in big.enumerate_pixels() {
        if p[0] > 0 {
            mask.put_pixel(x, y, *p);
        }
    }

    let contours = find_external_contours(&mask);
    assert_eq!(contours.len(), 2);

    let primary = find_primary_shape(&contours, 1000.0).expect("a shape should be found");
    assert_eq!(primary.kind, ShapeKind::Square);
    assert_eq!(primary.bbox.x, 80);
    assert_eq!(primary.bbox.y, 80);
    assert_eq!(primary.bbox.width, 100);
    assert_eq!(primary.bbox.height, 100);
}

#[test]
fn test_primary_shape_requires_min_area() {
    let contours = find_external_contours(&mask_with_rect(10, 10, 30, 30));
    assert!(find_primary_shape(&contours, 1000.0).is_none());
}

#[test]
fn test_contour_geometry_of_rectangle() {
    let contour = single_contour(&mask_with_rect(20, 30, 40, 10));

    // polygon through boundary pixel centers
    assert_eq!(contour.area(), 39.0 * 9.0);

    let bbox = contour.bounding_box();
    assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (20, 30, 40, 10));

    // (20 + 59) / 2 = 39.5, (30 + 39) / 2 = 34.5, truncated
    assert_eq!(contour.centroid(), Some((39, 34)));

    let moved = contour.offset(5, -5);
    assert_eq!(moved.bounding_box().x, 25);
    assert_eq!(moved.bounding_box().y, 25);
}

#[test]
fn test_ring_yields_single_external_contour() {
    let mut mask = mask_with_rect(40, 40, 120, 120);
    for y in 70..130 {
        for x in 70..130 {
            mask.put_pixel(x, y, image::Luma([0]));
        }
    }
    // an island inside the hole must not be reported either
    for y in 95..105 {
        for x in 95..105 {
            mask.put_pixel(x, y, image::Luma([255]));
        }
    }

    let contours = find_external_contours(&mask);
    assert_eq!(contours.len(), 1);
    assert_eq!(contours[0].bounding_box().width, 120);
}

#[test]
fn test_shape_labels() {
    assert_eq!(ShapeKind::Polygon(9).to_string(), "Polygon(9)");
    assert_eq!(ShapeKind::TooSmall.to_string(), "Too small");
    assert_eq!(ShapeKind::Oval.to_string(), "Oval");
}

/// Corners of a regular `n`-gon of radius 80 centred in the mask, first corner
/// at the top, turned by `degrees`
fn regular_polygon(n: usize, degrees: f64) -> Vec<(i32, i32)> {
    (0..n)
        .map(|i| {
            let angle = (degrees - 90.0 + 360.0 * i as f64 / n as f64).to_radians();
            (
                (100.0 + 80.0 * angle.cos()).round() as i32,
                (100.0 + 80.0 * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn points(coords: &[(i32, i32)]) -> Vec<Point<i32>> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

#[test]
fn test_regular_pentagon() {
    let contour = single_contour(&mask_with_polygon(&regular_polygon(5, 0.0)));
    let class = classify_shape(&contour);

    assert_eq!(class.kind, ShapeKind::Pentagon);
    assert_eq!(class.vertices, 5);
}

#[test]
fn test_vertex_count_is_stable_under_rotation() {
    for n in 3..=6 {
        for step in 0..12 {
            let degrees = 5.0 * step as f64;
            let contour = single_contour(&mask_with_polygon(&regular_polygon(n, degrees)));
            let class = classify_shape(&contour);

            assert_eq!(class.vertices, n, "{}-gon turned {} degrees gave {:?}", n, degrees, class);
        }
    }
}

#[test]
fn test_edge_points_are_not_corners() {
    // straight edges parallel to the first split chord
    let hexagon = single_contour(&mask_with_polygon(&[
        (180, 100),
        (140, 169),
        (60, 169),
        (20, 100),
        (60, 31),
        (140, 31),
    ]));
    let approx = hexagon.approximate(0.03 * hexagon.perimeter());

    assert_eq!(approx.len(), 6);
    assert!(!approx.contains(&Point::new(34, 125)));
}

#[test]
fn test_tilted_square_box_with_low_extent_is_rectangle() {
    // square of side ~120 turned 6 degrees: box stays square, fill drops to ~0.81
    let contour = Contour::new(points(&[(53, 66), (-66, 53), (-53, -66), (66, -53)]));
    let class = classify_shape(&contour);

    assert_eq!(class.vertices, 4);
    assert_eq!(class.kind, ShapeKind::Rectangle);
}

#[test]
fn test_flattened_outline_is_oval() {
    // octagon squashed to 40% height: eight clear corners, circularity ~0.70
    let contour = Contour::new(points(&[
        (100, 0),
        (71, 28),
        (0, 40),
        (-71, 28),
        (-100, 0),
        (-71, -28),
        (0, -40),
        (71, -28),
    ]));
    let class = classify_shape(&contour);
    let c = circularity(contour.area(), contour.perimeter());

    assert!(c > 0.6 && c < 0.75, "circularity {}", c);
    assert_eq!(class.vertices, 8);
    assert_eq!(class.kind, ShapeKind::Oval);
}

#[test]
fn test_star_is_polygon() {
    let star: Vec<(i32, i32)> = (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { 100.0 } else { 40.0 };
            let angle = (-90.0 + 36.0 * i as f64).to_radians();
            ((radius * angle.cos()).round() as i32, (radius * angle.sin()).round() as i32)
        })
        .collect();
    let contour = Contour::new(points(&star));
    let class = classify_shape(&contour);

    assert!(circularity(contour.area(), contour.perimeter()) < 0.6);
    assert_eq!(class.vertices, 10);
    assert_eq!(class.kind, ShapeKind::Polygon(10));
}

#[test]
fn test_thin_sliver_is_unknown() {
    // both long edges fall within tolerance of the diagonal
    let contour = Contour::new(points(&[(0, 0), (400, 0), (400, 10), (0, 10)]));
    let class = classify_shape(&contour);

    assert_eq!(class.vertices, 2);
    assert_eq!(class.kind, ShapeKind::Unknown);
}
