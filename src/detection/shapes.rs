use std::f64::consts::PI;

use crate::models::{Contour, ShapeClassification, ShapeDetection, ShapeKind};

/// Tolerance for polygon simplification, as a fraction of the perimeter
pub const APPROX_EPSILON_RATIO: f64 = 0.03;

/// Contours below this area are labelled `TooSmall`
pub const MIN_CLASSIFY_AREA: f64 = 500.0;

/// Classify a contour by vertex count, then refine with aspect, extent and circularity
pub fn classify_shape(contour: &Contour) -> ShapeClassification {
    let perimeter = contour.perimeter();
    if contour.len() < 3 || perimeter <= 0.0 {
        return ShapeClassification { kind: ShapeKind::Degenerate, vertices: 0 };
    }

    let vertices = contour.approximate(APPROX_EPSILON_RATIO * perimeter).len();

    let area = contour.area();
    if area < MIN_CLASSIFY_AREA {
        return ShapeClassification { kind: ShapeKind::TooSmall, vertices };
    }

    let circularity = circularity(area, perimeter);
    let bbox = contour.bounding_box();
    let aspect = if bbox.height > 0 {
        bbox.width as f64 / bbox.height as f64
    } else {
        0.0
    };

    let kind = match vertices {
        3 => ShapeKind::Triangle,
        4 => {
            let box_area = bbox.area() as f64;
            let extent = if box_area > 0.0 { area / box_area } else { 0.0 };

            if (0.9..=1.1).contains(&aspect) && extent > 0.85 {
                ShapeKind::Square
            } else if extent > 0.75 {
                ShapeKind::Rectangle
            } else {
                ShapeKind::Quadrilateral
            }
        }
        5 => ShapeKind::Pentagon,
        6 => ShapeKind::Hexagon,
        n if n > 6 => {
            if circularity > 0.75 {
                ShapeKind::Circle
            } else if circularity > 0.6 {
                ShapeKind::Oval
            } else {
                ShapeKind::Polygon(n)
            }
        }
        _ => ShapeKind::Unknown,
    };

    ShapeClassification { kind, vertices }
}

/// 4πA/P²: 1.0 for a perfect disc, smaller for elongated or jagged outlines
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter > 0.0 {
        4.0 * PI * area / (perimeter * perimeter)
    } else {
        0.0
    }
}

/// Largest contour above `min_area` that classifies as a real shape.
///
/// Only the single biggest qualifying object is reported.
pub fn find_primary_shape(contours: &[Contour], min_area: f64) -> Option<ShapeDetection> {
    let mut by_area: Vec<(f64, &Contour)> = contours.iter().map(|c| (c.area(), c)).collect();
    by_area.sort_by(|a, b| b.0.total_cmp(&a.0));

    by_area
        .into_iter()
        .filter(|(area, _)| *area > min_area)
        .find_map(|(area, contour)| {
            let class = classify_shape(contour);
            class.kind.is_reportable().then(|| ShapeDetection {
                kind: class.kind,
                vertices: class.vertices,
                area,
                bbox: contour.bounding_box(),
                contour: contour.clone(),
            })
        })
}
