use image::GrayImage;
use imageproc::contours::BorderType;
use imageproc::geometry::arc_length;
use imageproc::point::Point;

use crate::models::Contour;

/// Find the outer borders of top-level foreground regions.
///
/// Any non-zero pixel counts as foreground. Borders of regions nested inside
/// holes are skipped, so a ring yields one contour rather than two.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect()
}

/// Closed-curve length of a point sequence
pub fn closed_perimeter(points: &[Point<i32>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    arc_length(points, true)
}

/// Douglas-Peucker simplification of a closed curve.
///
/// The curve is split at the point farthest from its first point and both
/// halves are simplified as open chains, so the result never repeats a vertex.
/// Vertices left lying on a straight edge are then dropped.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let start = points[0];
    let (split, _) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, squared_distance(start, *p)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

    if split == 0 {
        return vec![start];
    }

    let mut first = Vec::with_capacity(split + 1);
    first.extend_from_slice(&points[..=split]);

    let mut second = Vec::with_capacity(points.len() - split + 1);
    second.extend_from_slice(&points[split..]);
    second.push(start);

    let mut result = simplify_open(&first, epsilon);
    let tail = simplify_open(&second, epsilon);

    // both chains share the split point and the closing start point
    result.pop();
    result.extend_from_slice(&tail[..tail.len() - 1]);

    drop_collinear(&mut result, epsilon);
    result
}

/// Remove vertices within `epsilon / sqrt(2)` of the segment joining their
/// neighbours, wrapping around, until none are left or only a triangle remains.
///
/// A split chord parallel to an edge can land the farthest point mid-edge;
/// this pass removes those.
fn drop_collinear(polygon: &mut Vec<Point<i32>>, epsilon: f64) {
    let limit = epsilon * std::f64::consts::FRAC_1_SQRT_2;

    while polygon.len() > 3 {
        let n = polygon.len();
        let flat = (0..n).find(|&i| {
            let prev = polygon[(i + n - 1) % n];
            let next = polygon[(i + 1) % n];
            segment_distance(prev, next, polygon[i]) <= limit
        });

        match flat {
            Some(i) => {
                polygon.remove(i);
            }
            None => break,
        }
    }
}

fn simplify_open(chain: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if chain.len() < 3 {
        return chain.to_vec();
    }

    let first = chain[0];
    let last = chain[chain.len() - 1];
    let mut max_dist = 0.0;
    let mut index = 0;

    for (i, p) in chain.iter().enumerate().take(chain.len() - 1).skip(1) {
        let d = segment_distance(first, last, *p);
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }

    if max_dist > epsilon {
        let mut left = simplify_open(&chain[..=index], epsilon);
        let right = simplify_open(&chain[index..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![first, last]
    }
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    dx * dx + dy * dy
}

/// Distance from `p` to the segment `a`-`b`
fn segment_distance(a: Point<i32>, b: Point<i32>, p: Point<i32>) -> f64 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (px, py) = (p.x as f64, p.y as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    if len_sq == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }

    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}
