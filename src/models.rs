use std::fmt;

use imageproc::point::Point;

use crate::detection::contours;
use crate::pipeline::BoundingBox;

/// Boundary curve of a connected foreground region, in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

/// Raw spatial moments of a contour polygon
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Green's theorem over the closed polygon; orientation-independent
    pub fn moments(&self) -> Moments {
        let n = self.points.len();
        if n < 3 {
            return Moments::default();
        }

        let mut m = Moments::default();
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let (xi, yi) = (p.x as f64, p.y as f64);
            let (xj, yj) = (q.x as f64, q.y as f64);
            let cross = xi * yj - xj * yi;
            m.m00 += cross;
            m.m10 += cross * (xi + xj);
            m.m01 += cross * (yi + yj);
        }
        m.m00 /= 2.0;
        m.m10 /= 6.0;
        m.m01 /= 6.0;

        if m.m00 < 0.0 {
            m.m00 = -m.m00;
            m.m10 = -m.m10;
            m.m01 = -m.m01;
        }
        m
    }

    /// Polygon area enclosed by the boundary points
    pub fn area(&self) -> f64 {
        self.moments().m00
    }

    pub fn perimeter(&self) -> f64 {
        contours::closed_perimeter(&self.points)
    }

    /// Integer centroid, truncated toward zero; None for zero-area contours
    pub fn centroid(&self) -> Option<(i32, i32)> {
        let m = self.moments();
        if m.m00 == 0.0 {
            return None;
        }
        Some(((m.m10 / m.m00) as i32, (m.m01 / m.m00) as i32))
    }

    /// Smallest box holding every boundary pixel
    pub fn bounding_box(&self) -> BoundingBox {
        let Some(first) = self.points.first() else {
            return BoundingBox::new(0, 0, 0, 0);
        };

        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &self.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        BoundingBox::new(
            min_x.max(0) as u32,
            min_y.max(0) as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        )
    }

    /// Simplified polygon with vertices no farther than `epsilon` from the curve
    pub fn approximate(&self, epsilon: f64) -> Vec<Point<i32>> {
        contours::approximate_closed(&self.points, epsilon)
    }

    /// Translate every point, e.g. from zone to full-frame coordinates
    pub fn offset(&self, dx: i32, dy: i32) -> Contour {
        Contour {
            points: self.points.iter().map(|p| Point::new(p.x + dx, p.y + dy)).collect(),
        }
    }
}

/// Geometric label assigned to a contour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Triangle,
    Square,
    Rectangle,
    Quadrilateral,
    Pentagon,
    Hexagon,
    Circle,
    Oval,
    /// Many-sided outline that is not round enough for a circle or oval
    Polygon(usize),
    Unknown,
    TooSmall,
    Degenerate,
}

impl ShapeKind {
    /// Whether this label may be reported as a frame's primary shape
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ShapeKind::TooSmall | ShapeKind::Degenerate)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Triangle => write!(f, "Triangle"),
            ShapeKind::Square => write!(f, "Square"),
            ShapeKind::Rectangle => write!(f, "Rectangle"),
            ShapeKind::Quadrilateral => write!(f, "Quadrilateral"),
            ShapeKind::Pentagon => write!(f, "Pentagon"),
            ShapeKind::Hexagon => write!(f, "Hexagon"),
            ShapeKind::Circle => write!(f, "Circle"),
            ShapeKind::Oval => write!(f, "Oval"),
            ShapeKind::Polygon(n) => write!(f, "Polygon({})", n),
            ShapeKind::Unknown => write!(f, "Unknown"),
            ShapeKind::TooSmall => write!(f, "Too small"),
            ShapeKind::Degenerate => write!(f, "Degenerate"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeClassification {
    pub kind: ShapeKind,
    pub vertices: usize,
}

/// Primary shape of a frame, in full-frame coordinates
#[derive(Debug, Clone)]
pub struct ShapeDetection {
    pub kind: ShapeKind,
    pub vertices: usize,
    pub area: f64,
    pub bbox: BoundingBox,
    pub contour: Contour,
}

/// Colors the segmenter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorName {
    Red,
    Green,
    Blue,
}

impl ColorName {
    /// RGB used when drawing this color's boxes
    pub fn draw_color(&self) -> [u8; 3] {
        match self {
            ColorName::Red => [255, 0, 0],
            ColorName::Green => [0, 255, 0],
            ColorName::Blue => [0, 0, 255],
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorName::Red => write!(f, "Red"),
            ColorName::Green => write!(f, "Green"),
            ColorName::Blue => write!(f, "Blue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDetection {
    pub color: ColorName,
    pub bbox: BoundingBox,
}

/// Combined color reading for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorVerdict {
    RedBlue,
    RedGreen,
    Red,
    Green,
    Blue,
    NoColor,
}

impl fmt::Display for ColorVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColorVerdict::RedBlue => "Red+Blue",
            ColorVerdict::RedGreen => "Red+Green",
            ColorVerdict::Red => "Red",
            ColorVerdict::Green => "Green",
            ColorVerdict::Blue => "Blue",
            ColorVerdict::NoColor => "No color",
        };
        f.write_str(label)
    }
}

/// Everything the classifier found in one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Detection zone within the resized frame
    pub zone: BoundingBox,
    pub shape: Option<ShapeDetection>,
    pub colors: Vec<ColorDetection>,
    pub verdict: ColorVerdict,
}

impl FrameReport {
    pub fn shape_label(&self) -> String {
        match &self.shape {
            Some(shape) => shape.kind.to_string(),
            None => "Not geometric".to_string(),
        }
    }

    pub fn summary(&self) -> String {
        format!("Color: {} | Shape: {}", self.verdict, self.shape_label())
    }
}
