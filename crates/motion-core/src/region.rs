//! Region-of-interest rasterisation.
//!
//! Operators describe the area worth watching as one or more polygons in image
//! pixel coordinates. The polygons are rasterised once, against the dimensions
//! of the first decoded frame, into a flat ascending list of pixel offsets.
//! The detection loop then walks that list instead of re-testing polygon
//! containment per frame.

use serde::Deserialize;

/// 2-D point in the image's pixel coordinate system.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Closed polygon described by an ordered vertex list.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Clone, Debug, Default)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Build a polygon, collapsing duplicate consecutive vertices.
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        let mut collapsed: Vec<Point> = Vec::new();
        for point in points {
            if collapsed.last() != Some(&point) {
                collapsed.push(point);
            }
        }
        Self { points: collapsed }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Ray-cast containment test against the polygon edges.
    ///
    /// Polygons with fewer than three distinct vertices enclose nothing.
    /// Boundary pixels follow the ray-cast convention and are not guaranteed
    /// either way, but the answer is deterministic for a given polygon.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let points = &self.points;
        if points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = points.len() - 1;
        for i in 0..points.len() {
            let (a, b) = (points[i], points[j]);
            if (a.y > y) != (b.y > y) {
                let crossing = (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x;
                if x < crossing {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Union of polygons: a pixel belongs to the region when any polygon
/// contains its centre.
#[derive(Clone, Debug, Default)]
pub struct Region {
    polygons: Vec<Polygon>,
}

impl Region {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Rasterise the region against a reference frame of `width`x`height`.
    ///
    /// Rows are scanned top to bottom and columns left to right, so the
    /// resulting offsets are strictly ascending in row-major order. The scan
    /// is O(width * height * vertices) but runs once per stream.
    pub fn rasterise(&self, width: i32, height: i32) -> MaskIndex {
        let mut offsets = Vec::new();
        if width > 0 && height > 0 && !self.polygons.is_empty() {
            for y in 0..height {
                for x in 0..width {
                    let inside = self
                        .polygons
                        .iter()
                        .any(|polygon| polygon.contains(x as f64, y as f64));
                    if inside {
                        offsets.push((y * width + x) as usize);
                    }
                }
            }
        }
        MaskIndex {
            offsets,
            width,
            height,
        }
    }
}

/// Flat ascending list of pixel offsets inside a region, tied to the frame
/// dimensions it was rasterised against.
#[derive(Clone, Debug)]
pub struct MaskIndex {
    offsets: Vec<usize>,
    width: i32,
    height: i32,
}

impl MaskIndex {
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Reference frame width the offsets were computed against.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Reference frame height the offsets were computed against.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of pixels in the reference frame.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}
