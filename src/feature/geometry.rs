//! Feature shapes: points, lines, polygons, multi-polygons, and rasters.
//!
//! Every variant owns its coordinate data. [`PolygonGeometry`] caches its
//! bounding rectangle; the cache is private and every mutator resets it, so a
//! read after any change always reflects the current points.

use std::cell::OnceCell;

use super::raster::Raster;
use crate::geometry::{Point, Rectangle, Size};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// The shape of a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    Line(LineGeometry),
    Polygon(PolygonGeometry),
    MultiPolygon(MultiPolygonGeometry),
    Raster(RasterGeometry),
}

impl Geometry {
    /// The axis-aligned bounds of this shape.
    pub fn bounding_rectangle(&self) -> Rectangle {
        match self {
            Geometry::Point(p) => Rectangle { min: *p, max: *p },
            Geometry::Line(line) => line.bounding_rectangle(),
            Geometry::Polygon(polygon) => polygon.bounding_rectangle(),
            Geometry::MultiPolygon(multi) => multi.bounding_rectangle(),
            Geometry::Raster(raster) => raster.bounding_rectangle(),
        }
    }

    /// The reference point used to position the shape.
    ///
    /// For a point this is the point itself; for every other shape it is the
    /// centre of the bounding rectangle.
    pub fn anchor(&self) -> Point {
        match self {
            Geometry::Point(p) => *p,
            other => other.bounding_rectangle().center(),
        }
    }

    /// Move the whole shape by `delta`.
    pub fn translate(&mut self, delta: Point) {
        match self {
            Geometry::Point(p) => *p = *p + delta,
            Geometry::Line(line) => line.translate(delta),
            Geometry::Polygon(polygon) => polygon.translate(delta),
            Geometry::MultiPolygon(multi) => multi.translate(delta),
            Geometry::Raster(raster) => raster.offset = raster.offset + delta,
        }
    }

    /// Whether the shape touches `rect`.
    ///
    /// Points and rasters test against their bounds; lines clip each segment;
    /// polygons test vertices, edges, and containment of the rectangle.
    pub fn intersects_rect(&self, rect: &Rectangle) -> bool {
        if !self.bounding_rectangle().intersects(rect) {
            return false;
        }
        match self {
            Geometry::Point(_) | Geometry::Raster(_) => true,
            Geometry::Line(line) => polyline_intersects(line.points(), rect),
            Geometry::Polygon(polygon) => polygon.intersects_rect(rect),
            Geometry::MultiPolygon(multi) => {
                multi.polygons().iter().any(|p| p.intersects_rect(rect))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LineGeometry
// ---------------------------------------------------------------------------

/// An open polyline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineGeometry {
    points: Vec<Point>,
}

impl LineGeometry {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bounding_rectangle(&self) -> Rectangle {
        Rectangle::from_points(&self.points).unwrap_or_default()
    }

    pub fn translate(&mut self, delta: Point) {
        for p in &mut self.points {
            *p = *p + delta;
        }
    }

    /// Total length of all segments.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

// ---------------------------------------------------------------------------
// PolygonGeometry
// ---------------------------------------------------------------------------

/// A closed ring of points with a lazily computed bounding rectangle.
///
/// The ring is implicitly closed: the last point connects back to the first.
#[derive(Debug, Default)]
pub struct PolygonGeometry {
    points: Vec<Point>,
    bounds: OnceCell<Rectangle>,
}

impl PolygonGeometry {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            bounds: OnceCell::new(),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The bounding rectangle, computed on first read and cached until the
    /// next mutation.
    pub fn bounding_rectangle(&self) -> Rectangle {
        *self
            .bounds
            .get_or_init(|| Rectangle::from_points(&self.points).unwrap_or_default())
    }

    /// Whether a bounding rectangle is currently cached.
    pub fn has_cached_bounds(&self) -> bool {
        self.bounds.get().is_some()
    }

    /// Replace the whole point sequence.
    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
        self.invalidate();
    }

    /// Append a vertex.
    pub fn push_point(&mut self, point: Point) {
        self.points.push(point);
        self.invalidate();
    }

    /// Move every vertex by `delta`.
    pub fn translate(&mut self, delta: Point) {
        for p in &mut self.points {
            *p = *p + delta;
        }
        self.invalidate();
    }

    /// Even-odd point-in-polygon test.
    pub fn contains_point(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Signed-area magnitude via the shoelace formula.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let (a, b) = (self.points[i], self.points[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice.abs() / 2.0
    }

    fn intersects_rect(&self, rect: &Rectangle) -> bool {
        if self.points.iter().any(|p| rect.contains(*p)) {
            return true;
        }
        if rect.corners().iter().any(|c| self.contains_point(*c)) {
            return true;
        }
        let n = self.points.len();
        (0..n).any(|i| segment_intersects_rect(self.points[i], self.points[(i + 1) % n], rect))
    }

    fn invalidate(&mut self) {
        self.bounds = OnceCell::new();
    }
}

impl Clone for PolygonGeometry {
    /// The clone starts with an empty cache and computes its own bounds.
    fn clone(&self) -> Self {
        Self::new(self.points.clone())
    }
}

impl PartialEq for PolygonGeometry {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
    }
}

// ---------------------------------------------------------------------------
// MultiPolygonGeometry
// ---------------------------------------------------------------------------

/// A collection of polygons treated as one shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPolygonGeometry {
    polygons: Vec<PolygonGeometry>,
}

impl MultiPolygonGeometry {
    pub fn new(polygons: Vec<PolygonGeometry>) -> Self {
        Self { polygons }
    }

    pub fn polygons(&self) -> &[PolygonGeometry] {
        &self.polygons
    }

    pub fn push(&mut self, polygon: PolygonGeometry) {
        self.polygons.push(polygon);
    }

    /// Union of the member bounds; each member uses its own cache.
    pub fn bounding_rectangle(&self) -> Rectangle {
        self.polygons
            .iter()
            .map(PolygonGeometry::bounding_rectangle)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }

    pub fn translate(&mut self, delta: Point) {
        for polygon in &mut self.polygons {
            polygon.translate(delta);
        }
    }
}

// ---------------------------------------------------------------------------
// RasterGeometry
// ---------------------------------------------------------------------------

/// A raster placed in world space.
///
/// `offset` is the world position of the raster's minimum corner and
/// `pixel_size` the world extent of one pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGeometry {
    pub raster: Raster,
    pub offset: Point,
    pub pixel_size: f64,
}

impl RasterGeometry {
    pub fn new(raster: Raster, offset: Point) -> Self {
        Self {
            raster,
            offset,
            pixel_size: 1.0,
        }
    }

    /// Set the world extent of one pixel (builder).
    pub fn with_pixel_size(mut self, pixel_size: f64) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    /// World-space size of the whole raster.
    pub fn world_size(&self) -> Size {
        Size::new(f64::from(self.raster.width()), f64::from(self.raster.height())) * self.pixel_size
    }

    pub fn bounding_rectangle(&self) -> Rectangle {
        let size = self.world_size();
        Rectangle {
            min: self.offset,
            max: self.offset + Point::new(size.width, size.height),
        }
    }
}

// ---------------------------------------------------------------------------
// Segment helpers
// ---------------------------------------------------------------------------

fn polyline_intersects(points: &[Point], rect: &Rectangle) -> bool {
    match points {
        [] => false,
        [only] => rect.contains(*only),
        _ => points
            .windows(2)
            .any(|w| segment_intersects_rect(w[0], w[1], rect)),
    }
}

/// Liang-Barsky clip of segment `a -> b` against `rect`.
fn segment_intersects_rect(a: Point, b: Point, rect: &Rectangle) -> bool {
    let d = b - a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    let checks = [
        (-d.x, a.x - rect.min.x),
        (d.x, rect.max.x - a.x),
        (-d.y, a.y - rect.min.y),
        (d.y, rect.max.y - a.y),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return false;
        }
    }
    true
}

// ===========================================================================
// Tests
// ===========================================================================
