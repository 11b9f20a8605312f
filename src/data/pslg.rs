use crate::data::Point;
use crate::{Error, Result};

/// Axis-aligned bounding box, grown point by point.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
  pub min_x: f64,
  pub min_y: f64,
  pub max_x: f64,
  pub max_y: f64,
}

impl BoundingBox {
  pub fn empty() -> BoundingBox {
    BoundingBox {
      min_x: f64::INFINITY,
      min_y: f64::INFINITY,
      max_x: f64::NEG_INFINITY,
      max_y: f64::NEG_INFINITY,
    }
  }

  pub fn expand(&mut self, p: &Point) {
    self.min_x = self.min_x.min(p.x);
    self.min_y = self.min_y.min(p.y);
    self.max_x = self.max_x.max(p.x);
    self.max_y = self.max_y.max(p.y);
  }

  pub fn width(&self) -> f64 {
    self.max_x - self.min_x
  }

  pub fn height(&self) -> f64 {
    self.max_y - self.min_y
  }

  pub fn contains(&self, p: &Point) -> bool {
    p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
  }
}

/// An input point with its boundary mark and user attributes.
#[derive(Debug, Clone)]
pub struct InputVertex {
  pub point: Point,
  pub mark: i32,
  pub attrs: Vec<f64>,
}

/// A constraint edge between two input points, by index.
#[derive(Debug, Clone, Copy)]
pub struct InputSegment {
  pub p0: usize,
  pub p1: usize,
  pub mark: i32,
}

/// A region seed: triangles reachable from `point` without crossing a
/// constraint receive `id`, and `area` as a per-triangle bound if positive.
#[derive(Debug, Clone, Copy)]
pub struct RegionSeed {
  pub point: Point,
  pub id: i32,
  pub area: f64,
}

/// A planar straight-line graph: the input to [`crate::triangulate`].
#[derive(Debug, Clone)]
pub struct Pslg {
  pub points: Vec<InputVertex>,
  pub segments: Vec<InputSegment>,
  pub holes: Vec<Point>,
  pub regions: Vec<RegionSeed>,
  bbox: BoundingBox,
}

impl Default for Pslg {
  fn default() -> Pslg {
    Pslg::new()
  }
}

impl Pslg {
  pub fn new() -> Pslg {
    Pslg {
      points: Vec::new(),
      segments: Vec::new(),
      holes: Vec::new(),
      regions: Vec::new(),
      bbox: BoundingBox::empty(),
    }
  }

  /// Adds a point with mark 0 and no attributes; returns its index.
  pub fn add_point(&mut self, x: f64, y: f64) -> usize {
    self.add_point_with(x, y, 0, Vec::new())
  }

  pub fn add_point_with(&mut self, x: f64, y: f64, mark: i32, attrs: Vec<f64>) -> usize {
    let point = Point::new(x, y);
    self.bbox.expand(&point);
    self.points.push(InputVertex { point, mark, attrs });
    self.points.len() - 1
  }

  pub fn add_segment(&mut self, p0: usize, p1: usize, mark: i32) {
    self.segments.push(InputSegment { p0, p1, mark });
  }

  pub fn add_hole(&mut self, x: f64, y: f64) {
    self.holes.push(Point::new(x, y));
  }

  pub fn add_region(&mut self, x: f64, y: f64, id: i32, area: f64) {
    self.regions.push(RegionSeed {
      point: Point::new(x, y),
      id,
      area,
    });
  }

  pub fn bounding_box(&self) -> &BoundingBox {
    &self.bbox
  }

  /// Checks the input before any mesh state is touched.
  pub fn validate(&self) -> Result<()> {
    if self.points.len() < 3 {
      return Err(Error::InsufficientVertices);
    }
    let arity = self.points[0].attrs.len();
    if self.points.iter().any(|v| v.attrs.len() != arity) {
      return Err(Error::AttributeArity);
    }
    for seg in &self.segments {
      if seg.p0 >= self.points.len() || seg.p1 >= self.points.len() {
        return Err(Error::SegmentOutOfBounds);
      }
      if seg.p0 == seg.p1 {
        return Err(Error::CoincidentSegment);
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bbox_tracks_points() {
    let mut pslg = Pslg::new();
    pslg.add_point(1.0, 2.0);
    pslg.add_point(-3.0, 5.0);
    pslg.add_point(0.0, -1.0);
    let bbox = pslg.bounding_box();
    assert_eq!(bbox.min_x, -3.0);
    assert_eq!(bbox.max_x, 1.0);
    assert_eq!(bbox.min_y, -1.0);
    assert_eq!(bbox.max_y, 5.0);
    assert!(bbox.contains(&Point::new(0.0, 0.0)));
    assert!(!bbox.contains(&Point::new(2.0, 0.0)));
  }

  #[test]
  fn validate_rejects_degenerate_segment() {
    let mut pslg = Pslg::new();
    pslg.add_point(0.0, 0.0);
    pslg.add_point(1.0, 0.0);
    pslg.add_point(0.0, 1.0);
    pslg.add_segment(1, 1, 0);
    assert_eq!(pslg.validate(), Err(Error::CoincidentSegment));
  }

  #[test]
  fn validate_rejects_out_of_range_segment() {
    let mut pslg = Pslg::new();
    pslg.add_point(0.0, 0.0);
    pslg.add_point(1.0, 0.0);
    pslg.add_point(0.0, 1.0);
    pslg.add_segment(0, 3, 0);
    assert_eq!(pslg.validate(), Err(Error::SegmentOutOfBounds));
  }

  #[test]
  fn validate_rejects_mixed_attribute_arity() {
    let mut pslg = Pslg::new();
    pslg.add_point_with(0.0, 0.0, 0, vec![1.0]);
    pslg.add_point(1.0, 0.0);
    pslg.add_point(0.0, 1.0);
    assert_eq!(pslg.validate(), Err(Error::AttributeArity));
  }

  #[test]
  fn validate_requires_three_points() {
    let mut pslg = Pslg::new();
    pslg.add_point(0.0, 0.0);
    pslg.add_point(1.0, 0.0);
    assert_eq!(pslg.validate(), Err(Error::InsufficientVertices));
  }
}
