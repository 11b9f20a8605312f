//! The bounded Voronoi diagram: the geometric dual of the triangulation,
//! with cells clipped against constraint segments and the hull.
//!
//! A triangle is "blinded" by a subsegment when the subsegment cuts the
//! line of sight from the triangle's circumcenter to one of its corners;
//! the cells of the triangle's vertices are then clipped where the dual
//! edges cross that subsegment. Cells of hull vertices are closed through
//! the generator and the midpoints of its two hull edges.

use std::collections::HashMap;

use crate::data::Point;
use crate::mesh::Mesh;
use crate::predicates;
use crate::topology::{Osub, Otri, VertId};

/// One Voronoi cell: a generator and the ordered ids of its polygon
/// vertices in [`BoundedVoronoi::vertices`].
#[derive(Debug, Clone)]
pub struct VoronoiRegion {
  /// Index into [`BoundedVoronoi::generators`].
  pub generator: usize,
  pub vertices: Vec<usize>,
  /// False for cells clipped against the hull (boundary generators).
  pub bounded: bool,
}

/// The dual diagram. `vertices` holds one circumcenter per triangle
/// followed by the clip intersections, in emission order.
#[derive(Debug, Clone)]
pub struct BoundedVoronoi {
  pub generators: Vec<Point>,
  pub vertices: Vec<Point>,
  pub regions: Vec<VoronoiRegion>,
}

/// Intersects segments (p1, p2) and (p3, p4) after rotating the frame so
/// (p1, p2) lies on the +x axis. Strict mode rejects endpoint touches and
/// intersections beyond either segment.
fn segments_intersect(p1: &Point, p2: &Point, p3: &Point, p4: &Point, strict: bool) -> Option<Point> {
  let dx = p2.x - p1.x;
  let dy = p2.y - p1.y;
  let d = (dx * dx + dy * dy).sqrt();
  if d == 0.0 {
    return None;
  }
  // Rotated frame: x along p1→p2.
  let x3 = ((p3.x - p1.x) * dx + (p3.y - p1.y) * dy) / d;
  let y3 = ((p3.y - p1.y) * dx - (p3.x - p1.x) * dy) / d;
  let x4 = ((p4.x - p1.x) * dx + (p4.y - p1.y) * dy) / d;
  let y4 = ((p4.y - p1.y) * dx - (p4.x - p1.x) * dy) / d;
  if strict {
    if y3 <= 0.0 && y4 <= 0.0 {
      return None;
    }
    if y3 >= 0.0 && y4 >= 0.0 {
      return None;
    }
  } else if (y3 < 0.0) == (y4 < 0.0) {
    return None;
  }
  if y4 == y3 {
    return None;
  }
  let pos = x4 + (x3 - x4) * y4 / (y4 - y3);
  if strict && (pos <= 0.0 || pos >= d) {
    return None;
  }
  Some(Point::new(p1.x + pos * dx / d, p1.y + pos * dy / d))
}

struct Builder<'m> {
  mesh: &'m Mesh,
  circum: Vec<Point>,
  point_of_tri: Vec<usize>,
  blind: HashMap<usize, Osub>,
  points: Vec<Point>,
}

impl<'m> Builder<'m> {
  fn push_point(&mut self, p: Point) -> usize {
    self.points.push(p);
    self.points.len() - 1
  }

  /// The intersection of the (extended) blinding segment with the dual
  /// edge from `from` to `to`.
  fn clip(&mut self, sub: Osub, from: &Point, to: &Point) -> Option<usize> {
    let so = self.mesh.pt(self.mesh.seg_org(sub));
    let sd = self.mesh.pt(self.mesh.seg_dest(sub));
    segments_intersect(&so, &sd, from, to, true).map(|p| self.push_point(p))
  }

  fn blinded(&self, ot: Otri) -> bool {
    self.mesh.tri(ot.tri).infected
  }

  /// Emits the dual contributions of the fan step from `f` to `f_next`:
  /// the circumcenter of `f` when visible, and the crossings of the dual
  /// edge with whatever blinds either triangle.
  fn emit_pair(&mut self, f: Otri, f_next: Otri, cell: &mut Vec<usize>) {
    let cc_f = self.circum[f.tri.0];
    let cc_next = self.circum[f_next.tri.0];
    if !self.blinded(f) {
      cell.push(self.point_of_tri[f.tri.0]);
      if self.blinded(f_next) {
        let sub = self.blind[&f_next.tri.0];
        if let Some(id) = self.clip(sub, &cc_f, &cc_next) {
          cell.push(id);
        }
      }
    } else {
      let sub1 = self.blind[&f.tri.0];
      if !self.blinded(f_next) {
        if let Some(id) = self.clip(sub1, &cc_f, &cc_next) {
          cell.push(id);
        }
      } else {
        let sub2 = self.blind[&f_next.tri.0];
        if sub1.sub != sub2.sub {
          // Blinded by different segments: the dual edge crosses both.
          if let Some(id) = self.clip(sub1, &cc_f, &cc_next) {
            cell.push(id);
          }
          if let Some(id) = self.clip(sub2, &cc_f, &cc_next) {
            cell.push(id);
          }
        }
      }
    }
  }

  /// The cell of an interior generator: walk the full fan, emitting each
  /// circumcenter clipped against blinding segments.
  fn construct_cell(&mut self, v: VertId) -> Vec<usize> {
    let f_init = self.mesh.vert(v).tri;
    let mut f = f_init;
    let mut f_next = self.mesh.onext(f);
    let mut cell = Vec::new();
    loop {
      self.emit_pair(f, f_next, &mut cell);
      f = f_next;
      f_next = self.mesh.onext(f_next);
      if f == f_init {
        break;
      }
    }
    cell
  }

  /// The cell of a hull generator: closed through the generator itself and
  /// the midpoints of its two hull edges.
  fn construct_boundary_cell(&mut self, v: VertId) -> Vec<usize> {
    let mut f = self.mesh.vert(v).tri;
    // Rotate clockwise to the hull.
    let mut f_prev = self.mesh.oprev(f);
    while !f_prev.is_dummy() {
      f = f_prev;
      f_prev = self.mesh.oprev(f);
    }

    let mut cell = Vec::new();
    let vertex_point = self.mesh.pt(v);
    let id = self.push_point(vertex_point);
    cell.push(id);

    // Midpoint of the clockwise-most hull edge.
    let first_mid = vertex_point.midpoint(&self.mesh.pt(self.mesh.dest(f)));
    let id = self.push_point(first_mid);
    cell.push(id);

    // Entering the fan across a blinding segment clips the run from the
    // midpoint to the first circumcenter.
    if self.blinded(f) {
      let sub = self.blind[&f.tri.0];
      let cc = self.circum[f.tri.0];
      if let Some(id) = self.clip(sub, &first_mid, &cc) {
        cell.push(id);
      }
    }

    let mut f_next = self.mesh.onext(f);
    while !f_next.is_dummy() {
      self.emit_pair(f, f_next, &mut cell);
      f = f_next;
      f_next = self.mesh.onext(f_next);
    }

    // The counterclockwise-most triangle and the midpoint of the last
    // hull edge close the cell.
    let last_mid = vertex_point.midpoint(&self.mesh.pt(self.mesh.apex(f)));
    let cc = self.circum[f.tri.0];
    if !self.blinded(f) {
      cell.push(self.point_of_tri[f.tri.0]);
    } else {
      let sub = self.blind[&f.tri.0];
      if let Some(id) = self.clip(sub, &cc, &last_mid) {
        cell.push(id);
      }
    }
    let id = self.push_point(last_mid);
    cell.push(id);
    cell
  }
}

impl Mesh {
  /// Builds the bounded Voronoi diagram dual to this mesh. Cells of
  /// boundary vertices are included when `include_boundary` is set.
  pub fn voronoi(&mut self, include_boundary: bool) -> BoundedVoronoi {
    self.renumber();
    self.make_vertex_map();
    let tri_ids = self.live_tri_ids();

    // One circumcenter per triangle, indexed by triangle slot, plus room
    // for the clip intersections.
    let mut circum = vec![Point::default(); self.tris.id_limit()];
    let mut point_of_tri = vec![usize::MAX; self.tris.id_limit()];
    let mut points = Vec::with_capacity(tri_ids.len() + 5 * self.subs.len());
    for &id in &tri_ids {
      let t = self.tri(id);
      let cc = predicates::circumcenter(
        &self.pt(t.v[0]),
        &self.pt(t.v[1]),
        &self.pt(t.v[2]),
        0.0,
        self.settings.no_exact,
      );
      self.stats.circumcenters += 1;
      circum[id.0] = cc.point;
      point_of_tri[id.0] = points.len();
      points.push(cc.point);
    }

    let blind = self.tag_blind_triangles(&circum);

    let mut builder = Builder {
      mesh: self,
      circum,
      point_of_tri,
      blind,
      points,
    };
    let mut generators = Vec::new();
    let mut regions = Vec::new();
    for i in 0..self.verts.len() {
      let v = VertId(i);
      let vert = self.vert(v);
      if vert.is_dead() || !self.vertex_map_valid(v) {
        continue;
      }
      let interior = vert.kind == crate::data::VertexKind::Free || vert.mark == 0;
      if !interior && !include_boundary {
        continue;
      }
      let cell = if interior {
        builder.construct_cell(v)
      } else {
        builder.construct_boundary_cell(v)
      };
      let generator = generators.len();
      generators.push(vert.point);
      regions.push(VoronoiRegion {
        generator,
        vertices: cell,
        bounded: interior,
      });
    }
    let vertices = builder.points;

    // The blinded flags ride on the transient infection bit; clear them.
    for &id in &tri_ids {
      self.tri_mut(id).infected = false;
    }

    BoundedVoronoi {
      generators,
      vertices,
      regions,
    }
  }

  /// Flood-fills the "blinded by this subsegment" flag from each
  /// subsegment's two adjoining triangles across unprotected edges.
  /// Returns the triangle-slot → blinding-subsegment map.
  fn tag_blind_triangles(&mut self, circum: &[Point]) -> HashMap<usize, Osub> {
    let mut blind = HashMap::new();
    for id in self.live_sub_ids() {
      let sub = Osub::new(id, 0);
      let mut stack = Vec::new();
      for side in [sub, sub.ssym()] {
        let f = self.sub_tri(side);
        if !f.is_dummy() && !self.tri(f.tri).infected {
          stack.push(f);
        }
      }
      while let Some(f) = stack.pop() {
        if self.tri(f.tri).infected {
          continue;
        }
        if !self.triangle_is_blinded(f, sub, circum) {
          continue;
        }
        self.tri_mut(f.tri).infected = true;
        blind.insert(f.tri.0, sub);
        for orient in 0..3 {
          let edge = Otri::new(f.tri, orient);
          if !self.tri_sub(edge).is_dummy() {
            continue;
          }
          let neighbor = self.sym(edge);
          if !neighbor.is_dummy() && !self.tri(neighbor.tri).infected {
            stack.push(neighbor);
          }
        }
      }
    }
    blind
  }

  /// True when the subsegment strictly intersects a line of sight from the
  /// triangle's circumcenter to one of its corners.
  fn triangle_is_blinded(&self, f: Otri, sub: Osub, circum: &[Point]) -> bool {
    let c = circum[f.tri.0];
    let so = self.pt(self.seg_org(sub));
    let sd = self.pt(self.seg_dest(sub));
    for corner in 0..3 {
      let p = self.pt(self.tri(f.tri).v[corner]);
      if segments_intersect(&so, &sd, &c, &p, true).is_some() {
        return true;
      }
    }
    false
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rotated_intersection() {
    let p = segments_intersect(
      &Point::new(0.0, 0.0),
      &Point::new(4.0, 0.0),
      &Point::new(1.0, -1.0),
      &Point::new(1.0, 3.0),
      true,
    )
    .unwrap();
    assert!((p.x - 1.0).abs() < 1e-12);
    assert!(p.y.abs() < 1e-12);
  }

  #[test]
  fn strict_mode_rejects_touches_and_misses() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(4.0, 0.0);
    // Touching endpoint.
    assert!(segments_intersect(&a, &b, &Point::new(1.0, 0.0), &Point::new(1.0, 2.0), true).is_none());
    // Crossing the supporting line beyond the segment.
    assert!(segments_intersect(&a, &b, &Point::new(5.0, -1.0), &Point::new(5.0, 1.0), true).is_none());
    // Same side.
    assert!(segments_intersect(&a, &b, &Point::new(1.0, 1.0), &Point::new(2.0, 2.0), true).is_none());
  }

  #[test]
  fn parallel_segments_do_not_intersect() {
    assert!(segments_intersect(
      &Point::new(0.0, 0.0),
      &Point::new(4.0, 0.0),
      &Point::new(0.0, 1.0),
      &Point::new(4.0, 1.0),
      true,
    )
    .is_none());
  }
}
