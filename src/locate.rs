//! Point location: stratified sampling over the triangle table to pick a
//! good starting triangle, then a straight-line walk toward the target.
//!
//! With Θ(n^⅓) samples the expected walk length is O(n^⅓) for uniformly
//! distributed vertices.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::data::Point;
use crate::mesh::Mesh;
use crate::topology::{Otri, TriId};

/// Where a query point landed relative to the triangle left in the search
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
  /// Strictly inside the triangle.
  InTriangle,
  /// Coincides with the triangle's origin.
  OnVertex,
  /// On the triangle's current edge, strictly between its endpoints.
  OnEdge,
  /// The walk left the triangulation (or was stopped by a subsegment); the
  /// handle points at the last triangle visited.
  Outside,
}

/// Number of strata s satisfies `11·s³ ≥ |triangles|`.
const SAMPLE_FACTOR: usize = 11;

/// Locator state: the last-known triangle, the stratified sampler's cached
/// key list, and its deterministically seeded generator.
pub(crate) struct Locator {
  pub(crate) last: Otri,
  samples: usize,
  keys: Vec<TriId>,
  keys_stamp: usize,
  rng: SmallRng,
}

impl Locator {
  pub fn new(seed: u64) -> Locator {
    Locator {
      last: Otri::DUMMY,
      samples: 1,
      keys: Vec::new(),
      keys_stamp: usize::MAX,
      rng: SmallRng::seed_from_u64(seed),
    }
  }

  pub fn reset(&mut self) {
    self.last = Otri::DUMMY;
    self.keys_stamp = usize::MAX;
  }
}

impl Mesh {
  /// Walks from `searchtri` toward `p` and classifies the final position.
  ///
  /// `searchtri` must be oriented so that `p` is to the left of its edge
  /// (callers establish this; [`Mesh::locate`] does it automatically).
  /// With `stop_at_subseg`, the walk refuses to cross constraint edges and
  /// reports `Outside` at the blocking triangle instead.
  pub(crate) fn precise_locate(
    &self,
    p: &Point,
    searchtri: &mut Otri,
    stop_at_subseg: bool,
  ) -> PointLocation {
    if searchtri.is_dummy() {
      return PointLocation::Outside;
    }
    let mut forg = self.pt(self.org(*searchtri));
    let mut fdest = self.pt(self.dest(*searchtri));
    let mut fapex = self.pt(self.apex(*searchtri));
    // During the walk the point stays strictly left of every entry edge, so
    // only the caller's starting edge can coincide with or contain it.
    if forg == *p {
      return PointLocation::OnVertex;
    }
    if fdest == *p {
      *searchtri = searchtri.lnext();
      return PointLocation::OnVertex;
    }
    if self.ccw(&forg, &fdest, p) == 0.0
      && ((forg.x < p.x) == (p.x < fdest.x))
      && ((forg.y < p.y) == (p.y < fdest.y))
    {
      return PointLocation::OnEdge;
    }
    loop {
      if fapex == *p {
        *searchtri = searchtri.lprev();
        return PointLocation::OnVertex;
      }
      // Which side of the two far edges is the point on?
      let destorient = self.ccw(&forg, &fapex, p);
      let orgorient = self.ccw(&fapex, &fdest, p);
      let moveleft;
      if destorient > 0.0 {
        if orgorient > 0.0 {
          // The point is beyond both far edges; break the tie with the
          // direction of travel so walks along collinear edges progress.
          moveleft =
            (fapex.x - p.x) * (fdest.x - forg.x) + (fapex.y - p.y) * (fdest.y - forg.y) > 0.0;
        } else {
          moveleft = true;
        }
      } else if orgorient > 0.0 {
        moveleft = false;
      } else {
        if destorient == 0.0 {
          *searchtri = searchtri.lprev();
          return PointLocation::OnEdge;
        }
        if orgorient == 0.0 {
          *searchtri = searchtri.lnext();
          return PointLocation::OnEdge;
        }
        return PointLocation::InTriangle;
      }

      // Cross into the next triangle, keeping a trace in case the walk
      // leaves the triangulation.
      let backtrack = if moveleft {
        fdest = fapex;
        searchtri.lprev()
      } else {
        forg = fapex;
        searchtri.lnext()
      };
      *searchtri = self.sym(backtrack);

      if self.check_segments && stop_at_subseg && !self.tri_sub(backtrack).is_dummy() {
        *searchtri = backtrack;
        return PointLocation::Outside;
      }
      if searchtri.is_dummy() {
        *searchtri = backtrack;
        return PointLocation::Outside;
      }
      fapex = self.pt(self.apex(*searchtri));
    }
  }

  /// Full point location: consult the last-triangle cache, draw stratified
  /// samples to find a close starting triangle, orient it toward `p`, and
  /// walk.
  pub(crate) fn locate(&mut self, p: &Point, searchtri: &mut Otri) -> PointLocation {
    if searchtri.is_dummy() || self.tri_is_dead(searchtri.tri) {
      *searchtri = self.hull_anchor();
      if searchtri.is_dummy() {
        return PointLocation::Outside;
      }
    }
    let mut torg = self.pt(self.org(*searchtri));
    let mut searchdist = torg.distance_sq(p);

    // The triangle touched most recently is often close to the next query.
    let last = self.locator.last;
    if !last.is_dummy() && !self.tri_is_dead(last.tri) {
      let lorg = self.org(last);
      if !lorg.is_none() {
        if self.pt(lorg) == *p {
          *searchtri = last;
          return PointLocation::OnVertex;
        }
        let dist = self.pt(lorg).distance_sq(p);
        if dist < searchdist {
          *searchtri = last;
          searchdist = dist;
        }
      }
    }

    // Resize the sampler to the current table, refreshing the cached key
    // list whenever the table's population changed.
    while SAMPLE_FACTOR * self.locator.samples * self.locator.samples * self.locator.samples
      < self.tris.len()
    {
      self.locator.samples += 1;
    }
    if self.locator.keys_stamp != self.tris.len() {
      self.locator.keys = self.live_tri_ids();
      self.locator.keys_stamp = self.tris.len();
    }

    let population = self.locator.keys.len();
    if population > 0 {
      let strata = self.locator.samples.min(population);
      for i in 0..strata {
        let lo = i * population / strata;
        let hi = ((i + 1) * population / strata).max(lo + 1);
        let mut id = TriId::DUMMY;
        // The cache may hold triangles deallocated since the last refresh;
        // redraw a few times before giving up on the stratum.
        for _ in 0..3 {
          let draw = self.locator.rng.gen_range(lo..hi);
          let pick = self.locator.keys[draw];
          if !self.tri_is_dead(pick) {
            id = pick;
            break;
          }
        }
        if id == TriId::DUMMY {
          continue;
        }
        let sample = Otri::new(id, 0);
        let sorg = self.org(sample);
        if sorg.is_none() {
          continue;
        }
        let dist = self.pt(sorg).distance_sq(p);
        if dist < searchdist {
          *searchtri = sample;
          searchdist = dist;
        }
      }
    }

    torg = self.pt(self.org(*searchtri));
    let tdest = self.pt(self.dest(*searchtri));
    if torg == *p {
      return PointLocation::OnVertex;
    }
    if tdest == *p {
      *searchtri = searchtri.lnext();
      return PointLocation::OnVertex;
    }

    let ahead = self.ccw(&torg, &tdest, p);
    if ahead < 0.0 {
      // The point is to the right; start the walk from the other side.
      let flipped = self.sym(*searchtri);
      if flipped.is_dummy() {
        return PointLocation::Outside;
      }
      *searchtri = flipped;
    } else if ahead == 0.0
      && ((torg.x < p.x) == (p.x < tdest.x))
      && ((torg.y < p.y) == (p.y < tdest.y))
    {
      return PointLocation::OnEdge;
    }
    self.precise_locate(p, searchtri, false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{Pslg, Settings};
  use crate::topology::VertId;

  /// Two triangles sharing the diagonal (1, 2) of the unit square.
  fn square_mesh() -> (Mesh, Otri, Otri) {
    let mut pslg = Pslg::new();
    pslg.add_point(0.0, 0.0);
    pslg.add_point(1.0, 0.0);
    pslg.add_point(0.0, 1.0);
    pslg.add_point(1.0, 1.0);
    let mut mesh = Mesh::new(&pslg, &Settings::default());
    let a = mesh.make_triangle();
    let b = mesh.make_triangle();
    mesh.set_org(a, VertId(0));
    mesh.set_dest(a, VertId(1));
    mesh.set_apex(a, VertId(2));
    mesh.set_org(b, VertId(3));
    mesh.set_dest(b, VertId(2));
    mesh.set_apex(b, VertId(1));
    // Shared edge runs 1→2 in a and 2→1 in b.
    mesh.bond(a.lnext(), b.lnext());
    mesh.set_hull_anchor(a);
    (mesh, a, b)
  }

  #[test]
  fn precise_locate_classifies_positions() {
    let (mesh, a, b) = square_mesh();
    let mut s = a;
    assert_eq!(
      mesh.precise_locate(&Point::new(0.25, 0.25), &mut s, false),
      PointLocation::InTriangle
    );
    assert_eq!(s.tri, a.tri);

    let mut s = a;
    assert_eq!(
      mesh.precise_locate(&Point::new(0.75, 0.75), &mut s, false),
      PointLocation::InTriangle
    );
    assert_eq!(s.tri, b.tri);

    let mut s = a;
    assert_eq!(
      mesh.precise_locate(&Point::new(0.5, 0.5), &mut s, false),
      PointLocation::OnEdge
    );

    let mut s = a;
    assert_eq!(
      mesh.precise_locate(&Point::new(0.0, 1.0), &mut s, false),
      PointLocation::OnVertex
    );
    assert_eq!(mesh.org(s), VertId(2));

    let mut s = a;
    assert_eq!(
      mesh.precise_locate(&Point::new(2.0, 2.0), &mut s, false),
      PointLocation::Outside
    );
  }

  #[test]
  fn walk_stops_at_subsegment_when_asked() {
    let (mut mesh, a, _b) = square_mesh();
    mesh.check_segments = true;
    mesh.insert_subseg(a.lnext(), 1);
    let mut s = a;
    assert_eq!(
      mesh.precise_locate(&Point::new(0.75, 0.75), &mut s, true),
      PointLocation::Outside
    );
    assert_eq!(s.tri, a.tri);
  }

  #[test]
  fn locate_finds_vertices_exactly() {
    let (mut mesh, a, _b) = square_mesh();
    let mut s = a;
    assert_eq!(
      mesh.locate(&Point::new(1.0, 0.0), &mut s),
      PointLocation::OnVertex
    );
    assert_eq!(mesh.pt(mesh.org(s)), Point::new(1.0, 0.0));
  }
}
