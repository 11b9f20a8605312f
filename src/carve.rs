//! Hole carving and region tagging.
//!
//! Both are flood fills over the `infected` flag. Hull infection eats the
//! concavities between the convex hull and the outermost constraint
//! segments; hole infection eats everything reachable from each hole seed.
//! The plague spreads across any edge not protected by a subsegment, then
//! kills every infected triangle, maintaining the hull size and orphaning
//! vertices whose every triangle died.

use std::collections::VecDeque;

use crate::data::VertexKind;
use crate::locate::PointLocation;
use crate::mesh::Mesh;
use crate::topology::{Otri, TriId, VertId};
use crate::Result;

impl Mesh {
  /// Carves holes and concavities out of a constrained triangulation and
  /// applies region ids and area bounds from the region seeds.
  pub(crate) fn carve_holes(&mut self) -> Result<()> {
    let mut viri: Vec<TriId> = Vec::new();

    if !self.settings.convex {
      self.infect_hull(&mut viri);
    }

    for i in 0..self.holes.len() {
      let hole = self.holes[i];
      // Ignore seeds outside the mesh's bounding box.
      if !self.bbox.contains(&hole) {
        continue;
      }
      // Start from the hull anchor; the seed must be on the mesh side of
      // that edge for the walk to make sense.
      let mut searchtri = self.hull_anchor();
      let searchorg = self.pt(self.org(searchtri));
      let searchdest = self.pt(self.dest(searchtri));
      if self.ccw(&searchorg, &searchdest, &hole) > 0.0 {
        let intersect = self.locate(&hole, &mut searchtri);
        if intersect != PointLocation::Outside && !self.tri(searchtri.tri).infected {
          self.tri_mut(searchtri.tri).infected = true;
          viri.push(searchtri.tri);
        }
      }
    }

    // Locate region seeds before carving; the triangles found are
    // validated again afterwards because the plague may eat them.
    let mut regiontris = vec![Otri::DUMMY; self.regions.len()];
    for i in 0..self.regions.len() {
      let seed = self.regions[i].point;
      if !self.bbox.contains(&seed) {
        continue;
      }
      let mut searchtri = self.hull_anchor();
      let searchorg = self.pt(self.org(searchtri));
      let searchdest = self.pt(self.dest(searchtri));
      if self.ccw(&searchorg, &searchdest, &seed) > 0.0 {
        let intersect = self.locate(&seed, &mut searchtri);
        if intersect != PointLocation::Outside && !self.tri(searchtri.tri).infected {
          regiontris[i] = searchtri;
        }
      }
    }

    if !viri.is_empty() {
      self.plague(&mut viri);
    }

    for i in 0..regiontris.len() {
      let rt = regiontris[i];
      if !rt.is_dummy() && !self.tri_is_dead(rt.tri) && !self.tri(rt.tri).infected {
        let id = self.regions[i].id;
        let area = if self.settings.var_area { self.regions[i].area } else { -1.0 };
        self.spread_region(rt, id, area);
      }
    }

    // The plague may have eaten the anchored triangle; re-park the anchor
    // on any surviving hull edge.
    self.refresh_hull_anchor();
    self.locator.reset();
    Ok(())
  }

  /// Infects every triangle on the convex hull that is not protected by a
  /// subsegment; protected hull subsegments and their endpoints get
  /// boundary mark 1.
  fn infect_hull(&mut self, viri: &mut Vec<TriId>) {
    let starttri = self.hull_anchor();
    if starttri.is_dummy() {
      return;
    }
    let mut hulltri = starttri;
    loop {
      if !self.tri(hulltri.tri).infected {
        let hullsubseg = self.tri_sub(hulltri);
        if hullsubseg.is_dummy() {
          self.tri_mut(hulltri.tri).infected = true;
          viri.push(hulltri.tri);
        } else if self.sub(hullsubseg.sub).mark == 0 {
          self.sub_mut(hullsubseg.sub).mark = 1;
          let horg = self.sorg(hullsubseg);
          let hdest = self.sdest(hullsubseg);
          if self.vert(horg).mark == 0 {
            self.vert_mut(horg).mark = 1;
          }
          if self.vert(hdest).mark == 0 {
            self.vert_mut(hdest).mark = 1;
          }
        }
      }
      // To find the next hull edge, go clockwise around the next vertex.
      hulltri = hulltri.lnext();
      let mut nexttri = self.oprev(hulltri);
      while !nexttri.is_dummy() {
        hulltri = nexttri;
        nexttri = self.oprev(hulltri);
      }
      if hulltri == starttri {
        break;
      }
    }
  }

  /// Spreads the infection across unprotected edges, then deallocates
  /// every infected triangle. Subsegments between two dying triangles die
  /// too; subsegments shielding a live triangle become boundary. Vertices
  /// whose entire fan died are marked undead.
  fn plague(&mut self, viri: &mut Vec<TriId>) {
    // First round: spread.
    let mut i = 0;
    while i < viri.len() {
      let t = viri[i];
      i += 1;
      for orient in 0..3 {
        let testtri = Otri::new(t, orient);
        let neighbor = self.sym(testtri);
        let neighborsubseg = self.tri_sub(testtri);
        if neighbor.is_dummy() || self.tri(neighbor.tri).infected {
          if !neighborsubseg.is_dummy() {
            // A subsegment with dying triangles on both sides dies too.
            self.subseg_dealloc(neighborsubseg.sub);
            if !neighbor.is_dummy() {
              // Keep the neighbor from freeing it a second time.
              self.ts_dissolve(neighbor);
            }
          }
        } else if neighborsubseg.is_dummy() {
          self.tri_mut(neighbor.tri).infected = true;
          viri.push(neighbor.tri);
        } else {
          // The neighbor is shielded; the subsegment becomes boundary.
          self.st_dissolve(neighborsubseg);
          if self.sub(neighborsubseg.sub).mark == 0 {
            self.sub_mut(neighborsubseg.sub).mark = 1;
          }
          let eorg = self.sorg(neighborsubseg);
          let edest = self.sdest(neighborsubseg);
          if self.vert(eorg).mark == 0 {
            self.vert_mut(eorg).mark = 1;
          }
          if self.vert(edest).mark == 0 {
            self.vert_mut(edest).mark = 1;
          }
        }
      }
    }

    // Second round: kill. Corners of dying triangles already tested by an
    // earlier walk are nulled out so each vertex is judged exactly once.
    for idx in 0..viri.len() {
      let t = viri[idx];
      for orient in 0..3 {
        let testtri = Otri::new(t, orient);
        let testvertex = self.org(testtri);
        if testvertex.is_none() || self.vert(testvertex).is_dead() {
          continue;
        }
        let mut killvertex = true;
        // Walk counterclockwise about the vertex, then clockwise if the
        // first walk hit a boundary.
        let mut neighbor = self.onext(testtri);
        while !neighbor.is_dummy() && neighbor != testtri {
          if self.tri(neighbor.tri).infected {
            self.set_org(neighbor, VertId::NONE);
          } else {
            killvertex = false;
          }
          neighbor = self.onext(neighbor);
        }
        if neighbor.is_dummy() {
          let mut neighbor = self.oprev(testtri);
          while !neighbor.is_dummy() {
            if self.tri(neighbor.tri).infected {
              self.set_org(neighbor, VertId::NONE);
            } else {
              killvertex = false;
            }
            neighbor = self.oprev(neighbor);
          }
        }
        if killvertex {
          self.vert_mut(testvertex).kind = VertexKind::Undead;
          self.undeads += 1;
        }
      }
      // Adjust the hull count and detach the survivors. An edge between
      // two dying triangles is counted up by the first and back down by
      // the second, netting zero.
      for orient in 0..3 {
        let neighbor = self.sym(Otri::new(t, orient));
        if neighbor.is_dummy() {
          self.hull_size -= 1;
        } else {
          self.dissolve(neighbor);
          self.hull_size += 1;
        }
      }
      self.triangle_dealloc(t);
    }
    viri.clear();
  }

  /// Breadth-first region spread from a seed triangle, stopping at
  /// subsegments. The `infected` flag doubles as the visited marker and is
  /// cleared before returning.
  fn spread_region(&mut self, start: Otri, id: i32, area: f64) {
    let mut queue = VecDeque::new();
    let mut visited = Vec::new();
    self.tri_mut(start.tri).infected = true;
    self.tri_mut(start.tri).region = id;
    if area > 0.0 {
      self.tri_mut(start.tri).area = area;
    }
    queue.push_back(start.tri);
    visited.push(start.tri);
    while let Some(t) = queue.pop_front() {
      for orient in 0..3 {
        let ot = Otri::new(t, orient);
        let neighbor = self.sym(ot);
        if neighbor.is_dummy() || self.tri(neighbor.tri).infected {
          continue;
        }
        if !self.tri_sub(ot).is_dummy() {
          continue;
        }
        self.tri_mut(neighbor.tri).infected = true;
        self.tri_mut(neighbor.tri).region = id;
        if area > 0.0 {
          self.tri_mut(neighbor.tri).area = area;
        }
        queue.push_back(neighbor.tri);
        visited.push(neighbor.tri);
      }
    }
    for t in visited {
      self.tri_mut(t).infected = false;
    }
  }

  pub(crate) fn refresh_hull_anchor(&mut self) {
    for id in self.live_tri_ids() {
      for orient in 0..3 {
        let ot = Otri::new(id, orient);
        if self.sym(ot).is_dummy() {
          self.set_hull_anchor(ot);
          return;
        }
      }
    }
    self.set_hull_anchor(Otri::DUMMY);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{Pslg, Settings};

  /// Outer 10x10 square with an inner 3..7 square hole.
  fn annulus() -> Pslg {
    let mut pslg = Pslg::new();
    pslg.add_point(0.0, 0.0); // 0
    pslg.add_point(10.0, 0.0); // 1
    pslg.add_point(10.0, 10.0); // 2
    pslg.add_point(0.0, 10.0); // 3
    pslg.add_point(3.0, 3.0); // 4
    pslg.add_point(7.0, 3.0); // 5
    pslg.add_point(7.0, 7.0); // 6
    pslg.add_point(3.0, 7.0); // 7
    for &(a, b) in &[(0, 1), (1, 2), (2, 3), (3, 0)] {
      pslg.add_segment(a, b, 0);
    }
    for &(a, b) in &[(4, 5), (5, 6), (6, 7), (7, 4)] {
      pslg.add_segment(a, b, 0);
    }
    pslg.add_hole(5.0, 5.0);
    pslg
  }

  fn carve(pslg: &Pslg) -> Mesh {
    let mut settings = Settings::default();
    settings.poly = true;
    let mut mesh = Mesh::new(pslg, &settings);
    mesh.build().unwrap();
    mesh.form_skeleton(pslg).unwrap();
    mesh.carve_holes().unwrap();
    mesh
  }

  fn centroid_inside_hole(mesh: &Mesh) -> bool {
    mesh.live_tri_ids().into_iter().any(|id| {
      let t = mesh.tri(id);
      let a = mesh.pt(t.v[0]);
      let b = mesh.pt(t.v[1]);
      let c = mesh.pt(t.v[2]);
      let cx = (a.x + b.x + c.x) / 3.0;
      let cy = (a.y + b.y + c.y) / 3.0;
      cx > 3.0 && cx < 7.0 && cy > 3.0 && cy < 7.0
    })
  }

  #[test]
  fn square_with_hole_becomes_annulus() {
    let mesh = carve(&annulus());
    assert!(mesh.triangle_count() > 0);
    assert!(mesh.check_mesh());
    assert!(mesh.check_delaunay());
    assert!(!centroid_inside_hole(&mesh));
    // All eight subsegments survive as boundary.
    assert_eq!(mesh.subseg_count(), 8);
    // Boundary vertices picked up mark 1 from hole infection.
    for v in 0..8 {
      assert_eq!(mesh.vert(VertId(v)).mark, 1);
    }
  }

  #[test]
  fn hull_size_matches_boundary_edges() {
    let mesh = carve(&annulus());
    let boundary_edges = mesh
      .live_tri_ids()
      .into_iter()
      .map(|id| {
        (0..3)
          .filter(|&orient| mesh.sym(Otri::new(id, orient)).is_dummy())
          .count()
      })
      .sum::<usize>();
    assert_eq!(mesh.hull_size(), boundary_edges);
  }

  #[test]
  fn no_holes_without_seed() {
    let mut pslg = annulus();
    pslg.holes.clear();
    let mesh = carve(&pslg);
    // The inner square stays triangulated.
    assert!(centroid_inside_hole(&mesh));
    assert!(mesh.check_mesh());
  }

  #[test]
  fn region_ids_spread_to_the_wall() {
    let mut pslg = annulus();
    pslg.holes.clear();
    pslg.add_region(5.0, 5.0, 42, -1.0);
    let mesh = carve(&pslg);
    for id in mesh.live_tri_ids() {
      let t = mesh.tri(id);
      let a = mesh.pt(t.v[0]);
      let b = mesh.pt(t.v[1]);
      let c = mesh.pt(t.v[2]);
      let cx = (a.x + b.x + c.x) / 3.0;
      let cy = (a.y + b.y + c.y) / 3.0;
      let inside = cx > 3.0 && cx < 7.0 && cy > 3.0 && cy < 7.0;
      assert_eq!(t.region == 42, inside, "region id stops at the wall");
      assert!(!t.infected);
    }
  }

  #[test]
  fn convex_mode_keeps_exterior_concavities() {
    // A non-convex PSLG boundary: an L-shape. In convex mode the carve
    // keeps the triangles between the L and its hull.
    let mut pslg = Pslg::new();
    for &(x, y) in &[
      (0.0, 0.0),
      (4.0, 0.0),
      (4.0, 2.0),
      (2.0, 2.0),
      (2.0, 4.0),
      (0.0, 4.0),
    ] {
      pslg.add_point(x, y);
    }
    for i in 0..6 {
      pslg.add_segment(i, (i + 1) % 6, 0);
    }
    let mut settings = Settings::default();
    settings.poly = true;
    settings.convex = true;
    let mut mesh = Mesh::new(&pslg, &settings);
    mesh.build().unwrap();
    mesh.form_skeleton(&pslg).unwrap();
    let before = mesh.triangle_count();
    mesh.carve_holes().unwrap();
    assert_eq!(mesh.triangle_count(), before);

    // Without convex mode the notch triangle is carved away.
    let mut settings = Settings::default();
    settings.poly = true;
    let mut mesh = Mesh::new(&pslg, &settings);
    mesh.build().unwrap();
    mesh.form_skeleton(&pslg).unwrap();
    mesh.carve_holes().unwrap();
    assert!(mesh.triangle_count() < before);
    assert!(mesh.check_mesh());
  }
}
