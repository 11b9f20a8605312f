//! Forcing constraint segments into the triangulation.
//!
//! Each input segment is first scouted: if it already appears as an edge
//! (possibly after walking across collinear vertices) it is simply marked.
//! Otherwise every triangulation edge crossing it is deleted by a flip,
//! digging a path from one endpoint to the other; the two evacuated
//! half-polygons are re-legalized afterwards. A segment that crosses
//! another segment is split at the intersection point.

use log::debug;

use crate::data::{Pslg, Vertex, VertexKind};
use crate::insert::InsertOutcome;
use crate::locate::PointLocation;
use crate::mesh::Mesh;
use crate::topology::{Osub, Otri, VertId};
use crate::{Error, Result};

/// Where a target vertex lies relative to the wedge of triangles around a
/// handle's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
  /// Within the wedge of the handle's triangle.
  Within,
  /// On the ray through the handle's apex.
  LeftCollinear,
  /// On the ray through the handle's destination.
  RightCollinear,
}

impl Mesh {
  /// Installs every input segment as a chain of subsegments. Requires a
  /// built triangulation.
  pub(crate) fn form_skeleton(&mut self, pslg: &Pslg) -> Result<()> {
    self.check_segments = true;
    if self.tris.len() == 0 {
      return Ok(());
    }
    self.make_vertex_map();
    for seg in &pslg.segments {
      let end1 = VertId(seg.p0);
      let end2 = VertId(seg.p1);
      if self.pt(end1) == self.pt(end2) {
        debug!("skipping zero-length segment between duplicate points");
        continue;
      }
      let mark = if self.settings.use_boundary_markers { seg.mark } else { 0 };
      self.insert_segment(end1, end2, mark)?;
    }
    Ok(())
  }

  /// Rotates `searchtri` around its origin until the wedge between its
  /// destination and apex contains `target`.
  fn find_direction(&mut self, searchtri: &mut Otri, target: VertId) -> Result<Direction> {
    let startvertex = self.org(*searchtri);
    let mut rightvertex = self.dest(*searchtri);
    let mut leftvertex = self.apex(*searchtri);
    let mut leftccw = self.ccw_v(target, startvertex, leftvertex);
    let mut leftflag = leftccw > 0.0;
    let mut rightccw = self.ccw_v(startvertex, target, rightvertex);
    let mut rightflag = rightccw > 0.0;
    if leftflag && rightflag {
      // The handle faces directly away from the target; pick a turning
      // direction that will not immediately leave the triangulation.
      let checktri = self.onext(*searchtri);
      if checktri.is_dummy() {
        leftflag = false;
      } else {
        rightflag = false;
      }
    }
    while leftflag {
      // Turn left until satisfied.
      *searchtri = self.onext(*searchtri);
      if searchtri.is_dummy() {
        return Err(Error::TopologyInconsistency);
      }
      leftvertex = self.apex(*searchtri);
      rightccw = leftccw;
      leftccw = self.ccw_v(target, startvertex, leftvertex);
      leftflag = leftccw > 0.0;
    }
    while rightflag {
      // Turn right until satisfied.
      *searchtri = self.oprev(*searchtri);
      if searchtri.is_dummy() {
        return Err(Error::TopologyInconsistency);
      }
      rightvertex = self.dest(*searchtri);
      leftccw = rightccw;
      rightccw = self.ccw_v(startvertex, target, rightvertex);
      rightflag = rightccw > 0.0;
    }
    if leftccw == 0.0 {
      Ok(Direction::LeftCollinear)
    } else if rightccw == 0.0 {
      Ok(Direction::RightCollinear)
    } else {
      Ok(Direction::Within)
    }
  }

  /// Splits the subsegment on `splittri`'s current edge at its
  /// intersection with the segment from `splittri`'s apex to `endpoint2`.
  /// On return `splittri`'s origin is the new vertex and its destination
  /// is the old apex.
  fn segment_intersection(
    &mut self,
    splittri: &mut Otri,
    splitsubseg: Osub,
    endpoint2: VertId,
  ) -> Result<()> {
    let endpoint1 = self.apex(*splittri);
    let torg = self.pt(self.org(*splittri));
    let tdest = self.pt(self.dest(*splittri));
    let p1 = self.pt(endpoint1);
    let p2 = self.pt(endpoint2);

    let ex = tdest.x - torg.x;
    let ey = tdest.y - torg.y;
    let tx = p2.x - p1.x;
    let ty = p2.y - p1.y;
    let denom = ex * ty - ey * tx;
    if denom == 0.0 {
      return Err(Error::TopologyInconsistency);
    }
    let split = ((p1.x - torg.x) * ty - (p1.y - torg.y) * tx) / denom;

    // Interpolate along the split subsegment, attributes included.
    let org_id = self.org(*splittri);
    let dest_id = self.dest(*splittri);
    let point = crate::data::Point::new(torg.x + split * ex, torg.y + split * ey);
    let attrs: Vec<f64> = self
      .vert(org_id)
      .attrs
      .iter()
      .zip(self.vert(dest_id).attrs.iter())
      .map(|(a, b)| a + split * (b - a))
      .collect();
    let mark = self.sub(splitsubseg.sub).mark;
    self
      .verts
      .push(Vertex::new(point, mark, VertexKind::Segment, attrs));
    let newvertex = VertId(self.verts.len() - 1);

    match self.insert_vertex(newvertex, splittri, Some(splitsubseg), false, false)? {
      InsertOutcome::Successful => {}
      InsertOutcome::Duplicate => return Err(Error::PrecisionExhausted),
      _ => return Err(Error::TopologyInconsistency),
    }
    if self.steiner_left > 0 {
      self.steiner_left -= 1;
    }

    // Flips may have moved things; rediscover the edge back to endpoint1.
    self.find_direction(splittri, endpoint1)?;
    let rightvertex = self.dest(*splittri);
    let leftvertex = self.apex(*splittri);
    if leftvertex == endpoint1 {
      *splittri = self.onext(*splittri);
    } else if rightvertex != endpoint1 {
      return Err(Error::TopologyInconsistency);
    }
    Ok(())
  }

  /// Tries to walk from `searchtri`'s origin toward `endpoint2`, marking
  /// the segment's edges as it goes. Returns true when the segment (or its
  /// remainder) was fully installed, false when a crossing edge must be
  /// dug out by [`Mesh::constrained_edge`].
  fn scout_segment(&mut self, searchtri: &mut Otri, endpoint2: VertId, newmark: i32) -> Result<bool> {
    let collinear = self.find_direction(searchtri, endpoint2)?;
    let rightvertex = self.dest(*searchtri);
    let leftvertex = self.apex(*searchtri);
    if leftvertex == endpoint2 || rightvertex == endpoint2 {
      // The segment is already an edge of the triangulation.
      if leftvertex == endpoint2 {
        *searchtri = searchtri.lprev();
      }
      self.insert_subseg(*searchtri, newmark);
      return Ok(true);
    }
    match collinear {
      Direction::LeftCollinear => {
        // Collided with a vertex between the endpoints; mark the leg
        // behind it and continue from it.
        *searchtri = searchtri.lprev();
        self.insert_subseg(*searchtri, newmark);
        self.scout_segment(searchtri, endpoint2, newmark)
      }
      Direction::RightCollinear => {
        self.insert_subseg(*searchtri, newmark);
        *searchtri = searchtri.lnext();
        self.scout_segment(searchtri, endpoint2, newmark)
      }
      Direction::Within => {
        let crosstri = searchtri.lnext();
        let crosssubseg = self.tri_sub(crosstri);
        if crosssubseg.is_dummy() {
          Ok(false)
        } else {
          // The segment crosses another segment; split both at the
          // intersection and carry on from the new vertex.
          let mut crosstri = crosstri;
          self.segment_intersection(&mut crosstri, crosssubseg, endpoint2)?;
          *searchtri = crosstri;
          self.insert_subseg(*searchtri, newmark);
          self.scout_segment(searchtri, endpoint2, newmark)
        }
      }
    }
  }

  /// Restores the Delaunay property among the triangles lining one side of
  /// a freshly dug segment cavity.
  fn delaunay_fixup(&mut self, fixuptri: &mut Otri, leftside: bool) {
    let neartri = fixuptri.lnext();
    let fartri = self.sym(neartri);
    if fartri.is_dummy() {
      return;
    }
    let faredge = self.tri_sub(neartri);
    if !faredge.is_dummy() {
      return;
    }
    let nearvertex = self.apex(neartri);
    let leftvertex = self.org(neartri);
    let rightvertex = self.dest(neartri);
    let farvertex = self.apex(fartri);

    if leftside {
      if self.ccw_v(nearvertex, leftvertex, farvertex) <= 0.0 {
        // farvertex is not a reflex vertex of the cavity and fartri is
        // not inverted; leave the edge.
        return;
      }
    } else if self.ccw_v(farvertex, rightvertex, nearvertex) <= 0.0 {
      return;
    }
    if self.ccw_v(rightvertex, leftvertex, farvertex) > 0.0 {
      // fartri is not inverted; the edge stays if it is locally Delaunay.
      if self.incircle_v(leftvertex, farvertex, rightvertex, nearvertex) <= 0.0 {
        return;
      }
    }
    self.flip(neartri);
    *fixuptri = fixuptri.lprev();
    let mut fartri = fartri;
    self.delaunay_fixup(fixuptri, leftside);
    self.delaunay_fixup(&mut fartri, leftside);
  }

  /// Digs the segment from `starttri`'s origin to `endpoint2` through the
  /// triangulation, deleting every crossing edge by a flip, and installs
  /// the subsegment. Collisions with intervening vertices or crossing
  /// segments leave the remainder to a recursive call.
  fn constrained_edge(&mut self, starttri: &mut Otri, endpoint2: VertId, newmark: i32) -> Result<()> {
    let endpoint1 = self.org(*starttri);
    let mut fixuptri = starttri.lnext();
    self.flip(fixuptri);

    let mut collision = false;
    loop {
      let farvertex = self.org(fixuptri);
      if farvertex == endpoint2 {
        let mut fixuptri2 = self.oprev(fixuptri);
        self.delaunay_fixup(&mut fixuptri, false);
        self.delaunay_fixup(&mut fixuptri2, true);
        break;
      }
      let area = self.ccw_v(endpoint1, endpoint2, farvertex);
      if area == 0.0 {
        // Collided with a vertex lying on the segment.
        collision = true;
        let mut fixuptri2 = self.oprev(fixuptri);
        self.delaunay_fixup(&mut fixuptri, false);
        self.delaunay_fixup(&mut fixuptri2, true);
        break;
      }
      if area > 0.0 {
        // farvertex is to the left of the segment.
        let mut fixuptri2 = self.oprev(fixuptri);
        self.delaunay_fixup(&mut fixuptri2, true);
        fixuptri = fixuptri.lprev();
      } else {
        self.delaunay_fixup(&mut fixuptri, false);
        fixuptri = self.oprev(fixuptri);
      }
      let crosssubseg = self.tri_sub(fixuptri);
      if crosssubseg.is_dummy() {
        self.flip(fixuptri);
      } else {
        // The segment being inserted crosses another segment.
        collision = true;
        self.segment_intersection(&mut fixuptri, crosssubseg, endpoint2)?;
        break;
      }
    }
    self.insert_subseg(fixuptri, newmark);
    if collision && !self.scout_segment(&mut fixuptri, endpoint2, newmark)? {
      self.constrained_edge(&mut fixuptri, endpoint2, newmark)?;
    }
    Ok(())
  }

  /// Forces the segment between two input vertices into the mesh.
  fn insert_segment(&mut self, endpoint1: VertId, endpoint2: VertId, newmark: i32) -> Result<()> {
    // Find a triangle whose origin is the first endpoint, preferring the
    // vertex's own hint over full point location.
    let mut searchtri1 = if self.vertex_map_valid(endpoint1) {
      self.vert(endpoint1).tri
    } else {
      let mut s = Otri::DUMMY;
      let p = self.pt(endpoint1);
      if self.locate(&p, &mut s) != PointLocation::OnVertex {
        return Err(Error::TopologyInconsistency);
      }
      s
    };
    // Duplicate inputs were dropped; land on the surviving twin.
    let endpoint1 = self.org(searchtri1);
    self.locator.last = searchtri1;
    if self.scout_segment(&mut searchtri1, endpoint2, newmark)? {
      return Ok(());
    }
    // Scouting may have advanced past collinear vertices.
    let endpoint1 = self.org(searchtri1);

    let mut searchtri2 = if self.vertex_map_valid(endpoint2) {
      self.vert(endpoint2).tri
    } else {
      let mut s = Otri::DUMMY;
      let p = self.pt(endpoint2);
      if self.locate(&p, &mut s) != PointLocation::OnVertex {
        return Err(Error::TopologyInconsistency);
      }
      s
    };
    let endpoint2 = self.org(searchtri2);
    self.locator.last = searchtri2;
    if self.scout_segment(&mut searchtri2, endpoint1, newmark)? {
      return Ok(());
    }
    let endpoint2 = self.org(searchtri2);

    self.constrained_edge(&mut searchtri1, endpoint2, newmark)
  }
}
