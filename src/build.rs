//! Delaunay construction: Dwyer's divide-and-conquer with alternating
//! cuts, and incremental insertion inside a distant bounding triangle.
//!
//! Both constructors satisfy the same contract: triangulate the input
//! vertex table and leave the hull anchor on a convex hull edge.
//!
//! The divide-and-conquer recursion brackets every sub-triangulation with a
//! ring of ghost triangles (apex at infinity) so that merging only ever
//! manipulates triangles. The ghosts are stripped at the end, which also
//! counts the hull.

use log::debug;
use ordered_float::OrderedFloat;

use crate::data::{Algorithm, Point, Vertex, VertexKind};
use crate::insert::InsertOutcome;
use crate::mesh::Mesh;
use crate::topology::{Otri, VertId};
use crate::{Error, Result};

impl Mesh {
  /// Runs the configured construction algorithm and establishes
  /// `hull_size`. With fewer than three distinct vertices, or all vertices
  /// collinear, the mesh ends up with zero triangles and a degenerate hull
  /// of `live vertices − 1` edges.
  pub(crate) fn build(&mut self) -> Result<()> {
    let hullsize = match self.settings.algorithm {
      Algorithm::Dwyer => self.dwyer()?,
      Algorithm::SweepLine => {
        debug!("sweep-line requested; delegating to divide-and-conquer");
        self.dwyer()?
      }
      Algorithm::Incremental => self.incremental()?,
    };
    self.hull_size = hullsize;
    if self.tris.len() == 0 {
      self.hull_size = self.live_vertex_count().saturating_sub(1);
      self.set_hull_anchor(Otri::DUMMY);
    }
    self.locator.reset();
    debug!(
      "constructed {} triangles, hull size {}, {} discarded duplicates",
      self.tris.len(),
      self.hull_size,
      self.undeads
    );
    Ok(())
  }

  // -------------------------------------------------------------------
  // Dwyer divide-and-conquer

  fn dwyer(&mut self) -> Result<usize> {
    let mut ids: Vec<VertId> = (0..self.verts.len())
      .map(VertId)
      .filter(|&v| !self.vert(v).is_dead())
      .collect();
    ids.sort_unstable_by(|&a, &b| {
      let pa = self.pt(a);
      let pb = self.pt(b);
      (OrderedFloat(pa.x), OrderedFloat(pa.y)).cmp(&(OrderedFloat(pb.x), OrderedFloat(pb.y)))
    });

    // Discard duplicates; they would wreck the merge.
    let mut sorted: Vec<VertId> = Vec::with_capacity(ids.len());
    for v in ids {
      match sorted.last() {
        Some(&prev) if self.pt(prev) == self.pt(v) => {
          self.vert_mut(v).kind = VertexKind::Undead;
          self.undeads += 1;
        }
        _ => sorted.push(v),
      }
    }
    if sorted.len() < 2 {
      return Ok(0);
    }

    // Re-partition for alternating cuts: the top split is vertical (the
    // array is x-sorted), each subarray is then split along the other axis.
    let divider = sorted.len() >> 1;
    if sorted.len() - divider >= 2 {
      if divider >= 2 {
        self.alternate_axes(&mut sorted[..divider], 1);
      }
      self.alternate_axes(&mut sorted[divider..], 1);
    }

    let (farleft, _farright) = self.divconq_recurse(&sorted, 0);
    Ok(self.remove_ghosts(farleft))
  }

  /// Quick-select partitioning so `ids[..median]` precedes `ids[median..]`
  /// along `axis`, then recursive cross cuts.
  fn alternate_axes(&self, ids: &mut [VertId], axis: usize) {
    let len = ids.len();
    let divider = len >> 1;
    // Subsets of three or fewer are consumed directly by the recursion
    // base cases, which expect x order.
    let axis = if len <= 3 { 0 } else { axis };
    self.vertex_median(ids, divider, axis);
    if len - divider >= 2 {
      if divider >= 2 {
        self.alternate_axes(&mut ids[..divider], 1 - axis);
      }
      self.alternate_axes(&mut ids[divider..], 1 - axis);
    }
  }

  fn vertex_median(&self, ids: &mut [VertId], median: usize, axis: usize) {
    if median >= ids.len() {
      return;
    }
    ids.select_nth_unstable_by(median, |&a, &b| {
      let pa = self.pt(a);
      let pb = self.pt(b);
      let ka = if axis == 0 {
        (OrderedFloat(pa.x), OrderedFloat(pa.y))
      } else {
        (OrderedFloat(pa.y), OrderedFloat(pa.x))
      };
      let kb = if axis == 0 {
        (OrderedFloat(pb.x), OrderedFloat(pb.y))
      } else {
        (OrderedFloat(pb.y), OrderedFloat(pb.x))
      };
      ka.cmp(&kb)
    });
  }

  /// Triangulates `sorted`, returning the bounding-ghost handles whose
  /// origin (resp. destination) is the leftmost (resp. rightmost) vertex.
  fn divconq_recurse(&mut self, sorted: &[VertId], axis: usize) -> (Otri, Otri) {
    match sorted.len() {
      2 => {
        // A single edge, bracketed by two ghosts.
        let lefttri = self.make_triangle();
        let righttri = self.make_triangle();
        self.set_org(lefttri, sorted[0]);
        self.set_dest(lefttri, sorted[1]);
        self.set_org(righttri, sorted[1]);
        self.set_dest(righttri, sorted[0]);
        self.bond(lefttri, righttri);
        self.bond(lefttri.lprev(), righttri.lnext());
        self.bond(lefttri.lprev().lprev(), righttri.lnext().lnext());
        let farright = righttri.lnext().lnext();
        (farright.lprev(), farright)
      }
      3 => {
        let midtri = self.make_triangle();
        let tri1 = self.make_triangle();
        let tri2 = self.make_triangle();
        let tri3 = self.make_triangle();
        let area = self.ccw_v(sorted[0], sorted[1], sorted[2]);
        if area == 0.0 {
          // Three collinear vertices: two edges, four ghosts.
          self.set_org(midtri, sorted[0]);
          self.set_dest(midtri, sorted[1]);
          self.set_org(tri1, sorted[1]);
          self.set_dest(tri1, sorted[0]);
          self.set_org(tri2, sorted[2]);
          self.set_dest(tri2, sorted[1]);
          self.set_org(tri3, sorted[1]);
          self.set_dest(tri3, sorted[2]);
          self.bond(midtri, tri1);
          self.bond(tri2, tri3);
          self.bond(midtri.lnext(), tri3.lprev());
          self.bond(tri1.lprev(), tri2.lnext());
          self.bond(midtri.lnext().lnext(), tri1.lprev().lprev());
          self.bond(tri2.lnext().lnext(), tri3.lprev().lprev());
          (Otri::new(tri1.tri, 1), Otri::new(tri2.tri, 2))
        } else {
          // One real triangle ringed by three ghosts.
          self.set_org(midtri, sorted[0]);
          self.set_dest(tri1, sorted[0]);
          self.set_org(tri3, sorted[0]);
          if area > 0.0 {
            self.set_dest(midtri, sorted[1]);
            self.set_org(tri1, sorted[1]);
            self.set_dest(tri2, sorted[1]);
            self.set_apex(midtri, sorted[2]);
            self.set_org(tri2, sorted[2]);
            self.set_dest(tri3, sorted[2]);
          } else {
            self.set_dest(midtri, sorted[2]);
            self.set_org(tri1, sorted[2]);
            self.set_dest(tri2, sorted[2]);
            self.set_apex(midtri, sorted[1]);
            self.set_org(tri2, sorted[1]);
            self.set_dest(tri3, sorted[1]);
          }
          self.bond(midtri, tri1);
          self.bond(midtri.lnext(), tri2);
          self.bond(midtri.lnext().lnext(), tri3);
          self.bond(tri1.lprev(), tri2.lnext());
          self.bond(Otri::new(tri1.tri, 1), Otri::new(tri3.tri, 2));
          self.bond(Otri::new(tri2.tri, 2), Otri::new(tri3.tri, 1));
          let farleft = Otri::new(tri1.tri, 1);
          let farright = if area > 0.0 {
            Otri::new(tri2.tri, 2)
          } else {
            farleft.lnext()
          };
          (farleft, farright)
        }
      }
      len => {
        let divider = len >> 1;
        let (farleft, innerleft) = self.divconq_recurse(&sorted[..divider], 1 - axis);
        let (innerright, farright) = self.divconq_recurse(&sorted[divider..], 1 - axis);
        self.merge_hulls(farleft, innerleft, innerright, farright, axis)
      }
    }
  }

  /// Knits two adjacent triangulations along their facing tangent. All
  /// four handles are bounding ghosts; the returned pair brackets the
  /// union.
  fn merge_hulls(
    &mut self,
    mut farleft: Otri,
    mut innerleft: Otri,
    mut innerright: Otri,
    mut farright: Otri,
    axis: usize,
  ) -> (Otri, Otri) {
    let mut innerleftdest = self.dest(innerleft);
    let mut innerleftapex = self.apex(innerleft);
    let mut innerrightorg = self.org(innerright);
    let mut innerrightapex = self.apex(innerright);

    // For a horizontal cut, swing the extreme handles from leftmost and
    // rightmost to bottommost and topmost.
    if axis == 1 {
      let mut farleftpt = self.pt(self.org(farleft));
      let mut farleftapex = self.pt(self.apex(farleft));
      while farleftapex.y < farleftpt.y {
        farleft = self.sym(farleft.lnext());
        farleftpt = farleftapex;
        farleftapex = self.pt(self.apex(farleft));
      }
      let mut checkedge = self.sym(innerleft);
      let mut checkvertex = self.apex(checkedge);
      while self.pt(checkvertex).y > self.pt(innerleftdest).y {
        innerleft = checkedge.lnext();
        innerleftapex = innerleftdest;
        innerleftdest = checkvertex;
        checkedge = self.sym(innerleft);
        checkvertex = self.apex(checkedge);
      }
      while self.pt(innerrightapex).y < self.pt(innerrightorg).y {
        innerright = self.sym(innerright.lnext());
        innerrightorg = innerrightapex;
        innerrightapex = self.apex(innerright);
      }
      let mut checkedge = self.sym(farright);
      let mut checkvertex = self.apex(checkedge);
      let mut farrightpt = self.pt(self.dest(farright));
      while self.pt(checkvertex).y > farrightpt.y {
        farright = checkedge.lnext();
        farrightpt = self.pt(checkvertex);
        checkedge = self.sym(farright);
        checkvertex = self.apex(checkedge);
      }
    }

    // Find the lower common tangent of the two hulls.
    loop {
      let mut changemade = false;
      if self.ccw_v(innerleftdest, innerleftapex, innerrightorg) > 0.0 {
        innerleft = self.sym(innerleft.lprev());
        innerleftdest = innerleftapex;
        innerleftapex = self.apex(innerleft);
        changemade = true;
      }
      if self.ccw_v(innerrightapex, innerrightorg, innerleftdest) > 0.0 {
        innerright = self.sym(innerright.lnext());
        innerrightorg = innerrightapex;
        innerrightapex = self.apex(innerright);
        changemade = true;
      }
      if !changemade {
        break;
      }
    }

    let mut leftcand = self.sym(innerleft);
    let mut rightcand = self.sym(innerright);

    // The bottom new bounding triangle.
    let mut baseedge = self.make_triangle();
    self.bond(baseedge, innerleft);
    baseedge = baseedge.lnext();
    self.bond(baseedge, innerright);
    baseedge = baseedge.lnext();
    self.set_org(baseedge, innerrightorg);
    self.set_dest(baseedge, innerleftdest);

    // Fix the extreme handles if one hull was consumed down to its corner.
    if self.org(farleft) == innerleftdest {
      farleft = baseedge.lnext();
    }
    if self.dest(farright) == innerrightorg {
      farright = baseedge.lprev();
    }

    let mut lowerleft = innerleftdest;
    let mut lowerright = innerrightorg;
    let mut upperleft = self.apex(leftcand);
    let mut upperright = self.apex(rightcand);

    // Walk up the gap between the triangulations, knitting them together.
    loop {
      let leftfinished = self.ccw_v(upperleft, lowerleft, lowerright) <= 0.0;
      let rightfinished = self.ccw_v(upperright, lowerleft, lowerright) <= 0.0;
      if leftfinished && rightfinished {
        // The top new bounding triangle.
        let nextedge = self.make_triangle();
        self.set_org(nextedge, lowerleft);
        self.set_dest(nextedge, lowerright);
        self.bond(nextedge, baseedge);
        self.bond(nextedge.lnext(), rightcand);
        self.bond(nextedge.lnext().lnext(), leftcand);

        // For a horizontal cut, restore the extreme handles from topmost
        // and bottommost to leftmost and rightmost.
        if axis == 1 {
          let mut farleftpt = self.pt(self.org(farleft));
          let mut checkedge = self.sym(farleft);
          let mut checkvertex = self.apex(checkedge);
          while self.pt(checkvertex).x < farleftpt.x {
            farleft = checkedge.lprev();
            farleftpt = self.pt(checkvertex);
            checkedge = self.sym(farleft);
            checkvertex = self.apex(checkedge);
          }
          let mut farrightpt = self.pt(self.dest(farright));
          let mut farrightapex = self.pt(self.apex(farright));
          while farrightapex.x > farrightpt.x {
            farright = self.sym(farright.lprev());
            farrightpt = farrightapex;
            farrightapex = self.pt(self.apex(farright));
          }
        }
        return (farleft, farright);
      }

      // Delete no-longer-Delaunay edges from the left triangulation.
      if !leftfinished {
        let mut nextedge = self.sym(leftcand.lprev());
        let mut nextapex = self.apex(nextedge);
        if !nextapex.is_none() {
          let mut badedge =
            self.incircle_v(lowerleft, lowerright, upperleft, nextapex) > 0.0;
          while badedge {
            // Eliminate the edge with a flip; the left triangulation
            // gains a bounding triangle.
            let top = nextedge.lnext();
            let topcasing = self.sym(top);
            let side = top.lnext();
            let sidecasing = self.sym(side);
            self.bond(side, topcasing);
            self.bond(leftcand, sidecasing);
            leftcand = leftcand.lnext();
            let outercasing = self.sym(leftcand);
            self.bond(top, outercasing);

            self.set_org(leftcand, lowerleft);
            self.set_dest(leftcand, VertId::NONE);
            self.set_apex(leftcand, nextapex);
            self.set_org(top, VertId::NONE);
            self.set_dest(top, upperleft);
            self.set_apex(top, nextapex);

            upperleft = nextapex;
            nextedge = sidecasing;
            nextapex = self.apex(nextedge);
            badedge = !nextapex.is_none()
              && self.incircle_v(lowerleft, lowerright, upperleft, nextapex) > 0.0;
          }
        }
      }

      // Delete no-longer-Delaunay edges from the right triangulation.
      if !rightfinished {
        let mut nextedge = self.sym(rightcand.lnext());
        let mut nextapex = self.apex(nextedge);
        if !nextapex.is_none() {
          let mut badedge =
            self.incircle_v(lowerleft, lowerright, upperright, nextapex) > 0.0;
          while badedge {
            let top = nextedge.lprev();
            let topcasing = self.sym(top);
            let side = top.lprev();
            let sidecasing = self.sym(side);
            self.bond(side, topcasing);
            self.bond(rightcand, sidecasing);
            rightcand = rightcand.lprev();
            let outercasing = self.sym(rightcand);
            self.bond(top, outercasing);

            self.set_org(rightcand, VertId::NONE);
            self.set_dest(rightcand, lowerright);
            self.set_apex(rightcand, nextapex);
            self.set_org(top, upperright);
            self.set_dest(top, VertId::NONE);
            self.set_apex(top, nextapex);

            upperright = nextapex;
            nextedge = sidecasing;
            nextapex = self.apex(nextedge);
            badedge = !nextapex.is_none()
              && self.incircle_v(lowerleft, lowerright, upperright, nextapex) > 0.0;
          }
        }
      }

      if leftfinished
        || (!rightfinished
          && self.incircle_v(upperleft, lowerleft, lowerright, upperright) > 0.0)
      {
        // Knit on the right: add an edge from lowerleft to upperright.
        self.bond(baseedge, rightcand);
        baseedge = rightcand.lprev();
        self.set_dest(baseedge, lowerleft);
        lowerright = upperright;
        rightcand = self.sym(baseedge);
        upperright = self.apex(rightcand);
      } else {
        // Knit on the left: add an edge from lowerright to upperleft.
        self.bond(baseedge, leftcand);
        baseedge = leftcand.lnext();
        self.set_org(baseedge, lowerright);
        lowerleft = upperleft;
        leftcand = self.sym(baseedge);
        upperleft = self.apex(leftcand);
      }
    }
  }

  /// Walks the ring of bounding ghosts, dissolving each from the live mesh
  /// and deallocating it. Marks exposed hull vertices (outside of PSLG
  /// mode) and parks the hull anchor. Returns the number of ghosts walked,
  /// which equals the hull size for a non-degenerate triangulation.
  fn remove_ghosts(&mut self, startghost: Otri) -> usize {
    let searchedge = self.sym(startghost.lprev());
    self.set_hull_anchor(searchedge);
    let mut dissolveedge = startghost;
    let mut hullsize = 0;
    loop {
      hullsize += 1;
      let deadtriangle = dissolveedge.lnext();
      let inner = self.sym(dissolveedge.lprev());
      if !inner.is_dummy() && !self.tri_is_dead(inner.tri) {
        if !self.settings.poly {
          let markorg = self.org(inner);
          if !markorg.is_none() && self.vert(markorg).mark == 0 {
            self.vert_mut(markorg).mark = 1;
          }
        }
        self.dissolve(inner);
      }
      let next = self.sym(deadtriangle);
      self.triangle_dealloc(dissolveedge.tri);
      dissolveedge = next;
      if dissolveedge == startghost {
        break;
      }
    }
    hullsize
  }

  // -------------------------------------------------------------------
  // Incremental insertion

  fn incremental(&mut self) -> Result<usize> {
    let input_count = self.verts.len();

    // A bounding triangle far enough out that every input vertex is
    // strictly inside and circumcircle tests against its corners behave
    // like tests against points at infinity.
    let width = self.bbox.width();
    let height = self.bbox.height();
    let mut maxd = width.max(height);
    if maxd == 0.0 {
      maxd = 1.0;
    }
    let midx = (self.bbox.min_x + self.bbox.max_x) / 2.0;
    let frame = [
      Point::new(self.bbox.min_x - 50.0 * maxd, self.bbox.min_y - 40.0 * maxd),
      Point::new(self.bbox.max_x + 50.0 * maxd, self.bbox.min_y - 40.0 * maxd),
      Point::new(midx, self.bbox.max_y + 60.0 * maxd),
    ];
    for (i, p) in frame.iter().enumerate() {
      self
        .verts
        .push(Vertex::new(*p, 0, VertexKind::Input, Vec::new()));
      self.infvertex[i] = VertId(input_count + i);
    }

    let inftri = self.make_triangle();
    self.set_org(inftri, self.infvertex[0]);
    self.set_dest(inftri, self.infvertex[1]);
    self.set_apex(inftri, self.infvertex[2]);
    self.set_hull_anchor(inftri);

    for i in 0..input_count {
      let v = VertId(i);
      if self.vert(v).is_dead() {
        continue;
      }
      let mut searchtri = Otri::DUMMY;
      match self.insert_vertex(v, &mut searchtri, None, false, false)? {
        InsertOutcome::Duplicate => {
          self.vert_mut(v).kind = VertexKind::Undead;
          self.undeads += 1;
        }
        InsertOutcome::Successful => {}
        _ => return Err(Error::TopologyInconsistency),
      }
    }

    let hullsize = self.remove_box();
    for i in 0..3 {
      let v = self.infvertex[i];
      self.vert_mut(v).kind = VertexKind::Dead;
      self.infvertex[i] = VertId::NONE;
    }
    Ok(hullsize)
  }

  /// Peels the ring of triangles incident to the bounding frame off the
  /// mesh, marking the exposed boundary vertices and counting the hull.
  fn remove_box(&mut self) -> usize {
    // Find a boundary triangle and a place to stop.
    let anchor = self.hull_anchor();
    let finaledge = anchor.lprev();
    let mut nextedge = self.sym(anchor.lnext());
    // The current search edge lies on a frame triangle and will die;
    // re-anchor on a surviving boundary edge first.
    let mut searchtri = self.sym(nextedge.lprev());
    let checkedge = self.sym(nextedge.lnext());
    if checkedge.is_dummy() {
      searchtri = self.sym(searchtri.lprev());
    }
    self.set_hull_anchor(searchtri);

    let mut hullsize: isize = -2;
    let mut guard = 3 * self.tris.len() + 10;
    while nextedge != finaledge && guard > 0 {
      guard -= 1;
      hullsize += 1;
      let dissolveedge = self.sym(nextedge.lprev());
      if !dissolveedge.is_dummy() && !self.tri_is_dead(dissolveedge.tri) {
        if !self.settings.poly {
          let markorg = self.org(dissolveedge);
          if !markorg.is_none() && !self.is_frame(markorg) && self.vert(markorg).mark == 0 {
            self.vert_mut(markorg).mark = 1;
          }
        }
        self.dissolve(dissolveedge);
      }
      let deadtriangle = nextedge.lnext();
      nextedge = self.sym(deadtriangle);
      if !self.tri_is_dead(deadtriangle.tri) {
        self.triangle_dealloc(deadtriangle.tri);
      }
      // Turn the corner of the bounding frame.
      if nextedge.is_dummy() {
        if dissolveedge.is_dummy() {
          break;
        }
        nextedge = dissolveedge;
      }
    }
    if !self.tri_is_dead(finaledge.tri) {
      self.triangle_dealloc(finaledge.tri);
    }
    // Degenerate inputs can defeat the ring walk; sweep up any triangle
    // still touching the frame.
    for id in self.live_tri_ids() {
      let frame_incident = (0..3).any(|k| {
        let v = self.tri(id).v[k];
        !v.is_none() && self.is_frame(v)
      });
      if frame_incident {
        for orient in 0..3 {
          let neighbor = self.sym(Otri::new(id, orient));
          if !neighbor.is_dummy() && !self.tri_is_dead(neighbor.tri) {
            self.dissolve(neighbor);
          }
        }
        self.triangle_dealloc(id);
      }
    }
    hullsize.max(0) as usize
  }
}
