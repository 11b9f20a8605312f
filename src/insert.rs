//! Vertex insertion and deletion.
//!
//! Insertion locates the new vertex, splits the containing triangle (or the
//! containing edge) around it, and restores the constrained Delaunay
//! property with a cascade of edge flips that pivots around the new vertex.
//! Deletion retriangulates the star of a vertex until only a single
//! triangle spans it. While refinement is active every transformation is
//! journaled so a just-inserted vertex can be backed out again.

use crate::locate::PointLocation;
use crate::mesh::Mesh;
use crate::topology::{Osub, Otri, VertId};
use crate::data::{Bisection, VertexKind};
use crate::Result;

/// How an insertion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  /// The vertex is in the mesh and the Delaunay property is restored.
  Successful,
  /// The vertex is in the mesh but encroaches upon one or more
  /// subsegments, which were queued.
  Encroaching,
  /// The vertex was not inserted: it falls on a subsegment that must not
  /// be split here.
  Violating,
  /// The vertex was not inserted: it coincides with an existing vertex.
  Duplicate,
}

/// One reversible transformation, recorded while refinement is active.
/// The handle is positioned exactly as the forward operation left it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum JournalEntry {
  /// An edge flip; the handle is the flipped edge.
  Flip(Otri),
  /// A triangle split into three; the handle's apex is the new vertex.
  TriSplit(Otri),
  /// An edge split into up to four triangles; the handle's origin is the
  /// new vertex.
  EdgeSplit(Otri),
}

impl Mesh {
  /// Inserts `v` into the mesh.
  ///
  /// `searchtri` seeds the point location (the sentinel handle forces a
  /// full locate) and on return holds a triangle whose origin is `v`.
  /// With `splitseg`, the caller asserts that `searchtri`'s current edge
  /// carries that subsegment and `v` lies on it; the subsegment is split
  /// along with the edge. `segment_flaws` and `triangle_flaws` ask for
  /// encroachment bookkeeping and quality grading of new triangles.
  pub(crate) fn insert_vertex(
    &mut self,
    v: VertId,
    searchtri: &mut Otri,
    splitseg: Option<Osub>,
    segment_flaws: bool,
    triangle_flaws: bool,
  ) -> Result<InsertOutcome> {
    if self.check_quality {
      self.journal.clear();
    }
    let p = self.pt(v);

    let mut horiz = *searchtri;
    let intersect = if splitseg.is_some() {
      PointLocation::OnEdge
    } else if horiz.is_dummy() {
      self.locate(&p, &mut horiz)
    } else {
      // The caller supplied a starting triangle; walk from it, stopping at
      // any subsegment in the way.
      self.precise_locate(&p, &mut horiz, true)
    };

    if intersect == PointLocation::OnVertex {
      *searchtri = horiz;
      self.locator.last = horiz;
      return Ok(InsertOutcome::Duplicate);
    }

    if intersect == PointLocation::OnEdge || intersect == PointLocation::Outside {
      if self.check_segments && splitseg.is_none() {
        let brokenseg = self.tri_sub(horiz);
        if !brokenseg.is_dummy() {
          // The vertex falls on a subsegment that this call must not
          // split. Queue the subsegment if the caller is collecting them.
          if segment_flaws {
            let mut enq = self.settings.no_bisect != Bisection::None;
            if enq && self.settings.no_bisect == Bisection::InternalOnly {
              enq = !self.sym(horiz).is_dummy();
            }
            if enq {
              self.queue_bad_subseg(brokenseg);
            }
          }
          *searchtri = horiz;
          self.locator.last = horiz;
          return Ok(InsertOutcome::Violating);
        }
      }
      self.split_edge(v, &mut horiz, splitseg);
      if self.check_quality {
        self.journal.push(JournalEntry::EdgeSplit(horiz));
      }
      // Position on the first star edge to test.
      horiz = horiz.lnext();
    } else {
      self.split_triangle_interior(v, horiz);
      if self.check_quality {
        self.journal.push(JournalEntry::TriSplit(horiz));
      }
    }

    // The Lawson cascade: pivot around the new vertex (always the apex of
    // `horiz`) until every star edge is locally Delaunay.
    let mut success = InsertOutcome::Successful;
    let first = self.org(horiz);
    let mut rightvertex = first;
    let mut leftvertex = self.dest(horiz);
    loop {
      let mut doflip = true;

      if self.check_segments {
        let checksubseg = self.tri_sub(horiz);
        if !checksubseg.is_dummy() {
          // A subsegment is never flipped.
          doflip = false;
          if segment_flaws && self.check_seg_for_encroach(checksubseg) != 0 {
            success = InsertOutcome::Encroaching;
          }
        }
      }

      if doflip {
        let top = self.sym(horiz);
        if top.is_dummy() {
          doflip = false;
        } else {
          let farvertex = self.apex(top);
          // Bounding-frame vertices act as if infinitely distant, so the
          // in-circle test degrades to hull convexity.
          doflip = if self.is_frame(leftvertex) {
            self.ccw_v(v, rightvertex, farvertex) > 0.0
          } else if self.is_frame(rightvertex) {
            self.ccw_v(farvertex, leftvertex, v) > 0.0
          } else if self.is_frame(farvertex) {
            false
          } else {
            self.incircle_v(leftvertex, v, rightvertex, farvertex) > 0.0
          };
          if doflip {
            self.flip(horiz);
            if self.check_quality {
              self.journal.push(JournalEntry::Flip(horiz));
            }
            // The flip exposed two edges; back up onto the first of them.
            horiz = horiz.lprev();
            leftvertex = farvertex;
          }
        }
      }

      if !doflip {
        // `horiz` is accepted as a finished star edge.
        if triangle_flaws {
          self.test_triangle(horiz);
        }
        let moved = horiz.lnext();
        let testtri = self.sym(moved);
        if leftvertex == first || testtri.is_dummy() {
          let result = moved.lnext();
          self.vert_mut(v).tri = result;
          *searchtri = result;
          self.locator.last = result;
          return Ok(success);
        }
        horiz = testtri.lnext();
        rightvertex = leftvertex;
        leftvertex = self.dest(horiz);
      }
    }
  }

  /// Splits the triangle under `horiz` into three around `v`. On return
  /// `horiz` keeps its edge and has `v` as its apex.
  fn split_triangle_interior(&mut self, v: VertId, horiz: Otri) {
    let botleft = horiz.lnext();
    let botright = horiz.lprev();
    let botlcasing = self.sym(botleft);
    let botrcasing = self.sym(botright);
    let newbotleft = self.make_triangle();
    let newbotright = self.make_triangle();

    let rightvertex = self.org(horiz);
    let leftvertex = self.dest(horiz);
    let botvertex = self.apex(horiz);
    self.set_org(newbotleft, leftvertex);
    self.set_dest(newbotleft, botvertex);
    self.set_apex(newbotleft, v);
    self.set_org(newbotright, botvertex);
    self.set_dest(newbotright, rightvertex);
    self.set_apex(newbotright, v);
    self.set_apex(horiz, v);

    let region = self.tri(horiz.tri).region;
    let area = self.tri(horiz.tri).area;
    self.tri_mut(newbotleft.tri).region = region;
    self.tri_mut(newbotleft.tri).area = area;
    self.tri_mut(newbotright.tri).region = region;
    self.tri_mut(newbotright.tri).area = area;

    if self.check_segments {
      let botlsubseg = self.tri_sub(botleft);
      if !botlsubseg.is_dummy() {
        self.ts_dissolve(botleft);
        self.ts_bond(newbotleft, botlsubseg);
      }
      let botrsubseg = self.tri_sub(botright);
      if !botrsubseg.is_dummy() {
        self.ts_dissolve(botright);
        self.ts_bond(newbotright, botrsubseg);
      }
    }

    self.bond(newbotleft, botlcasing);
    self.bond(newbotright, botrcasing);
    let nbl = newbotleft.lnext();
    let nbr = newbotright.lprev();
    self.bond(nbl, nbr);
    self.bond(nbl.lnext(), botleft);
    self.bond(nbr.lprev(), botright);

    self.vert_mut(v).tri = nbl.lnext();
    self.vert_mut(botvertex).tri = newbotright;
    self.vert_mut(leftvertex).tri = newbotleft;
    self.vert_mut(rightvertex).tri = horiz;
  }

  /// Splits the edge under `horiz` (and the mirror triangle across it, when
  /// there is one) around `v`. On return `horiz` has `v` as its origin.
  /// With `splitseg`, the subsegment on the edge is split into a chain of
  /// two, both carrying the original segment's endpoints.
  fn split_edge(&mut self, v: VertId, horiz: &mut Otri, splitseg: Option<Osub>) {
    let botright = horiz.lprev();
    let botrcasing = self.sym(botright);
    let mut topright = self.sym(*horiz);
    let mirror = !topright.is_dummy();
    let mut newtopright = Otri::DUMMY;
    if mirror {
      topright = topright.lnext();
      newtopright = self.make_triangle();
    } else {
      // Splitting a boundary edge adds a hull edge.
      self.hull_size += 1;
    }
    let newbotright = self.make_triangle();

    let rightvertex = self.org(*horiz);
    let leftvertex = self.dest(*horiz);
    let botvertex = self.apex(*horiz);
    self.set_org(newbotright, botvertex);
    self.set_dest(newbotright, rightvertex);
    self.set_apex(newbotright, v);
    self.set_org(*horiz, v);
    let region = self.tri(horiz.tri).region;
    let area = self.tri(horiz.tri).area;
    self.tri_mut(newbotright.tri).region = region;
    self.tri_mut(newbotright.tri).area = area;

    if mirror {
      let toprcasing = self.sym(topright);
      let topvertex = self.dest(topright);
      self.set_org(newtopright, rightvertex);
      self.set_dest(newtopright, topvertex);
      self.set_apex(newtopright, v);
      self.set_org(topright, v);
      let mregion = self.tri(topright.tri).region;
      let marea = self.tri(topright.tri).area;
      self.tri_mut(newtopright.tri).region = mregion;
      self.tri_mut(newtopright.tri).area = marea;

      if self.check_segments {
        let toprsubseg = self.tri_sub(topright);
        if !toprsubseg.is_dummy() {
          self.ts_dissolve(topright);
          self.ts_bond(newtopright, toprsubseg);
        }
      }
      self.bond(newtopright, toprcasing);
    }

    if self.check_segments {
      let botrsubseg = self.tri_sub(botright);
      if !botrsubseg.is_dummy() {
        self.ts_dissolve(botright);
        self.ts_bond(newbotright, botrsubseg);
      }
    }

    self.bond(newbotright, botrcasing);
    let mut nbr = newbotright.lprev();
    self.bond(nbr, botright);
    nbr = nbr.lprev();
    if mirror {
      let mut ntr = newtopright.lnext();
      self.bond(ntr, topright);
      ntr = ntr.lnext();
      self.bond(ntr, nbr);
    }

    if let Some(splitseg) = splitseg {
      // Split the subsegment, keeping the original segment endpoints on
      // both halves, and splice the new half into the chain.
      self.set_sdest(splitseg, v);
      let segmentorg = self.seg_org(splitseg);
      let segmentdest = self.seg_dest(splitseg);
      let flipped = splitseg.ssym();
      let rightsubseg = self.spivot(flipped);
      let mark = self.sub(splitseg.sub).mark;
      self.insert_subseg(nbr, mark);
      let newsubseg = self.tri_sub(nbr);
      self.set_seg_org(newsubseg, segmentorg);
      self.set_seg_dest(newsubseg, segmentdest);
      self.sbond(flipped, newsubseg);
      if !rightsubseg.is_dummy() {
        self.sbond(newsubseg.ssym(), rightsubseg);
      }
      if self.vert(v).mark == 0 {
        self.vert_mut(v).mark = mark;
      }
    }

    self.vert_mut(v).tri = *horiz;
    self.vert_mut(botvertex).tri = newbotright;
    self.vert_mut(rightvertex).tri = newbotright.lprev();
    self.vert_mut(leftvertex).tri = horiz.lnext();
  }

  /// Backs out the most recent insertion, provided no other mutation has
  /// happened since: unwinds the cascade flips in reverse, then merges the
  /// split triangles back together.
  pub(crate) fn undo_vertex(&mut self) {
    while let Some(entry) = self.journal.pop() {
      match entry {
        JournalEntry::Flip(ot) => self.unflip(ot),
        JournalEntry::TriSplit(horiz) => self.undo_tri_split(horiz),
        JournalEntry::EdgeSplit(horiz) => self.undo_edge_split(horiz),
      }
    }
  }

  fn undo_tri_split(&mut self, horiz: Otri) {
    let newbotleft = self.sym(horiz.lnext());
    let newbotright = self.sym(horiz.lprev());
    let botvertex = self.apex(newbotleft);
    let leftvertex = self.dest(horiz);
    let rightvertex = self.org(horiz);

    let nbl0 = Otri::new(newbotleft.tri, 0);
    let nbr0 = Otri::new(newbotright.tri, 0);
    let botlcasing = self.sym(nbl0);
    let botrcasing = self.sym(nbr0);
    let botlsubseg = self.tri_sub(nbl0);
    let botrsubseg = self.tri_sub(nbr0);

    self.set_apex(horiz, botvertex);
    let botleft = horiz.lnext();
    let botright = horiz.lprev();
    self.bond(botleft, botlcasing);
    self.bond(botright, botrcasing);
    if botlsubseg.is_dummy() {
      self.ts_dissolve(botleft);
    } else {
      self.ts_bond(botleft, botlsubseg);
    }
    if botrsubseg.is_dummy() {
      self.ts_dissolve(botright);
    } else {
      self.ts_bond(botright, botrsubseg);
    }

    self.triangle_dealloc(newbotleft.tri);
    self.triangle_dealloc(newbotright.tri);

    self.vert_mut(leftvertex).tri = botleft;
    self.vert_mut(botvertex).tri = botright;
    self.vert_mut(rightvertex).tri = horiz;
  }

  fn undo_edge_split(&mut self, horiz: Otri) {
    let newbotright = self.sym(horiz.lprev());
    let nbr0 = Otri::new(newbotright.tri, 0);
    let rightvertex = self.dest(nbr0);
    let botvertex = self.org(nbr0);
    let leftvertex = self.dest(horiz);
    let botrcasing = self.sym(nbr0);
    let botrsubseg = self.tri_sub(nbr0);

    let mirror = self.sym(horiz);
    if !mirror.is_dummy() {
      let newtopright = self.sym(mirror.lnext());
      let ntr0 = Otri::new(newtopright.tri, 0);
      let toprcasing = self.sym(ntr0);
      let toprsubseg = self.tri_sub(ntr0);
      self.set_dest(mirror, rightvertex);
      let topright = mirror.lnext();
      self.bond(topright, toprcasing);
      if toprsubseg.is_dummy() {
        self.ts_dissolve(topright);
      } else {
        self.ts_bond(topright, toprsubseg);
      }
      self.triangle_dealloc(newtopright.tri);
    } else {
      self.hull_size -= 1;
    }

    self.set_org(horiz, rightvertex);
    let botright = horiz.lprev();
    self.bond(botright, botrcasing);
    if botrsubseg.is_dummy() {
      self.ts_dissolve(botright);
    } else {
      self.ts_bond(botright, botrsubseg);
    }
    self.triangle_dealloc(newbotright.tri);

    self.vert_mut(rightvertex).tri = horiz;
    self.vert_mut(botvertex).tri = botright;
    self.vert_mut(leftvertex).tri = horiz.lnext();
  }

  /// Retriangulates the fan of triangles from `firstedge` to `lastedge`
  /// (all sharing their origin) so that the fan's base becomes Delaunay.
  /// Returns a handle on the triangle adjoining the base.
  fn triangulate_polygon(
    &mut self,
    firstedge: Otri,
    lastedge: Otri,
    edgecount: usize,
    doflip: bool,
    triangle_flaws: bool,
  ) -> Otri {
    let leftbasevertex = self.apex(lastedge);
    let rightbasevertex = self.dest(firstedge);

    let mut besttri = self.onext(firstedge);
    let mut bestvertex = self.dest(besttri);
    let mut bestnumber = 1;
    let mut testtri = besttri;
    for i in 2..=edgecount.saturating_sub(2) {
      testtri = self.onext(testtri);
      let testvertex = self.dest(testtri);
      if self.incircle_v(leftbasevertex, rightbasevertex, bestvertex, testvertex) > 0.0 {
        besttri = testtri;
        bestvertex = testvertex;
        bestnumber = i;
      }
    }

    if bestnumber > 1 {
      // Triangulate the polygon to the right of the chosen vertex.
      let tempedge = self.oprev(besttri);
      self.triangulate_polygon(firstedge, tempedge, bestnumber + 1, true, triangle_flaws);
    }
    if bestnumber < edgecount - 2 {
      // Triangulate the polygon to the left; the flips there can move the
      // chosen edge into another triangle, so re-derive the handle from
      // its untouched mirror side.
      let tempedge = self.sym(besttri);
      self.triangulate_polygon(besttri, lastedge, edgecount - bestnumber, true, triangle_flaws);
      besttri = self.sym(tempedge);
    }

    if doflip {
      self.flip(besttri);
      if triangle_flaws {
        let committed = self.sym(besttri);
        self.test_triangle(committed);
      }
    }
    besttri
  }

  /// Removes an interior free vertex and restores the Delaunay property in
  /// its former star. Only refinement uses this, to clear free vertices out
  /// of the diametral disk of a subsegment about to be split.
  pub(crate) fn delete_vertex(&mut self, deltri: &mut Otri, triangle_flaws: bool) {
    let delvertex = self.org(*deltri);
    debug_assert_eq!(self.vert(delvertex).kind, VertexKind::Free);

    // Count the degree of the vertex being deleted.
    let mut countingtri = self.onext(*deltri);
    let mut edgecount = 1;
    while countingtri != *deltri {
      edgecount += 1;
      countingtri = self.onext(countingtri);
    }

    if edgecount > 3 {
      let firstedge = self.onext(*deltri);
      let lastedge = self.oprev(*deltri);
      self.triangulate_polygon(firstedge, lastedge, edgecount, false, triangle_flaws);
    }

    // Splice the last two star triangles out around the spanning triangle.
    let deltriright = deltri.lprev();
    let lefttri = self.dnext(*deltri);
    let righttri = self.oprev(deltriright);
    let leftcasing = self.sym(lefttri);
    let rightcasing = self.sym(righttri);
    self.bond(*deltri, leftcasing);
    self.bond(deltriright, rightcasing);
    let leftsubseg = self.tri_sub(lefttri);
    if !leftsubseg.is_dummy() {
      self.ts_bond(*deltri, leftsubseg);
    }
    let rightsubseg = self.tri_sub(righttri);
    if !rightsubseg.is_dummy() {
      self.ts_bond(deltriright, rightsubseg);
    }

    let neworg = self.org(lefttri);
    self.set_org(*deltri, neworg);
    self.vert_mut(neworg).tri = *deltri;
    if triangle_flaws {
      self.test_triangle(*deltri);
    }

    self.triangle_dealloc(lefttri.tri);
    self.triangle_dealloc(righttri.tri);
    self.vertex_dealloc(delvertex);
  }
}
