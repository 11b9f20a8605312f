//! The mesh: sole owner of the triangle, subsegment, and vertex tables,
//! and of every operation that mutates them.
//!
//! All handles (`Otri`, `Osub`, ids) borrow from the mesh and are only
//! meaningful against it. Handles must be re-acquired after any operation
//! that can deallocate triangles (insertion cascades, hole carving, frame
//! or ghost removal); stale handles are detectable because deallocated
//! records keep their dead marking until the slot is reused.

use std::collections::VecDeque;

use crate::data::{BoundingBox, Point, Pslg, RegionSeed, Settings, Vertex, VertexKind};
use crate::insert::JournalEntry;
use crate::locate::Locator;
use crate::predicates;
use crate::refine::{BadSubseg, BadTriQueue};
use crate::topology::{Osub, Otri, Pool, SubId, Subseg, TriId, Triangle, VertId};

/// Counters scoped to one mesh, so concurrent meshes do not share state and
/// tests can assert on them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics {
  pub flips: u64,
  pub circumcenters: u64,
  pub steiner_used: u64,
}

/// One exported triangle: corner, neighbor, and subsegment ids in the
/// output numbering. `None` marks a hull side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleOut {
  pub vertices: [usize; 3],
  pub neighbors: [Option<usize>; 3],
  pub subsegs: [Option<usize>; 3],
  pub region: i32,
  pub area: f64,
}

/// One exported undirected edge with its boundary mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeOut {
  pub p0: usize,
  pub p1: usize,
  pub boundary: i32,
}

/// One exported subsegment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsegOut {
  pub p0: usize,
  pub p1: usize,
  pub mark: i32,
}

pub struct Mesh {
  pub(crate) tris: Pool<Triangle>,
  pub(crate) subs: Pool<Subseg>,
  pub(crate) verts: Vec<Vertex>,
  pub(crate) settings: Settings,
  pub(crate) bbox: BoundingBox,
  pub(crate) holes: Vec<Point>,
  pub(crate) regions: Vec<RegionSeed>,
  pub(crate) locator: Locator,
  pub(crate) hull_size: usize,
  pub(crate) undeads: usize,
  pub(crate) steiner_left: i32,
  /// Set once constraints exist; insertion then tests edges for subsegments.
  pub(crate) check_segments: bool,
  /// Set during refinement; insertion then journals flips and grades new
  /// triangles.
  pub(crate) check_quality: bool,
  pub(crate) journal: Vec<JournalEntry>,
  pub(crate) bad_subsegs: VecDeque<BadSubseg>,
  pub(crate) bad_tris: BadTriQueue,
  pub(crate) infvertex: [VertId; 3],
  pub(crate) stats: Statistics,
  pub(crate) quality_exhausted: bool,
  tri_out_ids: Vec<usize>,
  sub_out_ids: Vec<usize>,
}

impl Mesh {
  pub(crate) fn new(pslg: &Pslg, settings: &Settings) -> Mesh {
    let verts = pslg
      .points
      .iter()
      .map(|v| {
        let mark = if settings.use_boundary_markers { v.mark } else { 0 };
        Vertex::new(v.point, mark, VertexKind::Input, v.attrs.clone())
      })
      .collect();
    Mesh {
      tris: Pool::with_sentinel(Triangle::fresh()),
      subs: Pool::with_sentinel(Subseg::fresh()),
      verts,
      settings: settings.clone(),
      bbox: *pslg.bounding_box(),
      holes: if settings.no_holes { Vec::new() } else { pslg.holes.clone() },
      regions: pslg.regions.clone(),
      locator: Locator::new(settings.seed),
      hull_size: 0,
      undeads: 0,
      steiner_left: settings.steiner_points,
      check_segments: false,
      check_quality: false,
      journal: Vec::new(),
      bad_subsegs: VecDeque::new(),
      bad_tris: BadTriQueue::new(),
      infvertex: [VertId::NONE; 3],
      stats: Statistics::default(),
      quality_exhausted: false,
      tri_out_ids: Vec::new(),
      sub_out_ids: Vec::new(),
    }
  }

  // -------------------------------------------------------------------
  // Record access

  pub(crate) fn tri(&self, id: TriId) -> &Triangle {
    &self.tris[id.0]
  }

  pub(crate) fn tri_mut(&mut self, id: TriId) -> &mut Triangle {
    &mut self.tris[id.0]
  }

  pub(crate) fn sub(&self, id: SubId) -> &Subseg {
    &self.subs[id.0]
  }

  pub(crate) fn sub_mut(&mut self, id: SubId) -> &mut Subseg {
    &mut self.subs[id.0]
  }

  pub(crate) fn vert(&self, id: VertId) -> &Vertex {
    &self.verts[id.0]
  }

  pub(crate) fn vert_mut(&mut self, id: VertId) -> &mut Vertex {
    &mut self.verts[id.0]
  }

  pub(crate) fn pt(&self, id: VertId) -> Point {
    self.verts[id.0].point
  }

  pub(crate) fn tri_is_dead(&self, id: TriId) -> bool {
    self.tris[id.0].is_dead()
  }

  pub(crate) fn is_frame(&self, v: VertId) -> bool {
    self.infvertex.contains(&v)
  }

  /// Live input and Steiner vertices, frame vertices excluded.
  pub(crate) fn live_vertex_count(&self) -> usize {
    self
      .verts
      .iter()
      .enumerate()
      .filter(|(i, v)| !v.is_dead() && !self.is_frame(VertId(*i)))
      .count()
  }

  // -------------------------------------------------------------------
  // Oriented-triangle navigation. All O(1) table lookups.

  pub(crate) fn org(&self, ot: Otri) -> VertId {
    self.tri(ot.tri).v[crate::topology::PLUS1MOD3[ot.orient]]
  }

  pub(crate) fn dest(&self, ot: Otri) -> VertId {
    self.tri(ot.tri).v[crate::topology::MINUS1MOD3[ot.orient]]
  }

  pub(crate) fn apex(&self, ot: Otri) -> VertId {
    self.tri(ot.tri).v[ot.orient]
  }

  pub(crate) fn set_org(&mut self, ot: Otri, v: VertId) {
    self.tri_mut(ot.tri).v[crate::topology::PLUS1MOD3[ot.orient]] = v;
  }

  pub(crate) fn set_dest(&mut self, ot: Otri, v: VertId) {
    self.tri_mut(ot.tri).v[crate::topology::MINUS1MOD3[ot.orient]] = v;
  }

  pub(crate) fn set_apex(&mut self, ot: Otri, v: VertId) {
    self.tri_mut(ot.tri).v[ot.orient] = v;
  }

  /// Cross the current edge into the neighboring triangle.
  pub(crate) fn sym(&self, ot: Otri) -> Otri {
    self.tri(ot.tri).n[ot.orient]
  }

  /// Next edge counter-clockwise around the origin.
  pub(crate) fn onext(&self, ot: Otri) -> Otri {
    self.sym(ot.lprev())
  }

  /// Next edge clockwise around the origin.
  pub(crate) fn oprev(&self, ot: Otri) -> Otri {
    self.sym(ot).lnext()
  }

  /// Next edge counter-clockwise around the destination.
  pub(crate) fn dnext(&self, ot: Otri) -> Otri {
    self.sym(ot).lprev()
  }

  /// Create a symmetric neighbor link. The only way live links are made;
  /// bonding against the sentinel parks the hull anchor on the other edge.
  pub(crate) fn bond(&mut self, a: Otri, b: Otri) {
    self.tri_mut(a.tri).n[a.orient] = b;
    self.tri_mut(b.tri).n[b.orient] = a;
  }

  /// Clear one side of a link; the caller owns the other side.
  pub(crate) fn dissolve(&mut self, a: Otri) {
    self.tri_mut(a.tri).n[a.orient] = Otri::DUMMY;
  }

  /// The hull anchor: some edge of the convex hull, entered from outside.
  pub(crate) fn hull_anchor(&self) -> Otri {
    self.sym(Otri::DUMMY)
  }

  pub(crate) fn set_hull_anchor(&mut self, ot: Otri) {
    self.tris[TriId::DUMMY.0].n[0] = ot;
  }

  // -------------------------------------------------------------------
  // Subsegment navigation

  pub(crate) fn sorg(&self, os: Osub) -> VertId {
    self.sub(os.sub).v[os.orient]
  }

  pub(crate) fn sdest(&self, os: Osub) -> VertId {
    self.sub(os.sub).v[1 - os.orient]
  }

  pub(crate) fn set_sorg(&mut self, os: Osub, v: VertId) {
    self.sub_mut(os.sub).v[os.orient] = v;
  }

  pub(crate) fn set_sdest(&mut self, os: Osub, v: VertId) {
    self.sub_mut(os.sub).v[1 - os.orient] = v;
  }

  pub(crate) fn seg_org(&self, os: Osub) -> VertId {
    self.sub(os.sub).seg[os.orient]
  }

  pub(crate) fn seg_dest(&self, os: Osub) -> VertId {
    self.sub(os.sub).seg[1 - os.orient]
  }

  pub(crate) fn set_seg_org(&mut self, os: Osub, v: VertId) {
    self.sub_mut(os.sub).seg[os.orient] = v;
  }

  pub(crate) fn set_seg_dest(&mut self, os: Osub, v: VertId) {
    self.sub_mut(os.sub).seg[1 - os.orient] = v;
  }

  /// The chain neighbor at this orientation's origin end.
  pub(crate) fn spivot(&self, os: Osub) -> Osub {
    self.sub(os.sub).subs[os.orient]
  }

  pub(crate) fn sbond(&mut self, a: Osub, b: Osub) {
    self.sub_mut(a.sub).subs[a.orient] = b;
    self.sub_mut(b.sub).subs[b.orient] = a;
  }

  /// The subsegment on the current edge, or the sentinel.
  pub(crate) fn tri_sub(&self, ot: Otri) -> Osub {
    self.tri(ot.tri).s[ot.orient]
  }

  pub(crate) fn ts_bond(&mut self, ot: Otri, os: Osub) {
    self.tri_mut(ot.tri).s[ot.orient] = os;
    self.sub_mut(os.sub).tris[os.orient] = ot;
  }

  pub(crate) fn ts_dissolve(&mut self, ot: Otri) {
    self.tri_mut(ot.tri).s[ot.orient] = Osub::DUMMY;
  }

  /// The triangle adjoining this subsegment orientation.
  pub(crate) fn sub_tri(&self, os: Osub) -> Otri {
    self.sub(os.sub).tris[os.orient]
  }

  pub(crate) fn st_dissolve(&mut self, os: Osub) {
    self.sub_mut(os.sub).tris[os.orient] = Otri::DUMMY;
  }

  // -------------------------------------------------------------------
  // Allocation

  pub(crate) fn make_triangle(&mut self) -> Otri {
    let id = self.tris.alloc(Triangle::fresh());
    Otri::new(TriId(id), 0)
  }

  pub(crate) fn make_subseg(&mut self) -> Osub {
    let id = self.subs.alloc(Subseg::fresh());
    Osub::new(SubId(id), 0)
  }

  pub(crate) fn triangle_dealloc(&mut self, id: TriId) {
    self.tris[id.0].kill();
    self.tris.dealloc(id.0);
  }

  pub(crate) fn subseg_dealloc(&mut self, id: SubId) {
    self.subs[id.0].kill();
    self.subs.dealloc(id.0);
  }

  pub(crate) fn vertex_dealloc(&mut self, v: VertId) {
    self.vert_mut(v).kind = VertexKind::Dead;
  }

  // -------------------------------------------------------------------
  // Predicates bound to this mesh's settings

  pub(crate) fn ccw(&self, a: &Point, b: &Point, c: &Point) -> f64 {
    predicates::orient2d(a, b, c, self.settings.no_exact)
  }

  pub(crate) fn ccw_v(&self, a: VertId, b: VertId, c: VertId) -> f64 {
    self.ccw(&self.pt(a), &self.pt(b), &self.pt(c))
  }

  pub(crate) fn incircle(&self, a: &Point, b: &Point, c: &Point, d: &Point) -> f64 {
    predicates::incircle(a, b, c, d, self.settings.no_exact)
  }

  pub(crate) fn incircle_v(&self, a: VertId, b: VertId, c: VertId, d: VertId) -> f64 {
    self.incircle(&self.pt(a), &self.pt(b), &self.pt(c), &self.pt(d))
  }

  // -------------------------------------------------------------------
  // Subsegment insertion

  /// Records a subsegment on the current edge unless one is already there,
  /// marking it (and unmarked endpoints) with `mark`.
  pub(crate) fn insert_subseg(&mut self, tri: Otri, mark: i32) {
    let triorg = self.org(tri);
    let tridest = self.dest(tri);
    if self.vert(triorg).mark == 0 {
      self.vert_mut(triorg).mark = mark;
    }
    if self.vert(tridest).mark == 0 {
      self.vert_mut(tridest).mark = mark;
    }
    let existing = self.tri_sub(tri);
    if existing.is_dummy() {
      let new_sub = self.make_subseg();
      self.set_sorg(new_sub, tridest);
      self.set_sdest(new_sub, triorg);
      self.set_seg_org(new_sub, tridest);
      self.set_seg_dest(new_sub, triorg);
      self.sub_mut(new_sub.sub).mark = mark;
      self.ts_bond(tri, new_sub);
      let oppo = self.sym(tri);
      self.ts_bond(oppo, new_sub.ssym());
    } else if self.sub(existing.sub).mark == 0 {
      self.sub_mut(existing.sub).mark = mark;
    }
  }

  // -------------------------------------------------------------------
  // Edge flips

  /// Rotates the quadrilateral around the current edge one quarter turn
  /// counter-clockwise. The edge must have a live triangle on both sides
  /// and must not carry a subsegment.
  pub(crate) fn flip(&mut self, flipedge: Otri) {
    let rightvertex = self.org(flipedge);
    let leftvertex = self.dest(flipedge);
    let botvertex = self.apex(flipedge);
    let top = self.sym(flipedge);
    debug_assert!(!top.is_dummy(), "flip on a boundary edge");
    let farvertex = self.apex(top);

    let topleft = top.lprev();
    let toplcasing = self.sym(topleft);
    let topright = top.lnext();
    let toprcasing = self.sym(topright);
    let botleft = flipedge.lnext();
    let botlcasing = self.sym(botleft);
    let botright = flipedge.lprev();
    let botrcasing = self.sym(botright);

    self.bond(topleft, botlcasing);
    self.bond(botleft, botrcasing);
    self.bond(botright, toprcasing);
    self.bond(topright, toplcasing);

    if self.check_segments {
      // Subsegments ride only on the two edges that are not flipped.
      let toplsubseg = self.tri_sub(topleft);
      let botlsubseg = self.tri_sub(botleft);
      let botrsubseg = self.tri_sub(botright);
      let toprsubseg = self.tri_sub(topright);
      if toplsubseg.is_dummy() {
        self.ts_dissolve(topright);
      } else {
        self.ts_bond(topright, toplsubseg);
      }
      if botlsubseg.is_dummy() {
        self.ts_dissolve(topleft);
      } else {
        self.ts_bond(topleft, botlsubseg);
      }
      if botrsubseg.is_dummy() {
        self.ts_dissolve(botleft);
      } else {
        self.ts_bond(botleft, botrsubseg);
      }
      if toprsubseg.is_dummy() {
        self.ts_dissolve(botright);
      } else {
        self.ts_bond(botright, toprsubseg);
      }
    }

    self.set_org(flipedge, farvertex);
    self.set_dest(flipedge, botvertex);
    self.set_apex(flipedge, rightvertex);
    self.set_org(top, botvertex);
    self.set_dest(top, farvertex);
    self.set_apex(top, leftvertex);
    self.stats.flips += 1;
  }

  /// The inverse of [`Mesh::flip`]: rotates the quadrilateral clockwise.
  pub(crate) fn unflip(&mut self, flipedge: Otri) {
    let rightvertex = self.org(flipedge);
    let leftvertex = self.dest(flipedge);
    let botvertex = self.apex(flipedge);
    let top = self.sym(flipedge);
    debug_assert!(!top.is_dummy(), "unflip on a boundary edge");
    let farvertex = self.apex(top);

    let topleft = top.lprev();
    let toplcasing = self.sym(topleft);
    let topright = top.lnext();
    let toprcasing = self.sym(topright);
    let botleft = flipedge.lnext();
    let botlcasing = self.sym(botleft);
    let botright = flipedge.lprev();
    let botrcasing = self.sym(botright);

    self.bond(topleft, toprcasing);
    self.bond(botleft, toplcasing);
    self.bond(botright, botlcasing);
    self.bond(topright, botrcasing);

    if self.check_segments {
      let toplsubseg = self.tri_sub(topleft);
      let botlsubseg = self.tri_sub(botleft);
      let botrsubseg = self.tri_sub(botright);
      let toprsubseg = self.tri_sub(topright);
      if toplsubseg.is_dummy() {
        self.ts_dissolve(botleft);
      } else {
        self.ts_bond(botleft, toplsubseg);
      }
      if botlsubseg.is_dummy() {
        self.ts_dissolve(botright);
      } else {
        self.ts_bond(botright, botlsubseg);
      }
      if botrsubseg.is_dummy() {
        self.ts_dissolve(topright);
      } else {
        self.ts_bond(topright, botrsubseg);
      }
      if toprsubseg.is_dummy() {
        self.ts_dissolve(topleft);
      } else {
        self.ts_bond(topleft, toprsubseg);
      }
    }

    self.set_org(flipedge, botvertex);
    self.set_dest(flipedge, farvertex);
    self.set_apex(flipedge, leftvertex);
    self.set_org(top, farvertex);
    self.set_dest(top, botvertex);
    self.set_apex(top, rightvertex);
  }

  // -------------------------------------------------------------------
  // Vertex-to-triangle map

  /// Rebuilds every live vertex's incident-triangle hint.
  pub(crate) fn make_vertex_map(&mut self) {
    for id in self.live_tri_ids() {
      for orient in 0..3 {
        let ot = Otri::new(id, orient);
        let v = self.org(ot);
        if !v.is_none() {
          self.vert_mut(v).tri = ot;
        }
      }
    }
  }

  /// True when the vertex's hint still points at a live triangle whose
  /// origin is the vertex.
  pub(crate) fn vertex_map_valid(&self, v: VertId) -> bool {
    let ot = self.vert(v).tri;
    !ot.is_dummy() && !self.tri_is_dead(ot.tri) && self.org(ot) == v
  }

  // -------------------------------------------------------------------
  // Iteration and output numbering

  pub(crate) fn live_tri_ids(&self) -> Vec<TriId> {
    (1..self.tris.id_limit())
      .filter(|&i| !self.tris[i].is_dead())
      .map(TriId)
      .collect()
  }

  pub(crate) fn live_sub_ids(&self) -> Vec<SubId> {
    (1..self.subs.id_limit())
      .filter(|&i| !self.subs[i].is_dead())
      .map(SubId)
      .collect()
  }

  /// Number of live triangles.
  pub fn triangle_count(&self) -> usize {
    self.tris.len()
  }

  pub fn subseg_count(&self) -> usize {
    self.subs.len()
  }

  pub fn hull_size(&self) -> usize {
    self.hull_size
  }

  pub fn undeads(&self) -> usize {
    self.undeads
  }

  pub fn statistics(&self) -> &Statistics {
    &self.stats
  }

  /// True when refinement exhausted its Steiner budget while encroached
  /// subsegments remained.
  pub fn quality_exhausted(&self) -> bool {
    self.quality_exhausted
  }

  /// Whether the vertex participates in the output under the numbering
  /// installed by [`Mesh::renumber`].
  fn exported(&self, v: &Vertex) -> bool {
    match v.kind {
      VertexKind::Dead => false,
      VertexKind::Undead => !self.settings.jettison,
      _ => true,
    }
  }

  /// Assigns contiguous output ids to vertices, triangles, and subsegments.
  /// With `jettison`, vertices that never made it into the triangulation
  /// are skipped.
  pub(crate) fn renumber(&mut self) {
    let mut next = 0;
    for i in 0..self.verts.len() {
      let keep = self.exported(&self.verts[i]);
      self.verts[i].out_id = if keep {
        next += 1;
        next - 1
      } else {
        usize::MAX
      };
    }
    self.tri_out_ids = vec![usize::MAX; self.tris.id_limit()];
    for (n, id) in self.live_tri_ids().into_iter().enumerate() {
      self.tri_out_ids[id.0] = n;
    }
    self.sub_out_ids = vec![usize::MAX; self.subs.id_limit()];
    for (n, id) in self.live_sub_ids().into_iter().enumerate() {
      self.sub_out_ids[id.0] = n;
    }
  }

  /// Exported vertices with their output ids.
  pub fn vertices(&self) -> impl Iterator<Item = (usize, &Vertex)> {
    self
      .verts
      .iter()
      .filter(|v| v.out_id != usize::MAX)
      .map(|v| (v.out_id, v))
  }

  pub fn triangles(&self) -> impl Iterator<Item = TriangleOut> + '_ {
    self.live_tri_ids().into_iter().map(move |id| {
      let t = self.tri(id);
      let mut vertices = [0; 3];
      let mut neighbors = [None; 3];
      let mut subsegs = [None; 3];
      for k in 0..3 {
        vertices[k] = self.vert(t.v[k]).out_id;
        let n = t.n[k];
        if !n.is_dummy() && !self.tri_is_dead(n.tri) {
          neighbors[k] = Some(self.tri_out_ids[n.tri.0]);
        }
        let s = t.s[k];
        if !s.is_dummy() {
          subsegs[k] = Some(self.sub_out_ids[s.sub.0]);
        }
      }
      TriangleOut {
        vertices,
        neighbors,
        subsegs,
        region: t.region,
        area: t.area,
      }
    })
  }

  /// Each unique undirected edge once. Boundary is the subsegment mark if
  /// the edge carries one, otherwise 0.
  pub fn edges(&self) -> impl Iterator<Item = EdgeOut> + '_ {
    self.live_tri_ids().into_iter().flat_map(move |id| {
      (0..3).filter_map(move |orient| {
        let ot = Otri::new(id, orient);
        let sy = self.sym(ot);
        if sy.is_dummy() || sy.tri > id {
          let os = self.tri_sub(ot);
          let boundary = if os.is_dummy() { 0 } else { self.sub(os.sub).mark };
          Some(EdgeOut {
            p0: self.vert(self.org(ot)).out_id,
            p1: self.vert(self.dest(ot)).out_id,
            boundary,
          })
        } else {
          None
        }
      })
    })
  }

  pub fn subsegs(&self) -> impl Iterator<Item = SubsegOut> + '_ {
    self.live_sub_ids().into_iter().map(move |id| {
      let s = self.sub(id);
      SubsegOut {
        p0: self.vert(s.v[0]).out_id,
        p1: self.vert(s.v[1]).out_id,
        mark: s.mark,
      }
    })
  }

  // -------------------------------------------------------------------
  // Self-checks

  /// Verifies the structural invariants: counter-clockwise corners,
  /// symmetric neighbor bonds with reversed edges, subsegment endpoints
  /// matching their edges, and a live hull anchor. Returns false on the
  /// first violation.
  pub fn check_mesh(&self) -> bool {
    let live = self.live_tri_ids();
    for &id in &live {
      let base = Otri::new(id, 0);
      let org = self.org(base);
      let dest = self.dest(base);
      let apex = self.apex(base);
      if !org.is_none()
        && !dest.is_none()
        && !apex.is_none()
        && self.ccw_v(org, dest, apex) <= 0.0
      {
        return false;
      }
      for orient in 0..3 {
        let ot = Otri::new(id, orient);
        let sy = self.sym(ot);
        if !sy.is_dummy() {
          if self.tri_is_dead(sy.tri) {
            return false;
          }
          if self.sym(sy) != ot {
            return false;
          }
          if self.org(ot) != self.dest(sy) || self.dest(ot) != self.org(sy) {
            return false;
          }
        }
        let os = self.tri_sub(ot);
        if !os.is_dummy() {
          if self.sub(os.sub).is_dead() {
            return false;
          }
          if self.sorg(os) != self.dest(ot) || self.sdest(os) != self.org(ot) {
            return false;
          }
        }
      }
    }
    if !live.is_empty() {
      let anchor = self.hull_anchor();
      if anchor.is_dummy() || self.tri_is_dead(anchor.tri) || !self.sym(anchor).is_dummy() {
        return false;
      }
    }
    true
  }

  /// Verifies the constrained Delaunay property: no edge without a
  /// subsegment has its neighbor's apex inside the shared circumcircle.
  pub fn check_delaunay(&self) -> bool {
    for id in self.live_tri_ids() {
      for orient in 0..3 {
        let ot = Otri::new(id, orient);
        let sy = self.sym(ot);
        if sy.is_dummy() || sy.tri < id {
          continue;
        }
        if !self.tri_sub(ot).is_dummy() {
          continue;
        }
        let far = self.apex(sy);
        if self.incircle_v(self.org(ot), self.dest(ot), self.apex(ot), far) > 0.0 {
          return false;
        }
      }
    }
    true
  }

  /// The convex hull as a cycle of vertex ids, starting from the anchor.
  /// Used by tests to verify the hull forms a single simple cycle.
  pub fn hull_cycle(&self) -> Vec<usize> {
    let mut cycle = Vec::new();
    if self.tris.len() == 0 {
      return cycle;
    }
    let start = self.hull_anchor();
    let mut current = start;
    loop {
      cycle.push(self.vert(self.org(current)).out_id);
      // Walk to the next hull edge counter-clockwise: rotate about the
      // destination until the far side is the sentinel again.
      let mut next = current.lnext();
      loop {
        let across = self.sym(next);
        if across.is_dummy() {
          break;
        }
        next = across.lnext();
      }
      current = next;
      if current == start || cycle.len() > self.verts.len() + 1 {
        break;
      }
    }
    cycle
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data::{Pslg, Settings};
  use crate::topology::VertId;

  fn tiny_mesh() -> Mesh {
    let mut pslg = Pslg::new();
    pslg.add_point(0.0, 0.0);
    pslg.add_point(1.0, 0.0);
    pslg.add_point(0.0, 1.0);
    Mesh::new(&pslg, &Settings::default())
  }

  /// Builds one ccw triangle (0, 1, 2) by hand.
  fn one_triangle(mesh: &mut Mesh) -> Otri {
    let ot = mesh.make_triangle();
    mesh.set_org(ot, VertId(0));
    mesh.set_dest(ot, VertId(1));
    mesh.set_apex(ot, VertId(2));
    mesh.set_hull_anchor(ot);
    mesh.tri_mut(ot.tri).n[ot.orient] = Otri::DUMMY;
    ot
  }

  #[test]
  fn org_dest_apex_follow_the_orientation() {
    let mut mesh = tiny_mesh();
    let ot = one_triangle(&mut mesh);
    assert_eq!(mesh.org(ot), VertId(0));
    assert_eq!(mesh.dest(ot), VertId(1));
    assert_eq!(mesh.apex(ot), VertId(2));
    let ln = ot.lnext();
    assert_eq!(mesh.org(ln), VertId(1));
    assert_eq!(mesh.dest(ln), VertId(2));
    assert_eq!(mesh.apex(ln), VertId(0));
  }

  #[test]
  fn bond_is_symmetric_and_dissolve_is_one_sided() {
    let mut mesh = tiny_mesh();
    let a = mesh.make_triangle();
    let b = mesh.make_triangle();
    mesh.bond(a, b);
    assert_eq!(mesh.sym(a), b);
    assert_eq!(mesh.sym(b), a);
    mesh.dissolve(a);
    assert!(mesh.sym(a).is_dummy());
    assert_eq!(mesh.sym(b), a);
  }

  #[test]
  fn dealloc_marks_dead_and_reuses() {
    let mut mesh = tiny_mesh();
    let a = mesh.make_triangle();
    assert!(!mesh.tri_is_dead(a.tri));
    mesh.triangle_dealloc(a.tri);
    assert!(mesh.tri_is_dead(a.tri));
    assert_eq!(mesh.triangle_count(), 0);
    let b = mesh.make_triangle();
    assert_eq!(b.tri, a.tri);
    assert!(!mesh.tri_is_dead(b.tri));
  }

  #[test]
  fn insert_subseg_marks_endpoints_and_bonds_both_sides() {
    let mut mesh = tiny_mesh();
    let ot = one_triangle(&mut mesh);
    mesh.check_segments = true;
    mesh.insert_subseg(ot, 7);
    let os = mesh.tri_sub(ot);
    assert!(!os.is_dummy());
    assert_eq!(mesh.sorg(os), VertId(1));
    assert_eq!(mesh.sdest(os), VertId(0));
    assert_eq!(mesh.sub(os.sub).mark, 7);
    assert_eq!(mesh.vert(VertId(0)).mark, 7);
    assert_eq!(mesh.vert(VertId(1)).mark, 7);
    // Inserting again does not duplicate.
    mesh.insert_subseg(ot, 9);
    assert_eq!(mesh.subseg_count(), 1);
    assert_eq!(mesh.sub(os.sub).mark, 7);
  }
}
