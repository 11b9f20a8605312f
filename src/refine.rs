//! Ruppert-style quality refinement.
//!
//! Encroached subsegments are split at their midpoints (or at power-of-two
//! "shell" positions near segment corners), worst triangles are split at
//! their circumcenters (pulled toward the shortest edge by the off-center
//! rule), and any circumcenter that would encroach upon a subsegment is
//! withdrawn in favor of splitting that subsegment first.

use log::{debug, warn};

use crate::data::{Point, Vertex, VertexKind};
use crate::insert::InsertOutcome;
use crate::mesh::Mesh;
use crate::predicates;
use crate::topology::{Osub, Otri, VertId};
use crate::{Error, Result};

/// An encroached subsegment, with its endpoints at the time it was queued
/// so a later split or deallocation can be detected.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BadSubseg {
  pub sub: Osub,
  pub org: VertId,
  pub dest: VertId,
}

/// A low-quality triangle, with a corner snapshot for staleness detection.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BadTri {
  pub tri: Otri,
  pub key: f64,
  pub org: VertId,
  pub dest: VertId,
  pub apex: VertId,
}

const BUCKETS: usize = 4096;

/// A priority queue of bad triangles, bucketed by the geometric magnitude
/// of the quality key `shortest_edge² / area`. Smaller keys (needle-shaped
/// triangles) dequeue first; FIFO within a bucket keeps runs deterministic.
pub(crate) struct BadTriQueue {
  queues: Vec<std::collections::VecDeque<BadTri>>,
  /// Index of the next-larger nonempty bucket, threading the nonempty ones.
  next_nonempty: Vec<usize>,
  first_nonempty: usize,
  count: usize,
}

impl BadTriQueue {
  pub fn new() -> BadTriQueue {
    BadTriQueue {
      queues: (0..BUCKETS).map(|_| std::collections::VecDeque::new()).collect(),
      next_nonempty: vec![BUCKETS; BUCKETS],
      first_nonempty: BUCKETS,
      count: 0,
    }
  }

  pub fn len(&self) -> usize {
    self.count
  }

  /// Maps a key to its bucket: `2048 + 2·exponent + (mantissa > √2)` for
  /// keys ≥ 1, mirrored below 2048 for keys < 1. The exponent is found by
  /// repeated squaring, in time logarithmic in the exponent.
  fn bucket_of(key: f64) -> usize {
    if !(key > 0.0) || !key.is_finite() {
      return 0;
    }
    let (mut length, pos) = if key >= 1.0 { (key, true) } else { (1.0 / key, false) };
    let mut exponent = 0usize;
    while length > 2.0 {
      let mut expincrement = 1usize;
      let mut multiplier = 0.5f64;
      while length * multiplier * multiplier > 1.0 {
        expincrement *= 2;
        multiplier *= multiplier;
      }
      exponent += expincrement;
      length *= multiplier;
    }
    let exponent = 2 * exponent + (length > std::f64::consts::SQRT_2) as usize;
    if pos {
      (2048 + exponent).min(BUCKETS - 1)
    } else {
      2047usize.saturating_sub(exponent)
    }
  }

  pub fn enqueue(&mut self, bad: BadTri) {
    let bucket = Self::bucket_of(bad.key);
    if self.queues[bucket].is_empty() {
      // Thread the newly nonempty bucket into the ordered list.
      if bucket < self.first_nonempty {
        self.next_nonempty[bucket] = self.first_nonempty;
        self.first_nonempty = bucket;
      } else {
        let mut i = bucket - 1;
        while self.queues[i].is_empty() {
          i -= 1;
        }
        self.next_nonempty[bucket] = self.next_nonempty[i];
        self.next_nonempty[i] = bucket;
      }
    }
    self.queues[bucket].push_back(bad);
    self.count += 1;
  }

  pub fn dequeue(&mut self) -> Option<BadTri> {
    if self.first_nonempty == BUCKETS {
      return None;
    }
    let bucket = self.first_nonempty;
    let bad = self.queues[bucket].pop_front().expect("threaded bucket is nonempty");
    if self.queues[bucket].is_empty() {
      self.first_nonempty = self.next_nonempty[bucket];
    }
    self.count -= 1;
    Some(bad)
  }

  pub fn clear(&mut self) {
    for q in &mut self.queues {
      q.clear();
    }
    self.next_nonempty.iter_mut().for_each(|n| *n = BUCKETS);
    self.first_nonempty = BUCKETS;
    self.count = 0;
  }
}

impl Mesh {
  /// Queues a subsegment for splitting, remembering its endpoints.
  pub(crate) fn queue_bad_subseg(&mut self, os: Osub) {
    let org = self.sorg(os);
    let dest = self.sdest(os);
    self.bad_subsegs.push_back(BadSubseg { sub: os, org, dest });
  }

  /// Tests a subsegment for encroachment by the apexes of its two
  /// adjoining triangles and queues it if (and as) the splitting policy
  /// allows. Returns a bitmask: 1 for the subsegment's own side, 2 for
  /// the mirror side.
  pub(crate) fn check_seg_for_encroach(&mut self, testsubseg: Osub) -> u8 {
    let eorg = self.sorg(testsubseg);
    let edest = self.sdest(testsubseg);
    let po = self.pt(eorg);
    let pd = self.pt(edest);
    let mut encroached = 0u8;
    let mut sides = 0;

    let check_side = |mesh: &Mesh, side: Osub| -> bool {
      let neighbortri = mesh.sub_tri(side);
      if neighbortri.is_dummy() {
        return false;
      }
      let pa = mesh.pt(mesh.apex(neighbortri));
      let dot = (po.x - pa.x) * (pd.x - pa.x) + (po.y - pa.y) * (pd.y - pa.y);
      if dot >= 0.0 {
        return false;
      }
      // Outside the diametral disk. Without full conformity the lens
      // suffices: the apex must also subtend the good-angle bound.
      if mesh.settings.conforming_delaunay {
        return true;
      }
      let lens = 2.0 * mesh.settings.good_angle() - 1.0;
      dot * dot >= lens * lens * po.distance_sq(&pa) * pd.distance_sq(&pa)
    };

    if !self.sub_tri(testsubseg).is_dummy() {
      sides += 1;
      if check_side(self, testsubseg) {
        encroached |= 1;
      }
    }
    let testsym = testsubseg.ssym();
    if !self.sub_tri(testsym).is_dummy() {
      sides += 1;
      if check_side(self, testsym) {
        encroached |= 2;
      }
    }

    if encroached != 0 {
      let enq = match self.settings.no_bisect {
        crate::data::Bisection::Any => true,
        crate::data::Bisection::InternalOnly => sides == 2,
        crate::data::Bisection::None => false,
      };
      if enq {
        let side = if encroached & 1 != 0 { testsubseg } else { testsym };
        self.queue_bad_subseg(side);
      }
    }
    encroached
  }

  /// Grades a triangle against the active quality criteria and queues it
  /// when it fails one, unless the seditious-triangle rule exempts it.
  pub(crate) fn test_triangle(&mut self, testtri: Otri) {
    let torg = self.org(testtri);
    let tdest = self.dest(testtri);
    let tapex = self.apex(testtri);
    if torg.is_none() || tdest.is_none() || tapex.is_none() {
      return;
    }
    let po = self.pt(torg);
    let pd = self.pt(tdest);
    let pa = self.pt(tapex);

    let dxod = po.x - pd.x;
    let dyod = po.y - pd.y;
    let dxda = pd.x - pa.x;
    let dyda = pd.y - pa.y;
    let dxao = pa.x - po.x;
    let dyao = pa.y - po.y;
    let apexlen = dxod * dxod + dyod * dyod;
    let orglen = dxda * dxda + dyda * dyda;
    let destlen = dxao * dxao + dyao * dyao;

    // The smallest angle is opposite the shortest edge; its squared cosine
    // comes straight from the dot product of the flanking edges.
    let (minedge, angle, base1, base2, tri1);
    if apexlen < orglen && apexlen < destlen {
      minedge = apexlen;
      let dot = dxda * dxao + dyda * dyao;
      angle = dot * dot / (orglen * destlen);
      base1 = torg;
      base2 = tdest;
      tri1 = testtri;
    } else if orglen < destlen {
      minedge = orglen;
      let dot = dxod * dxao + dyod * dyao;
      angle = dot * dot / (apexlen * destlen);
      base1 = tdest;
      base2 = tapex;
      tri1 = testtri.lnext();
    } else {
      minedge = destlen;
      let dot = dxod * dxda + dyod * dyda;
      angle = dot * dot / (apexlen * orglen);
      base1 = tapex;
      base2 = torg;
      tri1 = testtri.lprev();
    }

    let area = 0.5 * (dxod * dyda - dyod * dxda);
    let key = if area > 0.0 { minedge / area } else { 0.0 };
    let enqueue = |mesh: &mut Mesh| {
      mesh.bad_tris.enqueue(BadTri {
        tri: testtri,
        key,
        org: torg,
        dest: tdest,
        apex: tapex,
      });
    };

    if self.settings.var_area || self.settings.fixed_area() || self.settings.user_test.is_some() {
      if self.settings.fixed_area() && area > self.settings.max_area {
        enqueue(self);
        return;
      }
      let bound = self.tri(testtri.tri).area;
      if self.settings.var_area && bound > 0.0 && area > bound {
        enqueue(self);
        return;
      }
      if let Some(unsuitable) = self.settings.user_test {
        if unsuitable(&po, &pd, &pa, area) {
          enqueue(self);
          return;
        }
      }
    }

    let good = if self.settings.quality { self.settings.good_angle() } else { 1.0 };
    let maxgood = self.settings.max_good_angle();
    // Cosine of the largest angle, by the law of cosines on the longest
    // edge.
    let maxcos = if apexlen > orglen && apexlen > destlen {
      (orglen + destlen - apexlen) / (2.0 * (orglen * destlen).sqrt())
    } else if orglen > destlen {
      (apexlen + destlen - orglen) / (2.0 * (apexlen * destlen).sqrt())
    } else {
      (apexlen + orglen - destlen) / (2.0 * (apexlen * orglen).sqrt())
    };

    let bad_min = angle > good;
    let bad_max = self.settings.max_angle != 0.0 && maxcos < maxgood;
    if !(bad_min || bad_max) {
      return;
    }

    // The rule of Miller, Pav, and Walkington: a skinny triangle whose
    // shortest edge joins two segment vertices sitting on concentric
    // power-of-two shells around a shared segment corner is left alone, or
    // the shells would subdivide forever.
    if self.vert(base1).kind == VertexKind::Segment
      && self.vert(base2).kind == VertexKind::Segment
    {
      if let Some((dist1, dist2)) = self.shell_radii(tri1, base1, base2) {
        if dist1 < 1.001 * dist2 && dist1 > 0.999 * dist2 {
          return;
        }
      }
    }

    enqueue(self);
  }

  /// Squared distances from the two endpoints of `tri1`'s current edge to
  /// the shared corner of the segments they lie on, when the segments do
  /// share a corner.
  fn shell_radii(&self, tri1: Otri, base1: VertId, base2: VertId) -> Option<(f64, f64)> {
    let onedge = self.tri_sub(tri1);
    let (seg1, seg2) = if !onedge.is_dummy() {
      // The shortest edge is itself a subsegment; both endpoints lie on
      // the same segment.
      (onedge, onedge)
    } else {
      (
        self.subseg_at_vertex(tri1, base1)?,
        self.subseg_at_vertex(tri1.lnext(), base2)?,
      )
    };
    let ends1 = [self.seg_org(seg1), self.seg_dest(seg1)];
    let ends2 = [self.seg_org(seg2), self.seg_dest(seg2)];
    let shared = ends1
      .iter()
      .find(|e| ends2.contains(e))
      .copied()
      .or_else(|| {
        // Distinct vertices at the same position still form a corner.
        ends1
          .iter()
          .find(|&&e1| ends2.iter().any(|&e2| self.pt(e1) == self.pt(e2)))
          .copied()
      })?;
    let corner = self.pt(shared);
    Some((
      self.pt(base1).distance_sq(&corner),
      self.pt(base2).distance_sq(&corner),
    ))
  }

  /// Rotates clockwise about the origin of `start` (which must be
  /// `vertex`) looking for an incident subsegment.
  fn subseg_at_vertex(&self, start: Otri, vertex: VertId) -> Option<Osub> {
    debug_assert_eq!(self.org(start), vertex);
    let mut current = start;
    for _ in 0..64 {
      let os = self.tri_sub(current);
      if !os.is_dummy() {
        return Some(os);
      }
      current = self.oprev(current);
      if current.is_dummy() || current == start || self.org(current) != vertex {
        return None;
      }
    }
    None
  }

  /// Queues every encroached subsegment in the mesh.
  fn tally_encs(&mut self) {
    for id in self.live_sub_ids() {
      self.check_seg_for_encroach(Osub::new(id, 0));
    }
  }

  /// Queues every bad triangle in the mesh.
  fn tally_faces(&mut self) {
    for id in self.live_tri_ids() {
      self.test_triangle(Otri::new(id, 0));
    }
  }

  /// Splits encroached subsegments until the queue drains or the Steiner
  /// budget runs out. With `triangle_flaws`, new triangles are graded.
  fn split_enc_segs(&mut self, triangle_flaws: bool) -> Result<()> {
    while !self.bad_subsegs.is_empty() && self.steiner_left != 0 {
      let bad = match self.bad_subsegs.pop_front() {
        Some(bad) => bad,
        None => break,
      };
      let currentenc = bad.sub;
      // The subsegment may have been split or deallocated since it was
      // queued; its endpoints tell.
      if self.sub(currentenc.sub).is_dead()
        || self.sorg(currentenc) != bad.org
        || self.sdest(currentenc) != bad.dest
      {
        continue;
      }
      let eorg = bad.org;
      let edest = bad.dest;
      let po = self.pt(eorg);
      let pd = self.pt(edest);

      // If the segment is encroached by free vertices, delete them first;
      // refinement will place better ones.
      let mut enctri = self.sub_tri(currentenc);
      if enctri.is_dummy() {
        continue;
      }
      loop {
        let eapex = self.apex(enctri);
        let pa = self.pt(eapex);
        let inside_disk =
          (po.x - pa.x) * (pd.x - pa.x) + (po.y - pa.y) * (pd.y - pa.y) < 0.0;
        if self.vert(eapex).kind == VertexKind::Free && inside_disk {
          let mut deltri = enctri.lprev();
          self.delete_vertex(&mut deltri, triangle_flaws);
          enctri = self.sub_tri(currentenc);
        } else {
          break;
        }
      }
      loop {
        let mirror = self.sym(enctri);
        if mirror.is_dummy() {
          break;
        }
        let eapex = self.apex(mirror);
        let pa = self.pt(eapex);
        let inside_disk =
          (po.x - pa.x) * (pd.x - pa.x) + (po.y - pa.y) * (pd.y - pa.y) < 0.0;
        if self.vert(eapex).kind == VertexKind::Free && inside_disk {
          let mut deltri = mirror.lprev();
          self.delete_vertex(&mut deltri, triangle_flaws);
          enctri = self.sub_tri(currentenc);
        } else {
          break;
        }
      }

      // Is either endpoint shared with another segment? Check the edges
      // flanking the subsegment in both adjoining triangles. The handle's
      // origin is the subsegment's destination, so the first flank of
      // `enctri` touches eorg and the second touches edest.
      let mut acuteorg = false;
      let mut acutedest = false;
      {
        let testtri = enctri.lnext();
        acuteorg |= !self.tri_sub(testtri).is_dummy();
        let testtri = testtri.lnext();
        acutedest |= !self.tri_sub(testtri).is_dummy();
        let mirror = self.sym(enctri);
        if !mirror.is_dummy() {
          let testtri = mirror.lnext();
          acutedest |= !self.tri_sub(testtri).is_dummy();
          let testtri = testtri.lnext();
          acuteorg |= !self.tri_sub(testtri).is_dummy();
        }
      }

      // Split position: midpoint normally; a power-of-two shell radius
      // when a segment corner is involved, so repeated splits around the
      // corner land on concentric shells.
      let split = if acuteorg || acutedest {
        let segmentlength = po.distance_sq(&pd).sqrt();
        let mut nearestpoweroftwo = 1.0f64;
        while segmentlength > 3.0 * nearestpoweroftwo {
          nearestpoweroftwo *= 2.0;
        }
        while segmentlength < 1.5 * nearestpoweroftwo {
          nearestpoweroftwo *= 0.5;
        }
        let mut split = nearestpoweroftwo / segmentlength;
        if acutedest {
          split = 1.0 - split;
        }
        split
      } else {
        0.5
      };

      let mut point = Point::new(po.x + split * (pd.x - po.x), po.y + split * (pd.y - po.y));
      if !self.settings.no_exact {
        // One step of iterative refinement pulls the rounded point back
        // onto the segment's line.
        let multiplier = predicates::orient2d(&po, &pd, &point, false);
        let divisor = po.distance_sq(&pd);
        if multiplier != 0.0 && divisor != 0.0 {
          let m = multiplier / divisor;
          if m.is_finite() {
            point.x += m * (pd.y - po.y);
            point.y += m * (po.x - pd.x);
          }
        }
      }
      if point == po || point == pd {
        return Err(Error::PrecisionExhausted);
      }

      let attrs: Vec<f64> = self
        .vert(eorg)
        .attrs
        .iter()
        .zip(self.vert(edest).attrs.iter())
        .map(|(a, b)| a + split * (b - a))
        .collect();
      let mark = self.sub(currentenc.sub).mark;
      self
        .verts
        .push(Vertex::new(point, mark, VertexKind::Segment, attrs));
      let newvertex = VertId(self.verts.len() - 1);

      let mut searchtri = enctri;
      match self.insert_vertex(newvertex, &mut searchtri, Some(currentenc), true, triangle_flaws)? {
        InsertOutcome::Successful | InsertOutcome::Encroaching => {}
        _ => return Err(Error::TopologyInconsistency),
      }
      if self.steiner_left > 0 {
        self.steiner_left -= 1;
      }
      self.stats.steiner_used += 1;

      // Check the two halves.
      self.check_seg_for_encroach(currentenc);
      let other = self.spivot(currentenc.ssym());
      if !other.is_dummy() {
        self.check_seg_for_encroach(other);
      }
    }
    Ok(())
  }

  /// Splits one bad triangle by inserting a vertex at its (off-)center.
  /// If the new vertex would encroach upon a subsegment it is withdrawn;
  /// the subsegments were queued and will be split first.
  fn split_bad_triangle(&mut self, bad: &BadTri) -> Result<()> {
    let badotri = bad.tri;
    if self.tri_is_dead(badotri.tri)
      || self.org(badotri) != bad.org
      || self.dest(badotri) != bad.dest
      || self.apex(badotri) != bad.apex
    {
      // The triangle has been refined away since it was queued.
      return Ok(());
    }
    let po = self.pt(bad.org);
    let pd = self.pt(bad.dest);
    let pa = self.pt(bad.apex);

    // The off-center rule only applies to pure angle refinement; area
    // constraints want the true circumcenter.
    let off = if self.settings.fixed_area() || self.settings.var_area {
      0.0
    } else {
      self.settings.off_constant()
    };
    let cc = predicates::circumcenter(&po, &pd, &pa, off, self.settings.no_exact);
    self.stats.circumcenters += 1;

    // Splitting at a corner means precision has run out for this triangle;
    // leave it be.
    if cc.point == po || cc.point == pd || cc.point == pa {
      debug!("circumcenter landed on a triangle corner; leaving the triangle unsplit");
      return Ok(());
    }

    let attrs: Vec<f64> = (0..self.vert(bad.org).attrs.len())
      .map(|i| {
        let a = self.vert(bad.org).attrs[i];
        let b = self.vert(bad.dest).attrs[i];
        let c = self.vert(bad.apex).attrs[i];
        a + cc.xi * (b - a) + cc.eta * (c - a)
      })
      .collect();
    self
      .verts
      .push(Vertex::new(cc.point, 0, VertexKind::Free, attrs));
    let newvertex = VertId(self.verts.len() - 1);

    // Start the search on the edge the new vertex is nearest.
    let mut newtri = badotri;
    if cc.eta < cc.xi {
      newtri = newtri.lprev();
    }
    match self.insert_vertex(newvertex, &mut newtri, None, true, true)? {
      InsertOutcome::Successful => {
        if self.steiner_left > 0 {
          self.steiner_left -= 1;
        }
        self.stats.steiner_used += 1;
      }
      InsertOutcome::Encroaching => {
        // Take the vertex back out; the encroached subsegments are queued.
        self.undo_vertex();
        self.vertex_dealloc(newvertex);
      }
      InsertOutcome::Violating | InsertOutcome::Duplicate => {
        self.vertex_dealloc(newvertex);
      }
    }
    Ok(())
  }

  /// The refinement driver: first make the mesh conforming by splitting
  /// encroached subsegments, then repeatedly split the worst triangle,
  /// giving any subsegments its Steiner point encroached upon priority.
  pub(crate) fn enforce_quality(&mut self) -> Result<()> {
    self.check_quality = true;
    self.bad_tris.clear();
    self.bad_subsegs.clear();

    self.tally_encs();
    self.split_enc_segs(false)?;

    if self.settings.quality
      || self.settings.var_area
      || self.settings.fixed_area()
      || self.settings.user_test.is_some()
    {
      self.tally_faces();
      while self.bad_tris.len() > 0 && self.steiner_left != 0 {
        let bad = self.bad_tris.dequeue().unwrap();
        self.split_bad_triangle(&bad)?;
        if !self.bad_subsegs.is_empty() {
          // Put the triangle back for another try after the subsegments
          // it encroached upon are gone.
          self.bad_tris.enqueue(bad);
          self.split_enc_segs(true)?;
        }
      }
    }

    if !self.bad_subsegs.is_empty() && self.steiner_left == 0 {
      warn!("Steiner point budget exhausted with encroached subsegments remaining");
      self.quality_exhausted = true;
    }
    self.bad_subsegs.clear();
    self.bad_tris.clear();
    self.check_quality = false;
    self.journal.clear();
    Ok(())
  }
}
