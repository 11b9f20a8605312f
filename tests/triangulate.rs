use std::collections::HashSet;

use proptest::prelude::*;
use trigon::{triangulate, Algorithm, Point, Pslg, Settings, VertexKind};

fn pslg_from(points: &[(f64, f64)]) -> Pslg {
  let mut pslg = Pslg::new();
  for &(x, y) in points {
    pslg.add_point(x, y);
  }
  pslg
}

fn settings_for(algorithm: Algorithm) -> Settings {
  let mut settings = Settings::default();
  settings.algorithm = algorithm;
  settings
}

const ALGORITHMS: [Algorithm; 2] = [Algorithm::Dwyer, Algorithm::Incremental];

#[test]
fn single_triangle() {
  for algorithm in ALGORITHMS {
    let pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
    let mesh = triangulate(&pslg, &settings_for(algorithm)).unwrap();
    assert_eq!(mesh.triangle_count(), 1);
    assert_eq!(mesh.hull_size(), 3);
    let tri = mesh.triangles().next().unwrap();
    assert_eq!(tri.neighbors, [None; 3]);
    assert_eq!(tri.subsegs, [None; 3]);
    let mut corners: Vec<usize> = tri.vertices.to_vec();
    corners.sort_unstable();
    assert_eq!(corners, vec![0, 1, 2]);
    assert!(mesh.check_mesh());
  }
}

#[test]
fn collinear_triple() {
  for algorithm in ALGORITHMS {
    let pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
    let mesh = triangulate(&pslg, &settings_for(algorithm)).unwrap();
    assert_eq!(mesh.triangle_count(), 0);
    assert_eq!(mesh.hull_size(), 2);
    assert!(mesh.check_mesh());
  }
}

#[test]
fn unit_square() {
  for algorithm in ALGORITHMS {
    let pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    let mesh = triangulate(&pslg, &settings_for(algorithm)).unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.hull_size(), 4);
    // The two triangles share exactly one diagonal.
    let diagonals: Vec<_> = mesh
      .edges()
      .filter(|e| {
        (e.p0 == 0 && e.p1 == 2) || (e.p0 == 2 && e.p1 == 0) || (e.p0 == 1 && e.p1 == 3)
          || (e.p0 == 3 && e.p1 == 1)
      })
      .collect();
    assert_eq!(diagonals.len(), 1);
    assert_eq!(mesh.edges().count(), 5);
    assert!(mesh.check_mesh());
    assert!(mesh.check_delaunay());
  }
}

#[test]
fn constrained_square_diagonal() {
  for algorithm in ALGORITHMS {
    let mut pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    pslg.add_segment(0, 2, 0);
    let mut settings = settings_for(algorithm);
    settings.poly = true;
    let mesh = triangulate(&pslg, &settings).unwrap();
    assert_eq!(mesh.triangle_count(), 2);
    let subsegs: Vec<_> = mesh.subsegs().collect();
    assert_eq!(subsegs.len(), 1);
    let s = subsegs[0];
    assert!((s.p0 == 0 && s.p1 == 2) || (s.p0 == 2 && s.p1 == 0));
    assert_eq!(s.mark, 0);
    // The forced diagonal is an edge of the mesh.
    assert!(mesh
      .edges()
      .any(|e| (e.p0 == 0 && e.p1 == 2) || (e.p0 == 2 && e.p1 == 0)));
    assert!(mesh.check_mesh());
    assert!(mesh.check_delaunay());
  }
}

fn annulus() -> Pslg {
  let mut pslg = pslg_from(&[
    (0.0, 0.0),
    (10.0, 0.0),
    (10.0, 10.0),
    (0.0, 10.0),
    (3.0, 3.0),
    (7.0, 3.0),
    (7.0, 7.0),
    (3.0, 7.0),
  ]);
  for &(a, b) in &[(0, 1), (1, 2), (2, 3), (3, 0), (4, 5), (5, 6), (6, 7), (7, 4)] {
    pslg.add_segment(a, b, 0);
  }
  pslg.add_hole(5.0, 5.0);
  pslg
}

#[test]
fn square_with_hole() {
  for algorithm in ALGORITHMS {
    let mut settings = settings_for(algorithm);
    settings.poly = true;
    let mesh = triangulate(&annulus(), &settings).unwrap();
    assert!(mesh.triangle_count() > 0);
    assert!(mesh.check_mesh());
    assert!(mesh.check_delaunay());
    // No triangle's centroid falls inside the hole.
    let vertices: Vec<(usize, Point)> = mesh.vertices().map(|(id, v)| (id, v.point)).collect();
    let point_of = |id: usize| vertices.iter().find(|(i, _)| *i == id).unwrap().1;
    for tri in mesh.triangles() {
      let [a, b, c] = tri.vertices;
      let (pa, pb, pc) = (point_of(a), point_of(b), point_of(c));
      let cx = (pa.x + pb.x + pc.x) / 3.0;
      let cy = (pa.y + pb.y + pc.y) / 3.0;
      assert!(!(cx > 3.0 && cx < 7.0 && cy > 3.0 && cy < 7.0));
    }
    // Every vertex sits on a boundary and is marked.
    for (_, v) in mesh.vertices() {
      assert_eq!(v.mark, 1);
    }
    // The inner subsegments were promoted to boundary mark 1.
    for s in mesh.subsegs() {
      assert_eq!(s.mark, 1);
    }
  }
}

#[test]
fn hull_is_a_single_cycle() {
  let pslg = pslg_from(&[
    (0.0, 0.0),
    (4.0, 0.0),
    (5.0, 3.0),
    (2.0, 5.0),
    (-1.0, 2.0),
    (2.0, 2.0),
    (3.0, 1.0),
  ]);
  for algorithm in ALGORITHMS {
    let mesh = triangulate(&pslg, &settings_for(algorithm)).unwrap();
    let cycle = mesh.hull_cycle();
    assert_eq!(cycle.len(), mesh.hull_size());
    let unique: HashSet<_> = cycle.iter().collect();
    assert_eq!(unique.len(), cycle.len());
    assert_eq!(cycle.len(), 5);
  }
}

#[test]
fn reconstruction_is_isomorphic() {
  let mut settings = Settings::default();
  settings.poly = true;
  settings.seed = 7;
  let mesh = triangulate(&annulus(), &settings).unwrap();

  // Rebuild the input from the exported mesh.
  let mut rebuilt = Pslg::new();
  let mut exported: Vec<(usize, Point, i32)> =
    mesh.vertices().map(|(id, v)| (id, v.point, v.mark)).collect();
  exported.sort_by_key(|(id, _, _)| *id);
  for (_, p, mark) in &exported {
    rebuilt.add_point_with(p.x, p.y, *mark, Vec::new());
  }
  for s in mesh.subsegs() {
    rebuilt.add_segment(s.p0, s.p1, s.mark);
  }
  rebuilt.add_hole(5.0, 5.0);

  let remesh = triangulate(&rebuilt, &settings).unwrap();
  assert_eq!(remesh.triangle_count(), mesh.triangle_count());
  assert_eq!(remesh.hull_size(), mesh.hull_size());

  let edge_set = |m: &trigon::Mesh| -> HashSet<((u64, u64), (u64, u64))> {
    let verts: Vec<(usize, Point)> = m.vertices().map(|(id, v)| (id, v.point)).collect();
    let point_of = |id: usize| verts.iter().find(|(i, _)| *i == id).unwrap().1;
    m.edges()
      .map(|e| {
        let a = point_of(e.p0);
        let b = point_of(e.p1);
        let ka = (a.x.to_bits(), a.y.to_bits());
        let kb = (b.x.to_bits(), b.y.to_bits());
        if ka < kb {
          (ka, kb)
        } else {
          (kb, ka)
        }
      })
      .collect()
  };
  assert_eq!(edge_set(&mesh), edge_set(&remesh));
}

#[test]
fn duplicate_points_are_undead_and_jettisoned() {
  let mut pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 0.0)]);
  let settings = Settings::default();
  let mesh = triangulate(&pslg, &settings).unwrap();
  assert_eq!(mesh.undeads(), 1);
  assert_eq!(mesh.vertices().count(), 4);
  assert!(mesh
    .vertices()
    .any(|(_, v)| v.kind == VertexKind::Undead));

  pslg.add_point(0.0, 1.0); // another duplicate
  let mut settings = Settings::default();
  settings.jettison = true;
  let mesh = triangulate(&pslg, &settings).unwrap();
  assert_eq!(mesh.undeads(), 2);
  assert_eq!(mesh.vertices().count(), 3);
}

#[test]
fn sweepline_setting_is_accepted() {
  let pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
  let mesh = triangulate(&pslg, &settings_for(Algorithm::SweepLine)).unwrap();
  assert_eq!(mesh.triangle_count(), 2);
}

#[test]
fn invalid_inputs_are_rejected_before_meshing() {
  let mut pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
  pslg.add_segment(0, 0, 0);
  assert!(matches!(
    triangulate(&pslg, &Settings::default()),
    Err(trigon::Error::CoincidentSegment)
  ));

  let pslg = pslg_from(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
  let mut settings = Settings::default();
  settings.min_angle = 75.0;
  assert!(matches!(
    triangulate(&pslg, &settings),
    Err(trigon::Error::SettingOutOfRange)
  ));
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(24))]
  #[test]
  fn random_point_sets_are_delaunay(
    raw in prop::collection::vec((0i32..60, 0i32..60), 3..40),
    dwyer in proptest::bool::ANY,
  ) {
    let points: Vec<(f64, f64)> = raw.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    let pslg = pslg_from(&points);
    let mut settings = Settings::default();
    settings.algorithm = if dwyer { Algorithm::Dwyer } else { Algorithm::Incremental };
    let mesh = triangulate(&pslg, &settings).unwrap();
    prop_assert!(mesh.check_mesh());
    prop_assert!(mesh.check_delaunay());
    // Duplicates are dropped, and Euler's formula pins the triangle count:
    // T = 2(n - 1) - h for n distinct vertices and hull length h.
    let n = raw
      .iter()
      .collect::<std::collections::HashSet<_>>()
      .len();
    prop_assert_eq!(mesh.undeads(), points.len() - n);
    if mesh.triangle_count() > 0 {
      prop_assert_eq!(mesh.triangle_count(), 2 * (n - 1) - mesh.hull_size());
    }
  }
}
