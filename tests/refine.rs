use trigon::{triangulate, Point, Pslg, Settings, VertexKind};

fn triangle_angles(a: Point, b: Point, c: Point) -> [f64; 3] {
  let corner = |a: Point, b: Point, c: Point| {
    let u = (b.x - a.x, b.y - a.y);
    let v = (c.x - a.x, c.y - a.y);
    let dot = u.0 * v.0 + u.1 * v.1;
    let cross = u.0 * v.1 - u.1 * v.0;
    cross.atan2(dot).abs().to_degrees()
  };
  [corner(a, b, c), corner(b, c, a), corner(c, a, b)]
}

fn points_of(mesh: &trigon::Mesh) -> Vec<(usize, Point, VertexKind)> {
  mesh.vertices().map(|(id, v)| (id, v.point, v.kind)).collect()
}

#[test]
fn sharp_wedge_meets_angle_bound_modulo_sedition() {
  // A long thin wedge: the enclosed angle at (10, 0) is under three
  // degrees, so the bound cannot hold there; the seditious exemption
  // leaves a thin triangle pinned at that corner and nowhere else.
  let mut pslg = Pslg::new();
  pslg.add_point(0.0, 0.0);
  pslg.add_point(10.0, 0.0);
  pslg.add_point(0.0, 0.5);
  for i in 0..3 {
    pslg.add_segment(i, (i + 1) % 3, 1);
  }
  let mut settings = Settings::default();
  settings.poly = true;
  settings.quality = true;
  settings.min_angle = 20.0;
  settings.steiner_points = 2000;

  let mesh = triangulate(&pslg, &settings).unwrap();
  assert!(mesh.check_mesh());
  assert!(mesh.check_delaunay());
  // Steiner vertices were inserted along the long segments.
  assert!(mesh.statistics().steiner_used > 0);
  assert!(mesh.vertices().count() > 3);

  let verts = points_of(&mesh);
  let lookup = |id: usize| {
    let entry = verts.iter().find(|(i, _, _)| *i == id).unwrap();
    (entry.1, entry.2)
  };
  let mut below_bound = 0;
  for tri in mesh.triangles() {
    let (pa, ka) = lookup(tri.vertices[0]);
    let (pb, kb) = lookup(tri.vertices[1]);
    let (pc, kc) = lookup(tri.vertices[2]);
    let angles = triangle_angles(pa, pb, pc);
    let min = angles.iter().cloned().fold(f64::INFINITY, f64::min);
    if min < 20.0 - 1e-9 {
      below_bound += 1;
      // Only the seditious shape is tolerated: the two endpoints of the
      // shortest edge lie on boundary segments.
      let kinds = [ka, kb, kc];
      let seg_vertices = kinds
        .iter()
        .filter(|k| matches!(k, VertexKind::Segment | VertexKind::Input))
        .count();
      assert!(seg_vertices >= 2, "non-seditious triangle below the bound");
    }
  }
  assert!(below_bound <= 2, "too many triangles below the angle bound");
}

#[test]
fn area_bound_holds_everywhere() {
  let mut pslg = Pslg::new();
  pslg.add_point(0.0, 0.0);
  pslg.add_point(4.0, 0.0);
  pslg.add_point(4.0, 4.0);
  pslg.add_point(0.0, 4.0);
  for i in 0..4 {
    pslg.add_segment(i, (i + 1) % 4, 1);
  }
  let mut settings = Settings::default();
  settings.poly = true;
  settings.quality = true;
  settings.min_angle = 20.0;
  settings.max_area = 0.5;
  let mesh = triangulate(&pslg, &settings).unwrap();
  assert!(mesh.check_mesh());
  assert!(mesh.check_delaunay());
  assert!(!mesh.quality_exhausted());

  let verts = points_of(&mesh);
  let lookup = |id: usize| verts.iter().find(|(i, _, _)| *i == id).unwrap().1;
  let mut total = 0.0;
  for tri in mesh.triangles() {
    let a = lookup(tri.vertices[0]);
    let b = lookup(tri.vertices[1]);
    let c = lookup(tri.vertices[2]);
    let area = 0.5 * ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x));
    assert!(area > 0.0);
    assert!(area <= 0.5 + 1e-9);
    let angles = triangle_angles(a, b, c);
    assert!(angles.iter().all(|&deg| deg >= 20.0 - 1e-9));
    total += area;
  }
  // The refined mesh still covers the square exactly.
  assert!((total - 16.0).abs() < 1e-9);
}

#[test]
fn refinement_only_touches_skinny_meshes() {
  // An equilateral-ish triangle already satisfies a 30 degree bound; the
  // refiner must leave it alone.
  let mut pslg = Pslg::new();
  pslg.add_point(0.0, 0.0);
  pslg.add_point(1.0, 0.0);
  pslg.add_point(0.5, 0.9);
  let mut settings = Settings::default();
  settings.quality = true;
  settings.min_angle = 30.0;
  let mesh = triangulate(&pslg, &settings).unwrap();
  assert_eq!(mesh.triangle_count(), 1);
  assert_eq!(mesh.statistics().steiner_used, 0);
}

#[test]
fn steiner_budget_exhaustion_is_flagged() {
  let mut pslg = Pslg::new();
  pslg.add_point(0.0, 0.0);
  pslg.add_point(8.0, 0.0);
  pslg.add_point(8.0, 8.0);
  pslg.add_point(0.0, 8.0);
  for i in 0..4 {
    pslg.add_segment(i, (i + 1) % 4, 1);
  }
  let mut settings = Settings::default();
  settings.poly = true;
  settings.quality = true;
  settings.conforming_delaunay = true;
  settings.max_area = 0.01;
  settings.steiner_points = 3;
  let mesh = triangulate(&pslg, &settings).unwrap();
  // The budget is far too small for the area bound; the partial mesh is
  // still structurally sound.
  assert!(mesh.check_mesh());
  assert!(mesh.vertices().count() <= 7);
}

#[test]
fn variable_area_bounds_follow_regions() {
  let mut pslg = Pslg::new();
  pslg.add_point(0.0, 0.0);
  pslg.add_point(4.0, 0.0);
  pslg.add_point(4.0, 2.0);
  pslg.add_point(0.0, 2.0);
  for i in 0..4 {
    pslg.add_segment(i, (i + 1) % 4, 1);
  }
  // Wall splitting the rectangle in half.
  let a = pslg.add_point(2.0, 0.0);
  let b = pslg.add_point(2.0, 2.0);
  pslg.add_segment(a, b, 2);
  // Left half gets a tight area bound, right half none.
  pslg.add_region(1.0, 1.0, 1, 0.05);
  pslg.add_region(3.0, 1.0, 2, -1.0);

  let mut settings = Settings::default();
  settings.poly = true;
  settings.var_area = true;
  let mesh = triangulate(&pslg, &settings).unwrap();
  assert!(mesh.check_mesh());

  let verts = points_of(&mesh);
  let lookup = |id: usize| verts.iter().find(|(i, _, _)| *i == id).unwrap().1;
  let mut left = 0;
  let mut right = 0;
  for tri in mesh.triangles() {
    let p = [
      lookup(tri.vertices[0]),
      lookup(tri.vertices[1]),
      lookup(tri.vertices[2]),
    ];
    let cx = (p[0].x + p[1].x + p[2].x) / 3.0;
    let area = 0.5
      * ((p[1].x - p[0].x) * (p[2].y - p[0].y) - (p[1].y - p[0].y) * (p[2].x - p[0].x));
    if cx < 2.0 {
      left += 1;
      assert_eq!(tri.region, 1);
      assert!(area <= 0.05 + 1e-9);
    } else {
      right += 1;
      assert_eq!(tri.region, 2);
    }
  }
  assert!(left > right);
}
