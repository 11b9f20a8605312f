//! Orientation and in-circle predicates, filtered in f64 with an exact
//! fallback, plus circumcenter construction.
//!
//! Each predicate first evaluates the plain floating-point determinant and
//! compares it against a semi-static error bound. When the magnitude clears
//! the bound the sign is certain and the cheap result is returned; otherwise
//! the computation is repeated with Shewchuk's adaptive-precision expansions
//! (via the `geometry-predicates` crate), which resolve the sign exactly.

use std::sync::OnceLock;

use crate::data::Point;

#[derive(Debug, Clone, Copy)]
struct ErrorBounds {
  epsilon: f64,
  ccw: f64,
  incircle: f64,
}

/// Finds the machine epsilon by repeated halving, then derives the filter
/// coefficients from it. Computed once per process.
fn bounds() -> &'static ErrorBounds {
  static BOUNDS: OnceLock<ErrorBounds> = OnceLock::new();
  BOUNDS.get_or_init(|| {
    let mut epsilon = 1.0_f64;
    loop {
      let half = epsilon * 0.5;
      if 1.0 + half == 1.0 {
        break;
      }
      epsilon = half;
    }
    ErrorBounds {
      epsilon,
      ccw: (3.0 + 16.0 * epsilon) * epsilon,
      incircle: (10.0 + 96.0 * epsilon) * epsilon,
    }
  })
}

/// The machine epsilon as derived at startup.
pub fn epsilon() -> f64 {
  bounds().epsilon
}

/// Returns a value with the sign of the cross product `(a − c) × (b − c)`:
/// positive when a, b, c turn counter-clockwise, zero when collinear.
///
/// With `no_exact` the raw f64 determinant is returned unconditionally.
pub fn orient2d(a: &Point, b: &Point, c: &Point, no_exact: bool) -> f64 {
  let detleft = (a.x - c.x) * (b.y - c.y);
  let detright = (a.y - c.y) * (b.x - c.x);
  let det = detleft - detright;
  if no_exact {
    return det;
  }

  let detsum = if detleft > 0.0 {
    if detright <= 0.0 {
      return det;
    }
    detleft + detright
  } else if detleft < 0.0 {
    if detright >= 0.0 {
      return det;
    }
    -detleft - detright
  } else {
    return det;
  };

  let errbound = bounds().ccw * detsum;
  if det >= errbound || -det >= errbound {
    det
  } else {
    geometry_predicates::orient2d([a.x, a.y], [b.x, b.y], [c.x, c.y])
  }
}

/// Returns a value with the sign of the in-circle determinant: positive when
/// `d` lies strictly inside the circumcircle of the ccw triangle (a, b, c).
pub fn incircle(a: &Point, b: &Point, c: &Point, d: &Point, no_exact: bool) -> f64 {
  let adx = a.x - d.x;
  let bdx = b.x - d.x;
  let cdx = c.x - d.x;
  let ady = a.y - d.y;
  let bdy = b.y - d.y;
  let cdy = c.y - d.y;

  let bdxcdy = bdx * cdy;
  let cdxbdy = cdx * bdy;
  let alift = adx * adx + ady * ady;

  let cdxady = cdx * ady;
  let adxcdy = adx * cdy;
  let blift = bdx * bdx + bdy * bdy;

  let adxbdy = adx * bdy;
  let bdxady = bdx * ady;
  let clift = cdx * cdx + cdy * cdy;

  let det = alift * (bdxcdy - cdxbdy) + blift * (cdxady - adxcdy) + clift * (adxbdy - bdxady);
  if no_exact {
    return det;
  }

  let permanent = (bdxcdy.abs() + cdxbdy.abs()) * alift
    + (cdxady.abs() + adxcdy.abs()) * blift
    + (adxbdy.abs() + bdxady.abs()) * clift;
  let errbound = bounds().incircle * permanent;
  if det > errbound || -det > errbound {
    det
  } else {
    geometry_predicates::incircle([a.x, a.y], [b.x, b.y], [c.x, c.y], [d.x, d.y])
  }
}

/// A circumcircle center with the barycentric coordinates of the center
/// relative to the triangle's origin.
#[derive(Debug, Clone, Copy)]
pub struct Circumcenter {
  pub point: Point,
  /// Coordinate along the origin→destination axis.
  pub xi: f64,
  /// Coordinate along the origin→apex axis.
  pub eta: f64,
}

/// Computes the circumcenter of the ccw triangle (org, dest, apex).
///
/// When `off > 0` and the triangle's shortest edge is shorter than both
/// others, the returned point is pulled along that edge's perpendicular
/// bisector toward the edge, at a distance controlled by `off`, whenever
/// that lands closer to the shortest edge than the true circumcenter does.
/// Refinement uses this to keep newly created edges from being much shorter
/// than the edge being destroyed.
pub fn circumcenter(org: &Point, dest: &Point, apex: &Point, off: f64, no_exact: bool) -> Circumcenter {
  let xdo = dest.x - org.x;
  let ydo = dest.y - org.y;
  let xao = apex.x - org.x;
  let yao = apex.y - org.y;
  let dodist = xdo * xdo + ydo * ydo;
  let aodist = xao * xao + yao * yao;
  let dadist = (dest.x - apex.x) * (dest.x - apex.x) + (dest.y - apex.y) * (dest.y - apex.y);

  // The ccw area is computed through the filtered predicate so the
  // denominator keeps a trustworthy sign near degeneracy.
  let denominator = if no_exact {
    0.5 / (xdo * yao - xao * ydo)
  } else {
    0.5 / orient2d(dest, apex, org, false)
  };

  let mut dx = (yao * dodist - ydo * aodist) * denominator;
  let mut dy = (xdo * aodist - xao * dodist) * denominator;

  if dodist < aodist && dodist < dadist {
    if off > 0.0 {
      // The edge org→dest is shortest.
      let dxoff = 0.5 * xdo - off * ydo;
      let dyoff = 0.5 * ydo + off * xdo;
      if dxoff * dxoff + dyoff * dyoff < dx * dx + dy * dy {
        dx = dxoff;
        dy = dyoff;
      }
    }
  } else if aodist < dadist {
    if off > 0.0 {
      // The edge org→apex is shortest.
      let dxoff = 0.5 * xao + off * yao;
      let dyoff = 0.5 * yao - off * xao;
      if dxoff * dxoff + dyoff * dyoff < dx * dx + dy * dy {
        dx = dxoff;
        dy = dyoff;
      }
    }
  } else if off > 0.0 {
    // The edge dest→apex is shortest; measure from dest.
    let dxoff = 0.5 * (apex.x - dest.x) - off * (apex.y - dest.y);
    let dyoff = 0.5 * (apex.y - dest.y) + off * (apex.x - dest.x);
    if dxoff * dxoff + dyoff * dyoff < (dx - xdo) * (dx - xdo) + (dy - ydo) * (dy - ydo) {
      dx = xdo + dxoff;
      dy = ydo + dyoff;
    }
  }

  Circumcenter {
    point: Point::new(org.x + dx, org.y + dy),
    xi: (yao * dx - xao * dy) * (2.0 * denominator),
    eta: (xdo * dy - ydo * dx) * (2.0 * denominator),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn epsilon_is_machine_epsilon() {
    assert_eq!(epsilon(), f64::EPSILON);
    assert_eq!(1.0 + epsilon() / 2.0, 1.0);
    assert!(1.0 + epsilon() > 1.0);
  }

  #[test]
  fn orient2d_signs() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(1.0, 0.0);
    let c = Point::new(0.0, 1.0);
    assert!(orient2d(&a, &b, &c, false) > 0.0);
    assert!(orient2d(&a, &c, &b, false) < 0.0);
    assert_eq!(orient2d(&a, &b, &Point::new(2.0, 0.0), false), 0.0);
  }

  #[test]
  fn orient2d_near_collinear_forces_fallback() {
    // The rounded representations of these decimals are not collinear, but
    // the naive determinant is deep below the filter bound, so the sign can
    // only come from the exact path.
    let a = Point::new(0.1, 0.1);
    let b = Point::new(0.2, 0.2);
    let c = Point::new(0.3, 0.3);
    let exact = geometry_predicates::orient2d([a.x, a.y], [b.x, b.y], [c.x, c.y]);
    assert_eq!(orient2d(&a, &b, &c, false), exact);
    assert!(exact != 0.0);
  }

  #[test]
  fn orient2d_exactly_collinear_dyadic_coordinates() {
    let a = Point::new(0.5, 0.5);
    let b = Point::new(1.0, 1.0);
    let c = Point::new(2.0, 2.0);
    assert_eq!(orient2d(&a, &b, &c, false), 0.0);
  }

  #[test]
  fn incircle_signs() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(2.0, 0.0);
    let c = Point::new(0.0, 2.0);
    assert!(incircle(&a, &b, &c, &Point::new(0.5, 0.5), false) > 0.0);
    assert!(incircle(&a, &b, &c, &Point::new(10.0, 10.0), false) < 0.0);
    // (2, 2) is on the circumcircle through the right-angle corner.
    assert_eq!(incircle(&a, &b, &c, &Point::new(2.0, 2.0), false), 0.0);
  }

  #[test]
  fn incircle_near_cocircular_forces_fallback() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(1.0, 0.0);
    let c = Point::new(1.0, 1.0);
    // On the circle through a, b, c up to one ulp.
    let d = Point::new(0.0, 1.0 + f64::EPSILON);
    let exact =
      geometry_predicates::incircle([a.x, a.y], [b.x, b.y], [c.x, c.y], [d.x, d.y]);
    assert_eq!(incircle(&a, &b, &c, &d, false), exact);
    assert!(exact < 0.0);
  }

  #[test]
  fn circumcenter_of_right_triangle() {
    let org = Point::new(0.0, 0.0);
    let dest = Point::new(2.0, 0.0);
    let apex = Point::new(0.0, 2.0);
    let cc = circumcenter(&org, &dest, &apex, 0.0, false);
    assert_eq!(cc.point, Point::new(1.0, 1.0));
    // The center expressed in the (org→dest, org→apex) frame.
    assert!((cc.xi - 0.5).abs() < 1e-12);
    assert!((cc.eta - 0.5).abs() < 1e-12);
  }

  #[test]
  fn off_center_stays_on_bisector_of_shortest_edge() {
    // Shortest edge is org→dest; the off-center must keep x = 0.5.
    let org = Point::new(0.0, 0.0);
    let dest = Point::new(1.0, 0.0);
    let apex = Point::new(0.5, 10.0);
    let off = 1.0;
    let cc = circumcenter(&org, &dest, &apex, off, false);
    assert!((cc.point.x - 0.5).abs() < 1e-12);
    let plain = circumcenter(&org, &dest, &apex, 0.0, false);
    assert!(cc.point.y < plain.point.y);
  }
}
