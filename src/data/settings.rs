use crate::data::Point;
use crate::{Error, Result};

/// Which Delaunay construction algorithm to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
  /// Dwyer's divide-and-conquer with alternating cuts. The default.
  Dwyer,
  /// Incremental insertion inside a distant bounding triangle.
  Incremental,
  /// Accepted for compatibility; delegates to [`Algorithm::Dwyer`].
  SweepLine,
}

/// Which constraint segments quality refinement may split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bisection {
  /// Any segment may be split.
  Any,
  /// Only segments with triangles on both sides may be split.
  InternalOnly,
  /// No segment may be split.
  None,
}

/// A user predicate deciding whether a triangle (given its three corners
/// and signed area) must be refined further.
pub type TriangleUnsuitable = fn(&Point, &Point, &Point, f64) -> bool;

/// Behavior switches for [`crate::triangulate`].
#[derive(Debug, Clone)]
pub struct Settings {
  /// Refine until every angle is at least `min_angle`.
  pub quality: bool,
  /// Minimum angle bound in degrees, within `[0, 60]`.
  pub min_angle: f64,
  /// Maximum angle bound in degrees: 0 (disabled) or within `[90, 180]`.
  pub max_angle: f64,
  /// Global area bound; negative disables it.
  pub max_area: f64,
  /// Honor per-triangle area bounds installed by region seeds.
  pub var_area: bool,
  /// Treat the input as a PSLG whose segments bound the domain.
  pub poly: bool,
  /// Clip to the convex hull instead of carving concavities and holes.
  pub convex: bool,
  /// Use the full diametral-disk encroachment rule (conforming output).
  pub conforming_delaunay: bool,
  /// Ignore the input hole list.
  pub no_holes: bool,
  /// Which segments refinement may bisect.
  pub no_bisect: Bisection,
  /// Budget of Steiner vertices; -1 is unlimited.
  pub steiner_points: i32,
  pub algorithm: Algorithm,
  /// Honor input boundary marks; otherwise marks are recomputed.
  pub use_boundary_markers: bool,
  /// Drop unused input vertices from the output numbering.
  pub jettison: bool,
  /// Skip the exact-arithmetic fallback in the predicates. Benchmarks only.
  pub no_exact: bool,
  /// Seed for the point locator's sampler, so runs are reproducible.
  pub seed: u64,
  /// Extra per-triangle refinement predicate.
  pub user_test: Option<TriangleUnsuitable>,
}

impl Default for Settings {
  fn default() -> Settings {
    Settings {
      quality: false,
      min_angle: 20.0,
      max_angle: 0.0,
      max_area: -1.0,
      var_area: false,
      poly: false,
      convex: false,
      conforming_delaunay: false,
      no_holes: false,
      no_bisect: Bisection::Any,
      steiner_points: -1,
      algorithm: Algorithm::Dwyer,
      use_boundary_markers: true,
      jettison: false,
      no_exact: false,
      seed: 0,
      user_test: None,
    }
  }
}

impl Settings {
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=60.0).contains(&self.min_angle) {
      return Err(Error::SettingOutOfRange);
    }
    if self.max_angle != 0.0 && !(90.0..=180.0).contains(&self.max_angle) {
      return Err(Error::SettingOutOfRange);
    }
    if self.steiner_points < -1 {
      return Err(Error::SettingOutOfRange);
    }
    Ok(())
  }

  /// True when any refinement criterion is active.
  pub fn refines(&self) -> bool {
    self.quality || self.fixed_area() || self.var_area || self.user_test.is_some()
  }

  pub fn fixed_area(&self) -> bool {
    self.max_area > 0.0
  }

  /// cos² of the minimum-angle bound; the skinny-triangle threshold.
  pub fn good_angle(&self) -> f64 {
    let c = (self.min_angle.to_radians()).cos();
    c * c
  }

  /// cos of the maximum-angle bound, or 0 when disabled.
  pub fn max_good_angle(&self) -> f64 {
    if self.max_angle == 0.0 {
      0.0
    } else {
      self.max_angle.to_radians().cos()
    }
  }

  /// Ungor's off-center displacement constant, derived from `min_angle`.
  pub fn off_constant(&self) -> f64 {
    let g = self.good_angle();
    if self.min_angle > 0.0 && g < 1.0 {
      0.475 * ((1.0 + g) / (1.0 - g)).sqrt()
    } else {
      0.0
    }
  }
}
