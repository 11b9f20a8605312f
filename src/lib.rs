//! 2D constrained Delaunay triangulation, quality meshing, and bounded
//! Voronoi diagrams.
//!
//! The input is a planar straight-line graph ([`Pslg`]): points, optional
//! constraint segments, hole seeds, and region seeds. [`triangulate`]
//! produces a [`Mesh`] — a Delaunay triangulation of the points, optionally
//! constrained by the segments, clipped to the segment-bounded domain, and
//! refined with Steiner vertices until it meets angle and area bounds. The
//! mesh's geometric dual, with cells clipped along constraint segments, is
//! available through [`Mesh::voronoi`].
//!
//! ```
//! use trigon::{triangulate, Pslg, Settings};
//!
//! let mut pslg = Pslg::new();
//! pslg.add_point(0.0, 0.0);
//! pslg.add_point(1.0, 0.0);
//! pslg.add_point(1.0, 1.0);
//! pslg.add_point(0.0, 1.0);
//! for i in 0..4 {
//!   pslg.add_segment(i, (i + 1) % 4, 1);
//! }
//!
//! let mut settings = Settings::default();
//! settings.poly = true;
//! settings.quality = true;
//! settings.max_area = 0.1;
//!
//! let mesh = triangulate(&pslg, &settings).unwrap();
//! assert!(mesh.triangle_count() >= 10);
//! assert!(mesh.check_mesh());
//! ```

use std::fmt;

mod build;
mod carve;
mod constrain;
pub mod data;
mod insert;
mod locate;
mod mesh;
pub mod predicates;
mod refine;
mod topology;
mod voronoi;

pub use data::{
  Algorithm, Bisection, BoundingBox, InputSegment, InputVertex, Point, Pslg, RegionSeed,
  Settings, TriangleUnsuitable, Vertex, VertexKind,
};
pub use mesh::{EdgeOut, Mesh, Statistics, SubsegOut, TriangleOut};
pub use voronoi::{BoundedVoronoi, VoronoiRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
  /// Fewer than three input points.
  InsufficientVertices,
  /// A constraint segment's endpoints refer to the same input point.
  CoincidentSegment,
  /// A constraint segment refers to a point index that does not exist.
  SegmentOutOfBounds,
  /// Input points carry differing numbers of user attributes.
  AttributeArity,
  /// A configuration value is outside its documented range.
  SettingOutOfRange,
  /// A segment split landed exactly on an existing endpoint; the input
  /// exceeds what double precision can subdivide.
  PrecisionExhausted,
  /// A structural invariant was violated mid-operation.
  TopologyInconsistency,
}

impl fmt::Display for Error {
  fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
    let msg = match self {
      Error::InsufficientVertices => "need at least three input points",
      Error::CoincidentSegment => "segment endpoints coincide",
      Error::SegmentOutOfBounds => "segment endpoint index out of range",
      Error::AttributeArity => "inconsistent point attribute counts",
      Error::SettingOutOfRange => "configuration value out of range",
      Error::PrecisionExhausted => "ran out of precision splitting a segment",
      Error::TopologyInconsistency => "mesh topology invariant violated",
    };
    write!(fmt, "{}", msg)
  }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Triangulates a planar straight-line graph.
///
/// The pipeline: construct a Delaunay triangulation of the points, force
/// the constraint segments in, carve holes and concavities (PSLG mode),
/// refine for quality, and number the result for output.
pub fn triangulate(pslg: &Pslg, settings: &Settings) -> Result<Mesh> {
  settings.validate()?;
  pslg.validate()?;
  let mut mesh = Mesh::new(pslg, settings);
  mesh.build()?;
  if settings.poly {
    mesh.form_skeleton(pslg)?;
    if mesh.triangle_count() > 0 {
      mesh.carve_holes()?;
    }
  }
  if (settings.refines() || settings.conforming_delaunay) && mesh.triangle_count() > 0 {
    mesh.enforce_quality()?;
  }
  mesh.renumber();
  Ok(mesh)
}
