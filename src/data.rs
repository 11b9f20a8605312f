mod point;
mod pslg;
mod settings;

pub use point::{Point, Vertex, VertexKind};
pub use pslg::{BoundingBox, InputSegment, InputVertex, Pslg, RegionSeed};
pub use settings::{Algorithm, Bisection, Settings, TriangleUnsuitable};
