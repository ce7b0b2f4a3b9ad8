pub mod blade;
pub mod instances;
pub mod sampler;
pub mod surface;

pub use blade::BladeGeometry;
pub use instances::InstanceSet;
pub use sampler::{PlacementTransform, SamplePoint, SurfaceSampler};
pub use surface::{Surface, TriangleMesh};
