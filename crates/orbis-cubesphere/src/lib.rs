//! Cube-sphere geometry: face bases, cube-to-sphere projection, and the
//! square patch footprints that the planet quadtree subdivides.

mod cube_face;
mod extents;
mod patch;
mod projection;

pub use cube_face::{CubeFace, FaceBasis};
pub use extents::Extents;
pub use patch::PatchDefinition;
pub use projection::{
    ProjectionMethod, cube_to_sphere_everitt, cube_to_sphere_normalized, project,
};
