//! Contract between a quadtree node and the mesh that covers its patch.

use glam::{DVec3, Mat4};
use orbis_cubesphere::PatchDefinition;

use crate::MeshError;

/// Near/far distances forwarded to the mesh visibility test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClippingPlanes {
    /// Near plane distance. Meshes that build a projection use it; patches
    /// are never culled by it, since the camera can sit on the patch.
    pub near: f64,
    /// Far plane distance.
    pub far: f64,
}

impl ClippingPlanes {
    /// Create clipping planes.
    pub fn new(near: f64, far: f64) -> Self {
        Self { near, far }
    }
}

impl Default for ClippingPlanes {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: f64::INFINITY,
        }
    }
}

/// Per-patch geometry plus the visibility and distance metric that drive
/// split/merge decisions.
///
/// A mesh is owned by exactly one node. It is touched by one thread at a
/// time: a worker while the node is being built, the simulation thread once
/// the node is published.
pub trait QuadMesh: Send {
    /// Build geometry for the patch.
    fn initialize(&mut self, patch: &PatchDefinition) -> Result<(), MeshError>;

    /// Refresh visibility and the camera-distance-to-width ratio.
    fn update(
        &mut self,
        camera_location: DVec3,
        planet_location: DVec3,
        clipping_planes: &ClippingPlanes,
    );

    /// Visibility computed by the last [`update`](Self::update).
    fn is_visible_to_camera(&self) -> bool;

    /// Ratio computed by the last [`update`](Self::update); smaller means closer.
    fn camera_distance_to_width_ratio(&self) -> f64;

    /// Submit the patch's vertex and index data.
    fn draw(&mut self, camera_location: DVec3, view_matrix: &Mat4, projection_matrix: &Mat4);
}

/// Creates a fresh mesh for every new node.
pub trait QuadMeshFactory: Send + Sync {
    /// Build an uninitialized mesh.
    fn create(&self) -> Box<dyn QuadMesh>;
}

impl<F> QuadMeshFactory for F
where
    F: Fn() -> Box<dyn QuadMesh> + Send + Sync,
{
    fn create(&self) -> Box<dyn QuadMesh> {
        self()
    }
}
