//! Contract between a quadtree node and the renderer that places its patch.

use glam::{DVec3, Mat4};

/// Per-node render state: positions the patch relative to the camera and
/// owns whatever GPU resources the patch needs.
pub trait QuadNodeRenderer: Send {
    /// Draw the patch at `location_relative_to_planet`.
    fn draw(
        &mut self,
        location_relative_to_planet: DVec3,
        camera_location: DVec3,
        origin_based_view_matrix: &Mat4,
        projection_matrix: &Mat4,
    );

    /// Release resources. Called once when the owning node is disposed.
    fn dispose(&mut self);
}

/// Creates a fresh renderer for every new node.
pub trait QuadNodeRendererFactory: Send + Sync {
    /// Build a renderer.
    fn create(&self) -> Box<dyn QuadNodeRenderer>;
}

impl<F> QuadNodeRendererFactory for F
where
    F: Fn() -> Box<dyn QuadNodeRenderer> + Send + Sync,
{
    fn create(&self) -> Box<dyn QuadNodeRenderer> {
        self()
    }
}
