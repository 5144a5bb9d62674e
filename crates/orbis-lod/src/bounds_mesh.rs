//! Geometry-free mesh that derives visibility and detail demand from the
//! patch's projected center and corners.
//!
//! Useful wherever the split/merge policy must run without a heightfield:
//! headless simulation, servers deciding which patches clients need, tests.

use glam::{DVec3, Mat4};
use orbis_cubesphere::{PatchDefinition, ProjectionMethod};

use crate::{ClippingPlanes, MeshError, QuadMesh};

/// Samples a patch at its center and four corners on the sphere surface.
///
/// - Ratio: distance from the camera to the nearest sample, divided by the
///   patch's world width.
/// - Visibility: the sphere bounding the patch is above the camera's
///   horizon, and its nearest point is within the far clipping plane. The
///   near plane does not cull; a patch the camera sits on is always drawn.
#[derive(Clone, Debug)]
pub struct PatchBoundsMesh {
    projection: ProjectionMethod,
    samples: Vec<DVec3>,
    bounding_radius: f64,
    planet_radius: f64,
    world_width: f64,
    visible: bool,
    ratio: f64,
}

impl PatchBoundsMesh {
    /// Create an uninitialized mesh projecting with `projection`.
    pub fn new(projection: ProjectionMethod) -> Self {
        Self {
            projection,
            samples: Vec::new(),
            bounding_radius: 0.0,
            planet_radius: 0.0,
            world_width: 0.0,
            visible: false,
            ratio: f64::INFINITY,
        }
    }

    /// Sample points relative to the planet center (center first).
    pub fn samples(&self) -> &[DVec3] {
        &self.samples
    }

    /// Radius around the center sample enclosing every corner.
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }
}

impl Default for PatchBoundsMesh {
    fn default() -> Self {
        Self::new(ProjectionMethod::default())
    }
}

/// Whether a sphere at `center` with `radius` rises above the horizon seen
/// from `camera`. Both points are relative to the planet center.
///
/// A surface point is visible when its angle from the sub-camera direction
/// is below the horizon angle `acos(r / d)`; the bounding sphere widens that
/// angle by `asin(radius / |center|)`.
fn above_horizon(camera: DVec3, center: DVec3, radius: f64, planet_radius: f64) -> bool {
    let camera_distance = camera.length();
    let center_distance = center.length();
    if camera_distance <= planet_radius || center_distance <= radius {
        return true;
    }

    let cos_angle = center.dot(camera) / (center_distance * camera_distance);

    let cos_horizon = planet_radius / camera_distance;
    let sin_horizon = (1.0 - cos_horizon * cos_horizon).max(0.0).sqrt();
    let sin_margin = radius / center_distance;
    let cos_margin = (1.0 - sin_margin * sin_margin).max(0.0).sqrt();

    cos_angle >= cos_horizon * cos_margin - sin_horizon * sin_margin
}

impl QuadMesh for PatchBoundsMesh {
    fn initialize(&mut self, patch: &PatchDefinition) -> Result<(), MeshError> {
        let (cu, cv) = patch.extents.center();
        let center = patch.surface_point(cu, cv, self.projection);
        let mut samples = Vec::with_capacity(5);
        samples.push(center);
        for (u, v) in patch.extents.corners() {
            samples.push(patch.surface_point(u, v, self.projection));
        }
        // Corners are the points of the patch farthest from its center.
        self.bounding_radius = samples
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0, f64::max);
        self.samples = samples;
        self.planet_radius = patch.planet_radius;
        self.world_width = patch.world_width();
        Ok(())
    }

    fn update(
        &mut self,
        camera_location: DVec3,
        planet_location: DVec3,
        clipping_planes: &ClippingPlanes,
    ) {
        let Some(&center) = self.samples.first() else {
            return;
        };
        let camera = camera_location - planet_location;

        let nearest = self
            .samples
            .iter()
            .map(|p| camera.distance(*p))
            .fold(f64::INFINITY, f64::min);
        let nearest_bound = (camera.distance(center) - self.bounding_radius).max(0.0);

        self.visible = above_horizon(camera, center, self.bounding_radius, self.planet_radius)
            && nearest_bound <= clipping_planes.far;
        self.ratio = if self.world_width > 0.0 {
            nearest / self.world_width
        } else {
            f64::INFINITY
        };
    }

    fn is_visible_to_camera(&self) -> bool {
        self.visible
    }

    fn camera_distance_to_width_ratio(&self) -> f64 {
        self.ratio
    }

    fn draw(&mut self, _camera_location: DVec3, _view_matrix: &Mat4, _projection_matrix: &Mat4) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_cubesphere::CubeFace;

    fn top_root(radius: f64) -> PatchBoundsMesh {
        let mut mesh = PatchBoundsMesh::default();
        mesh.initialize(&PatchDefinition::root(CubeFace::PosY, radius))
            .unwrap();
        mesh
    }

    #[test]
    fn test_uninitialized_mesh_is_hidden_and_far() {
        let mesh = PatchBoundsMesh::default();
        assert!(!mesh.is_visible_to_camera());
        assert!(mesh.camera_distance_to_width_ratio().is_infinite());
    }

    #[test]
    fn test_samples_center_then_corners() {
        let mesh = top_root(10.0);
        assert_eq!(mesh.samples().len(), 5);
        assert!((mesh.samples()[0] - DVec3::Y * 10.0).length() < 1e-12);
        for corner in &mesh.samples()[1..] {
            assert!((corner.length() - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_node_below_horizon_is_hidden() {
        let mut mesh = top_root(10.0);
        mesh.update(DVec3::NEG_Y * 100.0, DVec3::ZERO, &ClippingPlanes::default());
        assert!(!mesh.is_visible_to_camera());
    }

    #[test]
    fn test_node_above_horizon_is_visible() {
        let mut mesh = top_root(10.0);
        mesh.update(DVec3::Y * 100.0, DVec3::ZERO, &ClippingPlanes::default());
        assert!(mesh.is_visible_to_camera());
    }

    #[test]
    fn test_far_plane_hides_patch() {
        let mut mesh = top_root(10.0);
        mesh.update(DVec3::Y * 100.0, DVec3::ZERO, &ClippingPlanes::new(1.0, 50.0));
        assert!(!mesh.is_visible_to_camera());
    }

    #[test]
    fn test_ratio_uses_distance_to_nearest_sample() {
        let mut mesh = top_root(10.0);
        mesh.update(DVec3::Y * 21.0, DVec3::ZERO, &ClippingPlanes::default());
        assert!((mesh.camera_distance_to_width_ratio() - 1.1).abs() < 1e-9);

        mesh.update(DVec3::Y * 19.0, DVec3::ZERO, &ClippingPlanes::default());
        assert!((mesh.camera_distance_to_width_ratio() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_low_camera_between_samples_sees_patch() {
        // One unit above (u, v) = (0.5, 0.25), away from every sample.
        let mut mesh = top_root(100.0);
        let patch = PatchDefinition::root(CubeFace::PosY, 100.0);
        let ground = patch.surface_point(0.5, 0.25, ProjectionMethod::Normalized);
        let camera = ground.normalize() * 101.0;
        for sample in mesh.samples() {
            assert!((camera - *sample).dot(sample.normalize()) < 0.0);
        }

        mesh.update(camera, DVec3::ZERO, &ClippingPlanes::default());
        assert!(mesh.is_visible_to_camera());
        assert!(mesh.camera_distance_to_width_ratio() < 1.0);
    }

    #[test]
    fn test_neighbor_face_hidden_from_low_camera() {
        let mut mesh = PatchBoundsMesh::default();
        mesh.initialize(&PatchDefinition::root(CubeFace::PosY, 10.0))
            .unwrap();
        mesh.update(DVec3::X * 10.05, DVec3::ZERO, &ClippingPlanes::default());
        assert!(!mesh.is_visible_to_camera());
    }

    #[test]
    fn test_camera_inside_planet_sees_everything() {
        let mut mesh = top_root(10.0);
        mesh.update(DVec3::NEG_Y * 5.0, DVec3::ZERO, &ClippingPlanes::default());
        assert!(mesh.is_visible_to_camera());
    }

    #[test]
    fn test_near_plane_does_not_cull() {
        let mut mesh = top_root(10.0);
        mesh.update(DVec3::Y * 10.5, DVec3::ZERO, &ClippingPlanes::new(100.0, 1e6));
        assert!(mesh.is_visible_to_camera());
    }

    #[test]
    fn test_bounding_radius_reaches_corners() {
        let mesh = top_root(10.0);
        let center = mesh.samples()[0];
        for corner in &mesh.samples()[1..] {
            assert!(corner.distance(center) <= mesh.bounding_radius() + 1e-12);
        }
    }

    #[test]
    fn test_ratio_is_relative_to_planet_location() {
        let planet = DVec3::new(1000.0, -50.0, 3.0);
        let mut mesh = top_root(10.0);
        mesh.update(planet + DVec3::Y * 21.0, planet, &ClippingPlanes::default());
        assert!((mesh.camera_distance_to_width_ratio() - 1.1).abs() < 1e-9);
        assert!(mesh.is_visible_to_camera());
    }
}
