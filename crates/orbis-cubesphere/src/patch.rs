//! Full description of one quadtree patch: face basis, footprint, depth.

use glam::DVec3;

use crate::{CubeFace, Extents, ProjectionMethod, project};

/// Everything needed to place a patch on the planet.
///
/// Passed to the node and its mesh at initialization. Children are derived
/// with [`child`](Self::child), which keeps the radius and basis and moves
/// one level deeper.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchDefinition {
    /// Planet radius in world units.
    pub planet_radius: f64,
    /// Outward normal of the face plane.
    pub plane_normal: DVec3,
    /// In-plane axis of increasing `u`.
    pub u_vector: DVec3,
    /// In-plane axis of increasing `v`.
    pub v_vector: DVec3,
    /// Footprint of the patch in face coordinates.
    pub extents: Extents,
    /// Depth in the quadtree (root = 0).
    pub level: u8,
}

impl PatchDefinition {
    /// Root patch covering a whole cube face.
    #[must_use]
    pub fn root(face: CubeFace, planet_radius: f64) -> Self {
        let basis = face.basis();
        Self {
            planet_radius,
            plane_normal: basis.normal,
            u_vector: basis.u,
            v_vector: basis.v,
            extents: Extents::FACE,
            level: 0,
        }
    }

    /// The patch one level deeper covering `extents`.
    #[must_use]
    pub fn child(&self, extents: Extents) -> Self {
        Self {
            extents,
            level: self.level + 1,
            ..*self
        }
    }

    /// Point on the unit cube face at parameter `(u, v)`.
    #[must_use]
    pub fn cube_point(&self, u: f64, v: f64) -> DVec3 {
        self.plane_normal + self.u_vector * u + self.v_vector * v
    }

    /// Point on the planet surface (relative to its center) at `(u, v)`.
    #[must_use]
    pub fn surface_point(&self, u: f64, v: f64, method: ProjectionMethod) -> DVec3 {
        project(self.cube_point(u, v), method) * self.planet_radius
    }

    /// Patch center projected onto the sphere and scaled by the radius.
    #[must_use]
    pub fn location_relative_to_planet(&self, method: ProjectionMethod) -> DVec3 {
        let (u, v) = self.extents.center();
        self.surface_point(u, v, method)
    }

    /// Side length of the patch in world units, measured on the unscaled
    /// cube face (a whole face of a radius-`r` planet is `r` wide).
    #[must_use]
    pub fn world_width(&self) -> f64 {
        self.extents.width() / 2.0 * self.planet_radius
    }
}
