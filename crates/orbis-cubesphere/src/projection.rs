//! Cube-to-sphere projection methods.
//!
//! Both methods take a point on the surface of the `[-1, 1]` cube (one
//! coordinate is `±1`) and return a point on the unit sphere:
//! - **Normalized**: divide by length. Cheap, and the mapping used to place
//!   patch centers by default.
//! - **Everitt**: analytic mapping with better area uniformity.

use glam::DVec3;

/// Selects which cube-to-sphere projection method to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ProjectionMethod {
    /// Normalize the cube point.
    #[default]
    Normalized,
    /// Everitt/Mathworld analytic projection.
    Everitt,
}

/// Project a cube-surface point onto the unit sphere by normalization.
#[inline]
#[must_use]
pub fn cube_to_sphere_normalized(cube_point: DVec3) -> DVec3 {
    cube_point.normalize()
}

/// Analytic cube-to-sphere using the Everitt/Mathworld mapping:
///
/// ```text
/// sx = x * sqrt(1 - y²/2 - z²/2 + y²z²/3)
/// sy = y * sqrt(1 - x²/2 - z²/2 + x²z²/3)
/// sz = z * sqrt(1 - x²/2 - y²/2 + x²y²/3)
/// ```
#[inline]
#[must_use]
pub fn cube_to_sphere_everitt(cube_point: DVec3) -> DVec3 {
    let x2 = cube_point.x * cube_point.x;
    let y2 = cube_point.y * cube_point.y;
    let z2 = cube_point.z * cube_point.z;

    DVec3::new(
        cube_point.x * (1.0 - y2 / 2.0 - z2 / 2.0 + y2 * z2 / 3.0).sqrt(),
        cube_point.y * (1.0 - x2 / 2.0 - z2 / 2.0 + x2 * z2 / 3.0).sqrt(),
        cube_point.z * (1.0 - x2 / 2.0 - y2 / 2.0 + x2 * y2 / 3.0).sqrt(),
    )
}

/// Project a cube-surface point onto the unit sphere using the given method.
#[inline]
#[must_use]
pub fn project(cube_point: DVec3, method: ProjectionMethod) -> DVec3 {
    match method {
        ProjectionMethod::Normalized => cube_to_sphere_normalized(cube_point),
        ProjectionMethod::Everitt => cube_to_sphere_everitt(cube_point),
    }
}
