//! Scripted camera flight: dive from high orbit to low altitude and climb
//! back out over a fixed number of frames.

use glam::{DVec3, Mat4, Vec3};
use orbis_config::PlanetConfig;

/// Field of view used for the projection matrix.
const FOV_Y_RADIANS: f32 = std::f32::consts::FRAC_PI_3;

/// Camera trajectory above a planet.
///
/// Altitude is interpolated geometrically so that each frame covers the same
/// fraction of the remaining distance, which is what the quadtree sees as a
/// steady change in detail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlightPath {
    radius: f64,
    start_altitude: f64,
    far_altitude: f64,
    frames: u32,
    direction: DVec3,
}

impl FlightPath {
    /// Path over the planet described by `config`, approaching along `direction`.
    pub fn new(config: &PlanetConfig, direction: DVec3) -> Self {
        Self {
            radius: config.radius,
            start_altitude: config.start_altitude.max(f64::EPSILON),
            far_altitude: config.far_altitude.max(config.start_altitude),
            frames: config.frames,
            direction: direction.normalize_or(DVec3::Y),
        }
    }

    /// Number of frames in the flight.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Altitude above the surface at `frame`.
    ///
    /// Starts at the far altitude, reaches the start altitude halfway, and
    /// ends where it began.
    pub fn altitude_at(&self, frame: u32) -> f64 {
        if self.frames <= 1 {
            return self.start_altitude;
        }
        let phase = f64::from(frame.min(self.frames - 1)) / f64::from(self.frames - 1);
        let descent = 1.0 - (2.0 * phase - 1.0).abs();
        self.far_altitude * (self.start_altitude / self.far_altitude).powf(descent)
    }

    /// Camera offset from the planet center at `frame`.
    pub fn camera_offset(&self, frame: u32) -> DVec3 {
        self.direction * (self.radius + self.altitude_at(frame))
    }

    /// View matrix with the camera at the origin looking at the planet center.
    pub fn origin_based_view_matrix(&self) -> Mat4 {
        let forward = (-self.direction).as_vec3();
        let up = if forward.abs_diff_eq(Vec3::Y, 1e-3) || forward.abs_diff_eq(Vec3::NEG_Y, 1e-3) {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_to_rh(Vec3::ZERO, forward, up)
    }

    /// Perspective projection covering the nearest and farthest visible surface.
    pub fn projection_matrix(&self, aspect_ratio: f32, frame: u32) -> Mat4 {
        let altitude = self.altitude_at(frame);
        let near = (altitude * 0.5).max(0.01) as f32;
        let far = (altitude + 2.0 * self.radius) as f32;
        Mat4::perspective_rh(FOV_Y_RADIANS, aspect_ratio, near, far.max(near * 2.0))
    }
}
