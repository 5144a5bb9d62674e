//! The six faces of a cubesphere and their (normal, u, v) bases.

use glam::DVec3;

/// The six faces of the cube that forms the cubesphere.
///
/// Each variant corresponds to a face whose outward normal points
/// along the named axis direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face
    PosX = 0,
    /// −X face
    NegX = 1,
    /// +Y face
    PosY = 2,
    /// −Y face
    NegY = 3,
    /// +Z face
    PosZ = 4,
    /// −Z face
    NegZ = 5,
}

/// Orthonormal basis of one face: outward normal plus the two in-plane
/// parameterization axes. `u × v == normal` for every face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBasis {
    /// Outward unit normal; the face plane sits at distance 1 along it.
    pub normal: DVec3,
    /// Direction of increasing `u` (west → east).
    pub u: DVec3,
    /// Direction of increasing `v` (north → south).
    pub v: DVec3,
}

impl CubeFace {
    /// All six faces in canonical order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// The opposite face (e.g., `PosX` → `NegX`).
    #[must_use]
    pub fn opposite(self) -> CubeFace {
        match self {
            CubeFace::PosX => CubeFace::NegX,
            CubeFace::NegX => CubeFace::PosX,
            CubeFace::PosY => CubeFace::NegY,
            CubeFace::NegY => CubeFace::PosY,
            CubeFace::PosZ => CubeFace::NegZ,
            CubeFace::NegZ => CubeFace::PosZ,
        }
    }

    /// The (normal, u, v) basis used to parameterize this face.
    #[must_use]
    pub fn basis(self) -> FaceBasis {
        let (normal, u, v) = match self {
            CubeFace::PosX => (DVec3::X, DVec3::Y, DVec3::Z),
            CubeFace::NegX => (DVec3::NEG_X, DVec3::Z, DVec3::Y),
            CubeFace::PosY => (DVec3::Y, DVec3::Z, DVec3::X),
            CubeFace::NegY => (DVec3::NEG_Y, DVec3::X, DVec3::Z),
            CubeFace::PosZ => (DVec3::Z, DVec3::X, DVec3::Y),
            CubeFace::NegZ => (DVec3::NEG_Z, DVec3::Y, DVec3::X),
        };
        FaceBasis { normal, u, v }
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        self.basis().normal
    }
}
