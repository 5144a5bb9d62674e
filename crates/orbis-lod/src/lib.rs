//! Planet level-of-detail quadtree: camera-driven split/merge of cube-sphere
//! patches, with children built and disposed on a background worker pool.

mod bounds_mesh;
mod error;
mod factory;
mod mesh;
mod quad_node;
mod renderer;
mod settings;
mod statistics;
mod worker_pool;

pub use bounds_mesh::PatchBoundsMesh;
pub use error::{LodError, MeshError};
pub use factory::QuadNodeFactory;
pub use mesh::{ClippingPlanes, QuadMesh, QuadMeshFactory};
pub use quad_node::{ChildSet, NodePhase, QuadNode};
pub use renderer::{QuadNodeRenderer, QuadNodeRendererFactory};
pub use settings::LodSettings;
pub use statistics::{Statistics, StatisticsSnapshot};
pub use worker_pool::{Job, JoinAll, Reservation, WorkerPool};
