//! Error types for quadtree construction and background work.

/// Error returned by a mesh that fails to build its patch geometry.
pub type MeshError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the quadtree and its worker pool.
#[derive(Debug, thiserror::Error)]
pub enum LodError {
    /// The node's mesh could not build its geometry.
    #[error("mesh initialization failed: {0}")]
    MeshInitialization(#[source] MeshError),

    /// Not enough worker pool capacity to reserve the requested jobs.
    #[error("worker pool exhausted: requested {requested} jobs, {available} available")]
    PoolExhausted {
        /// Jobs asked for.
        requested: usize,
        /// Free slots at the time of the request.
        available: usize,
    },

    /// The worker pool no longer accepts jobs.
    #[error("worker pool has been shut down")]
    PoolShutDown,
}
