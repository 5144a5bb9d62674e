//! Construction of fully wired, uninitialized quadtree nodes.

use std::sync::Arc;

use crate::{
    LodSettings, QuadMeshFactory, QuadNode, QuadNodeRendererFactory, Statistics, WorkerPool,
};

/// Builds nodes wired to a fresh mesh, a fresh renderer, and the shared
/// settings, statistics, and worker pool.
///
/// Cloning is cheap; every node keeps a clone so it can build its children.
#[derive(Clone)]
pub struct QuadNodeFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    mesh_factory: Box<dyn QuadMeshFactory>,
    renderer_factory: Box<dyn QuadNodeRendererFactory>,
    settings: LodSettings,
    statistics: Arc<Statistics>,
    pool: Arc<WorkerPool>,
}

impl QuadNodeFactory {
    /// Wire a factory from its collaborators.
    ///
    /// # Panics
    ///
    /// Panics if `statistics` cannot track every level up to
    /// `settings.maximum_quad_node_level`.
    pub fn new(
        mesh_factory: impl QuadMeshFactory + 'static,
        renderer_factory: impl QuadNodeRendererFactory + 'static,
        settings: LodSettings,
        statistics: Arc<Statistics>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        assert!(
            statistics.maximum_level() >= settings.maximum_quad_node_level,
            "statistics track levels up to {}, settings allow {}",
            statistics.maximum_level(),
            settings.maximum_quad_node_level
        );
        Self {
            inner: Arc::new(FactoryInner {
                mesh_factory: Box::new(mesh_factory),
                renderer_factory: Box::new(renderer_factory),
                settings,
                statistics,
                pool,
            }),
        }
    }

    /// A new uninitialized node. Call [`QuadNode::initialize`] before use.
    pub fn create(&self) -> Arc<QuadNode> {
        let mesh = self.inner.mesh_factory.create();
        let renderer = self.inner.renderer_factory.create();
        Arc::new(QuadNode::new(mesh, renderer, self.clone()))
    }

    /// Split/merge policy shared by every node.
    pub fn settings(&self) -> &LodSettings {
        &self.inner.settings
    }

    /// Shared live-node counters.
    pub fn statistics(&self) -> &Arc<Statistics> {
        &self.inner.statistics
    }

    /// Pool running splits and merges.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.inner.pool
    }
}

impl std::fmt::Debug for QuadNodeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadNodeFactory")
            .field("settings", &self.inner.settings)
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}
