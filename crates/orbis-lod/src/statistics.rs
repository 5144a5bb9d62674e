//! Process-wide quadtree node counters.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

/// Live node counters, shared by every node of every tree.
///
/// Nodes register on initialization and deregister on disposal, from the
/// simulation thread as well as from worker threads, so every counter is
/// atomic. Readers get a [`StatisticsSnapshot`] rather than live references.
#[derive(Debug)]
pub struct Statistics {
    quad_nodes: AtomicUsize,
    quad_nodes_at_level: Box<[AtomicUsize]>,
}

/// Point-in-time copy of [`Statistics`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    /// Total live nodes.
    pub quad_nodes: usize,
    /// Live nodes per level, index 0 = roots.
    pub quad_nodes_at_level: Vec<usize>,
}

impl Statistics {
    /// Counters for levels `0..=maximum_level`.
    pub fn new(maximum_level: u8) -> Self {
        let levels = (0..=maximum_level).map(|_| AtomicUsize::new(0)).collect();
        Self {
            quad_nodes: AtomicUsize::new(0),
            quad_nodes_at_level: levels,
        }
    }

    /// Deepest level these counters can track.
    pub fn maximum_level(&self) -> u8 {
        (self.quad_nodes_at_level.len() - 1) as u8
    }

    /// Register a node that just became live at `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level` exceeds [`maximum_level`](Self::maximum_level).
    pub fn node_created(&self, level: u8) {
        self.level_counter(level).fetch_add(1, Ordering::Relaxed);
        self.quad_nodes.fetch_add(1, Ordering::Relaxed);
    }

    /// Deregister a node at `level`.
    pub fn node_disposed(&self, level: u8) {
        let previous = self.level_counter(level).fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "level {level} node count underflow");
        let previous = self.quad_nodes.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "node count underflow");
    }

    /// Total live nodes.
    pub fn number_of_quad_nodes(&self) -> usize {
        self.quad_nodes.load(Ordering::Relaxed)
    }

    /// Live nodes at `level`; zero for levels beyond the tracked range.
    pub fn number_of_quad_nodes_at_level(&self, level: u8) -> usize {
        self.quad_nodes_at_level
            .get(level as usize)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Copy all counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            quad_nodes: self.number_of_quad_nodes(),
            quad_nodes_at_level: self
                .quad_nodes_at_level
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
        }
    }

    fn level_counter(&self, level: u8) -> &AtomicUsize {
        let max = self.maximum_level();
        self.quad_nodes_at_level
            .get(level as usize)
            .unwrap_or_else(|| panic!("level {level} is beyond tracked maximum {max}"))
    }
}

impl StatisticsSnapshot {
    /// Deepest level with at least one live node.
    pub fn deepest_level(&self) -> Option<usize> {
        self.quad_nodes_at_level.iter().rposition(|&n| n > 0)
    }
}
