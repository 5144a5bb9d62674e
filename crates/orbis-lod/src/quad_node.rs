//! Quadtree node covering one patch of a planet face.
//!
//! Every frame the simulation thread calls [`QuadNode::update`] and then
//! [`QuadNode::draw`] on each root. A node refreshes its mesh, decides
//! whether to split or merge, and recurses into its published children.
//!
//! Splits and merges run on the [`WorkerPool`](crate::WorkerPool):
//!
//! - A split builds, initializes and updates all four children in the
//!   background. The children are published together, as one immutable
//!   [`ChildSet`], only after the last one finishes. If any child fails the
//!   whole split is dropped and the node stays a leaf.
//! - A merge unpublishes the children immediately and disposes them in the
//!   background.
//!
//! The lifecycle is a single atomic [`NodePhase`]; every split/merge starts
//! with a compare-and-swap on it, so a node never runs two at once.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use glam::{DVec3, Mat4};
use orbis_cubesphere::{Extents, PatchDefinition};
use tracing::{debug, trace, warn};

use crate::worker_pool::Job;
use crate::{ClippingPlanes, JoinAll, LodError, QuadMesh, QuadNodeFactory, QuadNodeRenderer};

/// The four children of a branch, in NW, NE, SW, SE order.
pub type ChildSet = Arc<[Arc<QuadNode>; 4]>;

/// Lifecycle of a [`QuadNode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodePhase {
    /// Created by the factory, not yet initialized.
    Uninitialized = 0,
    /// No children; draws its own patch.
    Leaf = 1,
    /// Children are being built in the background; still draws itself.
    Splitting = 2,
    /// Four published children; draw and update delegate to them.
    Branch = 3,
    /// Children unpublished and being disposed; draws itself.
    Merging = 4,
    /// Resources released. Terminal.
    Disposed = 5,
}

impl NodePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => NodePhase::Uninitialized,
            1 => NodePhase::Leaf,
            2 => NodePhase::Splitting,
            3 => NodePhase::Branch,
            4 => NodePhase::Merging,
            _ => NodePhase::Disposed,
        }
    }
}

struct PatchState {
    patch: PatchDefinition,
    location: DVec3,
}

struct PatchResources {
    mesh: Box<dyn QuadMesh>,
    renderer: Box<dyn QuadNodeRenderer>,
}

/// One patch of the planet surface, and the root of its own subtree.
///
/// Nodes are always held in an [`Arc`]: background splits and merges keep
/// the node alive until they have published or discarded their results.
pub struct QuadNode {
    phase: AtomicU8,
    state: OnceLock<PatchState>,
    resources: Mutex<PatchResources>,
    children: RwLock<Option<ChildSet>>,
    factory: QuadNodeFactory,
}

impl QuadNode {
    pub(crate) fn new(
        mesh: Box<dyn QuadMesh>,
        renderer: Box<dyn QuadNodeRenderer>,
        factory: QuadNodeFactory,
    ) -> Self {
        Self {
            phase: AtomicU8::new(NodePhase::Uninitialized as u8),
            state: OnceLock::new(),
            resources: Mutex::new(PatchResources { mesh, renderer }),
            children: RwLock::new(None),
            factory,
        }
    }

    /// Place the node on the planet, build its mesh, and register it in the
    /// statistics. Must be called exactly once, before anything else.
    ///
    /// On error the node stays uninitialized and is not counted.
    ///
    /// # Panics
    ///
    /// Panics if the node was already initialized or disposed, or if
    /// `patch.level` exceeds the configured maximum.
    pub fn initialize(&self, patch: PatchDefinition) -> Result<(), LodError> {
        let settings = self.factory.settings();
        assert_eq!(
            self.phase(),
            NodePhase::Uninitialized,
            "quad node initialized twice"
        );
        assert!(
            patch.level <= settings.maximum_quad_node_level,
            "quad node level {} exceeds maximum {}",
            patch.level,
            settings.maximum_quad_node_level
        );

        let location = patch.location_relative_to_planet(settings.projection);
        self.lock_resources()
            .mesh
            .initialize(&patch)
            .map_err(LodError::MeshInitialization)?;

        assert!(
            self.state.set(PatchState { patch, location }).is_ok(),
            "quad node initialized twice"
        );
        self.factory.statistics().node_created(patch.level);
        self.phase
            .store(NodePhase::Leaf as u8, Ordering::Release);
        trace!(level = patch.level, "quad node initialized");
        Ok(())
    }

    /// Refresh the mesh, apply the split/merge policy, and recurse into the
    /// children published at the time of the call.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been initialized.
    pub fn update(
        self: &Arc<Self>,
        camera_location: DVec3,
        planet_location: DVec3,
        clipping_planes: &ClippingPlanes,
    ) {
        let patch = self.patch_state().patch;
        if self.phase() == NodePhase::Disposed {
            return;
        }

        let (visible, ratio) = {
            let mut resources = self.lock_resources();
            resources
                .mesh
                .update(camera_location, planet_location, clipping_planes);
            (
                resources.mesh.is_visible_to_camera(),
                resources.mesh.camera_distance_to_width_ratio(),
            )
        };

        let settings = *self.factory.settings();
        match self.phase() {
            NodePhase::Leaf
                if visible
                    && ratio < settings.split_ratio
                    && patch.level < settings.maximum_quad_node_level =>
            {
                self.split(&patch, camera_location, planet_location, *clipping_planes);
            }
            NodePhase::Branch if ratio > settings.merge_ratio => self.merge(),
            _ => {}
        }

        if let Some(children) = self.children() {
            for child in children.iter() {
                child.update(camera_location, planet_location, clipping_planes);
            }
        }
    }

    /// Submit draws for the visible leaves of this subtree.
    ///
    /// # Panics
    ///
    /// Panics if the node has not been initialized.
    pub fn draw(&self, camera_location: DVec3, view_matrix: &Mat4, projection_matrix: &Mat4) {
        let location = self.patch_state().location;
        if self.phase() == NodePhase::Disposed {
            return;
        }
        if !self.lock_resources().mesh.is_visible_to_camera() {
            return;
        }

        if let Some(children) = self.children() {
            for child in children.iter() {
                child.draw(camera_location, view_matrix, projection_matrix);
            }
            return;
        }

        let mut resources = self.lock_resources();
        resources
            .renderer
            .draw(location, camera_location, view_matrix, projection_matrix);
        resources
            .mesh
            .draw(camera_location, view_matrix, projection_matrix);
    }

    /// Release the renderer, dispose the subtree, and deregister from the
    /// statistics. Safe to call from any phase; later calls do nothing.
    ///
    /// Children still being built by an in-flight split are disposed by the
    /// split itself when it completes. Children unpublished by a merge are
    /// disposed by the merge.
    pub fn dispose(&self) {
        let previous =
            NodePhase::from_u8(self.phase.swap(NodePhase::Disposed as u8, Ordering::AcqRel));
        if previous == NodePhase::Disposed {
            return;
        }

        self.lock_resources().renderer.dispose();

        let children = self.write_children().take();
        if let Some(children) = children {
            for child in children.iter() {
                child.dispose();
            }
        }

        if previous != NodePhase::Uninitialized
            && let Some(state) = self.state.get()
        {
            self.factory.statistics().node_disposed(state.patch.level);
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> NodePhase {
        NodePhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Depth in the tree (root = 0).
    pub fn level(&self) -> u8 {
        self.patch_state().patch.level
    }

    /// Footprint of this node's patch.
    pub fn extents(&self) -> Extents {
        self.patch_state().patch.extents
    }

    /// Full patch description given at initialization.
    pub fn patch(&self) -> PatchDefinition {
        self.patch_state().patch
    }

    /// Patch center on the sphere, relative to the planet center.
    pub fn location_relative_to_planet(&self) -> DVec3 {
        self.patch_state().location
    }

    /// Snapshot of the published children, if this node is a branch.
    pub fn children(&self) -> Option<ChildSet> {
        self.read_children().clone()
    }

    /// Whether children are currently published.
    pub fn has_children(&self) -> bool {
        self.read_children().is_some()
    }

    /// Visibility reported by the mesh at the last update.
    pub fn is_visible_to_camera(&self) -> bool {
        self.lock_resources().mesh.is_visible_to_camera()
    }

    /// Ratio reported by the mesh at the last update.
    pub fn camera_distance_to_width_ratio(&self) -> f64 {
        self.lock_resources().mesh.camera_distance_to_width_ratio()
    }

    /// Number of leaves in the published subtree.
    pub fn leaf_count(&self) -> usize {
        match self.children() {
            Some(children) => children.iter().map(|c| c.leaf_count()).sum(),
            None => 1,
        }
    }

    /// Deepest level reached by the published subtree.
    pub fn depth(&self) -> u8 {
        match self.children() {
            Some(children) => children
                .iter()
                .map(|c| c.depth())
                .max()
                .unwrap_or_else(|| self.level()),
            None => self.level(),
        }
    }

    fn split(
        self: &Arc<Self>,
        patch: &PatchDefinition,
        camera_location: DVec3,
        planet_location: DVec3,
        clipping_planes: ClippingPlanes,
    ) {
        if !self.transition(NodePhase::Leaf, NodePhase::Splitting) {
            return;
        }

        let pool = Arc::clone(self.factory.pool());
        let mut reservation = match pool.try_reserve(4) {
            Ok(reservation) => reservation,
            Err(err) => {
                // Retried on a later frame.
                trace!(level = patch.level, "split deferred: {err}");
                self.transition(NodePhase::Splitting, NodePhase::Leaf);
                return;
            }
        };
        debug!(level = patch.level, "splitting quad node");

        let parent = Arc::clone(self);
        let join = JoinAll::<Arc<QuadNode>, 4>::new(move |built| parent.finish_split(built));

        for (index, extents) in patch.extents.split().into_iter().enumerate() {
            let child_patch = patch.child(extents);
            let factory = self.factory.clone();
            let slot = Arc::clone(&join);
            let spawned = reservation.spawn(move || {
                let child = build_child(
                    &factory,
                    child_patch,
                    camera_location,
                    planet_location,
                    &clipping_planes,
                );
                slot.complete(index, child);
            });
            if spawned.is_err() {
                join.complete(index, None);
            }
        }
    }

    fn finish_split(&self, built: [Option<Arc<QuadNode>>; 4]) {
        let built: Vec<Arc<QuadNode>> = built.into_iter().flatten().collect();
        let children: [Arc<QuadNode>; 4] = match built.try_into() {
            Ok(children) => children,
            Err(partial) => {
                warn!(
                    level = self.level(),
                    built = partial.len(),
                    "split abandoned: not every child could be built"
                );
                for child in &partial {
                    child.dispose();
                }
                self.transition(NodePhase::Splitting, NodePhase::Leaf);
                return;
            }
        };

        // Publishing under the write lock orders it against `dispose`, which
        // flips the phase before taking the lock.
        let mut published = self.write_children();
        if self.transition(NodePhase::Splitting, NodePhase::Branch) {
            *published = Some(Arc::new(children));
            debug!(level = self.level(), "split published");
        } else {
            drop(published);
            debug!(
                level = self.level(),
                "node disposed during split, discarding children"
            );
            for child in &children {
                child.dispose();
            }
        }
    }

    fn merge(self: &Arc<Self>) {
        if !self.transition(NodePhase::Branch, NodePhase::Merging) {
            return;
        }
        let children = self.write_children().take();
        debug!(level = self.level(), "merging quad node");

        let node = Arc::clone(self);
        let drain = move || {
            if let Some(children) = children {
                for child in children.iter() {
                    child.dispose();
                }
            }
            node.transition(NodePhase::Merging, NodePhase::Leaf);
        };

        let pool = Arc::clone(self.factory.pool());
        let job: Job = match pool.try_reserve(1) {
            Ok(mut reservation) => match reservation.spawn(drain) {
                Ok(()) => return,
                Err(job) => job,
            },
            Err(_) => Box::new(drain),
        };
        trace!(level = self.level(), "merge disposal running inline");
        job();
    }

    fn transition(&self, from: NodePhase, to: NodePhase) -> bool {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn patch_state(&self) -> &PatchState {
        match self.state.get() {
            Some(state) => state,
            None => panic!("quad node used before initialize"),
        }
    }

    fn lock_resources(&self) -> MutexGuard<'_, PatchResources> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_children(&self) -> RwLockReadGuard<'_, Option<ChildSet>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_children(&self) -> RwLockWriteGuard<'_, Option<ChildSet>> {
        self.children.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for QuadNode {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for QuadNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadNode")
            .field("phase", &self.phase())
            .field("level", &self.state.get().map(|s| s.patch.level))
            .field("has_children", &self.has_children())
            .finish()
    }
}

/// Create, initialize, and first-update one child on a worker thread.
///
/// Returns `None` if any step fails or panics; a child that was already
/// registered is disposed first.
fn build_child(
    factory: &QuadNodeFactory,
    patch: PatchDefinition,
    camera_location: DVec3,
    planet_location: DVec3,
    clipping_planes: &ClippingPlanes,
) -> Option<Arc<QuadNode>> {
    let built = catch_unwind(AssertUnwindSafe(|| {
        let child = factory.create();
        child.initialize(patch).map(|()| child)
    }));
    let child = match built {
        Ok(Ok(child)) => child,
        Ok(Err(err)) => {
            warn!(level = patch.level, "child initialization failed: {err}");
            return None;
        }
        Err(_) => {
            warn!(level = patch.level, "child construction panicked");
            return None;
        }
    };

    let updated = catch_unwind(AssertUnwindSafe(|| {
        child.update(camera_location, planet_location, clipping_planes);
    }));
    if updated.is_err() {
        warn!(level = patch.level, "first update of child panicked");
        child.dispose();
        return None;
    }
    Some(child)
}
