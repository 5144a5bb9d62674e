//! End-to-end split/merge behavior of whole planets driven by a moving camera.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use glam::{DVec3, Mat4};
use orbis_cubesphere::{CubeFace, PatchDefinition};
use orbis_lod::{
    ClippingPlanes, LodSettings, NodePhase, PatchBoundsMesh, QuadMesh, QuadNode, QuadNodeFactory,
    QuadNodeRenderer, Statistics, WorkerPool,
};

const TIMEOUT: Duration = Duration::from_secs(10);

struct CountingRenderer {
    draws: Arc<AtomicUsize>,
}

impl QuadNodeRenderer for CountingRenderer {
    fn draw(&mut self, _: DVec3, _: DVec3, _: &Mat4, _: &Mat4) {
        self.draws.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&mut self) {}
}

struct Planet {
    factory: QuadNodeFactory,
    location: DVec3,
    radius: f64,
    draws: Arc<AtomicUsize>,
}

impl Planet {
    fn new(location: DVec3, radius: f64, max_level: u8) -> Self {
        let draws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&draws);
        let factory = QuadNodeFactory::new(
            || -> Box<dyn QuadMesh> { Box::new(PatchBoundsMesh::default()) },
            move || -> Box<dyn QuadNodeRenderer> {
                Box::new(CountingRenderer {
                    draws: Arc::clone(&counter),
                })
            },
            LodSettings::default().with_maximum_level(max_level),
            Arc::new(Statistics::new(max_level)),
            Arc::new(WorkerPool::new(3, 128)),
        );
        Self {
            factory,
            location,
            radius,
            draws,
        }
    }

    fn root(&self, face: CubeFace) -> Arc<QuadNode> {
        let node = self.factory.create();
        node.initialize(PatchDefinition::root(face, self.radius))
            .unwrap();
        node
    }

    /// One simulation frame followed by waiting for background work.
    fn frame(&self, roots: &[Arc<QuadNode>], camera_offset: DVec3) {
        let camera = self.location + camera_offset;
        for root in roots {
            root.update(camera, self.location, &ClippingPlanes::default());
        }
        assert!(self.factory.pool().wait_idle(TIMEOUT));
    }

    fn draw(&self, roots: &[Arc<QuadNode>], camera_offset: DVec3) -> usize {
        let before = self.draws.load(Ordering::SeqCst);
        for root in roots {
            root.draw(
                self.location + camera_offset,
                &Mat4::IDENTITY,
                &Mat4::IDENTITY,
            );
        }
        self.draws.load(Ordering::SeqCst) - before
    }

    fn live_nodes(&self) -> usize {
        self.factory.statistics().number_of_quad_nodes()
    }
}

fn count_nodes(node: &QuadNode) -> usize {
    1 + node
        .children()
        .map(|children| children.iter().map(|c| count_nodes(c)).sum())
        .unwrap_or(0)
}

#[test]
fn test_camera_approach_splits_and_retreat_merges() {
    let planet = Planet::new(DVec3::new(500.0, -20.0, 75.0), 10.0, 19);
    let roots = [planet.root(CubeFace::PosY)];
    let root = &roots[0];

    // Ratio 1.1: not close enough.
    planet.frame(&roots, DVec3::Y * 21.0);
    assert!(!root.has_children());
    assert_eq!(planet.live_nodes(), 1);

    // Ratio 0.9: split.
    planet.frame(&roots, DVec3::Y * 19.0);
    let children = root.children().expect("root should have split");
    assert_eq!(children.len(), 4);
    assert!(children.iter().all(|c| c.level() == 1));
    assert_eq!(planet.live_nodes(), 5);
    assert_eq!(planet.factory.statistics().number_of_quad_nodes_at_level(1), 4);
    assert_eq!(planet.draw(&roots, DVec3::Y * 19.0), 4);

    // Ratio 30: merge.
    planet.frame(&roots, DVec3::Y * 310.0);
    assert!(!root.has_children());
    assert_eq!(root.phase(), NodePhase::Leaf);
    assert_eq!(planet.live_nodes(), 1);
    assert_eq!(planet.draw(&roots, DVec3::Y * 310.0), 1);
    assert!(children.iter().all(|c| c.phase() == NodePhase::Disposed));
}

#[test]
fn test_descent_refines_only_the_face_below_the_camera() {
    let planet = Planet::new(DVec3::ZERO, 10.0, 4);
    let roots: Vec<_> = CubeFace::ALL.iter().map(|&f| planet.root(f)).collect();
    assert_eq!(planet.live_nodes(), 6);

    let low = DVec3::X * 10.05;
    for _ in 0..8 {
        planet.frame(&roots, low);
    }

    let mut total = 0;
    for (face, root) in CubeFace::ALL.iter().zip(&roots) {
        total += count_nodes(root);
        if *face == CubeFace::PosX {
            assert_eq!(root.depth(), 4, "{face:?} should reach the maximum level");
        } else {
            assert_eq!(root.depth(), 0, "{face:?} is out of sight");
        }
    }
    assert_eq!(planet.live_nodes(), total);
    assert_eq!(planet.factory.statistics().snapshot().deepest_level(), Some(4));

    for _ in 0..3 {
        planet.frame(&roots, DVec3::X * 1000.0);
    }
    assert_eq!(planet.live_nodes(), 6);
    assert!(roots.iter().all(|r| r.leaf_count() == 1));

    for root in &roots {
        root.dispose();
    }
    assert!(planet.factory.pool().wait_idle(TIMEOUT));
    assert_eq!(planet.live_nodes(), 0);
}

#[test]
fn test_dropping_a_planet_releases_every_node() {
    let planet = Planet::new(DVec3::ZERO, 10.0, 6);
    let statistics = Arc::clone(planet.factory.statistics());
    {
        let roots: Vec<_> = CubeFace::ALL.iter().map(|&f| planet.root(f)).collect();
        for _ in 0..4 {
            planet.frame(&roots, DVec3::Z * 10.5);
        }
        assert!(statistics.number_of_quad_nodes() > 6);
    }
    assert!(planet.factory.pool().wait_idle(TIMEOUT));
    assert_eq!(statistics.number_of_quad_nodes(), 0);
}
