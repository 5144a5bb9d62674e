//! Headless planet simulation: six face quadtrees driven by a camera flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::{DVec3, Mat4};
use orbis_config::Config;
use orbis_cubesphere::{CubeFace, PatchDefinition};
use orbis_lod::{
    ClippingPlanes, LodError, LodSettings, PatchBoundsMesh, QuadMesh, QuadNode, QuadNodeFactory,
    QuadNodeRenderer, Statistics, StatisticsSnapshot, WorkerPool,
};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::FlightPath;

/// Aspect ratio of the virtual viewport.
const ASPECT_RATIO: f32 = 16.0 / 9.0;

/// How long to wait for background splits and merges to drain.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Renderer that only counts the draws it is asked to submit.
struct HeadlessRenderer {
    draws: Arc<AtomicUsize>,
}

impl QuadNodeRenderer for HeadlessRenderer {
    fn draw(&mut self, _: DVec3, _: DVec3, _: &Mat4, _: &Mat4) {
        self.draws.fetch_add(1, Ordering::Relaxed);
    }

    fn dispose(&mut self) {}
}

/// Summary of a finished flight.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    /// Frames simulated.
    pub frames: u32,
    /// Most live nodes seen at the end of any frame.
    pub peak_quad_nodes: usize,
    /// Deepest level that held a live node.
    pub deepest_level: Option<usize>,
    /// Leaf draws submitted over the whole flight.
    pub draws: usize,
    /// Counters after the flight, once background work settled.
    pub final_statistics: StatisticsSnapshot,
    /// Wall-clock duration of the flight.
    pub elapsed_ms: u64,
}

/// Six face roots around one planet, plus everything they share.
pub struct Simulation {
    factory: QuadNodeFactory,
    roots: Vec<Arc<QuadNode>>,
    planet_location: DVec3,
    flight: FlightPath,
    clipping_planes: ClippingPlanes,
    draws: Arc<AtomicUsize>,
    lockstep: bool,
}

impl Simulation {
    /// Build the worker pool, factory, and six initialized face roots.
    ///
    /// # Errors
    ///
    /// Returns [`LodError::MeshInitialization`] if a root mesh fails.
    pub fn new(config: &Config) -> Result<Self, LodError> {
        let settings = LodSettings::from(&config.lod);
        let pool = Arc::new(WorkerPool::from_config(&config.workers));
        let statistics = Arc::new(Statistics::new(settings.maximum_quad_node_level));
        let draws = Arc::new(AtomicUsize::new(0));

        let projection = settings.projection;
        let counter = Arc::clone(&draws);
        let factory = QuadNodeFactory::new(
            move || -> Box<dyn QuadMesh> { Box::new(PatchBoundsMesh::new(projection)) },
            move || -> Box<dyn QuadNodeRenderer> {
                Box::new(HeadlessRenderer {
                    draws: Arc::clone(&counter),
                })
            },
            settings,
            statistics,
            pool,
        );

        let mut roots = Vec::with_capacity(CubeFace::ALL.len());
        for face in CubeFace::ALL {
            let root = factory.create();
            root.initialize(PatchDefinition::root(face, config.planet.radius))?;
            roots.push(root);
        }

        let planet_location = DVec3::ZERO;
        let flight = FlightPath::new(&config.planet, DVec3::new(0.3, 1.0, 0.2));
        let far = config.planet.far_altitude + 2.0 * config.planet.radius;
        info!(
            radius = config.planet.radius,
            max_level = settings.maximum_quad_node_level,
            frames = flight.frames(),
            "planet ready"
        );

        Ok(Self {
            factory,
            roots,
            planet_location,
            flight,
            clipping_planes: ClippingPlanes::new(0.0, far),
            draws,
            lockstep: false,
        })
    }

    /// Wait for background work after every frame, making runs reproducible.
    #[must_use]
    pub fn with_lockstep(mut self, lockstep: bool) -> Self {
        self.lockstep = lockstep;
        self
    }

    /// Shared node counters.
    pub fn statistics(&self) -> &Arc<Statistics> {
        self.factory.statistics()
    }

    /// The six face roots.
    pub fn roots(&self) -> &[Arc<QuadNode>] {
        &self.roots
    }

    /// Update then draw every root for one frame.
    pub fn step(&self, frame: u32) {
        let camera_offset = self.flight.camera_offset(frame);
        let camera = self.planet_location + camera_offset;
        for root in &self.roots {
            root.update(camera, self.planet_location, &self.clipping_planes);
        }
        if self.lockstep {
            self.settle();
        }

        let view = self.flight.origin_based_view_matrix();
        let projection = self.flight.projection_matrix(ASPECT_RATIO, frame);
        for root in &self.roots {
            root.draw(camera, &view, &projection);
        }
    }

    /// Fly the whole path and report what the quadtree did.
    pub fn run(&self) -> SimulationReport {
        let _span = info_span!("flight").entered();
        let start = Instant::now();
        let frames = self.flight.frames();
        let log_every = (frames / 8).max(1);

        let mut peak_quad_nodes = 0;
        let mut deepest_level = None;
        for frame in 0..frames {
            self.step(frame);

            let snapshot = self.statistics().snapshot();
            peak_quad_nodes = peak_quad_nodes.max(snapshot.quad_nodes);
            deepest_level = deepest_level.max(snapshot.deepest_level());
            debug!(frame, nodes = snapshot.quad_nodes, "frame done");
            if frame % log_every == 0 {
                info!(
                    frame,
                    altitude = self.flight.altitude_at(frame),
                    nodes = snapshot.quad_nodes,
                    deepest = ?snapshot.deepest_level(),
                    "flight progress"
                );
            }
        }

        self.settle();
        SimulationReport {
            frames,
            peak_quad_nodes,
            deepest_level,
            draws: self.draws.load(Ordering::Relaxed),
            final_statistics: self.statistics().snapshot(),
            elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Dispose every tree and wait for in-flight work. Returns the number of
    /// nodes still live afterwards, which is zero unless a job hung.
    pub fn shutdown(&self) -> usize {
        for root in &self.roots {
            root.dispose();
        }
        self.settle();
        let remaining = self.statistics().number_of_quad_nodes();
        if remaining > 0 {
            warn!(remaining, "quad nodes still live after shutdown");
        }
        remaining
    }

    fn settle(&self) {
        if !self.factory.pool().wait_idle(SETTLE_TIMEOUT) {
            warn!(
                in_flight = self.factory.pool().in_flight_count(),
                "background work did not settle"
            );
        }
    }
}
