//! Fixed-timestep frame loop.
//!
//! Each frame:
//!
//! 1. Integrate `Position` by `Velocity` for every moving entity.
//! 2. Drain `Health` of moving entities; those that reach zero lose their
//!    `Velocity` and stop.
//! 3. Every `despawn_interval` frames, destroy the oldest entity and spawn a
//!    replacement.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::Vec3;
use quiver::{Entity, Query, World, WorldConfig, WorldError};
use tracing::{debug, info, warn};

use crate::components::{Health, Position, Velocity};

/// Health lost per second of movement.
const DRAIN_PER_SECOND: f32 = 10.0;

/// Every n-th spawned entity carries `Health`.
const HEALTH_EVERY: u64 = 3;

/// Configuration for the frame loop.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Entities alive at startup.
    pub entities: usize,
    /// Target frames per second. 0 runs unthrottled.
    pub tick_rate: f64,
    /// Number of frames to run.
    pub max_frames: u64,
    /// Frames between despawn/respawn (0 = never).
    pub despawn_interval: u64,
    /// Log every entity creation and destruction.
    pub log_lifecycle: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            entities: 1_000,
            tick_rate: 60.0,
            max_frames: 600,
            despawn_interval: 10,
            log_lifecycle: false,
        }
    }
}

/// What one frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub moved: usize,
    pub stopped: usize,
    pub respawned: usize,
}

/// The simulation's state.
#[derive(Debug)]
pub struct SimLoop {
    frame: u64,
    config: SimConfig,
    world: World,
    moving: Query<(Position, Velocity)>,
    draining: Query<(Health, Velocity)>,
    /// Spawned entities, oldest first.
    spawned: VecDeque<Entity>,
    /// Number of entities spawned so far.
    serial: u64,
}

impl SimLoop {
    /// Build the world, register components and queries, and spawn the
    /// initial population.
    ///
    /// # Errors
    ///
    /// Any registration error from the world.
    pub fn new(config: SimConfig) -> Result<Self, WorldError> {
        let world_config = WorldConfig::new()
            .with_lifecycle_logging(config.log_lifecycle)
            .with_initial_capacity(config.entities);
        let mut world = World::with_config(world_config)?;
        world.register_components::<(Position, Velocity, Health)>()?;
        let moving = world.register_query::<(Position, Velocity)>()?;
        let draining = world.register_query::<(Health, Velocity)>()?;

        let mut sim = Self {
            frame: 0,
            world,
            moving,
            draining,
            spawned: VecDeque::with_capacity(config.entities),
            serial: 0,
            config,
        };
        for _ in 0..sim.config.entities {
            sim.spawn()?;
        }
        Ok(sim)
    }

    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Spawn one entity with a velocity derived from its serial number.
    fn spawn(&mut self) -> Result<Entity, WorldError> {
        let serial = self.serial;
        self.serial += 1;

        let entity = self.world.create_entity();
        let spread = (serial % 7) as f32 - 3.0;
        self.world.insert_component(entity, Position(Vec3::ZERO))?;
        self.world
            .insert_component(entity, Velocity::new(spread, 1.0, 0.0))?;
        if serial % HEALTH_EVERY == 0 {
            self.world.add_component::<Health>(entity)?;
        }
        self.spawned.push_back(entity);
        Ok(entity)
    }

    /// Run one frame.
    ///
    /// # Errors
    ///
    /// Any world error. None is expected while the loop owns the world.
    pub fn tick(&mut self, dt: f64) -> Result<FrameStats, WorldError> {
        self.frame += 1;
        let dt = dt as f32;
        let mut stats = FrameStats::default();

        let moves: Vec<(Entity, Vec3)> = self
            .world
            .matches(self.moving)?
            .map(|((position, velocity), entity)| (entity, position.0 + velocity.linear * dt))
            .collect();
        for (entity, next) in moves {
            self.world.get_component_mut::<Position>(entity)?.0 = next;
            stats.moved += 1;
        }

        let drained: Vec<Entity> = self.world.query_entities(self.draining.id())?.to_vec();
        for entity in drained {
            let health = self.world.get_component_mut::<Health>(entity)?;
            health.damage(DRAIN_PER_SECOND * dt);
            if !health.is_alive() {
                self.world.remove_component::<Velocity>(entity)?;
                stats.stopped += 1;
            }
        }

        let interval = self.config.despawn_interval;
        if interval > 0 && self.frame % interval == 0 {
            if let Some(oldest) = self.spawned.pop_front() {
                self.world.destroy_entity(oldest)?;
                self.spawn()?;
                stats.respawned += 1;
            }
        }

        debug!(
            frame = self.frame,
            moved = stats.moved,
            stopped = stats.stopped,
            respawned = stats.respawned,
            "frame complete"
        );
        Ok(stats)
    }

    /// Run the configured number of frames, sleeping to hold the tick rate.
    ///
    /// # Errors
    ///
    /// The first error returned by [`tick`](Self::tick).
    pub fn run(&mut self) -> Result<(), WorldError> {
        let budget = (self.config.tick_rate > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / self.config.tick_rate));
        let dt = budget.map_or(1.0 / 60.0, |budget| budget.as_secs_f64());

        info!(
            tick_rate = self.config.tick_rate,
            max_frames = self.config.max_frames,
            entities = self.world.entity_count(),
            "starting frame loop"
        );

        let mut totals = FrameStats::default();
        while self.frame < self.config.max_frames {
            let start = Instant::now();
            let stats = self.tick(dt)?;
            totals.moved += stats.moved;
            totals.stopped += stats.stopped;
            totals.respawned += stats.respawned;

            let Some(budget) = budget else { continue };
            let elapsed = start.elapsed();
            if elapsed < budget {
                std::thread::sleep(budget - elapsed);
            } else {
                warn!(
                    frame = self.frame,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "frame exceeded time budget"
                );
            }
        }

        info!(
            frames = self.frame,
            moved = totals.moved,
            stopped = totals.stopped,
            respawned = totals.respawned,
            still_moving = self.world.query_entities(self.moving.id())?.len(),
            "frame loop complete"
        );
        Ok(())
    }
}
