use crate::binding;
use crate::clusters::{self, ClusterSummary};
use crate::forces;
use crate::grid::SpatialGrid;
use crate::kinematics;
use crate::motion;
use crate::population;
use crate::state::SimState;
use crate::stats;
use anyhow::Result;
use immuno_common::{
    AntibodySnapshot, AntigenSnapshot, ArmSnapshot, EpitopeSnapshot, SimParams, SimulationConfig,
    Snapshot, Statistics,
};
use log::{debug, info, trace};
use rand::prelude::*;

/// Owns the entity arena and advances it one tick at a time.
pub struct Simulation {
    /// The configuration the current population was built from, with any
    /// non-structural updates applied since.
    config: SimulationConfig,
    /// Runtime parameters derived from `config`.
    params: SimParams,
    /// Antigens and antibodies. Exclusively owned; callers get snapshots or shared borrows.
    state: SimState,
    /// Single RNG for placement, jitter and kinetics. Reseeded on every rebuild.
    rng: StdRng,
    running: bool,
    /// Ticks requested since the last rebuild, paused or not.
    frame: u64,
    /// Latest statistics. Ratio and zone are fresh every tick, the rest every stride.
    stats: Statistics,
    /// Result of the latest cluster pass.
    clusters: ClusterSummary,
    /// Reused broad-phase structure for repulsion.
    grid: SpatialGrid,
}

impl Simulation {
    /// Validates `config`, places the initial population and computes t=0 statistics.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let params = config.get_sim_params();
        let (state, rng, grid) = build_population(&config, &params)?;

        let mut sim = Self {
            running: !config.run.start_paused,
            config,
            params,
            state,
            rng,
            frame: 0,
            stats: Statistics::default(),
            clusters: ClusterSummary::default(),
            grid,
        };
        sim.refresh_all_statistics();
        Ok(sim)
    }

    /// Advances one tick. While paused only the frame counter moves.
    pub fn step(&mut self) -> Result<()> {
        self.frame += 1;
        if !self.running {
            trace!("Frame {} skipped (paused).", self.frame);
            return Ok(());
        }

        // --- 1. Motion ---
        motion::integrate(&mut self.state, &self.params, &mut self.rng);

        // --- 2. Forces ---
        forces::apply_repulsion(&mut self.state, &self.params, &mut self.grid);
        forces::apply_cohesion(&mut self.state, &self.params);

        // --- 3. Kinetics ---
        let formed = binding::associate(&mut self.state, &self.params, &mut self.rng);
        let released = binding::dissociate(&mut self.state, &self.params, &mut self.rng);

        // --- 4. Pose relaxation ---
        forces::relax_poses(&mut self.state, &self.params);

        // --- 5. Clusters and statistics ---
        self.clusters = clusters::detect(&mut self.state, &self.params);
        stats::refresh_ratio(
            &mut self.stats,
            &self.state,
            self.config.population.antibody_type,
            &self.params,
        );
        if self.params.stats_stride > 0 && self.frame % self.params.stats_stride == 0 {
            self.stats = stats::compute(
                &self.state,
                &self.clusters,
                self.config.population.antibody_type,
                &self.params,
            );
            debug!("Frame {} statistics: {:?}", self.frame, self.stats);
        }

        trace!(
            "Frame {}: {} bonds formed, {} released.",
            self.frame,
            formed,
            released
        );
        Ok(())
    }

    /// Rebuilds the population from the current configuration and seed.
    /// The previous entity set is replaced only once the new one is complete.
    pub fn reset(&mut self) -> Result<()> {
        let built = build_population(&self.config, &self.params)?;
        self.install(built);
        Ok(())
    }

    /// Replaces the configuration. Returns `true` when the change was
    /// structural and the population was rebuilt; otherwise the new rates take
    /// effect on the next tick and the entities are left untouched.
    pub fn apply_config(&mut self, config: SimulationConfig) -> Result<bool> {
        config.validate()?;
        let structural = config.structural_key() != self.config.structural_key()
            || config.population.seed != self.config.population.seed;

        let params = config.get_sim_params();

        if structural {
            debug!("Structural configuration change; rebuilding population.");
            // Nothing is replaced unless the new population builds.
            let built = build_population(&config, &params)?;
            self.config = config;
            self.params = params;
            self.install(built);
        } else {
            self.config = config;
            self.params = params;
            debug!("Kinetic configuration change applied: {:?}", self.config.kinetics);
        }
        Ok(structural)
    }

    pub fn set_running(&mut self, running: bool) {
        if running != self.running {
            info!("Simulation {}.", if running { "resumed" } else { "paused" });
        }
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The most recently committed statistics.
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    /// An owned copy of everything a renderer needs for the current frame.
    pub fn snapshot(&self) -> Snapshot {
        let antigens = self
            .state
            .antigens
            .iter()
            .map(|ag| AntigenSnapshot {
                id: ag.body.id,
                position: (ag.body.pos.x, ag.body.pos.y),
                radius: ag.radius,
                cluster: ag.cluster,
                precipitated: ag.precipitated,
                epitopes: ag
                    .epitopes
                    .iter()
                    .enumerate()
                    .map(|(idx, ep)| {
                        let pos = kinematics::epitope(ag, idx, &self.params).unwrap_or(ag.body.pos);
                        EpitopeSnapshot {
                            angle: ep.angle,
                            position: (pos.x, pos.y),
                            occupant: ep.occupant,
                        }
                    })
                    .collect(),
            })
            .collect();

        let antibodies = self
            .state
            .antibodies
            .iter()
            .map(|ab| AntibodySnapshot {
                id: ab.body.id,
                antibody_type: ab.kind,
                position: (ab.body.pos.x, ab.body.pos.y),
                angle: ab.body.angle,
                arms: ab
                    .arms
                    .iter()
                    .enumerate()
                    .map(|(idx, arm)| {
                        let tip = kinematics::tip(ab, idx, &self.params).unwrap_or(ab.body.pos);
                        ArmSnapshot {
                            angle: arm.angle,
                            tip: (tip.x, tip.y),
                            target: arm.target,
                        }
                    })
                    .collect(),
            })
            .collect();

        Snapshot {
            frame: self.frame,
            running: self.running,
            antigens,
            antibodies,
            stats: self.stats.clone(),
        }
    }

    /// Read-only access to the entity arena.
    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn clusters(&self) -> &ClusterSummary {
        &self.clusters
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn install(&mut self, (state, rng, grid): (SimState, StdRng, SpatialGrid)) {
        self.state = state;
        self.rng = rng;
        self.grid = grid;
        self.frame = 0;
        self.refresh_all_statistics();
        info!("Simulation reset with {} particles.", self.state.particle_count());
    }

    fn refresh_all_statistics(&mut self) {
        self.clusters = clusters::detect(&mut self.state, &self.params);
        self.stats = stats::compute(
            &self.state,
            &self.clusters,
            self.config.population.antibody_type,
            &self.params,
        );
    }
}

/// Seeded population, RNG and repulsion grid for `config`, built without
/// touching any existing simulation.
fn build_population(config: &SimulationConfig, params: &SimParams) -> Result<(SimState, StdRng, SpatialGrid)> {
    let grid = SpatialGrid::new(params.world_width, params.world_height, params.repulsion_radius)?;
    let mut rng = StdRng::seed_from_u64(config.population.seed);
    let state = population::populate(config, params, &mut rng)?;
    Ok((state, rng, grid))
}
