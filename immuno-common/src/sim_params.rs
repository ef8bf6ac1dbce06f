use crate::config::SimulationConfig;
use serde::{Deserialize, Serialize};

// Geometry
pub const ANTIGEN_RADIUS: f32 = 18.0;
pub const EPITOPE_SURFACE_OFFSET: f32 = 3.5;
pub const FAB_LENGTH: f32 = 18.0;
pub const CONTACT_RADIUS: f32 = 12.0;

// Arena
pub const BOUNDARY_MARGIN: f32 = 25.0;
pub const PLACEMENT_MARGIN: f32 = 35.0;
/// Largest accepted arena side; keeps the repulsion grid bounded.
pub const MAX_ARENA_EXTENT: f32 = 20_000.0;
/// Upper bound on either population; the force stages are quadratic in it.
pub const MAX_POPULATION: u32 = 200;

/// Simulation parameters derived from the configuration, used on every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // World
    pub world_width: f32,
    pub world_height: f32,
    pub boundary_margin: f32,
    pub placement_margin: f32,

    // Motion
    pub jitter: f32,
    pub jitter_scale: f32,
    pub max_speed: f32,
    pub damping: f32,
    pub wall_restitution: f32,
    pub angular_jitter: f32,

    // Geometry
    pub antigen_radius: f32,
    pub epitope_offset: f32,
    pub fab_length: f32,
    pub contact_radius: f32,
    pub contact_radius_sq: f32,

    // Forces
    pub repulsion_radius: f32,
    pub repulsion_strength: f32,
    pub cohesion_stiffness: f32,
    pub cohesion_slack: f32,

    // Kinetics
    pub affinity: f32,      // normalized to [0, 1]
    pub binding_base_rate: f32,
    pub dissociation: f32,  // normalized to [0, 0.5]
    pub dissociation_base_rate: f32,
    pub avidity_factor: f32,
    pub monovalent: bool,

    // Pose relaxation
    pub relax_iterations: u32,
    pub relax_step: f32,
    pub relax_angular_scale: f32,
    pub relax_max_angular_step: f32,
    pub antigen_pull: f32,

    // Statistics
    pub lattice_threshold: usize,
    pub precipitate_threshold: usize,
    pub stats_stride: u64,
    pub zone_log_threshold: f32,
}

impl SimParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let agitated = config.kinetics.temperature > 0.0;
        let relaxation = &config.relaxation;

        SimParams {
            world_width: config.arena.width,
            world_height: config.arena.height,
            boundary_margin: BOUNDARY_MARGIN,
            placement_margin: PLACEMENT_MARGIN,

            jitter: if agitated { 0.6 } else { 0.18 },
            jitter_scale: 0.1,
            max_speed: if agitated { 1.3 } else { 0.8 },
            damping: 0.982,
            wall_restitution: 0.7,
            angular_jitter: 0.025,

            antigen_radius: ANTIGEN_RADIUS,
            epitope_offset: EPITOPE_SURFACE_OFFSET,
            fab_length: FAB_LENGTH,
            contact_radius: CONTACT_RADIUS,
            contact_radius_sq: CONTACT_RADIUS * CONTACT_RADIUS,

            repulsion_radius: ANTIGEN_RADIUS * 1.8,
            repulsion_strength: 0.05,
            cohesion_stiffness: 0.02,
            cohesion_slack: 1.4,

            affinity: config.kinetics.affinity / 100.0,
            binding_base_rate: 0.5,
            dissociation: config.kinetics.dissociation / 100.0,
            dissociation_base_rate: 0.05,
            avidity_factor: 0.1,
            monovalent: config.population.hapten,

            relax_iterations: relaxation.iterations,
            relax_step: relaxation.step,
            relax_angular_scale: relaxation.angular_scale,
            relax_max_angular_step: relaxation.max_angular_step,
            antigen_pull: relaxation.antigen_pull,

            lattice_threshold: 4,
            precipitate_threshold: 5,
            stats_stride: 5,
            zone_log_threshold: 0.22,
        }
    }

    /// Per-tick probability that a free arm in contact with a free epitope binds it.
    pub fn binding_probability(&self) -> f32 {
        self.affinity * self.binding_base_rate
    }
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams::from_config(&SimulationConfig::default())
    }
}
