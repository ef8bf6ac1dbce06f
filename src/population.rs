use crate::state::{Antibody, Antigen, SimState};
use anyhow::Result;
use immuno_common::sim_params::MAX_POPULATION;
use immuno_common::{ParticleId, SimParams, SimulationConfig, Vec2};
use log::{info, warn};
use rand::distr::Uniform;
use rand::prelude::*;

/// Angular scatter applied to each evenly spaced epitope.
const EPITOPE_ANGLE_JITTER: f32 = 0.12;
const ANTIGEN_INITIAL_SPEED: f32 = 0.15;
const ANTIBODY_INITIAL_SPEED: f32 = 0.2;

/// Builds a fresh entity set from configuration: antigens first (ids
/// `0..antigen_count`), then antibodies. Counts above the population cap are
/// clamped. Positions are uniform inside the placement margin.
pub fn populate(config: &SimulationConfig, params: &SimParams, rng: &mut StdRng) -> Result<SimState> {
    let antigen_count = clamp_count(config.population.antigen_count, "antigen_count");
    let antibody_count = clamp_count(config.population.antibody_count, "antibody_count");
    let epitopes = config.effective_epitopes() as usize;
    let antibody_type = config.population.antibody_type;

    let margin = params.placement_margin;
    let x_dist = Uniform::new(margin, params.world_width - margin)?;
    let y_dist = Uniform::new(margin, params.world_height - margin)?;
    let jitter_dist = Uniform::new_inclusive(-EPITOPE_ANGLE_JITTER, EPITOPE_ANGLE_JITTER)?;
    let ag_speed = Uniform::new(-ANTIGEN_INITIAL_SPEED, ANTIGEN_INITIAL_SPEED)?;
    let ab_speed = Uniform::new(-ANTIBODY_INITIAL_SPEED, ANTIBODY_INITIAL_SPEED)?;
    let angle_dist = Uniform::new(0.0f32, std::f32::consts::TAU)?;

    let mut next_id: ParticleId = 0;

    let mut antigens = Vec::with_capacity(antigen_count);
    for _ in 0..antigen_count {
        let epitope_angles: Vec<f32> = (0..epitopes)
            .map(|i| i as f32 / epitopes as f32 * std::f32::consts::TAU + rng.sample(jitter_dist))
            .collect();
        let pos = Vec2::new(rng.sample(x_dist), rng.sample(y_dist));
        let vel = Vec2::new(rng.sample(ag_speed), rng.sample(ag_speed));
        antigens.push(Antigen::new(next_id, pos, vel, params.antigen_radius, &epitope_angles));
        next_id += 1;
    }

    let mut antibodies = Vec::with_capacity(antibody_count);
    for _ in 0..antibody_count {
        let pos = Vec2::new(rng.sample(x_dist), rng.sample(y_dist));
        let vel = Vec2::new(rng.sample(ab_speed), rng.sample(ab_speed));
        let angle = rng.sample(angle_dist);
        antibodies.push(Antibody::new(next_id, pos, vel, angle, antibody_type));
        next_id += 1;
    }

    info!(
        "Populated {} antigens ({} epitopes each{}) and {} {:?} antibodies.",
        antigens.len(),
        epitopes,
        if config.population.hapten { ", hapten" } else { "" },
        antibodies.len(),
        antibody_type
    );
    Ok(SimState::new(antigens, antibodies))
}

fn clamp_count(requested: u32, field: &str) -> usize {
    if requested > MAX_POPULATION {
        warn!(
            "{} of {} exceeds the cap of {}; clamping.",
            field, requested, MAX_POPULATION
        );
    }
    requested.min(MAX_POPULATION) as usize
}
