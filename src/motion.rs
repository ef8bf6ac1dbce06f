use crate::state::{Particle, SimState};
use immuno_common::{clamp, SimParams};
use rand::prelude::*;

/// Brownian step for every particle: velocity jitter, damping, per-axis speed
/// cap, position integration and the lossy reflective boundary. Antibodies also
/// receive a small random rotation.
pub fn integrate<R: Rng>(state: &mut SimState, params: &SimParams, rng: &mut R) {
    for antigen in state.antigens.iter_mut() {
        integrate_particle(&mut antigen.body, params, rng);
    }
    for antibody in state.antibodies.iter_mut() {
        integrate_particle(&mut antibody.body, params, rng);
        antibody.body.angle += rng.random_range(-params.angular_jitter..params.angular_jitter);
    }
}

fn integrate_particle<R: Rng>(p: &mut Particle, params: &SimParams, rng: &mut R) {
    p.vel.x += rng.random_range(-params.jitter..params.jitter) * params.jitter_scale;
    p.vel.y += rng.random_range(-params.jitter..params.jitter) * params.jitter_scale;
    p.vel = p.vel.scale(params.damping).clamp_components(params.max_speed);

    p.pos += p.vel;
    reflect(p, params);
}

/// Clamps the position into the inset rectangle, inverting and attenuating the
/// velocity component of every axis that left it.
pub fn reflect(p: &mut Particle, params: &SimParams) {
    let margin = params.boundary_margin;
    let max_x = params.world_width - margin;
    let max_y = params.world_height - margin;

    if p.pos.x < margin || p.pos.x > max_x {
        p.vel.x *= -params.wall_restitution;
    }
    if p.pos.y < margin || p.pos.y > max_y {
        p.vel.y *= -params.wall_restitution;
    }
    p.pos.x = clamp(p.pos.x, margin, max_x);
    p.pos.y = clamp(p.pos.y, margin, max_y);
}
