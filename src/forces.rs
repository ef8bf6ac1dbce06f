use crate::grid::SpatialGrid;
use crate::kinematics;
use crate::state::{Antigen, SimState};
use immuno_common::{clamp, SimParams, Vec2};
use log::debug;

/// Soft short-range repulsion between every pair of particles closer than the
/// repulsion radius. The impulse grows linearly with penetration depth and is
/// applied symmetrically to both velocities.
pub fn apply_repulsion(state: &mut SimState, params: &SimParams, grid: &mut SpatialGrid) {
    let positions: Vec<Vec2> = state.bodies().map(|b| b.pos).collect();
    grid.rebuild(&positions);

    let radius = params.repulsion_radius;
    let mut impulses = vec![Vec2::zero(); positions.len()];
    grid.for_each_pair_within(&positions, radius, |i, j| {
        let delta = positions[j] - positions[i];
        let d = delta.length() + 1e-6;
        let f = params.repulsion_strength * (radius - d) / radius;
        let u = delta / d;
        impulses[i] -= u * f;
        impulses[j] += u * f;
    });

    for (body, impulse) in state.bodies_mut().zip(impulses) {
        body.vel += impulse;
    }
}

/// Spring impulses between every pair of antigens held by the same antibody,
/// pulling them toward a separation derived from the antibody's reach.
pub fn apply_cohesion(state: &mut SimState, params: &SimParams) {
    let SimState {
        antigens,
        antibodies,
    } = state;

    for antibody in antibodies.iter() {
        let held = antibody.bridged_antigens();
        if held.len() < 2 {
            continue;
        }
        let desired = (antibody.stem_length + params.fab_length) * params.cohesion_slack;

        for a in 0..held.len() {
            for b in (a + 1)..held.len() {
                let (Some(slot_a), Some(slot_b)) = (
                    Antigen::slot_in(antigens, held[a]),
                    Antigen::slot_in(antigens, held[b]),
                ) else {
                    continue;
                };
                let delta = antigens[slot_b].body.pos - antigens[slot_a].body.pos;
                let d = delta.length() + 1e-6;
                let u = delta / d;
                let f = params.cohesion_stiffness * (d - desired);

                antigens[slot_a].body.vel += u * f;
                antigens[slot_b].body.vel -= u * f;
            }
        }
    }
}

/// Approximate inverse kinematics for bound antibodies.
///
/// A fixed number of gradient steps move each antibody and turn it so its
/// bound tips drift toward their epitopes, then every held antigen is nudged a
/// fraction of its residual toward the antibody. Residuals are reduced, not
/// eliminated.
pub fn relax_poses(state: &mut SimState, params: &SimParams) {
    let SimState {
        antigens,
        antibodies,
    } = state;

    for antibody in antibodies.iter_mut() {
        // (arm index, antigen slot, epitope index)
        let binds: Vec<(usize, usize, usize)> = antibody
            .arms
            .iter()
            .enumerate()
            .filter_map(|(arm_idx, arm)| {
                let target = arm.target?;
                let slot = Antigen::slot_in(antigens, target.antigen);
                if slot.is_none() {
                    debug!(
                        "Antibody {} arm {} targets unknown antigen {}; skipping.",
                        antibody.body.id, arm_idx, target.antigen
                    );
                }
                Some((arm_idx, slot?, target.epitope))
            })
            .collect();
        if binds.is_empty() {
            continue;
        }

        let n = binds.len() as f32;
        let reach = antibody.stem_length + params.fab_length;
        for _ in 0..params.relax_iterations {
            let mut grad = Vec2::zero();
            let mut grad_angle = 0.0f32;
            for &(arm_idx, slot, epitope_idx) in &binds {
                let (Some(tip), Some(ep)) = (
                    kinematics::tip(antibody, arm_idx, params),
                    kinematics::epitope(&antigens[slot], epitope_idx, params),
                ) else {
                    continue;
                };
                let d = tip - ep;
                grad += d;

                let lever_angle =
                    antibody.body.angle + antibody.arms[arm_idx].angle + std::f32::consts::FRAC_PI_2;
                let lever = Vec2::new(0.0, -reach).rotate(lever_angle);
                grad_angle += d.dot(lever);
            }

            antibody.body.pos -= grad * (params.relax_step / n);
            antibody.body.angle -= clamp(
                params.relax_step * grad_angle / (n * params.relax_angular_scale),
                -params.relax_max_angular_step,
                params.relax_max_angular_step,
            );
        }

        for &(arm_idx, slot, epitope_idx) in &binds {
            let (Some(tip), Some(ep)) = (
                kinematics::tip(antibody, arm_idx, params),
                kinematics::epitope(&antigens[slot], epitope_idx, params),
            ) else {
                continue;
            };
            antigens[slot].body.pos += (tip - ep) * params.antigen_pull;
        }
    }
}
