//! Stochastic association and dissociation of antibody arms.
//!
//! Association walks antibodies in arena order and their arms in index order,
//! committing every successful bind immediately. An epitope taken earlier in
//! the pass is invisible to every later arm, so simultaneous contenders are
//! resolved in favour of the one enumerated first.

use crate::kinematics;
use crate::state::SimState;
use immuno_common::{BindingTarget, SimParams, Vec2};
use rand::prelude::*;

/// Nearest unoccupied epitope strictly within `max_dist_sq` of `point`.
/// Ties keep the first candidate in antigen-then-epitope order.
pub fn nearest_free_epitope(state: &SimState, point: Vec2, max_dist_sq: f32, params: &SimParams) -> Option<BindingTarget> {
    let mut best = None;
    let mut best_d2 = max_dist_sq;
    for antigen in &state.antigens {
        for (epitope_idx, epitope) in antigen.epitopes.iter().enumerate() {
            if epitope.is_occupied() {
                continue;
            }
            let Some(pos) = kinematics::epitope(antigen, epitope_idx, params) else {
                continue;
            };
            let d2 = pos.distance_squared(point);
            if d2 < best_d2 {
                best_d2 = d2;
                best = Some(BindingTarget {
                    antigen: antigen.body.id,
                    epitope: epitope_idx,
                });
            }
        }
    }
    best
}

/// Attempts Free → Bound for every free arm. Returns the number of new bonds.
pub fn associate<R: Rng>(state: &mut SimState, params: &SimParams, rng: &mut R) -> usize {
    let p_bind = params.binding_probability();
    let mut formed = 0;

    for ab_slot in 0..state.antibodies.len() {
        for arm_idx in 0..state.antibodies[ab_slot].arms.len() {
            let antibody = &state.antibodies[ab_slot];
            if antibody.arms[arm_idx].is_bound() {
                continue;
            }
            // Monovalent antigens: one antigen per antibody, so no bridges.
            if params.monovalent && antibody.bound_arm_count() > 0 {
                continue;
            }
            let Some(tip) = kinematics::tip(antibody, arm_idx, params) else {
                continue;
            };
            let Some(target) = nearest_free_epitope(state, tip, params.contact_radius_sq, params) else {
                continue;
            };
            if rng.random::<f32>() < p_bind && state.bind(ab_slot, arm_idx, target) {
                formed += 1;
            }
        }
    }
    formed
}

/// Per-tick release probability of one bound arm whose antibody currently has
/// `bound_arms` bound arms. Multiple bonds scale it by the avidity factor.
pub fn release_probability(params: &SimParams, bound_arms: usize) -> f32 {
    let avidity = if bound_arms > 1 {
        params.avidity_factor
    } else {
        1.0
    };
    params.dissociation * params.dissociation_base_rate * avidity
}

/// Attempts Bound → Free for every bound arm. The avidity check uses the live
/// bound-arm count, so an arm released earlier in the pass no longer counts.
/// Returns the number of released arms.
pub fn dissociate<R: Rng>(state: &mut SimState, params: &SimParams, rng: &mut R) -> usize {
    if params.dissociation <= 0.0 {
        return 0;
    }
    let mut released = 0;

    for ab_slot in 0..state.antibodies.len() {
        for arm_idx in 0..state.antibodies[ab_slot].arms.len() {
            let antibody = &state.antibodies[ab_slot];
            if !antibody.arms[arm_idx].is_bound() {
                continue;
            }
            let p_release = release_probability(params, antibody.bound_arm_count());
            if rng.random::<f32>() < p_release && state.unbind(ab_slot, arm_idx) {
                released += 1;
            }
        }
    }
    released
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Antibody, Antigen};
    use immuno_common::AntibodyType;

    /// Params under which every contact binds (or every bond releases) deterministically.
    fn certain_params() -> SimParams {
        let mut params = SimParams::default();
        params.affinity = 1.0;
        params.binding_base_rate = 1.0;
        params
    }

    /// Antigen whose single epitope (angle 0) sits exactly at `point`.
    fn antigen_with_epitope_at(id: u32, point: Vec2, params: &SimParams) -> Antigen {
        let offset = params.antigen_radius + params.epitope_offset;
        Antigen::new(id, point - Vec2::new(offset, 0.0), Vec2::zero(), params.antigen_radius, &[0.0])
    }

    fn igg(id: u32, pos: Vec2) -> Antibody {
        Antibody::new(id, pos, Vec2::zero(), 0.0, AntibodyType::IgG)
    }

    #[test]
    fn first_enumerated_arm_wins_contested_epitope() {
        let params = certain_params();
        let first = igg(1, Vec2::new(400.0, 300.0));
        let second = igg(2, Vec2::new(400.0, 300.0));
        let tip = kinematics::tip(&first, 0, &params).unwrap();
        let mut state = SimState::new(vec![antigen_with_epitope_at(0, tip, &params)], vec![first, second]);
        let mut rng = StdRng::seed_from_u64(5);

        let formed = associate(&mut state, &params, &mut rng);

        assert_eq!(formed, 1);
        assert_eq!(state.antigens[0].epitopes[0].occupant, Some(1));
        assert_eq!(state.antibodies[0].arms[0].target, Some(BindingTarget { antigen: 0, epitope: 0 }));
        assert_eq!(state.antibodies[1].bound_arm_count(), 0);
        state.verify_bindings().unwrap();
    }

    #[test]
    fn contact_radius_is_exclusive() {
        let params = certain_params();
        let ab = igg(1, Vec2::new(400.0, 300.0));
        let tip = kinematics::tip(&ab, 0, &params).unwrap();
        let far = tip + Vec2::new(params.contact_radius + 0.5, 0.0);
        let mut state = SimState::new(vec![antigen_with_epitope_at(0, far, &params)], vec![ab]);
        let mut rng = StdRng::seed_from_u64(5);

        assert_eq!(associate(&mut state, &params, &mut rng), 0);
    }

    #[test]
    fn nearest_candidate_is_preferred() {
        let params = certain_params();
        let ab = igg(2, Vec2::new(400.0, 300.0));
        let tip = kinematics::tip(&ab, 0, &params).unwrap();
        let state = SimState::new(
            vec![
                antigen_with_epitope_at(0, tip + Vec2::new(0.0, 6.0), &params),
                antigen_with_epitope_at(1, tip + Vec2::new(0.0, -2.0), &params),
            ],
            vec![ab],
        );

        let target = nearest_free_epitope(&state, tip, params.contact_radius_sq, &params);
        assert_eq!(target, Some(BindingTarget { antigen: 1, epitope: 0 }));
    }

    #[test]
    fn monovalent_mode_blocks_second_antigen() {
        let mut params = certain_params();
        let ab = igg(2, Vec2::new(400.0, 300.0));
        let tip0 = kinematics::tip(&ab, 0, &params).unwrap();
        let tip1 = kinematics::tip(&ab, 1, &params).unwrap();
        let state = SimState::new(
            vec![
                antigen_with_epitope_at(0, tip0, &params),
                antigen_with_epitope_at(1, tip1, &params),
            ],
            vec![ab],
        );
        let mut rng = StdRng::seed_from_u64(5);

        params.monovalent = true;
        let mut hapten = state.clone();
        assert_eq!(associate(&mut hapten, &params, &mut rng), 1);
        assert!(!hapten.antibodies[0].is_bridge());

        params.monovalent = false;
        let mut multivalent = state;
        assert_eq!(associate(&mut multivalent, &params, &mut rng), 2);
        assert!(multivalent.antibodies[0].is_bridge());
    }

    #[test]
    fn avidity_lowers_release_probability() {
        let mut params = SimParams::default();
        for dissociation in [1.0f32, 8.0, 25.0, 50.0] {
            params.dissociation = dissociation / 100.0;
            let single = release_probability(&params, 1);
            let double = release_probability(&params, 2);
            assert!(double < single);
            assert!((double - single * params.avidity_factor).abs() < 1e-9);
        }
    }

    #[test]
    fn certain_release_clears_both_sides() {
        let mut params = SimParams::default();
        params.dissociation = 0.5;
        params.dissociation_base_rate = 2.0;
        let mut state = SimState::new(
            vec![antigen_with_epitope_at(0, Vec2::new(300.0, 300.0), &params)],
            vec![igg(1, Vec2::new(400.0, 300.0))],
        );
        assert!(state.bind(0, 1, BindingTarget { antigen: 0, epitope: 0 }));
        let mut rng = StdRng::seed_from_u64(9);

        assert_eq!(dissociate(&mut state, &params, &mut rng), 1);
        assert!(!state.antigens[0].epitopes[0].is_occupied());
        assert_eq!(state.antibodies[0].bound_arm_count(), 0);
    }

    #[test]
    fn zero_dissociation_never_releases() {
        let mut params = SimParams::default();
        params.dissociation = 0.0;
        let mut state = SimState::new(
            vec![antigen_with_epitope_at(0, Vec2::new(300.0, 300.0), &params)],
            vec![igg(1, Vec2::new(400.0, 300.0))],
        );
        assert!(state.bind(0, 0, BindingTarget { antigen: 0, epitope: 0 }));
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            dissociate(&mut state, &params, &mut rng);
        }
        assert_eq!(state.antibodies[0].bound_arm_count(), 1);
    }
}
