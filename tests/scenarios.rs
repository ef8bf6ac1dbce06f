use immuno_sim::binding;
use immuno_sim::common::{AntibodyType, BindingTarget, SimParams, SimulationConfig, Vec2, Zone};
use immuno_sim::kinematics;
use immuno_sim::state::{Antibody, Antigen, SimState};
use immuno_sim::Simulation;
use rand::prelude::*;

fn config_with(antibodies: u32, antigens: u32, epitopes: u32) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.population.antibody_count = antibodies;
    config.population.antigen_count = antigens;
    config.population.epitopes_per_antigen = epitopes;
    config
}

#[test]
fn balanced_mix_is_at_equivalence() {
    let sim = Simulation::new(config_with(100, 50, 4)).unwrap();
    assert!((sim.statistics().ratio - 1.0).abs() < 1e-6);
    assert_eq!(sim.statistics().zone, Zone::Equivalence);
}

#[test]
fn antibody_excess_is_prozone() {
    let sim = Simulation::new(config_with(200, 30, 4)).unwrap();
    assert!((sim.statistics().ratio - 400.0 / 120.0).abs() < 1e-4);
    assert_eq!(sim.statistics().zone, Zone::Prozone);
}

#[test]
fn antigen_excess_is_post_zone() {
    let sim = Simulation::new(config_with(20, 150, 4)).unwrap();
    assert!((sim.statistics().ratio - 40.0 / 600.0).abs() < 1e-4);
    assert_eq!(sim.statistics().zone, Zone::PostZone);
}

#[test]
fn zone_boundaries_resolve_to_equivalence() {
    let threshold = SimParams::default().zone_log_threshold;
    assert_eq!(Zone::classify(threshold, threshold), Zone::Equivalence);
    assert_eq!(Zone::classify(-threshold, threshold), Zone::Equivalence);
    assert_eq!(Zone::classify(threshold + 1e-4, threshold), Zone::Prozone);
    assert_eq!(Zone::classify(-threshold - 1e-4, threshold), Zone::PostZone);
}

#[test]
fn fresh_population_has_no_complexes() {
    for kind in [AntibodyType::IgG, AntibodyType::IgM] {
        let mut config = config_with(150, 80, 5);
        config.population.antibody_type = kind;
        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..2 {
            let stats = sim.statistics().clone();
            assert_eq!(stats.epitope_occupancy, 0.0);
            assert_eq!(stats.bridges, 0);
            assert_eq!(stats.max_cluster, 0);
            assert_eq!(stats.precipitation, 0.0);
            assert!(sim.state().antigens.iter().all(|ag| !ag.precipitated));

            for _ in 0..100 {
                sim.step().unwrap();
            }
            sim.reset().unwrap();
        }
    }
}

#[test]
fn two_bound_arms_release_less_often_than_one() {
    let mut params = SimParams::default();
    for dissociation in [0.5f32, 8.0, 30.0, 50.0] {
        params.dissociation = dissociation / 100.0;
        assert!(binding::release_probability(&params, 2) < binding::release_probability(&params, 1));
        assert!(binding::release_probability(&params, 10) < binding::release_probability(&params, 1));
    }
}

#[test]
fn bridged_antibodies_survive_longer_on_average() {
    // Empirical check of the avidity rule: count releases over many trials.
    let mut params = SimParams::default();
    params.dissociation = 0.5;
    params.dissociation_base_rate = 0.2;
    let antigens = || {
        vec![
            Antigen::new(0, Vec2::new(100.0, 100.0), Vec2::zero(), 18.0, &[0.0, 3.0]),
            Antigen::new(1, Vec2::new(200.0, 100.0), Vec2::zero(), 18.0, &[0.0, 3.0]),
        ]
    };
    let antibody = || vec![Antibody::new(2, Vec2::new(150.0, 150.0), Vec2::zero(), 0.0, AntibodyType::IgG)];
    let mut rng = StdRng::seed_from_u64(11);

    let (mut single_releases, mut double_releases) = (0, 0);
    for _ in 0..4000 {
        let mut single = SimState::new(antigens(), antibody());
        single.bind(0, 0, BindingTarget { antigen: 0, epitope: 0 });
        single_releases += binding::dissociate(&mut single, &params, &mut rng);

        let mut double = SimState::new(antigens(), antibody());
        double.bind(0, 0, BindingTarget { antigen: 0, epitope: 0 });
        double.bind(0, 1, BindingTarget { antigen: 1, epitope: 1 });
        // Count only the first arm so both cases measure one bond.
        let before = double.antibodies[0].arms[0].is_bound();
        binding::dissociate(&mut double, &params, &mut rng);
        if before && !double.antibodies[0].arms[0].is_bound() {
            double_releases += 1;
        }
    }
    assert!(double_releases * 3 < single_releases, "{} vs {}", double_releases, single_releases);
}

#[test]
fn contested_epitope_goes_to_first_enumerated_antibody() {
    let mut params = SimParams::default();
    params.affinity = 1.0;
    params.binding_base_rate = 1.0;

    let first = Antibody::new(1, Vec2::new(500.0, 300.0), Vec2::zero(), 0.3, AntibodyType::IgM);
    let second = Antibody::new(2, Vec2::new(500.0, 300.0), Vec2::zero(), 0.3, AntibodyType::IgM);
    let tip = kinematics::tip(&first, 3, &params).unwrap();
    let offset = params.antigen_radius + params.epitope_offset;
    let antigen = Antigen::new(0, tip - Vec2::new(offset, 0.0), Vec2::zero(), params.antigen_radius, &[0.0]);
    let mut state = SimState::new(vec![antigen], vec![first, second]);

    let formed = binding::associate(&mut state, &params, &mut StdRng::seed_from_u64(3));

    assert_eq!(formed, 1);
    assert_eq!(state.antigens[0].epitopes[0].occupant, Some(1));
    assert_eq!(state.antibodies[1].bound_arm_count(), 0);
    state.verify_bindings().unwrap();
}
