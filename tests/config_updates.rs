use immuno_sim::common::{AntibodyType, SimulationConfig};
use immuno_sim::Simulation;

fn warmed_up() -> Simulation {
    let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
    for _ in 0..200 {
        sim.step().unwrap();
    }
    sim
}

#[test]
fn kinetic_change_keeps_population() {
    let mut sim = warmed_up();
    let before = sim.snapshot();

    let mut config = sim.config().clone();
    config.kinetics.affinity = 20.0;
    config.kinetics.dissociation = 40.0;
    config.kinetics.temperature = 0.0;
    assert!(!sim.apply_config(config).unwrap());

    let after = sim.snapshot();
    assert_eq!(after.frame, before.frame);
    assert_eq!(after.antigens, before.antigens);
    assert_eq!(after.antibodies, before.antibodies);
    assert!((sim.params().affinity - 0.2).abs() < 1e-6);
    assert!((sim.params().dissociation - 0.4).abs() < 1e-6);
}

#[test]
fn structural_changes_rebuild_population() {
    let edits: [fn(&mut SimulationConfig); 6] = [
        |c| c.population.antigen_count = 30,
        |c| c.population.antibody_count = 60,
        |c| c.population.antibody_type = AntibodyType::IgM,
        |c| c.population.epitopes_per_antigen = 6,
        |c| c.population.hapten = true,
        |c| c.arena.width = 800.0,
    ];
    for edit in edits {
        let mut sim = warmed_up();
        let mut config = sim.config().clone();
        edit(&mut config);
        let expected = config.clone();

        assert!(sim.apply_config(config).unwrap());
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.state().antigens.len(), expected.population.antigen_count as usize);
        assert_eq!(sim.state().antibodies.len(), expected.population.antibody_count as usize);
        assert!(sim
            .state()
            .antigens
            .iter()
            .all(|ag| ag.epitopes.len() == expected.effective_epitopes() as usize));
        assert!(sim
            .state()
            .antibodies
            .iter()
            .all(|ab| ab.kind == expected.population.antibody_type));

        let stats = sim.statistics();
        assert_eq!(stats.epitope_occupancy, 0.0);
        assert_eq!(stats.bridges, 0);
        assert_eq!(stats.max_cluster, 0);
    }
}

#[test]
fn invalid_update_is_rejected_without_side_effects() {
    let mut sim = warmed_up();
    let before = sim.snapshot();
    let mut config = sim.config().clone();
    config.kinetics.temperature = 250.0;

    assert!(sim.apply_config(config).is_err());
    assert_eq!(sim.snapshot(), before);
    assert_eq!(sim.config().kinetics.temperature, 30.0);
}

#[test]
fn pausing_freezes_entities() {
    let mut sim = warmed_up();
    sim.set_running(false);
    assert!(!sim.is_running());
    let frozen = sim.snapshot();
    for _ in 0..50 {
        sim.step().unwrap();
    }
    let later = sim.snapshot();
    assert_eq!(later.antigens, frozen.antigens);
    assert_eq!(later.antibodies, frozen.antibodies);
    assert_eq!(later.stats, frozen.stats);
    assert_eq!(later.frame, frozen.frame + 50);

    sim.set_running(true);
    sim.step().unwrap();
    assert_ne!(sim.snapshot().antibodies, frozen.antibodies);
}
