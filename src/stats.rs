use crate::clusters::ClusterSummary;
use crate::state::SimState;
use immuno_common::{AntibodyType, SimParams, Statistics, Zone};

/// Antibody binding sites per antigen epitope. Zero when there are no epitopes.
pub fn stoichiometric_ratio(antibody_count: usize, antibody_type: AntibodyType, total_epitopes: usize) -> f32 {
    if total_epitopes == 0 {
        return 0.0;
    }
    (antibody_count * antibody_type.valence()) as f32 / total_epitopes as f32
}

/// Zone of a site ratio, classified in log10 space. A zero ratio is floored at 1e-9.
pub fn classify_ratio(ratio: f32, params: &SimParams) -> Zone {
    let log_ratio = if ratio > 0.0 { ratio.log10() } else { (1e-9f32).log10() };
    Zone::classify(log_ratio, params.zone_log_threshold)
}

/// Ratio and zone only; cheap enough to refresh on every tick.
pub fn refresh_ratio(stats: &mut Statistics, state: &SimState, antibody_type: AntibodyType, params: &SimParams) {
    stats.ratio = stoichiometric_ratio(state.antibodies.len(), antibody_type, state.total_epitopes());
    stats.zone = classify_ratio(stats.ratio, params);
}

/// Full statistics over the current binding graph and cluster pass.
pub fn compute(
    state: &SimState,
    clusters: &ClusterSummary,
    antibody_type: AntibodyType,
    params: &SimParams,
) -> Statistics {
    let total_epitopes = state.total_epitopes();
    let occupied: usize = state.antigens.iter().map(|ag| ag.occupied_epitopes()).sum();
    let epitope_occupancy = if total_epitopes > 0 {
        occupied as f32 / total_epitopes as f32 * 100.0
    } else {
        0.0
    };

    let bridges = state.antibodies.iter().filter(|ab| ab.is_bridge()).count() as u32;

    let mut cluster_count = 0u32;
    let mut max_cluster = 0usize;
    for size in clusters.sizes_at_least(2) {
        cluster_count += 1;
        max_cluster = max_cluster.max(size);
    }
    let precipitated: usize = clusters.sizes_at_least(params.precipitate_threshold).sum();
    let precipitation = if state.antigens.is_empty() {
        0.0
    } else {
        precipitated as f32 / state.antigens.len() as f32 * 100.0
    };

    let ratio = stoichiometric_ratio(state.antibodies.len(), antibody_type, total_epitopes);

    Statistics {
        ratio,
        zone: classify_ratio(ratio, params),
        precipitation,
        bridges,
        max_cluster: max_cluster as u32,
        cluster_count,
        complex_size: max_cluster as u32,
        epitope_occupancy,
    }
}
