use crate::config::AntibodyType;
use serde::{Deserialize, Serialize};

/// Stable particle identity, unique within one population.
pub type ParticleId = u32;

/// Where a bound arm is attached: an antigen and the index of one of its epitopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingTarget {
    pub antigen: ParticleId,
    pub epitope: usize,
}

/// Stoichiometric regime of the antibody:antigen site ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Zone {
    /// Antibody excess.
    Prozone,
    Equivalence,
    /// Antigen excess.
    #[serde(rename = "Post-zone")]
    PostZone,
}

impl Zone {
    /// Classifies a base-10 log ratio. The threshold itself belongs to `Equivalence`.
    pub fn classify(log_ratio: f32, threshold: f32) -> Zone {
        if log_ratio > threshold {
            Zone::Prozone
        } else if log_ratio < -threshold {
            Zone::PostZone
        } else {
            Zone::Equivalence
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Zone::Prozone => "Prozone",
            Zone::Equivalence => "Equivalence",
            Zone::PostZone => "Post-zone",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate metrics of the current binding graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Antibody binding sites per epitope.
    pub ratio: f32,
    pub zone: Zone,
    /// Percentage of antigens in clusters at or above the precipitate size.
    pub precipitation: f32,
    /// Antibodies bound to two or more distinct antigens.
    pub bridges: u32,
    /// Largest cluster with at least two antigens, 0 when there is none.
    pub max_cluster: u32,
    /// Number of clusters with at least two antigens.
    pub cluster_count: u32,
    pub complex_size: u32,
    /// Percentage of epitopes currently occupied.
    pub epitope_occupancy: f32,
}

impl Default for Statistics {
    fn default() -> Self {
        Statistics {
            ratio: 1.0,
            zone: Zone::Equivalence,
            precipitation: 0.0,
            bridges: 0,
            max_cluster: 0,
            cluster_count: 0,
            complex_size: 0,
            epitope_occupancy: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpitopeSnapshot {
    pub angle: f32,
    pub position: (f32, f32),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupant: Option<ParticleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntigenSnapshot {
    pub id: ParticleId,
    pub position: (f32, f32),
    pub radius: f32,
    pub cluster: ParticleId,
    pub precipitated: bool,
    pub epitopes: Vec<EpitopeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSnapshot {
    pub angle: f32,
    pub tip: (f32, f32),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<BindingTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntibodySnapshot {
    pub id: ParticleId,
    pub antibody_type: AntibodyType,
    pub position: (f32, f32),
    pub angle: f32,
    pub arms: Vec<ArmSnapshot>,
}

/// Read-only copy of the engine state handed to renderers and exporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Frame counter at which the copy was taken.
    pub frame: u64,
    pub running: bool,
    pub antigens: Vec<AntigenSnapshot>,
    pub antibodies: Vec<AntibodySnapshot>,
    pub stats: Statistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive_on_both_sides() {
        assert_eq!(Zone::classify(0.22, 0.22), Zone::Equivalence);
        assert_eq!(Zone::classify(-0.22, 0.22), Zone::Equivalence);
        assert_eq!(Zone::classify(0.2201, 0.22), Zone::Prozone);
        assert_eq!(Zone::classify(-0.2201, 0.22), Zone::PostZone);
    }

    #[test]
    fn zone_labels_match_display() {
        assert_eq!(Zone::PostZone.to_string(), "Post-zone");
        assert_eq!(Zone::Prozone.label(), "Prozone");
    }
}
