use crate::sim_params::{SimParams, BOUNDARY_MARGIN, MAX_ARENA_EXTENT, PLACEMENT_MARGIN};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Antibody isotype. IgG carries two arms on a stem, IgM ten arms (five opposed
/// pairs) around a point-like base.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AntibodyType {
    IgG,
    IgM,
}

impl AntibodyType {
    pub fn label(self) -> &'static str {
        match self {
            AntibodyType::IgG => "IgG",
            AntibodyType::IgM => "IgM",
        }
    }

    /// Number of binding arms per antibody of this type.
    pub fn valence(self) -> usize {
        match self {
            AntibodyType::IgG => 2,
            AntibodyType::IgM => 10,
        }
    }

    /// Fc stem length. For IgM the base is a point and the stem only extends the reach.
    pub fn stem_length(self) -> f32 {
        match self {
            AntibodyType::IgG => 20.0,
            AntibodyType::IgM => 14.0,
        }
    }

    /// Fixed angular offsets of the arms relative to the body frame.
    pub fn arm_angles(self) -> Vec<f32> {
        match self {
            AntibodyType::IgG => vec![-0.55, 0.55],
            AntibodyType::IgM => (0..5)
                .flat_map(|i| {
                    let base = i as f32 / 5.0 * std::f32::consts::TAU;
                    [base - 0.65, base + 0.65]
                })
                .collect(),
        }
    }
}

// Arena dimensions
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            width: 1000.0,
            height: 600.0,
        }
    }
}

// Population composition; any change here rebuilds the entity set.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PopulationConfig {
    pub antigen_count: u32,
    pub antibody_count: u32,
    #[serde(default = "default_antibody_type")]
    pub antibody_type: AntibodyType,
    #[serde(default = "default_epitopes")]
    pub epitopes_per_antigen: u32,
    /// Monovalent antigen mode: every antigen carries exactly one epitope.
    #[serde(default)]
    pub hapten: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        PopulationConfig {
            antigen_count: 50,
            antibody_count: 100,
            antibody_type: default_antibody_type(),
            epitopes_per_antigen: default_epitopes(),
            hapten: false,
            seed: default_seed(),
        }
    }
}

// Rate settings, applied on the next tick without a rebuild.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct KineticsConfig {
    /// Association strength, 0 to 100.
    pub affinity: f32,
    /// Dissociation strength, 0 to 50.
    pub dissociation: f32,
    /// Thermal agitation, 0 to 100.
    pub temperature: f32,
}

impl Default for KineticsConfig {
    fn default() -> Self {
        KineticsConfig {
            affinity: 80.0,
            dissociation: 8.0,
            temperature: 30.0,
        }
    }
}

/// Constants of the approximate pose solve for bound antibodies.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RelaxationConfig {
    pub iterations: u32,
    pub step: f32,
    pub angular_scale: f32,
    pub max_angular_step: f32,
    pub antigen_pull: f32,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        RelaxationConfig {
            iterations: 5,
            step: 0.4,
            angular_scale: 80.0,
            max_angular_step: 0.2,
            antigen_pull: 0.08,
        }
    }
}

// Headless driver settings
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub total_ticks: u64,
    pub status_interval_ticks: u64,
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            total_ticks: 3000,
            status_interval_ticks: 300,
            start_paused: false,
        }
    }
}

// Final-frame output. No per-tick history is written.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default)]
    pub save_final_snapshot: bool,
    #[serde(default)]
    pub save_positions: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "immuno".to_string(),
            save_final_snapshot: false,
            save_positions: false,
        }
    }
}

fn default_antibody_type() -> AntibodyType {
    AntibodyType::IgG
}

fn default_epitopes() -> u32 {
    4
}

fn default_seed() -> u64 {
    42
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SimulationConfig {
    #[serde(default)]
    pub arena: ArenaConfig,
    pub population: PopulationConfig,
    #[serde(default)]
    pub kinetics: KineticsConfig,
    #[serde(default)]
    pub relaxation: RelaxationConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The configuration fields whose change invalidates the current population.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralKey {
    pub antigen_count: u32,
    pub antibody_count: u32,
    pub antibody_type: AntibodyType,
    pub epitopes_per_antigen: u32,
    pub hapten: bool,
    pub width: f32,
    pub height: f32,
}

impl SimulationConfig {
    /// Loads and validates the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e)
        })?;
        let config: SimulationConfig = toml::from_str(&config_str).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from '{}': {}", path_ref.display(), e)
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let min_extent = 2.0 * PLACEMENT_MARGIN.max(BOUNDARY_MARGIN);
        // NaN fails both comparisons.
        let extent_ok = |v: f32| v > min_extent && v <= MAX_ARENA_EXTENT;
        if !extent_ok(self.arena.width) || !extent_ok(self.arena.height) {
            anyhow::bail!(
                "arena sides must lie in ({}, {}] (got {}x{}).",
                min_extent,
                MAX_ARENA_EXTENT,
                self.arena.width,
                self.arena.height
            );
        }
        if !(0.0..=100.0).contains(&self.kinetics.affinity) {
            anyhow::bail!("affinity must lie in 0..=100 (got {}).", self.kinetics.affinity);
        }
        if !(0.0..=50.0).contains(&self.kinetics.dissociation) {
            anyhow::bail!(
                "dissociation must lie in 0..=50 (got {}).",
                self.kinetics.dissociation
            );
        }
        if !(0.0..=100.0).contains(&self.kinetics.temperature) {
            anyhow::bail!(
                "temperature must lie in 0..=100 (got {}).",
                self.kinetics.temperature
            );
        }
        if self.population.epitopes_per_antigen == 0 && !self.population.hapten {
            anyhow::bail!("epitopes_per_antigen must be greater than 0.");
        }
        let relax = &self.relaxation;
        if !(relax.step.is_finite() && relax.step > 0.0)
            || !(relax.angular_scale.is_finite() && relax.angular_scale > 0.0)
        {
            anyhow::bail!("relaxation step and angular_scale must be positive and finite.");
        }
        if !(relax.max_angular_step.is_finite() && relax.max_angular_step >= 0.0)
            || !(relax.antigen_pull.is_finite() && relax.antigen_pull >= 0.0)
        {
            anyhow::bail!("relaxation max_angular_step and antigen_pull must be finite and not negative.");
        }
        Ok(())
    }

    /// Epitopes carried by each antigen once hapten mode is taken into account.
    pub fn effective_epitopes(&self) -> u32 {
        if self.population.hapten {
            1
        } else {
            self.population.epitopes_per_antigen.max(1)
        }
    }

    pub fn structural_key(&self) -> StructuralKey {
        StructuralKey {
            antigen_count: self.population.antigen_count,
            antibody_count: self.population.antibody_count,
            antibody_type: self.population.antibody_type,
            epitopes_per_antigen: self.population.epitopes_per_antigen,
            hapten: self.population.hapten,
            width: self.arena.width,
            height: self.arena.height,
        }
    }

    /// Converts the configuration into the parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams::from_config(self)
    }
}
