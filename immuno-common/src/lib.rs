pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    AntibodyType, ArenaConfig, KineticsConfig, OutputConfig, PopulationConfig, RelaxationConfig,
    RunConfig, SimulationConfig, StructuralKey,
};
pub use sim_params::SimParams;
pub use snapshot::{
    AntibodySnapshot, AntigenSnapshot, ArmSnapshot, BindingTarget, EpitopeSnapshot, ParticleId,
    Snapshot, Statistics, Zone,
};
pub use vecmath::{angle_to_vec, clamp, Vec2};
