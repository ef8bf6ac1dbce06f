//! Two-dimensional antigen/antibody immune-complex simulation.
//!
//! [`Simulation`] owns the entity arena and runs the per-tick pipeline:
//! motion, repulsion and cohesion, binding and release, pose relaxation,
//! cluster detection and statistics. Configuration, parameters and the
//! snapshot types live in `immuno-common`.

pub mod binding;
pub mod clusters;
pub mod forces;
pub mod grid;
pub mod kinematics;
pub mod motion;
pub mod population;
pub mod simulation;
pub mod state;
pub mod stats;

pub use immuno_common as common;
pub use simulation::Simulation;
