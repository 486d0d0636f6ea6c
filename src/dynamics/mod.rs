//! Simulation dynamics modules: integration, contact solving, friction, and islands.

pub mod friction;
pub mod integrator;
pub mod island;
pub mod solver;

pub use integrator::Integrator;
pub use island::{Island, IslandManager};
pub use solver::{Contact, PGSSolver, SolverStepMetrics};
