pub mod generation;
pub mod simulation;
pub mod wind;

pub use generation::{GenerationParams, LayoutMode};
pub use simulation::SimulationConfig;
pub use wind::{WindParams, WindSource, WindTempoParams};
