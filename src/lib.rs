pub mod analysis;
pub mod config;
pub mod demography;
pub mod engine;
pub mod environment;
pub mod manager;
pub mod outputs;
pub mod resource;
pub mod state;
pub mod stats;
pub mod sweep;
pub mod toxicodynamics;

pub use config::Config;
pub use engine::{run_simulation, run_simulation_with_cancel};
pub use outputs::Series;
