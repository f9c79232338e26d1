pub mod classifier;
pub mod cli;
pub mod dataset;
pub mod eval;
pub mod features;
pub mod fixture_store;
pub mod goals_model;
pub mod model_registry;
pub mod paths;
pub mod poisson;
pub mod stats_lookup;
