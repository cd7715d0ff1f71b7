pub mod agents;
pub mod config;
pub mod remote;
pub mod types;
