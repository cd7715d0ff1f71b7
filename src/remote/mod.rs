pub mod client;

pub use client::{AgentCreateSpec, AgentsClient, HttpAgentsClient};
