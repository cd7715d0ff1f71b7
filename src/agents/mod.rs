pub mod feedback;
pub mod pipeline;
pub mod prompts;
pub mod registry;

pub use feedback::FeedbackBus;
pub use pipeline::{PipelineConfig, PipelineCoordinator};
pub use registry::{AgentHandle, AgentRegistry};
