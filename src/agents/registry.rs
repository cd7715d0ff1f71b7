use crate::config::AgentConfig;
use crate::remote::{AgentCreateSpec, AgentsClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Provisioned remote identity for one logical agent within a pipeline run.
#[derive(Debug, Clone)]
pub struct AgentHandle {
    pub agent_id: String,
    pub config: AgentConfig,
}

/// Owns the logical-name to remote-handle mapping for one pipeline run.
///
/// Created at pipeline start, torn down exactly once at pipeline end.
pub struct AgentRegistry {
    client: Arc<dyn AgentsClient>,
    handles: Vec<AgentHandle>,
}

impl AgentRegistry {
    pub fn new(client: Arc<dyn AgentsClient>) -> Self {
        Self {
            client,
            handles: Vec::new(),
        }
    }

    /// Create every agent remotely, strictly serialized, once per logical
    /// name. Any creation failure is fatal for the whole run; handles
    /// created before the failure stay registered so teardown can still
    /// delete them.
    pub async fn provision(&mut self, configs: &[AgentConfig]) -> Result<()> {
        for config in configs {
            let spec = AgentCreateSpec {
                model_id: config.model_id.clone(),
                display_name: format!("agent-{}", config.name),
                instructions: config.instructions.clone(),
                temperature: config.temperature,
                top_p: config.top_p,
                tool: config.tool.clone(),
            };
            let agent_id = self
                .client
                .create_agent(spec)
                .await
                .with_context(|| format!("failed to create agent '{}'", config.name))?;
            info!(
                "Created agent: {} ({}, model={}, tool={:?})",
                agent_id,
                config.name,
                config.model_id,
                config.tool.as_ref().map(|t| t.tool_id.as_str())
            );
            self.handles.push(AgentHandle {
                agent_id,
                config: config.clone(),
            });
        }
        Ok(())
    }

    pub fn handle(&self, name: &str) -> Option<&AgentHandle> {
        self.handles.iter().find(|h| h.config.name == name)
    }

    pub fn handles(&self) -> &[AgentHandle] {
        &self.handles
    }

    /// Best-effort deletion of every provisioned agent. A failed deletion is
    /// logged and the remaining deletions are still attempted; this never
    /// raises. Handles are drained, so a second call is a no-op.
    pub async fn teardown_all(&mut self) {
        for handle in self.handles.drain(..) {
            match self.client.delete_agent(&handle.agent_id).await {
                Ok(()) => info!("Deleted agent: {} ({})", handle.agent_id, handle.config.name),
                Err(e) => warn!(
                    "Could not delete agent {} ({}): {}",
                    handle.agent_id, handle.config.name, e
                ),
            }
        }
    }
}
