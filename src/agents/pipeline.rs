use crate::agents::{prompts, AgentRegistry, FeedbackBus};
use crate::config::{self, AgentConfig};
use crate::remote::AgentsClient;
use crate::types::{MessageRole, RunResult, RunStatus};
use anyhow::{bail, Context, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Tuning knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fixed interval between run-status polls. No backoff.
    pub poll_interval: Duration,
    /// Log each completed agent's feedback text.
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            verbose: false,
        }
    }
}

/// Drives the review -> summarize -> implement protocol across target files.
///
/// Owns the registry and feedback-bus lifecycles: agents are provisioned
/// before the first file, the bus is reset before every file, and teardown
/// runs exactly once after the batch whether processing succeeded or a
/// fatal error propagated.
pub struct PipelineCoordinator {
    client: Arc<dyn AgentsClient>,
    registry: AgentRegistry,
    bus: FeedbackBus,
    configs: HashMap<String, AgentConfig>,
    /// Configured worker list as given, order preserved for provisioning.
    worker_names: Vec<String>,
    /// Workers that actually run in the review stage.
    reviewers: Vec<String>,
    summarizer: Option<String>,
    implementer: Option<String>,
    settings: PipelineConfig,
}

impl PipelineCoordinator {
    pub fn new(
        client: Arc<dyn AgentsClient>,
        configs: HashMap<String, AgentConfig>,
        worker_names: Vec<String>,
        summarizer: Option<String>,
        implementer: Option<String>,
        settings: PipelineConfig,
    ) -> Self {
        // A name doing double duty as summarizer or implementer is not a
        // reviewer; it only runs in its later stage. The unfiltered list
        // still drives provisioning order.
        let reviewers = worker_names
            .iter()
            .filter(|name| {
                Some(*name) != summarizer.as_ref() && Some(*name) != implementer.as_ref()
            })
            .cloned()
            .collect();

        Self {
            registry: AgentRegistry::new(client.clone()),
            client,
            bus: FeedbackBus::new(),
            configs,
            worker_names,
            reviewers,
            summarizer,
            implementer,
            settings,
        }
    }

    pub fn reviewers(&self) -> &[String] {
        &self.reviewers
    }

    /// Current feedback-bus content, in accumulation order.
    pub async fn feedback(&self) -> Vec<String> {
        self.bus.snapshot().await
    }

    /// Provision all agents, process every file sequentially, then tear the
    /// registry down. Teardown runs on every exit path.
    pub async fn run(&mut self, files: &[String]) -> Result<()> {
        let names = config::working_set(
            &self.worker_names,
            self.summarizer.as_deref(),
            self.implementer.as_deref(),
        );
        let mut ordered = Vec::with_capacity(names.len());
        for name in &names {
            ordered.push(self.config_for(name)?.clone());
        }

        if let Err(e) = self.registry.provision(&ordered).await {
            self.registry.teardown_all().await;
            return Err(e);
        }

        let outcome = self.process_files(files).await;
        self.registry.teardown_all().await;
        outcome
    }

    async fn process_files(&self, files: &[String]) -> Result<()> {
        for filename in files {
            info!("Processing file: {}", filename);
            self.bus.clear().await;
            self.process_file(filename).await?;
        }
        Ok(())
    }

    /// One complete state-machine pass: REVIEW -> SUMMARIZE -> IMPLEMENT.
    async fn process_file(&self, filename: &str) -> Result<()> {
        let file_content = match tokio::fs::read_to_string(filename).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read file {}: {}", filename, e);
                return Ok(());
            }
        };

        // REVIEW: every reviewer concurrently, each in a fresh thread.
        // Hard join before summarization starts.
        let review_tasks = self
            .reviewers
            .iter()
            .map(|name| self.review(name, &file_content));
        for result in join_all(review_tasks).await {
            result?;
        }

        if let Some(name) = &self.summarizer {
            self.summarize(name).await?;
        }

        if let Some(name) = &self.implementer {
            self.implement(name, filename, &file_content).await?;
        }

        Ok(())
    }

    /// Dispatch one reviewer; a completed run appends its feedback to the
    /// bus, a failed run contributes nothing and does not disturb the other
    /// concurrent reviewers.
    async fn review(&self, name: &str, file_content: &str) -> Result<()> {
        let config = self.config_for(name)?;
        let prompt = prompts::reviewer_prompt(&config.instructions, file_content);
        let result = self.dispatch(name, &prompt).await?;

        if result.status == RunStatus::Completed && !result.assistant_text.is_empty() {
            if self.settings.verbose {
                info!("\n[{}]:\n{}\n{}", name, result.assistant_text, "-".repeat(100));
            }
            self.bus.append(result.assistant_text).await;
        }
        Ok(())
    }

    /// On success the summarizer's output replaces the whole bus; on a
    /// failed run the accumulated feedback is left untouched.
    async fn summarize(&self, name: &str) -> Result<()> {
        let config = self.config_for(name)?;
        let feedback = self.bus.joined().await;
        let prompt = prompts::summarizer_prompt(&config.instructions, &feedback);
        let result = self.dispatch(name, &prompt).await?;

        if result.status == RunStatus::Completed && !result.assistant_text.is_empty() {
            if self.settings.verbose {
                info!("\n[{}]:\n{}\n{}", name, result.assistant_text, "-".repeat(100));
            }
            self.bus.replace_all(result.assistant_text).await;
        }
        Ok(())
    }

    /// On success the implementer's output overwrites the target file in
    /// place; a write failure is a warning, not a batch abort.
    async fn implement(&self, name: &str, filename: &str, file_content: &str) -> Result<()> {
        let config = self.config_for(name)?;
        let feedback = self.bus.joined().await;
        let prompt = prompts::implementer_prompt(&config.instructions, &feedback, file_content);
        let result = self.dispatch(name, &prompt).await?;

        if result.status == RunStatus::Completed && !result.assistant_text.is_empty() {
            info!("Saving changes to file: {}", filename);
            if let Err(e) = tokio::fs::write(filename, &result.assistant_text).await {
                warn!("Could not write file {}: {}", filename, e);
            }
        }
        Ok(())
    }

    /// One conversational turn of a provisioned agent in a fresh thread:
    /// post the prompt, start a run, poll at a fixed interval until the run
    /// leaves the pending set, then read back the last assistant message.
    async fn dispatch(&self, name: &str, prompt: &str) -> Result<RunResult> {
        let handle = self
            .registry
            .handle(name)
            .with_context(|| format!("agent '{name}' was not provisioned"))?;

        let thread_id = self.client.create_thread().await?;
        self.client.post_message(&thread_id, prompt).await?;
        let run_id = self.client.start_run(&thread_id, &handle.agent_id).await?;
        info!("Created run ({}), ID: {}", name, run_id);

        let mut state = self.client.run_state(&thread_id, &run_id).await?;
        while state.status.is_pending() {
            sleep(self.settings.poll_interval).await;
            state = self.client.run_state(&thread_id, &run_id).await?;
        }

        match state.status {
            RunStatus::Failed => {
                let error = state
                    .last_error
                    .unwrap_or_else(|| "unknown run error".to_string());
                warn!("Run failed ({}): {}", name, error);
                Ok(RunResult {
                    status: RunStatus::Failed,
                    assistant_text: String::new(),
                    error: Some(error),
                })
            }
            RunStatus::Completed => {
                let messages = self.client.list_messages(&thread_id).await?;
                let assistant_text = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::Assistant)
                    .map(|m| m.text.clone())
                    .unwrap_or_default();
                Ok(RunResult {
                    status: RunStatus::Completed,
                    assistant_text,
                    error: None,
                })
            }
            other => bail!("run for agent '{name}' ended in unexpected status {other:?}"),
        }
    }

    fn config_for(&self, name: &str) -> Result<&AgentConfig> {
        self.configs
            .get(name)
            .with_context(|| format!("no configuration loaded for agent '{name}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::client::MockAgentsClient;

    fn config(name: &str) -> AgentConfig {
        AgentConfig {
            name: name.to_string(),
            model_id: "gpt-4o".to_string(),
            temperature: 0.2,
            top_p: 0.9,
            instructions: format!("instructions for {name}"),
            tool: None,
        }
    }

    fn configs(names: &[&str]) -> HashMap<String, AgentConfig> {
        names
            .iter()
            .map(|n| (n.to_string(), config(n)))
            .collect()
    }

    #[test]
    fn test_reviewers_exclude_summarizer_and_implementer() {
        let client = Arc::new(MockAgentsClient::new());
        let coordinator = PipelineCoordinator::new(
            client,
            configs(&["a", "b", "s", "i"]),
            vec!["a".to_string(), "s".to_string(), "b".to_string(), "i".to_string()],
            Some("s".to_string()),
            Some("i".to_string()),
            PipelineConfig::default(),
        );
        assert_eq!(coordinator.reviewers(), &["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_run_refuses_unknown_agent_before_provisioning() {
        // No expectations set: any remote call would panic the mock.
        let client = Arc::new(MockAgentsClient::new());
        let mut coordinator = PipelineCoordinator::new(
            client,
            configs(&["a"]),
            vec!["a".to_string(), "ghost".to_string()],
            None,
            None,
            PipelineConfig::default(),
        );
        let err = coordinator.run(&["doc.txt".to_string()]).await.unwrap_err();
        assert!(format!("{err:#}").contains("ghost"));
    }
}
