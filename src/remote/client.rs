use crate::config::McpTool;
use crate::types::{MessageRole, RunState, RunStatus, ThreadMessage};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// API version pinned for every call to the remote agents service.
const API_VERSION: &str = "2025-05-01";

/// Everything needed to create one remote agent.
#[derive(Debug, Clone)]
pub struct AgentCreateSpec {
    pub model_id: String,
    pub display_name: String,
    pub instructions: String,
    pub temperature: f32,
    pub top_p: f32,
    pub tool: Option<McpTool>,
}

/// Capability surface of the remote agent-execution service.
///
/// Every call is a potentially long-latency network operation; callers must
/// only invoke these from a task context where awaiting does not stall
/// unrelated work.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AgentsClient: Send + Sync {
    async fn create_agent(&self, spec: AgentCreateSpec) -> Result<String>;
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;
    async fn create_thread(&self) -> Result<String>;
    /// Posts `text` to the thread as a user-role message.
    async fn post_message(&self, thread_id: &str, text: &str) -> Result<()>;
    async fn start_run(&self, thread_id: &str, agent_id: &str) -> Result<String>;
    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState>;
    /// Thread messages in ascending chronological order.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;
}

/// HTTP implementation backed by the agents REST surface.
pub struct HttpAgentsClient {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpAgentsClient {
    /// Build a client from `AZURE_PROJECT_ENDPOINT` and `AZURE_AGENTS_TOKEN`.
    ///
    /// An unset or malformed endpoint is a fatal configuration error raised
    /// before any remote call is made.
    pub fn from_env() -> Result<Self> {
        let endpoint = std::env::var("AZURE_PROJECT_ENDPOINT")
            .context("AZURE_PROJECT_ENDPOINT environment variable is not set")?;
        if !(endpoint.starts_with("https://") && endpoint.contains(".azure")) {
            bail!("AZURE_PROJECT_ENDPOINT appears invalid: {endpoint}");
        }
        let token = std::env::var("AZURE_AGENTS_TOKEN")
            .context("AZURE_AGENTS_TOKEN environment variable is not set")?;
        Self::new(endpoint, token)
    }

    pub fn new(endpoint: String, token: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .bearer_auth(&self.token)
            .query(&[("api-version", API_VERSION)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("agents service error: {status} - {text}");
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).context("invalid JSON from agents service")
    }
}

#[async_trait]
impl AgentsClient for HttpAgentsClient {
    async fn create_agent(&self, spec: AgentCreateSpec) -> Result<String> {
        let mut body = json!({
            "model": spec.model_id,
            "name": spec.display_name,
            "instructions": spec.instructions,
            "temperature": spec.temperature,
            "top_p": spec.top_p,
        });
        if let Some(tool) = &spec.tool {
            body["tools"] = json!([{
                "type": "mcp",
                "server_url": tool.server_url,
                "server_label": tool.server_label,
                "allowed_tools": [tool.tool_id],
            }]);
        }

        let value = self
            .send(self.http.post(self.url("assistants")).json(&body))
            .await?;
        value["id"]
            .as_str()
            .map(str::to_string)
            .context("create-agent response missing 'id'")
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        self.send(self.http.delete(self.url(&format!("assistants/{agent_id}"))))
            .await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<String> {
        let value = self
            .send(self.http.post(self.url("threads")).json(&json!({})))
            .await?;
        value["id"]
            .as_str()
            .map(str::to_string)
            .context("create-thread response missing 'id'")
    }

    async fn post_message(&self, thread_id: &str, text: &str) -> Result<()> {
        let body = json!({
            "role": "user",
            "content": text,
        });
        self.send(
            self.http
                .post(self.url(&format!("threads/{thread_id}/messages")))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, agent_id: &str) -> Result<String> {
        let body = json!({ "assistant_id": agent_id });
        let value = self
            .send(
                self.http
                    .post(self.url(&format!("threads/{thread_id}/runs")))
                    .json(&body),
            )
            .await?;
        value["id"]
            .as_str()
            .map(str::to_string)
            .context("create-run response missing 'id'")
    }

    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState> {
        let value = self
            .send(
                self.http
                    .get(self.url(&format!("threads/{thread_id}/runs/{run_id}"))),
            )
            .await?;
        parse_run(&value)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let value = self
            .send(
                self.http
                    .get(self.url(&format!("threads/{thread_id}/messages")))
                    .query(&[("order", "asc")]),
            )
            .await?;
        Ok(parse_messages(&value))
    }
}

fn parse_run(value: &Value) -> Result<RunState> {
    let status = value["status"]
        .as_str()
        .context("run response missing 'status'")?;
    let last_error = match &value["last_error"] {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => other["message"]
            .as_str()
            .map(str::to_string)
            .or_else(|| Some(other.to_string())),
    };
    Ok(RunState {
        status: RunStatus::parse(status),
        last_error,
    })
}

// Message content arrives as a list of typed blocks; the text consumed is
// the last text block of each message.
fn parse_messages(value: &Value) -> Vec<ThreadMessage> {
    let Some(items) = value["data"].as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let role = MessageRole::parse(item["role"].as_str()?);
            let text = item["content"].as_array()?.iter().rev().find_map(|block| {
                if block["type"].as_str()? == "text" {
                    block["text"]["value"].as_str().map(str::to_string)
                } else {
                    None
                }
            })?;
            Some(ThreadMessage { role, text })
        })
        .collect()
}
