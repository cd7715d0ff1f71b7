//! Agent record loading and validation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Server label used when a tool record does not name one.
pub const DEFAULT_SERVER_LABEL: &str = "Unknown";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing agent record file(s): {}", .0.join(", "))]
    MissingRecords(Vec<String>),

    #[error("agent '{agent}' record errors: {}", .defects.join(", "))]
    InvalidRecord { agent: String, defects: Vec<String> },
}

/// Validated configuration for one logical agent. Loaded once at startup,
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub model_id: String,
    pub temperature: f32,
    pub top_p: f32,
    pub instructions: String,
    pub tool: Option<McpTool>,
}

/// The single optional MCP tool binding an agent may carry.
#[derive(Debug, Clone, PartialEq)]
pub struct McpTool {
    pub tool_id: String,
    pub server_url: String,
    pub server_label: String,
}

// On-disk record shape. Every field is optional here so validation can
// report the complete defect list for an agent instead of stopping at the
// first missing field.
#[derive(Debug, Deserialize)]
struct RawRecord {
    model: Option<RawModel>,
    instructions: Option<String>,
    tools: Option<Vec<RawTool>>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    id: Option<String>,
    options: Option<RawModelOptions>,
}

#[derive(Debug, Deserialize)]
struct RawModelOptions {
    temperature: Option<f32>,
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RawTool {
    #[serde(rename = "type")]
    kind: Option<String>,
    id: Option<String>,
    options: Option<RawToolOptions>,
}

#[derive(Debug, Deserialize)]
struct RawToolOptions {
    server_url: Option<String>,
    server_label: Option<String>,
}

impl RawRecord {
    fn validate(self, name: &str) -> Result<AgentConfig, ConfigError> {
        let mut defects = Vec::new();

        let mut model_id = None;
        let mut temperature = None;
        let mut top_p = None;

        match self.model {
            None => defects.push("missing 'model' section".to_string()),
            Some(model) => {
                match model.id {
                    Some(id) if !id.trim().is_empty() => model_id = Some(id),
                    _ => defects.push("missing 'model.id'".to_string()),
                }
                match model.options {
                    None => defects.push("missing 'model.options'".to_string()),
                    Some(options) => {
                        match options.temperature {
                            Some(t) => temperature = Some(t),
                            None => defects.push("missing 'model.options.temperature'".to_string()),
                        }
                        match options.top_p {
                            Some(p) => top_p = Some(p),
                            None => defects.push("missing 'model.options.top_p'".to_string()),
                        }
                    }
                }
            }
        }

        let instructions = match self.instructions {
            Some(text) if !text.trim().is_empty() => Some(text),
            _ => {
                defects.push("missing 'instructions'".to_string());
                None
            }
        };

        // A tool section is optional, but an incomplete one is a defect,
        // never a silently-dropped tool. Only the first entry is honored.
        let mut tool = None;
        if let Some(tools) = self.tools {
            if let Some(entry) = tools.into_iter().next() {
                match validate_tool(entry) {
                    Ok(mcp) => tool = Some(mcp),
                    Err(defect) => defects.push(defect),
                }
            }
        }

        if !defects.is_empty() {
            return Err(ConfigError::InvalidRecord {
                agent: name.to_string(),
                defects,
            });
        }

        Ok(AgentConfig {
            name: name.to_string(),
            model_id: model_id.unwrap_or_default(),
            temperature: temperature.unwrap_or_default(),
            top_p: top_p.unwrap_or_default(),
            instructions: instructions.unwrap_or_default(),
            tool,
        })
    }
}

fn validate_tool(entry: RawTool) -> Result<McpTool, String> {
    let invalid = "invalid or incomplete MCP tool config in 'tools'".to_string();

    if entry.kind.as_deref() != Some("mcp") {
        return Err(invalid);
    }
    let tool_id = match entry.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => return Err(invalid),
    };
    let options = entry.options.ok_or_else(|| invalid.clone())?;
    let server_url = match options.server_url {
        Some(url) if !url.trim().is_empty() => url,
        _ => return Err(invalid),
    };

    Ok(McpTool {
        tool_id,
        server_url,
        server_label: options
            .server_label
            .unwrap_or_else(|| DEFAULT_SERVER_LABEL.to_string()),
    })
}

/// Deduplicated union of reviewer, summarizer and implementer names,
/// preserving first-seen order. Agent name is a key, not a multiset member.
pub fn working_set(
    reviewers: &[String],
    summarizer: Option<&str>,
    implementer: Option<&str>,
) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in reviewers
        .iter()
        .map(String::as_str)
        .chain(summarizer)
        .chain(implementer)
    {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Load and validate one agent record per name from `dir`.
///
/// All missing record files are collected and reported together as one fatal
/// error; a structurally invalid record aborts with the accumulated defect
/// list for that agent. Performs no network calls.
pub fn load_agent_configs(dir: &Path, names: &[String]) -> Result<HashMap<String, AgentConfig>> {
    let mut missing = Vec::new();
    let mut configs = HashMap::new();

    for name in names {
        let path = dir.join(format!("{name}.yml"));
        if !path.exists() {
            missing.push(name.clone());
            continue;
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read agent record {}", path.display()))?;
        let raw: RawRecord = serde_yaml::from_str(&text)
            .with_context(|| format!("YAML parsing error in {}", path.display()))?;
        let config = raw.validate(name)?;
        debug!("Loaded agent record: {} ({})", name, path.display());
        configs.insert(name.clone(), config);
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingRecords(missing).into());
    }

    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_working_set_dedup_preserves_order() {
        let reviewers = strings(&["a", "b", "a", "c"]);
        let names = working_set(&reviewers, Some("b"), Some("d"));
        assert_eq!(names, strings(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_working_set_drops_empty_names() {
        let reviewers = strings(&["a", "  ", ""]);
        let names = working_set(&reviewers, None, Some("a"));
        assert_eq!(names, strings(&["a"]));
    }

    #[test]
    fn test_validate_collects_all_defects() {
        let raw: RawRecord = serde_yaml::from_str("model:\n  id: gpt-4o\n").unwrap();
        let err = raw.validate("review").unwrap_err();
        match err {
            ConfigError::InvalidRecord { agent, defects } => {
                assert_eq!(agent, "review");
                assert!(defects.contains(&"missing 'model.options'".to_string()));
                assert!(defects.contains(&"missing 'instructions'".to_string()));
                assert_eq!(defects.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_requires_sampling_options() {
        let raw: RawRecord = serde_yaml::from_str(
            "model:\n  id: gpt-4o\n  options:\n    temperature: 0.2\ninstructions: review\n",
        )
        .unwrap();
        let err = raw.validate("review").unwrap_err();
        match err {
            ConfigError::InvalidRecord { defects, .. } => {
                assert_eq!(defects, vec!["missing 'model.options.top_p'".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_incomplete_tool_is_a_defect() {
        let raw: RawRecord = serde_yaml::from_str(
            "model:\n  id: gpt-4o\n  options:\n    temperature: 0.2\n    top_p: 0.9\n\
             instructions: review\ntools:\n  - type: mcp\n    id: search\n",
        )
        .unwrap();
        let err = raw.validate("review").unwrap_err();
        match err {
            ConfigError::InvalidRecord { defects, .. } => {
                assert_eq!(
                    defects,
                    vec!["invalid or incomplete MCP tool config in 'tools'".to_string()]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tool_label_defaults() {
        let raw: RawRecord = serde_yaml::from_str(
            "model:\n  id: gpt-4o\n  options:\n    temperature: 0.2\n    top_p: 0.9\n\
             instructions: review\ntools:\n  - type: mcp\n    id: search\n    options:\n      server_url: https://example.com/mcp\n",
        )
        .unwrap();
        let config = raw.validate("review").unwrap();
        let tool = config.tool.unwrap();
        assert_eq!(tool.tool_id, "search");
        assert_eq!(tool.server_url, "https://example.com/mcp");
        assert_eq!(tool.server_label, DEFAULT_SERVER_LABEL);
    }

    #[test]
    fn test_missing_records_all_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.yml"),
            "model:\n  id: gpt-4o\n  options:\n    temperature: 0.2\n    top_p: 0.9\ninstructions: review\n",
        )
        .unwrap();

        let err = load_agent_configs(dir.path(), &strings(&["a", "b", "c"])).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("b"));
        assert!(message.contains("c"));
    }

    #[test]
    fn test_load_valid_records() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("review.yml"),
            "model:\n  id: gpt-4o\n  options:\n    temperature: 0.3\n    top_p: 0.95\ninstructions: |\n  Look for errors.\n",
        )
        .unwrap();

        let configs = load_agent_configs(dir.path(), &strings(&["review"])).unwrap();
        let config = &configs["review"];
        assert_eq!(config.model_id, "gpt-4o");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.top_p, 0.95);
        assert!(config.instructions.contains("Look for errors."));
        assert!(config.tool.is_none());
    }
}
