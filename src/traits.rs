//! Agent-facing tool interface.
//!
//! Tools are what an agent runtime discovers and invokes. Each one exposes a
//! name, a description, an OpenAI function-calling parameter schema, and an
//! async [`execute`](Tool::execute) that takes JSON params and returns JSON.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         ToolRegistry         │
//! │  ┌────────────────────────┐  │
//! │  │ DriveSearchTool        │  │
//! │  │  └─▶ DrivePipeline     │  │
//! │  └────────────────────────┘  │
//! └──────────────┬───────────────┘
//!                ▼
//!     execute(params, ctx) → { chunks, indexing_incomplete }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drive_harness::traits::{DriveSearchTool, ToolRegistry};
//! # fn example(pipeline: Arc<drive_harness::pipeline::DrivePipeline>) {
//! let mut tools = ToolRegistry::new();
//! if DriveSearchTool::is_available() {
//!     tools.register(Box::new(DriveSearchTool::new(pipeline)));
//! }
//! # }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::GOOGLE_DRIVE_TOOL_ID;
use crate::pipeline::DrivePipeline;

/// OAuth client credentials the Drive tool needs to be offered at all.
pub const DRIVE_CREDENTIAL_VARS: [&str; 2] =
    ["GOOGLE_DRIVE_CLIENT_ID", "GOOGLE_DRIVE_CLIENT_SECRET"];

/// A tool an agent can call.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use serde_json::{json, Value};
/// use drive_harness::traits::{Tool, ToolContext};
///
/// pub struct EchoTool;
///
/// #[async_trait]
/// impl Tool for EchoTool {
///     fn name(&self) -> &str { "echo" }
///     fn description(&self) -> &str { "Return the params unchanged" }
///
///     fn parameters_schema(&self) -> Value {
///         json!({ "type": "object", "properties": {}, "required": [] })
///     }
///
///     async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<Value> {
///         Ok(params)
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores (e.g. `"google_drive"`).
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// OpenAI function-calling JSON Schema for the parameters. Must have
    /// `type: "object"` and `properties`.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is always a JSON object.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Per-invocation context handed to [`Tool::execute`].
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The agent on whose behalf the tool runs. Scopes and indexes are keyed
    /// by it.
    pub agent_id: String,
}

impl ToolContext {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
        }
    }
}

/// Searches the agent's Drive scope, syncing it into the index first.
pub struct DriveSearchTool {
    pipeline: Arc<DrivePipeline>,
}

impl DriveSearchTool {
    pub fn new(pipeline: Arc<DrivePipeline>) -> Self {
        Self { pipeline }
    }

    /// Whether the Drive OAuth client credentials are present in the
    /// environment.
    pub fn is_available() -> bool {
        DRIVE_CREDENTIAL_VARS
            .iter()
            .all(|var| std::env::var(var).is_ok_and(|v| !v.trim().is_empty()))
    }
}

#[async_trait]
impl Tool for DriveSearchTool {
    fn name(&self) -> &str {
        GOOGLE_DRIVE_TOOL_ID
    }

    fn description(&self) -> &str {
        "Search the Google Drive files and folders this agent has access to"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("");
        let output = self.pipeline.run(&ctx.agent_id, query).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Registry of tools offered to agents.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Find a tool by name.
    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echo"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<Value> {
            Ok(params)
        }
    }

    #[tokio::test]
    async fn test_registry_find_and_execute() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(Box::new(EchoTool));
        assert_eq!(registry.len(), 1);
        assert!(registry.find("missing").is_none());

        let tool = registry.find("echo").unwrap();
        let out = tool
            .execute(serde_json::json!({"x": 1}), &ToolContext::new("a1"))
            .await
            .unwrap();
        assert_eq!(out["x"], 1);
    }
}
