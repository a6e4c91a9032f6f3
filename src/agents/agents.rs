use std::collections::HashMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    client::{AgentsClient, DeletionStatus},
    ApiResponseOrError,
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Agent {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The name of the agent. The maximum length is 256 characters.
    pub name: Option<String>,
    /// The description of the agent. The maximum length is 512 characters.
    pub description: Option<String>,
    /// ID of the model deployment the agent runs on.
    pub model: String,
    /// The system instructions that the agent uses. The maximum length is 256,000 characters.
    pub instructions: Option<String>,
    /// Tools enabled on the agent, including kinds this crate has no type for.
    #[serde(default)]
    pub tools: Vec<AgentTool>,
    /// Set of 16 key-value pairs that can be attached to an object. Keys can be a maximum of 64 characters long and values can be a maximum of 512 characters long.
    pub metadata: Option<HashMap<String, String>>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// A tool the agent may call during a run.
#[derive(Debug, Clone, PartialEq, serde_double_tag::Deserialize, serde_double_tag::Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ToolDefinition {
    CodeInterpreter,
    FileSearch,
    Function(FunctionDefinition),
    Openapi(OpenApiFunctionDefinition),
}

/// A tool as reported back by the service.
///
/// The service knows more tool kinds (`bing_grounding`, `azure_ai_search`, ...) than
/// [`ToolDefinition`] models. Those are kept verbatim so reading an agent never fails.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum AgentTool {
    Definition(ToolDefinition),
    Other(Value),
}

impl AgentTool {
    pub fn definition(&self) -> Option<&ToolDefinition> {
        match self {
            AgentTool::Definition(definition) => Some(definition),
            AgentTool::Other(_) => None,
        }
    }

    /// The wire `type` of the tool.
    pub fn kind(&self) -> Option<&str> {
        match self {
            AgentTool::Definition(ToolDefinition::CodeInterpreter) => Some("code_interpreter"),
            AgentTool::Definition(ToolDefinition::FileSearch) => Some("file_search"),
            AgentTool::Definition(ToolDefinition::Function(_)) => Some("function"),
            AgentTool::Definition(ToolDefinition::Openapi(_)) => Some("openapi"),
            AgentTool::Other(value) => value.get("type").and_then(Value::as_str),
        }
    }
}

impl From<ToolDefinition> for AgentTool {
    fn from(definition: ToolDefinition) -> Self {
        AgentTool::Definition(definition)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the function arguments.
    pub parameters: Value,
}

/// An external HTTP API described by an OpenAPI document. The service calls it directly.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OpenApiFunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub spec: Value,
    pub auth: OpenApiAuth,
}

/// How the service authenticates against an OpenAPI tool's endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenApiAuth {
    #[default]
    Anonymous,
    Connection {
        security_scheme: ConnectionSecurityScheme,
    },
    ManagedIdentity {
        security_scheme: ManagedIdentitySecurityScheme,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionSecurityScheme {
    pub connection_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ManagedIdentitySecurityScheme {
    pub audience: String,
}

#[derive(Serialize, Builder, Debug, Clone, Default)]
#[builder(pattern = "owned")]
#[builder(name = "CreateAgentBuilder")]
#[builder(setter(strip_option, into))]
pub struct CreateAgentRequest {
    /// ID of the model deployment to use.
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub instructions: Option<String>,
    /// A set of tools that the agent can use.
    #[builder(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub top_p: Option<f32>,
}

impl CreateAgentRequest {
    pub fn builder(model: impl Into<String>) -> CreateAgentBuilder {
        CreateAgentBuilder::create_empty().model(model)
    }
}

impl AgentsClient {
    pub async fn create_agent(&self, request: CreateAgentRequest) -> ApiResponseOrError<Agent> {
        self.post("assistants", request).await
    }

    pub async fn get_agent(&self, agent_id: &str) -> ApiResponseOrError<Agent> {
        self.get(format!("assistants/{agent_id}")).await
    }

    pub async fn update_agent(
        &self,
        agent_id: &str,
        request: CreateAgentRequest,
    ) -> ApiResponseOrError<Agent> {
        self.post(format!("assistants/{agent_id}"), request).await
    }

    pub async fn delete_agent(&self, agent_id: &str) -> ApiResponseOrError<DeletionStatus> {
        self.delete(format!("assistants/{agent_id}")).await
    }

    pub async fn list_agents(&self) -> ApiResponseOrError<Vec<Agent>> {
        self.list("assistants", None).await
    }
}
