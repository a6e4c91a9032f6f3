use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::{
    agents::{AgentTool, ToolDefinition},
    client::AgentsClient,
    ApiResponseOrError,
};

use super::messages::{CreateMessageRequest, IncompleteDetails};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Run {
    /// The identifier, which can be referenced in API endpoints.
    pub id: String,
    /// The object type, which is always `thread.run`.
    pub object: String,
    /// The Unix timestamp (in seconds) for when the run was created.
    pub created_at: u64,
    /// The ID of the agent used for this run.
    pub assistant_id: String,
    /// The ID of the thread associated with this run.
    pub thread_id: String,
    /// The status of the run.
    pub status: Status,
    /// Details on the action required to continue the run. Will be null if no action is required.
    pub required_action: Option<RequiredAction>,
    /// The last error that occurred during this run.
    pub last_error: Option<LastError>,
    /// The Unix timestamp (in seconds) for when the run will expire.
    pub expires_at: Option<u64>,
    /// The Unix timestamp (in seconds) for when the run was started.
    pub started_at: Option<u64>,
    /// The Unix timestamp (in seconds) for when the run was completed.
    pub completed_at: Option<u64>,
    /// The Unix timestamp (in seconds) for when the run was cancelled.
    pub cancelled_at: Option<u64>,
    /// The Unix timestamp (in seconds) for when the run failed.
    pub failed_at: Option<u64>,
    /// Why the run ended as `incomplete`. Null for any other status.
    pub incomplete_details: Option<IncompleteDetails>,
    /// The model deployment the agent used for this run.
    pub model: Option<String>,
    /// The instructions the agent used for this run.
    pub instructions: Option<String>,
    /// The tools the agent used for this run.
    #[serde(default)]
    pub tools: Vec<AgentTool>,
    /// Token usage for the run. Null until the run reaches a terminal state.
    pub usage: Option<Usage>,
    /// Set of 16 key-value pairs that can be attached to an object.
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl Status {
    /// Whether the service is still working on the run, or waiting on the caller.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Status::Queued | Status::InProgress | Status::RequiresAction | Status::Cancelling
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_flight()
    }
}

#[derive(Debug, serde_double_tag::Deserialize, serde_double_tag::Serialize, Clone)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum RequiredAction {
    SubmitToolOutputs(SubmitToolOutputs),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitToolOutputs {
    pub tool_calls: Vec<RequiredToolCall>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequiredToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: Option<RequiredFunctionCall>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequiredFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LastError {
    pub code: String,
    pub message: String,
}

impl std::fmt::Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitToolOutputsRequest {
    pub tool_outputs: Vec<ToolOutput>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

#[derive(Serialize, Builder, Debug, Clone, Default)]
#[builder(pattern = "owned")]
#[builder(name = "CreateRunBuilder")]
#[builder(setter(strip_option, into))]
pub struct CreateRunRequest {
    /// ID of the agent to run.
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub additional_messages: Option<Vec<CreateMessageRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateRunRequest {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            assistant_id: agent_id.into(),
            ..Default::default()
        }
    }
}

impl AgentsClient {
    pub async fn create_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        self.post(format!("threads/{thread_id}/runs"), request)
            .await
    }

    pub async fn get_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        self.get(format!("threads/{thread_id}/runs/{run_id}")).await
    }

    pub async fn cancel_run(&self, thread_id: &str, run_id: &str) -> ApiResponseOrError<Run> {
        self.post(format!("threads/{thread_id}/runs/{run_id}/cancel"), json!({}))
            .await
    }

    /// Re-fetches the run until the service has finished with it.
    pub async fn poll_run(&self, mut run: Run) -> ApiResponseOrError<Run> {
        while run.status.is_in_flight() {
            tokio::time::sleep(self.current_poll_interval()).await;
            run = self
                .get_run(run.thread_id.as_str(), run.id.as_str())
                .await?;
            log::debug!("Run {} is {}", run.id, run.status);
        }
        Ok(run)
    }

    /// Creates a run and drives it to a terminal status.
    ///
    /// Tools attached to the agent are executed by the service. A run that
    /// asks for `submit_tool_outputs` needs a locally hosted function, which
    /// this client has none of, so such runs are cancelled.
    pub async fn create_and_process_run(
        &self,
        thread_id: &str,
        request: CreateRunRequest,
    ) -> ApiResponseOrError<Run> {
        let mut run = self.create_run(thread_id, request).await?;

        while run.status.is_in_flight() {
            tokio::time::sleep(self.current_poll_interval()).await;
            run = self.get_run(thread_id, run.id.as_str()).await?;
            log::debug!("Run {} is {}", run.id, run.status);

            if run.status == Status::RequiresAction {
                if let Some(RequiredAction::SubmitToolOutputs(action)) = &run.required_action {
                    log::warn!(
                        "Run {} requested {} local tool call(s) - cancelling run",
                        run.id,
                        action.tool_calls.len()
                    );
                }
                run = self.cancel_run(thread_id, run.id.as_str()).await?;
            }
        }

        Ok(run)
    }

    pub async fn submit_tool_outputs(
        &self,
        run: &Run,
        request: SubmitToolOutputsRequest,
    ) -> ApiResponseOrError<Run> {
        self.post(
            format!(
                "threads/{}/runs/{}/submit_tool_outputs",
                run.thread_id, run.id
            ),
            request,
        )
        .await
    }

    pub async fn submit_tool_outputs_and_poll(
        &self,
        run: &Run,
        request: SubmitToolOutputsRequest,
    ) -> ApiResponseOrError<Run> {
        let run = self.submit_tool_outputs(run, request).await?;
        self.poll_run(run).await
    }
}
