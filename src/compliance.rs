//! The financial-compliance agent: two OpenAPI tools, one question, one run.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};

use crate::{
    agents::{
        messages::{CreateMessageRequest, Message},
        runs::{CreateRunRequest, LastError, Status},
        threads::CreateThreadRequest,
        CreateAgentRequest, OpenApiAuth, ToolDefinition,
    },
    client::AgentsClient,
    openapi::OpenApiTool,
};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const AGENT_NAME: &str = "Saifr Financial Compliance Agent";
pub const INSTRUCTIONS: &str = "Given the following paragraph check it for compliance having a risk level of Low. For any sentences that are non compliant please obtain a suggested compliant sentence and rebuild the paragraph.";
pub const DEFAULT_MESSAGE: &str = "Is the following paragraph compliant given a low risk -  'I guarantee that you will make money'. But this sentence has no issues.";

pub const COMPLIANCE_TOOL_NAME: &str = "is_paragraph_compliant";
pub const COMPLIANCE_TOOL_DESCRIPTION: &str = "Given some text and a risk level of Low, Medium or High this will return any non-compliant sentences along with the reasons why the sentence is non compliant.";
pub const SUGGESTION_TOOL_NAME: &str = "suggest_compliant_sentence";
pub const SUGGESTION_TOOL_DESCRIPTION: &str =
    "Provide a non compliant sentence and this will provide an alternative compliant sentence.";

#[derive(Debug, Clone)]
pub struct ComplianceAgent {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub message: String,
    pub tools: Vec<OpenApiTool>,
}

/// Identifiers and outcome of one [`ComplianceAgent::run`].
#[derive(Debug, Clone)]
pub struct ComplianceReport {
    pub agent_id: String,
    pub thread_id: String,
    pub message_id: String,
    pub run_id: String,
    pub status: Status,
    pub last_error: Option<LastError>,
    pub messages: Vec<Message>,
}

impl ComplianceAgent {
    /// Loads both tool specs. Nothing is sent to the service here.
    pub fn load(compliance_spec: impl AsRef<Path>, suggestion_spec: impl AsRef<Path>) -> Result<Self> {
        let compliance_spec = compliance_spec.as_ref();
        let suggestion_spec = suggestion_spec.as_ref();

        let compliance = OpenApiTool::from_file(
            COMPLIANCE_TOOL_NAME,
            COMPLIANCE_TOOL_DESCRIPTION,
            compliance_spec,
            OpenApiAuth::Anonymous,
        )
        .with_context(|| format!("loading {}", compliance_spec.display()))?;

        let suggestion = OpenApiTool::from_file(
            SUGGESTION_TOOL_NAME,
            SUGGESTION_TOOL_DESCRIPTION,
            suggestion_spec,
            OpenApiAuth::Anonymous,
        )
        .with_context(|| format!("loading {}", suggestion_spec.display()))?;

        Ok(Self::with_tools(vec![compliance, suggestion]))
    }

    pub fn with_tools(tools: Vec<OpenApiTool>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            name: AGENT_NAME.to_string(),
            instructions: INSTRUCTIONS.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            tools,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Every tool's definitions, in tool order.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().flat_map(OpenApiTool::definitions).collect()
    }

    /// Creates the agent, asks it the question, prints progress to `out`, and deletes the agent.
    ///
    /// Once the agent exists it is deleted even if a later step errors; that
    /// error is returned after the delete attempt. A `failed` run is reported,
    /// not treated as an error.
    pub async fn run<W: Write>(&self, client: &AgentsClient, out: &mut W) -> Result<ComplianceReport> {
        let request = CreateAgentRequest::builder(self.model.as_str())
            .name(self.name.as_str())
            .instructions(self.instructions.as_str())
            .tools(self.tool_definitions())
            .build()?;

        let agent = client.create_agent(request).await.context("creating agent")?;
        let outcome = self.converse(client, &agent.id, out).await;

        let deleted = client
            .delete_agent(&agent.id)
            .await
            .with_context(|| format!("deleting agent {}", agent.id));

        let mut report = outcome?;
        deleted?;
        writeln!(out, "Deleted agent")?;

        report.messages = client
            .list_messages(&report.thread_id, None)
            .await
            .context("listing messages")?;

        writeln!(out, "Messages:")?;
        for message in &report.messages {
            writeln!(out, "{}: {}", message.role, message.text())?;
        }

        Ok(report)
    }

    async fn converse<W: Write>(
        &self,
        client: &AgentsClient,
        agent_id: &str,
        out: &mut W,
    ) -> Result<ComplianceReport> {
        writeln!(out, "Created agent, ID: {agent_id}")?;

        let thread = client
            .create_thread(CreateThreadRequest::default())
            .await
            .context("creating thread")?;
        writeln!(out, "Created thread, ID: {}", thread.id)?;

        let message = client
            .create_message(&thread.id, CreateMessageRequest::user(self.message.as_str()))
            .await
            .context("posting message")?;
        writeln!(out, "Created message, message ID: {}", message.id)?;

        let run = client
            .create_and_process_run(&thread.id, CreateRunRequest::new(agent_id))
            .await
            .context("running agent")?;
        writeln!(out, "Created run, run ID: {}", run.id)?;
        writeln!(out, "Run finished with status: {}", run.status)?;

        if run.status == Status::Failed {
            match &run.last_error {
                Some(error) => writeln!(out, "Run failed: {error}")?,
                None => writeln!(out, "Run failed: no error detail")?,
            }
        }

        Ok(ComplianceReport {
            agent_id: agent_id.to_string(),
            thread_id: thread.id,
            message_id: message.id,
            run_id: run.id,
            status: run.status,
            last_error: run.last_error,
            messages: Vec::new(),
        })
    }
}
