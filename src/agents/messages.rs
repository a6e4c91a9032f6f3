use crate::{client::AgentsClient, ApiResponseOrError};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// The thread ID that this message belongs to.
    pub thread_id: String,
    /// The status of the message, which can be either in_progress, incomplete, or completed.
    pub status: Option<Status>,
    /// On an incomplete message, details about why the message is incomplete.
    pub incomplete_details: Option<IncompleteDetails>,
    pub completed_at: Option<u64>,
    pub incomplete_at: Option<u64>,
    /// The entity that produced the message.
    pub role: Role,
    #[serde(default)]
    pub content: Vec<Content>,
    /// The agent that produced the message.
    pub assistant_id: Option<String>,
    /// The run that produced the message. Null for messages posted with [`AgentsClient::create_message`].
    pub run_id: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
    pub metadata: Option<HashMap<String, String>>,
}

impl Message {
    /// All text parts of the message, joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::Text(text) => Some(text.value.as_str()),
                Content::ImageFile(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    InProgress,
    Incomplete,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IncompleteDetails {
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, serde_double_tag::Serialize, serde_double_tag::Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum Content {
    Text(Text),
    ImageFile(ImageFile),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Text {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// A citation inside a text part. Only the common fields are decoded.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub start_index: Option<u32>,
    pub end_index: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImageFile {
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Attachment {
    pub file_id: String,
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
}

#[derive(Serialize, Builder, Debug, Clone)]
#[builder(pattern = "owned")]
#[builder(name = "CreateMessageBuilder")]
#[builder(setter(strip_option, into))]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CreateMessageRequest {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: None,
            metadata: None,
        }
    }
}

impl AgentsClient {
    pub async fn create_message(
        &self,
        thread_id: &str,
        request: CreateMessageRequest,
    ) -> ApiResponseOrError<Message> {
        self.post(format!("threads/{thread_id}/messages"), request)
            .await
    }

    pub async fn list_messages(
        &self,
        thread_id: &str,
        after_id: Option<String>,
    ) -> ApiResponseOrError<Vec<Message>> {
        self.list(format!("threads/{thread_id}/messages"), after_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_joins_text_parts() {
        let message: Message = serde_json::from_value(json!({
            "id": "msg_1",
            "object": "thread.message",
            "created_at": 1736900000,
            "thread_id": "thread_1",
            "status": "completed",
            "role": "assistant",
            "content": [
                { "type": "text", "text": { "value": "The paragraph is not compliant.", "annotations": [] } },
                { "type": "image_file", "image_file": { "file_id": "file_1" } },
                { "type": "text", "text": { "value": "Suggested rewrite attached." } }
            ],
            "assistant_id": "asst_1",
            "run_id": "run_1",
            "attachments": [],
            "metadata": {}
        }))
        .unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.status, Some(Status::Completed));
        assert_eq!(
            message.text(),
            "The paragraph is not compliant.\nSuggested rewrite attached."
        );
    }

    #[test]
    fn user_message_request() {
        assert_eq!(
            serde_json::to_value(CreateMessageRequest::user("hello")).unwrap(),
            json!({ "role": "user", "content": "hello" })
        );
        assert_eq!(Role::User.to_string(), "user");
    }
}
