use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    client::{AgentsClient, DeletionStatus},
    ApiResponseOrError,
};

use super::messages::CreateMessageRequest;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Thread {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    /// Set of 16 key-value pairs that can be attached to an object. Keys can be a maximum of 64 characters long and values can be a maximum of 512 characters long.
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Serialize, Builder, Debug, Clone, Default)]
#[builder(pattern = "owned")]
#[builder(name = "CreateThreadBuilder")]
#[builder(setter(strip_option, into))]
pub struct CreateThreadRequest {
    /// Messages to start the thread with.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[builder(default)]
    pub messages: Vec<CreateMessageRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl AgentsClient {
    pub async fn create_thread(&self, request: CreateThreadRequest) -> ApiResponseOrError<Thread> {
        self.post("threads", request).await
    }

    pub async fn get_thread(&self, thread_id: &str) -> ApiResponseOrError<Thread> {
        self.get(format!("threads/{thread_id}")).await
    }

    pub async fn delete_thread(&self, thread_id: &str) -> ApiResponseOrError<DeletionStatus> {
        self.delete(format!("threads/{thread_id}")).await
    }
}
