#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use foundry_agents::{
    client::AgentsClient,
    credentials::{AccessToken, CredentialError, TokenCredential},
};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";
pub const PREFIX: &str = "/agents/v1.0/subscriptions/sub/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/proj";

/// Hands out [`TOKEN`] and counts how often it was asked.
#[derive(Default)]
pub struct CountingCredential {
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenCredential for CountingCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken::new(TOKEN, None))
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn route(path: &str) -> String {
    format!("{PREFIX}/{path}")
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn client_for(server: &MockServer) -> AgentsClient {
    client_with_credential(server, Arc::new(CountingCredential::default()))
}

pub fn client_with_credential(
    server: &MockServer,
    credential: Arc<dyn TokenCredential>,
) -> AgentsClient {
    AgentsClient::from_connection_string(&format!("{};sub;rg;proj", server.uri()), credential)
        .unwrap()
        .poll_interval(Duration::from_millis(5))
}

pub fn agent_json(id: &str) -> Value {
    json!({
        "id": id,
        "object": "assistant",
        "created_at": 1736900000,
        "name": "Saifr Financial Compliance Agent",
        "description": null,
        "model": "gpt-4o-mini",
        "instructions": "Check it.",
        "tools": [],
        "metadata": {}
    })
}

pub fn thread_json(id: &str) -> Value {
    json!({
        "id": id,
        "object": "thread",
        "created_at": 1736900001,
        "metadata": {}
    })
}

pub fn message_json(id: &str, thread_id: &str, role: &str, text: &str) -> Value {
    json!({
        "id": id,
        "object": "thread.message",
        "created_at": 1736900002,
        "thread_id": thread_id,
        "status": "completed",
        "role": role,
        "content": [{ "type": "text", "text": { "value": text, "annotations": [] } }],
        "assistant_id": null,
        "run_id": null,
        "attachments": [],
        "metadata": {}
    })
}

pub fn run_json(id: &str, thread_id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "object": "thread.run",
        "created_at": 1736900003,
        "assistant_id": "asst_1",
        "thread_id": thread_id,
        "status": status,
        "required_action": null,
        "last_error": null,
        "model": "gpt-4o-mini",
        "instructions": "Check it.",
        "tools": [],
        "metadata": {}
    })
}

pub fn deleted_json(id: &str, object: &str) -> Value {
    json!({ "id": id, "object": object, "deleted": true })
}

pub fn list_json(data: Vec<Value>, has_more: bool) -> Value {
    let first_id = data.first().map(|item| item["id"].clone());
    let last_id = data.last().map(|item| item["id"].clone());

    json!({
        "object": "list",
        "data": data,
        "first_id": first_id,
        "last_id": last_id,
        "has_more": has_more
    })
}
