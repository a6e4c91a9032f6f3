mod common;

use common::*;
use foundry_agents::{
    agents::runs::Status,
    compliance::{ComplianceAgent, AGENT_NAME, COMPLIANCE_TOOL_NAME, SUGGESTION_TOOL_NAME},
    openapi::{load_spec, ToolSpecError},
};
use serde_json::{json, Value};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

fn load_agent() -> ComplianceAgent {
    ComplianceAgent::load(
        fixture("isParagraphCompliant.json"),
        fixture("SuggestedCompliantSentence.json"),
    )
    .unwrap()
}

async fn mount_happy_path(server: &MockServer, final_run: Value) {
    Mock::given(method("POST"))
        .and(path(route("assistants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_json("asst_1")))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(route("threads")))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_json("thread_1")))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(route("threads/thread_1/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_json(
            "msg_1",
            "thread_1",
            "user",
            "Is the following paragraph compliant?",
        )))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(route("threads/thread_1/runs")))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_json("run_1", "thread_1", "queued")))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route("threads/thread_1/runs/run_1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(final_run))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(route("assistants/asst_1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(deleted_json("asst_1", "assistant.deleted")),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route("threads/thread_1/messages")))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(
            vec![
                message_json("msg_1", "thread_1", "user", "Is the following paragraph compliant?"),
                message_json("msg_2", "thread_1", "assistant", "You may make money."),
            ],
            false,
        )))
        .expect(1)
        .mount(server)
        .await;
}

fn position(requests: &[Request], verb: &str, suffix: &str) -> usize {
    requests
        .iter()
        .position(|request| {
            request.method.as_str() == verb && request.url.path() == route(suffix)
        })
        .unwrap_or_else(|| panic!("no {verb} {suffix} request"))
}

#[tokio::test]
async fn completed_run_prints_ids_deletes_agent_and_lists_messages() {
    init_logging();
    let server = MockServer::start().await;
    mount_happy_path(&server, run_json("run_1", "thread_1", "completed")).await;

    let mut out = Vec::new();
    let report = load_agent()
        .run(&client_for(&server), &mut out)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Created agent, ID: asst_1\n\
         Created thread, ID: thread_1\n\
         Created message, message ID: msg_1\n\
         Created run, run ID: run_1\n\
         Run finished with status: completed\n\
         Deleted agent\n\
         Messages:\n\
         user: Is the following paragraph compliant?\n\
         assistant: You may make money.\n"
    );
    assert_eq!(report.status, Status::Completed);
    assert_eq!(report.thread_id, "thread_1");
    assert_eq!(report.messages.len(), 2);
}

#[tokio::test]
async fn agent_receives_both_tools() {
    let server = MockServer::start().await;
    mount_happy_path(&server, run_json("run_1", "thread_1", "completed")).await;

    let agent = load_agent();
    agent.run(&client_for(&server), &mut Vec::new()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let create = &requests[position(&requests, "POST", "assistants")];
    let body: Value = create.body_json().unwrap();

    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["name"], AGENT_NAME);
    assert_eq!(body["tools"], serde_json::to_value(agent.tool_definitions()).unwrap());

    let names: Vec<_> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["openapi"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, [COMPLIANCE_TOOL_NAME, SUGGESTION_TOOL_NAME]);

    let compliance_spec = load_spec(fixture("isParagraphCompliant.json")).unwrap();
    assert_eq!(body["tools"][0]["openapi"]["spec"], compliance_spec);
    assert_eq!(body["tools"][0]["openapi"]["auth"], json!({ "type": "anonymous" }));
}

#[tokio::test]
async fn failed_run_is_reported_before_the_agent_is_deleted() {
    let server = MockServer::start().await;
    let mut failed = run_json("run_1", "thread_1", "failed");
    failed["last_error"] = json!({
        "code": "tool_user_error",
        "message": "is_paragraph_compliant returned 401"
    });
    mount_happy_path(&server, failed).await;

    let mut out = Vec::new();
    let report = load_agent()
        .run(&client_for(&server), &mut out)
        .await
        .unwrap();
    let out = String::from_utf8(out).unwrap();

    let failure = out
        .find("Run failed: tool_user_error: is_paragraph_compliant returned 401")
        .expect("failure detail printed");
    let deleted = out.find("Deleted agent").expect("agent deleted");
    assert!(out.contains("Run finished with status: failed"));
    assert!(failure < deleted);
    assert_eq!(report.status, Status::Failed);

    let requests = server.received_requests().await.unwrap();
    assert!(position(&requests, "GET", "threads/thread_1/runs/run_1") < position(&requests, "DELETE", "assistants/asst_1"));
    assert!(position(&requests, "DELETE", "assistants/asst_1") < position(&requests, "GET", "threads/thread_1/messages"));
}

#[tokio::test]
async fn agent_is_deleted_when_a_later_step_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(route("assistants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_json("asst_1")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(route("threads")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": "internal_error", "message": "thread store unavailable" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(route("assistants/asst_1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(deleted_json("asst_1", "assistant.deleted")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    let error = load_agent()
        .run(&client_for(&server), &mut out)
        .await
        .unwrap_err();

    assert!(format!("{error:#}").contains("thread store unavailable"));
    assert_eq!(String::from_utf8(out).unwrap(), "Created agent, ID: asst_1\n");
}

#[tokio::test]
async fn missing_spec_stops_before_any_request() {
    let server = MockServer::start().await;

    let error = ComplianceAgent::load(
        fixture("isParagraphCompliant.json"),
        fixture("does_not_exist.json"),
    )
    .unwrap_err();

    match error.downcast_ref::<ToolSpecError>() {
        Some(ToolSpecError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

/// Stdout with the reading end of the pipe gone.
struct ClosedPipe;

impl std::io::Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn agent_is_deleted_when_output_is_closed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(route("assistants")))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_json("asst_1")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(route("assistants/asst_1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(deleted_json("asst_1", "assistant.deleted")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let error = load_agent()
        .run(&client_for(&server), &mut ClosedPipe)
        .await
        .unwrap_err();

    match error.downcast_ref::<std::io::Error>() {
        Some(error) => assert_eq!(error.kind(), std::io::ErrorKind::BrokenPipe),
        None => panic!("unexpected error {error:#}"),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(position(&requests, "POST", "assistants") < position(&requests, "DELETE", "assistants/asst_1"));
}
