//! Scenario stream end-to-end tests using wiremock.
//!
//! These drive the real reqwest client against a mock SSE backend and
//! verify classification, session state, history propagation, and the
//! save request.

use std::time::Duration;

use futures_util::StreamExt;
use lifeboat::client::{ClientError, ScenarioClient};
use lifeboat::config::ClientConfig;
use lifeboat::models::{ReportSummary, ScenarioMeta, ScenarioRequest};
use lifeboat::runner::SessionRunner;
use lifeboat::sse::{Choice, StreamEvent};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_report() -> ReportSummary {
    ReportSummary::from_report_content("small craft taking on water near the breakwater", 35.1, 129.0, 2)
}

fn test_scenario() -> ScenarioMeta {
    ScenarioMeta {
        title: "harbor drill".to_string(),
        description: "storm approach".to_string(),
        start_date: "2026-08-27".to_string(),
    }
}

fn test_request() -> ScenarioRequest {
    ScenarioRequest {
        report: test_report(),
        scenario: test_scenario(),
        history: Vec::new(),
    }
}

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

async fn mount_stream(server: &MockServer, body: &str) {
    Mock::given(method("POST"))
        .and(path("/api/query/stream"))
        .respond_with(sse_response(body))
        .mount(server)
        .await;
}

/// Minimal hand-rolled SSE server for transport-level cases wiremock
/// cannot express: exact chunk boundaries and idle connections. Serves
/// one connection, writes `parts` with a pause between them, then holds
/// the socket open for `hold_open` before closing.
async fn spawn_raw_sse_server(parts: Vec<Vec<u8>>, pause: Duration, hold_open: Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();
        for part in parts {
            socket.write_all(&part).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(pause).await;
        }
        tokio::time::sleep(hold_open).await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_stream_classifies_mixed_page() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        concat!(
            "data: {\"type\":\"situation\",\"content\":\"Waves crash \"}\n\n",
            "data: {\"type\":\"situation\",\"content\":\"over the bow.\"}\n\n",
            "event: choice_0\n",
            "data: drop anchor\n\n",
            "event: choice_1\n",
            "data: {\"content\":\"run for harbor\"}\n\n",
        ),
    )
    .await;

    let client = ScenarioClient::with_base_url(server.uri());
    let events: Vec<StreamEvent> = client
        .stream_scenario(&test_request())
        .await
        .expect("stream opens")
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Situation {
                text: "Waves crash ".to_string()
            },
            StreamEvent::Situation {
                text: "over the bow.".to_string()
            },
            StreamEvent::ChoiceFragment {
                choices: vec![Choice::new("choice_0", "drop anchor")],
            },
            StreamEvent::ChoiceFragment {
                choices: vec![Choice::new("choice_1", "run for harbor")],
            },
            // Synthesized at natural end of input
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_done_sentinel_mid_stream() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        "data: {\"content\":\"Calm again.\"}\n\ndata: [DONE]\n\n",
    )
    .await;

    let client = ScenarioClient::with_base_url(server.uri());
    let events: Vec<StreamEvent> = client
        .stream_scenario(&test_request())
        .await
        .unwrap()
        .collect()
        .await;

    // Explicit sentinel plus the synthesized end-of-input Done
    assert_eq!(
        events,
        vec![
            StreamEvent::Situation {
                text: "Calm again.".to_string()
            },
            StreamEvent::Done,
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_malformed_json_falls_back_to_raw_text() {
    let server = MockServer::start().await;
    mount_stream(&server, "data: not json at all\n\n").await;

    let client = ScenarioClient::with_base_url(server.uri());
    let events: Vec<StreamEvent> = client
        .stream_scenario(&test_request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Situation {
                text: "not json at all".to_string()
            },
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_multibyte_char_split_across_transport_chunks() {
    let payload = "data: {\"type\":\"situation\",\"content\":\"파도\"}\n\n".as_bytes();
    // Split inside the first byte of 파
    let split = "data: {\"type\":\"situation\",\"content\":\"".len() + 1;
    let parts = vec![payload[..split].to_vec(), payload[split..].to_vec()];
    let base_url = spawn_raw_sse_server(parts, Duration::from_millis(100), Duration::ZERO).await;

    let client = ScenarioClient::with_base_url(base_url);
    let events: Vec<StreamEvent> = client
        .stream_scenario(&test_request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Situation {
                text: "파도".to_string()
            },
            StreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_idle_timeout_surfaces_as_error() {
    let body = b"data: {\"content\":\"Still afloat.\"}\n\n".to_vec();
    // One frame, then the connection goes quiet well past the timeout
    let base_url = spawn_raw_sse_server(vec![body], Duration::ZERO, Duration::from_secs(10)).await;

    let config = ClientConfig::default()
        .with_base_url(base_url)
        .with_idle_timeout_secs(1);
    let client = ScenarioClient::new(&config);
    let events: Vec<StreamEvent> = client
        .stream_scenario(&test_request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        StreamEvent::Situation {
            text: "Still afloat.".to_string()
        }
    );
    match &events[1] {
        StreamEvent::Error { message } => assert!(message.contains("no data received")),
        other => panic!("expected timeout error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_2xx_surfaces_as_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/stream"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = ScenarioClient::with_base_url(server.uri());
    let result = client.stream_scenario(&test_request()).await;

    match result {
        Err(ClientError::Server { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected server error, got {:?}", other.map(|_| "stream")),
    }
}

#[tokio::test]
async fn test_runner_streams_page_and_carries_history() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        concat!(
            "data: {\"type\":\"situation\",\"content\":\"Engine stalls.\"}\n\n",
            "data: {\"type\":\"choice\",\"choices\":[\"restart\",\"signal\"]}\n\n",
        ),
    )
    .await;

    let config = ClientConfig::default().with_base_url(server.uri());
    let mut runner = SessionRunner::new(&config, test_report(), test_scenario());

    assert!(runner.start().await.is_none());
    {
        let page = runner.session().current_page();
        assert_eq!(page.situation, "Engine stalls.");
        assert_eq!(
            page.choices,
            vec![Choice::new("0", "restart"), Choice::new("1", "signal")]
        );
        assert!(!runner.session().is_streaming());
    }

    // Commit the first choice; the follow-up request must carry the
    // conversation history
    let choice = runner.session().current_page().choices[0].clone();
    assert!(runner.choose(choice).await.is_none());

    assert_eq!(runner.session().pages().len(), 2);
    assert_eq!(runner.session().current_page().situation, "Engine stalls.");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["history"].as_array().unwrap().len(), 1);
    assert_eq!(second["history"][0]["situation"], "Engine stalls.");
    assert_eq!(second["history"][0]["choice"], "restart");
}

#[tokio::test]
async fn test_feedback_and_survival_rate_attach_across_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/stream"))
        .respond_with(sse_response(
            "data: {\"type\":\"situation\",\"content\":\"First leg.\"}\n\n",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_stream(
        &server,
        concat!(
            "data: {\"type\":\"feedback\",\"evaluation\":\"sound\",\"comment\":\"kept calm\"}\n\n",
            "data: {\"survival_rate\": 68, \"change\": \"-7%\"}\n\n",
            "data: {\"type\":\"situation\",\"content\":\"Next leg.\"}\n\n",
        ),
    )
    .await;

    let config = ClientConfig::default().with_base_url(server.uri());
    let mut runner = SessionRunner::new(&config, test_report(), test_scenario());

    runner.start().await;
    let choice = Choice::new("manual", "head for open water");
    runner.choose(choice).await;

    let session = runner.session();
    assert_eq!(session.pages().len(), 2);
    // Feedback delivered during page 1's stream lands on page 0
    let feedback = session.pages()[0].feedback.as_ref().expect("attached");
    assert_eq!(feedback.comment, "kept calm");
    assert_eq!(session.survival_rate().unwrap().rate, 68.0);
    assert_eq!(session.survival_rate().unwrap().change, "-7%");
}

#[tokio::test]
async fn test_runner_auto_completes_at_feedback_goal() {
    let server = MockServer::start().await;
    // First request streams the opening page; the follow-up after the
    // committed choice delivers the feedback that meets the goal
    Mock::given(method("POST"))
        .and(path("/api/query/stream"))
        .respond_with(sse_response(concat!(
            "data: {\"type\":\"situation\",\"content\":\"Drifting.\"}\n\n",
            "data: {\"type\":\"choice\",\"choices\":[\"hold course\"]}\n\n",
        )))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // The survival rate trails the goal-reaching feedback; completion
    // must still pick it up
    mount_stream(
        &server,
        concat!(
            "data: {\"type\":\"situation\",\"content\":\"Aftermath.\"}\n\n",
            "data: {\"type\":\"feedback\",\"comment\":\"decisive\"}\n\n",
            "data: {\"survival_rate\": 55, \"change\": \"-3%\"}\n\n",
        ),
    )
    .await;

    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_feedback_goal(1);
    let mut runner = SessionRunner::new(&config, test_report(), test_scenario());

    assert!(runner.start().await.is_none());
    let summary = runner
        .choose(Choice::new("0", "hold course"))
        .await
        .expect("goal of one feedback reached");

    assert_eq!(summary.entries.len(), 1);
    assert_eq!(summary.entries[0].situation, "Drifting.");
    assert_eq!(summary.entries[0].choice, "hold course");
    assert_eq!(summary.entries[0].feedback.comment, "decisive");
    let rate = summary.survival_rate.as_ref().expect("rate after feedback kept");
    assert_eq!(rate.rate, 55.0);
    assert_eq!(rate.change, "-3%");
}

#[tokio::test]
async fn test_transport_error_before_stream() {
    let config = ClientConfig::default().with_base_url("http://127.0.0.1:1");
    let mut runner = SessionRunner::new(&config, test_report(), test_scenario());
    runner.start().await;

    assert!(!runner.session().is_streaming());
    assert!(runner.session().error().is_some());
    assert!(!runner.session().can_confirm());
    assert!(runner.confirm().is_none());
}

#[tokio::test]
async fn test_save_scenario_posts_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query/stream"))
        .respond_with(sse_response(
            "data: {\"type\":\"situation\",\"content\":\"Final stretch.\"}\n\n",
        ))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_stream(
        &server,
        concat!(
            "data: {\"type\":\"feedback\",\"comment\":\"textbook\"}\n\n",
            "data: {\"survival_rate\": 90}\n\n",
        ),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/scenario/save"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = ClientConfig::default()
        .with_base_url(server.uri())
        .with_feedback_goal(1);
    let mut runner = SessionRunner::new(&config, test_report(), test_scenario());
    runner.start().await;
    let summary = runner
        .choose(Choice::new("0", "beach the boat"))
        .await
        .expect("completes");

    runner.save(&summary).await.expect("save succeeds");

    let requests = server.received_requests().await.unwrap();
    let save = requests
        .iter()
        .find(|r| r.url.path() == "/api/scenario/save")
        .expect("save request sent");
    let body: serde_json::Value = serde_json::from_slice(&save.body).unwrap();
    assert_eq!(body["scenario"]["title"], "harbor drill");
    assert_eq!(body["history"][0]["choice"], "beach the boat");
    assert_eq!(body["history"][0]["comment"], "textbook");
    assert_eq!(body["history"][0]["survival_rate"], 90.0);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ScenarioClient::with_base_url(server.uri());
    assert!(client.health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_unhealthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = ScenarioClient::with_base_url(server.uri());
    assert!(!client.health_check().await.unwrap());
}
