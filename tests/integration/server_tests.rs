use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use robot_rag::answer::AnswerGenerator;
use robot_rag::app::AppContext;
use robot_rag::config::Config;
use robot_rag::search::RetrievalPolicy;
use robot_rag::server::router;
use robot_rag::test_utils::fakes::{FakeGenerator, FakeLexical, FakeVector};
use robot_rag::test_utils::fixtures::{element, figure};

use super::support::retriever;

async fn spawn(lexical: FakeLexical, vector: FakeVector) -> String {
    let policy = RetrievalPolicy::default();
    let retriever = retriever(&Arc::new(lexical), &Arc::new(vector), policy.clone());
    let generator: Arc<dyn AnswerGenerator> = Arc::new(FakeGenerator::new());
    let ctx = AppContext::new(Config::default(), policy, retriever, Some(generator));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(Arc::new(ctx))).await.unwrap();
    });
    format!("http://{addr}")
}

async fn healthy() -> String {
    spawn(
        FakeLexical::new(vec![
            element("e1", "D").robot_model("S50").text("Remove the four M3 screws.").build(),
            element("e2", "D").text("Torque to 0.6 Nm.").build(),
        ]),
        FakeVector::new(vec![figure("f1", "D").build()]),
    )
    .await
}

#[tokio::test]
async fn health_reports_ok() {
    let base = healthy().await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn search_returns_citations_and_figures_without_an_answer() {
    let base = healthy().await;
    let response = reqwest::get(format!("{base}/search?query=torque%20m3&robot_model=S50"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["robot_model"], "S50");
    assert_eq!(body["citations"][0]["citation_id"], "[1]");
    assert_eq!(body["citations"][0]["id"], "e1");
    assert_eq!(body["figures"][0]["media_url"], "/media/D/f1.png");
    assert!(body.get("answer").is_none());
    assert!(body["request_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn query_generates_an_answer() {
    let base = healthy().await;
    let response = reqwest::Client::new()
        .post(format!("{base}/query"))
        .json(&json!({"query": "torque m3", "robot_model": "S50", "audience_level": "operator"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["answer"]["status"]["kind"], "generated");
    assert_eq!(body["answer"]["text"], "Answer citing [1] [2]");
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let base = healthy().await;
    let client = reqwest::Client::new();

    let unknown_level = client
        .get(format!("{base}/search?query=estop&audience_level=admin"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_level.status(), StatusCode::BAD_REQUEST);
    let body: Value = unknown_level.json().await.unwrap();
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "invalid_query");

    let missing_query = client.get(format!("{base}/search")).send().await.unwrap();
    assert_eq!(missing_query.status(), StatusCode::BAD_REQUEST);

    let blank = client
        .post(format!("{base}/query"))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let malformed = client
        .post(format!("{base}/query"))
        .header("content-type", "application/json")
        .body("{\"query\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let body: Value = malformed.json().await.unwrap();
    assert_eq!(body["code"], "invalid_query");
}

#[tokio::test]
async fn total_outage_is_service_unavailable() {
    let base = spawn(
        FakeLexical::failing("connection refused"),
        FakeVector::failing("connection refused"),
    )
    .await;

    let response = reqwest::get(format!("{base}/search?query=estop")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "all_branches_unavailable");
    assert_eq!(
        body["message"],
        "search is unavailable: lexical and vector indexes both failed"
    );
}

#[tokio::test]
async fn partial_outage_is_still_ok() {
    let base = spawn(
        FakeLexical::failing("connection refused"),
        FakeVector::new(vec![element("e1", "D").build()]),
    )
    .await;

    let response = reqwest::get(format!("{base}/search?query=estop")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["degradations"][0]["branch"], "lexical");
    assert!(body["note"].as_str().unwrap().starts_with("degraded:"));
}
