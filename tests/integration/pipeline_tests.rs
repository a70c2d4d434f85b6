use std::sync::Arc;
use std::time::Duration;

use tracing::Level;

use robot_rag::adapters::VectorSpace;
use robot_rag::assert_log_contains;
use robot_rag::core::{AudienceLevel, Degradation, QueryContext, ResultStatus};
use robot_rag::search::RetrievalPolicy;
use robot_rag::test_utils::fakes::{
    Behavior, FakeEmbedder, FakeLexical, FakeReranker, FakeVector,
};
use robot_rag::test_utils::fixtures::{element, figure};
use robot_rag::test_utils::logging::capture_logs;

use super::support::{ids, retriever, s50};

fn s50_text(id: &str, doc: &str) -> robot_rag::core::Element {
    element(id, doc).robot_model("S50").build()
}

#[tokio::test]
async fn torque_query_ranks_two_list_hits_first() {
    let lexical = Arc::new(FakeLexical::new(vec![
        s50_text("E1", "D1"),
        s50_text("E3", "D3"),
        s50_text("E5", "D5"),
    ]));
    let vector = Arc::new(FakeVector::new(vec![
        s50_text("E3", "D3"),
        s50_text("E1", "D1"),
        s50_text("E7", "D7"),
    ]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("torque m3 screw"))
        .await;

    assert_eq!(result.status, ResultStatus::Complete);
    assert!(!result.reranked);
    // E1 and E3 both score 1/61 + 1/62; the id breaks the tie.
    assert_eq!(ids(&result.text), ["E1", "E3", "E5", "E7"]);
    assert!((result.text[0].fused_score - result.text[1].fused_score).abs() < 1e-12);
    assert!(result.text[1].fused_score > result.text[2].fused_score);
    assert_eq!(result.text[0].lexical_rank, Some(1));
    assert_eq!(result.text[0].vector_rank, Some(2));
    assert_eq!(result.fused_total, 4);
}

#[tokio::test]
async fn lexical_outage_falls_back_to_vector_order() {
    let lexical = Arc::new(FakeLexical::failing("connection refused"));
    let vector = Arc::new(FakeVector::new(vec![
        s50_text("e1", "d"),
        s50_text("e2", "d"),
        s50_text("e3", "d"),
    ]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("reset e-stop"))
        .await;

    assert_eq!(result.status, ResultStatus::Degraded);
    assert_eq!(ids(&result.text), ["e1", "e2", "e3"]);
    assert_eq!(
        result.degradations,
        vec![Degradation::SearchUnavailable {
            branch: "lexical".into(),
            reason: "connection refused".into(),
        }]
    );
    assert!(result.status_note().unwrap().contains("lexical search unavailable"));
}

#[tokio::test]
async fn both_primary_branches_down_returns_nothing() {
    let lexical = Arc::new(FakeLexical::failing("503"));
    let vector = Arc::new(FakeVector::failing("collection missing"));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("reset e-stop"))
        .await;

    assert_eq!(result.status, ResultStatus::AllBranchesUnavailable);
    assert!(result.is_empty());
    assert_eq!(result.degradations.len(), 2);
}

#[tokio::test]
async fn embedding_failure_degrades_the_vector_branch() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("e1", "d")]));
    let vector = Arc::new(FakeVector::new(vec![s50_text("e2", "d")]));
    let retriever = robot_rag::search::Retriever::new(
        lexical.clone(),
        vector.clone(),
        Arc::new(FakeEmbedder::failing("model loading")),
        RetrievalPolicy::default(),
    );

    let result = retriever.retrieve(&s50("battery swap")).await;

    assert_eq!(result.status, ResultStatus::Degraded);
    assert_eq!(ids(&result.text), ["e1"]);
    assert_eq!(
        result.degradations,
        vec![Degradation::SearchUnavailable {
            branch: "text_vector".into(),
            reason: "model loading".into(),
        }]
    );
    assert_eq!(vector.calls(VectorSpace::Text), 0);
}

#[tokio::test(start_paused = true)]
async fn stalled_branch_times_out_without_blocking_the_other() {
    let lexical = Arc::new(
        FakeLexical::new(vec![s50_text("slow", "d")])
            .with_behavior(Behavior::Stall(Duration::from_secs(30))),
    );
    let vector = Arc::new(FakeVector::new(vec![s50_text("fast", "d")]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(ids(&result.text), ["fast"]);
    assert_eq!(
        result.degradations,
        vec![Degradation::SearchUnavailable {
            branch: "lexical".into(),
            reason: "timed out after 3000ms".into(),
        }]
    );
}

#[tokio::test]
async fn reranker_scores_decide_the_final_order() {
    let lexical = Arc::new(FakeLexical::new(vec![
        s50_text("a", "d"),
        s50_text("b", "d"),
        s50_text("c", "d"),
    ]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let reranker = Arc::new(FakeReranker::new(&[("a", 0.1), ("b", 0.2), ("c", 0.9)]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .with_reranker(reranker.clone())
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(result.status, ResultStatus::Complete);
    assert!(result.reranked);
    assert_eq!(ids(&result.text), ["c", "b", "a"]);
    assert_eq!(result.text[0].rerank_score, Some(0.9));
    let seen: Vec<String> = reranker.seen().iter().map(|i| i.id.to_string()).collect();
    assert_eq!(seen, ["a", "b", "c"]);
    assert_eq!(reranker.seen()[0].text, "content of a");
}

#[tokio::test]
async fn only_the_top_n_are_reranked() {
    let lexical = Arc::new(FakeLexical::new(vec![
        s50_text("a", "d"),
        s50_text("b", "d"),
        s50_text("c", "d"),
        s50_text("d", "d"),
    ]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let reranker = Arc::new(FakeReranker::new(&[("a", 0.1), ("b", 0.8), ("d", 1.0)]));
    let mut policy = RetrievalPolicy::default();
    policy.rerank.top_n = 2;

    let result = retriever(&lexical, &vector, policy)
        .with_reranker(reranker.clone())
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(reranker.seen().len(), 2);
    // "d" is outside the reranked head and keeps its boosted position.
    assert_eq!(ids(&result.text), ["b", "a", "c", "d"]);
    assert_eq!(result.text[3].rerank_score, None);
}

#[tokio::test]
async fn rerank_failure_keeps_boosted_order() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("a", "d"), s50_text("b", "d")]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let reranker = Arc::new(
        FakeReranker::new(&[("b", 1.0)]).with_behavior(Behavior::Fail("model offline".into())),
    );

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .with_reranker(reranker)
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(result.status, ResultStatus::Degraded);
    assert!(!result.reranked);
    assert_eq!(ids(&result.text), ["a", "b"]);
    assert_eq!(
        result.degradations,
        vec![Degradation::RerankSkipped {
            reason: "model offline".into()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn slow_reranker_is_skipped_after_its_timeout() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("a", "d"), s50_text("b", "d")]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let reranker = Arc::new(
        FakeReranker::new(&[("b", 1.0)]).with_behavior(Behavior::Stall(Duration::from_secs(60))),
    );
    let mut policy = RetrievalPolicy::default();
    policy.timeouts.rerank = Duration::from_millis(750);

    let result = retriever(&lexical, &vector, policy)
        .with_reranker(reranker)
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(ids(&result.text), ["a", "b"]);
    assert_eq!(
        result.degradations,
        vec![Degradation::RerankSkipped {
            reason: "timed out after 750ms".into()
        }]
    );
}

#[tokio::test]
async fn disabled_rerank_is_not_a_degradation() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("a", "d"), s50_text("b", "d")]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let reranker = Arc::new(FakeReranker::new(&[("b", 1.0)]));
    let mut policy = RetrievalPolicy::default();
    policy.rerank.enabled = false;

    let result = retriever(&lexical, &vector, policy)
        .with_reranker(reranker.clone())
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(result.status, ResultStatus::Complete);
    assert!(!result.reranked);
    assert!(reranker.seen().is_empty());
    assert_eq!(ids(&result.text), ["a", "b"]);
}

#[tokio::test]
async fn figures_ride_along_with_their_documents() {
    let lexical = Arc::new(FakeLexical::new(vec![
        s50_text("E1", "D"),
        s50_text("E2", "Q"),
        s50_text("E3", "Q"),
    ]));
    let vector = Arc::new(FakeVector::new(vec![
        s50_text("E2", "Q"),
        s50_text("E3", "Q"),
        figure("FQ", "Q").robot_model("S50").build(),
        figure("FD", "D").robot_model("S50").build(),
    ]));
    let reranker = Arc::new(FakeReranker::new(&[("E1", 5.0), ("E2", 1.0), ("E3", 0.5)]));
    let mut policy = RetrievalPolicy::default();
    policy.result.final_k = 1;

    let result = retriever(&lexical, &vector, policy)
        .with_reranker(reranker.clone())
        .retrieve(&s50("torque m3 screw"))
        .await;

    assert_eq!(ids(&result.text), ["E1"]);
    // FD ranked last overall yet rides along with E1; FQ's document was cut.
    assert_eq!(ids(&result.figures), ["FD"]);
    assert!(reranker.seen().iter().all(|input| !input.id.as_str().starts_with('F')));
}

#[tokio::test]
async fn identical_figure_images_are_reported_once() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("E1", "D")]));
    let vector = Arc::new(FakeVector::new(vec![
        figure("F1", "D").sha256("abc").build(),
        figure("F2", "D").sha256("abc").build(),
        figure("F3", "D").sha256("def").build(),
    ]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("wiring"))
        .await;

    assert_eq!(ids(&result.figures), ["F1", "F3"]);
}

#[tokio::test]
async fn only_figures_matching_means_no_evidence() {
    let lexical = Arc::new(FakeLexical::new(Vec::new()));
    let vector = Arc::new(FakeVector::new(vec![figure("F1", "D").build()]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("wiring"))
        .await;

    assert_eq!(result.status, ResultStatus::NoEvidence);
    assert!(result.is_empty());
}

#[tokio::test]
async fn empty_result_after_an_outage_still_reports_the_outage() {
    let lexical = Arc::new(FakeLexical::failing("connection refused"));
    let vector = Arc::new(FakeVector::new(vec![
        element("other-robot", "d").robot_model("S40").build(),
    ]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("arm calibration"))
        .await;

    assert_eq!(result.status, ResultStatus::NoEvidence);
    assert!(result.is_empty());
    assert!(result.is_degraded());
    let note = result.status_note().expect("note");
    assert!(note.starts_with("no documents matched the query and filters"));
    assert!(note.contains("lexical search unavailable (connection refused)"));
}

#[tokio::test]
async fn hits_outside_the_filters_are_dropped_and_logged() {
    let capture = capture_logs("robot_rag=debug");
    let lexical = Arc::new(
        FakeLexical::new(vec![
            element("tech-only", "d").technician().build(),
            element("other-robot", "d").robot_model("X9").build(),
            s50_text("ok", "d"),
            element("generic", "d").build(),
        ])
        .ignoring_filters(),
    );
    let vector = Arc::new(FakeVector::new(Vec::new()));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(ids(&result.text), ["ok", "generic"]);
    let entry = capture
        .find(Level::WARN, "adapter returned hits outside the filters")
        .expect("filter warning");
    assert_eq!(entry.field("dropped"), Some("2"));
}

#[tokio::test]
async fn technician_queries_also_see_operator_material() {
    let lexical = Arc::new(FakeLexical::new(vec![
        element("tech", "d").technician().build(),
        element("op", "d").build(),
    ]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let query = QueryContext::parse("calibrate joint", Some("technician"), None).unwrap();

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&query)
        .await;

    assert_eq!(ids(&result.text), ["tech", "op"]);
    let filters = lexical.last_filters().unwrap();
    assert_eq!(
        filters.audience_levels(),
        [AudienceLevel::Technician, AudienceLevel::Operator]
    );
    assert_eq!(filters.robot_model, "generic");
}

#[tokio::test]
async fn operator_queries_never_see_technician_material() {
    let lexical = Arc::new(FakeLexical::new(vec![
        element("tech", "d").technician().build(),
        element("op", "d").build(),
    ]));
    let vector = Arc::new(FakeVector::new(Vec::new()));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&QueryContext::new("calibrate joint").unwrap())
        .await;

    assert_eq!(ids(&result.text), ["op"]);
    assert_eq!(result.filters.audience_level, AudienceLevel::Operator);
}

#[tokio::test]
async fn image_branch_runs_only_for_visual_queries() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("E1", "D")]));
    let vector = Arc::new(
        FakeVector::new(vec![s50_text("E1", "D")])
            .with_image(vec![figure("F1", "D").robot_model("S50").build()]),
    );
    let retriever = retriever(&lexical, &vector, RetrievalPolicy::default())
        .with_image_embedder(Arc::new(FakeEmbedder::new()));

    let result = retriever.retrieve(&s50("reset e-stop")).await;
    assert_eq!(vector.calls(VectorSpace::Image), 0);
    assert!(result.figures.is_empty());

    let result = retriever.retrieve(&s50("controller Wiring Diagram")).await;
    assert_eq!(vector.calls(VectorSpace::Image), 1);
    assert_eq!(ids(&result.figures), ["F1"]);
    assert_eq!(result.figures[0].image_vector_rank, Some(1));
}

#[tokio::test]
async fn image_branch_needs_an_image_embedder() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("E1", "D")]));
    let vector = Arc::new(FakeVector::new(Vec::new()).with_image(vec![figure("F1", "D").build()]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("wiring diagram"))
        .await;

    assert_eq!(vector.calls(VectorSpace::Image), 0);
    assert_eq!(result.status, ResultStatus::Complete);
}

#[tokio::test]
async fn image_branch_failure_only_degrades() {
    let lexical = Arc::new(FakeLexical::new(vec![s50_text("E1", "D")]));
    let vector = Arc::new(
        FakeVector::new(vec![s50_text("E1", "D")])
            .with_image_behavior(Behavior::Fail("no image vectors".into())),
    );

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .with_image_embedder(Arc::new(FakeEmbedder::new()))
        .retrieve(&s50("port layout"))
        .await;

    assert_eq!(result.status, ResultStatus::Degraded);
    assert_eq!(ids(&result.text), ["E1"]);
    assert_eq!(
        result.degradations,
        vec![Degradation::SearchUnavailable {
            branch: "image_vector".into(),
            reason: "no image vectors".into(),
        }]
    );
}

#[tokio::test]
async fn superseded_documents_are_suppressed() {
    let lexical = Arc::new(FakeLexical::new(vec![
        s50_text("old", "manual-2019"),
        element("new", "manual-2024")
            .robot_model("S50")
            .replaces("manual-2019")
            .build(),
    ]));
    let vector = Arc::new(FakeVector::new(Vec::new()));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;
    assert_eq!(ids(&result.text), ["new"]);

    let mut policy = RetrievalPolicy::default();
    policy.result.suppress_superseded = false;
    let result = retriever(&lexical, &vector, policy)
        .retrieve(&s50("battery swap"))
        .await;
    assert_eq!(ids(&result.text), ["old", "new"]);
}

#[tokio::test]
async fn high_priority_and_recent_material_move_up() {
    let lexical = Arc::new(FakeLexical::new(vec![
        s50_text("plain", "d"),
        element("safety", "d").robot_model("S50").high_priority().build(),
    ]));
    let vector = Arc::new(FakeVector::new(Vec::new()));
    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;
    assert_eq!(ids(&result.text), ["safety", "plain"]);
    assert!((result.text[0].priority_boost - 0.15).abs() < 1e-12);

    let lexical = Arc::new(FakeLexical::new(vec![
        element("dated", "d").robot_model("S50").effective(2012, 1, 1).build(),
        element("fresh", "d").robot_model("S50").effective(2025, 5, 20).build(),
    ]));
    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;
    assert_eq!(ids(&result.text), ["fresh", "dated"]);
    assert!(result.text[0].recency_boost > 0.09);
    assert!(result.text[1].recency_boost < 0.001);
}

#[tokio::test]
async fn final_k_bounds_the_text_results() {
    let elements = (0..20)
        .map(|i| s50_text(&format!("e{i:02}"), "d"))
        .collect();
    let lexical = Arc::new(FakeLexical::new(elements));
    let vector = Arc::new(FakeVector::new(Vec::new()));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;

    assert_eq!(result.text.len(), 8);
    assert_eq!(result.fused_total, 20);
    assert_eq!(result.text[0].id().as_str(), "e00");
}

#[tokio::test]
async fn branch_outage_is_logged_with_its_branch() {
    let capture = capture_logs("robot_rag=debug");
    let lexical = Arc::new(FakeLexical::failing("connection refused"));
    let vector = Arc::new(FakeVector::new(vec![s50_text("e1", "d")]));

    let result = retriever(&lexical, &vector, RetrievalPolicy::default())
        .retrieve(&s50("battery swap"))
        .await;

    assert!(result.is_degraded());
    assert_log_contains!(capture, Level::WARN, "search branch unavailable");
    let entry = capture.find(Level::WARN, "search branch unavailable").unwrap();
    assert_eq!(entry.field("branch"), Some("lexical"));
    assert!(capture.contains(Level::INFO, "retrieval complete"));
}
