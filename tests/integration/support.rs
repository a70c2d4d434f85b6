use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use robot_rag::core::{Candidate, QueryContext};
use robot_rag::search::{FixedClock, RetrievalPolicy, Retriever};
use robot_rag::test_utils::fakes::{FakeEmbedder, FakeLexical, FakeVector};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Retriever over the given fakes with a text embedder and a fixed clock.
pub fn retriever(
    lexical: &Arc<FakeLexical>,
    vector: &Arc<FakeVector>,
    policy: RetrievalPolicy,
) -> Retriever {
    Retriever::new(
        lexical.clone(),
        vector.clone(),
        Arc::new(FakeEmbedder::new()),
        policy,
    )
    .with_clock(Arc::new(FixedClock(now())))
}

pub fn s50(query: &str) -> QueryContext {
    QueryContext::new(query)
        .unwrap()
        .with_robot_model(Some("S50"))
}

pub fn ids(candidates: &[Candidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.id().as_str()).collect()
}
