use std::path::PathBuf;

use robot_rag::RagError;
use robot_rag::config::Config;
use robot_rag::test_utils::fixtures::UnitTestFixture;
use robot_rag::test_utils::{TestCase, run_table_tests};

const FULL_CONFIG: &str = r#"
policy_path = "/etc/robot-rag/policy.yaml"

[server]
bind = "0.0.0.0:9000"
media_base_url = "https://docs.example.com/media/"

[lexical]
url = "http://meili:7700"
api_key = "master"
index = "s50_elements"

[vector]
url = "http://qdrant:6333"
collection = "s50_elements"

[embedding]
url = "http://tei:8081/v1"
model = "BAAI/bge-base-en-v1.5"
image_url = "http://clip:8082/v1"

[rerank]
url = "http://tei-rerank:8083"

[answer]
enabled = true
model = "gpt-4o"
max_tokens = 600
"#;

#[test]
fn config_sections_from_toml() -> Result<(), String> {
    let cases = vec![
        TestCase::new(
            "empty file keeps defaults",
            "",
            (
                "127.0.0.1:8080".to_string(),
                "http://localhost:7700".to_string(),
                "robot_elements".to_string(),
                None,
                false,
                400u32,
            ),
        ),
        TestCase::new(
            "full file",
            FULL_CONFIG,
            (
                "0.0.0.0:9000".to_string(),
                "http://meili:7700".to_string(),
                "s50_elements".to_string(),
                Some("http://tei-rerank:8083".to_string()),
                true,
                600u32,
            ),
        ),
        TestCase::new(
            "partial section",
            "[lexical]\nindex = \"x\"\n",
            (
                "127.0.0.1:8080".to_string(),
                "http://localhost:7700".to_string(),
                "x".to_string(),
                None,
                false,
                400u32,
            ),
        ),
    ];

    run_table_tests(cases, |raw| {
        let config = Config::from_toml(raw).expect("parse config");
        (
            config.server.bind,
            config.lexical.url,
            config.lexical.index,
            config.rerank.url,
            config.answer.enabled,
            config.answer.max_tokens,
        )
    })
}

#[test]
fn explicit_file_is_loaded() {
    let fixture = UnitTestFixture::new();
    let path = fixture.create_file("conf/service.toml", FULL_CONFIG);

    let config = Config::load(Some(&path), &fixture.data_path).unwrap();

    assert_eq!(config.vector.collection, "s50_elements");
    assert_eq!(config.vector.text_vector, "text");
    assert_eq!(
        config.embedding.image_url.as_deref(),
        Some("http://clip:8082/v1")
    );
    assert_eq!(
        config.policy_path,
        Some(PathBuf::from("/etc/robot-rag/policy.yaml"))
    );
    assert_eq!(config.answer.context_results, 6);
}

#[test]
fn project_file_is_picked_up_from_the_working_directory() {
    let fixture = UnitTestFixture::new();
    let _ = fixture.create_config("[server]\nmedia_base_url = \"/static\"\n");

    let config = Config::load(None, &fixture.data_path).unwrap();

    assert_eq!(config.server.media_base_url, "/static");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let fixture = UnitTestFixture::new();
    let path = fixture.data_path.join("nope.toml");

    assert!(matches!(
        Config::load(Some(&path), &fixture.data_path),
        Err(RagError::MissingConfig(_))
    ));
}

#[test]
fn malformed_file_is_a_config_error() {
    let fixture = UnitTestFixture::new();
    let path = fixture.create_config("[server\nbind = 1");

    let err = Config::load(Some(&path), &fixture.data_path).unwrap_err();
    assert_eq!(err.code(), "config");
}
