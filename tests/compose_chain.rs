use chrono::{TimeZone, Utc};
use doc_sync_core::compose::{
    build_prompt, format_document, Attempt, ComposerChain, DocMeta, FlowiseBackend, OpenAiBackend,
};
use doc_sync_core::config::{ComposerConfig, FlowiseConfig, OpenAiConfig};
use doc_sync_core::contract::{ComposerBackend, DocComposer, MockComposerBackend};
use doc_sync_core::detect::ChangeSummary;
use doc_sync_core::error::ComposeError;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn meta() -> DocMeta {
    DocMeta {
        sha: "abc1234def5678".to_string(),
        repo_full_name: "acme/shop".to_string(),
    }
}

fn summary() -> ChangeSummary {
    ChangeSummary {
        functions_added: vec!["loadUser".to_string()],
        apis_changed: vec!["router.get /api/users".to_string()],
        modules_affected: vec!["routes/users.js".to_string()],
        ..Default::default()
    }
}

fn backend(name: &'static str, attempt: Result<Attempt, &'static str>, times: usize) -> MockComposerBackend {
    let mut mock = MockComposerBackend::new();
    mock.expect_name().return_const(name);
    mock.expect_generate().times(times).returning(move |_| match &attempt {
        Ok(a) => Ok(a.clone()),
        Err(msg) => Err(ComposeError::Backend {
            backend: name,
            message: msg.to_string(),
        }),
    });
    mock
}

#[test]
fn test_prompt_embeds_summary_as_json() {
    let prompt = build_prompt(&summary(), &[]).expect("prompt should build");
    assert!(prompt.starts_with("You are an expert code documentation generator."));
    assert!(prompt.contains("\"semantic\""));
    assert!(prompt.contains("router.get /api/users"));
    assert!(prompt.contains("\"functionsAdded\""));
}

#[test]
fn test_format_document_layout() {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let doc = format_document("\n\n## Changes\nAdded loadUser.\n", &meta(), ts);

    assert_eq!(doc.title, "Documentation for acme/shop @ abc1234");
    assert!(doc.body.starts_with("# Documentation for acme/shop @ abc1234\n"));
    assert!(doc.body.contains("`abc1234def5678`"));
    assert!(doc.body.contains("2024-05-01T12:00:00Z"));
    assert!(doc.body.ends_with("## Changes\nAdded loadUser.\n"));
    assert_eq!(doc.short_sha(), "abc1234");
}

#[tokio::test]
async fn test_chain_skips_unavailable_backends_in_order() {
    let chain = ComposerChain::new(vec![
        Box::new(backend("first", Ok(Attempt::Unavailable), 1)),
        Box::new(backend("second", Ok(Attempt::Content("generated".into())), 1)),
        Box::new(backend("third", Ok(Attempt::Content("never".into())), 0)),
    ]);

    let doc = chain
        .compose(&summary(), &[], &meta())
        .await
        .expect("second backend should produce the document");
    assert!(doc.body.ends_with("generated\n"));
}

#[tokio::test]
async fn test_chain_does_not_fall_back_after_backend_error() {
    let chain = ComposerChain::new(vec![
        Box::new(backend("primary", Err("boom"), 1)),
        Box::new(backend("secondary", Ok(Attempt::Content("fallback".into())), 0)),
    ]);

    let err = chain.compose(&summary(), &[], &meta()).await.unwrap_err();
    assert!(matches!(err, ComposeError::Backend { backend: "primary", .. }), "got {err:?}");
}

#[tokio::test]
async fn test_chain_without_configuration_is_unavailable() {
    let chain = ComposerChain::from_config(&ComposerConfig::default());
    let err = chain.compose(&summary(), &[], &meta()).await.unwrap_err();
    assert!(matches!(err, ComposeError::Unavailable), "got {err:?}");
}

#[tokio::test]
async fn test_openai_backend_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4.1", "max_tokens": 2000})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "## Docs"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&OpenAiConfig {
        api_key: Some("sk-test".into()),
        base_url: server.uri(),
        ..Default::default()
    });
    let attempt = backend.generate("prompt").await.expect("request should succeed");
    assert_eq!(attempt, Attempt::Content("## Docs".into()));
}

#[tokio::test]
async fn test_openai_backend_without_key_is_unavailable() {
    let backend = OpenAiBackend::new(&OpenAiConfig::default());
    assert_eq!(backend.generate("prompt").await.unwrap(), Attempt::Unavailable);
}

#[tokio::test]
async fn test_openai_backend_error_status_is_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let backend = OpenAiBackend::new(&OpenAiConfig {
        api_key: Some("sk-test".into()),
        base_url: server.uri(),
        ..Default::default()
    });
    let err = backend.generate("prompt").await.unwrap_err();
    match err {
        ComposeError::Backend { backend, message } => {
            assert_eq!(backend, "openai");
            assert!(message.contains("429") && message.contains("slow down"), "{message}");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_flowise_backend_field_precedence_table_driven() {
    struct Case {
        name: &'static str,
        body: serde_json::Value,
        expected: Option<&'static str>,
    }
    let cases = vec![
        Case { name: "output wins", body: serde_json::json!({"output": "o", "result": "r", "text": "t"}), expected: Some("o") },
        Case { name: "empty output skipped", body: serde_json::json!({"output": "", "result": "r"}), expected: Some("r") },
        Case { name: "text only", body: serde_json::json!({"text": "t"}), expected: Some("t") },
        Case { name: "no content field", body: serde_json::json!({"answer": "a"}), expected: None },
    ];

    for case in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/prediction/flow"))
            .and(body_partial_json(serde_json::json!({"input": "prompt"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(case.body.clone()))
            .mount(&server)
            .await;

        let backend = FlowiseBackend::new(&FlowiseConfig {
            url: Some(format!("{}/api/v1/prediction/flow", server.uri())),
        });
        let result = backend.generate("prompt").await;
        match case.expected {
            Some(text) => assert_eq!(result.unwrap(), Attempt::Content(text.into()), "{}", case.name),
            None => assert!(matches!(result, Err(ComposeError::Backend { .. })), "{}", case.name),
        }
    }
}

#[tokio::test]
async fn test_openai_configured_means_flowise_never_called() {
    let openai = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&openai)
        .await;
    let flowise = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "t"})))
        .expect(0)
        .mount(&flowise)
        .await;

    let chain = ComposerChain::from_config(&ComposerConfig {
        openai: OpenAiConfig {
            api_key: Some("sk-test".into()),
            base_url: openai.uri(),
            ..Default::default()
        },
        flowise: FlowiseConfig { url: Some(flowise.uri()) },
    });

    let err = chain.compose(&summary(), &[], &meta()).await.unwrap_err();
    assert!(matches!(err, ComposeError::Backend { backend: "openai", .. }), "got {err:?}");
}
