use httpmock::prelude::*;
use sequential_planner::adapters::{AzureChatCompletion, AzureTextCompletion, AzureTextEmbedding};
use sequential_planner::domain::ports::{
    ChatCompletion, ChatMessage, CompletionSettings, TextCompletion, TextEmbedding,
};
use sequential_planner::utils::error::ErrorSeverity;
use sequential_planner::PlannerError;
use serde_json::json;
use tokio_test::assert_err;

#[tokio::test]
async fn test_chat_completion_request_shape() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/openai/deployments/gpt-35-turbo/chat/completions")
                .query_param("api-version", "2023-05-15")
                .header("api-key", "secret")
                .json_body_partial(
                    r#"{"messages": [{"role": "system", "content": "Be brief."}, {"role": "user", "content": "Hi"}], "max_tokens": 64, "stop": ["<!-- END -->"]}"#,
                );
            then.status(200).json_body(json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello!"}}]
            }));
        })
        .await;

    let chat = AzureChatCompletion::new("gpt-35-turbo", &server.base_url(), "secret");
    let settings = CompletionSettings {
        max_tokens: 64,
        stop_sequences: vec!["<!-- END -->".to_string()],
        ..CompletionSettings::default()
    };
    let reply = chat
        .complete_chat(
            &[ChatMessage::system("Be brief."), ChatMessage::user("Hi")],
            &settings,
        )
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "Hello!");
}

#[tokio::test]
async fn test_text_completion_endpoint() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/openai/deployments/davinci/completions")
                .json_body_partial(r#"{"prompt": "Say hi"}"#);
            then.status(200).json_body(json!({"choices": [{"text": " hi", "index": 0}]}));
        })
        .await;

    let text = AzureTextCompletion::new("davinci", &server.base_url(), "secret");
    let reply = text
        .complete("Say hi", &CompletionSettings::default())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply, " hi");
}

#[tokio::test]
async fn test_unauthorized_maps_to_service_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(401).json_body(json!({
                "error": {"code": "401", "message": "Access denied due to invalid subscription key."}
            }));
        })
        .await;

    let chat = AzureChatCompletion::new("gpt-35-turbo", &server.base_url(), "wrong");
    let err = assert_err!(chat.complete("hi", &CompletionSettings::default()).await);

    match &err {
        PlannerError::ServiceError { status, message } => {
            assert_eq!(*status, 401);
            assert!(message.contains("invalid subscription key"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!err.is_retryable());
    assert_eq!(err.severity(), ErrorSeverity::High);
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({"choices": []}));
        })
        .await;

    let chat = AzureChatCompletion::new("gpt-35-turbo", &server.base_url(), "secret");
    assert!(chat.complete("hi", &CompletionSettings::default()).await.is_err());
}

#[tokio::test]
async fn test_embeddings_ordered_by_index() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/openai/deployments/text-embedding-ada-002/embeddings")
                .json_body_partial(r#"{"input": ["first", "second"]}"#);
            then.status(200).json_body(json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]}
                ]
            }));
        })
        .await;

    let embedding = AzureTextEmbedding::new("text-embedding-ada-002", &server.base_url(), "secret");
    let vectors = embedding
        .generate_embeddings(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_embedding_count_mismatch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(json!({"data": [{"index": 0, "embedding": [1.0]}]}));
        })
        .await;

    let embedding = AzureTextEmbedding::new("text-embedding-ada-002", &server.base_url(), "secret");
    let result = embedding
        .generate_embeddings(&["a".to_string(), "b".to_string()])
        .await;
    assert!(result.is_err());
}
