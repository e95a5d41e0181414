//! Mock Provider Tests
//!
//! Tests using mockall for the Provider trait to verify
//! that the trait can be properly mocked and used.

use async_trait::async_trait;
use mockall::mock;
use parlance_provider::{
    CompletionRequest, CompletionResponse, Message, Provider, ProviderError,
};
use std::sync::Arc;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn test_mock_provider_complete_returns_success() {
    let mut mock = MockProvider::new();

    mock.expect_complete()
        .times(1)
        .returning(|_| Ok(CompletionResponse::text("Hello from mock!")));

    let response = mock
        .complete(CompletionRequest::new("m", "hi"))
        .await
        .unwrap();

    assert_eq!(response.text, "Hello from mock!");
}

#[tokio::test]
async fn test_mock_provider_complete_returns_error() {
    let mut mock = MockProvider::new();

    mock.expect_complete()
        .times(1)
        .returning(|_| Err(ProviderError::Api("quota exceeded".to_string())));

    match mock.complete(CompletionRequest::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "quota exceeded"),
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mock_provider_sees_history_and_prompt() {
    let mut mock = MockProvider::new();

    mock.expect_complete()
        .times(1)
        .withf(|request| {
            request.model == "gemini-1.5-pro"
                && request.history.len() == 2
                && request.prompt == "And Italy?"
        })
        .returning(|_| Ok(CompletionResponse::text("Rome.")));

    let request = CompletionRequest::new("gemini-1.5-pro", "And Italy?").with_history(vec![
        Message::user("Capital of France?"),
        Message::assistant("Paris."),
    ]);

    assert_eq!(mock.complete(request).await.unwrap().text, "Rome.");
}

#[tokio::test]
async fn test_mock_provider_multiple_calls() {
    let mut mock = MockProvider::new();

    mock.expect_complete()
        .times(3)
        .returning(|request| Ok(CompletionResponse::text(format!("Echo: {}", request.prompt))));

    for i in 0..3 {
        let response = mock
            .complete(CompletionRequest::new("m", format!("Message {}", i)))
            .await
            .unwrap();
        assert_eq!(response.text, format!("Echo: Message {}", i));
    }
}

#[tokio::test]
async fn test_arc_provider_delegates() {
    let mut mock = MockProvider::new();
    mock.expect_complete()
        .times(1)
        .returning(|_| Ok(CompletionResponse::text("via arc")));
    mock.expect_default_model()
        .returning(|| "mock-model".to_string());
    mock.expect_is_configured().returning(|| true);

    let shared = Arc::new(mock);
    assert_eq!(shared.default_model(), "mock-model");
    assert!(shared.is_configured());
    assert_eq!(
        shared
            .complete(CompletionRequest::default())
            .await
            .unwrap()
            .text,
        "via arc"
    );
}

#[test]
fn test_mock_provider_is_configured_false() {
    let mut mock = MockProvider::new();
    mock.expect_is_configured().times(1).returning(|| false);
    assert!(!mock.is_configured());
}
