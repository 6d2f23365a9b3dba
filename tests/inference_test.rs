use secours::constants;
use secours::{HuggingFaceClient, InferenceBackend, InferenceError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL_PATH: &str = "/models/microsoft/DialoGPT-medium";

fn client_for(server: &MockServer, timeout: Duration) -> HuggingFaceClient {
    HuggingFaceClient::new(format!("{}{}", server.uri(), MODEL_PATH), "hf_test", timeout).unwrap()
}

#[test_log::test(tokio::test)]
async fn test_sends_bearer_and_generation_parameters() {
    let server = MockServer::start().await;
    let prompt = constants::build_prompt("Il saigne du nez");

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("authorization", "Bearer hf_test"))
        .and(body_partial_json(json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 500,
                "do_sample": true,
                "return_full_text": false
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "generated_text": "Penchez la tête en avant." }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    let text = client.generate(&prompt).await.unwrap();
    assert_eq!(text, "Penchez la tête en avant.");
}

#[tokio::test]
async fn test_accepts_single_object_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "generated_text": "Restez calme." })))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    assert_eq!(client.generate("prompt").await.unwrap(), "Restez calme.");
}

#[tokio::test]
async fn test_error_field_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "rate limited" })))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    match client.generate("prompt").await {
        Err(InferenceError::Api(message)) => assert_eq!(message, "rate limited"),
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Model is loading"))
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5));
    match client.generate("prompt").await {
        Err(InferenceError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "Model is loading");
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_shape_and_invalid_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/shape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "summary_text": "?" }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let shape = HuggingFaceClient::new(format!("{}/shape", server.uri()), "k", Duration::from_secs(5)).unwrap();
    assert!(matches!(shape.generate("p").await, Err(InferenceError::Format(_))));

    let garbage = HuggingFaceClient::new(format!("{}/garbage", server.uri()), "k", Duration::from_secs(5)).unwrap();
    assert!(matches!(garbage.generate("p").await, Err(InferenceError::Format(_))));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "generated_text": "trop tard" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_millis(200));
    assert!(matches!(client.generate("prompt").await, Err(InferenceError::Timeout)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Nothing listens on port 9 locally
    let client = HuggingFaceClient::new("http://127.0.0.1:9/models/x", "k", Duration::from_secs(2)).unwrap();
    let err = client.generate("prompt").await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}
