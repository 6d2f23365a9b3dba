use async_trait::async_trait;
use secours::constants::{self, DEGRADED_PREFIX};
use secours::matcher::{CATEGORIES, GENERAL};
use secours::{
    EmergencyClassifier, InferenceBackend, InferenceError, ResponseResolver, ResponseSource, Settings,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Backend returning a fixed reply and counting calls.
struct ScriptedBackend {
    calls: AtomicUsize,
    reply: fn(&str) -> Result<String, InferenceError>,
}

impl ScriptedBackend {
    fn new(reply: fn(&str) -> Result<String, InferenceError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(prompt)
    }
}

struct PanickingBackend;

#[async_trait]
impl InferenceBackend for PanickingBackend {
    async fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
        panic!("backend exploded");
    }
}

struct AlwaysEmergency;

impl EmergencyClassifier for AlwaysEmergency {
    fn is_emergency(&self, _text: &str) -> bool {
        true
    }
}

fn resolver_with(backend: Arc<ScriptedBackend>) -> ResponseResolver {
    ResponseResolver::new(Some(backend as Arc<dyn InferenceBackend>))
}

#[tokio::test]
async fn test_choking_round_trip_without_remote() {
    let resolver = ResponseResolver::local_only();
    let response = resolver.resolve("Une personne s'étouffe").await;
    assert_eq!(response.text, CATEGORIES[0].advisory);
    assert_eq!(response.source, ResponseSource::Local);
    assert!(response.is_emergency);
}

#[tokio::test]
async fn test_remote_answer_is_classified() {
    let backend = ScriptedBackend::new(|_| Ok("Appelez les pompiers immédiatement.".to_string()));
    let resolver = resolver_with(backend.clone());

    let response = resolver.resolve("Il ne respire plus").await;
    assert_eq!(response.source, ResponseSource::Remote);
    assert_eq!(response.text, "Appelez les pompiers immédiatement.");
    assert!(response.is_emergency);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_remote_answer_without_trigger_is_not_emergency() {
    let backend = ScriptedBackend::new(|_| Ok("Buvez un verre d'eau et reposez-vous.".to_string()));
    let response = resolver_with(backend).resolve("J'ai soif").await;
    assert_eq!(response.source, ResponseSource::Remote);
    assert!(!response.is_emergency);
}

#[tokio::test]
async fn test_prompt_echo_is_stripped() {
    let backend = ScriptedBackend::new(|prompt| Ok(format!("{}\n  Refroidissez la brûlure.  ", prompt)));
    let response = resolver_with(backend).resolve("Brûlure à la main").await;
    assert_eq!(response.text, "Refroidissez la brûlure.");
}

#[tokio::test]
async fn test_echo_only_keeps_raw_text() {
    let backend = ScriptedBackend::new(|prompt| Ok(prompt.to_string()));
    let response = resolver_with(backend).resolve("Question vide").await;
    assert_eq!(response.source, ResponseSource::Remote);
    assert_eq!(response.text, constants::build_prompt("Question vide"));
    // Classification runs on the cleaned (empty) text
    assert!(!response.is_emergency);
}

#[tokio::test]
async fn test_every_failure_falls_back_to_local() {
    let failures: [fn(&str) -> Result<String, InferenceError>; 5] = [
        |_| Err(InferenceError::Timeout),
        |_| Err(InferenceError::Status { status: 500, body: "boom".into() }),
        |_| Err(InferenceError::Format("no generated_text".into())),
        |_| Err(InferenceError::Api("rate limited".into())),
        |_| Err(InferenceError::MissingCredential),
    ];

    for reply in failures {
        let backend = ScriptedBackend::new(reply);
        let response = resolver_with(backend.clone()).resolve("Il saigne beaucoup").await;
        assert_eq!(response.source, ResponseSource::Local);
        assert_eq!(response.text, CATEGORIES[2].advisory);
        assert!(!response.is_emergency);
        assert_eq!(backend.calls(), 1);
    }
}

#[tokio::test]
async fn test_unmatched_fallback_is_general() {
    let backend = ScriptedBackend::new(|_| Err(InferenceError::Timeout));
    let response = resolver_with(backend).resolve("Bonjour").await;
    assert_eq!(response.text, GENERAL.advisory);
    assert!(!response.is_emergency);
}

#[tokio::test]
async fn test_custom_classifier() {
    let backend = ScriptedBackend::new(|_| Ok("Reposez-vous.".to_string()));
    let response = resolver_with(backend)
        .with_classifier(AlwaysEmergency)
        .resolve("fatigue")
        .await;
    assert!(response.is_emergency);
}

#[tokio::test]
async fn test_panicking_backend_degrades_with_caution() {
    let resolver = Arc::new(ResponseResolver::new(Some(Arc::new(PanickingBackend))));
    let response = resolver.resolve_guarded("Il saigne").await;
    assert_eq!(response.source, ResponseSource::Error);
    assert!(response.is_emergency);
    assert!(response.text.starts_with(DEGRADED_PREFIX));
    assert!(response.text.ends_with(CATEGORIES[2].advisory));
}

#[tokio::test]
async fn test_guarded_resolution_passes_normal_answers_through() {
    let resolver = Arc::new(ResponseResolver::local_only());
    let response = resolver.resolve_guarded("Une personne s'étouffe").await;
    assert_eq!(response.source, ResponseSource::Local);
}

#[tokio::test(start_paused = true)]
async fn test_minimum_delay_is_applied() {
    let resolver = ResponseResolver::local_only().with_response_delay(Some(Duration::from_secs(2)));
    let started = tokio::time::Instant::now();
    resolver.resolve("Une personne s'étouffe").await;
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_no_delay_by_default() {
    let resolver = ResponseResolver::local_only();
    let started = tokio::time::Instant::now();
    resolver.resolve("Une personne s'étouffe").await;
    assert!(started.elapsed() < Duration::from_millis(1));
}

#[test_log::test(tokio::test)]
async fn test_rate_limited_endpoint_yields_local_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "rate limited" })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = Settings::new(Some("hf_test".to_string()), server.uri(), 5, 0);
    let response = settings.build_resolver().resolve("Une personne s'étouffe").await;
    assert_eq!(response.source, ResponseSource::Local);
    assert_eq!(response.text, CATEGORIES[0].advisory);
}

#[tokio::test]
async fn test_without_credential_transport_is_never_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "generated_text": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let settings = Settings::new(None, server.uri(), 5, 0);
    let resolver = settings.build_resolver();
    assert!(!resolver.remote_configured());
    for text in ["Une personne s'étouffe", "Bonjour", "Il saigne"] {
        assert_eq!(resolver.resolve(text).await.source, ResponseSource::Local);
    }
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_remote_success_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "generated_text": "C'est une urgence : appelez le 18." }
        ])))
        .mount(&server)
        .await;

    let settings = Settings::new(Some("hf_test".to_string()), server.uri(), 5, 0);
    let response = settings.build_resolver().resolve("Douleur dans la poitrine").await;
    assert_eq!(response.source, ResponseSource::Remote);
    assert!(response.is_emergency);
    assert_eq!(response.text, "C'est une urgence : appelez le 18.");
}
