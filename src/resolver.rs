//! Two-tier answer resolution: remote model first, local advice table on any failure.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::classifier::{EmergencyClassifier, TriggerWordClassifier};
use crate::constants::{self, DEGRADED_PREFIX};
use crate::errors::InferenceError;
use crate::inference::{strip_prompt_echo, InferenceBackend};
use crate::matcher::{KeywordMatcher, LocalAdvice};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Remote,
    Local,
    Error,
}

impl ResponseSource {
    /// Label shown next to an assistant message.
    pub fn label(&self) -> &'static str {
        match self {
            ResponseSource::Remote => "IA Médicale",
            ResponseSource::Local => "Base locale",
            ResponseSource::Error => "Mode dégradé",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResponse {
    pub text: String,
    pub is_emergency: bool,
    pub source: ResponseSource,
}

impl ResolvedResponse {
    pub fn from_local(advice: LocalAdvice) -> Self {
        Self {
            text: advice.advisory.to_string(),
            is_emergency: advice.is_emergency,
            source: ResponseSource::Local,
        }
    }

    /// Answer used when resolution itself broke down. Always treated as an emergency.
    pub fn degraded(user_text: &str) -> Self {
        let advice = KeywordMatcher::match_text(user_text);
        Self {
            text: format!("{}{}", DEGRADED_PREFIX, advice.advisory),
            is_emergency: true,
            source: ResponseSource::Error,
        }
    }
}

pub struct ResponseResolver {
    backend: Option<Arc<dyn InferenceBackend>>,
    classifier: Box<dyn EmergencyClassifier>,
    response_delay: Option<Duration>,
}

impl ResponseResolver {
    /// `None` means no credential was configured: the remote tier is skipped entirely.
    pub fn new(backend: Option<Arc<dyn InferenceBackend>>) -> Self {
        Self {
            backend,
            classifier: Box::new(TriggerWordClassifier::default()),
            response_delay: None,
        }
    }

    pub fn local_only() -> Self {
        Self::new(None)
    }

    pub fn with_classifier(mut self, classifier: impl EmergencyClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Minimum time `resolve` takes, so fast local answers do not flash in.
    pub fn with_response_delay(mut self, delay: Option<Duration>) -> Self {
        self.response_delay = delay.filter(|d| !d.is_zero());
        self
    }

    pub fn remote_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn response_delay(&self) -> Option<Duration> {
        self.response_delay
    }

    pub async fn resolve(&self, user_text: &str) -> ResolvedResponse {
        let started = Instant::now();

        let response = match self.resolve_remote(user_text).await {
            Ok(response) => {
                info!(is_emergency = response.is_emergency, "Answered by remote model");
                response
            }
            Err(InferenceError::MissingCredential) => {
                debug!("No inference credential, answering from local table");
                ResolvedResponse::from_local(KeywordMatcher::match_text(user_text))
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Remote inference failed, falling back to local table");
                ResolvedResponse::from_local(KeywordMatcher::match_text(user_text))
            }
        };

        if let Some(delay) = self.response_delay {
            let remaining = delay.saturating_sub(started.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }

        response
    }

    async fn resolve_remote(&self, user_text: &str) -> Result<ResolvedResponse, InferenceError> {
        let backend = self.backend.as_ref().ok_or(InferenceError::MissingCredential)?;
        let prompt = constants::build_prompt(user_text);
        let generated = backend.generate(&prompt).await?;

        let cleaned = strip_prompt_echo(&generated, &prompt);
        let is_emergency = self.classifier.is_emergency(&cleaned);
        let text = if cleaned.is_empty() { generated } else { cleaned };

        Ok(ResolvedResponse {
            text,
            is_emergency,
            source: ResponseSource::Remote,
        })
    }

    /// Runs `resolve` in its own task. If that task aborts, the caller still gets
    /// local advice, tagged as degraded.
    pub async fn resolve_guarded(self: &Arc<Self>, user_text: &str) -> ResolvedResponse {
        let resolver = Arc::clone(self);
        let owned = user_text.to_string();
        match tokio::spawn(async move { resolver.resolve(&owned).await }).await {
            Ok(response) => response,
            Err(e) => {
                if e.is_panic() {
                    error!("Resolution task panicked: {:?}", e);
                } else {
                    error!("Resolution task failed: {:?}", e);
                }
                ResolvedResponse::degraded(user_text)
            }
        }
    }
}
