use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants;
use crate::errors::InferenceError;
use crate::inference::{HuggingFaceClient, InferenceBackend};
use crate::resolver::ResponseResolver;

/// Runtime settings, assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub request_timeout: Duration,
    pub response_delay: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: constants::INFERENCE_URL.clone(),
            request_timeout: Duration::from_secs(constants::DEFAULT_TIMEOUT_SECS),
            response_delay: Some(Duration::from_millis(constants::DEFAULT_RESPONSE_DELAY_MS)),
        }
    }
}

impl Settings {
    pub fn new(api_key: Option<String>, endpoint: String, timeout_secs: u64, delay_ms: u64) -> Self {
        Self {
            // A blank key is the same as no key.
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            response_delay: (delay_ms > 0).then(|| Duration::from_millis(delay_ms)),
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn build_resolver(&self) -> ResponseResolver {
        let backend: Option<Arc<dyn InferenceBackend>> = match &self.api_key {
            None => {
                info!("No {} set, running with the local advice table only", constants::API_KEY_ENV);
                None
            }
            Some(key) => match HuggingFaceClient::new(&self.endpoint, key, self.request_timeout) {
                Ok(client) => {
                    info!(endpoint = %self.endpoint, timeout = ?self.request_timeout, "Remote inference enabled");
                    Some(Arc::new(client))
                }
                Err(InferenceError::MissingCredential) => None,
                Err(e) => {
                    warn!("Could not build inference client, using local table only: {}", e);
                    None
                }
            },
        };

        ResponseResolver::new(backend).with_response_delay(self.response_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_disables_remote() {
        let settings = Settings::new(Some("  ".to_string()), "http://localhost".to_string(), 5, 0);
        assert!(!settings.remote_enabled());
        assert!(!settings.build_resolver().remote_configured());
    }

    #[test]
    fn test_key_enables_remote() {
        let settings = Settings::new(Some("hf_test".to_string()), "http://localhost".to_string(), 5, 0);
        assert!(settings.remote_enabled());
        assert!(settings.build_resolver().remote_configured());
    }

    #[test]
    fn test_zero_delay_is_disabled() {
        let settings = Settings::new(None, "http://localhost".to_string(), 0, 0);
        assert!(settings.response_delay.is_none());
        assert_eq!(settings.request_timeout, Duration::from_secs(1));

        let settings = Settings::new(None, "http://localhost".to_string(), 30, 2000);
        assert_eq!(settings.response_delay, Some(Duration::from_millis(2000)));
        assert_eq!(settings.build_resolver().response_delay(), Some(Duration::from_millis(2000)));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.api_key.is_none());
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }
}
