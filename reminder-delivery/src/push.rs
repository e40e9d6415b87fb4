use crate::payload::NotificationPayload;
use anyhow::{anyhow, Result};
use reminder_core::config::PushConfig;
use reminder_core::types::{DeliveryOutcome, PushEndpoint};
use tracing;

/// Wraps the push-protocol HTTP call and classifies the transport
/// response. The endpoint's key material travels in headers untouched;
/// the engine treats it as opaque.
pub struct PushClient {
    client: reqwest::Client,
    ttl_secs: u64,
}

impl PushClient {
    pub fn new(config: &PushConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to create push HTTP client: {}", e))?;

        Ok(Self {
            client,
            ttl_secs: config.ttl_secs,
        })
    }

    /// One delivery attempt. Never returns an error: transport failures
    /// classify as transient, like any other retriable response.
    pub async fn send(
        &self,
        endpoint: &PushEndpoint,
        payload: &NotificationPayload,
    ) -> DeliveryOutcome {
        let response = self
            .client
            .post(&endpoint.transport_address)
            .header("TTL", self.ttl_secs.to_string())
            .header("X-Push-P256dh", &endpoint.crypto.p256dh)
            .header("X-Push-Auth", &endpoint.crypto.auth)
            .json(payload)
            .send()
            .await;

        match response {
            Ok(response) => classify(response.status().as_u16()),
            Err(e) => {
                tracing::warn!(
                    "Push transport error for user {}: {}",
                    endpoint.user_id,
                    e
                );
                DeliveryOutcome::TransientFailure { status: None }
            }
        }
    }
}

/// Status-code classification, by decreasing certainty. 404 is the
/// ambiguous provider code: it can mean "truly gone" or "not yet
/// propagated", so it stays transient here and the lifecycle manager
/// escalates only after repeated consecutive occurrences.
pub fn classify(status: u16) -> DeliveryOutcome {
    match status {
        200..=299 => DeliveryOutcome::Delivered,
        410 => DeliveryOutcome::PermanentFailure {
            status,
            reason: "expired",
        },
        _ => DeliveryOutcome::TransientFailure {
            status: Some(status),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use reminder_core::types::{EndpointState, PushCrypto};
    use wiremock::matchers::{header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> PushConfig {
        PushConfig {
            ttl_secs: 60,
            timeout_secs: 2,
            transient_removal_threshold: 3,
        }
    }

    fn endpoint_at(uri: &str) -> PushEndpoint {
        PushEndpoint {
            user_id: "u1".to_string(),
            transport_address: format!("{}/push", uri),
            crypto: PushCrypto {
                p256dh: "p256dh-key".to_string(),
                auth: "auth-secret".to_string(),
            },
            state: EndpointState::Active,
        }
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify(201), DeliveryOutcome::Delivered);
        assert_eq!(
            classify(410),
            DeliveryOutcome::PermanentFailure {
                status: 410,
                reason: "expired"
            }
        );
        assert_eq!(
            classify(404),
            DeliveryOutcome::TransientFailure { status: Some(404) }
        );
        assert_eq!(
            classify(413),
            DeliveryOutcome::TransientFailure { status: Some(413) }
        );
        assert_eq!(
            classify(500),
            DeliveryOutcome::TransientFailure { status: Some(500) }
        );
    }

    #[tokio::test]
    async fn send_classifies_server_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("TTL"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = PushClient::new(&test_config()).unwrap();
        let outcome = client
            .send(&endpoint_at(&server.uri()), &payload::build_test())
            .await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);
    }

    #[tokio::test]
    async fn send_classifies_gone_as_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let client = PushClient::new(&test_config()).unwrap();
        let outcome = client
            .send(&endpoint_at(&server.uri()), &payload::build_test())
            .await;
        assert_eq!(
            outcome,
            DeliveryOutcome::PermanentFailure {
                status: 410,
                reason: "expired"
            }
        );
    }

    #[tokio::test]
    async fn unreachable_transport_is_transient() {
        let client = PushClient::new(&test_config()).unwrap();
        let endpoint = endpoint_at("http://127.0.0.1:1");
        let outcome = client.send(&endpoint, &payload::build_test()).await;
        assert_eq!(outcome, DeliveryOutcome::TransientFailure { status: None });
    }
}
