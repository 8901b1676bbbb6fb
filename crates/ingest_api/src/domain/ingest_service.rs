use crate::domain::{ContentKind, IngestError, IngestRequest, IngestResult};
use common::domain::{EnvelopeProducer, EnvelopeSource, LogEnvelope, LogIdGenerator};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Body shape accepted for `application/json` submissions
#[derive(Debug, Deserialize)]
struct StructuredLogInput {
    tenant_id: Option<String>,
    log_id: Option<String>,
    text: Option<String>,
}

/// Domain service behind the ingest endpoint
///
/// Flow:
/// 1. Detect the content kind from the content type
/// 2. Normalize the body into a `LogEnvelope`
/// 3. Hand the envelope to the queue and wait for the durable acknowledgment
///
/// Nothing is enqueued unless normalization succeeds.
pub struct IngestService {
    producer: Arc<dyn EnvelopeProducer>,
    id_generator: Arc<dyn LogIdGenerator>,
}

impl IngestService {
    pub fn new(producer: Arc<dyn EnvelopeProducer>, id_generator: Arc<dyn LogIdGenerator>) -> Self {
        Self {
            producer,
            id_generator,
        }
    }

    /// Validate, normalize and enqueue a request. Returns the enqueued envelope.
    #[instrument(skip(self, request), fields(content_type = ?request.content_type))]
    pub async fn accept(&self, request: IngestRequest) -> IngestResult<LogEnvelope> {
        let envelope = self.normalize(request)?;

        debug!(
            tenant_id = %envelope.tenant_id,
            log_id = %envelope.log_id,
            source = %envelope.source,
            text_len = envelope.text.len(),
            "enqueueing log envelope"
        );

        self.producer
            .enqueue(&envelope)
            .await
            .map_err(IngestError::Enqueue)?;

        info!(
            tenant_id = %envelope.tenant_id,
            log_id = %envelope.log_id,
            source = %envelope.source,
            "accepted log envelope"
        );

        Ok(envelope)
    }

    /// Turn a request into an envelope without side effects on the queue
    ///
    /// The content kind is checked before anything else, so an unsupported
    /// type is a 415 whether or not a body was sent.
    pub fn normalize(&self, request: IngestRequest) -> IngestResult<LogEnvelope> {
        let IngestRequest {
            content_type,
            tenant_id,
            body,
        } = request;

        match ContentKind::detect(content_type.as_deref()) {
            Some(ContentKind::Structured) => self.normalize_structured(body.as_deref()),
            Some(ContentKind::RawText) => self.normalize_raw_text(tenant_id, body.as_deref()),
            None => {
                warn!(content_type = ?content_type, "unsupported content type");
                Err(IngestError::UnsupportedMediaType(content_type))
            }
        }
    }

    fn normalize_structured(&self, body: Option<&[u8]>) -> IngestResult<LogEnvelope> {
        let body = body
            .filter(|body| !body.is_empty())
            .ok_or(IngestError::MissingBody)?;

        let input: StructuredLogInput =
            serde_json::from_slice(body).map_err(IngestError::InvalidJson)?;

        let (tenant_id, log_id, text) = match (input.tenant_id, input.log_id, input.text) {
            (Some(tenant_id), Some(log_id), Some(text))
                if !tenant_id.is_empty() && !log_id.is_empty() && !text.is_empty() =>
            {
                (tenant_id, log_id, text)
            }
            _ => return Err(IngestError::MissingFields),
        };

        Ok(LogEnvelope {
            tenant_id,
            log_id,
            source: EnvelopeSource::Json,
            text,
        })
    }

    fn normalize_raw_text(
        &self,
        tenant_id: Option<String>,
        body: Option<&[u8]>,
    ) -> IngestResult<LogEnvelope> {
        let tenant_id = tenant_id
            .filter(|id| !id.is_empty())
            .ok_or(IngestError::MissingTenantHeader)?;
        let body = body.ok_or(IngestError::MissingBody)?;

        let text = std::str::from_utf8(body)
            .map_err(|_| IngestError::InvalidText)?
            .to_string();

        Ok(LogEnvelope {
            tenant_id,
            log_id: self.id_generator.next_log_id(),
            source: EnvelopeSource::TextUpload,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::domain::{DomainError, MockEnvelopeProducer, MockLogIdGenerator};

    fn service(producer: MockEnvelopeProducer) -> IngestService {
        let mut ids = MockLogIdGenerator::new();
        let mut counter = 0;
        ids.expect_next_log_id().returning(move || {
            counter += 1;
            format!("generated-{}", counter)
        });
        IngestService::new(Arc::new(producer), Arc::new(ids))
    }

    fn never_enqueued() -> MockEnvelopeProducer {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(0);
        producer
    }

    #[tokio::test]
    async fn test_accept_json_preserves_fields() {
        let mut producer = MockEnvelopeProducer::new();
        producer
            .expect_enqueue()
            .withf(|envelope: &LogEnvelope| {
                envelope.tenant_id == "acme"
                    && envelope.log_id == "L1"
                    && envelope.text == "hello"
                    && envelope.source == EnvelopeSource::Json
            })
            .times(1)
            .returning(|_| Ok(()));

        let envelope = service(producer)
            .accept(IngestRequest::json(
                r#"{"tenant_id":"acme","log_id":"L1","text":"hello"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(envelope.log_id, "L1");
    }

    #[tokio::test]
    async fn test_accept_json_with_charset_parameter() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(1).returning(|_| Ok(()));

        let request = IngestRequest {
            content_type: Some("application/json; charset=utf-8".to_string()),
            tenant_id: None,
            body: Some(r#"{"tenant_id":"acme","log_id":"L1","text":"hi"}"#.into()),
        };

        assert!(service(producer).accept(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_accept_json_missing_field_is_rejected() {
        let result = service(never_enqueued())
            .accept(IngestRequest::json(r#"{"tenant_id":"acme","text":"hello"}"#))
            .await;

        assert!(matches!(result, Err(IngestError::MissingFields)));
    }

    #[tokio::test]
    async fn test_accept_json_empty_text_is_rejected() {
        let result = service(never_enqueued())
            .accept(IngestRequest::json(
                r#"{"tenant_id":"acme","log_id":"L1","text":""}"#,
            ))
            .await;

        assert!(matches!(result, Err(IngestError::MissingFields)));
    }

    #[tokio::test]
    async fn test_accept_malformed_json_is_rejected() {
        let result = service(never_enqueued())
            .accept(IngestRequest::json("{not json"))
            .await;

        assert!(matches!(result, Err(IngestError::InvalidJson(_))));
    }

    #[tokio::test]
    async fn test_accept_json_empty_body_is_missing_body() {
        let result = service(never_enqueued())
            .accept(IngestRequest::json(""))
            .await;

        assert!(matches!(result, Err(IngestError::MissingBody)));
    }

    #[tokio::test]
    async fn test_accept_absent_body_is_rejected() {
        let request = IngestRequest {
            content_type: Some("text/plain".to_string()),
            tenant_id: Some("acme".to_string()),
            body: None,
        };

        let result = service(never_enqueued()).accept(request).await;

        assert!(matches!(result, Err(IngestError::MissingBody)));
    }

    #[tokio::test]
    async fn test_accept_text_generates_unique_ids() {
        let mut producer = MockEnvelopeProducer::new();
        producer
            .expect_enqueue()
            .withf(|envelope: &LogEnvelope| {
                envelope.tenant_id == "beta" && envelope.source == EnvelopeSource::TextUpload
            })
            .times(2)
            .returning(|_| Ok(()));
        let service = service(producer);

        let first = service
            .accept(IngestRequest::text("beta", "disk full"))
            .await
            .unwrap();
        let second = service
            .accept(IngestRequest::text("beta", "disk full"))
            .await
            .unwrap();

        assert_eq!(first.text, "disk full");
        assert_ne!(first.log_id, second.log_id);
    }

    #[tokio::test]
    async fn test_accept_text_allows_empty_body() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(1).returning(|_| Ok(()));

        let envelope = service(producer)
            .accept(IngestRequest::text("beta", ""))
            .await
            .unwrap();

        assert_eq!(envelope.text, "");
    }

    #[tokio::test]
    async fn test_accept_text_without_tenant_is_rejected() {
        let request = IngestRequest {
            content_type: Some("text/plain".to_string()),
            tenant_id: None,
            body: Some("disk full".into()),
        };

        let result = service(never_enqueued()).accept(request).await;

        assert!(matches!(result, Err(IngestError::MissingTenantHeader)));
    }

    #[tokio::test]
    async fn test_accept_unsupported_content_type() {
        let request = IngestRequest {
            content_type: Some("application/xml".to_string()),
            tenant_id: None,
            body: Some("<log/>".into()),
        };

        let result = service(never_enqueued()).accept(request).await;

        assert!(matches!(result, Err(IngestError::UnsupportedMediaType(_))));
    }

    #[tokio::test]
    async fn test_unsupported_content_type_without_body_is_rejected_as_unsupported() {
        let request = IngestRequest {
            content_type: Some("application/xml".to_string()),
            tenant_id: None,
            body: None,
        };

        let result = service(never_enqueued()).accept(request).await;

        assert!(matches!(result, Err(IngestError::UnsupportedMediaType(_))));
    }

    #[tokio::test]
    async fn test_text_without_tenant_or_body_reports_missing_tenant() {
        let request = IngestRequest {
            content_type: Some("text/plain".to_string()),
            tenant_id: None,
            body: None,
        };

        let result = service(never_enqueued()).accept(request).await;

        assert!(matches!(result, Err(IngestError::MissingTenantHeader)));
    }

    #[tokio::test]
    async fn test_json_without_body_is_missing_body() {
        let request = IngestRequest {
            content_type: Some("application/json".to_string()),
            tenant_id: None,
            body: None,
        };

        let result = service(never_enqueued()).accept(request).await;

        assert!(matches!(result, Err(IngestError::MissingBody)));
    }

    #[tokio::test]
    async fn test_accept_enqueue_failure() {
        let mut producer = MockEnvelopeProducer::new();
        producer.expect_enqueue().times(1).returning(|_| {
            Err(DomainError::QueueError(anyhow::anyhow!("queue unavailable")))
        });

        let result = service(producer)
            .accept(IngestRequest::json(
                r#"{"tenant_id":"acme","log_id":"L1","text":"hello"}"#,
            ))
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, IngestError::Enqueue(_)));
        assert!(!err.is_client_error());
    }
}
