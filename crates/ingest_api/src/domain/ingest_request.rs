use bytes::Bytes;

/// Content kinds the acceptor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json` body carrying tenant_id, log_id and text
    Structured,
    /// `text/plain` body with the tenant supplied out of band
    RawText,
}

impl ContentKind {
    /// Substring match, so parameters such as `; charset=utf-8` are accepted
    pub fn detect(content_type: Option<&str>) -> Option<Self> {
        let content_type = content_type?.to_ascii_lowercase();
        if content_type.contains("application/json") {
            Some(ContentKind::Structured)
        } else if content_type.contains("text/plain") {
            Some(ContentKind::RawText)
        } else {
            None
        }
    }
}

/// Transport independent view of an inbound ingest call
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub content_type: Option<String>,
    /// Value of the `X-Tenant-ID` header
    pub tenant_id: Option<String>,
    /// `None` when the request carried no body at all, `Some` (possibly empty) otherwise
    pub body: Option<Bytes>,
}

impl IngestRequest {
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some("application/json".to_string()),
            tenant_id: None,
            body: Some(body.into()),
        }
    }

    pub fn text(tenant_id: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some("text/plain".to_string()),
            tenant_id: Some(tenant_id.into()),
            body: Some(body.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_content_kind() {
        assert_eq!(
            ContentKind::detect(Some("application/json")),
            Some(ContentKind::Structured)
        );
        assert_eq!(
            ContentKind::detect(Some("Application/JSON; charset=utf-8")),
            Some(ContentKind::Structured)
        );
        assert_eq!(
            ContentKind::detect(Some("text/plain")),
            Some(ContentKind::RawText)
        );
        assert_eq!(ContentKind::detect(Some("application/xml")), None);
        assert_eq!(ContentKind::detect(None), None);
    }
}
