use tracing::{Span, info_span};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Uses the id sent by the host if there is one, else generates a new one.
    pub fn from_request(incoming: Option<&str>) -> Self {
        match incoming.map(str::trim) {
            Some(id) if !id.is_empty() => RequestId(id.to_string()),
            _ => RequestId(Uuid::new_v4().to_string()),
        }
    }

    /// Span carrying the id for log correlation.
    pub fn span(&self, page_path: &str) -> Span {
        info_span!("filter_request", request_id = %self.0, path = %page_path)
    }
}
