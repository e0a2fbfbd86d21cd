//! Hit event model for asynchronous counting.

use super::entities::ResourceKind;

/// One counted access to a resource, queued for the hit worker.
///
/// Sent from request handlers through a bounded channel so that responses
/// never wait on the counter stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitEvent {
    pub kind: ResourceKind,
    pub code: String,
}

impl HitEvent {
    pub fn new(kind: ResourceKind, code: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
        }
    }
}
