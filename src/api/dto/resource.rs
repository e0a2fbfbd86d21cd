//! DTOs for resource creation and lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::{Representation, ResourceKind, ResourceView};

/// Request to create a short link, QR code or barcode.
///
/// The target is normalized by the service; validation here only rejects
/// obviously unusable input.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub target_url: String,

    /// Opaque reference to the owning account, stored as given.
    #[validate(range(min = 1))]
    pub owner_id: Option<i64>,
}

/// A resource as returned by the create and info endpoints.
///
/// `hits` includes counts not yet written to the database, but may lag the
/// most recent accesses by a moment.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub kind: ResourceKind,
    pub code: String,
    pub target_url: String,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    pub hits: i64,
    /// `clicks` for short links, `scans` for QR codes and barcodes.
    pub counter_label: String,
    pub short_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResourceResponse {
    pub fn from_view(view: ResourceView, base_url: &str) -> Self {
        let kind = view.kind;
        Self {
            short_url: kind.public_url(base_url, &view.code),
            image_url: kind.image_url(base_url, &view.code),
            counter_label: kind.counter_label().to_string(),
            kind,
            code: view.code,
            target_url: view.target_url,
            title: view.title,
            owner_id: view.owner_id,
            hits: view.hits,
            created_at: view.created_at,
        }
    }
}

/// Query string of the history endpoints.
///
/// `sort` and `order` are checked against the kind in the handler, since the
/// accepted counter name depends on it.
#[derive(Debug, Deserialize, Validate)]
pub struct HistoryParams {
    #[validate(range(min = 1))]
    pub owner_id: i64,

    #[validate(range(min = 1, message = "page must be >= 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "limit must be in [1..100]"))]
    pub limit: Option<u32>,

    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub items: Vec<ResourceResponse>,
}

/// Image description handed to the external renderer.
#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub kind: ResourceKind,
    pub code: String,
    #[serde(flatten)]
    pub representation: Representation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(kind: ResourceKind) -> ResourceView {
        ResourceView {
            kind,
            code: "Xy3kP9q".to_string(),
            target_url: "https://example.com/".to_string(),
            title: Some("Example".to_string()),
            owner_id: None,
            hits: 4,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_short_link_response_has_no_image_url() {
        let resp = ResourceResponse::from_view(view(ResourceKind::ShortLink), "https://s.io/");

        assert_eq!(resp.short_url, "https://s.io/Xy3kP9q");
        assert_eq!(resp.counter_label, "clicks");
        assert!(resp.image_url.is_none());

        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("image_url").is_none());
        assert!(json.get("owner_id").is_none());
        assert_eq!(json["kind"], "url");
    }

    #[test]
    fn test_barcode_response_links_image() {
        let resp = ResourceResponse::from_view(view(ResourceKind::Barcode), "https://s.io/");

        assert_eq!(resp.short_url, "https://s.io/barcode/Xy3kP9q");
        assert_eq!(
            resp.image_url.as_deref(),
            Some("https://s.io/barcode/Xy3kP9q/image")
        );
        assert_eq!(resp.counter_label, "scans");
    }

    #[test]
    fn test_history_params_validation() {
        let params = |page, limit| HistoryParams {
            owner_id: 1,
            page,
            limit,
            sort: None,
            order: None,
        };

        assert!(params(None, None).validate().is_ok());
        assert!(params(Some(2), Some(100)).validate().is_ok());
        assert!(params(Some(0), None).validate().is_err());
        assert!(params(None, Some(101)).validate().is_err());
        assert!(params(None, Some(0)).validate().is_err());
    }

    #[test]
    fn test_request_validation() {
        let ok = CreateResourceRequest {
            target_url: "https://example.com".to_string(),
            owner_id: Some(3),
        };
        assert!(ok.validate().is_ok());

        let empty = CreateResourceRequest {
            target_url: String::new(),
            owner_id: None,
        };
        assert!(empty.validate().is_err());

        let bad_owner = CreateResourceRequest {
            target_url: "https://example.com".to_string(),
            owner_id: Some(0),
        };
        assert!(bad_owner.validate().is_err());
    }
}
