//! Resource entity and the per-kind namespace it lives in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::representation::{Representation, Symbology};

/// The three resource namespaces.
///
/// Identifiers are unique within a kind, so the same code may exist once as a
/// short link and once as a QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "url")]
    ShortLink,
    #[serde(rename = "qrcode")]
    QrCode,
    #[serde(rename = "barcode")]
    Barcode,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::ShortLink,
        ResourceKind::QrCode,
        ResourceKind::Barcode,
    ];

    /// Stable name used in the database `kind` column and in store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ShortLink => "url",
            ResourceKind::QrCode => "qrcode",
            ResourceKind::Barcode => "barcode",
        }
    }

    /// Human-readable name used in messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::ShortLink => "Short link",
            ResourceKind::QrCode => "QR code",
            ResourceKind::Barcode => "Barcode",
        }
    }

    /// What a hit is called for this kind in responses.
    pub fn counter_label(&self) -> &'static str {
        match self {
            ResourceKind::ShortLink => "clicks",
            ResourceKind::QrCode | ResourceKind::Barcode => "scans",
        }
    }

    /// Public URL that resolves (and counts) this resource.
    ///
    /// `base_url` is expected to end with `/`; a missing slash is tolerated.
    pub fn public_url(&self, base_url: &str, code: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            ResourceKind::ShortLink => format!("{base}/{code}"),
            ResourceKind::QrCode | ResourceKind::Barcode => {
                format!("{base}/{}/{code}", self.as_str())
            }
        }
    }

    /// Public URL of the rendered image, if this kind has one.
    pub fn image_url(&self, base_url: &str, code: &str) -> Option<String> {
        match self {
            ResourceKind::ShortLink => None,
            ResourceKind::QrCode | ResourceKind::Barcode => {
                Some(format!("{}/image", self.public_url(base_url, code)))
            }
        }
    }

    /// Kind-specific rendering of a resolved resource.
    ///
    /// Short links render to their redirect target. QR codes and barcodes
    /// render to an image description whose payload is the public scan URL,
    /// so every scan goes back through resolution and counting.
    pub fn render(&self, view: &ResourceView, base_url: &str) -> Representation {
        match self {
            ResourceKind::ShortLink => Representation::Redirect {
                location: view.target_url.clone(),
            },
            ResourceKind::QrCode => Representation::Image {
                symbology: Symbology::Qr,
                payload: self.public_url(base_url, &view.code),
                content_type: "image/png",
            },
            ResourceKind::Barcode => Representation::Image {
                symbology: Symbology::Code128,
                payload: self.public_url(base_url, &view.code),
                content_type: "image/png",
            },
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(ResourceKind::ShortLink),
            "qrcode" => Ok(ResourceKind::QrCode),
            "barcode" => Ok(ResourceKind::Barcode),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A persisted resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: i64,
    pub kind: ResourceKind,
    pub code: String,
    pub target_url: String,
    pub title: Option<String>,
    pub owner_id: Option<i64>,
    pub hits: i64,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a new resource.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResource {
    pub kind: ResourceKind,
    pub code: String,
    pub target_url: String,
    pub title: Option<String>,
    pub owner_id: Option<i64>,
}

/// Resolution data for a resource.
///
/// This is what the fast store caches and what callers receive. `hits` is
/// not authoritative when read from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    pub kind: ResourceKind,
    pub code: String,
    pub target_url: String,
    pub title: Option<String>,
    pub owner_id: Option<i64>,
    pub hits: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Resource> for ResourceView {
    fn from(r: Resource) -> Self {
        Self {
            kind: r.kind,
            code: r.code,
            target_url: r.target_url,
            title: r.title,
            owner_id: r.owner_id,
            hits: r.hits,
            created_at: r.created_at,
        }
    }
}
