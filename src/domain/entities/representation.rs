//! Rendered forms of a resolved resource.

use serde::Serialize;

/// Image symbology handed to the external renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    Qr,
    Code128,
}

/// What a resource resolves to for its caller.
///
/// Image bytes are produced outside the core; `Image` carries everything the
/// renderer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Representation {
    Redirect {
        location: String,
    },
    Image {
        symbology: Symbology,
        payload: String,
        content_type: &'static str,
    },
}
