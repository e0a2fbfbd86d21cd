//! DTOs for the admin endpoints.

use serde::{Deserialize, Serialize};

/// Result of clearing a fast store prefix.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub prefix: String,
    pub removed: u64,
}
