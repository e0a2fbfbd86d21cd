//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod admin;
pub mod health;
pub mod redirect;
pub mod resources;

pub use admin::{cache_stats_handler, clear_cache_handler, sync_counters_handler};
pub use health::health_handler;
pub use redirect::{barcode_scan_handler, qrcode_scan_handler, redirect_handler};
pub use resources::{
    barcode_history_handler, barcode_image_handler, barcode_info_handler, create_barcode_handler,
    create_qrcode_handler, link_info_handler, qrcode_history_handler, qrcode_image_handler,
    qrcode_info_handler, shorten_handler, url_history_handler,
};
