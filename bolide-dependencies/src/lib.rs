//! Central re-exports for the third-party crates shared across the workspace.
//!
//! Members import these as `bolide_dependencies::<crate>` so that version
//! bumps happen in exactly one manifest.

pub use axum_flash;
pub use base64;
pub use chrono;
pub use csp;
pub use either;
pub use futures_util;
pub use lazy_static;
pub use mime;
pub use moka;
pub use new_mime_guess;
pub use regex;
pub use reqwest;
pub use ring;
pub use rust_embed;
pub use securefmt;
pub use sentry;
pub use sentry_tower;
pub use serde_urlencoded;
pub use tower;
pub use tracing_futures;
pub use url;
pub use uuid;
