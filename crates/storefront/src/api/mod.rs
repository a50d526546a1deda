//! Remote storefront service client.
//!
//! # Architecture
//!
//! - Plain HTTP+JSON request/response contract, driven with `reqwest`
//! - The service is source of truth - carts are never cached or patched
//!   locally, every mutation response replaces client state wholesale
//! - Catalog reads are cached in-memory via `moka` (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use greenmarket_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config)?;
//!
//! // Browse the catalog
//! let products = api.list_products().await?;
//!
//! // Create a cart and add an item
//! let created = api.create_cart().await?;
//! let cart = api
//!     .add_item(created.cart_id, &AddItemRequest { product_id, quantity: 1 })
//!     .await?;
//! ```

mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the remote storefront service.
///
/// Every transport failure is normalized into this shape: a human-readable
/// message (`Display`), an optional numeric status code
/// ([`ApiError::status_code`]), and the raw underlying failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code of the response.
        status: u16,
        /// Message extracted from the service's error payload.
        message: String,
    },

    /// JSON parsing of a successful response failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Numeric HTTP status of the failure, when one was received.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Parse(_) => None,
        }
    }
}

/// Error payload shape the service uses for non-success responses.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
}

/// Extract a user-friendly message from an error response body.
///
/// Prefers the `message` field of the service's JSON error payload; falls
/// back to the status line plus a truncated body snippet.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body)
        && let Some(message) = payload.message
        && !message.is_empty()
    {
        return message;
    }

    let snippet: String = body.chars().take(200).collect();
    if snippet.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {snippet}")
    }
}
