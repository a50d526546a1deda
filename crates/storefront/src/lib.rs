//! Greenmarket storefront client library.
//!
//! Talks to the remote catalog/cart/order service over HTTP and owns the
//! client-side source of truth for the current shopping cart.
//!
//! - [`config`] - Environment-driven configuration
//! - [`api`] - Typed client for the remote storefront service
//! - [`cart`] - Cart state container and identity persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use greenmarket_storefront::api::ApiClient;
//! use greenmarket_storefront::cart::{CartIdStore, CartStore};
//! use greenmarket_storefront::config::StorefrontConfig;
//!
//! let config = StorefrontConfig::from_env()?;
//! let api = ApiClient::new(&config)?;
//! let store = CartStore::new(api.clone(), CartIdStore::new(&config.cart_id_path));
//!
//! let cart = store.ensure_loaded().await?;
//! let product = api.get_product(cart_product_id).await?;
//! store.add_to_cart(&product, 1).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
