//! HTTP client implementation for the remote storefront service.
//!
//! Uses `reqwest` for HTTP and caches catalog reads using `moka`
//! (5-minute TTL). Cart and order endpoints are never cached.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use greenmarket_core::{CartId, ProductId};

use crate::config::StorefrontConfig;

use super::types::{
    AddItemRequest, Cart, CheckoutRequest, CreateCartResponse, Order, Product,
    UpdateItemQuantityRequest,
};
use super::{ApiError, error_message};

/// Catalog cache TTL.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Catalog cache capacity.
const CACHE_CAPACITY: u64 = 1000;

/// Cached catalog value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the remote storefront service.
///
/// Provides typed access to the catalog, cart, and order operations.
/// Cheaply cloneable; clones share the same connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new service client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_base_url.clone(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Decode a response, normalizing non-success statuses into [`ApiError`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();

        // Get the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "storefront service returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "failed to parse storefront service response"
            );
            ApiError::Parse(e)
        })
    }

    /// Check a response that carries no body on success.
    async fn expect_empty(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        tracing::error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "storefront service returned non-success status"
        );
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(status, &body),
        })
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Get the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let cache_key = "products".to_string();

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let response = self.inner.client.get(self.url("/products")).send().await?;
        let products: Vec<Product> = Self::decode(response).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{product_id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let response = self
            .inner
            .client
            .get(self.url(&format!("/products/{product_id}")))
            .send()
            .await?;
        let product: Product = Self::decode(response).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Create a new cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<CreateCartResponse, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("/carts"))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Get a cart by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found or the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Cart, ApiError> {
        let response = self
            .inner
            .client
            .get(self.url(&format!("/carts/{cart_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Remove every item from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found or the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn clear_cart(&self, cart_id: CartId) -> Result<(), ApiError> {
        let response = self
            .inner
            .client
            .delete(self.url(&format!("/carts/{cart_id}")))
            .send()
            .await?;
        Self::expect_empty(response).await
    }

    /// Add an item to a cart.
    ///
    /// The service merges quantities when the product is already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart or product is not found or the request
    /// fails.
    #[instrument(skip(self, request), fields(cart_id = %cart_id, product_id = %request.product_id))]
    pub async fn add_item(
        &self,
        cart_id: CartId,
        request: &AddItemRequest,
    ) -> Result<Cart, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url(&format!("/carts/{cart_id}/items")))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Update the quantity of a product line in a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not found or the request fails.
    #[instrument(skip(self, request), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn update_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        request: &UpdateItemQuantityRequest,
    ) -> Result<Cart, ApiError> {
        let response = self
            .inner
            .client
            .put(self.url(&format!("/carts/{cart_id}/items/{product_id}")))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Remove a product line from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not found or the request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Cart, ApiError> {
        let response = self
            .inner
            .client
            .delete(self.url(&format!("/carts/{cart_id}/items/{product_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Check out a cart and create an order.
    ///
    /// The service expects the cart id as a query parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found, is empty, or the request
    /// fails.
    #[instrument(skip(self, request), fields(cart_id = %cart_id))]
    pub async fn checkout(
        &self,
        cart_id: CartId,
        request: &CheckoutRequest,
    ) -> Result<Order, ApiError> {
        let response = self
            .inner
            .client
            .post(self.url("/checkout"))
            .query(&[("cart_id", cart_id.to_string())])
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate all cached catalog data.
    pub fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
    }
}
