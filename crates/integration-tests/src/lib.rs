//! Integration test support for Greenmarket.
//!
//! Hosts an in-memory implementation of the remote storefront service so
//! the client and the cart state container can be exercised end-to-end
//! over real HTTP. The service implements the full contract the client
//! consumes: catalog reads, cart lifecycle, item mutations, and checkout,
//! with the service-side behaviors the client relies on (authoritative
//! subtotals, quantity merging on duplicate adds, JSON error payloads).
//!
//! Per-endpoint hit counters let tests assert which requests were - and
//! were not - issued.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};

use greenmarket_core::{
    CartId, CartItemId, CartStatus, OrderId, OrderItemId, OrderStatus, ProductId,
};
use greenmarket_storefront::api::ApiClient;
use greenmarket_storefront::api::types::{
    AddItemRequest, Cart, CartItem, CheckoutRequest, CreateCartResponse, Order, OrderItem, Product,
    UpdateItemQuantityRequest,
};
use greenmarket_storefront::cart::{CartIdStore, CartStore};
use greenmarket_storefront::config::StorefrontConfig;

/// Initialize test logging once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// =============================================================================
// TestContext
// =============================================================================

/// Everything a test needs to drive the client against a live service.
pub struct TestContext {
    pub service: MockService,
    pub config: StorefrontConfig,
    pub api: ApiClient,
    pub store: CartStore,
    _dir: tempfile::TempDir,
}

impl TestContext {
    /// Spawn a seeded service and wire a client and store to it.
    pub async fn new() -> Self {
        init_tracing();

        let service = MockService::new();
        let base_url = service.spawn().await;
        let dir = tempfile::tempdir().expect("tempdir");

        let config = StorefrontConfig {
            api_base_url: base_url,
            cart_id_path: dir.path().join("cart_id"),
            user_agent: None,
        };
        let api = ApiClient::new(&config).expect("api client");
        let store = CartStore::new(api.clone(), CartIdStore::new(&config.cart_id_path));

        Self {
            service,
            config,
            api,
            store,
            _dir: dir,
        }
    }

    /// A fresh store sharing the same service and persistence path - the
    /// equivalent of a restarted session.
    #[must_use]
    pub fn restart_store(&self) -> CartStore {
        let api = ApiClient::new(&self.config).expect("api client");
        CartStore::new(api, CartIdStore::new(&self.config.cart_id_path))
    }

    /// The seeded catalog, as the service serves it.
    #[must_use]
    pub fn catalog(&self) -> Vec<Product> {
        self.service.with_state(|state| state.products.clone())
    }
}

/// Error payload shape the client's error extraction expects.
fn error_response(code: StatusCode, status: &str, message: String) -> (StatusCode, Json<Value>) {
    (
        code,
        Json(json!({
            "code": code.as_u16(),
            "status": status,
            "message": message,
        })),
    )
}

fn not_found(message: String) -> (StatusCode, Json<Value>) {
    error_response(StatusCode::NOT_FOUND, "not_found", message)
}

fn bad_request(message: String) -> (StatusCode, Json<Value>) {
    error_response(StatusCode::BAD_REQUEST, "bad_request", message)
}

type ServiceResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

/// Build a catalog product with sensible defaults for tests.
#[must_use]
pub fn product(id: i64, name: &str, price_cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        sku: format!("SKU-{id:04}"),
        name: name.to_string(),
        description: format!("{name} (test catalog)"),
        image_url: None,
        price_cents,
        currency_code: "USD".to_string(),
        active: true,
        quantity: 100,
        reserved: 0,
    }
}

// =============================================================================
// Hit Counters
// =============================================================================

/// Per-endpoint request counters.
#[derive(Debug, Default)]
pub struct Hits {
    product_list: AtomicU32,
    product_get: AtomicU32,
    cart_create: AtomicU32,
    cart_get: AtomicU32,
    cart_clear: AtomicU32,
    item_add: AtomicU32,
    item_update: AtomicU32,
    item_remove: AtomicU32,
    checkout: AtomicU32,
}

impl Hits {
    pub fn product_list(&self) -> u32 {
        self.product_list.load(Ordering::SeqCst)
    }

    pub fn product_get(&self) -> u32 {
        self.product_get.load(Ordering::SeqCst)
    }

    pub fn cart_create(&self) -> u32 {
        self.cart_create.load(Ordering::SeqCst)
    }

    pub fn cart_get(&self) -> u32 {
        self.cart_get.load(Ordering::SeqCst)
    }

    pub fn cart_clear(&self) -> u32 {
        self.cart_clear.load(Ordering::SeqCst)
    }

    pub fn item_add(&self) -> u32 {
        self.item_add.load(Ordering::SeqCst)
    }

    pub fn item_update(&self) -> u32 {
        self.item_update.load(Ordering::SeqCst)
    }

    pub fn item_remove(&self) -> u32 {
        self.item_remove.load(Ordering::SeqCst)
    }

    pub fn checkout(&self) -> u32 {
        self.checkout.load(Ordering::SeqCst)
    }

    /// Total requests across every endpoint.
    pub fn total(&self) -> u32 {
        self.product_list()
            + self.product_get()
            + self.cart_create()
            + self.cart_get()
            + self.cart_clear()
            + self.item_add()
            + self.item_update()
            + self.item_remove()
            + self.checkout()
    }
}

// =============================================================================
// MockService
// =============================================================================

#[derive(Debug, Default)]
struct ServiceState {
    products: Vec<Product>,
    carts: BTreeMap<CartId, Cart>,
    next_cart_id: i64,
    next_item_id: i64,
    next_order_id: i64,
    next_order_item_id: i64,
}

/// In-memory storefront service.
///
/// Cheaply cloneable; clones share state, so tests keep one handle for
/// inspection while the router serves requests.
#[derive(Clone, Default)]
pub struct MockService {
    inner: Arc<MockServiceInner>,
}

#[derive(Default)]
struct MockServiceInner {
    state: Mutex<ServiceState>,
    hits: Hits,
}

impl MockService {
    /// Create a service seeded with a small catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::with_products(vec![
            product(1, "Alpine water bottle", 1250),
            product(2, "Canvas tote", 1999),
            product(3, "Beeswax candle", 899),
        ])
    }

    /// Create a service with the given catalog.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let service = Self::default();
        service.with_state(|state| state.products = products);
        service
    }

    /// Per-endpoint request counters.
    #[must_use]
    pub fn hits(&self) -> &Hits {
        &self.inner.hits
    }

    /// Add a product to the catalog after construction.
    pub fn push_product(&self, new: Product) {
        self.with_state(|state| state.products.push(new));
    }

    /// Current service-side view of a cart.
    #[must_use]
    pub fn cart_snapshot(&self, cart_id: CartId) -> Option<Cart> {
        self.with_state(|state| state.carts.get(&cart_id).cloned())
    }

    /// Bind an ephemeral port, serve the contract, and return the base URL.
    pub async fn spawn(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let router = self.router();

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        format!("http://{addr}")
    }

    /// Router implementing the storefront service contract.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/products", get(list_products))
            .route("/products/{id}", get(get_product))
            .route("/carts", post(create_cart))
            .route("/carts/{id}", get(get_cart).delete(clear_cart))
            .route("/carts/{id}/items", post(add_item))
            .route(
                "/carts/{id}/items/{product_id}",
                put(update_item).delete(remove_item),
            )
            .route("/checkout", post(checkout))
            .with_state(self.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ServiceState) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Re-derive a cart's subtotal from its lines. The service owns pricing;
/// clients never compute this.
fn recompute(cart: &mut Cart) {
    cart.subtotal_cents = cart
        .items
        .iter()
        .map(|item| item.quantity * item.unit_price_cents)
        .sum();
    cart.updated_at = Some(Utc::now());
}

async fn list_products(State(service): State<MockService>) -> Json<Vec<Product>> {
    service.inner.hits.product_list.fetch_add(1, Ordering::SeqCst);
    Json(service.with_state(|state| state.products.clone()))
}

async fn get_product(
    State(service): State<MockService>,
    Path(id): Path<i64>,
) -> ServiceResult<Product> {
    service.inner.hits.product_get.fetch_add(1, Ordering::SeqCst);
    let product_id = ProductId::new(id);
    service
        .with_state(|state| state.products.iter().find(|p| p.id == product_id).cloned())
        .map(Json)
        .ok_or_else(|| not_found(format!("product {id} not found")))
}

async fn create_cart(State(service): State<MockService>) -> Json<CreateCartResponse> {
    service.inner.hits.cart_create.fetch_add(1, Ordering::SeqCst);
    let cart_id = service.with_state(|state| {
        state.next_cart_id += 1;
        let cart_id = CartId::new(state.next_cart_id);
        state.carts.insert(
            cart_id,
            Cart {
                id: cart_id,
                status: CartStatus::Open,
                created_at: Some(Utc::now()),
                updated_at: Some(Utc::now()),
                items: Vec::new(),
                subtotal_cents: 0,
                currency_code: "USD".to_string(),
            },
        );
        cart_id
    });
    Json(CreateCartResponse { cart_id })
}

async fn get_cart(State(service): State<MockService>, Path(id): Path<i64>) -> ServiceResult<Cart> {
    service.inner.hits.cart_get.fetch_add(1, Ordering::SeqCst);
    let cart_id = CartId::new(id);
    service
        .with_state(|state| state.carts.get(&cart_id).cloned())
        .map(Json)
        .ok_or_else(|| not_found(format!("cart {id} not found")))
}

async fn clear_cart(
    State(service): State<MockService>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    service.inner.hits.cart_clear.fetch_add(1, Ordering::SeqCst);
    let cart_id = CartId::new(id);
    service.with_state(|state| {
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| not_found(format!("cart {id} not found")))?;
        cart.items.clear();
        recompute(cart);
        Ok(StatusCode::NO_CONTENT)
    })
}

async fn add_item(
    State(service): State<MockService>,
    Path(id): Path<i64>,
    Json(request): Json<AddItemRequest>,
) -> ServiceResult<Cart> {
    service.inner.hits.item_add.fetch_add(1, Ordering::SeqCst);
    let cart_id = CartId::new(id);
    service.with_state(|state| {
        let catalog_product = state
            .products
            .iter()
            .find(|p| p.id == request.product_id)
            .cloned()
            .ok_or_else(|| not_found(format!("product {} not found", request.product_id)))?;

        state.next_item_id += 1;
        let item_id = CartItemId::new(state.next_item_id);

        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| not_found(format!("cart {id} not found")))?;

        // The service merges quantities for a product already in the cart
        if let Some(item) = cart
            .items
            .iter_mut()
            .find(|item| item.product_id == request.product_id)
        {
            item.quantity += request.quantity;
        } else {
            cart.items.push(CartItem {
                id: item_id,
                cart_id,
                product_id: catalog_product.id,
                quantity: request.quantity,
                unit_price_cents: catalog_product.price_cents,
                currency_code: catalog_product.currency_code.clone(),
                product: Some(catalog_product),
            });
        }
        recompute(cart);
        Ok(Json(cart.clone()))
    })
}

async fn update_item(
    State(service): State<MockService>,
    Path((id, product_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateItemQuantityRequest>,
) -> ServiceResult<Cart> {
    service.inner.hits.item_update.fetch_add(1, Ordering::SeqCst);
    let cart_id = CartId::new(id);
    let product_id = ProductId::new(product_id);
    service.with_state(|state| {
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| not_found(format!("cart {id} not found")))?;

        let item = cart
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or_else(|| not_found(format!("product {product_id} not in cart {id}")))?;

        item.quantity = request.quantity;
        recompute(cart);
        Ok(Json(cart.clone()))
    })
}

async fn remove_item(
    State(service): State<MockService>,
    Path((id, product_id)): Path<(i64, i64)>,
) -> ServiceResult<Cart> {
    service.inner.hits.item_remove.fetch_add(1, Ordering::SeqCst);
    let cart_id = CartId::new(id);
    let product_id = ProductId::new(product_id);
    service.with_state(|state| {
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| not_found(format!("cart {id} not found")))?;

        let before = cart.items.len();
        cart.items.retain(|item| item.product_id != product_id);
        if cart.items.len() == before {
            return Err(not_found(format!("product {product_id} not in cart {id}")));
        }
        recompute(cart);
        Ok(Json(cart.clone()))
    })
}

#[derive(Debug, serde::Deserialize)]
struct CheckoutParams {
    cart_id: i64,
}

async fn checkout(
    State(service): State<MockService>,
    Query(params): Query<CheckoutParams>,
    Json(request): Json<CheckoutRequest>,
) -> ServiceResult<Order> {
    service.inner.hits.checkout.fetch_add(1, Ordering::SeqCst);
    let cart_id = CartId::new(params.cart_id);
    service.with_state(|state| {
        state.next_order_id += 1;
        let order_id = OrderId::new(state.next_order_id);
        let mut next_order_item_id = state.next_order_item_id;

        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or_else(|| not_found(format!("cart {} not found", params.cart_id)))?;
        if cart.items.is_empty() {
            return Err(bad_request(format!("cart {} is empty", params.cart_id)));
        }

        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .map(|item| {
                next_order_item_id += 1;
                OrderItem {
                    id: OrderItemId::new(next_order_item_id),
                    order_id,
                    product_id: Some(item.product_id),
                    product_name: item
                        .product
                        .as_ref()
                        .map_or_else(|| format!("product {}", item.product_id), |p| p.name.clone()),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                    line_total_cents: item.quantity * item.unit_price_cents,
                    currency_code: item.currency_code.clone(),
                }
            })
            .collect();

        let subtotal_cents = cart.subtotal_cents;
        let tax_cents = subtotal_cents * 8 / 100;
        let shipping_cents = if subtotal_cents >= 5000 { 0 } else { 500 };
        let currency_code = cart.currency_code.clone();

        cart.status = CartStatus::CheckedOut;
        state.next_order_item_id = next_order_item_id;

        Ok(Json(Order {
            id: order_id,
            cart_id: Some(cart_id),
            status: OrderStatus::Paid,
            customer_email: request.customer_email,
            subtotal_cents,
            tax_cents,
            shipping_cents,
            total_cents: subtotal_cents + tax_cents + shipping_cents,
            currency_code,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
            items,
        }))
    })
}
