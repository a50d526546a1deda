//! Cart state container.
//!
//! [`CartStore`] owns the single source of truth for the current cart:
//! the cart identity, the last known-good snapshot, and the load state.
//! Many independent consumers (navigation badge, drawer, cart page,
//! checkout page) share one store handle, read derived state from it, and
//! invoke its operations; none of them mutate state directly.
//!
//! The snapshot is only ever replaced wholesale by a service response,
//! never patched field-by-field, so it cannot diverge from server truth.
//! The one exception is [`CartStore::clear`], which zeroes the local
//! snapshot without a confirming re-fetch because clearing has an
//! unambiguous result.
//!
//! Operations are serialized: at most one is in flight per store, and
//! later calls wait their turn. A failed operation leaves the last
//! successfully-loaded snapshot in place and records the failure in the
//! error accessor.

mod persist;

pub use persist::CartIdStore;

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::instrument;

use greenmarket_core::{CartId, ProductId, format_minor_units};

use crate::api::types::{AddItemRequest, Cart, Product, UpdateItemQuantityRequest};
use crate::api::{ApiClient, ApiError};

/// Currency shown before any snapshot has been loaded.
const DEFAULT_CURRENCY: &str = "USD";

/// Load state of the container.
///
/// There is no distinct success state: reaching `Idle` after a mutation
/// signals success by the fact that the snapshot has changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Error,
}

/// Owned state, mutated only by the container itself.
#[derive(Debug, Default)]
struct CartState {
    cart_id: Option<CartId>,
    cart: Option<Cart>,
    state: LoadState,
    error: Option<String>,
}

// =============================================================================
// CartStore
// =============================================================================

/// Shared cart state container.
///
/// Cheaply cloneable via `Arc`; construct one at composition time and hand
/// clones to every consumer.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    persist: CartIdStore,
    state: Mutex<CartState>,
    /// Serializes operations: at most one in flight per store.
    op: tokio::sync::Mutex<()>,
    /// Bumped on every state change; consumers watch it to re-read.
    revision: watch::Sender<u64>,
}

impl CartStore {
    /// Create a store, restoring any persisted cart identity.
    ///
    /// Restoration is best-effort: a missing or corrupt persisted value
    /// means the store starts with no identity.
    #[must_use]
    pub fn new(api: ApiClient, persist: CartIdStore) -> Self {
        let cart_id = persist.load();
        let (revision, _) = watch::channel(0);

        Self {
            inner: Arc::new(CartStoreInner {
                api,
                persist,
                state: Mutex::new(CartState {
                    cart_id,
                    ..CartState::default()
                }),
                op: tokio::sync::Mutex::new(()),
                revision,
            }),
        }
    }

    // =========================================================================
    // Derived State
    // =========================================================================

    /// Identity of the current cart, if one is held.
    #[must_use]
    pub fn cart_id(&self) -> Option<CartId> {
        self.read(|s| s.cart_id)
    }

    /// The last known-good cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.read(|s| s.cart.clone())
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        self.read(|s| s.state)
    }

    /// Message of the last failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    /// Total number of units in the cart, 0 with no snapshot.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.read(|s| s.cart.as_ref().map_or(0, Cart::item_count))
    }

    /// Authoritative subtotal in minor currency units, 0 with no snapshot.
    #[must_use]
    pub fn subtotal_cents(&self) -> i64 {
        self.read(|s| s.cart.as_ref().map_or(0, |c| c.subtotal_cents))
    }

    /// Currency code of the snapshot, or the default with no snapshot.
    #[must_use]
    pub fn currency_code(&self) -> String {
        self.read(|s| {
            s.cart
                .as_ref()
                .map_or_else(|| DEFAULT_CURRENCY.to_string(), |c| c.currency_code.clone())
        })
    }

    /// Subtotal formatted for display.
    #[must_use]
    pub fn subtotal_display(&self) -> String {
        self.read(|s| {
            s.cart.as_ref().map_or_else(
                || format_minor_units(0, DEFAULT_CURRENCY),
                |c| format_minor_units(c.subtotal_cents, &c.currency_code),
            )
        })
    }

    /// Subscribe to state changes.
    ///
    /// The receiver observes a revision counter bumped on every change;
    /// consumers re-read the derived accessors when it moves.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Guarantee a cart identity exists and the snapshot reflects the
    /// service's current state for it.
    ///
    /// Reuses the held identity when there is one (from memory or restored
    /// from durable storage); otherwise requests a new cart and adopts the
    /// returned identity. In both cases the full cart is fetched and the
    /// snapshot replaced.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] after recording it in the error
    /// accessor.
    #[instrument(skip(self))]
    pub async fn ensure_loaded(&self) -> Result<Cart, ApiError> {
        let _guard = self.inner.op.lock().await;
        self.begin();

        let cart_id = match self.cart_id() {
            Some(id) => id,
            None => match self.inner.api.create_cart().await {
                Ok(created) => {
                    self.adopt_cart_id(created.cart_id);
                    created.cart_id
                }
                Err(e) => return Err(self.fail(e)),
            },
        };

        match self.inner.api.get_cart(cart_id).await {
            Ok(cart) => {
                self.succeed(cart.clone());
                Ok(cart)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Add `quantity` units of a product to the cart.
    ///
    /// Creates a cart first when no identity is held; the add response is
    /// authoritative, so no separate fetch is issued. The service merges
    /// quantities when the product is already present - the container does
    /// not deduplicate client-side.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] after recording it in the error
    /// accessor.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: &Product, quantity: i64) -> Result<Cart, ApiError> {
        let _guard = self.inner.op.lock().await;
        self.begin();

        let cart_id = match self.cart_id() {
            Some(id) => id,
            None => match self.inner.api.create_cart().await {
                Ok(created) => {
                    self.adopt_cart_id(created.cart_id);
                    created.cart_id
                }
                Err(e) => return Err(self.fail(e)),
            },
        };

        let request = AddItemRequest {
            product_id: product.id,
            quantity,
        };
        match self.inner.api.add_item(cart_id, &request).await {
            Ok(cart) => {
                self.succeed(cart.clone());
                Ok(cart)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Update the quantity of a product line.
    ///
    /// Callers clamp quantities below 1 to exactly 1; the container
    /// forwards the value verbatim and never constructs a below-1 quantity
    /// itself. Returns `Ok(None)` without contacting the service and
    /// without any state change when no cart identity is held.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] after recording it in the error
    /// accessor.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Option<Cart>, ApiError> {
        let _guard = self.inner.op.lock().await;
        let Some(cart_id) = self.cart_id() else {
            return Ok(None);
        };
        self.begin();

        let request = UpdateItemQuantityRequest { quantity };
        match self
            .inner
            .api
            .update_item_quantity(cart_id, product_id, &request)
            .await
        {
            Ok(cart) => {
                self.succeed(cart.clone());
                Ok(Some(cart))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Remove a product line from the cart.
    ///
    /// Returns `Ok(None)` without contacting the service and without any
    /// state change when no cart identity is held.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] after recording it in the error
    /// accessor.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<Option<Cart>, ApiError> {
        let _guard = self.inner.op.lock().await;
        let Some(cart_id) = self.cart_id() else {
            return Ok(None);
        };
        self.begin();

        match self.inner.api.remove_item(cart_id, product_id).await {
            Ok(cart) => {
                self.succeed(cart.clone());
                Ok(Some(cart))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Remove every item from the cart.
    ///
    /// With no identity held this resets identity and snapshot locally
    /// with no network call. Otherwise the service clears the cart and the
    /// local snapshot is zeroed directly - clearing has an unambiguous
    /// result, so no confirming re-fetch is issued. The identity is kept:
    /// the cart still exists server-side, merely empty.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] after recording it in the error
    /// accessor.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), ApiError> {
        let _guard = self.inner.op.lock().await;
        let Some(cart_id) = self.cart_id() else {
            self.mutate(|s| {
                s.cart = None;
                s.cart_id = None;
            });
            self.inner.persist.remove();
            return Ok(());
        };
        self.begin();

        match self.inner.api.clear_cart(cart_id).await {
            Ok(()) => {
                self.mutate(|s| {
                    if let Some(cart) = s.cart.as_mut() {
                        cart.items.clear();
                        cart.subtotal_cents = 0;
                    }
                    s.state = LoadState::Idle;
                });
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drop cart identity and snapshot unconditionally.
    ///
    /// Used after a successful checkout to start a new shopping session;
    /// does not contact the service. The next [`CartStore::ensure_loaded`]
    /// creates a fresh cart.
    pub fn reset(&self) {
        self.mutate(|s| *s = CartState::default());
        self.inner.persist.remove();
    }

    /// Record an error observed by a consumer at its own call site.
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.mutate(|s| {
            s.error = Some(message);
            s.state = LoadState::Error;
        });
    }

    // =========================================================================
    // State Transitions
    // =========================================================================

    fn read<R>(&self, f: impl FnOnce(&CartState) -> R) -> R {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut CartState) -> R) -> R {
        let out = {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            f(&mut state)
        };
        self.inner.revision.send_modify(|r| *r += 1);
        out
    }

    /// Enter the loading state and clear any previous error.
    fn begin(&self) {
        self.mutate(|s| {
            s.state = LoadState::Loading;
            s.error = None;
        });
    }

    /// Replace the snapshot wholesale with a service response.
    fn succeed(&self, cart: Cart) {
        self.mutate(|s| {
            s.cart = Some(cart);
            s.state = LoadState::Idle;
        });
    }

    /// Record a failure, leaving the last good snapshot in place.
    fn fail(&self, err: ApiError) -> ApiError {
        let message = err.to_string();
        self.mutate(|s| {
            s.state = LoadState::Error;
            s.error = Some(message);
        });
        err
    }

    /// Adopt a newly-created cart identity and mirror it to durable storage.
    fn adopt_cart_id(&self, cart_id: CartId) {
        self.mutate(|s| s.cart_id = Some(cart_id));
        self.inner.persist.store(cart_id);
    }
}
