//! Integration tests for the cart state container.
//!
//! Each test spawns its own in-process service, so tests are independent
//! and the per-endpoint hit counters start at zero.

use greenmarket_core::{CartId, ProductId};
use greenmarket_integration_tests::TestContext;
use greenmarket_storefront::api::types::CheckoutRequest;
use greenmarket_storefront::cart::LoadState;

#[tokio::test]
async fn test_first_visit_creates_and_loads_empty_cart() {
    let ctx = TestContext::new().await;

    let cart = ctx.store.ensure_loaded().await.expect("ensure loaded");

    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal_cents, 0);
    assert_eq!(ctx.store.cart_id(), Some(cart.id));
    assert_eq!(ctx.store.state(), LoadState::Idle);
    assert_eq!(ctx.store.item_count(), 0);
    assert_eq!(ctx.service.hits().cart_create(), 1);
    assert_eq!(ctx.service.hits().cart_get(), 1);
}

#[tokio::test]
async fn test_ensure_loaded_is_idempotent() {
    let ctx = TestContext::new().await;

    let first = ctx.store.ensure_loaded().await.expect("first ensure");
    let second = ctx.store.ensure_loaded().await.expect("second ensure");

    // One creation request total; the identity and snapshot are stable
    assert_eq!(ctx.service.hits().cart_create(), 1);
    assert_eq!(first.id, second.id);
    assert_eq!(ctx.store.cart_id(), Some(first.id));
}

#[tokio::test]
async fn test_add_to_cart_creates_cart_then_adds() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("seeded product");

    let cart = ctx.store.add_to_cart(bottle, 1).await.expect("add to cart");

    assert_eq!(cart.items.len(), 1);
    let line = cart.items.first().expect("line");
    assert_eq!(line.product_id, bottle.id);
    assert_eq!(line.quantity, 1);
    assert_eq!(line.unit_price_cents, bottle.price_cents);

    assert_eq!(ctx.store.item_count(), 1);
    assert_eq!(ctx.store.subtotal_cents(), bottle.price_cents);
    assert_eq!(ctx.store.subtotal_display(), "$12.50");

    // The add response is authoritative: a cart was created but never fetched
    assert_eq!(ctx.service.hits().cart_create(), 1);
    assert_eq!(ctx.service.hits().cart_get(), 0);
    assert_eq!(ctx.service.hits().item_add(), 1);
}

#[tokio::test]
async fn test_duplicate_add_is_merged_by_the_service() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("seeded product");

    ctx.store.add_to_cart(bottle, 1).await.expect("first add");
    let cart = ctx.store.add_to_cart(bottle, 2).await.expect("second add");

    // One line, merged quantity - the container does not deduplicate
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items.first().expect("line").quantity, 3);
    assert_eq!(ctx.store.item_count(), 3);
    assert_eq!(ctx.store.subtotal_cents(), 3 * bottle.price_cents);
}

#[tokio::test]
async fn test_update_quantity_sets_exact_value() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("seeded product");

    ctx.store.add_to_cart(bottle, 1).await.expect("add");

    for quantity in [1, 2, 7] {
        let cart = ctx
            .store
            .update_quantity(bottle.id, quantity)
            .await
            .expect("update quantity")
            .expect("cart identity held");

        assert_eq!(cart.items.first().expect("line").quantity, quantity);
        assert_eq!(ctx.store.subtotal_cents(), quantity * bottle.price_cents);
    }
    assert_eq!(ctx.store.state(), LoadState::Idle);
}

#[tokio::test]
async fn test_update_and_remove_are_noops_without_identity() {
    let ctx = TestContext::new().await;

    let updated = ctx
        .store
        .update_quantity(ProductId::new(1), 2)
        .await
        .expect("update");
    let removed = ctx.store.remove_item(ProductId::new(1)).await.expect("remove");

    assert!(updated.is_none());
    assert!(removed.is_none());
    assert_eq!(ctx.store.state(), LoadState::Idle);
    // No network call was made at all
    assert_eq!(ctx.service.hits().total(), 0);
}

#[tokio::test]
async fn test_remove_item_drops_the_line() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("first product");
    let tote = catalog.get(1).expect("second product");

    ctx.store.add_to_cart(bottle, 1).await.expect("add bottle");
    ctx.store.add_to_cart(tote, 2).await.expect("add tote");

    let cart = ctx
        .store
        .remove_item(bottle.id)
        .await
        .expect("remove")
        .expect("cart identity held");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items.first().expect("line").product_id, tote.id);
    assert_eq!(ctx.store.item_count(), 2);
    assert_eq!(ctx.store.subtotal_cents(), 2 * tote.price_cents);
}

#[tokio::test]
async fn test_clear_is_terminal_for_items() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();

    for product in catalog.iter().take(2) {
        ctx.store.add_to_cart(product, 2).await.expect("add");
    }
    let cart_id = ctx.store.cart_id().expect("identity");

    ctx.store.clear().await.expect("clear");

    assert_eq!(ctx.store.item_count(), 0);
    assert_eq!(ctx.store.subtotal_cents(), 0);
    assert_eq!(ctx.store.state(), LoadState::Idle);
    // The identity is kept: the cart still exists server-side, merely empty
    assert_eq!(ctx.store.cart_id(), Some(cart_id));
    let server_cart = ctx.service.cart_snapshot(cart_id).expect("server cart");
    assert!(server_cart.items.is_empty());
    assert_eq!(server_cart.subtotal_cents, 0);
    // The local projection needed no confirming re-fetch
    assert_eq!(ctx.service.hits().cart_get(), 0);
}

#[tokio::test]
async fn test_clear_without_identity_resets_locally() {
    let ctx = TestContext::new().await;

    ctx.store.clear().await.expect("clear");

    assert_eq!(ctx.store.cart_id(), None);
    assert!(ctx.store.cart().is_none());
    assert_eq!(ctx.service.hits().total(), 0);
}

#[tokio::test]
async fn test_reset_wipes_identity() {
    let ctx = TestContext::new().await;

    let first = ctx.store.ensure_loaded().await.expect("first ensure");
    ctx.store.reset();

    assert_eq!(ctx.store.cart_id(), None);
    assert!(ctx.store.cart().is_none());

    let second = ctx.store.ensure_loaded().await.expect("second ensure");
    assert_ne!(first.id, second.id);
    assert_eq!(ctx.service.hits().cart_create(), 2);
}

#[tokio::test]
async fn test_persisted_identity_survives_restart() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("seeded product");

    ctx.store.add_to_cart(bottle, 1).await.expect("add");
    let cart_id = ctx.store.cart_id().expect("identity");
    let requests_before = ctx.service.hits().total();

    // A new store on the same persistence path restores the identity
    // before any network call is made
    let restarted = ctx.restart_store();
    assert_eq!(restarted.cart_id(), Some(cart_id));
    assert_eq!(ctx.service.hits().total(), requests_before);

    // ...and resumes the same cart without re-creating it
    let cart = restarted.ensure_loaded().await.expect("ensure");
    assert_eq!(cart.id, cart_id);
    assert_eq!(cart.item_count(), 1);
    assert_eq!(ctx.service.hits().cart_create(), 1);
}

#[tokio::test]
async fn test_checkout_clears_session() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let tote = catalog.get(1).expect("seeded product");

    ctx.store.add_to_cart(tote, 2).await.expect("add");
    let cart_id = ctx.store.cart_id().expect("identity");

    // Checkout is driven by the consumer: call the service, then reset the
    // container on success
    let request = CheckoutRequest {
        customer_email: Some("shopper@example.com".to_string()),
    };
    let order = ctx.api.checkout(cart_id, &request).await.expect("checkout");

    assert_eq!(order.cart_id, Some(cart_id));
    assert_eq!(order.subtotal_cents, 2 * tote.price_cents);
    assert_eq!(
        order.total_cents,
        order.subtotal_cents + order.tax_cents + order.shipping_cents
    );
    assert_eq!(order.customer_email.as_deref(), Some("shopper@example.com"));
    let line = order.items.first().expect("order line");
    assert_eq!(line.product_name, tote.name);
    assert_eq!(line.line_total_cents, 2 * tote.price_cents);

    ctx.store.reset();

    // The checked-out identity is never reused
    let fresh = ctx.store.ensure_loaded().await.expect("ensure");
    assert_ne!(fresh.id, cart_id);
    assert_eq!(ctx.service.hits().cart_create(), 2);
}

#[tokio::test]
async fn test_failed_mutation_keeps_snapshot_and_records_error() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("seeded product");

    ctx.store.add_to_cart(bottle, 1).await.expect("add");

    let err = ctx
        .store
        .update_quantity(ProductId::new(999), 2)
        .await
        .expect_err("unknown line must fail");

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(ctx.store.state(), LoadState::Error);
    let message = ctx.store.error().expect("error recorded");
    assert!(message.contains("not in cart"), "unexpected message: {message}");

    // The last good snapshot stays in place
    let cart = ctx.store.cart().expect("snapshot");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(ctx.store.item_count(), 1);
}

#[tokio::test]
async fn test_operation_after_failure_recovers() {
    let ctx = TestContext::new().await;
    let catalog = ctx.catalog();
    let bottle = catalog.first().expect("seeded product");

    ctx.store.add_to_cart(bottle, 1).await.expect("add");
    ctx.store
        .update_quantity(ProductId::new(999), 2)
        .await
        .expect_err("unknown line must fail");

    // A later operation proceeds normally; the error is cleared
    let cart = ctx
        .store
        .update_quantity(bottle.id, 4)
        .await
        .expect("update")
        .expect("cart identity held");

    assert_eq!(cart.items.first().expect("line").quantity, 4);
    assert_eq!(ctx.store.state(), LoadState::Idle);
    assert!(ctx.store.error().is_none());
}

#[tokio::test]
async fn test_subscription_observes_mutations() {
    let ctx = TestContext::new().await;
    let rx = ctx.store.subscribe();

    assert!(!rx.has_changed().expect("sender alive"));
    ctx.store.ensure_loaded().await.expect("ensure");
    assert!(rx.has_changed().expect("sender alive"));
}

#[tokio::test]
async fn test_identity_accessor_reflects_persisted_value() {
    let ctx = TestContext::new().await;

    std::fs::write(&ctx.config.cart_id_path, "42").expect("write identity");
    let restarted = ctx.restart_store();

    assert_eq!(restarted.cart_id(), Some(CartId::new(42)));
    assert_eq!(ctx.service.hits().total(), 0);
}
