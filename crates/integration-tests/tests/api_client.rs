//! Integration tests for the service client: catalog reads, caching, and
//! error normalization.

use greenmarket_core::ProductId;
use greenmarket_integration_tests::{TestContext, product};

#[tokio::test]
async fn test_list_products_returns_seeded_catalog() {
    let ctx = TestContext::new().await;

    let products = ctx.api.list_products().await.expect("list products");

    assert_eq!(products.len(), 3);
    let bottle = products.first().expect("product");
    assert_eq!(bottle.name, "Alpine water bottle");
    assert_eq!(bottle.price_cents, 1250);
    assert!(bottle.active);
}

#[tokio::test]
async fn test_get_product_returns_catalog_item() {
    let ctx = TestContext::new().await;

    let tote = ctx.api.get_product(ProductId::new(2)).await.expect("get product");

    assert_eq!(tote.id, ProductId::new(2));
    assert_eq!(tote.name, "Canvas tote");
    assert_eq!(tote.sku, "SKU-0002");
}

#[tokio::test]
async fn test_unknown_product_maps_to_status_error() {
    let ctx = TestContext::new().await;

    let err = ctx
        .api
        .get_product(ProductId::new(999))
        .await
        .expect_err("unknown product must fail");

    // The message comes from the service's JSON error payload
    assert_eq!(err.to_string(), "product 999 not found");
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_catalog_reads_are_cached() {
    let ctx = TestContext::new().await;

    let first = ctx.api.list_products().await.expect("first list");
    assert_eq!(first.len(), 3);

    // A catalog change is invisible until the cache is invalidated
    ctx.service.push_product(product(4, "Enamel mug", 1450));
    let cached = ctx.api.list_products().await.expect("cached list");
    assert_eq!(cached.len(), 3);
    assert_eq!(ctx.service.hits().product_list(), 1);

    ctx.api.invalidate_all();
    let fresh = ctx.api.list_products().await.expect("fresh list");
    assert_eq!(fresh.len(), 4);
    assert_eq!(ctx.service.hits().product_list(), 2);
}

#[tokio::test]
async fn test_cart_endpoints_are_never_cached() {
    let ctx = TestContext::new().await;

    let created = ctx.api.create_cart().await.expect("create cart");
    ctx.api.get_cart(created.cart_id).await.expect("first get");
    ctx.api.get_cart(created.cart_id).await.expect("second get");

    assert_eq!(ctx.service.hits().cart_get(), 2);
}

#[tokio::test]
async fn test_unknown_cart_is_not_found() {
    let ctx = TestContext::new().await;

    let err = ctx
        .api
        .get_cart(greenmarket_core::CartId::new(42))
        .await
        .expect_err("unknown cart must fail");

    assert_eq!(err.to_string(), "cart 42 not found");
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_checkout_rejects_empty_cart() {
    let ctx = TestContext::new().await;

    let created = ctx.api.create_cart().await.expect("create cart");
    let err = ctx
        .api
        .checkout(created.cart_id, &Default::default())
        .await
        .expect_err("empty cart must not check out");

    assert_eq!(err.status_code(), Some(400));
    assert!(err.to_string().contains("is empty"));
}

#[tokio::test]
async fn test_clear_cart_handles_empty_response_body() {
    let ctx = TestContext::new().await;

    let created = ctx.api.create_cart().await.expect("create cart");
    ctx.api.clear_cart(created.cart_id).await.expect("clear");

    assert_eq!(ctx.service.hits().cart_clear(), 1);
}
