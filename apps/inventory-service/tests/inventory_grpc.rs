//! Inventory gRPC Integration Tests
//!
//! Runs the real tonic server on a random port and drives it through the
//! generated client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Server};
use tonic::{Code, Request};

use inventory_service::{
    InventoryLedger, InventoryServer, LowStockMonitor,
    proto::{
        LowStockSubscription, OrderItemRequest, ProductFilter, ProductId, ProductInfo,
        StockAdjustment, inventory_service_client::InventoryServiceClient,
    },
    sample_catalog,
};

const LOW_STOCK_INTERVAL: Duration = Duration::from_millis(100);

struct TestServer {
    client: InventoryServiceClient<Channel>,
    ledger: Arc<InventoryLedger>,
    monitor: LowStockMonitor,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Start a test gRPC server on a random port and return the client.
async fn setup_test_server() -> TestServer {
    let ledger = Arc::new(InventoryLedger::with_products(sample_catalog()));
    let monitor = LowStockMonitor::new(Arc::clone(&ledger), LOW_STOCK_INTERVAL, 16);
    let shutdown = CancellationToken::new();

    let server = InventoryServer::new(Arc::clone(&ledger), monitor.clone(), 16, shutdown.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move {
        Server::builder()
            .add_service(server.into_service())
            .serve_with_incoming_shutdown(
                tokio_stream::wrappers::TcpListenerStream::new(listener),
                server_shutdown.cancelled_owned(),
            )
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = InventoryServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    TestServer {
        client,
        ledger,
        monitor,
        shutdown,
        handle,
    }
}

fn product_id(id: &str) -> ProductId {
    ProductId {
        product_id: id.to_string(),
    }
}

fn adjustment(id: &str, quantity_change: i32) -> StockAdjustment {
    StockAdjustment {
        product_id: id.to_string(),
        quantity_change,
        reason: "test".to_string(),
    }
}

fn item(id: &str, requested_quantity: i32) -> OrderItemRequest {
    OrderItemRequest {
        product_id: id.to_string(),
        requested_quantity,
    }
}

// =============================================================================
// Point Operations
// =============================================================================

#[tokio::test]
async fn test_get_product_and_stock_level_agree() {
    let mut server = setup_test_server().await;

    let info = server
        .client
        .get_product_info(product_id("P003"))
        .await
        .unwrap()
        .into_inner();
    let level = server
        .client
        .get_stock_level(product_id("P003"))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(info, level);
    assert_eq!(info.available_quantity, 200);

    server.handle.abort();
}

#[tokio::test]
async fn test_get_unknown_product_is_not_found() {
    let mut server = setup_test_server().await;

    let status = server
        .client
        .get_product_info(product_id("P999"))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);
    assert_eq!(status.message(), "Product not found");

    server.handle.abort();
}

#[tokio::test]
async fn test_add_then_duplicate_add() {
    let mut server = setup_test_server().await;
    let product = ProductInfo {
        product_id: "P100".to_string(),
        name: "Desk Mat".to_string(),
        description: "Felt desk mat".to_string(),
        category: "Office Supplies".to_string(),
        discontinued: false,
        available_quantity: 12,
        is_available: false,
    };

    let first = server.client.add_product(product.clone()).await.unwrap().into_inner();
    assert!(first.success);
    assert_eq!(first.message, "Product added");

    let mut impostor = product.clone();
    impostor.name = "Impostor".to_string();
    let second = server.client.add_product(impostor).await.unwrap().into_inner();
    assert!(!second.success);
    assert_eq!(second.message, "Product already exists");

    let stored = server
        .client
        .get_product_info(product_id("P100"))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(stored.name, "Desk Mat");
    assert!(stored.is_available);

    server.handle.abort();
}

#[tokio::test]
async fn test_update_product() {
    let mut server = setup_test_server().await;

    let status = server
        .client
        .update_product(ProductInfo {
            product_id: "P004".to_string(),
            name: "Notebook".to_string(),
            description: "A4 notebook".to_string(),
            category: "Office Supplies".to_string(),
            discontinued: false,
            available_quantity: 30,
            is_available: false,
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(status.message, "Product updated");

    let missing = server
        .client
        .update_product(ProductInfo {
            product_id: "P999".to_string(),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert!(!missing.success);
    assert_eq!(missing.message, "Product not found");

    let stored = server.ledger.get("P004").unwrap();
    assert_eq!(stored.available_quantity, 30);
    assert!(stored.is_available);

    server.handle.abort();
}

#[tokio::test]
async fn test_remove_product_is_idempotent() {
    let mut server = setup_test_server().await;

    for _ in 0..2 {
        let status = server
            .client
            .remove_product(product_id("P002"))
            .await
            .unwrap()
            .into_inner();
        assert!(status.success);
        assert_eq!(status.message, "Product discontinued");
    }

    let info = server
        .client
        .get_product_info(product_id("P002"))
        .await
        .unwrap()
        .into_inner();
    assert!(info.discontinued);

    server.handle.abort();
}

#[tokio::test]
async fn test_adjust_unknown_product_mutates_nothing() {
    let mut server = setup_test_server().await;

    let status = server
        .client
        .adjust_stock(adjustment("P999", 10))
        .await
        .unwrap()
        .into_inner();

    assert!(!status.success);
    assert_eq!(status.message, "Product not found");
    assert_eq!(server.ledger.len(), 5);

    server.handle.abort();
}

#[tokio::test]
async fn test_adjust_allows_negative_quantity() {
    let mut server = setup_test_server().await;

    let status = server
        .client
        .adjust_stock(adjustment("P004", -3))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(status.message, "Stock adjusted");

    let info = server
        .client
        .get_stock_level(product_id("P004"))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(info.available_quantity, -3);
    assert!(!info.is_available);

    server.handle.abort();
}

// =============================================================================
// Streaming Operations
// =============================================================================

#[tokio::test]
async fn test_bulk_stock_update_applies_all() {
    let mut server = setup_test_server().await;

    let adjustments = tokio_stream::iter(vec![
        adjustment("P001", -20),
        adjustment("P004", 15),
        adjustment("P001", 5),
    ]);
    let status = server
        .client
        .bulk_stock_update(Request::new(adjustments))
        .await
        .unwrap()
        .into_inner();

    assert!(status.success);
    assert_eq!(status.message, "Bulk update complete");
    assert_eq!(server.ledger.get("P001").unwrap().available_quantity, 105);
    assert_eq!(server.ledger.get("P004").unwrap().available_quantity, 15);

    server.handle.abort();
}

#[tokio::test]
async fn test_bulk_stock_update_aborts_on_unknown_product() {
    let mut server = setup_test_server().await;

    let adjustments = tokio_stream::iter(vec![
        adjustment("P001", -20),
        adjustment("P999", 1),
        adjustment("P002", -5),
    ]);
    let status = server
        .client
        .bulk_stock_update(Request::new(adjustments))
        .await
        .unwrap()
        .into_inner();

    assert!(!status.success);
    assert_eq!(status.message, "Product not found");
    assert_eq!(server.ledger.get("P001").unwrap().available_quantity, 100);
    assert_eq!(server.ledger.get("P002").unwrap().available_quantity, 75);

    server.handle.abort();
}

#[tokio::test]
async fn test_list_electronics_excludes_discontinued() {
    let mut server = setup_test_server().await;
    server.ledger.discontinue("P002").unwrap();

    let stream = server
        .client
        .list_products(ProductFilter {
            category: "Electronics".to_string(),
            include_discontinued: false,
        })
        .await
        .unwrap()
        .into_inner();
    let products: Vec<ProductInfo> = stream.map(Result::unwrap).collect().await;

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].product_id, "P001");

    server.handle.abort();
}

#[tokio::test]
async fn test_list_all_active() {
    let mut server = setup_test_server().await;

    let stream = server
        .client
        .list_products(ProductFilter::default())
        .await
        .unwrap()
        .into_inner();
    let mut ids: Vec<String> = stream.map(|p| p.unwrap().product_id).collect().await;
    ids.sort();

    assert_eq!(ids, ["P001", "P002", "P003", "P004", "P005"]);

    server.handle.abort();
}

#[tokio::test]
async fn test_interactive_reservation_scenario() {
    let mut server = setup_test_server().await;

    server
        .client
        .adjust_stock(adjustment("P001", -50))
        .await
        .unwrap();

    let (tx, rx) = mpsc::channel(4);
    let mut responses = server
        .client
        .interactive_order_stock(Request::new(ReceiverStream::new(rx)))
        .await
        .unwrap()
        .into_inner();

    tx.send(item("P001", 80)).await.unwrap();
    let rejected = responses.message().await.unwrap().unwrap();
    assert!(!rejected.available);
    assert_eq!(rejected.remaining_quantity, 70);
    assert_eq!(rejected.message, "Insufficient stock");

    tx.send(item("P001", 50)).await.unwrap();
    let granted = responses.message().await.unwrap().unwrap();
    assert!(granted.available);
    assert_eq!(granted.remaining_quantity, 20);
    assert_eq!(granted.message, "Reserved");

    tx.send(item("P999", 1)).await.unwrap();
    let unknown = responses.message().await.unwrap().unwrap();
    assert!(!unknown.available);
    assert_eq!(unknown.remaining_quantity, 0);

    drop(tx);
    assert!(responses.message().await.unwrap().is_none());
    assert_eq!(server.ledger.get("P001").unwrap().available_quantity, 20);

    server.handle.abort();
}

#[tokio::test]
async fn test_concurrent_reservations_never_oversell() {
    let server = setup_test_server().await;

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let mut client = server.client.clone();
            tokio::spawn(async move {
                let requests = tokio_stream::iter((0..10).map(|_| item("P005", 2)));
                let mut responses = client
                    .interactive_order_stock(Request::new(requests))
                    .await
                    .unwrap()
                    .into_inner();
                let mut granted = 0_usize;
                while let Some(response) = responses.message().await.unwrap() {
                    if response.available {
                        granted += 1;
                    }
                }
                granted
            })
        })
        .collect();

    let mut granted = 0;
    for task in tasks {
        granted += task.await.unwrap();
    }

    // 45 units, 2 per request.
    assert_eq!(granted, 22);
    assert_eq!(server.ledger.get("P005").unwrap().available_quantity, 1);

    server.handle.abort();
}

#[tokio::test]
async fn test_low_stock_alerts_repeat_until_client_leaves() {
    let mut server = setup_test_server().await;

    let mut alerts = server
        .client
        .subscribe_low_stock_alerts(LowStockSubscription {
            threshold: 0,
            product_ids: vec!["P001".to_string()],
        })
        .await
        .unwrap()
        .into_inner();

    for _ in 0..2 {
        let alert = timeout(Duration::from_secs(2), alerts.message())
            .await
            .expect("alert within timeout")
            .unwrap()
            .unwrap();
        assert_eq!(alert.product_id, "P004");
        assert_eq!(alert.current_quantity, 0);
        assert_eq!(alert.message, "Low stock");
        assert!(alert.observed_at.is_some());
    }
    assert_eq!(server.monitor.active_subscriptions(), 1);

    drop(alerts);

    timeout(Duration::from_secs(2), async {
        while server.monitor.active_subscriptions() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscription should end after the client leaves");

    server.handle.abort();
}

#[tokio::test]
async fn test_shutdown_ends_open_streams() {
    let mut server = setup_test_server().await;

    let mut alerts = server
        .client
        .subscribe_low_stock_alerts(LowStockSubscription {
            threshold: 1_000,
            product_ids: Vec::new(),
        })
        .await
        .unwrap()
        .into_inner();

    let (tx, rx) = mpsc::channel(1);
    let mut responses = server
        .client
        .interactive_order_stock(Request::new(ReceiverStream::new(rx)))
        .await
        .unwrap()
        .into_inner();

    server.shutdown.cancel();

    let reservations_ended = timeout(Duration::from_secs(2), async {
        while let Ok(Some(_)) = responses.message().await {}
    })
    .await;
    assert!(reservations_ended.is_ok());

    let alerts_ended = timeout(Duration::from_secs(2), async {
        while let Ok(Some(_)) = alerts.message().await {}
    })
    .await;
    assert!(alerts_ended.is_ok());

    drop(tx);
    let _ = timeout(Duration::from_secs(2), server.handle).await;
}
