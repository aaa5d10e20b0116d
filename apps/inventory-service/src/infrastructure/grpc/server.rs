//! gRPC Server Implementation
//!
//! Implements the `InventoryService` gRPC service on top of
//! [`InventoryLedger`].

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::{Code, Request, Response, Status, Streaming};
use tonic_types::{ErrorDetails, StatusExt};

use super::proto::stockroom::v1::{
    self as proto, LowStockSubscription, OperationStatus, OrderItemRequest, OrderItemResponse,
    ProductFilter, ProductInfo,
    inventory_service_server::{InventoryService, InventoryServiceServer},
};
use crate::application::services::{LowStockAlert, LowStockMonitor};
use crate::domain::ledger::{BulkAdjustError, InventoryLedger, LedgerError};
use crate::domain::product::{self, Product, Reservation, StockAdjustment};
use crate::infrastructure::metrics::{self, RequestTimer};

// =============================================================================
// Type Aliases
// =============================================================================

type RpcResult<T> = Result<Response<T>, Status>;
type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

// =============================================================================
// Status Messages and Error Details
// =============================================================================

/// `ErrorInfo.domain` attached to lookup failures.
pub const ERROR_DOMAIN: &str = "stockroom.inventory";

/// `ErrorInfo.reason` attached to lookup failures.
pub const PRODUCT_NOT_FOUND_REASON: &str = "PRODUCT_NOT_FOUND";

const PRODUCT_ADDED: &str = "Product added";
const PRODUCT_EXISTS: &str = "Product already exists";
const PRODUCT_UPDATED: &str = "Product updated";
const PRODUCT_NOT_FOUND: &str = "Product not found";
const PRODUCT_DISCONTINUED: &str = "Product discontinued";
const STOCK_ADJUSTED: &str = "Stock adjusted";
const BULK_COMPLETE: &str = "Bulk update complete";

fn product_not_found_status(product_id: &str) -> Status {
    let mut details = ErrorDetails::new();
    details.set_error_info(
        PRODUCT_NOT_FOUND_REASON,
        ERROR_DOMAIN,
        HashMap::from([("product_id".to_string(), product_id.to_string())]),
    );
    Status::with_error_details(Code::NotFound, PRODUCT_NOT_FOUND, details)
}

fn status_for(error: &LedgerError) -> OperationStatus {
    let message = match error {
        LedgerError::NotFound(_) => PRODUCT_NOT_FOUND,
        LedgerError::AlreadyExists(_) => PRODUCT_EXISTS,
    };
    failure(message)
}

fn success(message: &str) -> OperationStatus {
    OperationStatus {
        success: true,
        message: message.to_string(),
    }
}

fn failure(message: &str) -> OperationStatus {
    OperationStatus {
        success: false,
        message: message.to_string(),
    }
}

// =============================================================================
// Server
// =============================================================================

/// gRPC front end for the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryServer {
    ledger: Arc<InventoryLedger>,
    monitor: LowStockMonitor,
    stream_buffer: usize,
    shutdown: CancellationToken,
}

impl InventoryServer {
    /// Create a new server.
    ///
    /// `shutdown` is the server-wide token; each streaming call runs under a
    /// child of it.
    #[must_use]
    pub fn new(
        ledger: Arc<InventoryLedger>,
        monitor: LowStockMonitor,
        stream_buffer: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            monitor,
            stream_buffer: stream_buffer.max(1),
            shutdown,
        }
    }

    /// Wrap in the tonic service adapter.
    #[must_use]
    pub fn into_service(self) -> InventoryServiceServer<Self> {
        InventoryServiceServer::new(self)
    }

    fn lookup(&self, product_id: &str) -> Result<ProductInfo, Status> {
        match self.ledger.get(product_id) {
            Ok(product) => Ok(product.into()),
            Err(e) => {
                tracing::info!(product_id, error = %e, "Lookup failed");
                Err(product_not_found_status(product_id))
            }
        }
    }
}

#[tonic::async_trait]
impl InventoryService for InventoryServer {
    type ListProductsStream = BoxedStream<ProductInfo>;
    type SubscribeLowStockAlertsStream = BoxedStream<proto::LowStockAlert>;
    type InteractiveOrderStockStream = BoxedStream<OrderItemResponse>;

    #[tracing::instrument(skip_all, fields(product_id = %request.get_ref().product_id))]
    async fn get_product_info(&self, request: Request<proto::ProductId>) -> RpcResult<ProductInfo> {
        let _timer = RequestTimer::start("GetProductInfo");
        self.lookup(&request.into_inner().product_id).map(Response::new)
    }

    #[tracing::instrument(skip_all, fields(product_id = %request.get_ref().product_id))]
    async fn add_product(&self, request: Request<ProductInfo>) -> RpcResult<OperationStatus> {
        let _timer = RequestTimer::start("AddProduct");
        let product = Product::from(request.into_inner());

        let status = match self.ledger.add(product) {
            Ok(()) => {
                tracing::info!("Product added");
                success(PRODUCT_ADDED)
            }
            Err(e) => {
                tracing::info!(error = %e, "Add rejected");
                status_for(&e)
            }
        };
        Ok(Response::new(status))
    }

    #[tracing::instrument(skip_all, fields(product_id = %request.get_ref().product_id))]
    async fn update_product(&self, request: Request<ProductInfo>) -> RpcResult<OperationStatus> {
        let _timer = RequestTimer::start("UpdateProduct");
        let product = Product::from(request.into_inner());

        let status = match self.ledger.update(product) {
            Ok(()) => {
                tracing::info!("Product updated");
                success(PRODUCT_UPDATED)
            }
            Err(e) => {
                tracing::info!(error = %e, "Update rejected");
                status_for(&e)
            }
        };
        Ok(Response::new(status))
    }

    #[tracing::instrument(skip_all, fields(product_id = %request.get_ref().product_id))]
    async fn remove_product(&self, request: Request<proto::ProductId>) -> RpcResult<OperationStatus> {
        let _timer = RequestTimer::start("RemoveProduct");
        let product_id = request.into_inner().product_id;

        let status = match self.ledger.discontinue(&product_id) {
            Ok(()) => {
                tracing::info!("Product discontinued");
                success(PRODUCT_DISCONTINUED)
            }
            Err(e) => {
                tracing::info!(error = %e, "Remove rejected");
                status_for(&e)
            }
        };
        Ok(Response::new(status))
    }

    #[tracing::instrument(
        skip_all,
        fields(
            product_id = %request.get_ref().product_id,
            quantity_change = request.get_ref().quantity_change,
        )
    )]
    async fn adjust_stock(&self, request: Request<proto::StockAdjustment>) -> RpcResult<OperationStatus> {
        let _timer = RequestTimer::start("AdjustStock");
        let adjustment = StockAdjustment::from(request.into_inner());

        let status = match self
            .ledger
            .adjust_quantity(&adjustment.product_id, adjustment.quantity_change)
        {
            Ok(product) => {
                tracing::info!(
                    available_quantity = product.available_quantity,
                    reason = %adjustment.reason,
                    "Stock adjusted"
                );
                success(STOCK_ADJUSTED)
            }
            Err(e) => {
                tracing::info!(error = %e, "Adjust rejected");
                status_for(&e)
            }
        };
        Ok(Response::new(status))
    }

    #[tracing::instrument(skip_all)]
    async fn bulk_stock_update(
        &self,
        request: Request<Streaming<proto::StockAdjustment>>,
    ) -> RpcResult<OperationStatus> {
        let _timer = RequestTimer::start("BulkStockUpdate");
        let adjustments = request.into_inner().map(|item| item.map(StockAdjustment::from));

        match self.ledger.bulk_adjust(adjustments).await {
            Ok(summary) => {
                tracing::info!(applied = summary.applied, "Bulk update complete");
                Ok(Response::new(success(BULK_COMPLETE)))
            }
            Err(BulkAdjustError::Rejected { index, source }) => {
                tracing::info!(index, error = %source, "Bulk update aborted");
                Ok(Response::new(status_for(&source)))
            }
            Err(BulkAdjustError::Transport { applied, source }) => {
                tracing::warn!(applied, error = %source, "Bulk update stream failed");
                Err(source)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(product_id = %request.get_ref().product_id))]
    async fn get_stock_level(&self, request: Request<proto::ProductId>) -> RpcResult<ProductInfo> {
        let _timer = RequestTimer::start("GetStockLevel");
        self.lookup(&request.into_inner().product_id).map(Response::new)
    }

    #[tracing::instrument(skip_all, fields(category = %request.get_ref().category))]
    async fn list_products(&self, request: Request<ProductFilter>) -> RpcResult<Self::ListProductsStream> {
        let timer = RequestTimer::start("ListProducts");
        let filter = product::ProductFilter::from(request.into_inner());

        let snapshot = self.ledger.list(&filter);
        tracing::info!(count = snapshot.len(), "Listing products");

        // The timer rides along with the stream and records when it is dropped.
        let stream = tokio_stream::iter(snapshot).map(move |p| {
            let _ = &timer;
            Ok(ProductInfo::from(p))
        });
        Ok(Response::new(Box::pin(stream) as Self::ListProductsStream))
    }

    #[tracing::instrument(skip_all, fields(threshold = request.get_ref().threshold))]
    async fn subscribe_low_stock_alerts(
        &self,
        request: Request<LowStockSubscription>,
    ) -> RpcResult<Self::SubscribeLowStockAlertsStream> {
        let timer = RequestTimer::start("SubscribeLowStockAlerts");
        let subscription = request.into_inner();

        let alerts = self.monitor.subscribe(
            subscription.threshold,
            subscription.product_ids,
            self.shutdown.child_token(),
        );

        let stream = ReceiverStream::new(alerts).map(move |alert| {
            let _ = &timer;
            Ok(proto::LowStockAlert::from(alert))
        });
        Ok(Response::new(
            Box::pin(stream) as Self::SubscribeLowStockAlertsStream
        ))
    }

    #[tracing::instrument(skip_all)]
    async fn interactive_order_stock(
        &self,
        request: Request<Streaming<OrderItemRequest>>,
    ) -> RpcResult<Self::InteractiveOrderStockStream> {
        let timer = RequestTimer::start("InteractiveOrderStock");
        let mut inbound = request.into_inner();

        let stream_id = uuid::Uuid::new_v4();
        let (tx, rx) = tokio::sync::mpsc::channel(self.stream_buffer);
        let ledger = Arc::clone(&self.ledger);
        let cancel = self.shutdown.child_token();

        tracing::info!(%stream_id, "Interactive reservation stream opened");

        tokio::spawn(async move {
            let mut handled = 0_u64;
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tx.closed() => break,
                    next = inbound.message() => next,
                };

                match next {
                    Ok(Some(item)) => {
                        let reservation = ledger.reserve(&item.product_id, item.requested_quantity);
                        metrics::record_reservation(reservation.available);
                        tracing::debug!(
                            %stream_id,
                            product_id = %item.product_id,
                            requested_quantity = item.requested_quantity,
                            available = reservation.available,
                            remaining_quantity = reservation.remaining_quantity,
                            "Reservation attempted"
                        );
                        handled += 1;
                        if tx.send(Ok(OrderItemResponse::from(reservation))).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(status) => {
                        tracing::warn!(%stream_id, error = %status, "Inbound stream failed");
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                }
            }
            drop(timer);
            tracing::info!(%stream_id, handled, "Interactive reservation stream closed");
        });

        let stream = ReceiverStream::new(rx);
        Ok(Response::new(
            Box::pin(stream) as Self::InteractiveOrderStockStream
        ))
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn datetime_to_timestamp(dt: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: i32::try_from(dt.timestamp_subsec_nanos()).unwrap_or(i32::MAX),
    }
}

impl From<Product> for ProductInfo {
    fn from(p: Product) -> Self {
        Self {
            product_id: p.product_id,
            name: p.name,
            description: p.description,
            category: p.category,
            discontinued: p.discontinued,
            available_quantity: p.available_quantity,
            is_available: p.is_available,
        }
    }
}

impl From<ProductInfo> for Product {
    fn from(info: ProductInfo) -> Self {
        // `is_available` on the wire is ignored; the ledger derives it.
        let mut product = Self::new(
            info.product_id,
            info.name,
            info.description,
            info.category,
            info.available_quantity,
        );
        product.discontinued = info.discontinued;
        product
    }
}

impl From<proto::StockAdjustment> for StockAdjustment {
    fn from(msg: proto::StockAdjustment) -> Self {
        Self::new(msg.product_id, msg.quantity_change).with_reason(msg.reason)
    }
}

impl From<ProductFilter> for product::ProductFilter {
    fn from(msg: ProductFilter) -> Self {
        Self {
            category: Some(msg.category).filter(|c| !c.is_empty()),
            include_discontinued: msg.include_discontinued,
        }
    }
}

impl From<Reservation> for OrderItemResponse {
    fn from(r: Reservation) -> Self {
        Self {
            product_id: r.product_id,
            available: r.available,
            remaining_quantity: r.remaining_quantity,
            message: r.message,
        }
    }
}

impl From<LowStockAlert> for proto::LowStockAlert {
    fn from(alert: LowStockAlert) -> Self {
        Self {
            product_id: alert.product_id,
            current_quantity: alert.current_quantity,
            message: alert.message,
            observed_at: Some(datetime_to_timestamp(alert.observed_at)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::sample_catalog;
    use std::time::Duration;

    fn server() -> InventoryServer {
        let ledger = Arc::new(InventoryLedger::with_products(sample_catalog()));
        let monitor = LowStockMonitor::new(Arc::clone(&ledger), Duration::from_secs(5), 8);
        InventoryServer::new(ledger, monitor, 8, CancellationToken::new())
    }

    fn product_id(id: &str) -> Request<proto::ProductId> {
        Request::new(proto::ProductId {
            product_id: id.to_string(),
        })
    }

    #[tokio::test]
    async fn get_product_info_returns_record() {
        let info = server()
            .get_product_info(product_id("P001"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(info.name, "Wireless Mouse");
        assert_eq!(info.available_quantity, 120);
        assert!(info.is_available);
    }

    #[tokio::test]
    async fn unknown_product_carries_error_info() {
        let status = server().get_stock_level(product_id("P999")).await.unwrap_err();

        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "Product not found");

        let details = status.get_error_details();
        let info = details.error_info().unwrap();
        assert_eq!(info.reason, PRODUCT_NOT_FOUND_REASON);
        assert_eq!(info.domain, ERROR_DOMAIN);
        assert_eq!(info.metadata.get("product_id").map(String::as_str), Some("P999"));
    }

    #[tokio::test]
    async fn add_duplicate_reports_exists() {
        let status = server()
            .add_product(Request::new(ProductInfo {
                product_id: "P001".to_string(),
                name: "Dup".to_string(),
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(!status.success);
        assert_eq!(status.message, "Product already exists");
    }

    #[tokio::test]
    async fn add_ignores_wire_availability() {
        let server = server();
        let status = server
            .add_product(Request::new(ProductInfo {
                product_id: "X1".to_string(),
                name: "Widget".to_string(),
                available_quantity: 0,
                is_available: true,
                ..Default::default()
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(status.success);
        assert_eq!(status.message, "Product added");

        let info = server.get_product_info(product_id("X1")).await.unwrap().into_inner();
        assert!(!info.is_available);
    }

    #[tokio::test]
    async fn adjust_unknown_is_structured_failure() {
        let status = server()
            .adjust_stock(Request::new(proto::StockAdjustment {
                product_id: "P999".to_string(),
                quantity_change: 5,
                reason: String::new(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(!status.success);
        assert_eq!(status.message, "Product not found");
    }

    #[tokio::test]
    async fn remove_is_soft_delete() {
        let server = server();
        let status = server.remove_product(product_id("P002")).await.unwrap().into_inner();
        assert_eq!(status.message, "Product discontinued");

        let info = server.get_product_info(product_id("P002")).await.unwrap().into_inner();
        assert!(info.discontinued);
        assert_eq!(info.available_quantity, 75);
    }

    const LATENCY_METRIC: &str = "inventory_request_latency_seconds";

    #[test]
    fn list_latency_recorded_when_stream_drops() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            let stream = futures::executor::block_on(
                server().list_products(Request::new(ProductFilter::default())),
            )
            .unwrap()
            .into_inner();
            assert!(!handle.render().contains(LATENCY_METRIC));
            drop(stream);
        });

        assert!(handle.render().contains(LATENCY_METRIC));
    }

    #[tokio::test]
    async fn subscription_latency_spans_stream_lifetime() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        let stream = server()
            .subscribe_low_stock_alerts(Request::new(LowStockSubscription {
                threshold: 10,
                product_ids: Vec::new(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!handle.render().contains(LATENCY_METRIC));

        drop(stream);
        assert!(handle.render().contains(LATENCY_METRIC));
    }

    #[test]
    fn empty_category_filter_matches_all() {
        let filter = product::ProductFilter::from(ProductFilter {
            category: String::new(),
            include_discontinued: false,
        });
        assert_eq!(filter.category, None);
    }

    #[test]
    fn alert_conversion_sets_timestamp() {
        let observed_at = DateTime::from_timestamp(1_700_000_000, 5).unwrap();
        let alert = proto::LowStockAlert::from(LowStockAlert {
            product_id: "P004".to_string(),
            current_quantity: 0,
            message: "Low stock".to_string(),
            observed_at,
        });

        let ts = alert.observed_at.unwrap();
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 5);
    }
}
