//! gRPC Server Implementation
//!
//! Implements the `OrderService` gRPC service on top of
//! [`OrderOrchestrator`].

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Request, Response, Status, Streaming};
use tonic_types::{ErrorDetails, StatusExt};

use super::proto::stockroom::v1::{
    self as proto, BuildOrderRequest, BuildOrderResponse, CancelOrderRequest, CancelOrderResponse,
    FinalizeOrderRequest, FinalizeOrderResponse, OperationStatus, ProductInfo,
    order_service_server::{OrderService, OrderServiceServer},
};
use crate::application::ports::InventoryPortError;
use crate::application::services::OrderOrchestrator;
use crate::domain::order::{
    AvailabilityCheck, BuildOrderItem, FinalizeOutcome, ItemResult, OrderItem, ProductSnapshot,
};
use crate::infrastructure::metrics::RequestTimer;

type RpcResult<T> = Result<Response<T>, Status>;
type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// `ErrorInfo.domain` attached to lookup failures.
pub const ERROR_DOMAIN: &str = "stockroom.inventory";

/// `ErrorInfo.reason` attached to lookup failures.
pub const PRODUCT_NOT_FOUND_REASON: &str = "PRODUCT_NOT_FOUND";

/// Map an inventory port error onto a gRPC status.
fn port_error_to_status(error: &InventoryPortError) -> Status {
    match error {
        InventoryPortError::NotFound { product_id } => {
            let mut details = ErrorDetails::new();
            details.set_error_info(
                PRODUCT_NOT_FOUND_REASON,
                ERROR_DOMAIN,
                HashMap::from([("product_id".to_string(), product_id.clone())]),
            );
            Status::with_error_details(Code::NotFound, "Product not found", details)
        }
        InventoryPortError::Rejected { message } => Status::failed_precondition(message.clone()),
        InventoryPortError::Unavailable { message } => Status::unavailable(message.clone()),
    }
}

// =============================================================================
// Server
// =============================================================================

/// gRPC front end for the order orchestrator.
#[derive(Debug, Clone)]
pub struct OrderServer {
    orchestrator: Arc<OrderOrchestrator>,
    stream_buffer: usize,
    shutdown: CancellationToken,
}

impl OrderServer {
    /// Create a new server.
    #[must_use]
    pub fn new(
        orchestrator: Arc<OrderOrchestrator>,
        stream_buffer: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            stream_buffer: stream_buffer.max(1),
            shutdown,
        }
    }

    /// Wrap in the tonic service adapter.
    #[must_use]
    pub fn into_service(self) -> OrderServiceServer<Self> {
        OrderServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl OrderService for OrderServer {
    type BuildOrderStream = BoxedStream<BuildOrderResponse>;

    #[tracing::instrument(skip_all, fields(product_id = %request.get_ref().product_id))]
    async fn check_item_availability(
        &self,
        request: Request<proto::ProductId>,
    ) -> RpcResult<ProductInfo> {
        let _timer = RequestTimer::start("CheckItemAvailability");
        let product_id = request.into_inner().product_id;

        match self.orchestrator.check_item_availability(&product_id).await {
            Ok(product) => Ok(Response::new(product.into())),
            Err(e) => {
                tracing::info!(error = %e, "Availability check failed");
                Err(port_error_to_status(&e))
            }
        }
    }

    #[tracing::instrument(skip_all)]
    async fn build_order(
        &self,
        request: Request<Streaming<BuildOrderRequest>>,
    ) -> RpcResult<Self::BuildOrderStream> {
        let timer = RequestTimer::start("BuildOrder");
        let mut inbound = request.into_inner();

        let stream_id = uuid::Uuid::new_v4();
        let (tx, rx) = tokio::sync::mpsc::channel(self.stream_buffer);
        let orchestrator = Arc::clone(&self.orchestrator);
        let cancel = self.shutdown.child_token();

        tracing::info!(%stream_id, "Order build stream opened");

        tokio::spawn(async move {
            let mut handled = 0_u64;
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tx.closed() => break,
                    next = inbound.message() => next,
                };

                let request = match next {
                    Ok(Some(request)) => request,
                    Ok(None) => break,
                    Err(status) => {
                        tracing::warn!(%stream_id, error = %status, "Inbound stream failed");
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                };

                let reply = match orchestrator.record_and_check(request.into()).await {
                    Ok(check) => Ok(BuildOrderResponse::from(check)),
                    Err(e) => {
                        tracing::info!(%stream_id, error = %e, "Order build stream aborted");
                        Err(port_error_to_status(&e))
                    }
                };
                let terminal = reply.is_err();
                handled += 1;

                if tx.send(reply).await.is_err() || terminal {
                    break;
                }
            }
            drop(timer);
            tracing::info!(%stream_id, handled, "Order build stream closed");
        });

        let stream = ReceiverStream::new(rx);
        Ok(Response::new(Box::pin(stream) as Self::BuildOrderStream))
    }

    #[tracing::instrument(
        skip_all,
        fields(session_id = %request.get_ref().session_id, items = request.get_ref().items.len())
    )]
    async fn finalize_order(
        &self,
        request: Request<FinalizeOrderRequest>,
    ) -> RpcResult<FinalizeOrderResponse> {
        let _timer = RequestTimer::start("FinalizeOrder");
        let (session_id, items) = split_order(request.into_inner());

        let outcome = self.orchestrator.finalize_order(&session_id, &items).await;
        Ok(Response::new(outcome.into()))
    }

    #[tracing::instrument(
        skip_all,
        fields(session_id = %request.get_ref().session_id, items = request.get_ref().items.len())
    )]
    async fn confirm_order_stock(
        &self,
        request: Request<FinalizeOrderRequest>,
    ) -> RpcResult<OperationStatus> {
        let _timer = RequestTimer::start("ConfirmOrderStock");
        let (session_id, items) = split_order(request.into_inner());

        let outcome = self
            .orchestrator
            .confirm_order_stock(&session_id, &items)
            .await;
        Ok(Response::new(OperationStatus {
            success: outcome.success,
            message: outcome.message,
        }))
    }

    #[tracing::instrument(skip_all, fields(session_id = %request.get_ref().session_id))]
    async fn cancel_order(
        &self,
        request: Request<CancelOrderRequest>,
    ) -> RpcResult<CancelOrderResponse> {
        let _timer = RequestTimer::start("CancelOrder");
        let outcome = self
            .orchestrator
            .cancel_order(&request.into_inner().session_id);

        Ok(Response::new(CancelOrderResponse {
            released: outcome.released,
            message: outcome.message,
        }))
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn split_order(request: FinalizeOrderRequest) -> (String, Vec<OrderItem>) {
    let items = request
        .items
        .into_iter()
        .map(|item| OrderItem::new(item.product_id, item.quantity))
        .collect();
    (request.session_id, items)
}

impl From<BuildOrderRequest> for BuildOrderItem {
    fn from(msg: BuildOrderRequest) -> Self {
        Self {
            session_id: msg.session_id,
            product_id: msg.product_id,
            requested_quantity: msg.requested_quantity,
        }
    }
}

impl From<AvailabilityCheck> for BuildOrderResponse {
    fn from(check: AvailabilityCheck) -> Self {
        Self {
            product_id: check.product_id,
            available: check.available,
            current_quantity: check.current_quantity,
        }
    }
}

impl From<ProductSnapshot> for ProductInfo {
    fn from(p: ProductSnapshot) -> Self {
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

impl From<ItemResult> for proto::ItemResult {
    fn from(r: ItemResult) -> Self {
        Self {
            product_id: r.product_id,
            reserved: r.reserved,
            message: r.message,
        }
    }
}

impl From<FinalizeOutcome> for FinalizeOrderResponse {
    fn from(outcome: FinalizeOutcome) -> Self {
        Self {
            success: outcome.success,
            message: outcome.message,
            item_results: outcome.item_results.into_iter().map(Into::into).collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_carries_error_info() {
        let status = port_error_to_status(&InventoryPortError::NotFound {
            product_id: "P999".to_string(),
        });

        assert_eq!(status.code(), Code::NotFound);
        let details = status.get_error_details();
        let info = details.error_info().unwrap();
        assert_eq!(info.reason, PRODUCT_NOT_FOUND_REASON);
        assert_eq!(info.domain, ERROR_DOMAIN);
        assert_eq!(info.metadata["product_id"], "P999");
    }

    #[test]
    fn transport_failure_is_unavailable() {
        let status = port_error_to_status(&InventoryPortError::Unavailable {
            message: "deadline exceeded".to_string(),
        });
        assert_eq!(status.code(), Code::Unavailable);
    }

    #[test]
    fn finalize_request_preserves_item_order() {
        let (session_id, items) = split_order(FinalizeOrderRequest {
            session_id: "s1".to_string(),
            items: vec![
                proto::OrderItem {
                    product_id: "P004".to_string(),
                    quantity: 1,
                },
                proto::OrderItem {
                    product_id: "P001".to_string(),
                    quantity: 5,
                },
            ],
        });

        assert_eq!(session_id, "s1");
        assert_eq!(items, vec![OrderItem::new("P004", 1), OrderItem::new("P001", 5)]);
    }
}
