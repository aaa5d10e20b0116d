//! Inventory gRPC Client
//!
//! [`InventoryPort`] adapter over the generated `InventoryService` client.
//! The channel connects lazily, so the order service starts even while the
//! inventory service is down; calls fail with `Unavailable` until it is up.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};

use crate::application::ports::{InventoryPort, InventoryPortError};
use crate::domain::order::ProductSnapshot;
use crate::infrastructure::grpc::proto::stockroom::v1::{
    ProductId, ProductInfo, StockAdjustment, inventory_service_client::InventoryServiceClient,
};

/// Message the ledger returns for unknown products.
const PRODUCT_NOT_FOUND: &str = "Product not found";

/// gRPC-backed inventory port.
#[derive(Debug, Clone)]
pub struct GrpcInventoryClient {
    client: InventoryServiceClient<Channel>,
}

impl GrpcInventoryClient {
    /// Build a lazily connecting client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid URI.
    pub fn connect_lazy(url: &str, timeout: Duration) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(url.to_string())?
            .timeout(timeout)
            .connect_timeout(timeout)
            .connect_lazy();
        Ok(Self::new(channel))
    }

    /// Wrap an existing channel.
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self {
            client: InventoryServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl InventoryPort for GrpcInventoryClient {
    async fn get_product(&self, product_id: &str) -> Result<ProductSnapshot, InventoryPortError> {
        let mut client = self.client.clone();
        let info = client
            .get_product_info(ProductId {
                product_id: product_id.to_string(),
            })
            .await
            .map_err(|status| classify(product_id, &status))?
            .into_inner();
        Ok(info.into())
    }

    async fn adjust_stock(
        &self,
        product_id: &str,
        quantity_change: i32,
        reason: &str,
    ) -> Result<(), InventoryPortError> {
        let mut client = self.client.clone();
        let status = client
            .adjust_stock(StockAdjustment {
                product_id: product_id.to_string(),
                quantity_change,
                reason: reason.to_string(),
            })
            .await
            .map_err(|status| classify(product_id, &status))?
            .into_inner();

        if status.success {
            Ok(())
        } else if status.message == PRODUCT_NOT_FOUND {
            Err(InventoryPortError::NotFound {
                product_id: product_id.to_string(),
            })
        } else {
            Err(InventoryPortError::Rejected {
                message: status.message,
            })
        }
    }
}

fn classify(product_id: &str, status: &Status) -> InventoryPortError {
    match status.code() {
        Code::NotFound => InventoryPortError::NotFound {
            product_id: product_id.to_string(),
        },
        code => InventoryPortError::Unavailable {
            message: format!("{code:?}: {}", status.message()),
        },
    }
}

impl From<ProductInfo> for ProductSnapshot {
    fn from(info: ProductInfo) -> Self {
        Self {
            product_id: info.product_id,
            name: info.name,
            description: info.description,
            category: info.category,
            discontinued: info.discontinued,
            available_quantity: info.available_quantity,
            is_available: info.is_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err = classify("P999", &Status::not_found("Product not found"));
        assert_eq!(
            err,
            InventoryPortError::NotFound {
                product_id: "P999".to_string()
            }
        );
    }

    #[test]
    fn other_status_maps_to_unavailable() {
        let err = classify("P001", &Status::unavailable("connection refused"));
        assert!(matches!(err, InventoryPortError::Unavailable { message } if message.contains("connection refused")));
    }

    #[test]
    fn invalid_url_rejected() {
        assert!(GrpcInventoryClient::connect_lazy("not a uri", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn unreachable_inventory_is_unavailable() {
        // Port 9 (discard) on localhost is not a gRPC server.
        let client =
            GrpcInventoryClient::connect_lazy("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();

        let err = client.get_product("P001").await.unwrap_err();
        assert!(matches!(err, InventoryPortError::Unavailable { .. }));
    }
}
